//! readdirinfo - list directory entries with type and size
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use readdirinfo::config::{CliArgs, CliConfig};
use readdirinfo::output::{is_shown, print_error, print_listing, print_summary, ListingTotals};
use readdirinfo::{DirEntryInfo, ListError, ListingCoordinator};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

type Outcome = std::result::Result<Vec<DirEntryInfo>, ListError>;

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every listing succeeded
fn run() -> Result<bool> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let config = CliConfig::from_args(args).context("Invalid configuration")?;

    let start = Instant::now();
    let mut coordinator =
        ListingCoordinator::new(&config.lister).context("Failed to start worker pool")?;

    // Completions arrive in any order; keep them keyed by submission index.
    let outcomes: Rc<RefCell<BTreeMap<usize, Outcome>>> = Rc::new(RefCell::new(BTreeMap::new()));

    for (index, path) in config.paths.iter().enumerate() {
        let sink = Rc::clone(&outcomes);
        coordinator
            .submit(path, move |outcome| {
                sink.borrow_mut().insert(index, outcome);
            })
            .with_context(|| format!("Cannot list '{}'", path.display()))?;
    }

    let delivered = coordinator.run_until_idle();
    debug!(delivered = delivered, "All listings delivered");

    let outcomes = std::mem::take(&mut *outcomes.borrow_mut());
    let results: Vec<(PathBuf, Outcome)> = outcomes
        .into_iter()
        .map(|(index, outcome)| (config.paths[index].clone(), outcome))
        .collect();

    let mut totals = ListingTotals::default();
    for (_, outcome) in &results {
        totals.record(outcome, config.show_hidden);
    }

    if config.json {
        print_json(&results, config.show_hidden)?;
    } else {
        let with_header = results.len() > 1;
        for (i, (path, outcome)) in results.iter().enumerate() {
            match outcome {
                Ok(entries) => {
                    if with_header && i > 0 {
                        println!();
                    }
                    print_listing(path, entries, config.show_hidden, with_header);
                }
                Err(e) => print_error(path, e),
            }
        }
    }

    if config.show_summary {
        print_summary(&totals, start.elapsed());
    }

    Ok(totals.failed == 0)
}

fn print_json(results: &[(PathBuf, Outcome)], show_hidden: bool) -> Result<()> {
    let listings: Vec<serde_json::Value> = results
        .iter()
        .map(|(path, outcome)| match outcome {
            Ok(entries) => {
                let entries: Vec<&DirEntryInfo> = entries
                    .iter()
                    .filter(|e| is_shown(e, show_hidden))
                    .collect();
                serde_json::json!({
                    "path": path.display().to_string(),
                    "error": null,
                    "entries": entries
                })
            }
            Err(e) => serde_json::json!({
                "path": path.display().to_string(),
                "error": e.to_string(),
                "entries": []
            }),
        })
        .collect();

    let rendered =
        serde_json::to_string_pretty(&listings).context("Failed to serialize listings")?;
    println!("{}", rendered);
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("readdirinfo=debug,warn")
    } else {
        EnvFilter::new("readdirinfo=warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))?;

    Ok(())
}
