//! Configuration types for readdirinfo
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - The worker-count override read from the environment

use crate::error::ConfigError;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

/// Maximum reasonable worker count
pub const MAX_WORKERS: usize = 1024;

/// Pool size when nothing else is configured
pub const DEFAULT_WORKERS: usize = 4;

/// Environment variable overriding the library's default pool size
pub const THREADPOOL_SIZE_VAR: &str = "READDIRINFO_THREADPOOL_SIZE";

/// List directory entries with their type and size
#[derive(Parser, Debug, Clone)]
#[command(
    name = "readdirinfo",
    version,
    about = "List directory entries with their type and size",
    long_about = "Lists the immediate children of each DIR on a background worker pool.\n\n\
                  Each entry is reported with its name, its type as reported by readdir \
                  (Regular, Directory, Link, ...) and the size returned by stat.",
    after_help = "EXAMPLES:\n    \
        readdirinfo .\n    \
        readdirinfo /etc /var/log -w 8\n    \
        readdirinfo ~/src --json -a"
)]
pub struct CliArgs {
    /// Directories to list
    #[arg(value_name = "DIR", required = true)]
    pub paths: Vec<PathBuf>,

    /// Number of worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_cli_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Emit JSON instead of a table
    #[arg(long)]
    pub json: bool,

    /// Show entries whose names start with '.'
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Quiet mode - suppress the summary
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_cli_workers() -> usize {
    // Scanning is I/O bound; cap so small machines with many paths stay sane
    (num_cpus::get() * 2).clamp(1, 64)
}

/// Pool configuration used by the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListerConfig {
    /// Number of worker threads
    pub worker_count: usize,
}

impl ListerConfig {
    /// Library configuration, honouring `READDIRINFO_THREADPOOL_SIZE`
    pub fn from_env() -> Result<Self, ConfigError> {
        let worker_count = match std::env::var(THREADPOOL_SIZE_VAR) {
            Ok(value) => parse_worker_count(&value)?,
            Err(_) => DEFAULT_WORKERS,
        };

        Ok(Self { worker_count })
    }

    /// Set the worker count
    pub fn with_workers(mut self, worker_count: usize) -> Result<Self, ConfigError> {
        validate_worker_count(worker_count)?;
        self.worker_count = worker_count;
        Ok(self)
    }
}

impl Default for ListerConfig {
    /// `from_env`, falling back to the built-in pool size if the override is bad
    fn default() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring worker count override");
            Self {
                worker_count: DEFAULT_WORKERS,
            }
        })
    }
}

/// Validated configuration of one CLI run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Directories to list
    pub paths: Vec<PathBuf>,

    /// Pool settings
    pub lister: ListerConfig,

    /// Show dot entries in output
    pub show_hidden: bool,

    /// JSON output
    pub json: bool,

    /// Print a summary after the listings
    pub show_summary: bool,
}

impl CliConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.paths.is_empty() {
            return Err(ConfigError::NoPaths);
        }

        validate_worker_count(args.workers)?;

        Ok(Self {
            paths: args.paths,
            lister: ListerConfig {
                worker_count: args.workers,
            },
            show_hidden: args.all,
            json: args.json,
            show_summary: !args.quiet && !args.json,
        })
    }
}

fn validate_worker_count(count: usize) -> Result<(), ConfigError> {
    if count == 0 || count > MAX_WORKERS {
        return Err(ConfigError::InvalidWorkerCount {
            count,
            max: MAX_WORKERS,
        });
    }
    Ok(())
}

/// Parse a worker count from its textual form (environment override)
pub fn parse_worker_count(value: &str) -> Result<usize, ConfigError> {
    let count = value
        .trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::InvalidEnv {
            var: THREADPOOL_SIZE_VAR,
            value: value.to_string(),
            reason: e.to_string(),
        })?;

    validate_worker_count(count)?;
    Ok(count)
}
