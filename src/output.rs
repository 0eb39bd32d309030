//! Terminal output for the CLI
//!
//! Tables are styled with `console`; sizes are formatted with `humansize`.

use crate::dirent::{DirEntryInfo, EntryType};
use crate::error::ListError;
use console::style;
use humansize::{format_size, BINARY};
use std::path::Path;
use std::time::Duration;

/// Totals across every listing printed
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListingTotals {
    pub listed: u64,
    pub failed: u64,
    pub entries: u64,
    pub bytes: u64,
}

impl ListingTotals {
    /// Account for one delivered outcome, counting only the entries shown
    pub fn record(&mut self, outcome: &Result<Vec<DirEntryInfo>, ListError>, show_hidden: bool) {
        match outcome {
            Ok(entries) => {
                self.listed += 1;
                for entry in entries.iter().filter(|e| is_shown(e, show_hidden)) {
                    self.entries += 1;
                    if entry.entry_type == EntryType::Regular {
                        self.bytes += entry.size;
                    }
                }
            }
            Err(_) => self.failed += 1,
        }
    }
}

/// Dot entries are shown only on request, like `ls -a`
pub fn is_shown(entry: &DirEntryInfo, show_hidden: bool) -> bool {
    show_hidden || !entry.is_hidden()
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

fn styled_name(entry: &DirEntryInfo) -> String {
    match entry.entry_type {
        EntryType::Directory => style(format!("{}/", entry.name)).blue().bold().to_string(),
        EntryType::Link => style(&entry.name).cyan().to_string(),
        EntryType::Regular => entry.name.clone(),
        _ => style(&entry.name).yellow().to_string(),
    }
}

/// Print one directory listing as a table
pub fn print_listing(path: &Path, entries: &[DirEntryInfo], show_hidden: bool, with_header: bool) {
    if with_header {
        println!("{}", style(format!("{}:", path.display())).bold());
    }

    for entry in entries.iter().filter(|e| is_shown(e, show_hidden)) {
        println!(
            "  {:<10} {:>10}  {}",
            entry.entry_type.label(),
            format_size(entry.size, BINARY),
            styled_name(entry)
        );
    }
}

/// Print a failed listing
pub fn print_error(path: &Path, error: &ListError) {
    eprintln!(
        "{} {}: {}",
        style("error:").red().bold(),
        path.display(),
        error
    );
}

/// Print a summary of all listings
pub fn print_summary(totals: &ListingTotals, duration: Duration) {
    println!();
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(totals.listed)
    );
    println!("  {} {}", style("Entries:").bold(), format_number(totals.entries));
    println!(
        "  {} {}",
        style("File bytes:").bold(),
        format_size(totals.bytes, BINARY)
    );
    println!(
        "  {} {:.1}ms",
        style("Duration:").bold(),
        duration.as_secs_f64() * 1000.0
    );
    if totals.failed > 0 {
        println!(
            "  {} {}",
            style("Failed:").yellow().bold(),
            format_number(totals.failed)
        );
    }
}
