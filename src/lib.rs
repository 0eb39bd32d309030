//! readdirinfo - directory listings off the caller's thread
//!
//! Lists the immediate children of a directory (name, type, size) on a
//! background worker pool and hands the result back to the caller's
//! thread exactly once.
//!
//! # Features
//!
//! - **Non-blocking submission**: `submit` validates its arguments and
//!   returns; all `opendir`/`readdir`/`stat` calls happen on workers.
//!
//! - **One-shot delivery**: each handler runs exactly once, with either
//!   the sorted entries or the error, on the thread that drives the
//!   coordinator.
//!
//! - **Best-effort sizes**: an entry whose `stat` fails is still listed,
//!   with size 0.
//!
//! # Example
//!
//! ```no_run
//! use readdirinfo::{ListerConfig, ListingCoordinator};
//!
//! let mut coordinator = ListingCoordinator::new(&ListerConfig::default())?;
//! coordinator.submit("/etc", |outcome| match outcome {
//!     Ok(entries) => {
//!         for entry in entries {
//!             println!("{} {} {}", entry.entry_type, entry.size, entry.name);
//!         }
//!     }
//!     Err(e) => eprintln!("{e}"),
//! })?;
//! coordinator.run_until_idle();
//! # Ok::<(), readdirinfo::ListError>(())
//! ```

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
compile_error!("readdirinfo needs opendir/readdir with d_type and a known errno accessor");

pub mod binding;
pub mod config;
pub mod dirent;
pub mod error;
pub mod lister;
pub mod output;

pub use binding::{list_directory, list_directory_sync, Argument};
pub use config::{CliArgs, CliConfig, ListerConfig};
pub use dirent::{DirEntryInfo, DirectoryScanner, EntryType, FsScanner};
pub use error::{ListError, PoolError, Result};
pub use lister::{ListingCoordinator, RequestId, WorkerPool};
