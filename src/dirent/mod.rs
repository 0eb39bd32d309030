//! Directory entries: classification and the blocking scan
//!
//! ```text
//!   opendir/readdir ──► RawEntry { name, d_type } ──► sort by name
//!                                                        │
//!                       stat(dir/name) ──► size          ▼
//!                       EntryType::from_d_type ──► DirEntryInfo
//! ```

pub mod scan;
pub mod types;

pub use scan::{list_entries, DirStream, DirectoryScanner, FsScanner, RawEntry};
pub use types::{DirEntryInfo, EntryType, ParseEntryTypeError};
