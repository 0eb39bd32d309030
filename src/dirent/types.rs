//! Directory entry types and the entry classifier
//!
//! `EntryType` is the portable classification of a raw `d_type` code as
//! returned by `readdir(3)`. `DirEntryInfo` is the record handed back to
//! callers for each child of a listed directory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `DT_WHT` is only exported by libc on the BSDs; the value is shared by
/// every platform that defines it.
const DT_WHT: u8 = 14;

/// Type of directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryType {
    /// Named pipe
    #[serde(rename = "FIFO")]
    Fifo,
    /// Character device
    Character,
    /// Directory
    Directory,
    /// Block device
    Block,
    /// Regular file
    Regular,
    /// Symbolic link
    Link,
    /// Unix socket
    Socket,
    /// Union-mount whiteout
    Whiteout,
    /// Type not reported by the filesystem, or not recognised
    Unknown,
}

impl EntryType {
    /// Every label, in declaration order
    pub const ALL: [EntryType; 9] = [
        EntryType::Fifo,
        EntryType::Character,
        EntryType::Directory,
        EntryType::Block,
        EntryType::Regular,
        EntryType::Link,
        EntryType::Socket,
        EntryType::Whiteout,
        EntryType::Unknown,
    ];

    /// Classify a raw `d_type` code. Total: anything unrecognised is `Unknown`.
    pub fn from_d_type(d_type: u8) -> Self {
        match d_type {
            libc::DT_FIFO => EntryType::Fifo,
            libc::DT_CHR => EntryType::Character,
            libc::DT_DIR => EntryType::Directory,
            libc::DT_BLK => EntryType::Block,
            libc::DT_REG => EntryType::Regular,
            libc::DT_LNK => EntryType::Link,
            libc::DT_SOCK => EntryType::Socket,
            DT_WHT => EntryType::Whiteout,
            _ => EntryType::Unknown,
        }
    }

    /// The label string exposed to callers
    pub fn label(&self) -> &'static str {
        match self {
            EntryType::Fifo => "FIFO",
            EntryType::Character => "Character",
            EntryType::Directory => "Directory",
            EntryType::Block => "Block",
            EntryType::Regular => "Regular",
            EntryType::Link => "Link",
            EntryType::Socket => "Socket",
            EntryType::Whiteout => "Whiteout",
            EntryType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown entry type label '{0}'")]
pub struct ParseEntryTypeError(pub String);

impl FromStr for EntryType {
    type Err = ParseEntryTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryType::ALL
            .iter()
            .copied()
            .find(|t| t.label() == s)
            .ok_or_else(|| ParseEntryTypeError(s.to_string()))
    }
}

/// One child of a listed directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntryInfo {
    /// Base name as returned by the OS
    pub name: String,

    /// Classified entry type
    #[serde(rename = "type")]
    pub entry_type: EntryType,

    /// Size in bytes from `stat` of the full path (0 if that failed)
    pub size: u64,
}

impl DirEntryInfo {
    /// Create a new entry record
    pub fn new(name: impl Into<String>, entry_type: EntryType, size: u64) -> Self {
        Self {
            name: name.into(),
            entry_type,
            size,
        }
    }

    /// Check if this is a dot-file (hidden by convention)
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}
