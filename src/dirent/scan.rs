//! Blocking directory scan
//!
//! Reads the immediate children of a directory with `opendir`/`readdir`,
//! sorts them by name, classifies each `d_type`, and resolves sizes with a
//! follow-up `stat` of the full path. Everything here blocks and is meant
//! to run on a pool worker, never on the caller's thread.

use super::types::{DirEntryInfo, EntryType};
use std::ffi::{CStr, CString, OsStr, OsString};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr::NonNull;
use tracing::{debug, trace};

/// A raw entry as returned by `readdir`, before size resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Entry name bytes
    pub name: OsString,

    /// Raw `d_type` code
    pub d_type: u8,
}

impl RawEntry {
    /// Check if this is "." or ".."
    pub fn is_special(&self) -> bool {
        let bytes = self.name.as_bytes();
        bytes == b"." || bytes == b".."
    }
}

/// An open directory stream. `closedir` runs on drop, so every exit path
/// out of a scan releases the handle.
pub struct DirStream {
    dir: NonNull<libc::DIR>,
}

// The stream is only ever used by the thread that owns it; moving it
// between threads is fine.
unsafe impl Send for DirStream {}

impl DirStream {
    /// Open a directory stream
    pub fn open(path: &Path) -> io::Result<Self> {
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "path contains a NUL byte")
        })?;

        // SAFETY: c_path is a valid NUL-terminated string for the call.
        let dir = unsafe { libc::opendir(c_path.as_ptr()) };

        NonNull::new(dir)
            .map(|dir| Self { dir })
            .ok_or_else(io::Error::last_os_error)
    }

    /// Read the next entry. `None` at end of stream.
    pub fn next_entry(&mut self) -> Option<io::Result<RawEntry>> {
        clear_errno();

        // SAFETY: self.dir is an open stream owned by this value.
        let ent = unsafe { libc::readdir(self.dir.as_ptr()) };

        if ent.is_null() {
            return read_error().map(Err);
        }

        // SAFETY: ent is valid until the next readdir/closedir on this
        // stream, and we copy out of it before either happens.
        let (name, d_type) = unsafe {
            let name = CStr::from_ptr((*ent).d_name.as_ptr());
            (OsStr::from_bytes(name.to_bytes()).to_os_string(), (*ent).d_type)
        };

        Some(Ok(RawEntry { name, d_type }))
    }

    /// Read all remaining entries, skipping "." and ".."
    pub fn read_all(&mut self) -> io::Result<Vec<RawEntry>> {
        let mut entries = Vec::new();

        while let Some(entry) = self.next_entry() {
            let entry = entry?;
            if !entry.is_special() {
                entries.push(entry);
            }
        }

        Ok(entries)
    }
}

impl Drop for DirStream {
    fn drop(&mut self) {
        // SAFETY: the stream was opened by opendir and is closed exactly once.
        unsafe {
            libc::closedir(self.dir.as_ptr());
        }
    }
}

#[cfg(target_os = "linux")]
fn clear_errno() {
    // SAFETY: __errno_location returns this thread's errno slot.
    unsafe { *libc::__errno_location() = 0 }
}

#[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
fn clear_errno() {
    // SAFETY: __errno returns this thread's errno slot.
    unsafe { *libc::__errno() = 0 }
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "dragonfly"
))]
fn clear_errno() {
    // SAFETY: __error returns this thread's errno slot.
    unsafe { *libc::__error() = 0 }
}

/// After `readdir` returns NULL, distinguish end of stream from failure
fn read_error() -> Option<io::Error> {
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(0) | None => None,
        Some(_) => Some(err),
    }
}

/// Read, filter and sort the children of `path` by name bytes.
///
/// The directory stream is closed before this returns, on success or error.
pub fn read_sorted(path: &Path) -> io::Result<Vec<RawEntry>> {
    let mut entries = {
        let mut stream = DirStream::open(path)?;
        stream.read_all()?
    };

    entries.sort_unstable_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    Ok(entries)
}

/// Size of `dir/name` from `stat` (follows symlinks). 0 if the query fails.
pub fn resolve_size(dir: &Path, name: &OsStr) -> u64 {
    let full_path = dir.join(name);

    match std::fs::metadata(&full_path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            debug!(path = %full_path.display(), error = %e, "stat failed, recording size 0");
            0
        }
    }
}

/// List `path`: scan, classify, and size every child in name order
pub fn list_entries(path: &Path) -> io::Result<Vec<DirEntryInfo>> {
    let raw = read_sorted(path)?;
    trace!(path = %path.display(), entries = raw.len(), "directory scanned");

    let entries = raw
        .into_iter()
        .map(|entry| {
            let size = resolve_size(path, &entry.name);
            DirEntryInfo {
                name: entry.name.to_string_lossy().into_owned(),
                entry_type: EntryType::from_d_type(entry.d_type),
                size,
            }
        })
        .collect();

    Ok(entries)
}

/// The blocking primitive run by workers. A seam so tests can observe
/// whether the filesystem was touched.
pub trait DirectoryScanner: Send + Sync + 'static {
    /// List the immediate children of `path`
    fn scan(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;
}

/// Scanner backed by the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FsScanner;

impl DirectoryScanner for FsScanner {
    fn scan(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        list_entries(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_sorted_skips_dot_entries() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("zebra"), b"").unwrap();
        fs::write(dir.path().join("apple"), b"").unwrap();
        fs::write(dir.path().join(".hidden"), b"").unwrap();

        let entries = read_sorted(dir.path()).unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.to_str().unwrap()).collect();

        assert_eq!(names, vec![".hidden", "apple", "zebra"]);
    }

    #[test]
    fn test_open_missing_directory() {
        let dir = tempdir().unwrap();
        let err = DirStream::open(&dir.path().join("missing")).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_open_regular_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("file.txt");
        fs::write(&file, b"data").unwrap();

        let err = DirStream::open(&file).err().unwrap();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTDIR));
    }

    #[test]
    fn test_open_rejects_nul() {
        let err = DirStream::open(Path::new("bad\0path")).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_resolve_size() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ten"), b"0123456789").unwrap();

        assert_eq!(resolve_size(dir.path(), OsStr::new("ten")), 10);
        assert_eq!(resolve_size(dir.path(), OsStr::new("gone")), 0);
    }

    #[test]
    fn test_broken_symlink_size_is_zero() {
        let dir = tempdir().unwrap();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("dangling"))
            .unwrap();

        let entries = list_entries(dir.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "dangling");
        assert_eq!(entries[0].entry_type, EntryType::Link);
        assert_eq!(entries[0].size, 0);
    }

    #[test]
    fn test_list_entries_classifies() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"0123456789").unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();

        let entries = list_entries(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], DirEntryInfo::new("a.txt", EntryType::Regular, 10));
        assert_eq!(entries[1].name, "b");
        assert_eq!(entries[1].entry_type, EntryType::Directory);
    }

    #[test]
    fn test_stale_errno_is_not_a_read_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("only"), b"").unwrap();

        let mut stream = DirStream::open(dir.path()).unwrap();
        let mut names = Vec::new();
        loop {
            // Leave a failure code behind from an unrelated call.
            let _ = fs::metadata(dir.path().join("missing"));
            match stream.next_entry() {
                Some(entry) => names.push(entry.unwrap().name),
                None => break,
            }
        }

        assert!(names.iter().any(|n| n == "only"));
    }

    #[test]
    fn test_stream_can_be_reopened_many_times() {
        // Leaking handles would eventually hit EMFILE.
        let dir = tempdir().unwrap();
        for _ in 0..4096 {
            let _ = read_sorted(dir.path()).unwrap();
            let _ = read_sorted(&dir.path().join("missing"));
        }
    }
}
