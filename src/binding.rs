//! Dynamic call boundary: `listDirectory(path, callback)`
//!
//! Hosts that marshal arguments as loosely typed values (a scripting
//! runtime, an RPC layer) call through here. Arguments are checked in
//! order and any mismatch is an immediate `InvalidArgument`; the callback
//! is never invoked for such calls and nothing is scheduled.

use crate::dirent::{DirEntryInfo, DirectoryScanner};
use crate::error::{ListError, Result};
use crate::lister::{CompletionHandler, ListingCoordinator, RequestId};
use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// A loosely typed argument as received from the host
pub enum Argument {
    Str(String),
    Number(f64),
    Bool(bool),
    Null,
    Callback(CompletionHandler),
}

impl Argument {
    /// Wrap a closure as a callback argument
    pub fn callback<F>(f: F) -> Self
    where
        F: FnOnce(Result<Vec<DirEntryInfo>>) + 'static,
    {
        Argument::Callback(Box::new(f))
    }

    /// Name of the argument's type, for messages
    pub fn kind(&self) -> &'static str {
        match self {
            Argument::Str(_) => "string",
            Argument::Number(_) => "number",
            Argument::Bool(_) => "boolean",
            Argument::Null => "null",
            Argument::Callback(_) => "function",
        }
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Argument::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Argument::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Argument::Null => f.write_str("Null"),
            Argument::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<&str> for Argument {
    fn from(s: &str) -> Self {
        Argument::Str(s.to_string())
    }
}

impl From<String> for Argument {
    fn from(s: String) -> Self {
        Argument::Str(s)
    }
}

/// `listDirectory(path, callback)`.
///
/// Extra trailing arguments are ignored, as a host function would.
pub fn list_directory<S: DirectoryScanner>(
    coordinator: &mut ListingCoordinator<S>,
    args: Vec<Argument>,
) -> Result<RequestId> {
    let mut args = args.into_iter();
    let (Some(path), Some(callback)) = (args.next(), args.next()) else {
        return Err(ListError::invalid_argument(
            "You must provide a path and a callback",
        ));
    };

    let Argument::Str(path) = path else {
        debug!(got = path.kind(), "Rejected listDirectory call");
        return Err(ListError::invalid_argument("path must be a string"));
    };

    let Argument::Callback(callback) = callback else {
        debug!(got = callback.kind(), "Rejected listDirectory call");
        return Err(ListError::invalid_argument("callback must be a function"));
    };

    coordinator.submit_boxed(Path::new(&path), callback)
}

/// List `path` and wait for the result on the calling thread.
///
/// Runs through the shared pool like any other request; convenient for
/// callers with nothing else to do meanwhile.
pub fn list_directory_sync(path: impl AsRef<Path>) -> Result<Vec<DirEntryInfo>> {
    let mut coordinator = ListingCoordinator::shared()?;
    let slot: Rc<RefCell<Option<Result<Vec<DirEntryInfo>>>>> = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&slot);

    coordinator.submit(path, move |outcome| {
        *sink.borrow_mut() = Some(outcome);
    })?;
    coordinator.run_until_idle();

    let outcome = slot.borrow_mut().take();
    outcome.unwrap_or_else(|| {
        Err(ListError::Aborted {
            path: Default::default(),
            message: "no completion delivered".into(),
        })
    })
}
