//! Listing requests and their lifecycle
//!
//! ```text
//! Submitted ──► Validated ──┬──► Rejected
//!                           └──► Scheduled ──► Running ──┬──► Completed ──┐
//!                                                        └──► Failed ─────┴──► Delivered ──► Disposed
//! ```
//!
//! A `ListingRequest` is moved, never shared: the coordinator builds it,
//! a worker owns it while scanning, and it comes back over the completion
//! channel for delivery. The caller's handler never leaves the
//! coordinator, which keeps it on the originating thread.

use crate::dirent::DirEntryInfo;
use crate::error::ListError;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of a submitted request
pub type RequestId = u64;

/// One-shot continuation receiving the outcome of a listing
pub type CompletionHandler = Box<dyn FnOnce(Result<Vec<DirEntryInfo>, ListError>)>;

/// Lifecycle state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    Submitted,
    Validated,
    Rejected,
    Scheduled,
    Running,
    Completed,
    Failed,
    Delivered,
    Disposed,
}

impl RequestState {
    /// Whether `self -> next` is an edge of the lifecycle
    pub fn can_transition_to(self, next: RequestState) -> bool {
        use RequestState::*;

        matches!(
            (self, next),
            (Submitted, Validated)
                | (Submitted, Rejected)
                | (Validated, Rejected)
                | (Validated, Scheduled)
                | (Scheduled, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Completed, Delivered)
                | (Failed, Delivered)
                | (Delivered, Disposed)
        )
    }

    /// True for states with no outgoing edge
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Rejected | RequestState::Disposed)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Attempted a transition that is not an edge of the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal request transition {from} -> {to}")]
pub struct TransitionError {
    pub from: RequestState,
    pub to: RequestState,
}

/// One in-flight directory listing
#[derive(Debug)]
pub struct ListingRequest {
    id: RequestId,
    path: PathBuf,
    state: RequestState,
    entries: Vec<DirEntryInfo>,
    error: Option<ListError>,
}

impl ListingRequest {
    /// Create a request in the `Submitted` state. The path is copied.
    pub fn new(id: RequestId, path: impl AsRef<Path>) -> Self {
        Self {
            id,
            path: path.as_ref().to_path_buf(),
            state: RequestState::Submitted,
            entries: Vec::new(),
            error: None,
        }
    }

    /// Request id
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Directory being listed
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current lifecycle state
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Move along one edge of the lifecycle
    pub fn transition(&mut self, next: RequestState) -> Result<(), TransitionError> {
        if self.state.can_transition_to(next) {
            self.state = next;
            Ok(())
        } else {
            Err(TransitionError {
                from: self.state,
                to: next,
            })
        }
    }

    /// Record a successful scan (`Running -> Completed`)
    pub fn complete(&mut self, entries: Vec<DirEntryInfo>) -> Result<(), TransitionError> {
        self.transition(RequestState::Completed)?;
        self.entries = entries;
        Ok(())
    }

    /// Record a failed scan (`Running -> Failed`). No entries are kept.
    pub fn fail(&mut self, error: ListError) -> Result<(), TransitionError> {
        self.transition(RequestState::Failed)?;
        self.entries.clear();
        self.error = Some(error);
        Ok(())
    }

    /// Take the outcome for delivery (`Completed | Failed -> Delivered`)
    pub fn take_outcome(&mut self) -> Result<Result<Vec<DirEntryInfo>, ListError>, TransitionError> {
        let finished = self.state;
        self.transition(RequestState::Delivered)?;

        let outcome = match (finished, self.error.take()) {
            (RequestState::Failed, Some(error)) => Err(error),
            (RequestState::Failed, None) => Err(ListError::Aborted {
                path: self.path.clone(),
                message: "failed without an error".into(),
            }),
            _ => Ok(std::mem::take(&mut self.entries)),
        };

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirent::EntryType;
    use std::io;
    use RequestState::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut req = ListingRequest::new(1, "/tmp");
        req.transition(Validated).unwrap();
        req.transition(Scheduled).unwrap();
        req.transition(Running).unwrap();
        req.complete(vec![DirEntryInfo::new("a", EntryType::Regular, 1)])
            .unwrap();
        let outcome = req.take_outcome().unwrap();
        assert_eq!(outcome.unwrap().len(), 1);
        assert_eq!(req.state(), Delivered);

        req.transition(Disposed).unwrap();
        assert!(req.state().is_terminal());
    }

    #[test]
    fn test_failure_path_has_no_entries() {
        let mut req = ListingRequest::new(2, "/missing");
        req.transition(Validated).unwrap();
        req.transition(Scheduled).unwrap();
        req.transition(Running).unwrap();
        req.fail(ListError::Enumeration {
            path: "/missing".into(),
            source: io::Error::from(io::ErrorKind::NotFound),
        })
        .unwrap();

        let outcome = req.take_outcome().unwrap();
        assert!(matches!(outcome, Err(ListError::Enumeration { .. })));
    }

    #[test]
    fn test_redelivery_is_rejected() {
        let mut req = ListingRequest::new(3, "/tmp");
        req.transition(Validated).unwrap();
        req.transition(Scheduled).unwrap();
        req.transition(Running).unwrap();
        req.complete(Vec::new()).unwrap();
        req.take_outcome().unwrap().unwrap();

        let err = req.take_outcome().unwrap_err();
        assert_eq!(err, TransitionError { from: Delivered, to: Delivered });
    }

    #[test]
    fn test_cannot_skip_states() {
        let mut req = ListingRequest::new(4, "/tmp");
        assert!(req.transition(Running).is_err());
        assert!(req.complete(Vec::new()).is_err());
        assert!(req.take_outcome().is_err());

        req.transition(Rejected).unwrap();
        assert!(req.state().is_terminal());
        assert!(req.transition(Scheduled).is_err());
    }

    #[test]
    fn test_every_state_has_a_single_path_forward() {
        let all = [
            Submitted, Validated, Rejected, Scheduled, Running, Completed, Failed, Delivered,
            Disposed,
        ];
        for state in all {
            let next: Vec<_> = all.iter().filter(|n| state.can_transition_to(**n)).collect();
            if state.is_terminal() {
                assert!(next.is_empty(), "{state} should be terminal");
            } else {
                assert!(!next.is_empty(), "{state} should have a successor");
            }
        }
    }
}
