//! Listing coordinator - the caller-side half of the pipeline
//!
//! The coordinator is responsible for:
//! - Validating submissions synchronously
//! - Handing each request to the worker pool
//! - Receiving finished requests on the completion channel
//! - Invoking each handler exactly once, on the thread that drives it
//!
//! The coordinator is the caller's execution context. It holds handlers
//! that need not be `Send`, so it stays on the thread that created it;
//! completions are only delivered from `dispatch_pending`,
//! `run_until_idle` and friends, never from a worker.

use crate::config::ListerConfig;
use crate::dirent::{DirEntryInfo, DirectoryScanner, FsScanner};
use crate::error::{panic_message, ListError, Result};
use crate::lister::pool::WorkerPool;
use crate::lister::request::{CompletionHandler, ListingRequest, RequestId, RequestState};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};

/// Counters for requests seen by one coordinator
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorStats {
    /// Requests accepted and scheduled
    pub scheduled: u64,

    /// Requests rejected at submission
    pub rejected: u64,

    /// Successful listings delivered
    pub completed: u64,

    /// Failed listings delivered
    pub failed: u64,
}

impl CoordinatorStats {
    /// Requests whose handler has run
    pub fn delivered(&self) -> u64 {
        self.completed + self.failed
    }
}

/// Coordinates background listings and delivers their results
pub struct ListingCoordinator<S: DirectoryScanner = FsScanner> {
    /// Pool running background phases
    pool: Arc<WorkerPool>,

    /// Blocking scan primitive
    scanner: Arc<S>,

    /// Cloned into each job; finished requests come back on `completions`
    completion_tx: Sender<ListingRequest>,
    completions: Receiver<ListingRequest>,

    /// Handlers of in-flight requests
    pending: HashMap<RequestId, CompletionHandler>,

    next_id: RequestId,
    stats: CoordinatorStats,
}

impl ListingCoordinator<FsScanner> {
    /// Coordinator with its own pool sized from `config`
    pub fn new(config: &ListerConfig) -> Result<Self> {
        let pool = WorkerPool::from_config(config)?;
        Ok(Self::with_scanner(Arc::new(pool), FsScanner))
    }

    /// Coordinator on the process-wide shared pool
    pub fn shared() -> Result<Self> {
        Ok(Self::with_scanner(WorkerPool::shared()?, FsScanner))
    }
}

impl<S: DirectoryScanner> ListingCoordinator<S> {
    /// Coordinator on `pool` using a custom scanner
    pub fn with_scanner(pool: Arc<WorkerPool>, scanner: S) -> Self {
        let (completion_tx, completions) = unbounded();
        debug!(workers = pool.worker_count(), "Coordinator attached to worker pool");

        Self {
            pool,
            scanner: Arc::new(scanner),
            completion_tx,
            completions,
            pending: HashMap::new(),
            next_id: 1,
            stats: CoordinatorStats::default(),
        }
    }

    /// Submit a listing of `path`.
    ///
    /// Returns immediately. Malformed input fails here with
    /// `InvalidArgument` and `handler` is dropped without being called;
    /// otherwise `handler` runs exactly once from a later dispatch call.
    pub fn submit<P, F>(&mut self, path: P, handler: F) -> Result<RequestId>
    where
        P: AsRef<Path>,
        F: FnOnce(Result<Vec<DirEntryInfo>>) + 'static,
    {
        self.submit_boxed(path.as_ref(), Box::new(handler))
    }

    /// `submit` with an already boxed handler
    pub fn submit_boxed(&mut self, path: &Path, handler: CompletionHandler) -> Result<RequestId> {
        let id = self.next_id;
        self.next_id += 1;

        let mut request = ListingRequest::new(id, path);

        if let Err(reason) = validate_path(path) {
            self.reject(&mut request, &reason);
            return Err(ListError::invalid_argument(reason));
        }
        advance(&mut request, RequestState::Validated);
        advance(&mut request, RequestState::Scheduled);

        let job = background_job(request, Arc::clone(&self.scanner), self.completion_tx.clone());

        if let Err(e) = self.pool.execute(job) {
            // The job (and the request inside it) was handed back and dropped.
            self.stats.rejected += 1;
            warn!(request = id, error = %e, "Worker pool refused request");
            return Err(e.into());
        }

        self.pending.insert(id, handler);
        self.stats.scheduled += 1;
        debug!(request = id, path = %path.display(), "Listing scheduled");

        Ok(id)
    }

    /// Deliver every completion that is already available. Never blocks.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(request) = self.completions.try_recv() {
            self.deliver(request);
            delivered += 1;
        }
        delivered
    }

    /// Block until one completion arrives (or `timeout` passes) and deliver it
    pub fn dispatch_one(&mut self, timeout: Duration) -> bool {
        if self.pending.is_empty() {
            return false;
        }

        match self.completions.recv_timeout(timeout) {
            Ok(request) => {
                self.deliver(request);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Deliver completions until nothing is in flight
    pub fn run_until_idle(&mut self) -> usize {
        let mut delivered = 0;
        while !self.pending.is_empty() {
            match self.completions.recv() {
                Ok(request) => {
                    self.deliver(request);
                    delivered += 1;
                }
                // Unreachable while we hold `completion_tx`.
                Err(_) => break,
            }
        }
        delivered
    }

    /// Like `run_until_idle`, giving up after `timeout`. Returns whether
    /// everything in flight was delivered.
    pub fn run_until_idle_timeout(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        while !self.pending.is_empty() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.dispatch_one(remaining) {
                return self.pending.is_empty();
            }
        }
        true
    }

    /// Requests submitted but not yet delivered
    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Request counters
    pub fn stats(&self) -> CoordinatorStats {
        self.stats
    }

    fn reject(&mut self, request: &mut ListingRequest, reason: &str) {
        advance(request, RequestState::Rejected);
        self.stats.rejected += 1;
        debug!(request = request.id(), reason = reason, "Listing rejected");
    }

    /// Completion phase: hand the outcome to the handler exactly once
    fn deliver(&mut self, mut request: ListingRequest) {
        let id = request.id();

        let Some(handler) = self.pending.remove(&id) else {
            warn!(request = id, "Completion for unknown request dropped");
            return;
        };

        let outcome = match request.take_outcome() {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(request = id, error = %e, "Request reached delivery in the wrong state");
                Err(ListError::Aborted {
                    path: request.path().to_path_buf(),
                    message: e.to_string(),
                })
            }
        };

        match &outcome {
            Ok(entries) => {
                self.stats.completed += 1;
                trace!(request = id, entries = entries.len(), "Delivering listing");
            }
            Err(e) => {
                self.stats.failed += 1;
                debug!(request = id, error = %e, "Delivering failure");
            }
        }

        let result = panic::catch_unwind(AssertUnwindSafe(move || handler(outcome)));

        // The request (path copy, entries) goes away whether or not the handler panicked.
        if request.state() == RequestState::Delivered {
            advance(&mut request, RequestState::Disposed);
        }
        drop(request);

        if let Err(payload) = result {
            let fault = ListError::DeliveryFault {
                request: id,
                message: panic_message(payload.as_ref()),
            };
            error!(error = %fault, "Completion handler faulted");
            panic::resume_unwind(payload);
        }
    }
}

impl<S: DirectoryScanner> Drop for ListingCoordinator<S> {
    fn drop(&mut self) {
        // Like an event loop that stays alive while work is pending.
        if !self.pending.is_empty() && !std::thread::panicking() {
            debug!(in_flight = self.pending.len(), "Draining before shutdown");
            self.run_until_idle();
        }
    }
}

/// Synchronous path checks
fn validate_path(path: &Path) -> std::result::Result<(), String> {
    use std::os::unix::ffi::OsStrExt;

    let bytes = path.as_os_str().as_bytes();
    if bytes.is_empty() {
        return Err("path must not be empty".into());
    }
    if bytes.contains(&0) {
        return Err("path must not contain NUL bytes".into());
    }
    Ok(())
}

/// Apply a transition the coordinator knows to be legal
fn advance(request: &mut ListingRequest, next: RequestState) {
    if let Err(e) = request.transition(next) {
        error!(request = request.id(), error = %e, "Request state machine violated");
    }
}

/// Build the background phase for `request`
fn background_job<S: DirectoryScanner>(
    mut request: ListingRequest,
    scanner: Arc<S>,
    completion_tx: Sender<ListingRequest>,
) -> Box<dyn FnOnce() + Send + 'static> {
    Box::new(move || {
        advance(&mut request, RequestState::Running);

        let scanned = panic::catch_unwind(AssertUnwindSafe(|| scanner.scan(request.path())));

        let recorded = match scanned {
            Ok(Ok(entries)) => request.complete(entries),
            Ok(Err(source)) => {
                debug!(request = request.id(), path = %request.path().display(), error = %source, "Directory scan failed");
                let path = request.path().to_path_buf();
                request.fail(ListError::Enumeration { path, source })
            }
            Err(payload) => {
                let path = request.path().to_path_buf();
                request.fail(ListError::Aborted {
                    path,
                    message: panic_message(payload.as_ref()),
                })
            }
        };
        if let Err(e) = recorded {
            error!(request = request.id(), error = %e, "Request state machine violated");
        }

        if completion_tx.send(request).is_err() {
            trace!("Coordinator gone, discarding listing");
        }
    })
}
