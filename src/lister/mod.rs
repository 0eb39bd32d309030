//! Asynchronous listing pipeline
//!
//! # Architecture
//!
//! ```text
//!   caller thread                         worker threads
//! ┌───────────────────────┐            ┌──────────────────────────┐
//! │ ListingCoordinator    │  JobQueue  │ Worker 1 .. Worker N     │
//! │  submit(path, cb) ────┼──(job)────►│  opendir/readdir, sort   │
//! │  pending: id -> cb    │            │  stat each entry         │
//! │                       │ completion │  classify d_type         │
//! │  dispatch / run ◄─────┼─(request)──┤                          │
//! │   cb(Ok|Err) once     │            └──────────────────────────┘
//! └───────────────────────┘
//! ```
//!
//! The request record is moved along the arrows; it is never shared.

pub mod coordinator;
pub mod pool;
pub mod queue;
pub mod request;

pub use coordinator::{CoordinatorStats, ListingCoordinator};
pub use pool::WorkerPool;
pub use request::{CompletionHandler, ListingRequest, RequestId, RequestState};
