//! Job queue feeding the worker pool
//!
//! Background phases are queued as boxed closures on an unbounded
//! crossbeam channel. Submission never blocks and never drops a job;
//! when the last sender goes away the workers drain what is left and exit.

use crate::error::{PoolError, PoolResult};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A unit of background work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Statistics for the job queue
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Total jobs enqueued
    pub enqueued: AtomicU64,

    /// Total jobs dequeued by workers
    pub dequeued: AtomicU64,
}

impl QueueStats {
    /// Jobs accepted so far
    pub fn enqueued(&self) -> u64 {
        self.enqueued.load(Ordering::Relaxed)
    }

    /// Jobs picked up by a worker so far
    pub fn dequeued(&self) -> u64 {
        self.dequeued.load(Ordering::Relaxed)
    }
}

/// Job queue shared between the pool owner and its workers
pub struct JobQueue {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    stats: Arc<QueueStats>,
}

impl JobQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();

        Self {
            sender,
            receiver,
            stats: Arc::new(QueueStats::default()),
        }
    }

    /// Get a receiver for this queue (clone for each worker)
    pub fn receiver(&self) -> JobReceiver {
        JobReceiver {
            receiver: self.receiver.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Keep only the sending half. Dropping the returned sender is what
    /// closes the channel.
    pub fn into_sender(self) -> JobSender {
        JobSender {
            sender: self.sender,
            stats: self.stats,
        }
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for queueing jobs
pub struct JobSender {
    sender: Sender<Job>,
    stats: Arc<QueueStats>,
}

impl JobSender {
    /// Queue a job. Fails only once every worker has gone away.
    pub fn send(&self, job: Job) -> PoolResult<()> {
        self.sender.send(job).map_err(|_| PoolError::ShutDown)?;
        self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Queue statistics
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

/// Handle for taking jobs off the queue
#[derive(Clone)]
pub struct JobReceiver {
    receiver: Receiver<Job>,
    stats: Arc<QueueStats>,
}

impl JobReceiver {
    /// Block until a job is available. `None` once the queue is closed and drained.
    pub fn recv(&self) -> Option<Job> {
        let job = self.receiver.recv().ok()?;
        self.stats.dequeued.fetch_add(1, Ordering::Relaxed);
        Some(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_queue_basic() {
        let queue = JobQueue::new();
        let receiver = queue.receiver();
        let sender = queue.into_sender();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        sender
            .send(Box::new(move || flag.store(true, Ordering::SeqCst)))
            .unwrap();

        let job = receiver.recv().unwrap();
        job();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_queue_stats() {
        let queue = JobQueue::new();
        let receiver = queue.receiver();
        let sender = queue.into_sender();

        sender.send(Box::new(|| {})).unwrap();
        sender.send(Box::new(|| {})).unwrap();
        receiver.recv().unwrap();

        assert_eq!(sender.stats().enqueued(), 2);
        assert_eq!(sender.stats().dequeued(), 1);
    }

    #[test]
    fn test_closed_queue_drains_then_ends() {
        let queue = JobQueue::new();
        let receiver = queue.receiver();
        let sender = queue.into_sender();

        sender.send(Box::new(|| {})).unwrap();
        drop(sender);

        assert!(receiver.recv().is_some());
        assert!(receiver.recv().is_none());
    }

    #[test]
    fn test_send_after_workers_gone() {
        // The queue's own receiver is dropped here and no worker holds one.
        let sender = JobQueue::new().into_sender();
        assert!(matches!(sender.send(Box::new(|| {})), Err(PoolError::ShutDown)));
        assert_eq!(sender.stats().enqueued(), 0);
    }
}
