//! Fixed-size worker pool for blocking filesystem work
//!
//! Each worker:
//! - Pulls jobs from the shared job queue
//! - Runs each job to completion on its own thread
//! - Survives a panicking job (the panic is counted and logged)
//! - Exits once the queue is closed and drained

use crate::config::ListerConfig;
use crate::error::{panic_message, PoolError, PoolResult};
use crate::lister::queue::{Job, JobQueue, JobReceiver, JobSender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

static SHARED_POOL: OnceLock<Arc<WorkerPool>> = OnceLock::new();

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Jobs run to completion
    pub jobs_run: AtomicU64,

    /// Jobs that panicked
    pub jobs_panicked: AtomicU64,
}

impl WorkerStats {
    fn record_run(&self) {
        self.jobs_run.fetch_add(1, Ordering::Relaxed);
    }

    fn record_panic(&self) {
        self.jobs_panicked.fetch_add(1, Ordering::Relaxed);
    }
}

/// A worker thread that runs queued jobs
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(id: usize, jobs: JobReceiver) -> PoolResult<Self> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("readdirinfo-{}", id))
            .spawn(move || worker_loop(id, jobs, stats_clone))
            .map_err(|e| PoolError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Wait for the worker to finish. Stats stay readable afterwards.
    pub fn join(&mut self) -> PoolResult<()> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|payload| PoolError::Panicked {
                id: self.id,
                message: panic_message(payload.as_ref()),
            }),
            None => Ok(()),
        }
    }
}

/// Main worker loop
fn worker_loop(id: usize, jobs: JobReceiver, stats: Arc<WorkerStats>) {
    debug!(worker = id, "Worker starting");

    while let Some(job) = jobs.recv() {
        run_job(id, job, &stats);
    }

    debug!(
        worker = id,
        jobs = stats.jobs_run.load(Ordering::Relaxed),
        "Worker shutting down"
    );
}

/// Run one job, keeping the worker alive if it panics
fn run_job(id: usize, job: Job, stats: &WorkerStats) {
    match panic::catch_unwind(AssertUnwindSafe(job)) {
        Ok(()) => {
            stats.record_run();
            trace!(worker = id, "Job finished");
        }
        Err(payload) => {
            stats.record_panic();
            error!(
                worker = id,
                message = %panic_message(payload.as_ref()),
                "Job panicked"
            );
        }
    }
}

/// Aggregate (jobs run, jobs panicked) over a set of workers
pub fn aggregate_stats(workers: &[Worker]) -> (u64, u64) {
    workers.iter().fold((0, 0), |(run, panicked), worker| {
        (
            run + worker.stats.jobs_run.load(Ordering::Relaxed),
            panicked + worker.stats.jobs_panicked.load(Ordering::Relaxed),
        )
    })
}

/// A bounded set of worker threads sharing one job queue
pub struct WorkerPool {
    /// Job sender; `None` once the pool is shutting down
    sender: Option<JobSender>,

    /// Worker threads
    workers: Vec<Worker>,
}

impl WorkerPool {
    /// Spawn a pool of `worker_count` threads
    pub fn new(worker_count: usize) -> PoolResult<Self> {
        let queue = JobQueue::new();
        let workers = (0..worker_count.max(1))
            .map(|id| Worker::spawn(id, queue.receiver()))
            .collect::<PoolResult<Vec<_>>>()?;

        let sender = queue.into_sender();

        info!(workers = workers.len(), "Worker pool started");

        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    /// Spawn a pool sized from configuration
    pub fn from_config(config: &ListerConfig) -> PoolResult<Self> {
        Self::new(config.worker_count)
    }

    /// The process-wide pool, started on first use with the default configuration.
    ///
    /// It lives until process exit and is never shut down.
    pub fn shared() -> PoolResult<Arc<WorkerPool>> {
        if let Some(pool) = SHARED_POOL.get() {
            return Ok(Arc::clone(pool));
        }

        let pool = Arc::new(WorkerPool::from_config(&ListerConfig::default())?);
        // If another thread won the race, our pool is dropped (and drained) here.
        Ok(Arc::clone(SHARED_POOL.get_or_init(|| pool)))
    }

    /// Queue a job. Never blocks.
    pub fn execute(&self, job: Job) -> PoolResult<()> {
        match &self.sender {
            Some(sender) => sender.send(job),
            None => Err(PoolError::ShutDown),
        }
    }

    /// Number of worker threads
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stop accepting jobs, let workers drain the queue, and join them
    pub fn shutdown(mut self) -> PoolResult<()> {
        self.drain_and_join()
    }

    fn drain_and_join(&mut self) -> PoolResult<()> {
        // Closing the channel lets workers finish the backlog and exit.
        let queued = self.sender.take().map(|s| s.stats().enqueued()).unwrap_or(0);

        let mut workers = std::mem::take(&mut self.workers);
        let mut first_err = None;

        for worker in &mut workers {
            if let Err(e) = worker.join() {
                warn!(error = %e, "Worker failed to join cleanly");
                first_err.get_or_insert(e);
            }
        }

        let (run, panicked) = aggregate_stats(&workers);
        info!(queued = queued, jobs = run, panicked = panicked, "Worker pool stopped");
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            let _ = self.drain_and_join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use std::collections::HashSet;
    use std::time::Duration;

    #[test]
    fn test_worker_stats() {
        let stats = WorkerStats::default();
        stats.record_run();
        stats.record_run();
        stats.record_panic();

        assert_eq!(stats.jobs_run.load(Ordering::Relaxed), 2);
        assert_eq!(stats.jobs_panicked.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_pool_runs_every_job() {
        let pool = WorkerPool::new(3).unwrap();
        let (tx, rx) = unbounded();

        for i in 0..50 {
            let tx = tx.clone();
            pool.execute(Box::new(move || tx.send(i).unwrap())).unwrap();
        }

        let seen: HashSet<i32> = (0..50)
            .map(|_| rx.recv_timeout(Duration::from_secs(10)).unwrap())
            .collect();
        assert_eq!(seen.len(), 50);
        pool.shutdown().unwrap();
    }

    #[test]
    fn test_jobs_run_on_named_threads() {
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = unbounded();

        pool.execute(Box::new(move || {
            let name = thread::current().name().map(str::to_string);
            tx.send(name).unwrap();
        }))
        .unwrap();

        let name = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(name.as_deref(), Some("readdirinfo-0"));
    }

    #[test]
    fn test_panicking_job_does_not_kill_worker() {
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = unbounded();

        pool.execute(Box::new(|| panic!("scanner defect"))).unwrap();
        pool.execute(Box::new(move || tx.send(()).unwrap())).unwrap();

        rx.recv_timeout(Duration::from_secs(10)).unwrap();
        pool.shutdown().unwrap();
    }

    #[test]
    fn test_shutdown_drains_backlog() {
        let pool = WorkerPool::new(1).unwrap();
        let (tx, rx) = unbounded();

        for i in 0..20 {
            let tx = tx.clone();
            pool.execute(Box::new(move || {
                thread::sleep(Duration::from_millis(1));
                tx.send(i).unwrap();
            }))
            .unwrap();
        }
        drop(tx);

        pool.shutdown().unwrap();
        assert_eq!(rx.iter().count(), 20);
    }

    #[test]
    fn test_stats_aggregate_after_join() {
        let queue = JobQueue::new();
        let mut workers: Vec<Worker> = (0..2)
            .map(|id| Worker::spawn(id, queue.receiver()).unwrap())
            .collect();
        let sender = queue.into_sender();

        for _ in 0..5 {
            sender.send(Box::new(|| {})).unwrap();
        }
        sender.send(Box::new(|| panic!("bad job"))).unwrap();
        drop(sender);

        for worker in &mut workers {
            worker.join().unwrap();
        }
        assert_eq!(aggregate_stats(&workers), (5, 1));
    }

    #[test]
    fn test_zero_workers_is_clamped() {
        let pool = WorkerPool::new(0).unwrap();
        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn test_shared_pool_is_reused() {
        let a = WorkerPool::shared().unwrap();
        let b = WorkerPool::shared().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
