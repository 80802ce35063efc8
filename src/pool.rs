use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use log::debug;

use crate::error::{PoolError, Result};
use crate::worker::{Job, Worker};

/// Identifier of a worker within its pool.
///
/// Ids are assigned sequentially from 0 as workers are added and stay
/// stable for the lifetime of the pool.
pub type WorkerId = usize;

/// A fixed-capacity pool of long-lived worker threads.
///
/// Every worker is created up front and runs one job at a time; there is
/// no job queue. [`acquire`](ThreadPool::acquire) hands a job to the
/// first idle worker and returns its id, or `None` when all workers are
/// busy — backpressure and retries belong to the caller.
/// [`wait`](ThreadPool::wait) then blocks until that worker finishes.
///
/// Dropping the pool stops every worker and joins its thread; a job
/// that never returns blocks teardown.
pub struct ThreadPool {
    /// Worker records indexed by id. The write lock serializes topology
    /// changes (grow, shutdown); all other operations only read the
    /// vector to reach a worker's own state.
    workers: RwLock<Vec<Worker>>,
    /// Condvar wait bound handed to every worker; `None` blocks
    /// indefinitely.
    poll_interval: Option<Duration>,
}

impl ThreadPool {
    /// Creates a pool with the given number of workers.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to create a worker thread.
    /// Workers already started are torn down when the partial pool is
    /// dropped.
    pub fn new(initial: usize) -> Result<ThreadPool> {
        Self::build(initial, None)
    }

    /// Creates a pool with one worker per logical CPU.
    ///
    /// # Errors
    ///
    /// Same as [`new`](ThreadPool::new).
    pub fn with_cpus() -> Result<ThreadPool> {
        Self::build(num_cpus::get(), None)
    }

    /// Creates a pool whose workers wake periodically instead of
    /// blocking forever on their condition variable.
    ///
    /// This is a liveness policy, not a correctness requirement: the
    /// pool behaves identically, the bounded wait only puts a ceiling
    /// on how long a missed wakeup could go unnoticed.
    ///
    /// # Errors
    ///
    /// Same as [`new`](ThreadPool::new).
    pub fn with_poll_interval(initial: usize, interval: Duration) -> Result<ThreadPool> {
        Self::build(initial, Some(interval))
    }

    fn build(initial: usize, poll_interval: Option<Duration>) -> Result<ThreadPool> {
        let pool = ThreadPool {
            workers: RwLock::new(Vec::with_capacity(initial)),
            poll_interval,
        };
        for _ in 0..initial {
            pool.grow()?;
        }
        Ok(pool)
    }

    /// Adds one worker to the pool and returns its id.
    ///
    /// The new worker starts idle and becomes the first candidate for
    /// subsequent [`acquire`](ThreadPool::acquire) calls.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS refuses to create the thread; the
    /// pool keeps its existing workers and no record is added.
    pub fn grow(&self) -> Result<WorkerId> {
        let mut workers = self.write_workers();
        let id = workers.len();
        let worker = Worker::spawn(id, self.poll_interval)?;
        workers.push(worker);
        debug!("Pool grown to {} workers", workers.len());
        Ok(id)
    }

    /// Hands a job to the first idle worker and returns its id, or
    /// `None` when every worker is busy.
    ///
    /// Non-blocking: nothing is queued, and the caller is responsible
    /// for retrying. The scan starts from the newest worker, so ids
    /// near the top of the pool are favored. The number of busy workers
    /// skipped during the scan is logged at debug level as "pressure".
    pub fn acquire<F>(&self, job: F) -> Option<WorkerId>
    where
        F: FnOnce() + Send + 'static,
    {
        let workers = self.read_workers();
        let mut job: Job = Box::new(job);
        let mut pressure = 0;
        let mut acquired = None;
        for worker in workers.iter().rev() {
            match worker.state().try_assign(job) {
                Ok(()) => {
                    acquired = Some(worker.id());
                    break;
                }
                Err(rejected) => {
                    job = rejected;
                    pressure += 1;
                }
            }
        }
        debug!("Pool pressure {pressure}");
        acquired
    }

    /// Blocks until the given worker finishes its current job.
    ///
    /// Returns immediately if the worker is idle. Spurious wakeups are
    /// absorbed by re-checking the worker's state.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownWorker`] if the pool never issued `id`;
    /// [`PoolError::Stopped`] if the pool was shut down while waiting,
    /// in which case the outcome of the in-flight job is indeterminate.
    pub fn wait(&self, id: WorkerId) -> Result<()> {
        let state = {
            let workers = self.read_workers();
            let worker = workers.get(id).ok_or(PoolError::UnknownWorker(id))?;
            Arc::clone(worker.state())
        };
        // The pool lock is released before blocking so a long-running
        // job cannot hold up grow or shutdown.
        state.await_idle()
    }

    /// Reports whether the given worker is currently executing a job.
    ///
    /// # Errors
    ///
    /// [`PoolError::UnknownWorker`] if the pool never issued `id`.
    pub fn is_running(&self, id: WorkerId) -> Result<bool> {
        let workers = self.read_workers();
        let worker = workers.get(id).ok_or(PoolError::UnknownWorker(id))?;
        Ok(worker.state().is_running())
    }

    /// Reports whether any worker is currently executing a job.
    pub fn any_running(&self) -> bool {
        self.read_workers().iter().any(|w| w.state().is_running())
    }

    /// Number of workers in the pool.
    pub fn len(&self) -> usize {
        self.read_workers().len()
    }

    /// Reports whether the pool has no workers.
    pub fn is_empty(&self) -> bool {
        self.read_workers().is_empty()
    }

    /// Stops every worker and joins its thread.
    ///
    /// Workers finish their in-flight jobs first; a job that never
    /// returns blocks this call indefinitely. All workers are signalled
    /// before any is joined, so in-flight jobs drain in parallel.
    /// Shutdown is idempotent, and dropping the pool performs the same
    /// teardown, so calling it explicitly is optional. Afterwards the
    /// pool is inert: `acquire` returns `None` and `wait` reports
    /// [`PoolError::Stopped`].
    pub fn shutdown(&self) {
        let mut workers = self.write_workers();
        for worker in workers.iter() {
            worker.state().signal_stop();
        }
        for worker in workers.iter_mut() {
            worker.join();
        }
        debug!("Pool shut down");
    }

    fn read_workers(&self) -> RwLockReadGuard<'_, Vec<Worker>> {
        self.workers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_workers(&self) -> RwLockWriteGuard<'_, Vec<Worker>> {
        self.workers.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
