use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error};

use crate::error::{PoolError, Result};
use crate::pool::WorkerId;

/// A unit of work handed to a worker.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    /// Terminal: the thread has exited or is about to.
    Stopped,
    /// Idle, ready to be handed a job.
    Waiting,
    /// Executing an assigned job.
    Running,
}

/// The mutable half of a worker: lifecycle state plus the job slot,
/// guarded together by one mutex. The slot is populated only for the
/// Waiting -> Running handoff and taken by the worker thread.
struct Slot {
    state: State,
    job: Option<Job>,
}

/// State shared between a worker's OS thread and the pool.
///
/// All transitions happen under `slot`'s mutex; `cond` is notified in
/// both directions (job handoff and completion).
pub(crate) struct WorkerState {
    slot: Mutex<Slot>,
    cond: Condvar,
    /// Upper bound for a single condvar wait. When set, the worker and
    /// completion loops wake periodically instead of blocking forever.
    poll_interval: Option<Duration>,
}

impl WorkerState {
    /// Jobs run outside the lock and panics are contained, so poisoning
    /// can only come from the pool's own code.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One condvar wait, bounded by the poll interval when configured.
    fn block<'a>(&'a self, guard: MutexGuard<'a, Slot>) -> MutexGuard<'a, Slot> {
        match self.poll_interval {
            Some(interval) => {
                self.cond
                    .wait_timeout(guard, interval)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
            None => self.cond.wait(guard).unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Claims this worker for a job if it is idle.
    ///
    /// The check-and-set runs under the worker's mutex, so two racing
    /// callers can never both win the same worker. On refusal the job is
    /// handed back untouched.
    pub(crate) fn try_assign(&self, job: Job) -> std::result::Result<(), Job> {
        let mut slot = self.lock();
        if slot.state != State::Waiting {
            return Err(job);
        }
        slot.job = Some(job);
        slot.state = State::Running;
        drop(slot);
        self.cond.notify_all();
        Ok(())
    }

    /// Blocks until this worker is no longer running.
    ///
    /// Returns `Ok` if the worker went back to idle (the job completed)
    /// and `Err(Stopped)` if the pool was torn down in the meantime.
    pub(crate) fn await_idle(&self) -> Result<()> {
        let mut slot = self.lock();
        while slot.state == State::Running {
            slot = self.block(slot);
        }
        if slot.state == State::Stopped {
            Err(PoolError::Stopped)
        } else {
            Ok(())
        }
    }

    /// Reports whether this worker is currently executing a job.
    pub(crate) fn is_running(&self) -> bool {
        self.lock().state == State::Running
    }

    /// Moves this worker to the terminal state and wakes its thread and
    /// any completion waiters. Stopped is sticky: the run loop never
    /// transitions out of it.
    pub(crate) fn signal_stop(&self) {
        self.lock().state = State::Stopped;
        self.cond.notify_all();
    }
}

/// A pool-owned worker record: one long-lived OS thread plus the state
/// shared with it.
pub(crate) struct Worker {
    id: WorkerId,
    state: Arc<WorkerState>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Creates the shared state with the worker already Waiting, then
    /// starts the backing thread.
    pub(crate) fn spawn(id: WorkerId, poll_interval: Option<Duration>) -> io::Result<Worker> {
        let state = Arc::new(WorkerState {
            slot: Mutex::new(Slot {
                state: State::Waiting,
                job: None,
            }),
            cond: Condvar::new(),
            poll_interval,
        });

        let handle = {
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name(format!("pool-worker-{id}"))
                .spawn(move || run(id, &state))?
        };

        Ok(Worker {
            id,
            state,
            handle: Some(handle),
        })
    }

    pub(crate) fn id(&self) -> WorkerId {
        self.id
    }

    /// The state cell shared with the worker thread. Callers clone the
    /// `Arc` when they need to block without pinning the pool's lock.
    pub(crate) fn state(&self) -> &Arc<WorkerState> {
        &self.state
    }

    /// Joins the backing thread, consuming the handle; a second call is
    /// a no-op.
    pub(crate) fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Worker {} thread panicked", self.id);
            }
        }
    }
}

/// The worker run loop: block while idle, run the assigned job, go back
/// to idle, repeat until stopped.
fn run(id: WorkerId, state: &WorkerState) {
    debug!("Worker {id} started");
    loop {
        let mut slot = state.lock();
        while slot.state == State::Waiting {
            slot = state.block(slot);
        }
        if slot.state == State::Stopped {
            break;
        }
        let job = slot.job.take();
        drop(slot);

        if let Some(job) = job {
            debug!("Worker {id} executing job");
            // Catch panics so the worker survives a failing job
            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                error!("Worker {id} job panicked");
            }
        }

        let mut slot = state.lock();
        let stopping = slot.state == State::Stopped;
        if !stopping {
            slot.state = State::Waiting;
        }
        drop(slot);
        state.cond.notify_all();
        if stopping {
            break;
        }
    }
    debug!("Worker {id} stopped");
}
