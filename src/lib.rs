#![deny(missing_docs)]

//! A fixed-capacity worker thread pool.
//!
//! Workers are long-lived OS threads created up front. Each one runs a
//! single job at a time, handed over through its own mutex and condition
//! variable pair. There is no job queue, so when every worker is busy
//! the caller is told so and retries on its own terms.
//!
//! The typical cycle: create a [`ThreadPool`], pick up an idle worker
//! with [`ThreadPool::acquire`], block on its completion with
//! [`ThreadPool::wait`], and drop the pool to stop and join every
//! worker.

mod error;
mod pool;
mod worker;

pub use error::{PoolError, Result};
pub use pool::{ThreadPool, WorkerId};
