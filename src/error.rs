use std::io;
use thiserror::Error;

use crate::pool::WorkerId;

/// Error type for pool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// The OS refused to create a worker thread.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[from] io::Error),

    /// No worker with the given id exists in this pool.
    #[error("Unknown worker id {0}")]
    UnknownWorker(WorkerId),

    /// The pool was shut down while waiting on a worker; the outcome
    /// of the in-flight job is indeterminate.
    #[error("Pool stopped")]
    Stopped,
}

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
