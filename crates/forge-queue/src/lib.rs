mod durable;

pub use durable::DurableQueue;

use forge_core::WorkItem;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    /// Nothing available. Expected steady state for the consumer, not a
    /// failure.
    #[error("queue is empty")]
    Empty,

    #[error("queue is closed")]
    Closed,

    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),

    #[error("Record error: {0}")]
    RecordError(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, QueueError>;

/// Contract between the intake loop (single producer) and the drain loop
/// (single consumer). Implementations must be safe for that pair running
/// concurrently; no further locking is imposed on callers.
pub trait WorkQueue: Send + Sync {
    fn push(&self, item: &WorkItem) -> Result<()>;

    /// Remove and return the oldest item, failing with [`QueueError::Empty`]
    /// when nothing is available.
    fn pop(&self) -> Result<WorkItem>;

    fn close(&self) -> Result<()>;
}
