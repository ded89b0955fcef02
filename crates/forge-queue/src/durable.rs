use crate::{QueueError, Result, WorkQueue};
use forge_core::WorkItem;
use parking_lot::Mutex;
use rocksdb::{Options, DB};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Crash-surviving FIFO queue of work items backed by RocksDB.
///
/// Records are bincode-encoded items keyed by a big-endian u64 sequence
/// number, so iteration order is arrival order and the tail sequence can be
/// recovered from the last key on reopen.
pub struct DurableQueue {
    db: DB,
    tail: Mutex<u64>,
    closed: AtomicBool,
}

impl DurableQueue {
    /// Open or create the queue at `path`. Failure here is fatal to worker
    /// startup.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = DB::open(&opts, path.as_ref())?;

        let mut iter = db.raw_iterator();
        iter.seek_to_last();

        let tail = if iter.valid() {
            iter.key()
                .map(|key| u64::from_be_bytes(key.try_into().unwrap_or([0u8; 8])) + 1)
                .unwrap_or(0)
        } else {
            0
        };

        info!("Opened work queue at {:?} (next sequence {})", path.as_ref(), tail);

        Ok(DurableQueue {
            db,
            tail: Mutex::new(tail),
            closed: AtomicBool::new(false),
        })
    }

    /// Number of spooled items. Scans the keyspace; used by tests and
    /// diagnostics, not the hot path.
    pub fn len(&self) -> usize {
        self.db.iterator(rocksdb::IteratorMode::Start).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }
        Ok(())
    }
}

impl WorkQueue for DurableQueue {
    fn push(&self, item: &WorkItem) -> Result<()> {
        self.check_open()?;

        let value = bincode::serialize(item)?;

        let mut tail = self.tail.lock();
        self.db.put((*tail).to_be_bytes(), value)?;
        *tail += 1;

        debug!("Spooled work item {}", item.id);
        Ok(())
    }

    fn pop(&self) -> Result<WorkItem> {
        self.check_open()?;

        let mut iter = self.db.raw_iterator();
        iter.seek_to_first();

        if !iter.valid() {
            return Err(QueueError::Empty);
        }

        let (key, value) = match (iter.key(), iter.value()) {
            (Some(key), Some(value)) => (key.to_vec(), value.to_vec()),
            _ => return Err(QueueError::Empty),
        };

        let item: WorkItem = bincode::deserialize(&value)?;
        self.db.delete(key)?;

        debug!("Popped work item {}", item.id);
        Ok(item)
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.db.flush()?;
        info!("Closed work queue");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn item(id: &str) -> WorkItem {
        WorkItem::new(id, format!("input-{id}").into_bytes()).unwrap()
    }

    #[test]
    fn test_push_pop_fifo_order() {
        let dir = TempDir::new().unwrap();
        let queue = DurableQueue::open(dir.path()).unwrap();

        queue.push(&item("1")).unwrap();
        queue.push(&item("2")).unwrap();
        queue.push(&item("3")).unwrap();

        assert_eq!(queue.pop().unwrap().id, "1");
        assert_eq!(queue.pop().unwrap().id, "2");
        assert_eq!(queue.pop().unwrap().id, "3");
    }

    #[test]
    fn test_empty_pop_is_distinguished() {
        let dir = TempDir::new().unwrap();
        let queue = DurableQueue::open(dir.path()).unwrap();

        match queue.pop() {
            Err(QueueError::Empty) => {}
            other => panic!("Expected Empty, got {other:?}"),
        }
    }

    #[test]
    fn test_items_survive_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let queue = DurableQueue::open(dir.path()).unwrap();
            queue.push(&item("1")).unwrap();
            queue.push(&item("2")).unwrap();
        }

        let queue = DurableQueue::open(dir.path()).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop().unwrap().id, "1");

        // New pushes continue after the recovered tail
        queue.push(&item("3")).unwrap();
        assert_eq!(queue.pop().unwrap().id, "2");
        assert_eq!(queue.pop().unwrap().id, "3");
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let queue = DurableQueue::open(dir.path()).unwrap();

        queue.close().unwrap();
        queue.close().unwrap();

        match queue.push(&item("1")) {
            Err(QueueError::Closed) => {}
            other => panic!("Expected Closed, got {other:?}"),
        }
        match queue.pop() {
            Err(QueueError::Closed) => {}
            other => panic!("Expected Closed, got {other:?}"),
        }
    }
}
