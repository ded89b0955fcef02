use crate::{CoreError, Result, MAX_INPUT_SIZE};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the coordinator. Opaque to the worker.
pub type WorkId = String;

/// One unit of deferred computation, delivered by the coordinator and
/// spooled locally until the drain loop picks it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkId,
    pub input: Vec<u8>,
}

impl WorkItem {
    pub fn new(id: impl Into<WorkId>, input: Vec<u8>) -> Result<Self> {
        if input.len() > MAX_INPUT_SIZE {
            return Err(CoreError::InputTooLarge {
                max: MAX_INPUT_SIZE,
                actual: input.len(),
            });
        }

        Ok(WorkItem {
            id: id.into(),
            input,
        })
    }

    /// Serialize for storage in the durable queue.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(CoreError::from)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(CoreError::from)
    }
}

/// Outcome of one drained work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkStatus {
    Ok,
    ComputeError,
}

/// Exactly one of these is produced per popped work item, success or not.
/// `output` is non-empty iff the status is `Ok`; `error` is non-empty iff
/// the status is `ComputeError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkResult {
    pub id: WorkId,
    pub status: WorkStatus,
    pub output: Vec<u8>,
    pub error: String,
}

impl WorkResult {
    pub fn ok(id: WorkId, output: Vec<u8>) -> Self {
        WorkResult {
            id,
            status: WorkStatus::Ok,
            output,
            error: String::new(),
        }
    }

    pub fn compute_error(id: WorkId, error: String) -> Self {
        WorkResult {
            id,
            status: WorkStatus::ComputeError,
            output: Vec::new(),
            error,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == WorkStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_item_creation() {
        let item = WorkItem::new("42", b"input bytes".to_vec()).unwrap();

        assert_eq!(item.id, "42");
        assert_eq!(item.input, b"input bytes");
    }

    #[test]
    fn test_input_size_limit() {
        let oversized = vec![0u8; MAX_INPUT_SIZE + 1];
        let result = WorkItem::new("big", oversized);

        match result {
            Err(CoreError::InputTooLarge { .. }) => {}
            _ => panic!("Expected InputTooLarge error"),
        }
    }

    #[test]
    fn test_work_item_storage_roundtrip() {
        let item = WorkItem::new("7", b"data".to_vec()).unwrap();

        let bytes = item.to_bytes().unwrap();
        let restored = WorkItem::from_bytes(&bytes).unwrap();

        assert_eq!(restored, item);
    }

    #[test]
    fn test_result_field_discipline() {
        let ok = WorkResult::ok("7".to_string(), b"output".to_vec());
        assert!(ok.is_ok());
        assert!(!ok.output.is_empty());
        assert!(ok.error.is_empty());

        let failed = WorkResult::compute_error("7".to_string(), "oom".to_string());
        assert!(!failed.is_ok());
        assert!(failed.output.is_empty());
        assert_eq!(failed.error, "oom");
    }
}
