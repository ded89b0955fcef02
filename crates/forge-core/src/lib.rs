mod error;
mod work;

pub use error::{CoreError, Result};
pub use work::{WorkId, WorkItem, WorkResult, WorkStatus};

pub const MAX_INPUT_SIZE: usize = 10 * 1024 * 1024; // 10MB
