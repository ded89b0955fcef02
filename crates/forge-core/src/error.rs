use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Input size exceeds maximum allowed size of {max} bytes (got {actual})")]
    InputTooLarge { max: usize, actual: usize },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
