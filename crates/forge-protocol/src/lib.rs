mod auth;
mod codec;
mod envelope;

pub use auth::{AuthMessage, Identity};
pub use codec::EnvelopeCodec;
pub use envelope::{Envelope, FrameKind};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] bincode::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed auth material: {0}")]
    MalformedAuth(String),

    #[error("Signature rejected: {0}")]
    SignatureRejected(#[from] ed25519_dalek::SignatureError),
}

impl From<hex::FromHexError> for ProtocolError {
    fn from(err: hex::FromHexError) -> Self {
        ProtocolError::MalformedAuth(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Maximum frame size: 11MB (to accommodate a 10MB work input plus overhead)
pub const MAX_FRAME_SIZE: usize = 11 * 1024 * 1024;
