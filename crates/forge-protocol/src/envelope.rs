use crate::{ProtocolError, Result};
use bytes::Bytes;
use forge_core::{WorkItem, WorkResult};

/// Frame kinds understood by this worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Register = 1,
    WorkDelivery = 2,
    Result = 3,
}

impl FrameKind {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(FrameKind::Register),
            2 => Some(FrameKind::WorkDelivery),
            3 => Some(FrameKind::Result),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }
}

/// Sole framing unit on the wire: a kind byte plus an opaque payload.
///
/// The raw kind byte is preserved so that frames of a kind this worker does
/// not recognize survive decoding; the intake loop discards them instead of
/// treating them as transport failures.
#[derive(Debug, Clone)]
pub struct Envelope {
    kind: u8,
    payload: Bytes,
}

impl Envelope {
    pub fn new(kind: FrameKind, payload: impl Into<Bytes>) -> Self {
        Envelope {
            kind: kind.as_u8(),
            payload: payload.into(),
        }
    }

    /// Build an envelope from a raw kind byte, recognized or not.
    pub fn from_parts(kind: u8, payload: Bytes) -> Self {
        Envelope { kind, payload }
    }

    /// The recognized frame kind, or `None` for foreign kinds.
    pub fn kind(&self) -> Option<FrameKind> {
        FrameKind::from_u8(self.kind)
    }

    pub fn kind_byte(&self) -> u8 {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn register(auth: &crate::AuthMessage) -> Result<Self> {
        let payload = bincode::serialize(auth)?;
        Ok(Envelope::new(FrameKind::Register, payload))
    }

    pub fn work_delivery(item: &WorkItem) -> Result<Self> {
        let payload = bincode::serialize(item)?;
        Ok(Envelope::new(FrameKind::WorkDelivery, payload))
    }

    pub fn result(result: &WorkResult) -> Result<Self> {
        let payload = bincode::serialize(result)?;
        Ok(Envelope::new(FrameKind::Result, payload))
    }

    pub fn decode_auth(&self) -> Result<crate::AuthMessage> {
        bincode::deserialize(&self.payload).map_err(ProtocolError::from)
    }

    pub fn decode_work_item(&self) -> Result<WorkItem> {
        bincode::deserialize(&self.payload).map_err(ProtocolError::from)
    }

    pub fn decode_result(&self) -> Result<WorkResult> {
        bincode::deserialize(&self.payload).map_err(ProtocolError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_kind_conversion() {
        assert_eq!(FrameKind::from_u8(1), Some(FrameKind::Register));
        assert_eq!(FrameKind::from_u8(3), Some(FrameKind::Result));
        assert_eq!(FrameKind::from_u8(99), None);

        assert_eq!(FrameKind::WorkDelivery.as_u8(), 2);
    }

    #[test]
    fn test_unrecognized_kind_is_preserved() {
        let envelope = Envelope::from_parts(42, Bytes::from_static(b"whatever"));

        assert_eq!(envelope.kind(), None);
        assert_eq!(envelope.kind_byte(), 42);
        assert_eq!(envelope.payload(), b"whatever");
    }

    #[test]
    fn test_work_delivery_body() {
        let item = WorkItem::new("7", b"input".to_vec()).unwrap();
        let envelope = Envelope::work_delivery(&item).unwrap();

        assert_eq!(envelope.kind(), Some(FrameKind::WorkDelivery));
        assert_eq!(envelope.decode_work_item().unwrap(), item);
    }

    #[test]
    fn test_body_decode_failure_is_not_fatal() {
        let envelope = Envelope::from_parts(FrameKind::WorkDelivery.as_u8(), Bytes::from_static(b"\xff"));

        assert!(envelope.decode_work_item().is_err());
    }
}
