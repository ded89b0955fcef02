use crate::{Envelope, ProtocolError, Result, MAX_FRAME_SIZE};
use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Codec for encoding/decoding envelopes with length-prefixed framing
///
/// Frame format: [4-byte length (big-endian)] [1-byte kind] [payload]
///
/// The kind byte is not validated here; the intake loop decides what to do
/// with kinds it does not recognize.
pub struct EnvelopeCodec;

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        // Need at least 5 bytes for length prefix + kind byte
        if src.len() < 5 {
            return Ok(None);
        }

        // Read length prefix without consuming
        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&src[0..4]);
        let length = u32::from_be_bytes(length_bytes) as usize;

        if length > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge(length));
        }

        // Wait for the complete frame
        if src.len() < 4 + length {
            src.reserve(4 + length - src.len());
            return Ok(None);
        }

        src.advance(4); // Skip length prefix

        let kind = src.get_u8();
        let payload = src.split_to(length - 1).freeze();

        Ok(Some(Envelope::from_parts(kind, payload)))
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<()> {
        let total_length = 1 + item.payload().len(); // kind byte + payload
        if total_length > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge(total_length));
        }

        dst.reserve(4 + total_length);
        dst.put_u32(total_length as u32);
        dst.put_u8(item.kind_byte());
        dst.put_slice(item.payload());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameKind;
    use bytes::Bytes;
    use forge_core::WorkItem;

    #[test]
    fn test_codec_roundtrip() {
        let mut codec = EnvelopeCodec;
        let mut buffer = BytesMut::new();

        let item = WorkItem::new("7", b"input bytes".to_vec()).unwrap();
        let envelope = Envelope::work_delivery(&item).unwrap();

        codec.encode(envelope, &mut buffer).unwrap();

        let decoded = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(decoded.kind(), Some(FrameKind::WorkDelivery));
        assert_eq!(decoded.decode_work_item().unwrap(), item);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_partial_frame() {
        let mut codec = EnvelopeCodec;
        let mut buffer = BytesMut::new();

        let item = WorkItem::new("7", b"data".to_vec()).unwrap();
        codec
            .encode(Envelope::work_delivery(&item).unwrap(), &mut buffer)
            .unwrap();

        // Keep only the first half of the frame
        let full_len = buffer.len();
        let partial = buffer.split_to(full_len / 2);
        let mut partial_buffer = BytesMut::from(&partial[..]);

        // Should return None (waiting for more data)
        let result = codec.decode(&mut partial_buffer).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_unrecognized_kind_passes_through() {
        let mut codec = EnvelopeCodec;
        let mut buffer = BytesMut::new();

        let foreign = Envelope::from_parts(200, Bytes::from_static(b"future extension"));
        codec.encode(foreign, &mut buffer).unwrap();

        let decoded = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(decoded.kind(), None);
        assert_eq!(decoded.kind_byte(), 200);
        assert_eq!(decoded.payload(), b"future extension");
    }

    #[test]
    fn test_oversize_frame_rejected() {
        let mut codec = EnvelopeCodec;
        let mut buffer = BytesMut::new();

        // A length prefix claiming more than the allowed maximum
        buffer.put_u32((MAX_FRAME_SIZE + 1) as u32);
        buffer.put_u8(FrameKind::WorkDelivery.as_u8());

        match codec.decode(&mut buffer) {
            Err(ProtocolError::FrameTooLarge(_)) => {}
            other => panic!("Expected FrameTooLarge, got {other:?}"),
        }
    }
}
