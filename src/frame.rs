use bytes::{BufMut, Bytes, BytesMut};

/// Frame-type byte for a length-prefixed message payload.
pub const DATA_FRAME_TYPE: u8 = 0x00;
/// Frame-type byte for the trailer block closing a response body (MSB set).
pub const TRAILER_FRAME_TYPE: u8 = 0x80;
/// Every frame starts with 1 type byte and a 4-byte big-endian length.
pub const FRAME_HEADER_LEN: usize = 5;

/// One frame of a gRPC-Web body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A serialized request or response message.
    Data(Bytes),
    /// CRLF-separated `name: value` trailer text.
    Trailer(Bytes),
}

/// Wraps a serialized message in a DATA frame: type byte, big-endian
/// payload length, then the payload verbatim.
pub fn encode_data_frame(payload: &[u8]) -> Bytes {
    assert!(payload.len() <= u32::MAX as usize);

    let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.put_u8(DATA_FRAME_TYPE);
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);
    frame.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_data_frame_layout() {
        let frame = encode_data_frame(b"\x01\x02\x03");
        assert_eq!(frame.len(), 8);
        assert_eq!(frame[0], DATA_FRAME_TYPE);
        assert_eq!(&frame[1..5], &[0, 0, 0, 3]);
        assert_eq!(&frame[5..], b"\x01\x02\x03");
    }

    #[test]
    fn test_encode_data_frame_empty_payload() {
        let frame = encode_data_frame(&[]);
        assert_eq!(frame.as_ref(), &[DATA_FRAME_TYPE, 0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_data_frame_length_is_big_endian() {
        let payload = vec![0xaa; 0x0102];
        let frame = encode_data_frame(&payload);
        assert_eq!(&frame[1..5], &[0x00, 0x00, 0x01, 0x02]);
        assert_eq!(frame.len(), FRAME_HEADER_LEN + 0x0102);
    }
}
