use bytes::{Buf, Bytes, BytesMut};
use tokio_stream::{Stream, StreamExt};

use crate::error::TransportError;
use crate::frame::{Frame, DATA_FRAME_TYPE, FRAME_HEADER_LEN, TRAILER_FRAME_TYPE};
use crate::status::StatusCode;

/// Incremental reader that turns a chunked response body into frames.
///
/// Chunk boundaries carry no meaning: partial reads accumulate in `buf`
/// until a whole frame is available. Bytes past the end of a DATA frame
/// stay buffered for the next call, so the trailer that follows it is
/// picked up without touching the stream again.
pub struct FrameReader<S> {
    stream: S,
    buf: BytesMut,
}

impl<S, E> FrameReader<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: Into<TransportError>,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buf: BytesMut::new(),
        }
    }

    /// Reads the next frame, suspending on the underlying stream as needed.
    ///
    /// A stream that ends before the current frame is complete fails with
    /// `DataLoss`, including the case where it ends before any byte at all.
    pub async fn read_frame(&mut self) -> Result<Frame, TransportError> {
        let frame_type = loop {
            match self.buf.first().copied() {
                Some(DATA_FRAME_TYPE) => break DATA_FRAME_TYPE,
                Some(TRAILER_FRAME_TYPE) => break TRAILER_FRAME_TYPE,
                // Either nothing buffered yet or an empty chunk arrived;
                // a well-formed stream never interleaves other bytes at
                // frame boundaries.
                _ => {
                    if !self.fill().await? {
                        return Err(premature_eof());
                    }
                }
            }
        };

        if frame_type == DATA_FRAME_TYPE {
            self.read_data_frame().await
        } else {
            self.read_trailer_frame().await
        }
    }

    async fn read_data_frame(&mut self) -> Result<Frame, TransportError> {
        while self.buf.len() < FRAME_HEADER_LEN {
            if !self.fill().await? {
                return Err(premature_eof());
            }
        }

        let mut header = self.buf.split_to(FRAME_HEADER_LEN);
        header.advance(1);
        let len = header.get_u32() as usize;

        while self.buf.len() < len {
            if !self.fill().await? {
                return Err(premature_eof());
            }
        }

        Ok(Frame::Data(self.buf.split_to(len).freeze()))
    }

    async fn read_trailer_frame(&mut self) -> Result<Frame, TransportError> {
        // The declared length is not enforced; the trailer runs to the end
        // of the stream.
        while self.fill().await? {}

        let mut payload = std::mem::take(&mut self.buf);
        if payload.len() <= FRAME_HEADER_LEN {
            return Ok(Frame::Trailer(Bytes::new()));
        }
        payload.advance(FRAME_HEADER_LEN);
        Ok(Frame::Trailer(payload.freeze()))
    }

    /// Pulls one chunk off the stream into the accumulator. Returns false
    /// when the stream is exhausted.
    async fn fill(&mut self) -> Result<bool, TransportError> {
        match self.stream.next().await {
            Some(Ok(chunk)) => {
                self.buf.extend_from_slice(&chunk);
                Ok(true)
            }
            Some(Err(e)) => Err(e.into()),
            None => Ok(false),
        }
    }
}

fn premature_eof() -> TransportError {
    TransportError::new(StatusCode::DataLoss, "premature end of response body")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::encode_data_frame;
    use bytes::{BufMut, BytesMut};

    fn trailer_frame(payload: &[u8]) -> Bytes {
        let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
        frame.put_u8(TRAILER_FRAME_TYPE);
        frame.put_u32(payload.len() as u32);
        frame.put_slice(payload);
        frame.freeze()
    }

    fn reader_over(
        chunks: Vec<Bytes>,
    ) -> FrameReader<impl Stream<Item = Result<Bytes, TransportError>> + Unpin> {
        FrameReader::new(tokio_stream::iter(
            chunks.into_iter().map(Ok::<_, TransportError>),
        ))
    }

    #[tokio::test]
    async fn test_data_then_trailer_in_one_chunk() {
        let mut body = BytesMut::new();
        body.put_slice(&encode_data_frame(b"payload"));
        body.put_slice(&trailer_frame(b"grpc-status: 0\r\n"));
        let mut reader = reader_over(vec![body.freeze()]);

        assert_eq!(
            reader.read_frame().await.unwrap(),
            Frame::Data(Bytes::from_static(b"payload"))
        );
        assert_eq!(
            reader.read_frame().await.unwrap(),
            Frame::Trailer(Bytes::from_static(b"grpc-status: 0\r\n"))
        );
    }

    #[tokio::test]
    async fn test_frames_split_across_single_byte_chunks() {
        let mut body = BytesMut::new();
        body.put_slice(&encode_data_frame(b"ab"));
        body.put_slice(&trailer_frame(b"grpc-status: 0\r\n"));
        let chunks = body
            .freeze()
            .iter()
            .map(|b| Bytes::copy_from_slice(&[*b]))
            .collect();
        let mut reader = reader_over(chunks);

        assert_eq!(
            reader.read_frame().await.unwrap(),
            Frame::Data(Bytes::from_static(b"ab"))
        );
        assert_eq!(
            reader.read_frame().await.unwrap(),
            Frame::Trailer(Bytes::from_static(b"grpc-status: 0\r\n"))
        );
    }

    #[tokio::test]
    async fn test_empty_chunks_are_tolerated() {
        let chunks = vec![
            Bytes::new(),
            encode_data_frame(b"x"),
            Bytes::new(),
            trailer_frame(b""),
        ];
        let mut reader = reader_over(chunks);

        assert_eq!(
            reader.read_frame().await.unwrap(),
            Frame::Data(Bytes::from_static(b"x"))
        );
        assert_eq!(reader.read_frame().await.unwrap(), Frame::Trailer(Bytes::new()));
    }

    #[tokio::test]
    async fn test_zero_length_data_payload_is_valid() {
        let mut reader = reader_over(vec![encode_data_frame(b""), trailer_frame(b"")]);
        assert_eq!(reader.read_frame().await.unwrap(), Frame::Data(Bytes::new()));
    }

    #[tokio::test]
    async fn test_trailer_before_any_data_is_valid() {
        let mut reader = reader_over(vec![trailer_frame(b"grpc-status: 5\r\n")]);
        assert_eq!(
            reader.read_frame().await.unwrap(),
            Frame::Trailer(Bytes::from_static(b"grpc-status: 5\r\n"))
        );
    }

    #[tokio::test]
    async fn test_empty_stream_is_premature_eof() {
        let mut reader = reader_over(vec![]);
        let err = reader.read_frame().await.unwrap_err();
        assert_eq!(err.code, StatusCode::DataLoss);
        assert_eq!(err.message, "premature end of response body");
    }

    #[tokio::test]
    async fn test_eof_inside_data_header_is_premature() {
        let mut reader = reader_over(vec![Bytes::from_static(&[0x00, 0x00, 0x00])]);
        let err = reader.read_frame().await.unwrap_err();
        assert_eq!(err.code, StatusCode::DataLoss);
    }

    #[tokio::test]
    async fn test_eof_inside_data_payload_is_premature() {
        // Declares 16 payload bytes but delivers 3.
        let mut reader = reader_over(vec![Bytes::from_static(&[
            0x00, 0x00, 0x00, 0x00, 0x10, 0x01, 0x02, 0x03,
        ])]);
        let err = reader.read_frame().await.unwrap_err();
        assert_eq!(err.code, StatusCode::DataLoss);
        assert_eq!(err.message, "premature end of response body");
    }

    #[tokio::test]
    async fn test_trailer_declared_length_is_not_enforced() {
        // Header says 4 bytes, body carries more; everything after the
        // header belongs to the trailer.
        let mut frame = BytesMut::new();
        frame.put_u8(TRAILER_FRAME_TYPE);
        frame.put_u32(4);
        frame.put_slice(b"grpc-status: 0\r\n");
        let mut reader = reader_over(vec![frame.freeze()]);

        assert_eq!(
            reader.read_frame().await.unwrap(),
            Frame::Trailer(Bytes::from_static(b"grpc-status: 0\r\n"))
        );
    }

    #[tokio::test]
    async fn test_truncated_trailer_header_yields_empty_payload() {
        let mut reader = reader_over(vec![Bytes::from_static(&[TRAILER_FRAME_TYPE])]);
        assert_eq!(reader.read_frame().await.unwrap(), Frame::Trailer(Bytes::new()));
    }

    #[tokio::test]
    async fn test_stream_error_propagates() {
        let chunks = vec![
            Ok(Bytes::from_static(&[0x00, 0x00])),
            Err(TransportError::new(StatusCode::Unknown, "connection reset")),
        ];
        let mut reader = FrameReader::new(tokio_stream::iter(chunks));
        let err = reader.read_frame().await.unwrap_err();
        assert_eq!(err.code, StatusCode::Unknown);
        assert_eq!(err.message, "connection reset");
    }
}
