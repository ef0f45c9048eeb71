//! Incremental message framing for byte-oriented transports
//!
//! Diameter runs over stream transports, so message boundaries must be
//! recovered from the 24-bit length field in each message header. Two
//! framers share the same framing rule: [`MessageByteReader`] is fed byte
//! chunks and yields whole messages, [`MessageStreamReader`] pulls from an
//! async byte source and blocks until a whole message is available.
//!
//! A framer never mis-aligns on partial reads: bytes are buffered until a
//! full message is present, and malformed headers (wrong version, length
//! smaller than a header) are detected as early as possible. After a framer
//! returns an error its buffer is no longer trustworthy and the caller
//! should drop it.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{DiameterError, DiameterResult};
use crate::message::{Message, MSG_HEADER_SIZE};
use crate::DIAMETER_VERSION;

const FRAMER_BASE_BUFFER_SIZE: usize = 16384;

/// Try to extract one whole message from the front of the buffer.
///
/// Returns `Ok(None)` when the buffer does not yet hold a complete message.
/// With fewer than 20 octets buffered only the version octet is inspected;
/// a wrong version is rejected immediately rather than after the rest of a
/// bogus header arrives. On success the extracted bytes are removed from
/// the buffer.
fn extract_next_message(buffer: &mut BytesMut) -> DiameterResult<Option<Message>> {
    if buffer.is_empty() {
        return Ok(None);
    }

    if buffer.len() < MSG_HEADER_SIZE {
        if buffer[0] != DIAMETER_VERSION {
            return Err(DiameterError::UnsupportedVersion(buffer[0]));
        }
        return Ok(None);
    }

    let word = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]);
    let version = (word >> 24) as u8;
    let length = (word & 0x00ff_ffff) as usize;

    if version != DIAMETER_VERSION {
        return Err(DiameterError::UnsupportedVersion(version));
    }
    if length < MSG_HEADER_SIZE {
        return Err(DiameterError::Framing(format!(
            "declared message length {length} is shorter than the header"
        )));
    }
    if buffer.len() < length {
        return Ok(None);
    }

    let mut frame = buffer.split_to(length).freeze();
    let message = Message::decode(&mut frame)?;
    Ok(Some(message))
}

/// Byte-push framer: feed it chunks as they arrive, collect whole messages.
///
/// Partial trailing bytes remain buffered for the next call. If a call
/// returns an error the stream is mis-framed and subsequent calls have
/// undefined results; drop the reader.
#[derive(Debug, Default)]
pub struct MessageByteReader {
    buffer: BytesMut,
}

impl MessageByteReader {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(FRAMER_BASE_BUFFER_SIZE),
        }
    }

    /// Append the incoming bytes and extract as many whole messages as are
    /// now available, in stream order.
    pub fn receive_bytes(&mut self, incoming: &[u8]) -> DiameterResult<Vec<Message>> {
        self.buffer.extend_from_slice(incoming);

        let mut messages = Vec::new();
        while let Some(message) = extract_next_message(&mut self.buffer)? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Append the incoming bytes and extract at most one message. Any
    /// further complete messages stay buffered and are returned by
    /// subsequent calls (which may pass an empty chunk).
    pub fn receive_one(&mut self, incoming: &[u8]) -> DiameterResult<Option<Message>> {
        self.buffer.extend_from_slice(incoming);
        extract_next_message(&mut self.buffer)
    }

    /// Number of bytes buffered awaiting the remainder of a message
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Reader-pull framer: wraps an async byte source and reads until whole
/// messages are available.
#[derive(Debug)]
pub struct MessageStreamReader<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> MessageStreamReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(FRAMER_BASE_BUFFER_SIZE),
        }
    }

    /// Read from the underlying source until a whole message is available.
    /// End-of-stream is reported as `TransportClosedByPeer`.
    pub async fn read_next(&mut self) -> DiameterResult<Message> {
        loop {
            if let Some(message) = extract_next_message(&mut self.buffer)? {
                return Ok(message);
            }

            let n = self.reader.read_buf(&mut self.buffer).await?;
            if n == 0 {
                return Err(DiameterError::TransportClosedByPeer);
            }
        }
    }

    /// Like [`read_next`](Self::read_next) but performs at most one read on
    /// the underlying source. Returns `Ok(None)` when no whole message is
    /// available yet.
    pub async fn read_once(&mut self) -> DiameterResult<Option<Message>> {
        if let Some(message) = extract_next_message(&mut self.buffer)? {
            return Ok(Some(message));
        }

        let n = self.reader.read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Err(DiameterError::TransportClosedByPeer);
        }

        extract_next_message(&mut self.buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avp::Avp;
    use crate::message::msg_flags;

    fn sample_message(hop_by_hop_id: u32) -> Message {
        Message::new(
            msg_flags::REQUEST,
            280,
            0,
            hop_by_hop_id,
            hop_by_hop_id ^ 0xffff_ffff,
            vec![
                Avp::new(264, 0, true, b"host.example.com"),
                Avp::new(296, 0, true, b"example.com"),
            ],
            vec![],
        )
    }

    #[test]
    fn test_whole_stream_at_once() {
        let mut stream = Vec::new();
        for i in 0..3u32 {
            stream.extend_from_slice(&sample_message(i).encode());
        }

        let mut reader = MessageByteReader::new();
        let messages = reader.receive_bytes(&stream).unwrap();

        assert_eq!(messages.len(), 3);
        for (i, m) in messages.iter().enumerate() {
            assert_eq!(m.hop_by_hop_id, i as u32);
        }
        assert_eq!(reader.buffered_len(), 0);
    }

    #[test]
    fn test_chunked_stream_yields_same_messages() {
        let mut stream = Vec::new();
        for i in 0..3u32 {
            stream.extend_from_slice(&sample_message(i).encode());
        }

        // Every split point, including mid-header and mid-AVP, must produce
        // the same message sequence as the unsplit stream.
        for split in 1..stream.len() {
            let mut reader = MessageByteReader::new();
            let mut messages = reader.receive_bytes(&stream[..split]).unwrap();
            messages.extend(reader.receive_bytes(&stream[split..]).unwrap());

            assert_eq!(messages.len(), 3, "split at {split}");
            for (i, m) in messages.iter().enumerate() {
                assert_eq!(m.hop_by_hop_id, i as u32, "split at {split}");
            }
        }
    }

    #[test]
    fn test_byte_at_a_time() {
        let encoded = sample_message(42).encode();

        let mut reader = MessageByteReader::new();
        for &b in &encoded[..encoded.len() - 1] {
            assert!(reader.receive_bytes(&[b]).unwrap().is_empty());
        }
        let messages = reader
            .receive_bytes(&encoded[encoded.len() - 1..])
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].hop_by_hop_id, 42);
    }

    #[test]
    fn test_receive_one_buffers_the_rest() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&sample_message(1).encode());
        stream.extend_from_slice(&sample_message(2).encode());

        let mut reader = MessageByteReader::new();
        let first = reader.receive_one(&stream).unwrap().unwrap();
        assert_eq!(first.hop_by_hop_id, 1);

        let second = reader.receive_one(&[]).unwrap().unwrap();
        assert_eq!(second.hop_by_hop_id, 2);

        assert!(reader.receive_one(&[]).unwrap().is_none());
    }

    #[test]
    fn test_rejects_wrong_version_on_first_byte() {
        let mut reader = MessageByteReader::new();
        assert!(matches!(
            reader.receive_bytes(&[0x02]),
            Err(DiameterError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_rejects_wrong_version_in_full_header() {
        let mut raw = sample_message(1).encode().to_vec();
        raw[0] = 3;

        let mut reader = MessageByteReader::new();
        assert!(matches!(
            reader.receive_bytes(&raw),
            Err(DiameterError::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn test_rejects_undersized_declared_length() {
        // Version 1, declared length 8: shorter than the 20-byte header.
        let raw = [
            0x01, 0x00, 0x00, 0x08, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];

        let mut reader = MessageByteReader::new();
        assert!(matches!(
            reader.receive_bytes(&raw),
            Err(DiameterError::Framing(_))
        ));
    }

    #[tokio::test]
    async fn test_stream_reader_reads_messages() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&sample_message(1).encode());
        stream.extend_from_slice(&sample_message(2).encode());

        let mut reader = MessageStreamReader::new(stream.as_slice());
        assert_eq!(reader.read_next().await.unwrap().hop_by_hop_id, 1);
        assert_eq!(reader.read_next().await.unwrap().hop_by_hop_id, 2);

        assert!(matches!(
            reader.read_next().await,
            Err(DiameterError::TransportClosedByPeer)
        ));
    }

    #[tokio::test]
    async fn test_stream_reader_across_partial_writes() {
        let encoded = sample_message(7).encode();
        let (client, mut server) = tokio::io::duplex(64);

        let writer = tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            for chunk in encoded.chunks(5) {
                server.write_all(chunk).await.unwrap();
            }
        });

        let mut reader = MessageStreamReader::new(client);
        let message = reader.read_next().await.unwrap();
        assert_eq!(message.hop_by_hop_id, 7);

        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_once_performs_single_read() {
        let encoded = sample_message(9).encode();
        let half = encoded.len() / 2;
        let (client, mut server) = tokio::io::duplex(4096);

        use tokio::io::AsyncWriteExt;
        server.write_all(&encoded[..half]).await.unwrap();

        let mut reader = MessageStreamReader::new(client);
        assert!(reader.read_once().await.unwrap().is_none());

        server.write_all(&encoded[half..]).await.unwrap();
        let message = reader.read_once().await.unwrap().unwrap();
        assert_eq!(message.hop_by_hop_id, 9);
    }
}
