//! Wire framing for the session protocol.
//!
//! Every message is a 4-byte big-endian payload length followed by a bincode-encoded
//! [`Message`]. The length prefix makes message boundaries explicit on the stream.
//!
//! | Opcode | Request fields | Reply |
//! |--------|----------------|-------|
//! | 0 | table name | `"OK"` or error text |
//! | 1 | depth, distance code; after `"OK"`: snapshot file name | `"OK"` + dendrogram text, then `"OK"` or error text for the save |
//! | 2 | snapshot file name | `"OK"` + dendrogram text, or error text |
//!
//! Any reply other than the literal `"OK"` is an error description.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Load a table into the session.
pub const OP_LOAD_TABLE: i32 = 0;
/// Mine a dendrogram from the loaded table, then save it.
pub const OP_MINE: i32 = 1;
/// Load a saved dendrogram.
pub const OP_LOAD_SNAPSHOT: i32 = 2;

/// Success marker sent before any payload.
pub const OK: &str = "OK";

/// One value on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Integer field (opcodes, depth, distance code).
    Int(i32),
    /// Text field (names, replies, dendrogram renderings).
    Text(String),
}

impl Message {
    /// Text message from anything string-like.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// The `"OK"` reply.
    pub fn ok() -> Self {
        Self::text(OK)
    }

    /// True for the `"OK"` reply.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Text(s) if s == OK)
    }

    /// Integer payload, if this is an [`Message::Int`].
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// Consume into text payload, if this is a [`Message::Text`].
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            Self::Int(_) => None,
        }
    }
}

/// Failures that leave the stream unusable.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Socket read or write failed, or the stream ended inside a frame.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer announced a frame above the configured limit.
    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge {
        /// Announced payload length.
        len: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Frame payload is not a valid message.
    #[error("failed to decode message: {0}")]
    Decode(String),

    /// Message could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(String),

    /// Stream ended where a message was required.
    #[error("connection closed")]
    Closed,

    /// A message of the wrong kind arrived where the protocol requires a specific one.
    #[error("unexpected message: expected {expected}")]
    UnexpectedMessage {
        /// What the reader was waiting for.
        expected: &'static str,
    },
}

/// Read one message. Returns `Ok(None)` on a clean end of stream between frames.
pub async fn read_message<R>(
    reader: &mut R,
    max_frame_bytes: usize,
) -> Result<Option<Message>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > max_frame_bytes {
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: max_frame_bytes,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    bincode::deserialize(&payload)
        .map(Some)
        .map_err(|e| ProtocolError::Decode(e.to_string()))
}

/// Read one message, treating end of stream as [`ProtocolError::Closed`].
pub async fn expect_message<R>(
    reader: &mut R,
    max_frame_bytes: usize,
) -> Result<Message, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    read_message(reader, max_frame_bytes)
        .await?
        .ok_or(ProtocolError::Closed)
}

/// Write and flush one message.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let payload = bincode::serialize(message).map_err(|e| ProtocolError::Encode(e.to_string()))?;
    let len = u32::try_from(payload.len()).map_err(|_| {
        ProtocolError::Encode(format!("payload of {} bytes is too large", payload.len()))
    })?;

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&payload);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 1024;

    #[tokio::test]
    async fn frames_are_self_delimiting() {
        let (mut a, mut b) = tokio::io::duplex(256);
        write_message(&mut a, &Message::Int(1)).await.unwrap();
        write_message(&mut a, &Message::text("tab")).await.unwrap();
        drop(a);

        assert_eq!(read_message(&mut b, MAX).await.unwrap(), Some(Message::Int(1)));
        assert_eq!(read_message(&mut b, MAX).await.unwrap(), Some(Message::text("tab")));
        assert_eq!(read_message(&mut b, MAX).await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(4096);
        write_message(&mut a, &Message::text("x".repeat(2000))).await.unwrap();
        let err = read_message(&mut b, MAX).await.unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { max: MAX, .. }));
    }

    #[tokio::test]
    async fn eof_inside_frame_is_io_error() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&[0, 0, 0, 10, 1, 2]).await.unwrap();
        drop(a);
        assert!(matches!(
            read_message(&mut b, MAX).await,
            Err(ProtocolError::Io(_))
        ));
    }

    #[tokio::test]
    async fn garbage_payload_fails_to_decode() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&[0, 0, 0, 4, 0xFF, 0xFF, 0xFF, 0xFF]).await.unwrap();
        assert!(matches!(
            read_message(&mut b, MAX).await,
            Err(ProtocolError::Decode(_))
        ));
    }

    #[test]
    fn ok_marker() {
        assert!(Message::ok().is_ok());
        assert!(!Message::text("OK?").is_ok());
        assert!(!Message::Int(0).is_ok());
    }
}
