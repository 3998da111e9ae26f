//! Frame codec.
//!
//! A frame is a 4-byte big-endian payload length followed by exactly that
//! many bytes of UTF-8 JSON. The whole frame (header included) may not
//! exceed [`MAX_MESSAGE_SIZE`]. An oversized declared length is rejected
//! before a single payload byte is read.

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::domain::{FrameError, Message};
use crate::validation::message_from_value;

// ============================================================================
// Wire constants
// ============================================================================

/// Length header size in bytes.
pub const HEADER_SIZE: usize = 4;

/// Maximum total frame size (header + payload): 50 MiB.
pub const MAX_MESSAGE_SIZE: usize = 50 * 1024 * 1024;

/// Upper bound on a single body read.
pub const RECV_CHUNK_SIZE: usize = 4 * 1024;

// ============================================================================
// Pure encode / decode
// ============================================================================

/// Serialize `msg` and prepend its length header.
pub fn encode(msg: &Message) -> Result<Vec<u8>, FrameError> {
    let payload = serde_json::to_vec(msg).map_err(|e| FrameError::Encode(e.to_string()))?;
    let total = HEADER_SIZE + payload.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(FrameError::MessageTooLarge {
            size: total,
            max: MAX_MESSAGE_SIZE,
        });
    }
    // Bounded by MAX_MESSAGE_SIZE above, so it fits in a u32.
    let header = u32::try_from(payload.len())
        .map_err(|_| FrameError::MessageTooLarge {
            size: total,
            max: MAX_MESSAGE_SIZE,
        })?
        .to_be_bytes();

    let mut frame = Vec::with_capacity(total);
    frame.extend_from_slice(&header);
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode one complete frame.
pub fn decode(frame: &[u8]) -> Result<Message, FrameError> {
    if frame.len() < HEADER_SIZE {
        return Err(FrameError::ConnectionLost {
            received: frame.len(),
        });
    }
    let (header, payload) = frame.split_at(HEADER_SIZE);
    let declared = check_declared_size(header_value(header))?;
    if declared != payload.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: payload.len(),
        });
    }
    decode_payload(payload)
}

/// Decode and validate a frame body (no header).
pub fn decode_payload(payload: &[u8]) -> Result<Message, FrameError> {
    let text = std::str::from_utf8(payload).map_err(|e| FrameError::Malformed(e.to_string()))?;
    let value: Value =
        serde_json::from_str(text).map_err(|e| FrameError::Malformed(e.to_string()))?;
    Ok(message_from_value(value)?)
}

fn header_value(header: &[u8]) -> u32 {
    let mut bytes = [0u8; HEADER_SIZE];
    bytes.copy_from_slice(&header[..HEADER_SIZE]);
    u32::from_be_bytes(bytes)
}

fn check_declared_size(declared: u32) -> Result<usize, FrameError> {
    let declared = declared as usize;
    if declared.saturating_add(HEADER_SIZE) > MAX_MESSAGE_SIZE {
        return Err(FrameError::MessageTooLarge {
            size: declared.saturating_add(HEADER_SIZE),
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(declared)
}

// ============================================================================
// Stream send / recv
// ============================================================================

/// Encode `msg` and write the whole frame.
///
/// Either every byte is written or an error is returned.
pub async fn send<W>(writer: &mut W, msg: &Message) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let frame = encode(msg)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    debug!(msg_type = %msg.msg_type(), bytes = frame.len(), "Frame sent");
    Ok(())
}

/// Read exactly one frame and return its validated message.
pub async fn recv<R>(reader: &mut R) -> Result<Message, FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; HEADER_SIZE];
    let mut filled = 0;
    while filled < HEADER_SIZE {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            return Err(FrameError::ConnectionLost { received: filled });
        }
        filled += n;
    }

    let declared = match check_declared_size(u32::from_be_bytes(header)) {
        Ok(size) => size,
        Err(e) => {
            warn!(error = %e, "Rejected oversized frame before reading body");
            return Err(e);
        }
    };

    let mut payload = Vec::with_capacity(declared.min(RECV_CHUNK_SIZE * 16));
    let mut chunk = [0u8; RECV_CHUNK_SIZE];
    while payload.len() < declared {
        let want = RECV_CHUNK_SIZE.min(declared - payload.len());
        let n = reader.read(&mut chunk[..want]).await?;
        if n == 0 {
            return Err(FrameError::ConnectionAborted {
                received: payload.len(),
                expected: declared,
            });
        }
        payload.extend_from_slice(&chunk[..n]);
    }

    let msg = decode_payload(&payload)?;
    debug!(msg_type = %msg.msg_type(), bytes = declared + HEADER_SIZE, "Frame received");
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders;

    #[test]
    fn test_encode_prefixes_big_endian_length() {
        let msg = builders::auth_failed("password").unwrap();
        let frame = encode(&msg).unwrap();
        let declared = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;
        assert_eq!(declared, frame.len() - HEADER_SIZE);
        assert!(frame[HEADER_SIZE..].starts_with(b"{"));
    }

    #[test]
    fn test_decode_inverts_encode() {
        let msg = builders::access_request("SCP", 173).unwrap();
        assert_eq!(decode(&encode(&msg).unwrap()).unwrap(), msg);
    }

    #[test]
    fn test_encode_rejects_oversized_message() {
        let mut files = std::collections::BTreeMap::new();
        files.insert("desc".to_string(), "x".repeat(MAX_MESSAGE_SIZE));
        let msg = builders::access_granted("SCP", &serde_json::json!({"id": 1}), files).unwrap();
        assert!(matches!(
            encode(&msg),
            Err(FrameError::MessageTooLarge { max: MAX_MESSAGE_SIZE, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut frame = 3u32.to_be_bytes().to_vec();
        frame.extend_from_slice(&[0xff, 0xfe, 0xfd]);
        assert!(matches!(decode(&frame), Err(FrameError::Malformed(_))));

        let mut frame = 4u32.to_be_bytes().to_vec();
        frame.extend_from_slice(b"null");
        assert!(matches!(decode(&frame), Err(FrameError::Protocol(_))));
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        let mut frame = encode(&builders::auth_failed("user_id").unwrap()).unwrap();
        frame.push(b' ');
        assert!(matches!(decode(&frame), Err(FrameError::LengthMismatch { .. })));
    }

    #[test]
    fn test_decode_rejects_schema_violation() {
        let payload = br#"{"type":"access_request","data":{"f_type":"SCP","f_id":"173"}}"#;
        assert!(matches!(
            decode_payload(payload),
            Err(FrameError::Protocol(_))
        ));
    }
}
