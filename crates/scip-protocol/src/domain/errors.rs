//! # Error Types
//!
//! Two error families live here:
//!
//! - [`ProtocolError`]: structural/schema violations and builder argument
//!   failures. Raised before any side effect, never coerced.
//! - [`FrameError`]: transport failures while moving frames over a
//!   connection. Any of these forces the owning session to close.

use std::io;

use thiserror::Error;

use super::schema::{FieldKind, MessageType};

/// Structural, schema and argument errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The decoded document is not a JSON object.
    #[error("Message must be an object with exactly 'type' and 'data', got {found}")]
    NotAnObject { found: &'static str },

    /// The envelope is missing `type` or `data`.
    #[error("Message envelope is missing key '{key}'")]
    MissingEnvelopeKey { key: &'static str },

    /// The envelope carries keys other than `type` and `data`.
    #[error("Message envelope has unexpected key '{key}'")]
    UnexpectedEnvelopeKey { key: String },

    /// `type` is not a string naming a known message type.
    #[error("Unknown message type: {0}")]
    UnknownType(String),

    /// `data` is not an object.
    #[error("Data for {msg_type} must be an object, got {found}")]
    DataNotAnObject {
        msg_type: MessageType,
        found: &'static str,
    },

    /// A schema field is absent from `data`.
    #[error("Data for {msg_type} is missing field '{field}'")]
    MissingField {
        msg_type: MessageType,
        field: &'static str,
    },

    /// `data` has a field the schema does not define.
    #[error("Data for {msg_type} has unexpected field '{field}'")]
    UnexpectedField { msg_type: MessageType, field: String },

    /// A field value has the wrong runtime type.
    #[error("Field '{field}' of {msg_type} must be {expected}, got {found}")]
    TypeMismatch {
        msg_type: MessageType,
        field: &'static str,
        expected: FieldKind,
        found: &'static str,
    },

    /// The message arrived but was not the one the caller expected.
    #[error("Expected {expected} message, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: MessageType,
    },

    /// A builder argument failed its semantic check.
    #[error("Invalid {field}: {value:?} (expected {expected})")]
    InvalidArgument {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl ProtocolError {
    /// Shorthand for [`ProtocolError::InvalidArgument`].
    pub fn invalid_argument(
        field: &'static str,
        value: impl ToString,
        expected: &'static str,
    ) -> Self {
        Self::InvalidArgument {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The peer closed before a complete length header arrived.
    #[error("Connection lost or received incomplete size header ({received} of 4 bytes)")]
    ConnectionLost { received: usize },

    /// The peer closed in the middle of a payload.
    #[error("Connection lost during data reception ({received} of {expected} bytes)")]
    ConnectionAborted { received: usize, expected: usize },

    /// Declared or encoded size exceeds the maximum message size.
    #[error("Message size {size} exceeds maximum allowed size {max}")]
    MessageTooLarge { size: usize, max: usize },

    /// Payload bytes are not a UTF-8 JSON document.
    #[error("Error decoding data: {0}")]
    Malformed(String),

    /// The message could not be serialized.
    #[error("Error encoding message: {0}")]
    Encode(String),

    /// A frame's header disagrees with the bytes that follow it.
    #[error("Frame header declares {declared} payload bytes but {actual} are present")]
    LengthMismatch { declared: usize, actual: usize },

    /// A socket operation did not finish within its timeout.
    #[error("Socket operation timed out after {millis}ms")]
    Timeout { millis: u128 },

    /// The connection probe got the wrong bytes back.
    #[error("Connection probe failed: got {got:02x?}, expected {expected:02x?}")]
    ProbeMismatch { got: Vec<u8>, expected: Vec<u8> },

    /// The decoded message violated the schema.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Any other I/O failure.
    #[error("Socket error: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// True when the peer went away (cleanly or not).
    #[must_use]
    pub fn is_disconnect(&self) -> bool {
        match self {
            FrameError::ConnectionLost { .. } | FrameError::ConnectionAborted { .. } => true,
            FrameError::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    /// Short label for metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            FrameError::ConnectionLost { .. } => "connection_lost",
            FrameError::ConnectionAborted { .. } => "connection_aborted",
            FrameError::MessageTooLarge { .. } => "too_large",
            FrameError::Malformed(_) => "malformed",
            FrameError::Encode(_) => "encode",
            FrameError::LengthMismatch { .. } => "length_mismatch",
            FrameError::Timeout { .. } => "timeout",
            FrameError::ProbeMismatch { .. } => "probe",
            FrameError::Protocol(_) => "schema",
            FrameError::Io(_) => "io",
        }
    }
}
