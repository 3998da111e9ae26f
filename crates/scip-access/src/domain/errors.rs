//! # Domain Errors
//!
//! Access-control outcomes (type fail, expunged, redacted) are protocol
//! messages, not errors. What ends up here is storage trouble, malformed
//! credential input, and messages that failed to build.

use scip_protocol::ProtocolError;
use thiserror::Error;

use super::records::FileType;

/// Record, text and audit storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A seed or write tried to reuse an id.
    #[error("Duplicate {file_type} id {id}")]
    Duplicate { file_type: FileType, id: i64 },

    /// A foreign key points at a record that does not exist.
    #[error("{from} {from_id} references missing {to} {to_id}")]
    DanglingReference {
        from: FileType,
        from_id: i64,
        to: FileType,
        to_id: i64,
    },

    /// Clearance outside 1..=6.
    #[error("Invalid clearance level {0} (expected 1-6)")]
    InvalidClearance(i64),

    /// The seed document could not be parsed.
    #[error("Invalid deepwell data: {0}")]
    Parse(String),

    /// A blob path escaped the deepwell root or was otherwise unusable.
    #[error("Invalid blob path: {0}")]
    InvalidPath(String),

    /// Underlying filesystem failure.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed credential input. Wrong credentials are not an error.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid user_id {0}: must be a positive integer")]
    InvalidUserId(i64),

    #[error("Invalid password: must be a non-empty string")]
    EmptyPassword,

    /// A stored credential is not in `sha256$<salt>$<digest>` form.
    #[error("Stored credential for user {0} is malformed")]
    CorruptCredential(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// The request field the peer should be told about.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            AuthError::InvalidUserId(_) => "user_id",
            AuthError::EmptyPassword | AuthError::CorruptCredential(_) => "password",
            AuthError::Store(_) => "user_id",
        }
    }
}

/// Failures inside the access-control engine.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Record store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Could not build response: {0}")]
    Protocol(#[from] ProtocolError),
}
