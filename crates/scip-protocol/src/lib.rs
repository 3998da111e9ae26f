//! # SCiPnet Protocol
//!
//! Wire layer shared by the SCiPnet server and terminal.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────┐
//! │ length (u32, BE)     │ {"type": "<message type>", "data": {..}} │
//! └──────────────────────┴──────────────────────────────────────────┘
//!   4 bytes                UTF-8 JSON, header + body ≤ 50 MiB
//! ```
//!
//! ## Message Set
//!
//! | Type | Data |
//! |------|------|
//! | `auth_request` | `user_id: int, password: str` |
//! | `auth_failed` | `field: str` |
//! | `auth_success` | `user: serialized record` |
//! | `access_request` | `f_type: str, f_id: int` |
//! | `access_type_fail` | `tried: str, valid: list[str]` |
//! | `access_redacted` | `user_clear, user_hex, needed_clear, needed_hex: str` |
//! | `access_expunged` | `f_type: str, f_id: int` |
//! | `access_granted` | `f_type: str, f_model: serialized record, files: dict[str, str]` |
//!
//! ## Module Structure
//!
//! ```text
//! scip-protocol/
//! ├── domain/        # MessageType, schema table, typed payloads, errors
//! ├── validation.rs  # validate_msg / gen_msg (the trust boundary)
//! ├── builders.rs    # one constructor per message type
//! ├── codec.rs       # encode / decode / send / recv
//! └── transport.rs   # Connection: timeouts + probe handshake
//! ```

#![warn(clippy::all)]

pub mod builders;
pub mod codec;
pub mod domain;
pub mod transport;
pub mod validation;

pub use codec::{decode, decode_payload, encode, recv, send, HEADER_SIZE, MAX_MESSAGE_SIZE, RECV_CHUNK_SIZE};
pub use domain::{
    parse_record, AccessExpunged, AccessGranted, AccessRedacted, AccessRequest, AccessTypeFail,
    AuthFailed, AuthRequest, AuthSuccess, FieldKind, FrameError, Message, MessageType,
    ProtocolError,
};
pub use transport::{
    Connection, TimeoutOverride, DEFAULT_PROBE_TIMEOUT, DEFAULT_READ_TIMEOUT, PROBE_REQUEST,
    PROBE_RESPONSE,
};
pub use validation::{gen_msg, validate_data, validate_msg};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
