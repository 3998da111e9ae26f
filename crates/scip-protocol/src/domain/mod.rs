//! Protocol domain: message types, their schemas, typed payloads and errors.

pub mod errors;
pub mod message;
pub mod schema;

pub use errors::{FrameError, ProtocolError};
pub use message::{
    parse_record, AccessExpunged, AccessGranted, AccessRedacted, AccessRequest, AccessTypeFail,
    AuthFailed, AuthRequest, AuthSuccess, Message,
};
pub use schema::{FieldKind, MessageType};
