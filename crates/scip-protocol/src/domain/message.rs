//! # Typed Messages
//!
//! One payload struct per [`MessageType`], wrapped in the [`Message`] sum
//! type. Serde renders a `Message` as the wire envelope
//! `{"type": "<wire name>", "data": {...}}`.
//!
//! Values of these types are only produced by [`crate::validation::gen_msg`]
//! (and therefore the builders) or by decoding validated bytes, so holding
//! a `Message` implies it conforms to its schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::ProtocolError;
use super::schema::MessageType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthRequest {
    pub user_id: i64,
    pub password: String,
}

/// Names the single credential field that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthFailed {
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthSuccess {
    /// Serialized user record (a JSON object document).
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessRequest {
    pub f_type: String,
    pub f_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessTypeFail {
    pub tried: String,
    pub valid: Vec<String>,
}

/// Clearance names and display colours of both sides of a denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessRedacted {
    pub user_clear: String,
    pub user_hex: String,
    pub needed_clear: String,
    pub needed_hex: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessExpunged {
    pub f_type: String,
    pub f_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessGranted {
    pub f_type: String,
    /// Serialized record (a JSON object document).
    pub f_model: String,
    /// Text blobs keyed by blob name.
    pub files: BTreeMap<String, String>,
}

/// A protocol message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    AuthRequest(AuthRequest),
    AuthFailed(AuthFailed),
    AuthSuccess(AuthSuccess),
    AccessRequest(AccessRequest),
    AccessTypeFail(AccessTypeFail),
    AccessRedacted(AccessRedacted),
    AccessExpunged(AccessExpunged),
    AccessGranted(AccessGranted),
}

impl Message {
    #[must_use]
    pub fn msg_type(&self) -> MessageType {
        match self {
            Message::AuthRequest(_) => MessageType::AuthRequest,
            Message::AuthFailed(_) => MessageType::AuthFailed,
            Message::AuthSuccess(_) => MessageType::AuthSuccess,
            Message::AccessRequest(_) => MessageType::AccessRequest,
            Message::AccessTypeFail(_) => MessageType::AccessTypeFail,
            Message::AccessRedacted(_) => MessageType::AccessRedacted,
            Message::AccessExpunged(_) => MessageType::AccessExpunged,
            Message::AccessGranted(_) => MessageType::AccessGranted,
        }
    }

    /// The envelope as a JSON value.
    pub fn to_value(&self) -> Result<Value, ProtocolError> {
        // Payload structs only contain strings, integers, lists and string
        // maps, so serialization cannot fail for a well-formed value.
        serde_json::to_value(self).map_err(|e| {
            ProtocolError::invalid_argument("message", e, "a serializable message")
        })
    }

    /// The `data` object alone.
    pub fn data(&self) -> Result<Map<String, Value>, ProtocolError> {
        match self.to_value()? {
            Value::Object(mut envelope) => match envelope.remove("data") {
                Some(Value::Object(data)) => Ok(data),
                _ => Err(ProtocolError::MissingEnvelopeKey { key: "data" }),
            },
            _ => Err(ProtocolError::NotAnObject { found: "non-object" }),
        }
    }

    pub fn into_auth_request(self) -> Result<AuthRequest, ProtocolError> {
        match self {
            Message::AuthRequest(req) => Ok(req),
            other => Err(ProtocolError::UnexpectedMessage {
                expected: "auth_request",
                got: other.msg_type(),
            }),
        }
    }

    pub fn into_access_request(self) -> Result<AccessRequest, ProtocolError> {
        match self {
            Message::AccessRequest(req) => Ok(req),
            other => Err(ProtocolError::UnexpectedMessage {
                expected: "access_request",
                got: other.msg_type(),
            }),
        }
    }
}

/// Parse a serialized record string back into its JSON object.
pub fn parse_record(serialized: &str) -> Result<Map<String, Value>, ProtocolError> {
    match serde_json::from_str::<Value>(serialized) {
        Ok(Value::Object(obj)) => Ok(obj),
        _ => Err(ProtocolError::invalid_argument(
            "record",
            serialized,
            "a JSON object document",
        )),
    }
}
