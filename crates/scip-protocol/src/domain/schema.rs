//! # Message Schema
//!
//! The closed set of message types and the exact payload schema of each.
//! The schema table is the single source of truth for the runtime
//! validator in [`crate::validation`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::ProtocolError;

/// Every message type that may appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    AuthRequest,
    AuthFailed,
    AuthSuccess,
    AccessRequest,
    AccessTypeFail,
    AccessRedacted,
    AccessExpunged,
    AccessGranted,
}

impl MessageType {
    pub const ALL: [MessageType; 8] = [
        MessageType::AuthRequest,
        MessageType::AuthFailed,
        MessageType::AuthSuccess,
        MessageType::AccessRequest,
        MessageType::AccessTypeFail,
        MessageType::AccessRedacted,
        MessageType::AccessExpunged,
        MessageType::AccessGranted,
    ];

    /// Wire name, as carried in the envelope's `type` key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::AuthRequest => "auth_request",
            MessageType::AuthFailed => "auth_failed",
            MessageType::AuthSuccess => "auth_success",
            MessageType::AccessRequest => "access_request",
            MessageType::AccessTypeFail => "access_type_fail",
            MessageType::AccessRedacted => "access_redacted",
            MessageType::AccessExpunged => "access_expunged",
            MessageType::AccessGranted => "access_granted",
        }
    }

    /// Exact `(field, kind)` set for this type's `data` object.
    #[must_use]
    pub fn schema(self) -> &'static [(&'static str, FieldKind)] {
        use FieldKind::*;
        match self {
            MessageType::AuthRequest => &[("user_id", Int), ("password", Str)],
            MessageType::AuthFailed => &[("field", Str)],
            MessageType::AuthSuccess => &[("user", Record)],
            MessageType::AccessRequest => &[("f_type", Str), ("f_id", Int)],
            MessageType::AccessTypeFail => &[("tried", Str), ("valid", StrList)],
            MessageType::AccessRedacted => &[
                ("user_clear", Str),
                ("user_hex", Str),
                ("needed_clear", Str),
                ("needed_hex", Str),
            ],
            MessageType::AccessExpunged => &[("f_type", Str), ("f_id", Int)],
            MessageType::AccessGranted => {
                &[("f_type", Str), ("f_model", Record), ("files", StrMap)]
            }
        }
    }

    /// Whether the type starts with `access_` (the post-authentication set).
    #[must_use]
    pub fn is_access(self) -> bool {
        self.as_str().starts_with("access_")
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownType(s.to_string()))
    }
}

/// Runtime type expected for a payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// JSON integer. Floats and booleans do not qualify.
    Int,
    /// JSON string.
    Str,
    /// JSON array whose every element is a string.
    StrList,
    /// JSON object whose every value is a string.
    StrMap,
    /// JSON string holding a serialized record (itself a JSON object).
    Record,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Int => "int",
            FieldKind::Str => "str",
            FieldKind::StrList => "list[str]",
            FieldKind::StrMap => "dict[str, str]",
            FieldKind::Record => "serialized record",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_parse_back() {
        for t in MessageType::ALL {
            assert_eq!(t.as_str().parse::<MessageType>().unwrap(), t);
        }
    }

    #[test]
    fn test_wire_names_match_serde() {
        for t in MessageType::ALL {
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, serde_json::Value::String(t.as_str().into()));
        }
    }

    #[test]
    fn test_unknown_name_rejected() {
        assert_eq!(
            "AUTH_REQUEST".parse::<MessageType>(),
            Err(ProtocolError::UnknownType("AUTH_REQUEST".into()))
        );
    }

    #[test]
    fn test_schema_fields_unique() {
        for t in MessageType::ALL {
            let schema = t.schema();
            for (i, (name, _)) in schema.iter().enumerate() {
                assert!(
                    !schema[i + 1..].iter().any(|(other, _)| other == name),
                    "{t} repeats field {name}"
                );
            }
        }
    }

    #[test]
    fn test_access_partition() {
        let access: Vec<_> = MessageType::ALL.into_iter().filter(|t| t.is_access()).collect();
        assert_eq!(access.len(), 5);
        assert!(!MessageType::AuthSuccess.is_access());
    }
}
