//! Strict structural validation at the trust boundary.
//!
//! Bytes off the wire are untyped. Before anything is handed to a typed
//! [`Message`], the decoded document must be exactly `{type, data}`, the
//! type must be known, `data` must carry exactly the schema's key set, and
//! every value must have the schema's runtime type. Nothing is coerced.

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::{FieldKind, Message, MessageType, ProtocolError};

/// Validate a decoded envelope and return its message type.
pub fn validate_msg(msg: &Value) -> Result<MessageType, ProtocolError> {
    let envelope = match msg {
        Value::Object(obj) => obj,
        other => {
            return Err(ProtocolError::NotAnObject {
                found: value_kind(other),
            })
        }
    };

    for key in ["type", "data"] {
        if !envelope.contains_key(key) {
            return Err(ProtocolError::MissingEnvelopeKey { key });
        }
    }
    if let Some(extra) = envelope.keys().find(|k| *k != "type" && *k != "data") {
        return Err(ProtocolError::UnexpectedEnvelopeKey { key: extra.clone() });
    }

    let msg_type = match &envelope["type"] {
        Value::String(name) => name.parse::<MessageType>()?,
        other => return Err(ProtocolError::UnknownType(other.to_string())),
    };

    match &envelope["data"] {
        Value::Object(data) => validate_data(msg_type, data)?,
        other => {
            return Err(ProtocolError::DataNotAnObject {
                msg_type,
                found: value_kind(other),
            })
        }
    }

    Ok(msg_type)
}

/// Check `data` against the schema of `msg_type`.
pub fn validate_data(msg_type: MessageType, data: &Map<String, Value>) -> Result<(), ProtocolError> {
    let schema = msg_type.schema();

    for &(field, kind) in schema {
        let value = data.get(field).ok_or(ProtocolError::MissingField {
            msg_type,
            field,
        })?;
        if !kind.matches(value) {
            return Err(ProtocolError::TypeMismatch {
                msg_type,
                field,
                expected: kind,
                found: value_kind(value),
            });
        }
    }

    if let Some(extra) = data
        .keys()
        .find(|k| !schema.iter().any(|(field, _)| *field == k.as_str()))
    {
        return Err(ProtocolError::UnexpectedField {
            msg_type,
            field: extra.clone(),
        });
    }

    Ok(())
}

/// Validate `data` for `msg_type` and compose the typed message.
///
/// Every outgoing message passes through here.
pub fn gen_msg(msg_type: MessageType, data: Map<String, Value>) -> Result<Message, ProtocolError> {
    validate_data(msg_type, &data)?;
    from_validated(msg_type, data)
}

/// Convert an envelope that already passed [`validate_msg`] into a `Message`.
pub(crate) fn message_from_value(value: Value) -> Result<Message, ProtocolError> {
    let msg_type = validate_msg(&value)?;
    let data = match value {
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Object(data)) => data,
            _ => return Err(ProtocolError::MissingEnvelopeKey { key: "data" }),
        },
        other => {
            return Err(ProtocolError::NotAnObject {
                found: value_kind(&other),
            })
        }
    };
    from_validated(msg_type, data)
}

fn from_validated(msg_type: MessageType, data: Map<String, Value>) -> Result<Message, ProtocolError> {
    let mut envelope = Map::with_capacity(2);
    envelope.insert("type".into(), Value::String(msg_type.as_str().into()));
    envelope.insert("data".into(), Value::Object(data));

    serde_json::from_value(Value::Object(envelope)).map_err(|e| {
        debug!(msg_type = %msg_type, error = %e, "Validated data did not map onto payload");
        ProtocolError::invalid_argument("data", e, "a payload matching the schema")
    })
}

impl FieldKind {
    /// Whether `value` has this kind's runtime type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (FieldKind::Int, Value::Number(n)) => n.is_i64(),
            (FieldKind::Str, Value::String(_)) => true,
            (FieldKind::StrList, Value::Array(items)) => items.iter().all(Value::is_string),
            (FieldKind::StrMap, Value::Object(map)) => map.values().all(Value::is_string),
            (FieldKind::Record, Value::String(s)) => {
                matches!(serde_json::from_str::<Value>(s), Ok(Value::Object(_)))
            }
            _ => false,
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("test data must be an object"),
        }
    }

    fn conformant(t: MessageType) -> Map<String, Value> {
        let record = r#"{"id": 1}"#;
        data(match t {
            MessageType::AuthRequest => json!({"user_id": 5, "password": "right"}),
            MessageType::AuthFailed => json!({"field": "password"}),
            MessageType::AuthSuccess => json!({"user": record}),
            MessageType::AccessRequest => json!({"f_type": "SCP", "f_id": 173}),
            MessageType::AccessTypeFail => json!({"tried": "XYZ", "valid": ["SCP", "MTF"]}),
            MessageType::AccessRedacted => json!({
                "user_clear": "Level 2 - Restricted",
                "user_hex": "#0087BD",
                "needed_clear": "Level 4 - Secret",
                "needed_hex": "#FF6D00"
            }),
            MessageType::AccessExpunged => json!({"f_type": "MTF", "f_id": 404}),
            MessageType::AccessGranted => json!({
                "f_type": "SCP",
                "f_model": record,
                "files": {"desc": "text"}
            }),
        })
    }

    #[test]
    fn test_gen_msg_accepts_conformant_data_for_every_type() {
        for t in MessageType::ALL {
            let msg = gen_msg(t, conformant(t)).unwrap();
            assert_eq!(msg.msg_type(), t);

            let value = msg.to_value().unwrap();
            assert_eq!(validate_msg(&value).unwrap(), t);

            let keys: Vec<_> = msg.data().unwrap().keys().cloned().collect();
            let mut expected: Vec<_> = t.schema().iter().map(|(f, _)| f.to_string()).collect();
            expected.sort();
            assert_eq!(keys, expected);
        }
    }

    #[test]
    fn test_gen_msg_rejects_missing_key() {
        for t in MessageType::ALL {
            for &(field, _) in t.schema() {
                let mut d = conformant(t);
                d.remove(field);
                assert_eq!(
                    gen_msg(t, d),
                    Err(ProtocolError::MissingField { msg_type: t, field })
                );
            }
        }
    }

    #[test]
    fn test_gen_msg_rejects_extra_key() {
        for t in MessageType::ALL {
            let mut d = conformant(t);
            d.insert("extra".into(), json!("x"));
            assert!(matches!(
                gen_msg(t, d),
                Err(ProtocolError::UnexpectedField { field, .. }) if field == "extra"
            ));
        }
    }

    #[test]
    fn test_gen_msg_rejects_string_id() {
        let d = data(json!({"f_type": "SCP", "f_id": "173"}));
        assert!(matches!(
            gen_msg(MessageType::AccessRequest, d),
            Err(ProtocolError::TypeMismatch {
                field: "f_id",
                expected: FieldKind::Int,
                found: "str",
                ..
            })
        ));
    }

    #[test]
    fn test_int_rejects_float_and_bool() {
        assert!(!FieldKind::Int.matches(&json!(1.5)));
        assert!(!FieldKind::Int.matches(&json!(true)));
        assert!(!FieldKind::Int.matches(&json!(u64::MAX)));
        assert!(FieldKind::Int.matches(&json!(-3)));
    }

    #[test]
    fn test_collection_kinds_check_elements() {
        assert!(!FieldKind::StrList.matches(&json!(["SCP", 1])));
        assert!(FieldKind::StrList.matches(&json!([])));
        assert!(!FieldKind::StrMap.matches(&json!({"desc": null})));
        assert!(!FieldKind::Record.matches(&json!("[1, 2]")));
        assert!(!FieldKind::Record.matches(&json!({"id": 1})));
    }

    #[test]
    fn test_validate_msg_envelope_shape() {
        assert!(matches!(
            validate_msg(&json!([1, 2])),
            Err(ProtocolError::NotAnObject { found: "list" })
        ));
        assert_eq!(
            validate_msg(&json!({"type": "auth_failed"})),
            Err(ProtocolError::MissingEnvelopeKey { key: "data" })
        );
        assert!(matches!(
            validate_msg(&json!({"type": "auth_failed", "data": {"field": "x"}, "id": 1})),
            Err(ProtocolError::UnexpectedEnvelopeKey { .. })
        ));
        assert!(matches!(
            validate_msg(&json!({"type": "shutdown", "data": {}})),
            Err(ProtocolError::UnknownType(_))
        ));
        assert!(matches!(
            validate_msg(&json!({"type": "auth_failed", "data": "password"})),
            Err(ProtocolError::DataNotAnObject { .. })
        ));
    }

    #[test]
    fn test_message_from_value_builds_typed_payload() {
        let msg = message_from_value(json!({
            "type": "auth_request",
            "data": {"user_id": 5, "password": "wrong"}
        }))
        .unwrap();
        let req = msg.into_auth_request().unwrap();
        assert_eq!(req.user_id, 5);
        assert_eq!(req.password, "wrong");
    }
}
