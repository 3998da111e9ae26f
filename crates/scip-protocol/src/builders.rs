//! Message builders.
//!
//! One constructor per message type. Each checks the semantics of its
//! arguments (non-empty strings, positive ids, `#RRGGBB` colours,
//! object-shaped records) and then hands the payload to
//! [`gen_msg`], so the schema check still applies.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::domain::{Message, MessageType, ProtocolError};
use crate::validation::gen_msg;

pub fn auth_request(user_id: i64, password: &str) -> Result<Message, ProtocolError> {
    require_positive("user_id", user_id)?;
    require_non_empty("password", password)?;
    build(
        MessageType::AuthRequest,
        json!({"user_id": user_id, "password": password}),
    )
}

/// `field` names the credential that failed (`user_id` or `password`).
pub fn auth_failed(field: &str) -> Result<Message, ProtocolError> {
    require_non_empty("field", field)?;
    build(MessageType::AuthFailed, json!({"field": field}))
}

pub fn auth_success<U: Serialize>(user: &U) -> Result<Message, ProtocolError> {
    let user = serialize_record("user", user)?;
    build(MessageType::AuthSuccess, json!({"user": user}))
}

pub fn access_request(f_type: &str, f_id: i64) -> Result<Message, ProtocolError> {
    require_non_empty("f_type", f_type)?;
    require_positive("f_id", f_id)?;
    build(
        MessageType::AccessRequest,
        json!({"f_type": f_type, "f_id": f_id}),
    )
}

/// `tried` is echoed as received, even when empty.
pub fn access_type_fail<S: AsRef<str>>(tried: &str, valid: &[S]) -> Result<Message, ProtocolError> {
    if valid.is_empty() {
        return Err(ProtocolError::invalid_argument(
            "valid",
            "[]",
            "a non-empty list of file types",
        ));
    }
    let valid: Vec<&str> = valid.iter().map(AsRef::as_ref).collect();
    for ty in &valid {
        require_non_empty("valid", ty)?;
    }
    build(
        MessageType::AccessTypeFail,
        json!({"tried": tried, "valid": valid}),
    )
}

pub fn access_redacted(
    user_clear: &str,
    user_hex: &str,
    needed_clear: &str,
    needed_hex: &str,
) -> Result<Message, ProtocolError> {
    require_non_empty("user_clear", user_clear)?;
    require_hex_colour("user_hex", user_hex)?;
    require_non_empty("needed_clear", needed_clear)?;
    require_hex_colour("needed_hex", needed_hex)?;
    build(
        MessageType::AccessRedacted,
        json!({
            "user_clear": user_clear,
            "user_hex": user_hex,
            "needed_clear": needed_clear,
            "needed_hex": needed_hex,
        }),
    )
}

/// The id is echoed verbatim; a non-positive id is still a valid
/// "no such record" answer.
pub fn access_expunged(f_type: &str, f_id: i64) -> Result<Message, ProtocolError> {
    require_non_empty("f_type", f_type)?;
    build(
        MessageType::AccessExpunged,
        json!({"f_type": f_type, "f_id": f_id}),
    )
}

pub fn access_granted<R: Serialize>(
    f_type: &str,
    model: &R,
    files: BTreeMap<String, String>,
) -> Result<Message, ProtocolError> {
    require_non_empty("f_type", f_type)?;
    let f_model = serialize_record("f_model", model)?;
    if let Some(name) = files.keys().find(|name| name.trim().is_empty()) {
        return Err(ProtocolError::invalid_argument(
            "files",
            name,
            "non-empty blob names",
        ));
    }
    build(
        MessageType::AccessGranted,
        json!({"f_type": f_type, "f_model": f_model, "files": files}),
    )
}

fn build(msg_type: MessageType, data: Value) -> Result<Message, ProtocolError> {
    match data {
        Value::Object(map) => gen_msg(msg_type, map),
        _ => gen_msg(msg_type, Map::new()),
    }
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ProtocolError> {
    if value.trim().is_empty() {
        return Err(ProtocolError::invalid_argument(
            field,
            value,
            "a non-empty string",
        ));
    }
    Ok(())
}

fn require_positive(field: &'static str, value: i64) -> Result<(), ProtocolError> {
    if value <= 0 {
        return Err(ProtocolError::invalid_argument(
            field,
            value,
            "a positive integer",
        ));
    }
    Ok(())
}

/// `#RRGGBB`, either case.
fn require_hex_colour(field: &'static str, value: &str) -> Result<(), ProtocolError> {
    let valid = value.len() == 7
        && value
            .strip_prefix('#')
            .is_some_and(|digits| hex::decode(digits).is_ok());
    if !valid {
        return Err(ProtocolError::invalid_argument(
            field,
            value,
            "a #RRGGBB colour",
        ));
    }
    Ok(())
}

fn serialize_record<R: Serialize>(field: &'static str, record: &R) -> Result<String, ProtocolError> {
    match serde_json::to_value(record) {
        Ok(value @ Value::Object(_)) => Ok(value.to_string()),
        Ok(other) => Err(ProtocolError::invalid_argument(
            field,
            other,
            "a record serializing to a JSON object",
        )),
        Err(e) => Err(ProtocolError::invalid_argument(
            field,
            e,
            "a serializable record",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_record;

    #[derive(Serialize)]
    struct Personnel {
        id: i64,
        name: &'static str,
        clearance: u8,
    }

    #[test]
    fn test_auth_request_checks_arguments() {
        assert!(auth_request(5, "right").is_ok());
        assert!(matches!(
            auth_request(0, "right"),
            Err(ProtocolError::InvalidArgument { field: "user_id", .. })
        ));
        assert!(matches!(
            auth_request(5, "  "),
            Err(ProtocolError::InvalidArgument { field: "password", .. })
        ));
    }

    #[test]
    fn test_auth_success_embeds_serialized_record() {
        let user = Personnel {
            id: 5,
            name: "Dr. Bright",
            clearance: 4,
        };
        let Message::AuthSuccess(payload) = auth_success(&user).unwrap() else {
            panic!("wrong variant");
        };
        let record = parse_record(&payload.user).unwrap();
        assert_eq!(record["name"], "Dr. Bright");
        assert_eq!(record["clearance"], 4);
    }

    #[test]
    fn test_auth_success_rejects_non_object_record() {
        assert!(auth_success(&vec![1, 2, 3]).is_err());
        assert!(auth_success(&"user").is_err());
    }

    #[test]
    fn test_access_request_rejects_non_positive_id() {
        assert!(access_request("SCP", -1).is_err());
        assert!(access_request("", 1).is_err());
        assert!(access_request("scp", 1).is_ok());
    }

    #[test]
    fn test_access_expunged_echoes_any_id() {
        let Message::AccessExpunged(payload) = access_expunged("MTF", -4).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(payload.f_id, -4);
    }

    #[test]
    fn test_access_type_fail_requires_valid_list() {
        assert!(access_type_fail::<&str>("XYZ", &[]).is_err());
        let Message::AccessTypeFail(payload) = access_type_fail("", &["SCP", "MTF"]).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(payload.tried, "");
        assert_eq!(payload.valid, vec!["SCP", "MTF"]);
    }

    #[test]
    fn test_access_redacted_checks_colours() {
        let ok = access_redacted(
            "Level 2 - Restricted",
            "#0087BD",
            "Level 4 - Secret",
            "#ff6d00",
        );
        assert!(ok.is_ok());

        for bad in ["0087BD", "#0087B", "#0087BDX", "#GG87BD", ""] {
            assert!(
                access_redacted("Level 2 - Restricted", bad, "Level 4 - Secret", "#FF6D00")
                    .is_err(),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn test_access_granted_bundles_files() {
        let record = Personnel {
            id: 173,
            name: "The Sculpture",
            clearance: 3,
        };
        let mut files = BTreeMap::new();
        files.insert("desc".to_string(), "Concrete and rebar.".to_string());

        let Message::AccessGranted(payload) = access_granted("SCP", &record, files).unwrap() else {
            panic!("wrong variant");
        };
        assert_eq!(payload.f_type, "SCP");
        assert_eq!(payload.files["desc"], "Concrete and rebar.");
        assert_eq!(parse_record(&payload.f_model).unwrap()["id"], 173);
    }

    #[test]
    fn test_access_granted_rejects_blank_blob_name() {
        let mut files = BTreeMap::new();
        files.insert(" ".to_string(), "x".to_string());
        let record = Personnel {
            id: 1,
            name: "x",
            clearance: 1,
        };
        assert!(access_granted("SCP", &record, files).is_err());
    }
}
