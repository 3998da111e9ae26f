//! Plain-text rendering of server replies.

use std::fmt::Write;

use scip_protocol::{parse_record, Message};
use serde_json::{Map, Value};

/// ANSI sequence that clears the screen and homes the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Greeting after a successful login.
pub fn welcome(user: &Map<String, Value>) -> String {
    let field = |key: &str| user.get(key).map(scalar).unwrap_or_default();
    format!(
        "Welcome, {} {}. Clearance level {}.\nType HELP for a list of commands.",
        field("title"),
        field("name"),
        field("clearance"),
    )
}

/// Summary of an access decision.
pub fn reply(msg: &Message) -> String {
    match msg {
        Message::AccessGranted(granted) => {
            let mut out = String::new();
            let _ = writeln!(out, "=== {} FILE ===", granted.f_type);
            match parse_record(&granted.f_model) {
                Ok(record) => {
                    for (key, value) in &record {
                        let _ = writeln!(out, "{key}: {}", scalar(value));
                    }
                }
                Err(_) => {
                    let _ = writeln!(out, "{}", granted.f_model);
                }
            }
            for (name, text) in &granted.files {
                let _ = write!(out, "\n--- {name} ---\n{}\n", text.trim_end());
            }
            out.trim_end().to_string()
        }
        Message::AccessRedacted(redacted) => format!(
            "ACCESS DENIED. This file requires {}; you hold {}.",
            redacted.needed_clear, redacted.user_clear
        ),
        Message::AccessExpunged(expunged) => format!(
            "[DATA EXPUNGED] No {} file with id {} exists.",
            expunged.f_type, expunged.f_id
        ),
        Message::AccessTypeFail(fail) => format!(
            "Unknown file type '{}'. Valid types: {}.",
            fail.tried,
            fail.valid.join(", ")
        ),
        other => format!("Unexpected {} from server.", other.msg_type()),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scip_protocol::builders;
    use std::collections::BTreeMap;

    #[test]
    fn test_welcome() {
        let user = serde_json::json!({"name": "Jack Bright", "title": "Dr.", "clearance": 4});
        let text = welcome(user.as_object().unwrap());
        assert!(text.starts_with("Welcome, Dr. Jack Bright. Clearance level 4."));
    }

    #[test]
    fn test_granted_lists_fields_and_files() {
        let record = serde_json::json!({"id": 173, "name": "The Sculpture", "mtf_id": null});
        let files = BTreeMap::from([("desc".to_string(), "Concrete.\n".to_string())]);
        let msg = builders::access_granted("SCP", &record, files).unwrap();

        let text = reply(&msg);
        assert!(text.starts_with("=== SCP FILE ==="));
        assert!(text.contains("name: The Sculpture"));
        assert!(text.contains("mtf_id: -"));
        assert!(text.ends_with("--- desc ---\nConcrete."));
    }

    #[test]
    fn test_denials() {
        let redacted = builders::access_redacted(
            "Level 2 - Restricted",
            "#0087BD",
            "Level 4 - Secret",
            "#FF6D00",
        )
        .unwrap();
        assert_eq!(
            reply(&redacted),
            "ACCESS DENIED. This file requires Level 4 - Secret; you hold Level 2 - Restricted."
        );

        let expunged = builders::access_expunged("MTF", 404).unwrap();
        assert_eq!(reply(&expunged), "[DATA EXPUNGED] No MTF file with id 404 exists.");

        let fail = builders::access_type_fail("DOC", &["SCP", "MTF", "SITE", "USER"]).unwrap();
        assert_eq!(
            reply(&fail),
            "Unknown file type 'DOC'. Valid types: SCP, MTF, SITE, USER."
        );
    }
}
