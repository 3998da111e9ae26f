//! Audit trail entries.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action recorded for access-control decisions.
pub const ACTION_FILE_ACCESS: &str = "File Access";

/// Action recorded for authentication decisions.
pub const ACTION_AUTHENTICATION: &str = "Authentication";

/// Action recorded when an authenticated session ends on an error.
pub const ACTION_SESSION: &str = "Session";

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub user_id: i64,
    pub ip: IpAddr,
    pub action: String,
    pub details: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Entry stamped with the current time.
    pub fn now(
        user_id: i64,
        ip: IpAddr,
        action: impl Into<String>,
        details: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            user_id,
            ip,
            action: action.into(),
            details: details.into(),
            success,
            timestamp: Utc::now(),
        }
    }

    pub fn file_access(user_id: i64, ip: IpAddr, details: impl Into<String>, success: bool) -> Self {
        Self::now(user_id, ip, ACTION_FILE_ACCESS, details, success)
    }

    pub fn authentication(
        user_id: i64,
        ip: IpAddr,
        details: impl Into<String>,
        success: bool,
    ) -> Self {
        Self::now(user_id, ip, ACTION_AUTHENTICATION, details, success)
    }

    pub fn session(user_id: i64, ip: IpAddr, details: impl Into<String>) -> Self {
        Self::now(user_id, ip, ACTION_SESSION, details, false)
    }
}
