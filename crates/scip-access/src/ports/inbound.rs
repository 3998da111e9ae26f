//! # Inbound Ports
//!
//! What a session handler calls: authenticate once, then ask for access
//! decisions.

use std::fmt;
use std::net::IpAddr;

use async_trait::async_trait;
use scip_protocol::Message;

use crate::domain::{AccessError, AuthError, User};

/// Credential field that failed authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    UserId,
    Password,
}

impl AuthField {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuthField::UserId => "user_id",
            AuthField::Password => "password",
        }
    }
}

impl fmt::Display for AuthField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a well-formed authentication attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Rejected(AuthField),
    Accepted(User),
}

/// Credential check.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Wrong credentials come back as [`AuthOutcome::Rejected`]; only
    /// malformed input or storage failure is an error.
    async fn authenticate(
        &self,
        user_id: i64,
        password: &str,
        ip: IpAddr,
    ) -> Result<AuthOutcome, AuthError>;
}

/// Access-control decisions.
#[async_trait]
pub trait AccessApi: Send + Sync {
    /// Decide a request and return the response message to send.
    async fn access(
        &self,
        f_type: &str,
        f_id: i64,
        user: &User,
        ip: IpAddr,
    ) -> Result<Message, AccessError>;
}
