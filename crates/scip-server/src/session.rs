//! # Session Handler
//!
//! One session per accepted connection:
//!
//! ```text
//! ACCEPTED ──probe──► AWAIT_AUTH ──auth ok──► AUTHENTICATED ⟲ access request
//!    │                   │  │                      │
//!    │ probe fails       │  └─ auth failed ──► AUTH_FAILED sent, close
//!    ▼                   ▼                         ▼
//!  close (error)     peer gone: close       peer gone: close
//! ```
//!
//! Requests are answered strictly in arrival order. The socket is shut
//! down on every exit path, including errors.

use std::net::SocketAddr;
use std::sync::Arc;

use scip_access::{AccessError, AuditLogEntry, AuthError, AuthOutcome, StoreError, User};
use scip_protocol::{builders, Connection, FrameError, Message, ProtocolError};
use scip_telemetry::{
    log_event, metric_inc, SessionTracker, ACCESS_DECISIONS, AUTH_OUTCOMES, FRAME_ERRORS,
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::instrument;

use crate::config::SocketConfig;
use crate::context::AppContext;

/// Failures that end a session abnormally.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Frame(#[from] FrameError),

    #[error("Protocol violation: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Authentication backend failure: {0}")]
    Auth(#[from] AuthError),

    #[error("Access decision failed: {0}")]
    Access(#[from] AccessError),

    #[error("Audit failure: {0}")]
    Audit(#[from] StoreError),
}

/// How a session ended when nothing went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The peer left before sending credentials.
    Abandoned,
    /// AUTH_FAILED was sent naming `field`.
    Rejected { field: &'static str },
    /// An authenticated peer disconnected.
    Closed { user_id: i64, requests: u64 },
}

/// Metric label for an access reply.
pub fn decision_label(reply: &Message) -> &'static str {
    match reply {
        Message::AccessTypeFail(_) => "type_fail",
        Message::AccessExpunged(_) => "expunged",
        Message::AccessRedacted(_) => "redacted",
        Message::AccessGranted(_) => "granted",
        _ => "other",
    }
}

/// Runs sessions against a shared [`AppContext`].
pub struct SessionHandler {
    ctx: Arc<AppContext>,
    socket: SocketConfig,
}

impl SessionHandler {
    pub fn new(ctx: Arc<AppContext>, socket: SocketConfig) -> Self {
        Self { ctx, socket }
    }

    /// Drive one connection to completion and close it.
    #[instrument(name = "session", skip_all, fields(session_id = id, peer = %peer))]
    pub async fn run<S>(
        &self,
        id: u64,
        peer: SocketAddr,
        stream: S,
    ) -> Result<SessionOutcome, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let _tracker = SessionTracker::start();
        let mut conn = Connection::new(stream, self.socket.read_timeout);
        let mut user = None;

        let result = self.exchange(&mut conn, peer, &mut user).await;
        conn.shutdown().await;

        match &result {
            Ok(outcome) => {
                log_event!(info, "session", "Session closed", outcome = ?outcome);
            }
            Err(e) => self.record_failure(e, peer, user.as_ref()).await,
        }
        result
    }

    async fn exchange<S>(
        &self,
        conn: &mut Connection<S>,
        peer: SocketAddr,
        user_slot: &mut Option<User>,
    ) -> Result<SessionOutcome, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        if self.socket.require_probe {
            conn.probe_recv(self.socket.probe_timeout).await?;
            log_event!(debug, "session", "Probe answered");
        }

        let request = match conn.recv().await {
            Ok(msg) => msg.into_auth_request()?,
            Err(e) if e.is_disconnect() => return Ok(SessionOutcome::Abandoned),
            Err(e) => return Err(e.into()),
        };

        let outcome = self
            .ctx
            .authenticator
            .authenticate(request.user_id, &request.password, peer.ip())
            .await;
        let user = match outcome {
            Ok(AuthOutcome::Accepted(user)) => user,
            Ok(AuthOutcome::Rejected(field)) => {
                return self.reject(conn, field.as_str(), field.as_str()).await;
            }
            Err(e @ AuthError::Store(_)) => return Err(e.into()),
            Err(AuthError::CorruptCredential(user_id)) => {
                log_event!(error, "session", "Stored credential is unreadable", user_id = user_id);
                return self.reject(conn, "password", "corrupt").await;
            }
            Err(e) => {
                log_event!(warn, "session", "Malformed credentials", error = %e);
                return self.reject(conn, e.field(), "malformed").await;
            }
        };

        conn.send(&builders::auth_success(&user)?).await?;
        metric_inc!(AUTH_OUTCOMES, &["success"]);
        log_event!(
            info,
            "session",
            "Authenticated",
            user_id = user.id,
            clearance = user.clearance.get()
        );
        let user: &User = user_slot.insert(user);

        let mut requests = 0u64;
        loop {
            let msg = match conn.recv().await {
                Ok(msg) => msg,
                Err(e) if e.is_disconnect() => break,
                Err(e) => return Err(e.into()),
            };
            let request = msg.into_access_request()?;
            let reply = self
                .ctx
                .access
                .access(&request.f_type, request.f_id, user, peer.ip())
                .await?;
            metric_inc!(ACCESS_DECISIONS, &[decision_label(&reply)]);
            conn.send(&reply).await?;
            requests += 1;
        }

        Ok(SessionOutcome::Closed {
            user_id: user.id,
            requests,
        })
    }

    async fn reject<S>(
        &self,
        conn: &mut Connection<S>,
        field: &'static str,
        outcome: &'static str,
    ) -> Result<SessionOutcome, SessionError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        conn.send(&builders::auth_failed(field)?).await?;
        metric_inc!(AUTH_OUTCOMES, &[outcome]);
        log_event!(info, "session", "Authentication failed", field = field);
        Ok(SessionOutcome::Rejected { field })
    }

    /// Count and log a failed session. Once a user is known the failure
    /// also goes to the audit trail.
    async fn record_failure(&self, error: &SessionError, peer: SocketAddr, user: Option<&User>) {
        if let SessionError::Frame(frame) = error {
            metric_inc!(FRAME_ERRORS, &[frame.kind()]);
        }

        let Some(user) = user else {
            log_event!(warn, "session", "Connection dropped before authentication", reason = %error);
            return;
        };

        log_event!(warn, "session", "Session terminated", user_id = user.id, reason = %error);
        let entry = AuditLogEntry::session(user.id, peer.ip(), format!("Session terminated: {error}"));
        if let Err(e) = self.ctx.audit.append(entry).await {
            log_event!(error, "session", "Could not audit session failure", error = %e);
        }
    }
}
