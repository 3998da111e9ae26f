//! Client side of the SCiPnet session.

use std::net::SocketAddr;
use std::time::Duration;

use scip_protocol::{
    builders, parse_record, Connection, FrameError, Message, MessageType, ProtocolError,
};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Frame(#[from] FrameError),

    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("Authentication failed: invalid {field}")]
    Rejected { field: String },

    #[error("Server sent an unexpected {0} message")]
    Unexpected(MessageType),
}

/// A connected terminal session.
pub struct TerminalClient<S> {
    conn: Connection<S>,
}

impl TerminalClient<TcpStream> {
    /// Connect over TCP and run the probe handshake when `probe_timeout`
    /// is set.
    pub async fn connect(
        addr: SocketAddr,
        read_timeout: Duration,
        probe_timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await.map_err(FrameError::from)?;
        debug!(%addr, "Connected");
        Self::handshake(stream, read_timeout, probe_timeout).await
    }
}

impl<S> TerminalClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub async fn handshake(
        stream: S,
        read_timeout: Duration,
        probe_timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let mut conn = Connection::new(stream, read_timeout);
        if let Some(timeout) = probe_timeout {
            conn.probe_send(timeout).await?;
            debug!("Probe acknowledged");
        }
        Ok(Self { conn })
    }

    /// Log in and return the user record the server sent back.
    pub async fn login(
        &mut self,
        user_id: i64,
        password: &str,
    ) -> Result<Map<String, Value>, ClientError> {
        self.conn
            .send(&builders::auth_request(user_id, password)?)
            .await?;
        match self.conn.recv().await? {
            Message::AuthSuccess(success) => Ok(parse_record(&success.user)?),
            Message::AuthFailed(failed) => Err(ClientError::Rejected {
                field: failed.field,
            }),
            other => Err(ClientError::Unexpected(other.msg_type())),
        }
    }

    /// Request one file and return the server's decision.
    pub async fn access(&mut self, f_type: &str, f_id: i64) -> Result<Message, ClientError> {
        self.conn
            .send(&builders::access_request(f_type, f_id)?)
            .await?;
        let reply = self.conn.recv().await?;
        if reply.msg_type().is_access() && reply.msg_type() != MessageType::AccessRequest {
            Ok(reply)
        } else {
            Err(ClientError::Unexpected(reply.msg_type()))
        }
    }

    /// Close the connection; the server ends the session when it sees EOF.
    pub async fn logout(mut self) {
        self.conn.shutdown().await;
    }
}
