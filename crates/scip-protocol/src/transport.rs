//! Framed connection with socket timeouts.
//!
//! [`Connection`] owns one byte stream and moves whole frames over it. Every
//! read is bounded by the connection's read timeout. The probe handshake
//! runs under a shorter timeout through [`TimeoutOverride`], which puts the
//! previous value back when it goes out of scope, on success and failure
//! alike.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::codec;
use crate::domain::{FrameError, Message};

/// Sent by the client right after connecting.
pub const PROBE_REQUEST: [u8; 4] = [0x01, 0x02, 0x03, 0x04];

/// Server's answer to [`PROBE_REQUEST`].
pub const PROBE_RESPONSE: [u8; 4] = [0x04, 0x03, 0x02, 0x01];

/// Default read timeout for a fresh connection.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for the probe handshake.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// A framed protocol connection.
#[derive(Debug)]
pub struct Connection<S> {
    stream: S,
    read_timeout: Duration,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    #[must_use]
    pub fn new(stream: S, read_timeout: Duration) -> Self {
        Self {
            stream,
            read_timeout,
        }
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Temporarily replace the read timeout.
    ///
    /// The original value is restored when the returned guard is dropped.
    pub fn with_timeout(&mut self, timeout: Duration) -> TimeoutOverride<'_, S> {
        let original = self.read_timeout;
        self.read_timeout = timeout;
        TimeoutOverride {
            conn: self,
            original,
        }
    }

    pub async fn send(&mut self, msg: &Message) -> Result<(), FrameError> {
        let timeout = self.read_timeout;
        bounded(timeout, codec::send(&mut self.stream, msg)).await
    }

    pub async fn recv(&mut self) -> Result<Message, FrameError> {
        let timeout = self.read_timeout;
        bounded(timeout, codec::recv(&mut self.stream)).await
    }

    /// Client half of the probe handshake.
    pub async fn probe_send(&mut self, timeout: Duration) -> Result<(), FrameError> {
        let mut conn = self.with_timeout(timeout);
        conn.write_raw(&PROBE_REQUEST).await?;
        let reply = conn.read_raw().await?;
        expect_probe(reply, PROBE_RESPONSE)
    }

    /// Server half of the probe handshake.
    pub async fn probe_recv(&mut self, timeout: Duration) -> Result<(), FrameError> {
        let mut conn = self.with_timeout(timeout);
        let request = conn.read_raw().await?;
        expect_probe(request, PROBE_REQUEST)?;
        conn.write_raw(&PROBE_RESPONSE).await
    }

    /// Close the write half. Errors are logged and dropped since the peer
    /// may already be gone.
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "Socket shutdown after peer left");
        }
    }

    async fn write_raw(&mut self, bytes: &[u8]) -> Result<(), FrameError> {
        let timeout = self.read_timeout;
        let stream = &mut self.stream;
        bounded(timeout, async move {
            stream.write_all(bytes).await?;
            stream.flush().await?;
            Ok(())
        })
        .await
    }

    async fn read_raw(&mut self) -> Result<[u8; 4], FrameError> {
        let timeout = self.read_timeout;
        let stream = &mut self.stream;
        bounded(timeout, async move {
            let mut buf = [0u8; 4];
            let mut filled = 0;
            while filled < buf.len() {
                let n = stream.read(&mut buf[filled..]).await?;
                if n == 0 {
                    return Err(FrameError::ConnectionLost { received: filled });
                }
                filled += n;
            }
            Ok(buf)
        })
        .await
    }
}

/// Scoped read-timeout override. See [`Connection::with_timeout`].
pub struct TimeoutOverride<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    conn: &'a mut Connection<S>,
    original: Duration,
}

impl<S> Deref for TimeoutOverride<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Target = Connection<S>;

    fn deref(&self) -> &Self::Target {
        self.conn
    }
}

impl<S> DerefMut for TimeoutOverride<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
    }
}

impl<S> Drop for TimeoutOverride<'_, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn drop(&mut self) {
        self.conn.read_timeout = self.original;
    }
}

async fn bounded<T, F>(timeout: Duration, fut: F) -> Result<T, FrameError>
where
    F: std::future::Future<Output = Result<T, FrameError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(FrameError::Timeout {
            millis: timeout.as_millis(),
        }),
    }
}

fn expect_probe(got: [u8; 4], expected: [u8; 4]) -> Result<(), FrameError> {
    if got == expected {
        Ok(())
    } else {
        Err(FrameError::ProbeMismatch {
            got: got.to_vec(),
            expected: expected.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_probe_handshake_succeeds() {
        let (a, b) = duplex(64);
        let mut client = Connection::new(a, DEFAULT_READ_TIMEOUT);
        let mut server = Connection::new(b, DEFAULT_READ_TIMEOUT);

        let (c, s) = tokio::join!(
            client.probe_send(DEFAULT_PROBE_TIMEOUT),
            server.probe_recv(DEFAULT_PROBE_TIMEOUT)
        );
        c.unwrap();
        s.unwrap();
        assert_eq!(client.read_timeout(), DEFAULT_READ_TIMEOUT);
        assert_eq!(server.read_timeout(), DEFAULT_READ_TIMEOUT);
    }

    #[tokio::test]
    async fn test_probe_mismatch_restores_timeout() {
        let (a, mut b) = duplex(64);
        let mut server = Connection::new(a, Duration::from_secs(30));

        b.write_all(&[9, 9, 9, 9]).await.unwrap();
        let err = server.probe_recv(Duration::from_millis(200)).await.unwrap_err();

        assert!(matches!(err, FrameError::ProbeMismatch { .. }));
        assert_eq!(server.read_timeout(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout_restores_timeout() {
        let (a, _b) = duplex(64);
        let mut server = Connection::new(a, Duration::from_secs(30));

        let err = server.probe_recv(Duration::from_secs(2)).await.unwrap_err();

        assert!(matches!(err, FrameError::Timeout { millis: 2000 }));
        assert_eq!(server.read_timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_timeout_override_restores_on_drop() {
        let (a, _b) = duplex(8);
        let mut conn = Connection::new(a, Duration::from_secs(10));
        {
            let guard = conn.with_timeout(Duration::from_millis(5));
            assert_eq!(guard.read_timeout(), Duration::from_millis(5));
        }
        assert_eq!(conn.read_timeout(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_send_recv_over_connection() {
        let (a, b) = duplex(1024);
        let mut client = Connection::new(a, DEFAULT_READ_TIMEOUT);
        let mut server = Connection::new(b, DEFAULT_READ_TIMEOUT);

        let msg = builders::auth_request(5, "right").unwrap();
        client.send(&msg).await.unwrap();
        assert_eq!(server.recv().await.unwrap(), msg);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_times_out_on_silent_peer() {
        let (a, _b) = duplex(64);
        let mut conn = Connection::new(a, Duration::from_secs(60));
        let err = conn.recv().await.unwrap_err();
        assert!(matches!(err, FrameError::Timeout { .. }));
        assert!(!err.is_disconnect());
    }
}
