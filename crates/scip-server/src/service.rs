//! # Listener Service
//!
//! Accepts TCP connections and spawns one session task per connection.
//! A semaphore bounds concurrent sessions; once it is exhausted the accept
//! loop waits and new peers queue in the listen backlog.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use scip_telemetry::{log_event, log_session_event};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

use crate::config::ServerConfig;
use crate::context::AppContext;
use crate::session::SessionHandler;

/// Pause after a failed `accept` so descriptor exhaustion does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Bound listener plus everything needed to serve it.
pub struct ScipServer {
    listener: TcpListener,
    handler: Arc<SessionHandler>,
    slots: Arc<Semaphore>,
    max_sessions: usize,
    next_id: AtomicU64,
}

impl ScipServer {
    /// Bind `config.network.bind_addr`.
    pub async fn bind(config: &ServerConfig, ctx: Arc<AppContext>) -> io::Result<Self> {
        let listener = TcpListener::bind(config.network.bind_addr).await?;
        let handler = Arc::new(SessionHandler::new(ctx, config.socket.clone()));
        Ok(Self {
            listener,
            handler,
            slots: Arc::new(Semaphore::new(config.network.max_sessions)),
            max_sessions: config.network.max_sessions,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` resolves, then abort the sessions still
    /// running. Aborted sessions drop their sockets, which closes them.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        log_event!(
            info,
            "listener",
            "Listening",
            addr = %addr,
            max_sessions = self.max_sessions
        );

        tokio::pin!(shutdown);
        let mut sessions = JoinSet::new();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log_event!(info, "listener", "Shutdown requested");
                    break;
                }
                Some(joined) = sessions.join_next() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            log_event!(error, "listener", "Session task panicked", error = %e);
                        }
                    }
                }
                accepted = next_connection(&self.listener, &self.slots) => {
                    let (permit, stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            log_event!(warn, "listener", "Accept failed", error = %e);
                            tokio::time::sleep(ACCEPT_BACKOFF).await;
                            continue;
                        }
                    };

                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    log_session_event!(info, id, peer, "Connection accepted");

                    let handler = Arc::clone(&self.handler);
                    sessions.spawn(async move {
                        let _permit = permit;
                        // Outcomes and failures are logged by the handler.
                        let _ = handler.run(id, peer, stream).await;
                    });
                }
            }
        }

        let remaining = sessions.len();
        sessions.shutdown().await;
        log_event!(info, "listener", "Listener stopped", aborted_sessions = remaining);
        Ok(())
    }
}

/// Wait for a free session slot, then for a connection.
async fn next_connection(
    listener: &TcpListener,
    slots: &Arc<Semaphore>,
) -> io::Result<(OwnedSemaphorePermit, TcpStream, SocketAddr)> {
    let permit = Arc::clone(slots)
        .acquire_owned()
        .await
        .map_err(io::Error::other)?;
    let (stream, peer) = listener.accept().await?;
    if let Err(e) = stream.set_nodelay(true) {
        log_event!(debug, "listener", "Could not disable Nagle", peer = %peer, error = %e);
    }
    Ok((permit, stream, peer))
}
