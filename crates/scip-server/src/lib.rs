//! # SCiPnet Server
//!
//! TCP front end for the SCiPnet deepwell.
//!
//! ## Startup Sequence
//!
//! 1. Install telemetry (log subscriber, metrics registry)
//! 2. Load configuration (defaults, `SCIP_*` environment, CLI flags) and validate it
//! 3. Build the [`AppContext`]: deepwell records, text store, audit log
//! 4. Bind the listener and serve until Ctrl-C
//! 5. Log a metrics snapshot
//!
//! ## Module Structure
//!
//! ```text
//! scip-server/
//! ├── config.rs   # ServerConfig: network, socket, storage sections
//! ├── context.rs  # AppContext: authenticator, access engine, audit sink
//! ├── session.rs  # SessionHandler: probe, auth, ordered access loop
//! └── service.rs  # ScipServer: accept loop, session slots, shutdown
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod context;
pub mod service;
pub mod session;

pub use config::{ConfigError, NetworkConfig, ServerConfig, SocketConfig, StorageConfig};
pub use context::AppContext;
pub use service::ScipServer;
pub use session::{decision_label, SessionError, SessionHandler, SessionOutcome};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
