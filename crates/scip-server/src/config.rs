//! # Server Configuration
//!
//! Defaults, environment overrides and validation.
//!
//! | Variable | Default | Field |
//! |----------|---------|-------|
//! | `SCIP_BIND_ADDR` | `127.0.0.1:65432` | `network.bind_addr` |
//! | `SCIP_MAX_SESSIONS` | `256` | `network.max_sessions` |
//! | `SCIP_READ_TIMEOUT_SECS` | `60` | `socket.read_timeout` |
//! | `SCIP_PROBE_TIMEOUT_SECS` | `2` | `socket.probe_timeout` |
//! | `SCIP_REQUIRE_PROBE` | `true` | `socket.require_probe` |
//! | `SCIP_DEEPWELL_DIR` | `./deepwell` | `storage.deepwell_dir` |
//! | `SCIP_AUDIT_LOG` | `<deepwell>/audit.log` | `storage.audit_log` |

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use scip_protocol::{DEFAULT_PROBE_TIMEOUT, DEFAULT_READ_TIMEOUT};
use scip_telemetry::parse_flag;
use thiserror::Error;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 65432;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),
}

/// Complete server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    pub socket: SocketConfig,
    pub storage: StorageConfig,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub bind_addr: SocketAddr,
    /// Sessions allowed to run at once; further connections wait.
    pub max_sessions: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_PORT),
            max_sessions: 256,
        }
    }
}

/// Per-connection socket behaviour.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    pub read_timeout: Duration,
    /// Applied only while the probe handshake runs.
    pub probe_timeout: Duration,
    pub require_probe: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            require_probe: true,
        }
    }
}

/// Where the deepwell and the audit trail live.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub deepwell_dir: PathBuf,
    /// Explicit audit log path; `None` means `<deepwell_dir>/audit.log`.
    pub audit_log: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            deepwell_dir: PathBuf::from("./deepwell"),
            audit_log: None,
        }
    }
}

impl StorageConfig {
    pub fn audit_log_path(&self) -> PathBuf {
        self.audit_log
            .clone()
            .unwrap_or_else(|| self.deepwell_dir.join("audit.log"))
    }
}

impl ServerConfig {
    /// Defaults overridden by `SCIP_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parsed(&lookup, "SCIP_BIND_ADDR")? {
            config.network.bind_addr = addr;
        }
        if let Some(max) = parsed(&lookup, "SCIP_MAX_SESSIONS")? {
            config.network.max_sessions = max;
        }
        if let Some(secs) = parsed(&lookup, "SCIP_READ_TIMEOUT_SECS")? {
            config.socket.read_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed(&lookup, "SCIP_PROBE_TIMEOUT_SECS")? {
            config.socket.probe_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = lookup("SCIP_REQUIRE_PROBE") {
            config.socket.require_probe = parse_flag(&flag);
        }
        if let Some(dir) = lookup("SCIP_DEEPWELL_DIR") {
            config.storage.deepwell_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("SCIP_AUDIT_LOG") {
            config.storage.audit_log = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.max_sessions == 0 {
            return Err(ConfigError::InvalidLimit("max_sessions cannot be 0".into()));
        }

        if self.socket.read_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("read_timeout cannot be 0".into()));
        }

        if self.socket.probe_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout("probe_timeout cannot be 0".into()));
        }

        if self.socket.probe_timeout >= self.socket.read_timeout {
            return Err(ConfigError::InvalidTimeout(format!(
                "probe_timeout ({:?}) must be shorter than read_timeout ({:?})",
                self.socket.probe_timeout, self.socket.read_timeout
            )));
        }

        Ok(())
    }
}

fn parsed<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue {
                    var,
                    reason: e.to_string(),
                    value,
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.network.bind_addr.to_string(), "127.0.0.1:65432");
        assert_eq!(config.network.max_sessions, 256);
        assert_eq!(config.socket.read_timeout, Duration::from_secs(60));
        assert!(config.socket.require_probe);
        assert_eq!(
            config.storage.audit_log_path(),
            PathBuf::from("./deepwell/audit.log")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("SCIP_BIND_ADDR", "0.0.0.0:7000"),
            ("SCIP_MAX_SESSIONS", "8"),
            ("SCIP_READ_TIMEOUT_SECS", "30"),
            ("SCIP_PROBE_TIMEOUT_SECS", "1"),
            ("SCIP_REQUIRE_PROBE", "false"),
            ("SCIP_DEEPWELL_DIR", "/srv/deepwell"),
            ("SCIP_AUDIT_LOG", "/var/log/scip/audit.log"),
        ]))
        .unwrap();

        assert_eq!(config.network.bind_addr.port(), 7000);
        assert_eq!(config.network.max_sessions, 8);
        assert_eq!(config.socket.read_timeout, Duration::from_secs(30));
        assert_eq!(config.socket.probe_timeout, Duration::from_secs(1));
        assert!(!config.socket.require_probe);
        assert_eq!(config.storage.deepwell_dir, PathBuf::from("/srv/deepwell"));
        assert_eq!(
            config.storage.audit_log_path(),
            PathBuf::from("/var/log/scip/audit.log")
        );
    }

    #[test]
    fn test_unparseable_value_names_variable() {
        let err = ServerConfig::from_lookup(lookup(&[("SCIP_MAX_SESSIONS", "lots")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { var: "SCIP_MAX_SESSIONS", .. }
        ));
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut config = ServerConfig::default();
        config.network.max_sessions = 0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidLimit(_))));

        let mut config = ServerConfig::default();
        config.socket.read_timeout = Duration::ZERO;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout(_))));

        let mut config = ServerConfig::default();
        config.socket.probe_timeout = config.socket.read_timeout;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimeout(_))));
    }
}
