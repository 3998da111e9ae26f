//! # SCiPnet Telemetry
//!
//! Logging and metrics shared by the SCiPnet binaries.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with an `EnvFilter`; human-readable in
//!   development, JSON inside containers
//! - **Metrics**: Prometheus counters, gauges and histograms in a crate-local
//!   registry, rendered as text by [`encode_metrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use scip_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(TelemetryConfig::for_service("scip-server"))?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SCIP_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter directive |
//! | `SCIP_JSON_LOGS` | `false` (`true` in containers) | JSON log output |
//! | `SCIP_SERVICE_NAME` | `scipnet` | Service name on the startup event |
//! | `NO_COLOR` | unset | Disable ANSI colours |

#![warn(clippy::all)]

mod config;
mod logging;
pub mod metrics;

pub use config::{parse_flag, TelemetryConfig};
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, SessionTracker, ACCESS_DECISIONS,
    ACTIVE_SESSIONS, AUTH_OUTCOMES, FRAME_ERRORS, SESSIONS_OPENED, SESSION_DURATION,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the log subscriber.
///
/// Returns a guard to hold for the lifetime of the process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(&config)?;

    tracing::info!(service = %config.service_name, version = VERSION, "Telemetry initialized");

    Ok(TelemetryGuard {
        service_name: config.service_name,
        _metrics: metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_metric_inc_macro() {
        let before = AUTH_OUTCOMES.with_label_values(&["success"]).get();
        metric_inc!(AUTH_OUTCOMES, &["success"]);
        assert!(AUTH_OUTCOMES.with_label_values(&["success"]).get() >= before + 1.0);
    }
}
