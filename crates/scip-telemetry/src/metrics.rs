//! Prometheus metrics for the SCiPnet server.
//!
//! All metrics follow the naming convention: `scip_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., sessions_opened_total)
//! - **Gauge**: Value that can go up or down (e.g., sessions_active)
//! - **Histogram**: Distribution of values (e.g., session_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Registry for every SCiPnet metric
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SESSION METRICS
    // =========================================================================

    /// Connections accepted and handed to a session
    pub static ref SESSIONS_OPENED: Counter = Counter::new(
        "scip_sessions_opened_total",
        "Total number of sessions started"
    ).expect("metric creation failed");

    /// Sessions currently running
    pub static ref ACTIVE_SESSIONS: Gauge = Gauge::new(
        "scip_sessions_active",
        "Number of sessions currently running"
    ).expect("metric creation failed");

    /// Wall-clock session lifetime
    pub static ref SESSION_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "scip_session_duration_seconds",
            "Time from accept to socket close"
        ).buckets(exponential_buckets(0.01, 4.0, 10).expect("bucket layout"))
    ).expect("metric creation failed");

    // =========================================================================
    // DECISION METRICS
    // =========================================================================

    /// Authentication decisions
    pub static ref AUTH_OUTCOMES: CounterVec = CounterVec::new(
        Opts::new("scip_auth_outcomes_total", "Authentication decisions by outcome"),
        &["outcome"]  // success, user_id, password, malformed
    ).expect("metric creation failed");

    /// Access-control decisions
    pub static ref ACCESS_DECISIONS: CounterVec = CounterVec::new(
        Opts::new("scip_access_decisions_total", "Access decisions by outcome"),
        &["outcome"]  // type_fail, expunged, redacted, granted
    ).expect("metric creation failed");

    // =========================================================================
    // TRANSPORT METRICS
    // =========================================================================

    /// Frame-level failures that ended a session
    pub static ref FRAME_ERRORS: CounterVec = CounterVec::new(
        Opts::new("scip_frame_errors_total", "Transport errors by kind"),
        &["kind"]
    ).expect("metric creation failed");
}

/// Proof that the metrics have been registered.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _private: (),
}

/// Register all metrics with [`REGISTRY`].
///
/// Safe to call more than once; collectors already present are kept.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Sessions
        Box::new(SESSIONS_OPENED.clone()),
        Box::new(ACTIVE_SESSIONS.clone()),
        Box::new(SESSION_DURATION.clone()),
        // Decisions
        Box::new(AUTH_OUTCOMES.clone()),
        Box::new(ACCESS_DECISIONS.clone()),
        // Transport
        Box::new(FRAME_ERRORS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle { _private: () })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Holds one slot of [`ACTIVE_SESSIONS`] and observes [`SESSION_DURATION`]
/// when dropped.
pub struct SessionTracker {
    start: std::time::Instant,
}

impl SessionTracker {
    /// Count a new session as opened and active.
    pub fn start() -> Self {
        SESSIONS_OPENED.inc();
        ACTIVE_SESSIONS.inc();
        Self {
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for SessionTracker {
    fn drop(&mut self) {
        ACTIVE_SESSIONS.dec();
        SESSION_DURATION.observe(self.start.elapsed().as_secs_f64());
    }
}
