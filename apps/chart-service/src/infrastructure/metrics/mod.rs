//! Prometheus Metrics Module
//!
//! Exposes subscription metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Calls**: Subscription calls by outcome and rejection reason
//! - **Records**: Bar records delivered to clients
//! - **Streams**: Active and cancelled streams
//! - **Latency**: Time from call acceptance to stream close
//!
//! Metrics never feed back into call handling.
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static INIT_LOCK: parking_lot::Mutex<()> = parking_lot::const_mutex(());

/// Initialize the Prometheus metrics recorder.
///
/// Later calls return the handle installed by the first one.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let _guard = INIT_LOCK.lock();
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();

    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "chart_service_calls_total",
        "Total subscription calls by outcome"
    );
    describe_counter!(
        "chart_service_rejections_total",
        "Total rejected subscription calls by reason"
    );
    describe_counter!(
        "chart_service_records_sent_total",
        "Total bar records delivered to clients"
    );
    describe_counter!(
        "chart_service_streams_cancelled_total",
        "Total streams stopped early by client disconnect or shutdown"
    );

    describe_gauge!(
        "chart_service_active_streams",
        "Number of streams currently producing records"
    );

    describe_histogram!(
        "chart_service_call_duration_seconds",
        "Time from call acceptance to stream close"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric labels for call outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// Request passed validation and streamed.
    Accepted,
    /// Request failed validation.
    Rejected,
}

impl CallOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

/// Record a completed validation step.
pub fn record_call(outcome: CallOutcome) {
    counter!("chart_service_calls_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record a rejected call by machine-readable reason.
pub fn record_rejection(reason: &'static str) {
    counter!("chart_service_rejections_total", "reason" => reason).increment(1);
}

/// Record records delivered on one stream.
pub fn record_records_sent(count: u64) {
    counter!("chart_service_records_sent_total").increment(count);
}

/// Record a stream that stopped before its last record.
pub fn record_stream_cancelled() {
    counter!("chart_service_streams_cancelled_total").increment(1);
}

/// Update the active stream count.
#[allow(clippy::cast_precision_loss)]
pub fn set_active_streams(count: u64) {
    gauge!("chart_service_active_streams").set(count as f64);
}

/// Record the lifetime of one stream.
pub fn record_call_duration(duration: Duration) {
    histogram!("chart_service_call_duration_seconds").record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_outcome_as_str() {
        assert_eq!(CallOutcome::Accepted.as_str(), "accepted");
        assert_eq!(CallOutcome::Rejected.as_str(), "rejected");
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        // Must not panic even if no recorder is installed
        record_call(CallOutcome::Accepted);
        record_rejection("EMPTY_SYMBOL_LIST");
        record_records_sent(3);
        record_stream_cancelled();
        set_active_streams(1);
        record_call_duration(Duration::from_millis(5));
    }

    #[test]
    fn init_is_idempotent() {
        let first = init_metrics().unwrap();
        let second = init_metrics().unwrap();

        record_call(CallOutcome::Rejected);

        assert!(get_metrics_handle().is_some());
        assert!(first.render().contains("chart_service_calls_total"));
        assert!(second.render().contains("chart_service_calls_total"));
    }
}
