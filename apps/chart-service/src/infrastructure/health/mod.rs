//! Health and Metrics HTTP Server
//!
//! Side-channel HTTP surface next to the gRPC listener: process status, call
//! counters and the Prometheus scrape target.
//!
//! # Endpoints
//!
//! - `GET /health`: JSON status with uptime, registry size and call counters
//! - `GET /healthz`: liveness, always `OK`
//! - `GET /readyz`: `READY` while the gRPC listener is serving
//! - `GET /metrics`: Prometheus text exposition

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::grpc::server::{ServerStats, StatsSnapshot};
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Number of symbols clients may request, sentinel included.
    pub registry_size: usize,
    /// Call statistics.
    pub calls: CallStatus,
}

/// Coarse process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Serving calls.
    Healthy,
    /// Listener not accepting calls yet, or already stopped.
    Starting,
}

/// Call statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CallStatus {
    /// Streams currently producing records.
    pub active_streams: u64,
    /// Calls handled since start, accepted or rejected.
    pub served: u64,
    /// Calls rejected before streaming.
    pub rejected: u64,
    /// Records delivered.
    pub records_sent: u64,
    /// Streams stopped early.
    pub cancelled: u64,
}

impl From<StatsSnapshot> for CallStatus {
    fn from(snapshot: StatsSnapshot) -> Self {
        Self {
            active_streams: snapshot.active_streams,
            served: snapshot.calls_served(),
            rejected: snapshot.calls_rejected,
            records_sent: snapshot.records_sent,
            cancelled: snapshot.streams_cancelled,
        }
    }
}

// =============================================================================
// Health Server State
// =============================================================================

/// Data the handlers report from.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    registry_size: usize,
    stats: Arc<ServerStats>,
}

impl HealthServerState {
    /// Start the uptime clock now.
    #[must_use]
    pub fn new(version: String, registry_size: usize, stats: Arc<ServerStats>) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            registry_size,
            stats,
        }
    }

    /// Build the current health report.
    #[must_use]
    pub fn report(&self) -> HealthResponse {
        let status = if self.stats.is_serving() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Starting
        };

        HealthResponse {
            status,
            version: self.version.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            current_time: Utc::now(),
            registry_size: self.registry_size,
            calls: self.stats.snapshot().into(),
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Axum server bound to the health port.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Configure a server on `port`, stopped by `cancel`.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Build the router without binding a socket.
    #[must_use]
    pub fn router(state: Arc<HealthServerState>) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(liveness_handler))
            .route("/readyz", get(readiness_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
    }

    /// Bind `0.0.0.0:port` and serve until the token is cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        self.serve(listener).await
    }

    /// Serve on an already bound listener until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError::ServerFailed` if the HTTP server fails.
    pub async fn serve(self, listener: TcpListener) -> Result<(), HealthServerError> {
        let app = Self::router(self.state);

        if let Ok(addr) = listener.local_addr() {
            tracing::info!(addr = %addr, "Health server listening");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = state.report();
    let status_code = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Starting => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.stats.is_serving() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

// =============================================================================
// Errors
// =============================================================================

/// Failures that stop the health server.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Port already in use or not permitted.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Accept loop ended with an error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
