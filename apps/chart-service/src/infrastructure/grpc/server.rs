//! gRPC Streaming Server Implementation
//!
//! Implements the `ChartService` gRPC service on top of the
//! [`SubscriptionService`].

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

use super::proto::chart::v1::{
    self as proto, SubscribeRequest, SubscribeResponse, chart_service_server::ChartService,
};
use crate::application::services::SubscriptionService;
use crate::domain::streaming::BarRecord;
use crate::domain::subscription::SubscriptionRequest;
use crate::domain::timeframe::{Timeframe, TimeframeSelector};
use crate::infrastructure::metrics::{self, CallOutcome};

// =============================================================================
// Type Aliases
// =============================================================================

type StreamResult<T> = Result<Response<T>, Status>;
type BoxedStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send>>;

/// Status message for streams cut short by server shutdown.
pub const SHUTDOWN_MESSAGE: &str = "server shutting down";

// =============================================================================
// Server Configuration
// =============================================================================

/// Configuration for the gRPC streaming server.
#[derive(Debug, Clone)]
pub struct ChartServerConfig {
    /// Service version string.
    pub version: String,
    /// Capacity of each call's response channel.
    pub stream_buffer: usize,
}

impl Default for ChartServerConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            stream_buffer: 64,
        }
    }
}

// =============================================================================
// Server Statistics
// =============================================================================

/// Call and stream counters shared with the health server.
///
/// Write-only from the call path; nothing reads them to decide what a call
/// emits.
#[derive(Debug, Default)]
pub struct ServerStats {
    calls_accepted: AtomicU64,
    calls_rejected: AtomicU64,
    records_sent: AtomicU64,
    streams_cancelled: AtomicU64,
    active_streams: AtomicU64,
    serving: AtomicBool,
}

/// Point-in-time copy of [`ServerStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Calls that passed validation.
    pub calls_accepted: u64,
    /// Calls rejected before streaming.
    pub calls_rejected: u64,
    /// Records delivered across all calls.
    pub records_sent: u64,
    /// Streams stopped before their last record.
    pub streams_cancelled: u64,
    /// Streams currently producing records.
    pub active_streams: u64,
}

impl StatsSnapshot {
    /// Total calls handled.
    #[must_use]
    pub const fn calls_served(&self) -> u64 {
        self.calls_accepted + self.calls_rejected
    }
}

impl ServerStats {
    /// Mark whether the gRPC listener is accepting calls.
    pub fn set_serving(&self, serving: bool) {
        self.serving.store(serving, Ordering::Release);
    }

    /// Whether the gRPC listener is accepting calls.
    #[must_use]
    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::Acquire)
    }

    /// Copy the current counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            calls_accepted: self.calls_accepted.load(Ordering::Relaxed),
            calls_rejected: self.calls_rejected.load(Ordering::Relaxed),
            records_sent: self.records_sent.load(Ordering::Relaxed),
            streams_cancelled: self.streams_cancelled.load(Ordering::Relaxed),
            active_streams: self.active_streams.load(Ordering::Relaxed),
        }
    }

    fn record_rejected(&self) {
        self.calls_rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn stream_opened(&self) -> u64 {
        self.calls_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_streams.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn stream_closed(&self, sent: u64, cancelled: bool) -> u64 {
        self.records_sent.fetch_add(sent, Ordering::Relaxed);
        if cancelled {
            self.streams_cancelled.fetch_add(1, Ordering::Relaxed);
        }
        self.active_streams.fetch_sub(1, Ordering::Relaxed) - 1
    }
}

// =============================================================================
// Server Implementation
// =============================================================================

/// gRPC streaming server for synthetic chart bars.
pub struct ChartServer {
    config: ChartServerConfig,
    service: Arc<SubscriptionService>,
    stats: Arc<ServerStats>,
    shutdown: CancellationToken,
}

impl ChartServer {
    /// Create a new gRPC streaming server.
    ///
    /// Cancelling `shutdown` stops every in-flight producer at its next send
    /// and ends its stream with `UNAVAILABLE`, so a truncated stream never
    /// reads as complete.
    #[must_use]
    pub fn new(
        config: ChartServerConfig,
        service: Arc<SubscriptionService>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            service,
            stats: Arc::new(ServerStats::default()),
            shutdown,
        }
    }

    /// Shared counters for health reporting.
    #[must_use]
    pub fn stats(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }
}

impl std::fmt::Debug for ChartServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartServer")
            .field("config", &self.config)
            .field("service", &self.service)
            .field("stats", &self.stats.snapshot())
            .finish_non_exhaustive()
    }
}

#[tonic::async_trait]
impl ChartService for ChartServer {
    type SubscribeStream = BoxedStream<SubscribeResponse>;

    async fn subscribe(
        &self,
        request: Request<SubscribeRequest>,
    ) -> StreamResult<Self::SubscribeStream> {
        let call_id = uuid::Uuid::new_v4();
        let request = subscription_request_from_proto(request.into_inner());

        let subscription = match self.service.accept(request) {
            Ok(subscription) => subscription,
            Err(err) => {
                tracing::warn!(
                    call_id = %call_id,
                    reason = err.reason(),
                    error = %err,
                    "Subscription rejected"
                );
                self.stats.record_rejected();
                metrics::record_call(CallOutcome::Rejected);
                metrics::record_rejection(err.reason());
                return Err(err.to_status());
            }
        };

        tracing::info!(
            call_id = %call_id,
            symbols = subscription.len(),
            timeframe = subscription.timeframe().short_name(),
            "Subscription accepted"
        );
        metrics::record_call(CallOutcome::Accepted);
        metrics::set_active_streams(self.stats.stream_opened());

        let (tx, rx) = mpsc::channel(self.config.stream_buffer.max(1));
        let service = Arc::clone(&self.service);
        let stats = Arc::clone(&self.stats);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            let started_at = Instant::now();
            let mut sent: u64 = 0;
            let mut cancelled = false;
            let mut interrupted = false;

            for record in service.records(&subscription) {
                let response = bar_record_to_proto(record);
                tokio::select! {
                    biased;
                    () = shutdown.cancelled() => {
                        tracing::debug!(call_id = %call_id, sent, "Stream stopped by shutdown");
                        cancelled = true;
                        interrupted = true;
                        break;
                    }
                    result = tx.send(Ok(response)) => {
                        if result.is_err() {
                            tracing::debug!(call_id = %call_id, sent, "Client disconnected");
                            cancelled = true;
                            break;
                        }
                        sent += 1;
                    }
                }
            }

            if interrupted {
                // Fails only if the client is already gone
                let _ = tx.send(Err(Status::unavailable(SHUTDOWN_MESSAGE))).await;
            }

            metrics::record_records_sent(sent);
            if cancelled {
                metrics::record_stream_cancelled();
            }
            metrics::set_active_streams(stats.stream_closed(sent, cancelled));
            metrics::record_call_duration(started_at.elapsed());

            tracing::debug!(call_id = %call_id, sent, cancelled, "Stream closed");
        });

        let stream = ReceiverStream::new(rx);
        Ok(Response::new(Box::pin(stream) as Self::SubscribeStream))
    }
}

// =============================================================================
// Conversion Functions
// =============================================================================

fn subscription_request_from_proto(req: SubscribeRequest) -> SubscriptionRequest {
    SubscriptionRequest {
        symbols: req.symbol_list,
        timeframe: Timeframe::from_wire(req.timeframe).map(TimeframeSelector::from),
    }
}

fn bar_record_to_proto(record: BarRecord) -> SubscribeResponse {
    SubscribeResponse {
        bar: Some(proto::Bar {
            timestamp_msec: record.timestamp.to_string(),
            open: record.ohlc.open,
            high: record.ohlc.high,
            low: record.ohlc.low,
            close: record.ohlc.close,
        }),
        symbol: record.symbol,
    }
}

// =============================================================================
// Tests
// =============================================================================
