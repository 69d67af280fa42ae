#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Chart Service - Candlestick Subscription Stream
//!
//! A gRPC service that validates symbol/timeframe subscriptions and streams
//! one synthetic OHLC bar per requested symbol, in request order, then
//! closes the stream.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core subscription types and rules
//!   - `streaming`: Bar records, OHLC prices, decisecond timestamps
//!   - `subscription`: Request validation and duplicate handling
//!   - `symbol`: Symbol registry and the `NO_DATA` sentinel
//!   - `timeframe`: Bar granularities
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Bar source and bar history interfaces
//!   - `services`: Subscription acceptance and record production
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `generator`: Random bar source
//!   - `history`: In-memory bar history
//!   - `grpc`: gRPC streaming server and client
//!   - `config`: Environment configuration
//!   - `health`: Health check HTTP endpoint
//!
//! # Call Flow
//!
//! ```text
//!            ┌────────────┐   ok   ┌────────────┐
//! Request ──►│ Validation │───────►│  Producer  │──► record per symbol ──► close
//!            └────────────┘        └────────────┘
//!                  │ rejected
//!                  └──► INVALID_ARGUMENT, zero records
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core subscription types with no transport dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::streaming::{BarRecord, BarTimestamp, Ohlc};
pub use domain::subscription::{
    DuplicatePolicy, SubscriptionError, SubscriptionRequest, ValidatedSubscription,
};
pub use domain::symbol::{NO_DATA_SYMBOL, Symbol, SymbolRegistry};
pub use domain::timeframe::{Timeframe, TimeframeSelector};

// Application
pub use application::ports::{BarHistory, BarSource, HistoryError};
pub use application::services::SubscriptionService;

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, GeneratorSettings, ServerSettings, ServiceConfig, StreamSettings,
};

// Adapters
pub use infrastructure::generator::{RandomBarSource, RandomBarSourceConfig};
pub use infrastructure::history::InMemoryBarHistory;

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// gRPC server and client (for integration tests)
pub use infrastructure::grpc::{
    ChartClient, ChartServer, ChartServerConfig, ClientError, Rejection, SHUTDOWN_MESSAGE,
    ServerStats, proto::chart::v1 as proto,
};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
