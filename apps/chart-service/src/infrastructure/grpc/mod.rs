//! gRPC Streaming Server and Client
//!
//! Implements the `ChartService` gRPC service that streams synthetic bars to
//! subscribers, plus a thin client used by consumers and tests.
//!
//! # Architecture
//!
//! Each `Subscribe` call:
//!
//! 1. Converts the wire request into a domain `SubscriptionRequest`
//! 2. Validates it through the `SubscriptionService` (rejections end the call
//!    with `INVALID_ARGUMENT` before any record is sent)
//! 3. Spawns a producer that emits one record per symbol in request order
//! 4. Stops early when the client disconnects, or ends the stream with
//!    `UNAVAILABLE` when the server shuts down

pub mod client;
pub mod server;
pub mod status;

// Allow clippy warnings and missing docs in generated code
#[allow(
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
pub mod proto {
    pub mod chart {
        pub mod v1 {
            include!(concat!(env!("OUT_DIR"), "/chart.v1.rs"));
        }
    }
}

pub use client::{ChartClient, ClientError};
pub use server::{ChartServer, ChartServerConfig, SHUTDOWN_MESSAGE, ServerStats, StatsSnapshot};
pub use status::{ERROR_DOMAIN, Rejection};
