//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Configuration loading.
pub mod config;

/// Random bar source standing in for a pricing feed.
pub mod generator;

/// gRPC streaming server and client.
pub mod grpc;

/// Health check HTTP endpoint.
pub mod health;

/// In-memory bar history.
pub mod history;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
