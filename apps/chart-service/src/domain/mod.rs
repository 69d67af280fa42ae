//! Domain Layer - Core subscription types and validation rules.
//!
//! This layer contains the core domain types for the chart subscription
//! protocol with no transport dependencies. All types here are pure Rust with
//! serialization support.

/// Bar record types (timestamps, OHLC prices, per-symbol records).
pub mod streaming;

/// Subscription requests, validation rules and rejection reasons.
pub mod subscription;

/// Recognized ticker symbols and the no-data sentinel.
pub mod symbol;

/// Bar granularities and their name/index aliases.
pub mod timeframe;
