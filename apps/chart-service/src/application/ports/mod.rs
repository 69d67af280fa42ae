//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `BarSource`: Produces prices for one symbol's bar
//! - `BarHistory`: Read access to previously recorded bars, consulted by
//!   callers before subscribing

use async_trait::async_trait;

use crate::domain::streaming::{BarTimestamp, Ohlc};

/// Source of bar prices.
///
/// Implementations must return well-formed prices
/// (`low <= {open, close} <= high`). The service never asks a source for the
/// no-data sentinel, so sources need no knowledge of it.
#[cfg_attr(test, mockall::automock)]
pub trait BarSource: Send + Sync {
    /// Produce the prices for the next bar of `symbol`.
    fn next_bar(&self, symbol: &str) -> Ohlc;
}

/// Errors from a bar history backend.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// Backend could not be reached or queried.
    #[error("bar history unavailable: {0}")]
    Unavailable(String),
}

/// Read access to bars that were already recorded.
#[async_trait]
pub trait BarHistory: Send + Sync {
    /// Latest recorded timestamp for `symbol`, if any.
    async fn latest_timestamp(&self, symbol: &str) -> Result<Option<BarTimestamp>, HistoryError>;

    /// Whether a record at or after `timestamp` already exists for `symbol`.
    async fn has_record_at_or_after(
        &self,
        symbol: &str,
        timestamp: BarTimestamp,
    ) -> Result<bool, HistoryError> {
        Ok(self
            .latest_timestamp(symbol)
            .await?
            .is_some_and(|latest| timestamp <= latest))
    }
}
