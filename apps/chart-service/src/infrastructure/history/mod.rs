//! In-Memory Bar History
//!
//! [`BarHistory`] adapter that remembers the latest recorded timestamp per
//! symbol. Callers use it to skip a subscription when a bar at or after a
//! given time was already stored.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::application::ports::{BarHistory, HistoryError};
use crate::domain::streaming::{BarRecord, BarTimestamp};
use crate::domain::symbol::Symbol;

/// Thread-safe latest-timestamp index keyed by symbol.
#[derive(Debug, Default)]
pub struct InMemoryBarHistory {
    latest: RwLock<HashMap<Symbol, BarTimestamp>>,
}

impl InMemoryBarHistory {
    /// Create an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a received record. Older timestamps never move the index back.
    pub fn record(&self, record: &BarRecord) {
        self.record_timestamp(&record.symbol, record.timestamp);
    }

    /// Remember a timestamp for a symbol.
    pub fn record_timestamp(&self, symbol: &str, timestamp: BarTimestamp) {
        let mut latest = self.latest.write();
        latest
            .entry(symbol.to_string())
            .and_modify(|current| *current = (*current).max(timestamp))
            .or_insert(timestamp);
    }

    /// Number of symbols with at least one record.
    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.latest.read().len()
    }
}

#[async_trait]
impl BarHistory for InMemoryBarHistory {
    async fn latest_timestamp(&self, symbol: &str) -> Result<Option<BarTimestamp>, HistoryError> {
        Ok(self.latest.read().get(symbol).copied())
    }
}
