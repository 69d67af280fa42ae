//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `SubscriptionService`: Validates subscription requests and produces the
//!   bar record for each accepted symbol

use std::sync::Arc;

use crate::application::ports::BarSource;
use crate::domain::streaming::{BarRecord, BarTimestamp, Ohlc};
use crate::domain::subscription::{
    DuplicatePolicy, SubscriptionError, SubscriptionRequest, ValidatedSubscription,
};
use crate::domain::symbol::SymbolRegistry;

/// Validation gate plus bar generation for subscription calls.
///
/// Holds only immutable, shared configuration; concurrent calls never
/// observe each other through it.
pub struct SubscriptionService {
    registry: Arc<SymbolRegistry>,
    source: Arc<dyn BarSource>,
    duplicates: DuplicatePolicy,
}

impl SubscriptionService {
    /// Create a new subscription service.
    #[must_use]
    pub fn new(
        registry: Arc<SymbolRegistry>,
        source: Arc<dyn BarSource>,
        duplicates: DuplicatePolicy,
    ) -> Self {
        Self {
            registry,
            source,
            duplicates,
        }
    }

    /// Symbol registry used for validation.
    #[must_use]
    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    /// Duplicate-symbol policy applied to accepted requests.
    #[must_use]
    pub const fn duplicate_policy(&self) -> DuplicatePolicy {
        self.duplicates
    }

    /// Validate a request.
    ///
    /// # Errors
    ///
    /// Returns the first failing validation rule.
    pub fn accept(
        &self,
        request: SubscriptionRequest,
    ) -> Result<ValidatedSubscription, SubscriptionError> {
        request.validate(&self.registry, self.duplicates)
    }

    /// Produce the record for one accepted symbol.
    ///
    /// The no-data sentinel always gets all-zero prices and never reaches the
    /// bar source.
    #[must_use]
    pub fn bar_for(&self, symbol: &str, timestamp: BarTimestamp) -> BarRecord {
        let ohlc = if SymbolRegistry::is_no_data(symbol) {
            Ohlc::ZERO
        } else {
            self.source.next_bar(symbol)
        };

        BarRecord::new(symbol, timestamp, ohlc)
    }

    /// Produce every record for an accepted subscription, in order.
    ///
    /// Records are generated lazily, each stamped when it is produced.
    pub fn records<'a>(
        &'a self,
        subscription: &'a ValidatedSubscription,
    ) -> impl Iterator<Item = BarRecord> + 'a {
        subscription
            .symbols()
            .iter()
            .map(|symbol| self.bar_for(symbol, BarTimestamp::now()))
    }
}

impl std::fmt::Debug for SubscriptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionService")
            .field("registry_size", &self.registry.len())
            .field("duplicates", &self.duplicates)
            .finish_non_exhaustive()
    }
}
