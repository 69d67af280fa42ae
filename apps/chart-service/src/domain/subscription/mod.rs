//! Subscription Requests and Validation
//!
//! Domain types for a single subscription call and the gate that every
//! request passes before any bar is produced.
//!
//! # Validation Rules
//!
//! Rules run in order and the first failure rejects the whole call:
//!
//! 1. The symbol list must be non-empty.
//! 2. A timeframe must be present (a blank name counts as absent).
//! 3. An unrecognized timeframe resolves to `Unknown`; this rule never fails.
//! 4. Every symbol must be in the registry. The first unsupported symbol in
//!    request order is reported and no records are produced for the valid
//!    ones.
//!
//! Validation is a pre-condition gate: once it passes, streaming always
//! completes.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::symbol::{Symbol, SymbolRegistry};
use super::timeframe::{Timeframe, TimeframeSelector};

// =============================================================================
// Errors
// =============================================================================

/// Reasons a subscription request is rejected before streaming.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    /// The symbol list was empty or absent.
    #[error("symbol list cannot be empty")]
    EmptySymbolList,
    /// The timeframe was absent or blank.
    #[error("timeframe cannot be empty")]
    EmptyTimeframe,
    /// A requested symbol is not in the registry.
    #[error("unsupported symbol: {0}")]
    UnsupportedSymbol(Symbol),
}

impl SubscriptionError {
    /// Machine-readable reason code.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::EmptySymbolList => "EMPTY_SYMBOL_LIST",
            Self::EmptyTimeframe => "EMPTY_TIMEFRAME",
            Self::UnsupportedSymbol(_) => "UNSUPPORTED_SYMBOL",
        }
    }

    /// Request field the error refers to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptySymbolList | Self::UnsupportedSymbol(_) => "symbol_list",
            Self::EmptyTimeframe => "timeframe",
        }
    }
}

// =============================================================================
// Duplicate Policy
// =============================================================================

/// What to do when a request names the same symbol more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Emit one record per occurrence.
    #[default]
    Preserve,
    /// Emit one record per distinct symbol, at its first position.
    Collapse,
}

impl DuplicatePolicy {
    /// Parse a policy name, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "preserve" => Some(Self::Preserve),
            "collapse" => Some(Self::Collapse),
            _ => None,
        }
    }

    /// Policy name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Preserve => "preserve",
            Self::Collapse => "collapse",
        }
    }

    fn apply(self, symbols: Vec<Symbol>) -> Vec<Symbol> {
        match self {
            Self::Preserve => symbols,
            Self::Collapse => {
                let mut seen = HashSet::with_capacity(symbols.len());
                symbols
                    .into_iter()
                    .filter(|symbol| seen.insert(symbol.clone()))
                    .collect()
            }
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Request
// =============================================================================

/// A subscription request as received, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubscriptionRequest {
    /// Requested symbols, in emission order.
    pub symbols: Vec<Symbol>,
    /// Requested timeframe, if any.
    pub timeframe: Option<TimeframeSelector>,
}

impl SubscriptionRequest {
    /// Create a new request.
    #[must_use]
    pub fn new<I, S>(symbols: I, timeframe: impl Into<TimeframeSelector>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        Self {
            symbols: symbols.into_iter().map(Into::into).collect(),
            timeframe: Some(timeframe.into()),
        }
    }

    /// Run the validation rules.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule as a [`SubscriptionError`].
    pub fn validate(
        self,
        registry: &SymbolRegistry,
        duplicates: DuplicatePolicy,
    ) -> Result<ValidatedSubscription, SubscriptionError> {
        if self.symbols.is_empty() {
            return Err(SubscriptionError::EmptySymbolList);
        }

        let timeframe = self
            .timeframe
            .as_ref()
            .and_then(TimeframeSelector::resolve)
            .ok_or(SubscriptionError::EmptyTimeframe)?;

        if let Some(unsupported) = self.symbols.iter().find(|s| !registry.contains(s)) {
            return Err(SubscriptionError::UnsupportedSymbol(unsupported.clone()));
        }

        Ok(ValidatedSubscription {
            symbols: duplicates.apply(self.symbols),
            timeframe,
        })
    }
}

/// A request that passed validation and is ready to stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubscription {
    symbols: Vec<Symbol>,
    timeframe: Timeframe,
}

impl ValidatedSubscription {
    /// Symbols to emit, in order. Never empty.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Resolved timeframe.
    #[must_use]
    pub const fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    /// Number of records the stream will carry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Always false for a validated subscription.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Consume into the ordered symbol list.
    #[must_use]
    pub fn into_symbols(self) -> Vec<Symbol> {
        self.symbols
    }
}

// =============================================================================
// Tests
// =============================================================================
