//! Bar Streaming Types
//!
//! Core domain types for the records a subscription emits: an OHLC price
//! block, the bar timestamp, and the per-symbol record that pairs them.
//! These types are codec-agnostic; the gRPC layer converts them to and
//! from the wire representation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Timestamp
// =============================================================================

/// Number of characters in a rendered [`BarTimestamp`] for any date between
/// 2001-09-09 and 2286-11-20.
pub const BAR_TIMESTAMP_LEN: usize = 11;

/// Wall-clock bar identifier in tenths of a second since the Unix epoch.
///
/// Rendered as a plain decimal string (`"17609345123"`), which is how it
/// travels on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BarTimestamp(i64);

impl BarTimestamp {
    /// Create a timestamp from raw tenths of a second.
    #[must_use]
    pub const fn new(deciseconds: i64) -> Self {
        Self(deciseconds)
    }

    /// Timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Truncate a datetime to tenths of a second.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis().div_euclid(100))
    }

    /// Raw value in tenths of a second.
    #[must_use]
    pub const fn as_deciseconds(self) -> i64 {
        self.0
    }

    /// Convert back to a datetime, if representable.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        self.0
            .checked_mul(100)
            .and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

impl fmt::Display for BarTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when a wire timestamp is not a decimal integer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid bar timestamp: {0:?}")]
pub struct ParseBarTimestampError(pub String);

impl FromStr for BarTimestamp {
    type Err = ParseBarTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseBarTimestampError(s.to_string()));
        }
        s.parse::<i64>()
            .map(Self)
            .map_err(|_| ParseBarTimestampError(s.to_string()))
    }
}

// =============================================================================
// OHLC
// =============================================================================

/// Open/high/low/close prices of a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ohlc {
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
}

impl Ohlc {
    /// All-zero prices, reserved for symbols without data.
    pub const ZERO: Self = Self {
        open: 0.0,
        high: 0.0,
        low: 0.0,
        close: 0.0,
    };

    /// Whether every price field is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.open == 0.0 && self.high == 0.0 && self.low == 0.0 && self.close == 0.0
    }

    /// Whether `low <= {open, close} <= high` holds.
    ///
    /// NaN in any field makes the bar malformed.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
    }
}

// =============================================================================
// Bar Record
// =============================================================================

/// One emitted subscription record: the requested symbol and its bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    /// Echo of the requested ticker.
    pub symbol: String,
    /// Bar timestamp.
    pub timestamp: BarTimestamp,
    /// Bar prices.
    pub ohlc: Ohlc,
}

impl BarRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(symbol: impl Into<String>, timestamp: BarTimestamp, ohlc: Ohlc) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            ohlc,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
