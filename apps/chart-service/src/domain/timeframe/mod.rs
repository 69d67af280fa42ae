//! Timeframe Selection
//!
//! Bar granularities a subscription can ask for. A timeframe reaches the
//! service either as an integer index (the wire form) or as a name; both
//! forms resolve to the same variant, and anything unrecognized resolves to
//! [`Timeframe::Unknown`] instead of failing the call.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bar granularity.
///
/// Discriminants match the wire indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Timeframe {
    /// Fallback for unrecognized values.
    #[default]
    Unknown = 0,
    /// One minute bars.
    Minute1 = 1,
    /// Five minute bars.
    Minute5 = 2,
    /// Fifteen minute bars.
    Minute15 = 3,
    /// One hour bars.
    Hour1 = 4,
    /// One day bars.
    Day1 = 5,
}

impl Timeframe {
    /// Get all timeframes in index order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Unknown,
            Self::Minute1,
            Self::Minute5,
            Self::Minute15,
            Self::Hour1,
            Self::Day1,
        ]
    }

    /// Resolve a wire index. Out-of-range indexes become `Unknown`.
    #[must_use]
    pub const fn from_index(index: i32) -> Self {
        match index {
            1 => Self::Minute1,
            2 => Self::Minute5,
            3 => Self::Minute15,
            4 => Self::Hour1,
            5 => Self::Day1,
            _ => Self::Unknown,
        }
    }

    /// Resolve a name or a decimal index string.
    ///
    /// Accepts canonical names (`TIMEFRAME_MINUTE_1`), short names (`M1`,
    /// case-insensitive) and index strings (`"1"`). Returns `None` only for
    /// blank input; every other unrecognized value resolves to `Unknown`.
    #[must_use]
    pub fn from_selector(selector: &str) -> Option<Self> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }

        if let Ok(index) = selector.parse::<i32>() {
            return Some(Self::from_index(index));
        }

        let upper = selector.to_ascii_uppercase();
        let resolved = Self::all()
            .iter()
            .copied()
            .find(|tf| tf.as_str() == upper || tf.short_name() == upper)
            .unwrap_or(Self::Unknown);

        Some(resolved)
    }

    /// Resolve the optional wire field. An absent field is `None`; any
    /// present index resolves.
    #[must_use]
    pub const fn from_wire(index: Option<i32>) -> Option<Self> {
        match index {
            Some(index) => Some(Self::from_index(index)),
            None => None,
        }
    }

    /// Wire index.
    #[must_use]
    pub const fn index(self) -> i32 {
        self as i32
    }

    /// Canonical name, as used in the protocol definition.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "TIMEFRAME_UNKNOWN",
            Self::Minute1 => "TIMEFRAME_MINUTE_1",
            Self::Minute5 => "TIMEFRAME_MINUTE_5",
            Self::Minute15 => "TIMEFRAME_MINUTE_15",
            Self::Hour1 => "TIMEFRAME_HOUR_1",
            Self::Day1 => "TIMEFRAME_DAY_1",
        }
    }

    /// Compact name used in logs and metric labels.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Minute1 => "M1",
            Self::Minute5 => "M5",
            Self::Minute15 => "M15",
            Self::Hour1 => "H1",
            Self::Day1 => "D1",
        }
    }

    /// Bar width, or `None` for `Unknown`.
    #[must_use]
    pub const fn duration(self) -> Option<Duration> {
        match self {
            Self::Unknown => None,
            Self::Minute1 => Some(Duration::from_secs(60)),
            Self::Minute5 => Some(Duration::from_secs(5 * 60)),
            Self::Minute15 => Some(Duration::from_secs(15 * 60)),
            Self::Hour1 => Some(Duration::from_secs(60 * 60)),
            Self::Day1 => Some(Duration::from_secs(24 * 60 * 60)),
        }
    }

    /// Whether this is the `Unknown` fallback.
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blank timeframe selector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("timeframe selector is blank")]
pub struct ParseTimeframeError;

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_selector(s).ok_or(ParseTimeframeError)
    }
}

/// How a request expressed its timeframe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeframeSelector {
    /// Integer index.
    Index(i32),
    /// Name or index string.
    Name(String),
}

impl TimeframeSelector {
    /// Resolve to a timeframe. Returns `None` for a blank name.
    #[must_use]
    pub fn resolve(&self) -> Option<Timeframe> {
        match self {
            Self::Index(index) => Some(Timeframe::from_index(*index)),
            Self::Name(name) => Timeframe::from_selector(name),
        }
    }
}

impl From<i32> for TimeframeSelector {
    fn from(index: i32) -> Self {
        Self::Index(index)
    }
}

impl From<&str> for TimeframeSelector {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<Timeframe> for TimeframeSelector {
    fn from(timeframe: Timeframe) -> Self {
        Self::Index(timeframe.index())
    }
}
