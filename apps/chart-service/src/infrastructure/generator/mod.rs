//! Random Bar Source
//!
//! Synthesizes bar prices in place of a real market-data feed.
//!
//! # Generation
//!
//! 1. Draw an opening price uniformly from the configured base range.
//! 2. Derive a close at or above the open, within `max_spread_pct` of it.
//! 3. Extend a high above the close and a low below the open by up to the
//!    same spread, so both bracket open and close.
//!
//! Values differ on every call; only the ordering of the four prices is
//! guaranteed.

use rand::Rng;

use crate::application::ports::BarSource;
use crate::domain::streaming::Ohlc;
use crate::infrastructure::config::GeneratorSettings;

/// Price range and spread for generated bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomBarSourceConfig {
    /// Lowest opening price.
    pub base_price_min: f64,
    /// Highest opening price.
    pub base_price_max: f64,
    /// Maximum close/wick distance as a fraction of the open.
    pub max_spread_pct: f64,
}

impl Default for RandomBarSourceConfig {
    fn default() -> Self {
        Self {
            base_price_min: 10.0,
            base_price_max: 500.0,
            max_spread_pct: 0.02,
        }
    }
}

impl From<GeneratorSettings> for RandomBarSourceConfig {
    fn from(settings: GeneratorSettings) -> Self {
        Self {
            base_price_min: settings.base_price_min,
            base_price_max: settings.base_price_max,
            max_spread_pct: settings.max_spread_pct,
        }
    }
}

/// Rejected generator parameters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeneratorConfigError {
    /// Base range is not `0 <= min <= max` with finite bounds.
    #[error("invalid base price range: {min}..={max}")]
    InvalidPriceRange {
        /// Configured minimum.
        min: f64,
        /// Configured maximum.
        max: f64,
    },
    /// Spread is outside `(0, 1)`.
    #[error("invalid spread fraction: {0}")]
    InvalidSpread(f64),
}

/// [`BarSource`] that draws independent random prices for every bar.
#[derive(Debug, Clone)]
pub struct RandomBarSource {
    config: RandomBarSourceConfig,
}

impl RandomBarSource {
    /// Create a source after checking the configured ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if the price range or spread is unusable.
    pub fn new(config: RandomBarSourceConfig) -> Result<Self, GeneratorConfigError> {
        let RandomBarSourceConfig {
            base_price_min: min,
            base_price_max: max,
            max_spread_pct: spread,
        } = config;

        if !(min.is_finite() && max.is_finite() && min >= 0.0 && min <= max) {
            return Err(GeneratorConfigError::InvalidPriceRange { min, max });
        }
        if !(spread > 0.0 && spread < 1.0) {
            return Err(GeneratorConfigError::InvalidSpread(spread));
        }

        Ok(Self { config })
    }

    /// Configured ranges.
    #[must_use]
    pub const fn config(&self) -> &RandomBarSourceConfig {
        &self.config
    }

    fn generate<R: Rng>(&self, rng: &mut R) -> Ohlc {
        let open = rng.random_range(self.config.base_price_min..=self.config.base_price_max);
        let spread = open * self.config.max_spread_pct;

        let close = open + rng.random_range(0.0..=spread);
        let high = close + rng.random_range(0.0..=spread);
        let low = (open - rng.random_range(0.0..=spread)).max(0.0);

        Ohlc {
            open,
            high,
            low,
            close,
        }
    }
}

impl BarSource for RandomBarSource {
    fn next_bar(&self, _symbol: &str) -> Ohlc {
        self.generate(&mut rand::rng())
    }
}
