//! Symbol Registry
//!
//! The closed set of ticker symbols a subscription may request, plus the
//! reserved `NO_DATA` sentinel: a valid symbol whose bars carry no prices.
//!
//! The registry is built once at startup and shared read-only between calls.

use std::collections::HashSet;

/// A symbol string (stock or ETF ticker).
pub type Symbol = String;

/// Reserved symbol that is always accepted but never has price data.
pub const NO_DATA_SYMBOL: &str = "NO_DATA";

/// Symbols recognized when no override is configured.
pub const DEFAULT_SYMBOLS: [&str; 10] = [
    "VOO", "AAPL", "NVDA", "SPY", "QQQ", "VTI", "IVV", "VEU", "IXUS", "ACWI",
];

/// Immutable set of recognized symbols.
///
/// Lookups are exact and case-sensitive. The sentinel is always a member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRegistry {
    /// Symbols in registration order, sentinel last.
    ordered: Vec<Symbol>,
    members: HashSet<Symbol>,
}

impl Default for SymbolRegistry {
    fn default() -> Self {
        Self::with_symbols(DEFAULT_SYMBOLS)
    }
}

impl SymbolRegistry {
    /// Build a registry from the given symbols.
    ///
    /// Duplicates are dropped and [`NO_DATA_SYMBOL`] is appended if missing.
    #[must_use]
    pub fn with_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        let mut ordered = Vec::new();
        let mut members = HashSet::new();

        let sentinel = std::iter::once(NO_DATA_SYMBOL.to_string());
        for symbol in symbols.into_iter().map(Into::into).chain(sentinel) {
            if members.insert(symbol.clone()) {
                ordered.push(symbol);
            }
        }

        Self { ordered, members }
    }

    /// Whether the symbol may be requested.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.members.contains(symbol)
    }

    /// Whether the symbol is the no-data sentinel.
    #[must_use]
    pub fn is_no_data(symbol: &str) -> bool {
        symbol == NO_DATA_SYMBOL
    }

    /// All recognized symbols, sentinel included.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.ordered
    }

    /// Number of recognized symbols, sentinel included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    /// Always false: the sentinel is registered unconditionally.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_contains_known_tickers() {
        let registry = SymbolRegistry::default();

        for symbol in DEFAULT_SYMBOLS {
            assert!(registry.contains(symbol), "{symbol} should be registered");
        }
        assert!(registry.contains(NO_DATA_SYMBOL));
        assert_eq!(registry.len(), DEFAULT_SYMBOLS.len() + 1);
    }

    #[test]
    fn unknown_symbols_are_rejected() {
        let registry = SymbolRegistry::default();

        assert!(!registry.contains("AAA"));
        assert!(!registry.contains(""));
        assert!(!registry.contains("voo"));
        assert!(!registry.contains(" VOO"));
    }

    #[test]
    fn custom_registry_always_includes_sentinel() {
        let registry = SymbolRegistry::with_symbols(["MSFT", "GOOG"]);

        assert_eq!(registry.symbols(), ["MSFT", "GOOG", NO_DATA_SYMBOL]);
        assert!(!registry.contains("VOO"));
        assert!(!registry.is_empty());
    }

    #[test]
    fn duplicate_registrations_collapse() {
        let registry = SymbolRegistry::with_symbols(["MSFT", "MSFT", NO_DATA_SYMBOL]);
        assert_eq!(registry.symbols(), ["MSFT", NO_DATA_SYMBOL]);
    }

    #[test]
    fn sentinel_detection() {
        assert!(SymbolRegistry::is_no_data("NO_DATA"));
        assert!(!SymbolRegistry::is_no_data("no_data"));
        assert!(!SymbolRegistry::is_no_data("VOO"));
    }
}
