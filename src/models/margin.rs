//! Margin multiplier published per symbol by the margin-data service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Leverage available for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginEntry {
    /// Exchange symbol (e.g. "RELIANCE")
    pub symbol: String,

    /// Margin multiplier (4 means 4x funding)
    pub margin: Decimal,
}

impl MarginEntry {
    pub fn new(symbol: impl Into<String>, margin: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            margin,
        }
    }

    /// Symbol in the form used for lookups.
    pub fn normalized_symbol(&self) -> String {
        normalize_symbol(&self.symbol)
    }

    /// Only positive multipliers can fund a trade.
    pub fn is_usable(&self) -> bool {
        self.margin > Decimal::ZERO
    }
}

/// Symbols are matched case-insensitively and without surrounding spaces.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}
