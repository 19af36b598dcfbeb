//! Trade input model: the validated parameters of a single MTF calculation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the exit target is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SellMode {
    /// Exit target is an absolute sell price
    #[default]
    Exact,
    /// Exit target is a percentage gain applied to the buy price
    Percent,
}

impl SellMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SellMode::Exact => "EXACT",
            SellMode::Percent => "PERCENT",
        }
    }
}

/// How the position size is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizeMode {
    /// Size value is a share count
    #[default]
    Quantity,
    /// Size value is own capital, converted to shares through leverage
    Capital,
}

impl SizeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeMode::Quantity => "QUANTITY",
            SizeMode::Capital => "CAPITAL",
        }
    }
}

/// Parameters of a leveraged delivery trade.
///
/// Built fresh for every calculation, normally through
/// [`crate::validation::TradeForm::validate`], which guarantees every
/// numeric field is within range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeInput {
    /// Margin multiplier for the instrument (4 means 4x funding)
    pub leverage_multiplier: Decimal,

    /// Entry price per share
    pub buy_price: Decimal,

    /// Absolute sell price or percentage gain, per `sell_mode`
    pub exit_target: Decimal,

    pub sell_mode: SellMode,

    /// Calendar days the position is held (0 = intraday)
    pub holding_days: u32,

    /// Share count or capital, per `size_mode`
    pub size_value: Decimal,

    pub size_mode: SizeMode,
}

impl TradeInput {
    /// True when the position is opened and closed on the same day.
    pub fn is_intraday(&self) -> bool {
        self.holding_days == 0
    }
}

#[cfg(test)]
impl TradeInput {
    /// Quantity-sized trade exiting at an exact price.
    pub fn exact_quantity(
        leverage_multiplier: Decimal,
        buy_price: Decimal,
        sell_price: Decimal,
        holding_days: u32,
        shares: Decimal,
    ) -> Self {
        Self {
            leverage_multiplier,
            buy_price,
            exit_target: sell_price,
            sell_mode: SellMode::Exact,
            holding_days,
            size_value: shares,
            size_mode: SizeMode::Quantity,
        }
    }

    /// Same trade with a different exit interpretation.
    pub fn with_exit(mut self, exit_target: Decimal, sell_mode: SellMode) -> Self {
        self.exit_target = exit_target;
        self.sell_mode = sell_mode;
        self
    }

    /// Same trade with a different sizing interpretation.
    pub fn with_size(mut self, size_value: Decimal, size_mode: SizeMode) -> Self {
        self.size_value = size_value;
        self.size_mode = size_mode;
        self
    }
}
