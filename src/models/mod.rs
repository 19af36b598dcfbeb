//! Data models for trade inputs, calculation results and margin data.

mod margin;
mod trade_input;
mod trade_result;

pub use margin::{normalize_symbol, MarginEntry};
pub use trade_input::{SellMode, SizeMode, TradeInput};
pub use trade_result::{round_display, ChargeBreakdown, TradeBreakdown, TradeResult};
