//! Calculation outputs: the full-precision breakdown and the rounded result.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places every displayed amount is rounded to.
pub const DISPLAY_DP: u32 = 2;

/// Round half away from zero to two decimals.
pub fn round_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DISPLAY_DP, RoundingStrategy::MidpointAwayFromZero)
}

/// Individual cost components of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeBreakdown {
    pub brokerage: Decimal,

    /// Securities transaction tax
    pub stt: Decimal,

    /// Exchange transaction charges
    pub exchange: Decimal,

    pub stamp_duty: Decimal,

    /// GST levied on brokerage, exchange and SEBI fees
    pub gst: Decimal,

    /// SEBI turnover fee
    pub sebi: Decimal,

    pub total: Decimal,
}

impl ChargeBreakdown {
    fn rounded(&self) -> Self {
        Self {
            brokerage: round_display(self.brokerage),
            stt: round_display(self.stt),
            exchange: round_display(self.exchange),
            stamp_duty: round_display(self.stamp_duty),
            gst: round_display(self.gst),
            sebi: round_display(self.sebi),
            total: round_display(self.total),
        }
    }
}

/// Every intermediate of a calculation at full precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeBreakdown {
    pub sell_price: Decimal,
    pub shares: u64,
    pub total_exposure: Decimal,
    pub margin_required: Decimal,
    pub funded_amount: Decimal,
    pub gross_profit: Decimal,
    pub turnover: Decimal,
    pub charges: ChargeBreakdown,
    pub financing_interest: Decimal,
    pub net_profit: Decimal,

    /// Net profit over margin, in percent, unrounded
    pub return_on_margin_pct: Decimal,

    /// Whether the sell price was derived from a percentage target
    pub percent_target: bool,
}

/// Display-ready outcome of an MTF calculation.
///
/// Currency fields are rounded to two decimals; a new calculation always
/// produces a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeResult {
    pub shares: u64,
    pub total_exposure: Decimal,
    pub margin_required: Decimal,
    pub funded_amount: Decimal,
    pub gross_profit: Decimal,
    pub turnover: Decimal,
    pub charges: ChargeBreakdown,
    pub total_charges: Decimal,
    pub financing_interest: Decimal,
    pub net_profit: Decimal,
    pub return_on_margin_pct: Decimal,
    pub is_profitable: bool,

    /// Resolved sell price, only for percentage targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_price: Option<Decimal>,
}

impl From<&TradeBreakdown> for TradeResult {
    fn from(b: &TradeBreakdown) -> Self {
        let charges = b.charges.rounded();
        Self {
            shares: b.shares,
            total_exposure: round_display(b.total_exposure),
            margin_required: round_display(b.margin_required),
            funded_amount: round_display(b.funded_amount),
            gross_profit: round_display(b.gross_profit),
            turnover: round_display(b.turnover),
            total_charges: charges.total,
            charges,
            financing_interest: round_display(b.financing_interest),
            net_profit: round_display(b.net_profit),
            return_on_margin_pct: round_display(b.return_on_margin_pct),
            // Sign is taken before rounding so a tiny loss never reads as profit
            is_profitable: b.net_profit >= Decimal::ZERO,
            target_price: b.percent_target.then(|| round_display(b.sell_price)),
        }
    }
}

impl From<TradeBreakdown> for TradeResult {
    fn from(b: TradeBreakdown) -> Self {
        Self::from(&b)
    }
}
