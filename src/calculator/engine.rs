//! MTF return engine: turns a trade into a profit/loss breakdown.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use tracing::debug;

use crate::models::{SellMode, SizeMode, TradeBreakdown, TradeInput, TradeResult};

use super::ChargeSchedule;

/// Reasons a calculation cannot produce a meaningful result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    #[error("leverage multiplier must be positive, got {0}")]
    NonPositiveLeverage(Decimal),

    #[error("buy price must be positive, got {0}")]
    NonPositiveBuyPrice(Decimal),

    #[error("size must be positive, got {0}")]
    NonPositiveSize(Decimal),

    #[error("share count must be a whole number, got {0}")]
    FractionalShares(Decimal),

    #[error("margin required is zero; the position buys no shares")]
    ZeroMargin,

    #[error("trade values are too large to compute")]
    Overflow,
}

/// Deterministic MTF profit/loss calculator.
///
/// Holds no state besides its charge schedule, so one instance can be
/// shared freely across threads.
#[derive(Debug, Clone, Default)]
pub struct MtfCalculator {
    schedule: ChargeSchedule,
}

impl MtfCalculator {
    pub fn new(schedule: ChargeSchedule) -> Self {
        Self { schedule }
    }

    /// Calculate the display-ready result of a trade.
    pub fn calculate(&self, input: &TradeInput) -> Result<TradeResult, CalcError> {
        self.breakdown(input).map(TradeResult::from)
    }

    /// Calculate every intermediate value at full precision.
    pub fn breakdown(&self, input: &TradeInput) -> Result<TradeBreakdown, CalcError> {
        let leverage = input.leverage_multiplier;
        let buy = input.buy_price;

        if leverage <= Decimal::ZERO {
            return Err(CalcError::NonPositiveLeverage(leverage));
        }
        if buy <= Decimal::ZERO {
            return Err(CalcError::NonPositiveBuyPrice(buy));
        }
        if input.size_value <= Decimal::ZERO {
            return Err(CalcError::NonPositiveSize(input.size_value));
        }

        let sell = sell_price(input)?;
        let shares = share_count(input)?;
        let qty = Decimal::from(shares);

        let total_exposure = qty.checked_mul(buy).ok_or(CalcError::Overflow)?;
        let margin_required = total_exposure
            .checked_div(leverage)
            .ok_or(CalcError::Overflow)?;
        if margin_required.is_zero() {
            return Err(CalcError::ZeroMargin);
        }
        let funded_amount = total_exposure
            .checked_sub(margin_required)
            .ok_or(CalcError::Overflow)?;

        let gross_profit = sell
            .checked_sub(buy)
            .and_then(|spread| spread.checked_mul(qty))
            .ok_or(CalcError::Overflow)?;
        let turnover = buy
            .checked_add(sell)
            .and_then(|legs| legs.checked_mul(qty))
            .ok_or(CalcError::Overflow)?;

        let charges = self
            .schedule
            .charges(qty, buy, sell, turnover, input.holding_days)?;
        let financing_interest = self
            .schedule
            .financing_interest(funded_amount, input.holding_days)?;

        let net_profit = gross_profit
            .checked_sub(financing_interest)
            .and_then(|net| net.checked_sub(charges.total))
            .ok_or(CalcError::Overflow)?;
        let return_on_margin_pct = net_profit
            .checked_div(margin_required)
            .and_then(|ratio| ratio.checked_mul(dec!(100)))
            .ok_or(CalcError::Overflow)?;

        debug!(
            shares = shares,
            exposure = %total_exposure,
            charges = %charges.total,
            interest = %financing_interest,
            net = %net_profit,
            "Calculated MTF trade"
        );

        Ok(TradeBreakdown {
            sell_price: sell,
            shares,
            total_exposure,
            margin_required,
            funded_amount,
            gross_profit,
            turnover,
            charges,
            financing_interest,
            net_profit,
            return_on_margin_pct,
            percent_target: input.sell_mode == SellMode::Percent,
        })
    }
}

/// Resolve the effective sell price.
fn sell_price(input: &TradeInput) -> Result<Decimal, CalcError> {
    match input.sell_mode {
        SellMode::Exact => Ok(input.exit_target),
        SellMode::Percent => input
            .exit_target
            .checked_div(dec!(100))
            .and_then(|gain| Decimal::ONE.checked_add(gain))
            .and_then(|factor| input.buy_price.checked_mul(factor))
            .ok_or(CalcError::Overflow),
    }
}

/// Resolve the share count; capital sizing truncates toward zero.
fn share_count(input: &TradeInput) -> Result<u64, CalcError> {
    let raw = match input.size_mode {
        SizeMode::Quantity => {
            if !input.size_value.fract().is_zero() {
                return Err(CalcError::FractionalShares(input.size_value));
            }
            input.size_value
        }
        SizeMode::Capital => {
            input
                .size_value
                .checked_mul(input.leverage_multiplier)
                .and_then(|buying_power| buying_power.checked_div(input.buy_price))
                .ok_or(CalcError::Overflow)?
                .trunc()
        }
    };

    raw.to_u64().ok_or(CalcError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::round_display;

    fn scenario() -> TradeInput {
        TradeInput::exact_quantity(dec!(4), dec!(100), dec!(110), 5, dec!(100))
    }

    #[test]
    fn test_reference_scenario() {
        let calc = MtfCalculator::default();
        let b = calc.breakdown(&scenario()).unwrap();

        assert_eq!(b.shares, 100);
        assert_eq!(b.total_exposure, dec!(10000));
        assert_eq!(b.margin_required, dec!(2500));
        assert_eq!(b.funded_amount, dec!(7500));
        assert_eq!(b.gross_profit, dec!(1000));
        assert_eq!(b.turnover, dec!(21000));
        assert_eq!(b.charges.total, dec!(70.57969));
        assert_eq!(round_display(b.financing_interest), dec!(15.41));

        let r = calc.calculate(&scenario()).unwrap();
        assert_eq!(r.net_profit, dec!(914.01));
        assert_eq!(r.return_on_margin_pct, dec!(36.56));
        assert_eq!(r.total_charges, dec!(70.58));
        assert_eq!(r.financing_interest, dec!(15.41));
        assert!(r.is_profitable);
        assert_eq!(r.target_price, None);
    }

    #[test]
    fn test_deterministic() {
        let calc = MtfCalculator::default();
        let input = scenario().with_size(dec!(123456.78), SizeMode::Capital);
        assert_eq!(calc.calculate(&input), calc.calculate(&input));
        assert_eq!(calc.breakdown(&input), calc.breakdown(&input));
    }

    #[test]
    fn test_net_profit_decomposition() {
        let calc = MtfCalculator::default();
        let input = TradeInput::exact_quantity(dec!(3.5), dec!(2417.35), dec!(2380.1), 23, dec!(37));
        let b = calc.breakdown(&input).unwrap();

        assert_eq!(b.net_profit, b.gross_profit - b.financing_interest - b.charges.total);
        assert!((b.margin_required + b.funded_amount - b.total_exposure).abs() < dec!(0.000000001));
        assert!(b.net_profit < Decimal::ZERO);

        let r = TradeResult::from(&b);
        assert_eq!(r.is_profitable, b.net_profit >= Decimal::ZERO);
        assert!(!r.is_profitable);
    }

    #[test]
    fn test_intraday_has_no_interest() {
        let calc = MtfCalculator::default();
        let input = TradeInput::exact_quantity(dec!(5), dec!(250), dec!(255), 0, dec!(40));
        let b = calc.breakdown(&input).unwrap();

        let qty = dec!(40);
        assert_eq!(b.financing_interest, Decimal::ZERO);
        assert_eq!(b.charges.stt, qty * dec!(255) * dec!(0.00025));
        assert_eq!(b.charges.stamp_duty, qty * dec!(250) * dec!(0.00003));
    }

    #[test]
    fn test_percent_matches_exact() {
        let calc = MtfCalculator::default();
        let buy = dec!(1234.5);
        let pct = dec!(7.25);

        let base = TradeInput::exact_quantity(dec!(4), buy, Decimal::ZERO, 12, dec!(75));
        let by_pct = base.clone().with_exit(pct, SellMode::Percent);
        let by_price = base.with_exit(buy * (Decimal::ONE + pct / dec!(100)), SellMode::Exact);

        let a = calc.calculate(&by_pct).unwrap();
        let b = calc.calculate(&by_price).unwrap();

        assert_eq!(a.net_profit, b.net_profit);
        assert_eq!(a.charges, b.charges);
        assert_eq!(a.return_on_margin_pct, b.return_on_margin_pct);
        assert_eq!(
            TradeResult { target_price: None, ..a.clone() },
            b
        );
        assert_eq!(a.target_price, Some(round_display(buy * dec!(1.0725))));
    }

    #[test]
    fn test_capital_sizing_truncates() {
        let calc = MtfCalculator::default();
        // 10000 * 4 / 333 = 120.12... -> 120 shares
        let input = TradeInput::exact_quantity(dec!(4), dec!(333), dec!(350), 10, Decimal::ZERO)
            .with_size(dec!(10000), SizeMode::Capital);
        let b = calc.breakdown(&input).unwrap();

        assert_eq!(b.shares, 120);
        assert_eq!(b.total_exposure, dec!(39960));
        assert_eq!(b.margin_required, dec!(9990));

        // Exactly divisible capital is not reduced
        let input = input.with_size(dec!(8325), SizeMode::Capital);
        assert_eq!(calc.breakdown(&input).unwrap().shares, 100);
    }

    #[test]
    fn test_capital_below_one_share_is_zero_margin() {
        let calc = MtfCalculator::default();
        let input = TradeInput::exact_quantity(dec!(2), dec!(5000), dec!(5100), 3, Decimal::ZERO)
            .with_size(dec!(1000), SizeMode::Capital);

        assert_eq!(calc.calculate(&input), Err(CalcError::ZeroMargin));
    }

    #[test]
    fn test_rejects_invalid_input() {
        let calc = MtfCalculator::default();

        let input = TradeInput::exact_quantity(Decimal::ZERO, dec!(100), dec!(110), 5, dec!(10));
        assert_eq!(
            calc.calculate(&input),
            Err(CalcError::NonPositiveLeverage(Decimal::ZERO))
        );

        let input = TradeInput::exact_quantity(dec!(4), dec!(-1), dec!(110), 5, dec!(10));
        assert!(matches!(
            calc.calculate(&input),
            Err(CalcError::NonPositiveBuyPrice(_))
        ));

        let input = TradeInput::exact_quantity(dec!(4), dec!(100), dec!(110), 5, dec!(10.5));
        assert_eq!(
            calc.calculate(&input),
            Err(CalcError::FractionalShares(dec!(10.5)))
        );
    }

    #[test]
    fn test_custom_schedule() {
        let schedule = ChargeSchedule {
            brokerage: Decimal::ZERO,
            annual_interest_rate: Decimal::ZERO,
            ..Default::default()
        };
        let calc = MtfCalculator::new(schedule);
        let b = calc.breakdown(&scenario()).unwrap();

        assert_eq!(b.financing_interest, Decimal::ZERO);
        assert_eq!(b.charges.brokerage, Decimal::ZERO);
        // GST now only applies to exchange and SEBI fees
        assert_eq!(b.charges.gst, dec!(0.18) * (dec!(0.7245) + dec!(0.021)));
    }

    #[test]
    fn test_tiny_leverage_is_an_error() {
        let calc = MtfCalculator::default();
        let tiny = Decimal::new(1, 28);

        let input = TradeInput::exact_quantity(tiny, dec!(100), dec!(110), 5, dec!(100));
        assert_eq!(calc.calculate(&input), Err(CalcError::Overflow));

        let input = TradeInput::exact_quantity(dec!(100), tiny, dec!(110), 5, Decimal::ZERO)
            .with_size(dec!(10000000000), SizeMode::Capital);
        assert_eq!(calc.calculate(&input), Err(CalcError::Overflow));
    }
}
