//! Brokerage, statutory charge and financing rates.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::ChargeBreakdown;

use super::CalcError;

/// Rates applied to a delivery/MTF equity trade.
///
/// All rates are fractions of the base they apply to (0.001 = 0.1%).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargeSchedule {
    /// Flat brokerage per trade
    pub brokerage: Decimal,

    /// STT on turnover when the position is carried overnight
    pub stt_delivery_rate: Decimal,

    /// STT on sell value for intraday trades
    pub stt_intraday_rate: Decimal,

    /// Stamp duty on buy value when carried overnight
    pub stamp_delivery_rate: Decimal,

    /// Stamp duty on buy value for intraday trades
    pub stamp_intraday_rate: Decimal,

    /// Exchange transaction charges on turnover
    pub exchange_rate: Decimal,

    /// SEBI fee on turnover
    pub sebi_rate: Decimal,

    /// GST on brokerage, exchange and SEBI charges
    pub gst_rate: Decimal,

    /// Annual interest on the funded amount
    pub annual_interest_rate: Decimal,

    /// Day count basis for interest accrual
    pub days_in_year: u32,
}

impl Default for ChargeSchedule {
    fn default() -> Self {
        Self {
            brokerage: dec!(40),
            stt_delivery_rate: dec!(0.001),
            stt_intraday_rate: dec!(0.00025),
            stamp_delivery_rate: dec!(0.00015),
            stamp_intraday_rate: dec!(0.00003),
            exchange_rate: dec!(0.0000345),
            sebi_rate: dec!(0.000001),
            gst_rate: dec!(0.18),
            annual_interest_rate: dec!(0.15), // 15% p.a.
            days_in_year: 365,
        }
    }
}

impl ChargeSchedule {
    /// Load a schedule from a JSON file. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read charge schedule {}", path.display()))?;
        let schedule: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse charge schedule {}", path.display()))?;
        schedule.check()?;
        Ok(schedule)
    }

    /// Reject schedules that would produce meaningless results.
    pub fn check(&self) -> Result<()> {
        let rates = [
            ("brokerage", self.brokerage),
            ("stt_delivery_rate", self.stt_delivery_rate),
            ("stt_intraday_rate", self.stt_intraday_rate),
            ("stamp_delivery_rate", self.stamp_delivery_rate),
            ("stamp_intraday_rate", self.stamp_intraday_rate),
            ("exchange_rate", self.exchange_rate),
            ("sebi_rate", self.sebi_rate),
            ("gst_rate", self.gst_rate),
            ("annual_interest_rate", self.annual_interest_rate),
        ];

        if let Some((name, _)) = rates.iter().find(|(_, v)| v.is_sign_negative()) {
            anyhow::bail!("Charge schedule field {} must not be negative", name);
        }
        if self.days_in_year == 0 {
            anyhow::bail!("Charge schedule field days_in_year must be positive");
        }

        Ok(())
    }

    /// Compute every charge component for a trade.
    ///
    /// Overnight positions pay STT on the full turnover and the delivery
    /// stamp rate; intraday positions pay STT on the sell leg only.
    pub fn charges(
        &self,
        shares: Decimal,
        buy_price: Decimal,
        sell_price: Decimal,
        turnover: Decimal,
        holding_days: u32,
    ) -> Result<ChargeBreakdown, CalcError> {
        let brokerage = self.brokerage;
        let buy_value = mul(shares, buy_price)?;

        let (stt, stamp_duty) = if holding_days > 0 {
            (
                mul(turnover, self.stt_delivery_rate)?,
                mul(buy_value, self.stamp_delivery_rate)?,
            )
        } else {
            (
                mul(mul(shares, sell_price)?, self.stt_intraday_rate)?,
                mul(buy_value, self.stamp_intraday_rate)?,
            )
        };

        let exchange = mul(turnover, self.exchange_rate)?;
        let sebi = mul(turnover, self.sebi_rate)?;
        let gst = mul(self.gst_rate, sum(&[sebi, brokerage, exchange])?)?;
        let total = sum(&[brokerage, stt, exchange, stamp_duty, gst, sebi])?;

        Ok(ChargeBreakdown {
            brokerage,
            stt,
            exchange,
            stamp_duty,
            gst,
            sebi,
            total,
        })
    }

    /// Simple daily accrual on the funded portion.
    pub fn financing_interest(
        &self,
        funded_amount: Decimal,
        holding_days: u32,
    ) -> Result<Decimal, CalcError> {
        mul(
            mul(funded_amount, self.annual_interest_rate)?,
            Decimal::from(holding_days),
        )?
        .checked_div(Decimal::from(self.days_in_year))
        .ok_or(CalcError::Overflow)
    }
}

fn mul(a: Decimal, b: Decimal) -> Result<Decimal, CalcError> {
    a.checked_mul(b).ok_or(CalcError::Overflow)
}

fn sum(values: &[Decimal]) -> Result<Decimal, CalcError> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or(CalcError::Overflow)
}
