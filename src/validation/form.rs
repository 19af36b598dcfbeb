//! Strict parse-and-validate step from raw form values to a `TradeInput`.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use thiserror::Error;

use crate::models::{SellMode, SizeMode, TradeInput};

use super::holding::{holding_days_between, parse_date};

const MIN_LEVERAGE: Decimal = dec!(1);
const MAX_LEVERAGE: Decimal = dec!(100);
const MIN_PRICE: Decimal = dec!(0.01);
const MAX_PRICE: Decimal = dec!(10000000);
const MAX_TARGET_PCT: Decimal = dec!(100000);
const MAX_SHARES: Decimal = dec!(10000000000);
const MAX_CAPITAL: Decimal = dec!(10000000000);
const MAX_HOLDING_DAYS: i64 = 3650;

/// Input field a validation message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Leverage,
    BuyPrice,
    ExitTarget,
    HoldingDays,
    EntryDate,
    ExitDate,
    SizeValue,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Leverage => "leverage",
            Field::BuyPrice => "buy_price",
            Field::ExitTarget => "exit_target",
            Field::HoldingDays => "holding_days",
            Field::EntryDate => "entry_date",
            Field::ExitDate => "exit_date",
            Field::SizeValue => "size_value",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A human-readable problem with one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// Every field that failed validation, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[error("invalid trade input: {}", join_errors(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    fn push(&mut self, field: Field, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[cfg(test)]
    pub fn has(&self, field: Field) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    #[cfg(test)]
    pub fn message_for(&self, field: Field) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

/// Raw, unvalidated calculator form.
///
/// Values arrive as text (CLI flags, form fields); nothing is coerced
/// until [`TradeForm::validate`] runs.
#[derive(Debug, Clone, Default)]
pub struct TradeForm {
    pub leverage: Option<String>,
    pub buy_price: Option<String>,
    pub exit_target: Option<String>,
    pub sell_mode: SellMode,
    pub holding_days: Option<String>,
    pub entry_date: Option<String>,
    pub exit_date: Option<String>,
    pub size_value: Option<String>,
    pub size_mode: SizeMode,
}

impl TradeForm {
    /// Validate every field and build a `TradeInput`.
    ///
    /// `today` closes open positions when the holding period comes from an
    /// entry date. All failing fields are reported together.
    pub fn validate(&self, today: NaiveDate) -> Result<TradeInput, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let leverage = positive_decimal(
            &mut errors,
            Field::Leverage,
            self.leverage.as_deref(),
            "Select a stock or enter a leverage multiplier",
            (MIN_LEVERAGE, MAX_LEVERAGE),
        );
        let buy_price = positive_decimal(
            &mut errors,
            Field::BuyPrice,
            self.buy_price.as_deref(),
            "Enter a buy price",
            (MIN_PRICE, MAX_PRICE),
        );
        let exit_bounds = match self.sell_mode {
            SellMode::Exact => (MIN_PRICE, MAX_PRICE),
            SellMode::Percent => (Decimal::ZERO, MAX_TARGET_PCT),
        };
        let exit_target = positive_decimal(
            &mut errors,
            Field::ExitTarget,
            self.exit_target.as_deref(),
            match self.sell_mode {
                SellMode::Exact => "Enter a sell price",
                SellMode::Percent => "Enter a target percentage",
            },
            exit_bounds,
        );
        let holding_days = self.resolve_holding_days(&mut errors, today);
        let size_bounds = match self.size_mode {
            SizeMode::Quantity => (Decimal::ZERO, MAX_SHARES),
            SizeMode::Capital => (Decimal::ZERO, MAX_CAPITAL),
        };
        let size_value = positive_decimal(
            &mut errors,
            Field::SizeValue,
            self.size_value.as_deref(),
            match self.size_mode {
                SizeMode::Quantity => "Enter a quantity",
                SizeMode::Capital => "Enter the capital to invest",
            },
            size_bounds,
        );

        if let Some(size) = size_value {
            match self.size_mode {
                SizeMode::Quantity if !size.fract().is_zero() => {
                    errors.push(Field::SizeValue, "Quantity must be a whole number of shares");
                }
                SizeMode::Capital => {
                    if let (Some(lev), Some(buy)) = (leverage, buy_price) {
                        match size.checked_mul(lev).and_then(|power| power.checked_div(buy)) {
                            Some(shares) if shares.trunc().is_zero() => errors.push(
                                Field::SizeValue,
                                "Capital is too small to buy one share at this leverage",
                            ),
                            Some(_) => {}
                            None => errors.push(
                                Field::SizeValue,
                                "Capital is too large for this price and leverage",
                            ),
                        }
                    }
                }
                _ => {}
            }
        }

        match (leverage, buy_price, exit_target, holding_days, size_value) {
            (Some(leverage_multiplier), Some(buy_price), Some(exit_target), Some(holding_days), Some(size_value))
                if errors.is_empty() =>
            {
                Ok(TradeInput {
                    leverage_multiplier,
                    buy_price,
                    exit_target,
                    sell_mode: self.sell_mode,
                    holding_days,
                    size_value,
                    size_mode: self.size_mode,
                })
            }
            _ => Err(errors),
        }
    }

    fn resolve_holding_days(&self, errors: &mut ValidationErrors, today: NaiveDate) -> Option<u32> {
        if let Some(raw) = non_empty(self.holding_days.as_deref()) {
            return match raw.parse::<i64>() {
                Ok(days) if days < 0 => {
                    errors.push(Field::HoldingDays, "Holding days cannot be negative");
                    None
                }
                Ok(days) if days > MAX_HOLDING_DAYS => {
                    errors.push(
                        Field::HoldingDays,
                        format!("Holding days cannot exceed {}", MAX_HOLDING_DAYS),
                    );
                    None
                }
                Ok(days) => u32::try_from(days).ok(),
                Err(_) => {
                    errors.push(Field::HoldingDays, "Holding days must be a whole number");
                    None
                }
            };
        }

        let Some(raw_entry) = non_empty(self.entry_date.as_deref()) else {
            errors.push(Field::HoldingDays, "Enter holding days or an entry date");
            return None;
        };

        let Some(entry) = parse_date(raw_entry) else {
            errors.push(Field::EntryDate, "Entry date must be YYYY-MM-DD");
            return None;
        };

        let exit = match non_empty(self.exit_date.as_deref()) {
            Some(raw_exit) => match parse_date(raw_exit) {
                Some(exit) => Some(exit),
                None => {
                    errors.push(Field::ExitDate, "Exit date must be YYYY-MM-DD");
                    return None;
                }
            },
            None => None,
        };

        match holding_days_between(entry, exit, today) {
            Some(days) if i64::from(days) > MAX_HOLDING_DAYS => {
                errors.push(
                    Field::EntryDate,
                    format!("Holding period cannot exceed {} days", MAX_HOLDING_DAYS),
                );
                None
            }
            Some(days) => Some(days),
            None => {
                errors.push(Field::ExitDate, "Exit date cannot be before the entry date");
                None
            }
        }
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a required, strictly positive decimal within `[min, max]`.
fn positive_decimal(
    errors: &mut ValidationErrors,
    field: Field,
    raw: Option<&str>,
    missing: &str,
    (min, max): (Decimal, Decimal),
) -> Option<Decimal> {
    let Some(raw) = non_empty(raw) else {
        errors.push(field, missing);
        return None;
    };

    match Decimal::from_str(raw) {
        Ok(value) if value <= Decimal::ZERO => {
            errors.push(field, "Must be greater than zero");
            None
        }
        Ok(value) if value < min => {
            errors.push(field, format!("Must be at least {}", min));
            None
        }
        Ok(value) if value > max => {
            errors.push(field, format!("Must not exceed {}", max));
            None
        }
        Ok(value) => Some(value),
        Err(_) => {
            errors.push(field, format!("'{}' is not a valid number", raw));
            None
        }
    }
}
