//! Display helpers: en-IN currency grouping and percentages.

use rust_decimal::Decimal;

use crate::models::round_display;

pub const CURRENCY_SYMBOL: &str = "₹";

/// Format an amount as rupees with Indian digit grouping, e.g. `₹12,34,567.89`.
pub fn format_inr(value: Decimal) -> String {
    let rounded = round_display(value);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}{}{}", sign, CURRENCY_SYMBOL, group_en_in(rounded.abs()))
}

/// Format a percentage to two decimals, e.g. `36.56%`.
pub fn format_pct(value: Decimal) -> String {
    format!("{:.2}%", round_display(value))
}

/// Group a non-negative amount: last three integer digits, then pairs.
fn group_en_in(value: Decimal) -> String {
    let text = format!("{:.2}", value);
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 2 + 3);

    if digits.len() <= 3 {
        grouped.push_str(int_part);
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let lead = head.len() % 2;
        for (i, c) in head.iter().enumerate() {
            if i > 0 && (i + 2 - lead) % 2 == 0 {
                grouped.push(',');
            }
            grouped.push(*c);
        }
        grouped.push(',');
        grouped.extend(tail);
    }

    format!("{}.{}", grouped, frac_part)
}

/// Truncate a string with ellipsis if too long.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_indian_grouping() {
        assert_eq!(format_inr(dec!(0)), "₹0.00");
        assert_eq!(format_inr(dec!(914.0093)), "₹914.01");
        assert_eq!(format_inr(dec!(2500)), "₹2,500.00");
        assert_eq!(format_inr(dec!(10000)), "₹10,000.00");
        assert_eq!(format_inr(dec!(123456.7)), "₹1,23,456.70");
        assert_eq!(format_inr(dec!(1234567.891)), "₹12,34,567.89");
        assert_eq!(format_inr(dec!(123456789)), "₹12,34,56,789.00");
    }

    #[test]
    fn test_negative_amounts() {
        assert_eq!(format_inr(dec!(-1378.254)), "-₹1,378.25");
        // Rounds to zero, no stray minus sign
        assert_eq!(format_inr(dec!(-0.001)), "₹0.00");
    }

    #[test]
    fn test_percent() {
        assert_eq!(format_pct(dec!(36.560374)), "36.56%");
        assert_eq!(format_pct(dec!(-5)), "-5.00%");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("RELIANCE", 10), "RELIANCE");
        assert_eq!(truncate("BAJAJ-AUTO-LIMITED", 10), "BAJAJ-A...");
    }
}
