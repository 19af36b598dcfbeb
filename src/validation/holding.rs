//! Holding period derived from entry/exit dates.

use chrono::NaiveDate;

/// Date format accepted for entry and exit dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// Days between entry and exit, with an open position exiting `today`.
///
/// An explicit exit date before the entry date clears the value (`None`).
/// An open position whose entry lies in the future counts as 0 days.
pub fn holding_days_between(
    entry: NaiveDate,
    exit: Option<NaiveDate>,
    today: NaiveDate,
) -> Option<u32> {
    let days = match exit {
        Some(exit) if exit < entry => return None,
        Some(exit) => (exit - entry).num_days(),
        None => (today - entry).num_days().max(0),
    };

    u32::try_from(days).ok()
}
