//! Calendar month parsing and formatting.
//!
//! A calendar month is represented as a `DateTime<Utc>` pinned to the first
//! day of the month at midnight, so comparing months is plain timestamp
//! comparison.

use chrono::{DateTime, Datelike, Months, TimeZone, Utc};
use thiserror::Error;

/// Canonical output layout (`YYYY-MM`)
pub const MONTH_FORMAT: &str = "%Y-%m";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid month format (want YYYY-MM or MM-YYYY)")]
pub struct InvalidMonthFormat;

/// Parse a `YYYY-MM` or `MM-YYYY` value into the first instant of that month.
///
/// Surrounding whitespace is ignored. `YYYY-MM` is tried first.
pub fn parse_month(input: &str) -> Result<DateTime<Utc>, InvalidMonthFormat> {
    let input = input.trim();

    let (year, month) = year_first(input)
        .or_else(|| month_first(input))
        .ok_or(InvalidMonthFormat)?;

    first_of_month(year, month).ok_or(InvalidMonthFormat)
}

/// Format a month as `YYYY-MM`.
pub fn format_month(date: &DateTime<Utc>) -> String {
    date.format(MONTH_FORMAT).to_string()
}

/// Normalize any instant to the first day of its month.
pub fn truncate_to_month(date: &DateTime<Utc>) -> DateTime<Utc> {
    first_of_month(date.year(), date.month()).unwrap_or(*date)
}

/// Months elapsed since January of year 0 (`year * 12 + month - 1`).
///
/// Consecutive calendar months have consecutive indices.
pub fn month_index(date: &DateTime<Utc>) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

/// Every month boundary from `start` to `end`, both inclusive.
///
/// Returns an empty sequence when `end` precedes `start`.
pub fn month_range(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut months = Vec::new();
    let mut current = truncate_to_month(start);
    let end = truncate_to_month(end);

    while current <= end {
        months.push(current);
        match current.checked_add_months(Months::new(1)) {
            Some(next) => current = next,
            None => break,
        }
    }

    months
}

fn year_first(input: &str) -> Option<(i32, u32)> {
    if !has_layout(input, 4) {
        return None;
    }
    Some((input[0..4].parse().ok()?, input[5..7].parse().ok()?))
}

fn month_first(input: &str) -> Option<(i32, u32)> {
    if !has_layout(input, 2) {
        return None;
    }
    Some((input[3..7].parse().ok()?, input[0..2].parse().ok()?))
}

// Seven ASCII characters: digits everywhere except a single '-' at `separator`.
fn has_layout(input: &str, separator: usize) -> bool {
    input.len() == 7
        && input.bytes().enumerate().all(|(i, b)| {
            if i == separator {
                b == b'-'
            } else {
                b.is_ascii_digit()
            }
        })
}

fn first_of_month(year: i32, month: u32) -> Option<DateTime<Utc>> {
    if !(1..=12).contains(&month) {
        return None;
    }
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single()
}
