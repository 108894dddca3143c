// SPDX-License-Identifier: MIT

//! Shared helpers for date/time formatting and streak day arithmetic.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// RFC3339 with millisecond precision.
///
/// Used for commute `logged_at` values, which double as a pagination sort
/// key and need sub-second ordering.
pub fn format_utc_rfc3339_millis(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// UTC calendar day key ("YYYY-MM-DD") used for streak bookkeeping.
pub fn utc_day_key(date: DateTime<Utc>) -> String {
    date.date_naive().format("%Y-%m-%d").to_string()
}

/// Whether `next` is exactly the calendar day after `prev`.
///
/// Both arguments are "YYYY-MM-DD" day keys. Unparseable keys count as
/// non-consecutive.
pub fn is_next_utc_day(prev: &str, next: &str) -> bool {
    let (Ok(prev), Ok(next)) = (
        NaiveDate::parse_from_str(prev, "%Y-%m-%d"),
        NaiveDate::parse_from_str(next, "%Y-%m-%d"),
    ) else {
        return false;
    };

    prev.succ_opt() == Some(next)
}
