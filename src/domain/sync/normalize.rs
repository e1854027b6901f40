//! Pure normalization helpers for loosely-typed subscription payloads.
//!
//! Every function here is total: bad input yields an empty string or `None`,
//! never a panic or an error.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::event::SubscriptionEvent;

/// Country calling code used when the configuration does not provide one.
pub const DEFAULT_COUNTRY_CODE: &str = "55";

/// Days added to "today" when an event carries no usable date signal.
pub const FALLBACK_CLOSE_DAYS: i64 = 30;

/// Case-folds, strips diacritics and trims a status string.
///
/// `"  Cancelada "` and `"CANCELADÁ"` both become `"cancelada"`.
pub fn normalize_status(status: &str) -> String {
    status
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Keeps only the ASCII digits of a phone number.
pub fn normalize_phone_digits(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Formats a phone number as E.164 (`+` followed by 8 to 15 digits).
///
/// The country code is prefixed unless the digits already start with it.
/// Returns `None` when the result does not look like a dialable number.
pub fn to_e164(phone: &str, country_code: &str) -> Option<String> {
    let digits = normalize_phone_digits(phone);
    if digits.is_empty() {
        return None;
    }

    let country = normalize_phone_digits(country_code);
    let full = if digits.starts_with(&country) {
        digits
    } else {
        format!("{}{}", country, digits)
    };

    if !(8..=15).contains(&full.len()) || full.starts_with('0') {
        return None;
    }

    Some(format!("+{}", full))
}

/// Parses the date formats observed in subscription payloads.
///
/// Accepts `YYYY-MM-DD` (UTC midnight), RFC 3339, `YYYY-MM-DD HH:MM:SS`
/// and `YYYY-MM-DDTHH:MM:SS` (both assumed UTC) and unix-epoch seconds.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt.and_utc());
        }
    }

    if value.len() >= 9 && value.chars().all(|c| c.is_ascii_digit()) {
        return value
            .parse::<i64>()
            .ok()
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
    }

    None
}

/// Adds (or subtracts, for negative `days`) whole days in UTC.
///
/// `None` when the result leaves chrono's representable range.
pub fn add_days(date: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    date.checked_add_signed(Duration::try_days(days)?)
}

/// Same calendar day one month later, clamped to the end of the target month.
///
/// 2024-01-31 becomes 2024-02-29; 2023-01-31 becomes 2023-02-28.
pub fn same_day_next_month(date: DateTime<Utc>) -> Option<DateTime<Utc>> {
    date.checked_add_months(Months::new(1))
}

/// Formats a UTC instant as `YYYY-MM-DD`.
pub fn ymd(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// How an explicit period end becomes the expected close date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseDateRule {
    /// The day after the period ends (renewal day).
    #[default]
    DayAfterPeriodEnd,
    /// The period end itself.
    PeriodEnd,
}

/// Resolves the expected close date of a sale record as `YYYY-MM-DD` (UTC).
///
/// Precedence: an explicit period end (adjusted by `rule`), then one month
/// after the best-known cycle start, then `today` + 30 days. A date whose
/// adjustment overflows is skipped like an unparseable one.
pub fn resolve_expected_close_date(
    event: &SubscriptionEvent,
    rule: CloseDateRule,
    today: DateTime<Utc>,
) -> String {
    let period_end = [
        &["current_invoice", "period_end"][..],
        &["last_transaction", "invoice", "period_end"],
        &["dates", "cycle_end_date"],
    ]
    .iter()
    .find_map(|path| {
        let end = event.text(path).as_deref().and_then(parse_date)?;
        match rule {
            CloseDateRule::DayAfterPeriodEnd => add_days(end, 1),
            CloseDateRule::PeriodEnd => Some(end),
        }
    });

    if let Some(close) = period_end {
        return ymd(close);
    }

    let cycle_start = [
        &["current_invoice", "period_start"][..],
        &["last_transaction", "invoice", "period_start"],
        &["dates", "cycle_start_date"],
        &["dates", "started_at"],
    ]
    .iter()
    .find_map(|path| {
        event
            .text(path)
            .as_deref()
            .and_then(parse_date)
            .and_then(same_day_next_month)
    });

    if let Some(close) = cycle_start {
        return ymd(close);
    }

    ymd(add_days(today, FALLBACK_CLOSE_DAYS).unwrap_or(today))
}
