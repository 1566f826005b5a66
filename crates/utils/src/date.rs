//! Calendar-date normalization for user supplied dates.
//!
//! Dates arrive either as `dd/mm/yyyy` (what the board's forms and filters
//! send) or as ISO 8601 strings. Whatever the input, the stored value is the
//! calendar date the user meant, at 00:00:00 UTC. Time of day is discarded so
//! a date never shifts by one day when rendered under a different timezone.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use thiserror::Error;

const DISPLAY_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateError {
    #[error("invalid date format")]
    InvalidFormat { input: String },
}

impl DateError {
    fn invalid(input: &str) -> Self {
        Self::InvalidFormat {
            input: input.to_string(),
        }
    }
}

/// Normalize `input` using the host's current UTC offset.
pub fn normalize(input: &str) -> Result<DateTime<Utc>, DateError> {
    normalize_in(input, Local::now().offset().fix())
}

/// Normalize `input` as if the caller lived at `offset`.
///
/// `dd/mm/yyyy` is a calendar date already and is offset independent. Full
/// timestamps are first moved to `offset` and their local calendar date kept.
pub fn normalize_in(input: &str, offset: FixedOffset) -> Result<DateTime<Utc>, DateError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DateError::invalid(input));
    }

    if trimmed.contains('/') {
        return parse_day_month_year(trimmed)
            .map(midnight_utc)
            .ok_or_else(|| DateError::invalid(input));
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(calendar_midnight(&instant.with_timezone(&offset)));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(midnight_utc(date));
    }

    // Timestamps without an offset are read as wall-clock time at `offset`.
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| midnight_utc(naive.date()))
        .map_err(|_| DateError::invalid(input))
}

/// Strip the time of day from an instant, keeping its calendar date in `Tz`.
pub fn calendar_midnight<Tz: TimeZone>(instant: &DateTime<Tz>) -> DateTime<Utc> {
    midnight_utc(instant.date_naive())
}

pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Today's local calendar date at UTC midnight.
pub fn today() -> DateTime<Utc> {
    midnight_utc(Local::now().date_naive())
}

/// Human readable form used on board cards. Parses back through [`normalize`].
pub fn format_display(date: &DateTime<Utc>) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

fn parse_day_month_year(input: &str) -> Option<NaiveDate> {
    let mut parts = input.split('/').map(str::trim);
    let day = parts.next()?.parse::<u32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    let year = parts.next()?.parse::<i32>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}
