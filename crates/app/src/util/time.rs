use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use pulse_core::{Window, parse_timestamp};

use crate::config::QueryParams;
use crate::error::{AppError, Result};

/// Resolves the query's bounds into a window. Missing bounds default to the
/// trailing year ending yesterday.
pub fn resolve_window(params: &QueryParams, now: DateTime<Utc>) -> Result<Window> {
    let fallback = Window::trailing_year(now);
    let start = match params.start.as_deref() {
        Some(value) => parse_bound(value)?,
        None => fallback.start(),
    };
    let end = match params.end.as_deref() {
        Some(value) => parse_bound(value)?,
        None => fallback.end(),
    };
    Ok(Window::new(start, end)?)
}

/// Accepts a bare `YYYY-MM-DD` date (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_bound(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    parse_timestamp(value)
        .map_err(|err| AppError::InvalidInput(format!("invalid datetime '{}': {}", value, err)))
}
