//! Column encodings shared by the SQLite repositories.
//!
//! Timestamps are written as RFC 3339 UTC with exactly six fractional
//! digits and a `Z` suffix, e.g. `2026-03-01T09:30:00.000000Z`. Every value
//! has the same width, so string comparison, `MAX()` and `ORDER BY` on the
//! column agree with chronological order.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use hirechat_types::error::RepositoryError;
use hirechat_types::time;

pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    time::truncate(*dt).to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Parse any of the UUID newtypes stored as text.
pub(crate) fn parse_id<T>(s: &str, what: &str) -> Result<T, RepositoryError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| RepositoryError::Query(format!("invalid {what} id: {e}")))
}

pub(crate) fn query_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}
