//! RFC3339 timestamps as stored in TEXT columns.

use chrono::{DateTime, SecondsFormat, Utc};

/// Formats `at` the way timestamp columns store it (`2025-01-01T12:00:00.000Z`).
pub fn format(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time, formatted for storage.
pub fn now() -> String {
    format(Utc::now())
}

/// Parses a stored timestamp.
pub fn parse(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
