//! Column decoding shared by the table modules.

use crate::error::{DatabaseError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt::Display;
use std::str::FromStr;

pub(crate) fn parse_time(column: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Decode(format!("{column}: {e}")))
}

pub(crate) fn parse_opt_time(column: &str, value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.map(|v| parse_time(column, &v)).transpose()
}

pub(crate) fn parse_date(column: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| DatabaseError::Decode(format!("{column}: {e}")))
}

pub(crate) fn parse_enum<T>(column: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .parse()
        .map_err(|e| DatabaseError::Decode(format!("{column}: {e}")))
}

pub(crate) fn to_u32(column: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| DatabaseError::Decode(format!("{column}: {value} out of range")))
}

pub(crate) fn to_usize(column: &str, value: i64) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| DatabaseError::Decode(format!("{column}: {value} out of range")))
}

/// Clamp a count for binding; `SQLite` integers are signed 64-bit.
pub(crate) fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::Severity;

    #[test]
    fn test_parse_helpers() {
        let at = parse_time("t", "2026-03-01T10:00:00+00:00").expect("time");
        assert_eq!(at.to_rfc3339(), "2026-03-01T10:00:00+00:00");
        assert!(parse_time("t", "yesterday").is_err());
        assert_eq!(parse_opt_time("t", None).expect("none"), None);

        let sev: Severity = parse_enum("severity", "HIGH").expect("severity");
        assert_eq!(sev, Severity::High);
        assert!(parse_enum::<Severity>("severity", "CRITICAL").is_err());

        assert!(to_u32("n", -1).is_err());
        assert_eq!(to_u32("n", 7).expect("n"), 7);
    }
}
