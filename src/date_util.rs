//! Local-noon date parsing
//!
//! Date-only strings (`YYYY-MM-DD`) coming from the LLM or tool arguments
//! are interpreted at local noon rather than UTC midnight, so that a date
//! like `2025-12-25` does not roll over to Dec 24 for users west of UTC.
//! Full datetime strings are honored verbatim.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Parse a tool-supplied date or datetime string into a UTC instant.
///
/// - `YYYY-MM-DD` is interpreted as local noon on that date.
/// - `YYYY-MM-DDTHH:MM:SS`, with or without a trailing `Z` or UTC offset, is
///   honored as given (naive datetimes are assumed local, RFC3339 strings
///   carry their own offset).
pub fn parse_flexible_datetime(input: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = input.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(local_noon(date));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(local_to_utc(naive));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(local_to_utc(naive));
    }

    Err(format!("unrecognized date/datetime format: {}", input))
}

/// Parse a date-only string (`YYYY-MM-DD`) into a [`NaiveDate`], for fields
/// that are genuinely date-only (itinerary start/end, hotel check-in/out).
pub fn parse_date_only(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}': {}", input, e))
}

fn local_noon(date: NaiveDate) -> DateTime<Utc> {
    let noon = date.and_hms_opt(12, 0, 0).expect("noon is always valid");
    local_to_utc(noon)
}

fn local_to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    Local
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_only_parses_as_local_noon() {
        use chrono::Timelike;

        let parsed = parse_flexible_datetime("2025-12-25").unwrap();
        let local = parsed.with_timezone(&Local);
        assert_eq!(local.date_naive(), NaiveDate::from_ymd_opt(2025, 12, 25).unwrap());
        assert_eq!(local.time().hour(), 12);
    }

    #[test]
    fn test_rfc3339_datetime_honored_verbatim() {
        let parsed = parse_flexible_datetime("2026-03-01T08:00:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-03-01T08:00:00+00:00");
    }

    #[test]
    fn test_naive_datetime_without_zone() {
        let parsed = parse_flexible_datetime("2026-03-01T08:00:00");
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_invalid_format_errors() {
        let parsed = parse_flexible_datetime("not-a-date");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_parse_date_only() {
        let d = parse_date_only("2026-03-08").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 3, 8).unwrap());
        assert!(parse_date_only("03/08/2026").is_err());
    }
}
