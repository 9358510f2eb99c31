//! HTTP date parsing and formatting
//!
//! Used to derive a freshness lifetime from `Expires` when a response has no
//! `max-age` directive. Times are expressed as Unix milliseconds, the unit of
//! the store clock.

use chrono::{DateTime, NaiveDateTime, Utc};

/// HTTP date parsing error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpDateParseError {
    /// Date format was not recognized by any of the supported parsers
    #[error("Unrecognized HTTP date format: {0}")]
    UnrecognizedFormat(String),
    /// Date was parsed but represents a time before Unix epoch
    #[error("Invalid timestamp in HTTP date: {0}")]
    InvalidTimestamp(String),
}

/// Parse an HTTP date into Unix milliseconds.
///
/// Accepts the three RFC 7231 forms (IMF-fixdate, RFC 850, asctime) and
/// falls back to RFC 2822.
///
/// # Errors
///
/// `UnrecognizedFormat` when no parser accepts the input, `InvalidTimestamp`
/// for dates before the Unix epoch.
pub fn parse_http_date(date_str: &str) -> Result<u64, HttpDateParseError> {
    let date_str = date_str.trim();

    let seconds = if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, "%a, %d %b %Y %H:%M:%S GMT") {
        dt.and_utc().timestamp()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, "%A, %d-%b-%y %H:%M:%S GMT") {
        dt.and_utc().timestamp()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, "%a %b %e %H:%M:%S %Y") {
        dt.and_utc().timestamp()
    } else if let Ok(dt) = DateTime::parse_from_rfc2822(date_str) {
        dt.timestamp()
    } else {
        return Err(HttpDateParseError::UnrecognizedFormat(date_str.to_string()));
    };

    u64::try_from(seconds)
        .map(|secs| secs.saturating_mul(1000))
        .map_err(|_| HttpDateParseError::InvalidTimestamp(date_str.to_string()))
}

/// Format Unix milliseconds as an IMF-fixdate string.
pub fn fmt_http_date(unix_millis: u64) -> String {
    let secs = i64::try_from(unix_millis / 1000).unwrap_or(i64::MAX);
    let dt = DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default();
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOV_6_1994: u64 = 784_111_777_000;

    #[test]
    fn rfc_7231_forms() {
        assert_eq!(parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT"), Ok(NOV_6_1994));
        assert_eq!(parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"), Ok(NOV_6_1994));
        assert_eq!(parse_http_date("Sun Nov  6 08:49:37 1994"), Ok(NOV_6_1994));
    }

    #[test]
    fn format_then_parse() {
        let formatted = fmt_http_date(NOV_6_1994 + 999);
        assert_eq!(formatted, "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parse_http_date(&formatted), Ok(NOV_6_1994));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            parse_http_date("0"),
            Err(HttpDateParseError::UnrecognizedFormat(_))
        ));
    }
}
