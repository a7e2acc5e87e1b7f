//! Field normalisation helpers shared by `Channel` and `Description`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use url::Url;

use crate::error::{CisError, Result};

/// Naive datetime layouts accepted after RFC 3339 fails (interpreted as UTC).
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses an absolute URL, requiring scheme, host and path.
///
/// `https://cis.ligo.org/api` and `https://cis.ligo.org/` pass;
/// `cis.ligo.org/api` (no scheme) and `https://cis.ligo.org` (no path) fail.
///
/// # Errors
///
/// Returns `CisError::InvalidUrl` naming `field` if any piece is missing.
pub fn validate_url(field: &'static str, raw: &str) -> Result<Url> {
    let invalid = || CisError::InvalidUrl {
        field,
        url: String::from(raw),
    };

    let url = Url::parse(raw).map_err(|_| invalid())?;
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid());
    }

    // `Url` normalises an empty path to "/", so look at the raw authority part.
    let after_scheme = raw.split_once("://").map_or("", |(_, rest)| rest);
    let authority_end = after_scheme.find(['/', '?', '#']);
    match authority_end {
        Some(pos) if after_scheme.get(pos..).is_some_and(|rest| rest.starts_with('/')) => Ok(url),
        _ => Err(invalid()),
    }
}

/// Validates an optional URL field.
///
/// # Errors
///
/// See [`validate_url`].
pub fn validate_optional_url(field: &'static str, raw: Option<&str>) -> Result<Option<Url>> {
    raw.map(|u| validate_url(field, u)).transpose()
}

/// Parses a service timestamp into UTC.
///
/// Accepts RFC 3339, naive `YYYY-MM-DD[T ]HH:MM:SS[.f]` and bare dates.
///
/// # Errors
///
/// Returns `CisError::InvalidTimestamp` if no layout matches.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let value = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| CisError::InvalidTimestamp {
            value: String::from(raw),
        })
}

/// Parses an optional timestamp field.
///
/// # Errors
///
/// See [`parse_timestamp`].
pub fn parse_optional_timestamp(raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    raw.map(parse_timestamp).transpose()
}

/// Drops empty strings so that `Some("")` reads as unset.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_validate_url_accepts_absolute_url() {
        // Arrange & Act
        let url = validate_url("url", "https://cis.ligo.org/channel/12345").unwrap();

        // Assert
        assert_eq!(url.host_str(), Some("cis.ligo.org"));
        assert_eq!(url.path(), "/channel/12345");
    }

    #[test]
    fn test_validate_url_rejects_missing_scheme() {
        // Arrange & Act
        let result = validate_url("apiurl", "cis.ligo.org/api");

        // Assert
        assert!(matches!(
            result,
            Err(CisError::InvalidUrl { field: "apiurl", .. })
        ));
    }

    #[test]
    fn test_validate_url_rejects_missing_path() {
        assert!(validate_url("url", "https://cis.ligo.org").is_err());
        assert!(validate_url("url", "https://cis.ligo.org?q=1").is_err());
    }

    #[test]
    fn test_validate_url_accepts_root_path() {
        assert!(validate_url("url", "https://cis.ligo.org/").is_ok());
        assert!(validate_url("url", "http://127.0.0.1:8080/api/").is_ok());
    }

    #[test]
    fn test_validate_url_rejects_hostless_scheme() {
        assert!(validate_url("url", "mailto:someone@ligo.org").is_err());
    }

    #[test]
    fn test_parse_timestamp_rfc3339() {
        // Arrange & Act
        let dt = parse_timestamp("2014-03-18T15:21:41.123456Z").unwrap();

        // Assert
        assert_eq!(dt.year(), 2014);
        assert_eq!(dt.hour(), 15);
    }

    #[test]
    fn test_parse_timestamp_with_offset_converts_to_utc() {
        let dt = parse_timestamp("2014-03-18T15:21:41-07:00").unwrap();
        assert_eq!(dt.hour(), 22);
    }

    #[test]
    fn test_parse_timestamp_naive_forms() {
        assert_eq!(parse_timestamp("2014-03-18T15:21:41").unwrap().minute(), 21);
        assert_eq!(parse_timestamp("2014-03-18 15:21:41.5").unwrap().second(), 41);
        assert_eq!(parse_timestamp("2014-03-18").unwrap().day(), 18);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(CisError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some(String::new())), None);
        assert_eq!(non_empty(Some(String::from("x"))), Some(String::from("x")));
        assert_eq!(non_empty(None), None);
    }
}
