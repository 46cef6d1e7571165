//! Format and timezone handling for datetime fields.

use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc};

use crate::Value;
use crate::error::{FieldError, FieldErrorKind};

pub const DEFAULT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// How a datetime field reads and renders its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeFormat {
    format: String,
    offset: FixedOffset,
}

impl Default for DateTimeFormat {
    fn default() -> Self {
        Self {
            format: DEFAULT_FORMAT.to_string(),
            offset: utc(),
        }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

impl DateTimeFormat {
    pub fn new(format: Option<&str>, timezone: Option<&str>) -> Result<Self, FieldError> {
        let format = format.unwrap_or(DEFAULT_FORMAT);
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(FieldError::new(
                FieldErrorKind::InvalidProperty,
                format!("invalid datetime format '{}'", format),
            ));
        }
        let offset = match timezone {
            Some(tz) => parse_offset(tz)?,
            None => utc(),
        };
        Ok(Self {
            format: format.to_string(),
            offset,
        })
    }

    pub fn format_str(&self) -> &str {
        &self.format
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Read a value as a point in time.
    ///
    /// Accepts text in the configured format (date-only formats resolve to
    /// midnight), RFC 3339 text, and integer unix timestamps.
    pub fn parse(&self, value: &Value) -> Option<DateTime<FixedOffset>> {
        match value {
            Value::Int(secs) => {
                DateTime::from_timestamp(*secs, 0).map(|dt| dt.with_timezone(&self.offset))
            }
            Value::Text(text) => {
                let text = text.trim();
                if let Ok(naive) = NaiveDateTime::parse_from_str(text, &self.format) {
                    return naive.and_local_timezone(self.offset).single();
                }
                if let Ok(date) = NaiveDate::parse_from_str(text, &self.format) {
                    return date
                        .and_hms_opt(0, 0, 0)
                        .and_then(|naive| naive.and_local_timezone(self.offset).single());
                }
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|dt| dt.with_timezone(&self.offset))
            }
            _ => None,
        }
    }

    /// Render a point in time with the configured format.
    pub fn render(&self, dt: &DateTime<FixedOffset>) -> String {
        let mut out = String::new();
        if write!(out, "{}", dt.format(&self.format)).is_err() {
            tracing::warn!(format = %self.format, "Datetime format failed to render");
            return dt.to_rfc3339();
        }
        out
    }
}

/// Parse `UTC`, `Z` or a `±HH:MM` / `±HHMM` offset.
pub fn parse_offset(tz: &str) -> Result<FixedOffset, FieldError> {
    let tz = tz.trim();
    if tz.eq_ignore_ascii_case("utc") || tz.eq_ignore_ascii_case("z") || tz.eq_ignore_ascii_case("gmt")
    {
        return Ok(utc());
    }

    let invalid = || {
        FieldError::new(
            FieldErrorKind::InvalidProperty,
            format!("invalid timezone offset '{}'", tz),
        )
    };

    let (sign, rest) = match tz.as_bytes().first() {
        Some(b'+') => (1, &tz[1..]),
        Some(b'-') => (-1, &tz[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_default_format() {
        let fmt = DateTimeFormat::default();
        let dt = fmt.parse(&Value::from("2011-03-04 05:06:07")).unwrap();
        assert_eq!(fmt.render(&dt), "2011-03-04 05:06:07");
    }

    #[test]
    fn converts_rfc3339_into_the_field_offset() {
        let fmt = DateTimeFormat::new(None, Some("+02:00")).unwrap();
        let dt = fmt.parse(&Value::from("2011-03-04T05:06:07Z")).unwrap();
        assert_eq!(fmt.render(&dt), "2011-03-04 07:06:07");
    }

    #[test]
    fn date_only_formats_resolve_to_midnight() {
        let fmt = DateTimeFormat::new(Some("%d/%m/%Y"), None).unwrap();
        let dt = fmt.parse(&Value::from("04/03/2011")).unwrap();
        assert_eq!(dt.to_rfc3339(), "2011-03-04T00:00:00+00:00");
    }

    #[test]
    fn timestamps_are_accepted() {
        let fmt = DateTimeFormat::default();
        let dt = fmt.parse(&Value::Int(0)).unwrap();
        assert_eq!(fmt.render(&dt), "1970-01-01 00:00:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(DateTimeFormat::default().parse(&Value::from("yesterday")).is_none());
        assert!(DateTimeFormat::new(Some("%Q"), None).is_err());
        assert!(parse_offset("Europe/London").is_err());
        assert_eq!(parse_offset("-0530").unwrap().local_minus_utc(), -(5 * 3600 + 30 * 60));
    }
}
