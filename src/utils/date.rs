//! Timestamp parsing for the `time` template filter.
//!
//! Values are normalized to UTC. String inputs are probed against a
//! fixed, ordered format list; the first successful parse wins.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::Serialize;
use thiserror::Error;

/// Formats without zone information, taken as UTC.
/// ANSI C asctime first, then the common date-time and date forms.
const NAIVE_FORMATS: &[&str] = &["%a %b %e %H:%M:%S %Y", "%Y-%m-%d %H:%M:%S"];

/// Time-value errors
#[derive(Debug, Error)]
pub enum TimeError {
    #[error("cannot parse {value:?} as a time")]
    Unparseable { value: String },

    #[error("unix timestamp {0} is out of range")]
    OutOfRange(i64),

    #[error("time expects an integer or a string, found {found}")]
    UnsupportedType { found: &'static str },
}

/// A UTC instant, flattened for template field access.
///
/// Templates reach the pieces directly (`t.year`, `t.rfc2822`) after
/// `{% set t = Meta.time | time %}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timestamp {
    pub unix: i64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub rfc2822: String,
    pub rfc3339: String,
}

impl Timestamp {
    /// Parse a timestamp string. Order matters: RFC 2822 (which covers
    /// the RFC 822/1123 family and named zones like GMT), then RFC 3339,
    /// then the zoneless formats, then a bare date taken as midnight.
    pub fn parse(input: &str) -> Result<Self, TimeError> {
        if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
            return Ok(dt.with_timezone(&Utc).into());
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc).into());
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
                return Ok(naive.and_utc().into());
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            return Ok(date.and_time(NaiveTime::MIN).and_utc().into());
        }

        Err(TimeError::Unparseable {
            value: input.to_owned(),
        })
    }

    /// Interpret an integer as Unix-epoch seconds.
    pub fn from_unix(secs: i64) -> Result<Self, TimeError> {
        DateTime::<Utc>::from_timestamp(secs, 0)
            .map(Into::into)
            .ok_or(TimeError::OutOfRange(secs))
    }

    pub fn now() -> Self {
        Utc::now().into()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(utc: DateTime<Utc>) -> Self {
        Self {
            unix: utc.timestamp(),
            year: utc.year(),
            month: utc.month(),
            day: utc.day(),
            hour: utc.hour(),
            minute: utc.minute(),
            second: utc.second(),
            rfc2822: utc.to_rfc2822(),
            rfc3339: utc.to_rfc3339(),
        }
    }
}
