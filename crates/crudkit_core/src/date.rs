//! Bookkeeping timestamp rendering.
//!
//! All rendering happens in UTC.

use crate::config::{ConfigError, DateFormat};
use crate::model::record::FieldValue;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

const DATETIME_PATTERN: &str = "%Y-%m-%d %H:%M:%S";
const DATE_PATTERN: &str = "%Y-%m-%d";

pub type DateResult<T> = Result<T, DateError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    Config(ConfigError),
    OutOfRange(i64),
}

impl Display for DateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::OutOfRange(value) => {
                write!(f, "unix timestamp {value} is outside the supported range")
            }
        }
    }
}

impl Error for DateError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::OutOfRange(_) => None,
        }
    }
}

impl From<ConfigError> for DateError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

/// Renders `raw` (Unix seconds) or the current time in `format`.
///
/// - `Integer` → the timestamp itself.
/// - `DateTime` → `YYYY-MM-DD HH:MM:SS`.
/// - `DateOnly` → `YYYY-MM-DD`.
pub fn format_date(format: DateFormat, raw: Option<i64>) -> DateResult<FieldValue> {
    let seconds = raw.unwrap_or_else(|| Utc::now().timestamp());
    if format == DateFormat::Integer {
        return Ok(FieldValue::Integer(seconds));
    }

    let moment =
        DateTime::<Utc>::from_timestamp(seconds, 0).ok_or(DateError::OutOfRange(seconds))?;
    let pattern = match format {
        DateFormat::DateOnly => DATE_PATTERN,
        _ => DATETIME_PATTERN,
    };
    Ok(FieldValue::Text(moment.format(pattern).to_string()))
}

/// Same as [`format_date`] but takes the mode by name.
///
/// # Errors
/// - `DateError::Config` when `mode` is not `integer|datetime|date-only`.
pub fn format_date_str(mode: &str, raw: Option<i64>) -> DateResult<FieldValue> {
    format_date(mode.parse()?, raw)
}
