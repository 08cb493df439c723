//! Calendar features derived from the forecast date

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::{ForecastError, Result};

/// Date formats accepted in addition to RFC 3339 timestamps
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parse the date text entered in the form
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return Ok(date);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.date_naive());
    }

    Err(ForecastError::SchemaMismatch(format!(
        "cannot parse date '{}' (expected YYYY-MM-DD)",
        text
    )))
}

/// Date parts fed to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParts {
    /// Calendar year (not the ISO week-numbering year)
    pub year: i32,
    /// 1-12
    pub month: u32,
    /// 0 = Monday ... 6 = Sunday
    pub day_of_week: u32,
    /// ISO 8601 week number, 1-53
    pub week_of_year: u32,
}

impl DateParts {
    pub fn from_date(date: NaiveDate) -> Self {
        DateParts {
            year: date.year(),
            month: date.month(),
            day_of_week: date.weekday().num_days_from_monday(),
            week_of_year: date.iso_week().week(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        parse_date(text).map(Self::from_date)
    }
}
