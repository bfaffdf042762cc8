//! Day-granularity date handling.
//!
//! Every comparison the metrics make is between calendar days in UTC, so
//! timestamps are reduced to a [`NaiveDate`] before they meet a [`DateRange`].

use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fmt;

const DAY_FORMAT: &str = "%Y-%m-%d";

/// Lower bound used when no start date is given.
pub fn beginning_of_time() -> NaiveDate {
    NaiveDate::from_ymd_opt(1907, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Reduces a `YYYY-MM-DD` day or an ISO-8601 instant to its UTC calendar day.
pub fn normalize(timestamp: &str) -> Result<NaiveDate> {
    let trimmed = timestamp.trim();

    if let Ok(day) = NaiveDate::parse_from_str(trimmed, DAY_FORMAT) {
        return Ok(day);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|instant| normalize_instant(instant.with_timezone(&Utc)))
        .map_err(|_| Error::MalformedTimestamp {
            value: timestamp.to_string(),
        })
}

pub fn normalize_instant(instant: DateTime<Utc>) -> NaiveDate {
    instant.date_naive()
}

/// Closed interval `[start, end]` of calendar days.
///
/// An inverted pair (`start > end`) is accepted and behaves as an empty range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Builds a range from optional textual bounds, defaulting the start to
    /// [`beginning_of_time`] and the end to today.
    pub fn from_bounds(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        Self::from_bounds_at(start, end, normalize_instant(Utc::now()))
    }

    /// Same as [`DateRange::from_bounds`] with an explicit "today".
    pub fn from_bounds_at(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> Result<Self> {
        let start = start.map(normalize).transpose()?.unwrap_or_else(beginning_of_time);
        let end = end.map(normalize).transpose()?.unwrap_or(today);
        Ok(Self::new(start, end))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} -- {}]",
            self.start.format(DAY_FORMAT),
            self.end.format(DAY_FORMAT)
        )
    }
}
