//! Report clock: owns the notion of "today" and the calendar windows
//! derived from it.
//!
//! Dates travel through the engine as ISO `YYYY-MM-DD` strings and are
//! compared lexicographically. Nothing inside the engine parses them;
//! only the runner boundary validates with `parse_strict`.

use crate::error::{DeskError, DeskResult};
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

const ISO_FORMAT: &str = "%Y-%m-%d";

/// A calendar date in ISO form. Ordering is plain string ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarDate(String);

impl CalendarDate {
    /// Wrap a date string without validating it.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Wrap a date string only if chrono accepts it as `YYYY-MM-DD`.
    pub fn parse_strict(value: &str) -> DeskResult<Self> {
        let trimmed = value.trim();
        NaiveDate::parse_from_str(trimmed, ISO_FORMAT)
            .map(Self::from_naive)
            .map_err(|_| DeskError::InvalidDate { value: value.to_string() })
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date.format(ISO_FORMAT).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CalendarDate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An inclusive date range `[start, end]`. A single day has `start == end`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: CalendarDate,
    pub end:   CalendarDate,
}

impl DateWindow {
    pub fn new(start: impl Into<CalendarDate>, end: impl Into<CalendarDate>) -> Self {
        Self { start: start.into(), end: end.into() }
    }

    pub fn day(date: CalendarDate) -> Self {
        Self { start: date.clone(), end: date }
    }

    /// Inclusive on both ends. An absent date is never inside a window.
    pub fn contains(&self, date: Option<&CalendarDate>) -> bool {
        match date {
            Some(d) => *d >= self.start && *d <= self.end,
            None    => false,
        }
    }

    /// Parse `START..END` (or a single `DATE`) and reject reversed ranges.
    pub fn parse_strict(value: &str) -> DeskResult<Self> {
        let (start, end) = match value.split_once("..") {
            Some((s, e)) => (CalendarDate::parse_strict(s)?, CalendarDate::parse_strict(e)?),
            None => {
                let d = CalendarDate::parse_strict(value)?;
                (d.clone(), d)
            }
        };
        if start > end {
            return Err(DeskError::InvalidWindow {
                start: start.to_string(),
                end:   end.to_string(),
            });
        }
        Ok(Self { start, end })
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportClock {
    today: NaiveDate,
}

impl ReportClock {
    /// The current UTC calendar date.
    pub fn system() -> Self {
        Self { today: chrono::Utc::now().date_naive() }
    }

    pub fn fixed(today: NaiveDate) -> Self {
        Self { today }
    }

    pub fn at(today: &str) -> DeskResult<Self> {
        let parsed = NaiveDate::parse_from_str(today.trim(), ISO_FORMAT)
            .map_err(|_| DeskError::InvalidDate { value: today.to_string() })?;
        Ok(Self::fixed(parsed))
    }

    pub fn today(&self) -> CalendarDate {
        CalendarDate::from_naive(self.today)
    }

    pub fn yesterday(&self) -> CalendarDate {
        CalendarDate::from_naive(self.today - Days::new(1))
    }

    /// First of the current month through today.
    pub fn month_to_date(&self) -> DateWindow {
        let first = self.today.with_day(1).unwrap_or(self.today);
        DateWindow {
            start: CalendarDate::from_naive(first),
            end:   self.today(),
        }
    }

    /// Same day one month ago through the last day of the previous month.
    /// The start clamps to the end of a shorter month (Mar 31 -> Feb 28).
    pub fn previous_month_window(&self) -> DateWindow {
        let start = self
            .today
            .checked_sub_months(Months::new(1))
            .unwrap_or(self.today);
        let first = self.today.with_day(1).unwrap_or(self.today);
        let end = first - Days::new(1);
        DateWindow {
            start: CalendarDate::from_naive(start),
            end:   CalendarDate::from_naive(end),
        }
    }
}
