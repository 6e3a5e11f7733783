//! Calendar-date arithmetic used by every other engine module.
//!
//! All helpers work at day granularity. Anything carrying a time of day
//! (`NaiveDateTime`, `DateTime<Tz>`) is reduced to its calendar date first,
//! so two instants on the same local day always compare equal.

use crate::{Error, Result};
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Anything that can be viewed as a plain calendar date.
pub trait AsCalendarDate {
    fn calendar_date(&self) -> NaiveDate;
}

impl AsCalendarDate for NaiveDate {
    fn calendar_date(&self) -> NaiveDate {
        *self
    }
}

impl AsCalendarDate for NaiveDateTime {
    fn calendar_date(&self) -> NaiveDate {
        self.date()
    }
}

impl<Tz: TimeZone> AsCalendarDate for DateTime<Tz> {
    fn calendar_date(&self) -> NaiveDate {
        self.date_naive()
    }
}

impl<T: AsCalendarDate + ?Sized> AsCalendarDate for &T {
    fn calendar_date(&self) -> NaiveDate {
        (**self).calendar_date()
    }
}

/// Inclusive date range `[start, end]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateInterval {
    /// Returns `None` when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn contains(&self, date: impl AsCalendarDate) -> bool {
        is_within(date, self)
    }

    pub fn overlaps(&self, other: &DateInterval) -> bool {
        overlaps(self, other)
    }

    /// Number of days covered, counting both ends.
    pub fn len_days(&self) -> i64 {
        days_between(self.start, self.end) + 1
    }
}

/// Signed day count from `a` to `b`; negative when `b` is earlier.
pub fn days_between(a: impl AsCalendarDate, b: impl AsCalendarDate) -> i64 {
    b.calendar_date()
        .signed_duration_since(a.calendar_date())
        .num_days()
}

/// Inclusive containment: `interval.start <= date <= interval.end`.
pub fn is_within(date: impl AsCalendarDate, interval: &DateInterval) -> bool {
    let date = date.calendar_date();
    interval.start <= date && date <= interval.end
}

/// Inclusive overlap of two intervals (sharing a single day counts).
pub fn overlaps(a: &DateInterval, b: &DateInterval) -> bool {
    a.start <= b.end && b.start <= a.end
}

pub fn is_same_day(a: impl AsCalendarDate, b: impl AsCalendarDate) -> bool {
    a.calendar_date() == b.calendar_date()
}

/// Shift a date by `n` days, rolling over month and year boundaries.
///
/// Saturates at the edges of the representable range instead of panicking.
pub fn add_days(date: impl AsCalendarDate, n: i64) -> NaiveDate {
    let date = date.calendar_date();
    let step = Days::new(n.unsigned_abs());
    if n >= 0 {
        date.checked_add_days(step).unwrap_or(NaiveDate::MAX)
    } else {
        date.checked_sub_days(step).unwrap_or(NaiveDate::MIN)
    }
}

/// Format as ISO `YYYY-MM-DD`.
pub fn format_date(date: impl AsCalendarDate) -> String {
    date.calendar_date().format(DATE_FORMAT).to_string()
}

/// Parse an ISO calendar date.
///
/// Accepts a bare `YYYY-MM-DD` as well as full timestamps such as
/// `2024-01-03T22:15:00Z`; the time part is discarded without any timezone
/// conversion.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    let date_part = trimmed
        .split_once(['T', ' '])
        .map_or(trimmed, |(date, _)| date);

    NaiveDate::parse_from_str(date_part, DATE_FORMAT)
        .map_err(|e| Error::InvalidDate(format!("{:?}: {}", input, e)))
}

pub fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(Error::InvalidMonth { year, month })
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32> {
    let first = first_of_month(year, month)?;
    let next = if month == 12 {
        first_of_month(year + 1, 1)?
    } else {
        first_of_month(year, month + 1)?
    };
    Ok(days_between(first, next) as u32)
}

/// `(year, month)` of the given date.
pub fn year_month(date: impl AsCalendarDate) -> (i32, u32) {
    let date = date.calendar_date();
    (date.year(), date.month())
}
