//! Month grid generation and per-day status queries.
//!
//! A month is rendered as whole weeks: leading days from the previous month,
//! every day of the requested month, then trailing days from the next month
//! until the cell count is a multiple of seven.

use crate::config::{EngineConfig, WeekStart};
use crate::interval::{self, AsCalendarDate};
use crate::{CalendarCell, CycleHistory, CycleRecord, DayStatus, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

const DAYS_PER_WEEK: usize = 7;

/// A calendar month, used for navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthRef {
    pub year: i32,
    pub month: u32,
}

impl MonthRef {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        interval::first_of_month(year, month)?;
        Ok(Self { year, month })
    }

    pub fn containing(date: impl AsCalendarDate) -> Self {
        let (year, month) = interval::year_month(date);
        Self { year, month }
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                month: self.month + 1,
                ..self
            }
        }
    }

    pub fn prev(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                month: self.month - 1,
                ..self
            }
        }
    }
}

impl WeekStart {
    fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }

    /// Column index (0..7) of `weekday` in a grid starting on `self`.
    pub fn column_of(self, weekday: Weekday) -> usize {
        let first = self.weekday().num_days_from_monday();
        ((weekday.num_days_from_monday() + 7 - first) % 7) as usize
    }

    /// Column headers in display order.
    pub fn headers(self) -> [&'static str; 7] {
        match self {
            WeekStart::Sunday => ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"],
            WeekStart::Monday => ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"],
        }
    }
}

/// Flags for a single date.
///
/// `today` is always supplied by the caller. Overlapping records are fine:
/// any record covering `date` marks it as a period day.
pub fn day_status(
    date: impl AsCalendarDate,
    history: &CycleHistory,
    today: impl AsCalendarDate,
) -> DayStatus {
    let date = date.calendar_date();

    let is_period = history.cycles.iter().any(|c| c.interval().contains(date));
    let (is_fertile, is_predicted_period) = match &history.predictions {
        Some(p) => (
            p.fertile_window.contains(date),
            interval::is_same_day(date, p.next_period_start),
        ),
        None => (false, false),
    };

    DayStatus {
        is_period,
        is_fertile,
        is_predicted_period,
        is_today: interval::is_same_day(date, today),
    }
}

/// Build the padded grid for `month` of `year` (1-based month).
///
/// The result length is always a multiple of seven and the dates are
/// contiguous. `history` is only read.
pub fn build_month(
    year: i32,
    month: u32,
    history: &CycleHistory,
    today: impl AsCalendarDate,
    config: &EngineConfig,
) -> Result<Vec<CalendarCell>> {
    let today = today.calendar_date();
    let first = interval::first_of_month(year, month)?;
    let day_count = interval::days_in_month(year, month)? as usize;
    let leading = config.week_starts_on.column_of(first.weekday());
    let trailing = (DAYS_PER_WEEK - (leading + day_count) % DAYS_PER_WEEK) % DAYS_PER_WEEK;
    let total = leading + day_count + trailing;

    let grid_start = interval::add_days(first, -(leading as i64));
    let cells: Vec<CalendarCell> = (0..total)
        .map(|offset| {
            let date = interval::add_days(grid_start, offset as i64);
            let in_month = date.year() == year && date.month() == month;
            CalendarCell::new(date, in_month, day_status(date, history, today))
        })
        .collect();

    tracing::debug!(
        "Built {}-{:02} grid: {} leading, {} days, {} trailing",
        year,
        month,
        leading,
        day_count,
        trailing
    );
    Ok(cells)
}

/// The recorded cycle covering `date`, if any. Latest start wins on overlap.
pub fn find_cycle_for_date(
    date: impl AsCalendarDate,
    cycles: &[CycleRecord],
) -> Option<&CycleRecord> {
    let date = date.calendar_date();
    cycles
        .iter()
        .filter(|c| c.interval().contains(date))
        .max_by_key(|c| (c.start_date, c.end_date))
}

/// Split a grid into rows of seven cells.
pub fn weeks(cells: &[CalendarCell]) -> impl Iterator<Item = &[CalendarCell]> {
    cells.chunks(DAYS_PER_WEEK)
}

/// First date shown in the grid for a month, handy for renderers.
pub fn grid_start(year: i32, month: u32, config: &EngineConfig) -> Result<NaiveDate> {
    let first = interval::first_of_month(year, month)?;
    let leading = config.week_starts_on.column_of(first.weekday());
    Ok(interval::add_days(first, -(leading as i64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::predict_opt;
    use crate::{Error, Flow};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn january_history() -> CycleHistory {
        let cycles = vec![CycleRecord::new(date(2024, 1, 1), date(2024, 1, 5), Flow::Medium)];
        let predictions = predict_opt(&cycles, &EngineConfig::default()).unwrap();
        CycleHistory {
            cycles,
            predictions,
        }
    }

    #[test]
    fn test_january_2024_grid() {
        let history = january_history();
        let cells = build_month(2024, 1, &history, date(2024, 1, 3), &EngineConfig::default())
            .unwrap();

        // Jan 1 2024 is a Monday: one leading Sunday from December.
        assert_eq!(cells[0].date, date(2023, 12, 31));
        assert!(!cells[0].is_current_month);
        assert_eq!(cells[1].date, date(2024, 1, 1));
        assert!(cells[1].is_current_month);
        assert_eq!(cells.len(), 35);

        let jan3 = cells.iter().find(|c| c.date == date(2024, 1, 3)).unwrap();
        assert!(jan3.is_period);
        assert!(jan3.is_today);
        assert!(!jan3.is_fertile);

        let jan13 = cells.iter().find(|c| c.date == date(2024, 1, 13)).unwrap();
        assert!(jan13.is_fertile);
        let jan29 = cells.iter().find(|c| c.date == date(2024, 1, 29)).unwrap();
        assert!(jan29.is_predicted_period);
        assert!(!jan29.is_period);
    }

    #[test]
    fn test_monday_start_has_no_leading_pad() {
        let config = EngineConfig {
            week_starts_on: WeekStart::Monday,
            ..EngineConfig::default()
        };
        let cells = build_month(2024, 1, &CycleHistory::default(), date(2024, 1, 3), &config)
            .unwrap();
        assert_eq!(cells[0].date, date(2024, 1, 1));
        assert_eq!(cells.len(), 35);
        assert_eq!(cells.last().unwrap().date, date(2024, 2, 4));
    }

    #[test]
    fn test_grid_shape_for_many_months() {
        let history = january_history();
        for config in [
            EngineConfig::default(),
            EngineConfig {
                week_starts_on: WeekStart::Monday,
                ..EngineConfig::default()
            },
        ] {
            for year in [1999, 2000, 2023, 2024, 2100] {
                for month in 1..=12 {
                    let cells =
                        build_month(year, month, &history, date(2024, 1, 3), &config).unwrap();
                    assert_eq!(cells.len() % 7, 0, "{year}-{month}");
                    for pair in cells.windows(2) {
                        assert_eq!(pair[1].date, interval::add_days(pair[0].date, 1));
                    }
                    let in_month = cells.iter().filter(|c| c.is_current_month).count() as u32;
                    assert_eq!(in_month, interval::days_in_month(year, month).unwrap());
                    assert_eq!(cells[0].date, grid_start(year, month, &config).unwrap());
                }
            }
        }
    }

    #[test]
    fn test_february_2015_fits_four_weeks() {
        // Starts on a Sunday and has 28 days.
        let cells = build_month(
            2015,
            2,
            &CycleHistory::default(),
            date(2015, 2, 1),
            &EngineConfig::default(),
        )
        .unwrap();
        assert_eq!(cells.len(), 28);
        assert!(cells.iter().all(|c| c.is_current_month));
    }

    #[test]
    fn test_invalid_month_rejected() {
        let result = build_month(
            2024,
            13,
            &CycleHistory::default(),
            date(2024, 1, 1),
            &EngineConfig::default(),
        );
        assert!(matches!(result, Err(Error::InvalidMonth { month: 13, .. })));
    }

    #[test]
    fn test_day_status_is_stable() {
        let history = january_history();
        let snapshot = history.clone();
        let first = day_status(date(2024, 1, 15), &history, date(2024, 1, 3));
        let second = day_status(date(2024, 1, 15), &history, date(2024, 1, 3));
        assert_eq!(first, second);
        assert!(first.is_fertile);
        assert_eq!(history, snapshot);
    }

    #[test]
    fn test_flags_are_independent() {
        // Pathological history: a recorded period inside the fertile window.
        let mut history = january_history();
        history
            .cycles
            .push(CycleRecord::new(date(2024, 1, 14), date(2024, 1, 16), Flow::Spotting));
        let status = day_status(date(2024, 1, 15), &history, date(2024, 1, 15));
        assert!(status.is_period);
        assert!(status.is_fertile);
        assert!(status.is_today);
    }

    #[test]
    fn test_empty_history_flags_nothing() {
        let status = day_status(date(2024, 1, 3), &CycleHistory::default(), date(2024, 1, 4));
        assert_eq!(status, DayStatus::default());
    }

    #[test]
    fn test_find_cycle_for_date() {
        let cycles = vec![
            CycleRecord::new(date(2024, 1, 1), date(2024, 1, 10), Flow::Heavy),
            CycleRecord::new(date(2024, 1, 4), date(2024, 1, 6), Flow::Light),
        ];
        assert_eq!(
            find_cycle_for_date(date(2024, 1, 5), &cycles).unwrap().flow,
            Flow::Light
        );
        assert_eq!(
            find_cycle_for_date(date(2024, 1, 8), &cycles).unwrap().flow,
            Flow::Heavy
        );
        assert!(find_cycle_for_date(date(2024, 1, 11), &cycles).is_none());
    }

    #[test]
    fn test_month_navigation() {
        let december = MonthRef::new(2023, 12).unwrap();
        assert_eq!(december.next(), MonthRef { year: 2024, month: 1 });
        assert_eq!(december.next().prev(), december);
        assert_eq!(
            MonthRef::containing(date(2024, 3, 9)),
            MonthRef { year: 2024, month: 3 }
        );
        assert!(MonthRef::new(2024, 0).is_err());
    }

    #[test]
    fn test_column_of() {
        assert_eq!(WeekStart::Sunday.column_of(Weekday::Sun), 0);
        assert_eq!(WeekStart::Sunday.column_of(Weekday::Mon), 1);
        assert_eq!(WeekStart::Monday.column_of(Weekday::Sun), 6);
        assert_eq!(WeekStart::Monday.column_of(Weekday::Mon), 0);
    }

    #[test]
    fn test_weeks_chunks_rows() {
        let cells = build_month(
            2024,
            1,
            &CycleHistory::default(),
            date(2024, 1, 1),
            &EngineConfig::default(),
        )
        .unwrap();
        let rows: Vec<_> = weeks(&cells).collect();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.len() == 7));
    }
}
