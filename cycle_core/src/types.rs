//! Core domain types for the cycle tracker.
//!
//! This module defines the values the engine passes around:
//! - Recorded cycles and the history snapshot that owns them
//! - Derived predictions and phases
//! - Calendar cells produced for rendering

use crate::interval::{self, DateInterval};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Recorded Cycles
// ============================================================================

/// Menstrual flow intensity
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Light,
    #[default]
    Medium,
    Heavy,
    Spotting,
}

impl Flow {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flow::Light => "light",
            Flow::Medium => "medium",
            Flow::Heavy => "heavy",
            Flow::Spotting => "spotting",
        }
    }
}

impl std::str::FromStr for Flow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Flow::Light),
            "medium" => Ok(Flow::Medium),
            "heavy" => Ok(Flow::Heavy),
            "spotting" => Ok(Flow::Spotting),
            other => Err(format!(
                "unknown flow {:?} (expected light, medium, heavy or spotting)",
                other
            )),
        }
    }
}

/// One recorded period, both dates inclusive.
///
/// Serialized in the camelCase shape used by the tracker's HTTP API.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CycleRecord {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub flow: Flow,
    #[serde(default)]
    pub symptoms: BTreeSet<String>,
}

impl CycleRecord {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, flow: Flow) -> Self {
        Self {
            start_date,
            end_date,
            flow,
            symptoms: BTreeSet::new(),
        }
    }

    pub fn with_symptoms<I, S>(mut self, symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symptoms.extend(symptoms.into_iter().map(Into::into));
        self
    }

    /// The bleeding interval. Malformed records (end before start) collapse
    /// to their start day so lookups stay total.
    pub fn interval(&self) -> DateInterval {
        DateInterval::new(self.start_date, self.end_date).unwrap_or(DateInterval {
            start: self.start_date,
            end: self.start_date,
        })
    }

    /// Inclusive number of period days.
    pub fn period_days(&self) -> i64 {
        self.interval().len_days()
    }
}

/// Pick the most recent record: latest start date, ties broken by latest end.
pub fn most_recent(cycles: &[CycleRecord]) -> Option<&CycleRecord> {
    cycles
        .iter()
        .max_by_key(|c| (c.start_date, c.end_date))
}

/// References to the records sorted by start date, oldest first.
pub fn sorted_by_start(cycles: &[CycleRecord]) -> Vec<&CycleRecord> {
    let mut sorted: Vec<&CycleRecord> = cycles.iter().collect();
    sorted.sort_by_key(|c| (c.start_date, c.end_date));
    sorted
}

// ============================================================================
// Derived State
// ============================================================================

/// Predicted next period and fertile window.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Predictions {
    pub next_period_start: NaiveDate,
    pub fertile_window: DateInterval,
}

impl Predictions {
    /// Days from `today` until the predicted start; negative when overdue.
    pub fn days_until_next_period(&self, today: NaiveDate) -> i64 {
        interval::days_between(today, self.next_period_start)
    }
}

/// A user's recorded cycles plus the predictions derived from them.
///
/// Owned by the caller; engine functions take it by reference and hand back
/// new values instead of mutating.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CycleHistory {
    pub cycles: Vec<CycleRecord>,
    /// `None` only while `cycles` is empty.
    pub predictions: Option<Predictions>,
}

impl CycleHistory {
    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }

    pub fn most_recent(&self) -> Option<&CycleRecord> {
        most_recent(&self.cycles)
    }
}

/// Physiological phase of the cycle. Derived, never persisted.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulatory,
    Luteal,
}

impl CyclePhase {
    pub fn name(&self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "Menstrual Phase",
            CyclePhase::Follicular => "Follicular Phase",
            CyclePhase::Ovulatory => "Ovulatory Phase",
            CyclePhase::Luteal => "Luteal Phase",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CyclePhase::Menstrual => "Day 1-5: the uterine lining sheds",
            CyclePhase::Follicular => "Day 6-14: follicles develop and the lining rebuilds",
            CyclePhase::Ovulatory => "Day 15-17: an egg is released from the ovary",
            CyclePhase::Luteal => "Day 18 onward: post-ovulation until the next period",
        }
    }
}

/// Result of classifying a day against the most recent cycle.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseReading {
    pub phase: CyclePhase,
    /// 1-based; day 1 is the first day of the most recent period. Not capped.
    pub cycle_day: i64,
}

// ============================================================================
// Calendar Output
// ============================================================================

/// Independent flags describing one date. Several may be set at once.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct DayStatus {
    pub is_period: bool,
    pub is_fertile: bool,
    pub is_predicted_period: bool,
    pub is_today: bool,
}

/// One cell of a month grid.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCell {
    pub date: NaiveDate,
    pub is_current_month: bool,
    pub is_period: bool,
    pub is_fertile: bool,
    pub is_predicted_period: bool,
    pub is_today: bool,
}

impl CalendarCell {
    pub fn new(date: NaiveDate, is_current_month: bool, status: DayStatus) -> Self {
        Self {
            date,
            is_current_month,
            is_period: status.is_period,
            is_fertile: status.is_fertile,
            is_predicted_period: status.is_predicted_period,
            is_today: status.is_today,
        }
    }

    pub fn status(&self) -> DayStatus {
        DayStatus {
            is_period: self.is_period,
            is_fertile: self.is_fertile,
            is_predicted_period: self.is_predicted_period,
            is_today: self.is_today,
        }
    }
}

/// Summary figures for a history.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleStats {
    pub total_cycles: usize,
    pub average_cycle_length: f64,
    pub average_period_length: f64,
    pub shortest_cycle: Option<i64>,
    pub longest_cycle: Option<i64>,
    pub last_period_start: Option<NaiveDate>,
    pub last_period_end: Option<NaiveDate>,
}
