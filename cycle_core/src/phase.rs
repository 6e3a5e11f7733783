//! Phase classification for "today".
//!
//! Thresholds count days since the start of the most recent period
//! (`cycle_day - 1`). Lower bounds are closed and upper bounds open:
//!
//! | days since start | phase       |
//! |------------------|-------------|
//! | `< 5`            | Menstrual   |
//! | `5..14`          | Follicular  |
//! | `14..17`         | Ovulatory   |
//! | `>= 17`          | Luteal      |

use crate::interval::{self, AsCalendarDate};
use crate::types::most_recent;
use crate::{CyclePhase, CycleRecord, Error, PhaseReading, Result};

const FOLLICULAR_FROM: i64 = 5;
const OVULATORY_FROM: i64 = 14;
const LUTEAL_FROM: i64 = 17;

/// Map a zero-based day offset to its phase.
pub fn phase_for_days_since_start(days_since_start: i64) -> CyclePhase {
    if days_since_start < FOLLICULAR_FROM {
        CyclePhase::Menstrual
    } else if days_since_start < OVULATORY_FROM {
        CyclePhase::Follicular
    } else if days_since_start < LUTEAL_FROM {
        CyclePhase::Ovulatory
    } else {
        CyclePhase::Luteal
    }
}

/// Classify `today` against a known most recent cycle.
///
/// `cycle_day` is a raw count; a late period simply keeps counting past the
/// usual cycle length.
pub fn classify_cycle(today: impl AsCalendarDate, most_recent: &CycleRecord) -> PhaseReading {
    let days_since_start = interval::days_between(most_recent.start_date, today);

    PhaseReading {
        phase: phase_for_days_since_start(days_since_start),
        cycle_day: days_since_start + 1,
    }
}

/// Classify `today` against a history, choosing the most recent cycle.
///
/// Returns [`Error::NoHistory`] only when nothing has been recorded. A most
/// recent cycle that starts after `today` yields a non-positive `cycle_day`
/// and classifies as Menstrual.
pub fn classify(today: impl AsCalendarDate, cycles: &[CycleRecord]) -> Result<PhaseReading> {
    let today = today.calendar_date();
    let most_recent = most_recent(cycles).ok_or(Error::NoHistory)?;

    if most_recent.start_date > today {
        tracing::warn!(
            "Most recent cycle starts {} which is after {}",
            most_recent.start_date,
            interval::format_date(today)
        );
    }

    let reading = classify_cycle(today, most_recent);
    tracing::debug!(
        "Cycle day {} ({:?}) from period starting {}",
        reading.cycle_day,
        reading.phase,
        most_recent.start_date
    );
    Ok(reading)
}
