//! Validation and application of new cycle entries.
//!
//! The recorder is a pure state transition: it borrows the current history
//! and, on success, returns a new one with predictions recomputed. On
//! failure the caller still holds the untouched original.

use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::interval::{self, AsCalendarDate};
use crate::{CycleHistory, CycleRecord, Flow, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// An in-progress cycle entry, as typed into a form.
///
/// Every modifier consumes the draft and returns a new value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleDraft {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub flow: Flow,
    #[serde(default)]
    pub symptoms: BTreeSet<String>,
}

impl CycleDraft {
    pub fn starting(start_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            ..Self::default()
        }
    }

    pub fn with_start_date(self, start_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            ..self
        }
    }

    pub fn with_end_date(self, end_date: NaiveDate) -> Self {
        Self {
            end_date: Some(end_date),
            ..self
        }
    }

    pub fn with_flow(self, flow: Flow) -> Self {
        Self { flow, ..self }
    }

    pub fn with_symptom(mut self, symptom: impl Into<String>) -> Self {
        self.symptoms.insert(symptom.into());
        self
    }

    /// Add the symptom if absent, remove it if present.
    pub fn toggle_symptom(mut self, symptom: &str) -> Self {
        if !self.symptoms.remove(symptom) {
            self.symptoms.insert(symptom.to_string());
        }
        self
    }

    /// End date the recorder will use: explicit, or start plus the
    /// configured period length.
    pub fn effective_end_date(&self, config: &EngineConfig) -> Option<NaiveDate> {
        self.end_date.or_else(|| {
            self.start_date
                .map(|start| interval::add_days(start, config.period_length_fallback_days))
        })
    }

    /// Turn the draft into a record, checking it against `now`.
    pub fn validate(
        &self,
        now: impl AsCalendarDate,
        config: &EngineConfig,
    ) -> std::result::Result<CycleRecord, ValidationError> {
        let today = now.calendar_date();
        let start = self.start_date.ok_or(ValidationError::MissingStartDate)?;
        if start > today {
            return Err(ValidationError::StartInFuture { start, today });
        }

        let end = self
            .effective_end_date(config)
            .unwrap_or(start);
        if end < start {
            return Err(ValidationError::EndBeforeStart { start, end });
        }

        Ok(CycleRecord {
            start_date: start,
            end_date: end,
            flow: self.flow,
            symptoms: self.symptoms.clone(),
        })
    }
}

/// Validate `draft` and return `history` extended by it, with fresh
/// predictions.
///
/// Overlap with an existing record is tolerated (and logged); the engine's
/// lookups resolve overlaps deterministically. A second record on an
/// already recorded start date is refused: stored records only change by
/// [`widen_end_date`].
pub fn record(
    history: &CycleHistory,
    draft: &CycleDraft,
    now: impl AsCalendarDate,
    config: &EngineConfig,
) -> Result<CycleHistory> {
    record_entry(history, draft, now, config).map(|(updated, _)| updated)
}

/// Like [`record`], also returning the record that was added.
pub fn record_entry(
    history: &CycleHistory,
    draft: &CycleDraft,
    now: impl AsCalendarDate,
    config: &EngineConfig,
) -> Result<(CycleHistory, CycleRecord)> {
    let record = match validate_against(history, draft, now, config) {
        Ok(record) => record,
        Err(e) => {
            tracing::info!("Rejected cycle entry ({}): {}", e.field(), e);
            return Err(e.into());
        }
    };

    let interval = record.interval();
    if let Some(existing) = history
        .cycles
        .iter()
        .find(|c| c.interval().overlaps(&interval))
    {
        tracing::warn!(
            "New cycle {}..{} overlaps recorded cycle {}..{}",
            record.start_date,
            record.end_date,
            existing.start_date,
            existing.end_date
        );
    }

    let mut cycles = history.cycles.clone();
    cycles.push(record.clone());
    let updated = CycleHistory::from_cycles(cycles, config)?;

    tracing::info!(
        "Recorded cycle {}..{} ({})",
        record.start_date,
        record.end_date,
        record.flow.as_str()
    );
    Ok((updated, record))
}

fn validate_against(
    history: &CycleHistory,
    draft: &CycleDraft,
    now: impl AsCalendarDate,
    config: &EngineConfig,
) -> std::result::Result<CycleRecord, ValidationError> {
    let record = draft.validate(now, config)?;
    if history
        .cycles
        .iter()
        .any(|c| c.start_date == record.start_date)
    {
        return Err(ValidationError::DuplicateStart(record.start_date));
    }
    Ok(record)
}

/// Extend the end date of the cycle starting on `start_date`.
///
/// Only widening is allowed; the returned history carries recomputed
/// predictions.
pub fn widen_end_date(
    history: &CycleHistory,
    start_date: NaiveDate,
    new_end: NaiveDate,
    config: &EngineConfig,
) -> Result<CycleHistory> {
    let index = history
        .cycles
        .iter()
        .enumerate()
        .filter(|(_, c)| c.start_date == start_date)
        .max_by_key(|(_, c)| c.end_date)
        .map(|(i, _)| i)
        .ok_or(ValidationError::UnknownCycle(start_date))?;

    let current = history.cycles[index].end_date;
    if new_end < current {
        return Err(ValidationError::EndDateNarrowed {
            current,
            requested: new_end,
        }
        .into());
    }

    let mut cycles = history.cycles.clone();
    cycles[index].end_date = new_end;
    let updated = CycleHistory::from_cycles(cycles, config)?;

    tracing::info!(
        "Widened cycle starting {} to end {} (was {})",
        start_date,
        new_end,
        current
    );
    Ok(updated)
}
