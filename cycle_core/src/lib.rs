#![forbid(unsafe_code)]

//! Core domain model and prediction engine for the ctrack cycle tracker.
//!
//! This crate provides:
//! - Domain types (cycle records, history, predictions, calendar cells)
//! - Calendar-date interval utilities
//! - Phase classification and next-period prediction
//! - Month grid generation for calendar views
//! - The cycle recorder (validated, pure state transitions)
//! - Persistence (repository contract, JSONL store, CSV export)
//!
//! Engine functions are pure: "today" is always passed in and configuration
//! arrives as an [`EngineConfig`] value.

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod interval;
pub mod phase;
pub mod prediction;
pub mod calendar;
pub mod recorder;
pub mod repository;
pub mod export;

// Re-export commonly used types
pub use error::{Error, RepositoryError, Result, ValidationError};
pub use types::*;
pub use config::{Config, EngineConfig};
pub use interval::{
    add_days, days_between, format_date, is_same_day, is_within, parse_date, AsCalendarDate,
    DateInterval,
};
pub use phase::{classify, classify_cycle};
pub use prediction::{cycle_stats, predict};
pub use calendar::{build_month, day_status, find_cycle_for_date, MonthRef};
pub use recorder::{record, record_entry, widen_end_date, CycleDraft};
pub use repository::{CycleRepository, InMemoryRepository, JsonlRepository};
pub use export::export_csv;
