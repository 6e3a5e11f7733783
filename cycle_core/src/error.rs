//! Error types for the cycle_core library.

use chrono::NaiveDate;
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cycle_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A date string could not be parsed as a calendar date
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Requested calendar month does not exist
    #[error("Invalid month {month} for year {year}")]
    InvalidMonth { year: i32, month: u32 },

    /// Classification or prediction requested with zero recorded cycles
    #[error("Insufficient data: no cycles have been recorded")]
    NoHistory,

    /// A new or amended cycle was rejected
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Failure reported by the persistence collaborator, passed through as-is
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Reasons the recorder refuses a cycle entry.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("start date is required")]
    MissingStartDate,

    #[error("start date {start} is after today ({today})")]
    StartInFuture { start: NaiveDate, today: NaiveDate },

    #[error("end date {end} is before start date {start}")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("no recorded cycle starts on {0}")]
    UnknownCycle(NaiveDate),

    #[error("a cycle starting on {0} is already recorded")]
    DuplicateStart(NaiveDate),

    #[error("end date {requested} would shorten the cycle ending {current}")]
    EndDateNarrowed {
        current: NaiveDate,
        requested: NaiveDate,
    },
}

impl ValidationError {
    /// Name of the draft field that failed, in wire (camelCase) form.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingStartDate
            | ValidationError::StartInFuture { .. }
            | ValidationError::UnknownCycle(_)
            | ValidationError::DuplicateStart(_) => "startDate",
            ValidationError::EndBeforeStart { .. } | ValidationError::EndDateNarrowed { .. } => {
                "endDate"
            }
        }
    }
}

/// Errors raised by a [`CycleRepository`](crate::repository::CycleRepository).
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("no cycle history stored for user {user_id:?}")]
    NotFound { user_id: String },

    #[error("invalid user id {0:?}: only letters, digits, '-' and '_' are allowed")]
    InvalidUserId(String),

    #[error("cycle starting {start} already ends {current}; {requested} would shorten it")]
    EndDateNarrowed {
        start: NaiveDate,
        current: NaiveDate,
        requested: NaiveDate,
    },

    #[error("storage IO failure: {0}")]
    Io(#[from] io::Error),

    #[error("storage encoding failure: {0}")]
    Json(#[from] serde_json::Error),
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }
}
