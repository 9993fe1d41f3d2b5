//! Core error types for timetable-core.
//!
//! Configuration and input errors are fatal to a request and surface
//! immediately. Per-item infeasibility is not an error: it is collected in the
//! [`Schedule`](crate::schedule::Schedule) as `Unschedulable` outcomes and
//! soft violations.

use std::path::PathBuf;

use chrono::{NaiveDateTime, NaiveTime};
use thiserror::Error;

use crate::schedule::PlacementState;

/// Core error type for timetable-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed daily window or slot size
    #[error("Invalid window: {0}")]
    InvalidWindow(#[from] InvalidWindowError),

    /// Malformed work item hours or session bounds
    #[error("Unsplittable work item: {0}")]
    Unsplittable(#[from] UnsplittableError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Request parsing errors
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Item placement state machine misuse
    #[error("Placement error: {0}")]
    PlacementTransition(#[from] PlacementTransitionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while building the time grid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidWindowError {
    /// The daily window is empty or inverted
    #[error("daily window start ({start}) must be before end ({end})")]
    StartNotBeforeEnd { start: NaiveTime, end: NaiveTime },

    /// The slot size is zero or negative
    #[error("slot size must be positive, got {minutes} minutes")]
    NonPositiveSlotSize { minutes: i64 },

    /// A window bound could not be parsed as HH:MM
    #[error("invalid time of day '{0}', expected HH:MM")]
    BadTimeOfDay(String),
}

/// Errors raised by the session splitter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsplittableError {
    /// Required time is negative
    #[error("required time is negative ({minutes} minutes)")]
    NegativeHours { minutes: i64 },

    /// Required time exceeds the largest accepted quota
    #[error("required time of {minutes} minutes exceeds the {limit} minute limit")]
    QuotaTooLarge { minutes: i64, limit: i64 },

    /// Session bounds are empty or inverted
    #[error("session bounds [{min}, {max}] minutes are invalid")]
    InvalidBounds { min: i64, max: i64 },

    /// No sequence of sessions within the bounds sums to the requirement
    #[error("{required} minutes cannot be split into sessions of {min}..={max} minutes")]
    NoValidPartition { required: i64, min: i64, max: i64 },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// The data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Errors raised while reading a scheduling request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// A timestamp did not match any accepted format
    #[error("invalid timestamp '{0}'")]
    BadTimestamp(String),

    /// A compact-format section or record was malformed
    #[error("record {record}: {message}")]
    Malformed { record: usize, message: String },

    /// The same id was used twice
    #[error("duplicate id '{0}'")]
    DuplicateId(String),

    /// An event ends at or before its start
    #[error("event '{id}' ends ({end}) at or before its start ({start})")]
    EmptyEvent {
        id: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// A work item requires no time
    #[error("work item '{id}' requires {hours} hours, expected a positive value")]
    NonPositiveHours { id: String, hours: f64 },

    /// A work item requires more time than any horizon could hold
    #[error("work item '{id}' requires {hours} hours, above the {limit} hour limit")]
    HoursOutOfRange { id: String, hours: f64, limit: f64 },

    /// Structured (JSON/TOML) decoding failed
    #[error("could not decode request: {0}")]
    Decode(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored row could not be decoded
    #[error("Corrupt row in '{table}': {message}")]
    CorruptRow { table: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// An item placement state machine was driven through an invalid edge.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid placement transition {from:?} -> {to:?}")]
pub struct PlacementTransitionError {
    pub from: PlacementState,
    pub to: PlacementState,
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
