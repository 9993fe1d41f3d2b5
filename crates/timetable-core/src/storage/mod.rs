mod config;
pub mod migrations;
pub mod schedule_db;

pub use config::Config;
pub use schedule_db::{CourseworkInput, CourseworkRecord, EventInput, EventRecord, ScheduleDb, StoredSchedule};

use chrono::NaiveDateTime;
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::schedule::{Schedule, ScheduleRequest};

/// Returns the data directory, creating it if needed.
///
/// `$TIMETABLE_DATA_DIR` wins when set. Otherwise `~/.config/timetable`, or
/// `~/.config/timetable-dev` with `TIMETABLE_ENV=dev`.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("TIMETABLE_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("TIMETABLE_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("timetable-dev")
            } else {
                base_dir.join("timetable")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// Source of work items and events.
pub trait TaskIntake {
    /// Record a coursework item and return its work item id.
    fn add_coursework(&mut self, input: CourseworkInput) -> Result<String>;

    /// Record a fixed event and return its id.
    fn add_event(&mut self, input: EventInput) -> Result<String>;

    /// Build a request from every open coursework item and every event.
    fn load_request(&self, now: NaiveDateTime) -> Result<ScheduleRequest>;
}

/// Sink for generated schedules.
pub trait SchedulePersistence {
    /// Store a schedule as a new run and return the run id.
    fn store_schedule(&mut self, schedule: &Schedule) -> Result<String>;

    /// The most recently stored run, if any.
    fn latest_schedule(&self) -> Result<Option<StoredSchedule>>;
}
