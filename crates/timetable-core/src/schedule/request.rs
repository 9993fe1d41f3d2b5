//! Scheduling requests: the work items and events of one scheduling call.
//!
//! Requests can be decoded from JSON, TOML or the compact
//! `work: ...; ... . event: ... .` line format.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use super::{format, timefmt, Event};
use crate::error::InputError;
use crate::task::{valid_required_hours, WorkItem, MAX_REQUIRED_HOURS};

/// Work items and events supplied to a single scheduling call.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleRequest {
    /// Start of the scheduling horizon; callers default it to the current time
    #[serde(
        default,
        with = "timefmt::serde_ts_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub now: Option<NaiveDateTime>,
    #[serde(default)]
    pub work: Vec<WorkItem>,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// Encoding of a request file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFormat {
    Json,
    Toml,
    Compact,
}

impl RequestFormat {
    /// Guess the format from a file extension, defaulting to compact text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => RequestFormat::Json,
            Some("toml") => RequestFormat::Toml,
            _ => RequestFormat::Compact,
        }
    }
}

impl FromStr for RequestFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(RequestFormat::Json),
            "toml" => Ok(RequestFormat::Toml),
            "compact" | "text" => Ok(RequestFormat::Compact),
            other => Err(format!("unknown request format '{other}'")),
        }
    }
}

impl ScheduleRequest {
    pub fn new(work: Vec<WorkItem>, events: Vec<Event>) -> Self {
        Self {
            now: None,
            work,
            events,
        }
    }

    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = Some(now);
        self
    }

    /// Decode and check a request.
    pub fn parse(input: &str, format: RequestFormat) -> Result<Self, InputError> {
        let request = match format {
            RequestFormat::Json => {
                serde_json::from_str(input).map_err(|e| InputError::Decode(e.to_string()))?
            }
            RequestFormat::Toml => {
                toml::from_str(input).map_err(|e| InputError::Decode(e.to_string()))?
            }
            RequestFormat::Compact => format::parse_compact(input)?,
        };
        request.check()?;
        Ok(request)
    }

    /// Reject duplicate ids, empty events and hour quotas that are not
    /// positive or exceed [`MAX_REQUIRED_HOURS`].
    pub fn check(&self) -> Result<(), InputError> {
        let mut seen = HashSet::new();
        for id in self
            .work
            .iter()
            .map(|w| w.id.as_str())
            .chain(self.events.iter().map(|e| e.id.as_str()))
        {
            if !seen.insert(id) {
                return Err(InputError::DuplicateId(id.to_string()));
            }
        }

        for event in &self.events {
            if event.start >= event.end {
                return Err(InputError::EmptyEvent {
                    id: event.id.clone(),
                    start: event.start,
                    end: event.end,
                });
            }
        }

        for item in &self.work {
            check_hours(&item.id, item.required_hours)?;
        }

        Ok(())
    }
}

/// Accept only positive, finite quotas up to [`MAX_REQUIRED_HOURS`].
pub(crate) fn check_hours(id: &str, hours: f64) -> Result<(), InputError> {
    if !(hours > 0.0) {
        return Err(InputError::NonPositiveHours {
            id: id.to_string(),
            hours,
        });
    }
    if !valid_required_hours(hours) {
        return Err(InputError::HoursOutOfRange {
            id: id.to_string(),
            hours,
            limit: MAX_REQUIRED_HOURS,
        });
    }
    Ok(())
}
