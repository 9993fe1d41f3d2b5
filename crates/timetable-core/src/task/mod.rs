//! Work items: hour quotas with a deadline and a strictness flag.
//!
//! Durations are carried internally in whole minutes. Hours coming from
//! requests are converted once with [`hours_to_minutes`].

pub mod split;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::schedule::timefmt;

pub use split::{split_hours, split_minutes};

/// Largest hour quota a single work item may carry.
pub const MAX_REQUIRED_HOURS: f64 = 10_000.0;

/// Whether a work item may finish after its deadline.
///
/// - `Strict`: every session ends at or before the deadline.
/// - `Flexible`: sessions may end up to the configured grace window late.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    #[serde(alias = "Strict", alias = "yes", alias = "Yes")]
    Strict,
    #[serde(alias = "Flexible", alias = "no", alias = "No")]
    Flexible,
}

impl Default for Strictness {
    fn default() -> Self {
        Strictness::Flexible
    }
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strictness::Strict => write!(f, "strict"),
            Strictness::Flexible => write!(f, "flexible"),
        }
    }
}

impl FromStr for Strictness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" | "yes" | "true" => Ok(Strictness::Strict),
            "flexible" | "no" | "false" => Ok(Strictness::Flexible),
            other => Err(format!("unknown strictness '{other}'")),
        }
    }
}

/// Per-item override of the configured session length bounds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SessionBounds {
    pub min_hours: f64,
    pub max_hours: f64,
}

impl SessionBounds {
    pub fn new(min_hours: f64, max_hours: f64) -> Self {
        Self {
            min_hours,
            max_hours,
        }
    }

    pub fn min_minutes(&self) -> i64 {
        hours_to_minutes(self.min_hours)
    }

    pub fn max_minutes(&self) -> i64 {
        hours_to_minutes(self.max_hours)
    }
}

/// A task with a required hour quota and a deadline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkItem {
    /// Unique identifier
    pub id: String,
    /// When the work is due
    #[serde(with = "timefmt::serde_ts")]
    pub deadline: NaiveDateTime,
    #[serde(default)]
    pub strictness: Strictness,
    /// Hours of work required, strictly positive
    pub required_hours: f64,
    /// Overrides the configured session bounds for this item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_bounds: Option<SessionBounds>,
}

impl WorkItem {
    pub fn new(
        id: impl Into<String>,
        deadline: NaiveDateTime,
        strictness: Strictness,
        required_hours: f64,
    ) -> Self {
        Self {
            id: id.into(),
            deadline,
            strictness,
            required_hours,
            session_bounds: None,
        }
    }

    pub fn with_session_bounds(mut self, bounds: SessionBounds) -> Self {
        self.session_bounds = Some(bounds);
        self
    }

    pub fn required_minutes(&self) -> i64 {
        hours_to_minutes(self.required_hours)
    }

    /// Whether the quota is positive, finite and at most [`MAX_REQUIRED_HOURS`].
    pub fn has_valid_hours(&self) -> bool {
        valid_required_hours(self.required_hours)
    }

    /// Latest time a session of this item may stop.
    pub fn effective_deadline(&self, grace: Duration) -> NaiveDateTime {
        match self.strictness {
            Strictness::Strict => self.deadline,
            Strictness::Flexible => self
                .deadline
                .checked_add_signed(grace)
                .unwrap_or(NaiveDateTime::MAX),
        }
    }
}

pub fn valid_required_hours(hours: f64) -> bool {
    hours > 0.0 && hours <= MAX_REQUIRED_HOURS
}

/// Convert hours to whole minutes, rounding to the nearest minute.
pub fn hours_to_minutes(hours: f64) -> i64 {
    (hours * 60.0).round() as i64
}

pub fn minutes_to_hours(minutes: i64) -> f64 {
    minutes as f64 / 60.0
}
