//! Schedule types: fixed events, placed sessions and the per-request result.
//!
//! A [`Schedule`] is produced fresh by every scheduling call and is the sole
//! output of the core. Per-item infeasibility and relaxed daily caps are
//! recorded alongside the sessions rather than raised as errors.

pub mod format;
pub mod request;
pub mod timefmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PlacementTransitionError;
use crate::timeline::DayType;

pub use request::ScheduleRequest;

/// An immovable time block. No session may overlap it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    #[serde(with = "timefmt::serde_ts")]
    pub start: NaiveDateTime,
    #[serde(with = "timefmt::serde_ts")]
    pub end: NaiveDateTime,
}

impl Event {
    pub fn new(id: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            id: id.into(),
            start,
            end,
        }
    }

    /// Half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start < end && start < self.end
    }
}

/// A contiguous block of work time assigned to one work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub task_id: String,
    #[serde(with = "timefmt::serde_ts")]
    pub start: NaiveDateTime,
    #[serde(with = "timefmt::serde_ts")]
    pub stop: NaiveDateTime,
}

impl Session {
    pub fn new(task_id: impl Into<String>, start: NaiveDateTime, stop: NaiveDateTime) -> Self {
        Self {
            task_id: task_id.into(),
            start,
            stop,
        }
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.stop - self.start).num_minutes()
    }

    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Half-open overlap test against another session.
    pub fn overlaps(&self, other: &Session) -> bool {
        self.start < other.stop && other.start < self.stop
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}",
            self.task_id,
            timefmt::format_timestamp(&self.start),
            timefmt::format_timestamp(&self.stop)
        )
    }
}

/// Placement state of a single work item during a scheduling pass.
///
///   Pending ──> PartiallyPlaced ──> FullyPlaced
///      │               │
///      ├───────────────┴──────────> Unschedulable
///      └──> FullyPlaced (single session)
///
/// `FullyPlaced` and `Unschedulable` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlacementState {
    Pending,
    PartiallyPlaced,
    FullyPlaced,
    Unschedulable,
}

impl PlacementState {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &PlacementState) -> bool {
        match self {
            PlacementState::Pending => matches!(
                to,
                PlacementState::PartiallyPlaced
                    | PlacementState::FullyPlaced
                    | PlacementState::Unschedulable
            ),
            PlacementState::PartiallyPlaced => matches!(
                to,
                PlacementState::PartiallyPlaced
                    | PlacementState::FullyPlaced
                    | PlacementState::Unschedulable
            ),
            PlacementState::FullyPlaced | PlacementState::Unschedulable => false,
        }
    }

    /// Move to `to`, rejecting invalid edges.
    pub fn transition(self, to: PlacementState) -> Result<PlacementState, PlacementTransitionError> {
        if self.can_transition_to(&to) {
            Ok(to)
        } else {
            Err(PlacementTransitionError { from: self, to })
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PlacementState::FullyPlaced | PlacementState::Unschedulable
        )
    }
}

impl Default for PlacementState {
    fn default() -> Self {
        PlacementState::Pending
    }
}

/// Why a work item could not be placed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnschedulableReason {
    /// The effective deadline is not after the scheduling start
    DeadlinePassed,
    /// The required hours are zero, negative or not a number
    InvalidHours,
    /// The session splitter rejected the item
    Unsplittable { message: String },
    /// No free run before the effective deadline, even ignoring daily caps
    NoCapacity,
}

impl fmt::Display for UnschedulableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnschedulableReason::DeadlinePassed => write!(f, "deadline has passed"),
            UnschedulableReason::InvalidHours => write!(f, "required hours must be positive"),
            UnschedulableReason::Unsplittable { message } => write!(f, "{message}"),
            UnschedulableReason::NoCapacity => {
                write!(f, "not enough free time before the deadline")
            }
        }
    }
}

/// A work item the scheduler gave up on. It has no sessions in the schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unschedulable {
    pub task_id: String,
    pub reason: UnschedulableReason,
    pub required_minutes: i64,
    /// Minutes that had been placed before the item was rolled back
    pub placed_minutes: i64,
}

/// A daily cap knowingly exceeded to keep a deadline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SoftViolation {
    pub task_id: String,
    pub date: NaiveDate,
    pub day_type: DayType,
    pub cap_minutes: i64,
    /// Work scheduled on `date` after the offending session was placed
    pub total_minutes: i64,
}

impl fmt::Display for SoftViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} cap of {}h exceeded ({}h scheduled)",
            self.task_id,
            self.date,
            self.day_type,
            self.cap_minutes as f64 / 60.0,
            self.total_minutes as f64 / 60.0
        )
    }
}

/// Final placement state of one work item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ItemOutcome {
    pub task_id: String,
    pub state: PlacementState,
    pub sessions: usize,
}

/// The result of one scheduling pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    /// Sessions ordered by start time
    pub sessions: Vec<Session>,
    /// Per-item final states, in scheduling order
    #[serde(default)]
    pub outcomes: Vec<ItemOutcome>,
    #[serde(default)]
    pub unschedulable: Vec<Unschedulable>,
    #[serde(default)]
    pub soft_violations: Vec<SoftViolation>,
}

impl Schedule {
    pub fn sessions_for<'a>(&'a self, task_id: &'a str) -> impl Iterator<Item = &'a Session> + 'a {
        self.sessions.iter().filter(move |s| s.task_id == task_id)
    }

    /// Total scheduled minutes for one work item.
    pub fn minutes_for(&self, task_id: &str) -> i64 {
        self.sessions_for(task_id).map(Session::duration_minutes).sum()
    }

    pub fn state_of(&self, task_id: &str) -> Option<PlacementState> {
        self.outcomes
            .iter()
            .find(|o| o.task_id == task_id)
            .map(|o| o.state)
    }

    pub fn is_unschedulable(&self, task_id: &str) -> bool {
        self.unschedulable.iter().any(|u| u.task_id == task_id)
    }

    pub fn unschedulable_ids(&self) -> Vec<&str> {
        self.unschedulable.iter().map(|u| u.task_id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 20)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn back_to_back_sessions_do_not_overlap() {
        let a = Session::new("w1", ts(12, 0), ts(14, 0));
        let b = Session::new("w2", ts(14, 0), ts(16, 0));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert!(a.overlaps(&Session::new("w3", ts(13, 59), ts(15, 0))));
    }

    #[test]
    fn event_overlap_is_half_open() {
        let e = Event::new("e1", ts(12, 0), ts(14, 0));
        assert!(!e.overlaps(ts(14, 0), ts(15, 0)));
        assert!(!e.overlaps(ts(11, 0), ts(12, 0)));
        assert!(e.overlaps(ts(13, 0), ts(13, 30)));
    }

    #[test]
    fn session_renders_as_output_line() {
        let s = Session::new("w1", ts(12, 0), ts(17, 0));
        assert_eq!(s.to_string(), "w1, 2025-10-20 12:00, 2025-10-20 17:00");
    }

    #[test]
    fn placement_transitions() {
        use PlacementState::*;
        assert_eq!(Pending.transition(PartiallyPlaced), Ok(PartiallyPlaced));
        assert_eq!(PartiallyPlaced.transition(FullyPlaced), Ok(FullyPlaced));
        assert_eq!(Pending.transition(Unschedulable), Ok(Unschedulable));
        assert!(FullyPlaced.transition(PartiallyPlaced).is_err());
        assert!(Unschedulable.transition(FullyPlaced).is_err());
        assert!(PartiallyPlaced.transition(Pending).is_err());
        assert!(FullyPlaced.is_terminal());
        assert!(!Pending.is_terminal());
    }

    #[test]
    fn rejected_transition_converts_to_core_error() {
        fn finish(state: PlacementState) -> crate::error::Result<PlacementState> {
            Ok(state.transition(PlacementState::FullyPlaced)?)
        }
        assert!(finish(PlacementState::PartiallyPlaced).is_ok());
        let err = finish(PlacementState::Unschedulable).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::PlacementTransition(_)));
        assert!(err.to_string().contains("Unschedulable -> FullyPlaced"));
    }

    #[test]
    fn schedule_serialization() {
        let schedule = Schedule {
            sessions: vec![Session::new("w1", ts(12, 0), ts(14, 0))],
            outcomes: vec![ItemOutcome {
                task_id: "w1".to_string(),
                state: PlacementState::FullyPlaced,
                sessions: 1,
            }],
            unschedulable: vec![Unschedulable {
                task_id: "w9".to_string(),
                reason: UnschedulableReason::DeadlinePassed,
                required_minutes: 60,
                placed_minutes: 0,
            }],
            soft_violations: Vec::new(),
        };

        let json = serde_json::to_string(&schedule).unwrap();
        assert!(json.contains("\"start\":\"2025-10-20 12:00\""));
        assert!(json.contains("\"kind\":\"deadline_passed\""));
        let decoded: Schedule = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, schedule);
        assert_eq!(decoded.minutes_for("w1"), 120);
        assert_eq!(decoded.state_of("w1"), Some(PlacementState::FullyPlaced));
        assert_eq!(decoded.unschedulable_ids(), vec!["w9"]);
    }
}
