//! Post-hoc validation of a produced schedule.
//!
//! Re-checks every invariant independently of the scheduler. Detects:
//! - Malformed sessions and sessions for unknown work items
//! - Sessions outside the daily window
//! - Overlaps with events or with other sessions
//! - Per-item totals that do not match the placement outcome
//! - Missed (effective) deadlines
//! - Session lengths outside the configured bounds
//! - Daily cap overruns that were not reported as soft violations
//!
//! Findings are data: validation never fails.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::schedule::{Event, Schedule, Session};
use crate::scheduler::SchedulerConfig;
use crate::task::WorkItem;
use crate::timeline::DayType;

/// Categories of schedule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A session stops at or before its start.
    MalformedSession,
    /// A session references a work item that was not requested.
    UnknownTask,
    /// A session is not inside the daily window of a single date.
    OutsideWindow,
    /// A session overlaps an event.
    EventOverlap,
    /// Two sessions overlap.
    SessionOverlap,
    /// A placed item's sessions do not sum to its required time.
    HoursMismatch,
    /// An unschedulable item still holds sessions.
    UnschedulableHasSessions,
    /// A session stops after the item's effective deadline.
    DeadlineMissed,
    /// A session is longer than the maximum session length.
    SessionTooLong,
    /// A session is shorter than the minimum session length.
    SessionTooShort,
    /// A day's total exceeds its cap without a recorded soft violation.
    CapExceeded,
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, task_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            kind,
            task_id: task_id.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Validation outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            ok: violations.is_empty(),
            violations,
        }
    }

    pub fn count(&self, kind: ViolationKind) -> usize {
        self.violations.iter().filter(|v| v.kind == kind).count()
    }

    pub fn has(&self, kind: ViolationKind) -> bool {
        self.count(kind) > 0
    }
}

/// Schedule checker for one scheduler configuration.
pub struct Validator<'a> {
    config: &'a SchedulerConfig,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a SchedulerConfig) -> Self {
        Self { config }
    }

    /// Check `schedule` against the events and work items it was built from.
    pub fn validate(
        &self,
        schedule: &Schedule,
        events: &[Event],
        work_items: &[WorkItem],
    ) -> ValidationReport {
        let mut violations = Vec::new();
        let items: HashMap<&str, &WorkItem> =
            work_items.iter().map(|w| (w.id.as_str(), w)).collect();

        for session in &schedule.sessions {
            self.check_session(session, events, &items, &mut violations);
        }
        check_session_overlaps(&schedule.sessions, &mut violations);
        self.check_totals(schedule, work_items, &mut violations);
        self.check_caps(schedule, &mut violations);

        ValidationReport::from_violations(violations)
    }

    fn check_session(
        &self,
        session: &Session,
        events: &[Event],
        items: &HashMap<&str, &WorkItem>,
        out: &mut Vec<Violation>,
    ) {
        let id = Some(session.task_id.as_str());

        if session.start >= session.stop {
            out.push(Violation::new(
                ViolationKind::MalformedSession,
                id,
                format!("session '{session}' does not stop after it starts"),
            ));
            return;
        }

        if !self.config.window.contains(session.start, session.stop) {
            out.push(Violation::new(
                ViolationKind::OutsideWindow,
                id,
                format!("session '{session}' is outside the {} window", self.config.window),
            ));
        }

        for event in events.iter().filter(|e| e.overlaps(session.start, session.stop)) {
            out.push(Violation::new(
                ViolationKind::EventOverlap,
                id,
                format!("session '{session}' overlaps event '{}'", event.id),
            ));
        }

        let Some(item) = items.get(session.task_id.as_str()) else {
            out.push(Violation::new(
                ViolationKind::UnknownTask,
                id,
                format!("session '{session}' references an unknown work item"),
            ));
            return;
        };

        let deadline = item.effective_deadline(self.config.grace);
        if session.stop > deadline {
            out.push(Violation::new(
                ViolationKind::DeadlineMissed,
                id,
                format!(
                    "session '{session}' stops after the {} deadline {deadline}",
                    item.strictness
                ),
            ));
        }

        let (min, max) = self.config.session_bounds_for(item);
        let minutes = session.duration_minutes();
        if minutes > max {
            out.push(Violation::new(
                ViolationKind::SessionTooLong,
                id,
                format!("session '{session}' lasts {minutes} minutes, maximum is {max}"),
            ));
        }
        // a short lone session is fine when the whole item is shorter than min
        if minutes < min && item.required_minutes() >= min {
            out.push(Violation::new(
                ViolationKind::SessionTooShort,
                id,
                format!("session '{session}' lasts {minutes} minutes, minimum is {min}"),
            ));
        }
    }

    fn check_totals(&self, schedule: &Schedule, work_items: &[WorkItem], out: &mut Vec<Violation>) {
        let unschedulable: HashSet<&str> = schedule.unschedulable_ids().into_iter().collect();

        for item in work_items {
            let id = item.id.as_str();
            let placed = schedule.minutes_for(id);

            if unschedulable.contains(id) {
                if placed > 0 {
                    out.push(Violation::new(
                        ViolationKind::UnschedulableHasSessions,
                        Some(id),
                        format!("unschedulable item '{id}' still holds {placed} minutes"),
                    ));
                }
                continue;
            }

            let required = item.required_minutes();
            if placed != required {
                out.push(Violation::new(
                    ViolationKind::HoursMismatch,
                    Some(id),
                    format!("item '{id}' has {placed} of {required} required minutes"),
                ));
            }
        }
    }

    fn check_caps(&self, schedule: &Schedule, out: &mut Vec<Violation>) {
        let mut totals: BTreeMap<NaiveDate, i64> = BTreeMap::new();
        for session in schedule.sessions.iter().filter(|s| s.start < s.stop) {
            *totals.entry(session.date()).or_insert(0) += session.duration_minutes();
        }

        let flagged: HashSet<NaiveDate> = schedule.soft_violations.iter().map(|v| v.date).collect();

        for (date, total) in totals {
            let day_type = DayType::of(date);
            let cap = self.config.caps.cap_for(day_type);
            if total > cap && !flagged.contains(&date) {
                out.push(Violation::new(
                    ViolationKind::CapExceeded,
                    None,
                    format!("{date} has {total} minutes scheduled, {day_type} cap is {cap}"),
                ));
            }
        }
    }
}

/// Sweep sessions in start order; each must begin at or after the latest stop
/// seen so far.
fn check_session_overlaps(sessions: &[Session], out: &mut Vec<Violation>) {
    let mut ordered: Vec<&Session> = sessions.iter().filter(|s| s.start < s.stop).collect();
    ordered.sort_by_key(|s| (s.start, s.stop));

    let mut latest: Option<&Session> = None;
    for session in ordered {
        if let Some(prev) = latest {
            if session.start < prev.stop {
                out.push(Violation::new(
                    ViolationKind::SessionOverlap,
                    Some(session.task_id.as_str()),
                    format!("session '{session}' overlaps session '{prev}'"),
                ));
            }
            if session.stop <= prev.stop {
                continue;
            }
        }
        latest = Some(session);
    }
}
