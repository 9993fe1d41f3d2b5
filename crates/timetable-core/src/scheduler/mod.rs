//! Greedy deadline-ordered scheduler for work sessions.
//!
//! This module places work items into the free slots of an
//! [`AvailabilityIndex`]:
//! - Orders items by effective deadline, larger quotas first on ties
//! - Splits each item into sessions and places each at the earliest free run
//! - Keeps per-day totals under the weekday/weekend caps when possible
//! - Exceeds a cap only to keep a deadline, recording a soft violation
//! - Marks items it cannot finish as unschedulable and carries on
//!
//! Placement is greedy and never backtracks across items: every placed
//! session is committed to the index immediately, so item order matters.

mod planner;

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, error, info, warn};

use crate::schedule::{
    ItemOutcome, PlacementState, Schedule, Session, SoftViolation, Unschedulable,
    UnschedulableReason,
};
use crate::task::{split_minutes, WorkItem};
use crate::timeline::{AvailabilityIndex, DailyWindow, DayType};

pub use planner::{plan, plan_relaxed, PlanOutcome, RelaxationPolicy};

/// Furthest a planning horizon reaches past `now`, in days.
pub const MAX_HORIZON_DAYS: i64 = 7305;

/// Daily work caps, in minutes, per day type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCaps {
    pub weekday_minutes: i64,
    pub weekend_minutes: i64,
}

impl DailyCaps {
    pub fn new(weekday_minutes: i64, weekend_minutes: i64) -> Self {
        Self {
            weekday_minutes,
            weekend_minutes,
        }
    }

    pub fn cap_for(&self, day_type: DayType) -> i64 {
        match day_type {
            DayType::Weekday => self.weekday_minutes,
            DayType::Weekend => self.weekend_minutes,
        }
    }
}

impl Default for DailyCaps {
    fn default() -> Self {
        Self::new(3 * 60, 6 * 60)
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Allowed working window of every day
    pub window: DailyWindow,
    /// Granularity of the time grid
    pub slot_size: Duration,
    pub caps: DailyCaps,
    /// Shortest session (minutes)
    pub min_session_minutes: i64,
    /// Longest session (minutes)
    pub max_session_minutes: i64,
    /// How far past its deadline a Flexible item may run
    pub grace: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window: DailyWindow::default(),
            slot_size: Duration::minutes(30),
            caps: DailyCaps::default(),
            min_session_minutes: 2 * 60,
            max_session_minutes: 5 * 60,
            grace: Duration::days(5),
        }
    }
}

impl SchedulerConfig {
    /// Session bounds for `item`, honouring its override.
    pub fn session_bounds_for(&self, item: &WorkItem) -> (i64, i64) {
        match item.session_bounds {
            Some(bounds) => (bounds.min_minutes(), bounds.max_minutes()),
            None => (self.min_session_minutes, self.max_session_minutes),
        }
    }
}

/// Whether a placement search honours the daily caps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CapPolicy {
    Enforce,
    Ignore,
}

fn advance(state: &mut PlacementState, to: PlacementState, task_id: &str) {
    match state.transition(to) {
        Ok(next) => *state = next,
        Err(e) => error!(task_id, error = %e, "placement state machine violated"),
    }
}

/// Deterministic greedy scheduler
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a new scheduler with default config
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }

    /// Create with custom config
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Scheduling order: effective deadline ascending, then larger required
    /// time first, then id.
    pub fn order<'a>(&self, items: &'a [WorkItem]) -> Vec<&'a WorkItem> {
        let mut ordered: Vec<&WorkItem> = items.iter().collect();
        ordered.sort_by(|a, b| {
            a.effective_deadline(self.config.grace)
                .cmp(&b.effective_deadline(self.config.grace))
                .then_with(|| b.required_minutes().cmp(&a.required_minutes()))
                .then_with(|| a.id.cmp(&b.id))
        });
        ordered
    }

    /// Place every work item into `index`, starting no earlier than `now`.
    ///
    /// Placed sessions are committed to `index`. Items that cannot be placed
    /// are reported in the returned schedule and hold no sessions.
    pub fn schedule(
        &self,
        work_items: &[WorkItem],
        index: &mut AvailabilityIndex,
        now: NaiveDateTime,
    ) -> Schedule {
        let mut schedule = Schedule::default();
        let mut day_totals: BTreeMap<NaiveDate, i64> = BTreeMap::new();

        for item in self.order(work_items) {
            let mut state = PlacementState::Pending;
            let required = item.required_minutes();

            let durations = match self.prepare(item, now) {
                Ok(durations) => durations,
                Err(reason) => {
                    warn!(task_id = %item.id, %reason, "work item unschedulable");
                    advance(&mut state, PlacementState::Unschedulable, &item.id);
                    schedule.unschedulable.push(Unschedulable {
                        task_id: item.id.clone(),
                        reason,
                        required_minutes: required,
                        placed_minutes: 0,
                    });
                    schedule.outcomes.push(ItemOutcome {
                        task_id: item.id.clone(),
                        state,
                        sessions: 0,
                    });
                    continue;
                }
            };

            let deadline = item.effective_deadline(self.config.grace);
            let mut placed: Vec<Session> = Vec::new();
            let mut violations: Vec<SoftViolation> = Vec::new();
            let mut placed_minutes = 0;

            for minutes in durations {
                let found = self
                    .find_start(index, &day_totals, minutes, now, deadline, CapPolicy::Enforce)
                    .map(|start| (start, false))
                    .or_else(|| {
                        self.find_start(index, &day_totals, minutes, now, deadline, CapPolicy::Ignore)
                            .map(|start| (start, true))
                    });

                let Some((start, relaxed)) = found else {
                    break;
                };

                let session = Session::new(item.id.clone(), start, start + Duration::minutes(minutes));
                index.occupy(&session);

                let date = session.date();
                let total = day_totals.entry(date).or_insert(0);
                *total += minutes;

                let day_type = DayType::of(date);
                let cap = self.config.caps.cap_for(day_type);
                if relaxed && *total > cap {
                    warn!(
                        task_id = %item.id,
                        %date,
                        cap_minutes = cap,
                        total_minutes = *total,
                        "daily cap exceeded to meet deadline"
                    );
                    violations.push(SoftViolation {
                        task_id: item.id.clone(),
                        date,
                        day_type,
                        cap_minutes: cap,
                        total_minutes: *total,
                    });
                }

                debug!(
                    task_id = %item.id,
                    start = %session.start,
                    stop = %session.stop,
                    "session placed"
                );
                placed_minutes += minutes;
                placed.push(session);

                let next = if placed_minutes == required {
                    PlacementState::FullyPlaced
                } else {
                    PlacementState::PartiallyPlaced
                };
                advance(&mut state, next, &item.id);
            }

            if state == PlacementState::FullyPlaced {
                schedule.outcomes.push(ItemOutcome {
                    task_id: item.id.clone(),
                    state,
                    sessions: placed.len(),
                });
                schedule.sessions.extend(placed);
                schedule.soft_violations.extend(violations);
                continue;
            }

            // roll back so later items can use the freed time
            for session in &placed {
                index.release(session);
                if let Some(total) = day_totals.get_mut(&session.date()) {
                    *total -= session.duration_minutes();
                }
            }
            warn!(
                task_id = %item.id,
                placed_minutes,
                required_minutes = required,
                "not enough free time before deadline"
            );
            advance(&mut state, PlacementState::Unschedulable, &item.id);
            schedule.unschedulable.push(Unschedulable {
                task_id: item.id.clone(),
                reason: UnschedulableReason::NoCapacity,
                required_minutes: required,
                placed_minutes,
            });
            schedule.outcomes.push(ItemOutcome {
                task_id: item.id.clone(),
                state,
                sessions: 0,
            });
        }

        schedule
            .sessions
            .sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.task_id.cmp(&b.task_id)));

        info!(
            items = work_items.len(),
            sessions = schedule.sessions.len(),
            unschedulable = schedule.unschedulable.len(),
            soft_violations = schedule.soft_violations.len(),
            "scheduling pass complete"
        );

        schedule
    }

    /// Session durations for `item`, or the reason it cannot be scheduled.
    fn prepare(&self, item: &WorkItem, now: NaiveDateTime) -> Result<Vec<i64>, UnschedulableReason> {
        if !item.has_valid_hours() || item.required_minutes() <= 0 {
            return Err(UnschedulableReason::InvalidHours);
        }
        if item.effective_deadline(self.config.grace) <= now {
            return Err(UnschedulableReason::DeadlinePassed);
        }
        let (min, max) = self.config.session_bounds_for(item);
        split_minutes(item.required_minutes(), min, max).map_err(|e| {
            UnschedulableReason::Unsplittable {
                message: e.to_string(),
            }
        })
    }

    /// Earliest start at or after `now` of a `minutes`-long session that
    /// stops by `deadline`.
    fn find_start(
        &self,
        index: &AvailabilityIndex,
        day_totals: &BTreeMap<NaiveDate, i64>,
        minutes: i64,
        now: NaiveDateTime,
        deadline: NaiveDateTime,
        policy: CapPolicy,
    ) -> Option<NaiveDateTime> {
        let slot_minutes = self.config.slot_size.num_minutes().max(1);
        let needed = ((minutes + slot_minutes - 1) / slot_minutes) as usize;
        let length = Duration::minutes(minutes);

        for day in index.days().skip_while(|day| *day < now.date()) {
            let (open, _) = self.config.window.on(day);
            if open + length > deadline {
                return None;
            }

            if policy == CapPolicy::Enforce {
                let used = day_totals.get(&day).copied().unwrap_or(0);
                if used + minutes > self.config.caps.cap_for(DayType::of(day)) {
                    continue;
                }
            }

            for run in index.free_ranges(day) {
                // slots already in the past are not candidates
                let past = index.slots()[run.slot_indices()]
                    .iter()
                    .take_while(|slot| slot.start() < now)
                    .count();
                if run.len - past < needed {
                    continue;
                }
                let start = index.slots()[run.first + past].start();
                if start + length > deadline {
                    return None;
                }
                return Some(start);
            }
        }

        None
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
