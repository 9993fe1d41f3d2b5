//! One-call planning over a [`ScheduleRequest`].

use chrono::{Duration, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Scheduler, SchedulerConfig, MAX_HORIZON_DAYS};
use crate::error::Result;
use crate::schedule::{Schedule, ScheduleRequest};
use crate::task::Strictness;
use crate::timeline::{build_grid, AvailabilityIndex};
use crate::validation::{ValidationReport, Validator};

/// Result of planning one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub schedule: Schedule,
    pub report: ValidationReport,
    /// Number of scheduling passes run
    pub attempts: u32,
    /// Grace window used by the returned pass, in minutes
    pub grace_minutes: i64,
}

/// Caller-side relaxation of the Flexible grace window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaxationPolicy {
    /// Added to the grace window on every retry
    pub grace_step: Duration,
    /// Retries after the first pass
    pub max_attempts: u32,
}

impl Default for RelaxationPolicy {
    fn default() -> Self {
        Self {
            grace_step: Duration::days(1),
            max_attempts: 3,
        }
    }
}

fn resolve_now(request: &ScheduleRequest) -> NaiveDateTime {
    request.now.unwrap_or_else(|| Local::now().naive_local())
}

/// Schedule a request with a fresh grid and validate the result.
pub fn plan(request: &ScheduleRequest, config: &SchedulerConfig) -> Result<PlanOutcome> {
    request.check()?;
    let now = resolve_now(request);
    let (schedule, report) = run_pass(request, config, now)?;
    Ok(PlanOutcome {
        schedule,
        report,
        attempts: 1,
        grace_minutes: config.grace.num_minutes(),
    })
}

/// Like [`plan`], widening the grace window while Flexible items remain
/// unschedulable.
///
/// Returns the first outcome without unschedulable items, or the last
/// attempt.
pub fn plan_relaxed(
    request: &ScheduleRequest,
    config: &SchedulerConfig,
    policy: RelaxationPolicy,
) -> Result<PlanOutcome> {
    request.check()?;
    let now = resolve_now(request);
    let mut config = config.clone();
    let mut attempts = 0;

    loop {
        attempts += 1;
        let (schedule, report) = run_pass(request, &config, now)?;

        let flexible_left = schedule.unschedulable.iter().any(|u| {
            request
                .work
                .iter()
                .any(|w| w.id == u.task_id && w.strictness == Strictness::Flexible)
        });

        let widened = config.grace.checked_add(&policy.grace_step);
        let Some(grace) = widened.filter(|_| flexible_left && attempts <= policy.max_attempts) else {
            return Ok(PlanOutcome {
                schedule,
                report,
                attempts,
                grace_minutes: config.grace.num_minutes(),
            });
        };

        config.grace = grace;
        info!(
            attempt = attempts,
            grace_hours = config.grace.num_hours(),
            "flexible items unschedulable, widening grace window"
        );
    }
}

fn run_pass(
    request: &ScheduleRequest,
    config: &SchedulerConfig,
    now: NaiveDateTime,
) -> Result<(Schedule, ValidationReport)> {
    let horizon_limit = now
        .checked_add_signed(Duration::days(MAX_HORIZON_DAYS))
        .unwrap_or(NaiveDateTime::MAX);
    let horizon_end = request
        .work
        .iter()
        .map(|w| w.effective_deadline(config.grace))
        .max()
        .unwrap_or(now)
        .min(horizon_limit);

    let slots = build_grid(now, horizon_end, config.window, config.slot_size)?;
    debug!(%now, %horizon_end, slots = slots.len(), "grid built");

    let mut index = AvailabilityIndex::new(slots);
    index.mark_unavailable(&request.events);

    let scheduler = Scheduler::with_config(config.clone());
    let schedule = scheduler.schedule(&request.work, &mut index, now);
    let report = Validator::new(config).validate(&schedule, &request.events, &request.work);

    Ok((schedule, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Event;
    use crate::task::WorkItem;
    use chrono::NaiveDate;

    fn ts(day: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, day)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn plan_validates_its_own_output() {
        let request = ScheduleRequest::new(
            vec![WorkItem::new("w1", ts(22, 18), Strictness::Strict, 2.0)],
            vec![Event::new("e1", ts(20, 12), ts(20, 14))],
        )
        .with_now(ts(20, 0));

        let outcome = plan(&request, &SchedulerConfig::default()).unwrap();
        assert!(outcome.report.ok, "{:?}", outcome.report.violations);
        assert_eq!(outcome.schedule.sessions[0].start, ts(20, 14));
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn plan_rejects_bad_requests() {
        let request = ScheduleRequest::new(
            vec![WorkItem::new("w1", ts(22, 18), Strictness::Strict, -1.0)],
            Vec::new(),
        );
        assert!(plan(&request, &SchedulerConfig::default()).is_err());
    }

    #[test]
    fn empty_request_yields_empty_schedule() {
        let request = ScheduleRequest::default().with_now(ts(20, 0));
        let outcome = plan(&request, &SchedulerConfig::default()).unwrap();
        assert!(outcome.schedule.sessions.is_empty());
        assert!(outcome.report.ok);
    }

    #[test]
    fn relaxation_widens_grace_until_flexible_item_fits() {
        let config = SchedulerConfig {
            grace: Duration::zero(),
            ..SchedulerConfig::default()
        };
        // 8h before Monday evening cannot fit in one 6h window
        let request = ScheduleRequest::new(
            vec![WorkItem::new("w1", ts(20, 18), Strictness::Flexible, 8.0)],
            Vec::new(),
        )
        .with_now(ts(20, 0));

        let strict = plan(&request, &config).unwrap();
        assert!(strict.schedule.is_unschedulable("w1"));

        let relaxed = plan_relaxed(&request, &config, RelaxationPolicy::default()).unwrap();
        assert!(relaxed.schedule.unschedulable.is_empty());
        assert_eq!(relaxed.attempts, 2);
        assert_eq!(relaxed.grace_minutes, 24 * 60);
        assert_eq!(relaxed.schedule.minutes_for("w1"), 480);
    }

    #[test]
    fn out_of_range_grace_does_not_overflow() {
        let request = ScheduleRequest::new(
            vec![WorkItem::new("w1", ts(18, 12), Strictness::Flexible, 2.0)],
            Vec::new(),
        )
        .with_now(ts(20, 0));

        let config = SchedulerConfig {
            grace: Duration::days(4_000_000_000),
            ..SchedulerConfig::default()
        };
        let outcome = plan(&request, &config).unwrap();
        assert_eq!(outcome.schedule.sessions[0].start, ts(20, 12));
        assert!(outcome.report.ok, "{:?}", outcome.report.violations);

        let policy = RelaxationPolicy {
            grace_step: Duration::MAX,
            max_attempts: 5,
        };
        let blocked = ScheduleRequest::new(
            vec![WorkItem::new("w2", ts(20, 18), Strictness::Flexible, 8.0)],
            Vec::new(),
        )
        .with_now(ts(20, 0));
        let no_grace = SchedulerConfig {
            grace: Duration::zero(),
            ..SchedulerConfig::default()
        };
        let outcome = plan_relaxed(&blocked, &no_grace, policy).unwrap();
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.schedule.unschedulable.is_empty());
        assert!(outcome.report.ok, "{:?}", outcome.report.violations);
    }

    #[test]
    fn relaxation_leaves_strict_items_alone() {
        let request = ScheduleRequest::new(
            vec![WorkItem::new("w1", ts(20, 18), Strictness::Strict, 8.0)],
            Vec::new(),
        )
        .with_now(ts(20, 0));

        let outcome =
            plan_relaxed(&request, &SchedulerConfig::default(), RelaxationPolicy::default()).unwrap();
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.schedule.is_unschedulable("w1"));
    }
}
