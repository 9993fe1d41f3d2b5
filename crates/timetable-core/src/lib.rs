//! # Timetable Core Library
//!
//! This library provides the scheduling engine behind the `timetable` CLI.
//! It places coursework hour quotas into free time inside a daily allowed
//! window, around fixed events, honouring weekday and weekend work caps.
//! The engine is deterministic: the same request and configuration always
//! produce the same schedule.
//!
//! ## Architecture
//!
//! - **Timeline**: Time grid inside the daily window and the slot availability
//!   index built over it
//! - **Task**: Work items and the session splitter
//! - **Scheduler**: Greedy deadline-ordered placement and the one-call planner
//! - **Validation**: Independent post-hoc check of every schedule invariant
//! - **Storage**: SQLite-based coursework/event intake, schedule runs and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`plan`]: Schedule one [`ScheduleRequest`]
//! - [`Scheduler`]: Core placement engine
//! - [`Validator`]: Schedule checker
//! - [`ScheduleDb`]: Intake and schedule persistence
//! - [`Config`]: Scheduler configuration management

pub mod error;
pub mod schedule;
pub mod scheduler;
pub mod storage;
pub mod task;
pub mod timeline;
pub mod validation;

pub use error::{
    ConfigError, CoreError, DatabaseError, InputError, InvalidWindowError, PlacementTransitionError, UnsplittableError,
};
pub use schedule::{
    Event, ItemOutcome, PlacementState, Schedule, ScheduleRequest, Session, SoftViolation, Unschedulable,
    UnschedulableReason,
};
pub use schedule::request::RequestFormat;
pub use scheduler::{plan, plan_relaxed, DailyCaps, PlanOutcome, RelaxationPolicy, Scheduler, SchedulerConfig};
pub use storage::{Config, ScheduleDb, SchedulePersistence, TaskIntake};
pub use task::{split_hours, split_minutes, SessionBounds, Strictness, WorkItem, MAX_REQUIRED_HOURS};
pub use timeline::{build_grid, AvailabilityIndex, DailyWindow, DayType, Slot, SlotRun};
pub use validation::{ValidationReport, Validator, Violation, ViolationKind};
