//! Time discretization and availability bookkeeping.
//!
//! This module provides:
//! - The time grid: fixed-size slots inside the daily allowed window
//! - The availability index: per-slot occupancy and free-run queries

mod availability;
mod grid;

pub use availability::{AvailabilityIndex, SlotRun};
pub use grid::{build_grid, DailyWindow, DayType, Slot};
