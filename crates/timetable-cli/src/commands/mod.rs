pub mod completions;
pub mod config;
pub mod event;
pub mod plan;
pub mod schedule;
pub mod task;
pub mod validate;

use chrono::NaiveDateTime;
use timetable_core::schedule::format::render_report;
use timetable_core::schedule::timefmt::parse_timestamp;
use timetable_core::{Config, Schedule, SchedulerConfig};

/// clap value parser for timestamp arguments.
pub fn parse_time_arg(raw: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(raw).map_err(|e| e.to_string())
}

/// Scheduler configuration from the stored config file.
pub fn scheduler_config() -> Result<SchedulerConfig, Box<dyn std::error::Error>> {
    Ok(Config::load()?.scheduler_config()?)
}

/// Print a schedule as session lines or as JSON.
pub fn print_schedule<T: serde::Serialize>(
    schedule: &Schedule,
    json_value: &T,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(json_value)?);
    } else {
        print!("{}", render_report(schedule));
    }
    Ok(())
}
