//! `timetable validate`: check a stored schedule against its request.

use std::path::PathBuf;

use chrono::Duration;
use clap::Args;
use timetable_core::schedule::format::parse_sessions;
use timetable_core::{RequestFormat, Schedule, Validator};

use super::plan::read_request;
use super::scheduler_config;

#[derive(Args)]
pub struct ValidateArgs {
    /// Request the schedule was generated from
    pub request: PathBuf,
    /// Schedule as JSON (`plan --json` output or a bare schedule) or session lines
    pub schedule: PathBuf,
    /// Request format, guessed from the file extension when omitted
    #[arg(long)]
    pub format: Option<RequestFormat>,
    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// A schedule read back from disk, with the grace window it was planned
/// under when the document records one.
struct ScheduleDocument {
    schedule: Schedule,
    grace_minutes: Option<i64>,
}

fn read_schedule(text: &str) -> Result<ScheduleDocument, Box<dyn std::error::Error>> {
    let trimmed = text.trim_start();
    if !trimmed.starts_with('{') {
        return Ok(ScheduleDocument {
            schedule: Schedule {
                sessions: parse_sessions(text)?,
                ..Schedule::default()
            },
            grace_minutes: None,
        });
    }

    let mut value: serde_json::Value = serde_json::from_str(text)?;
    let grace_minutes = value.get("grace_minutes").and_then(serde_json::Value::as_i64);
    let schedule = match value.get_mut("schedule") {
        Some(inner) => serde_json::from_value(inner.take())?,
        None => serde_json::from_value(value)?,
    };
    Ok(ScheduleDocument {
        schedule,
        grace_minutes,
    })
}

pub fn run(args: ValidateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = scheduler_config()?;
    let request = read_request(&args.request, args.format)?;
    let text = std::fs::read_to_string(&args.schedule)
        .map_err(|e| format!("cannot read {}: {e}", args.schedule.display()))?;
    let ScheduleDocument {
        schedule,
        grace_minutes,
    } = read_schedule(&text)?;

    // a relaxed plan is checked against the grace window it was planned with
    if let Some(minutes) = grace_minutes {
        if minutes < 0 {
            return Err(format!("invalid grace_minutes {minutes} in schedule").into());
        }
        config.grace = Duration::try_minutes(minutes).ok_or("grace_minutes out of range")?;
        tracing::debug!(grace_minutes = minutes, "using recorded grace window");
    }

    let report = Validator::new(&config).validate(&schedule, &request.events, &request.work);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if report.ok {
        println!("ok");
    } else {
        for violation in &report.violations {
            let kind = serde_json::to_value(violation.kind)?;
            println!("{}: {}", kind.as_str().unwrap_or("violation"), violation.message);
        }
    }

    if report.ok {
        Ok(())
    } else {
        Err(format!("{} violations", report.violations.len()).into())
    }
}
