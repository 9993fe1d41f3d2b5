//! Coursework intake commands for CLI.

use chrono::NaiveDateTime;
use clap::Subcommand;
use timetable_core::schedule::timefmt::format_timestamp;
use timetable_core::storage::CourseworkInput;
use timetable_core::{ScheduleDb, Strictness, TaskIntake};

use super::parse_time_arg;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a coursework item
    Add {
        /// Coursework title
        title: String,
        /// Course the work belongs to
        #[arg(long)]
        course: Option<String>,
        /// Deadline, e.g. "2025-10-25 12:00"
        #[arg(long, value_parser = parse_time_arg)]
        deadline: Option<NaiveDateTime>,
        /// Estimated hours of work (default: 1)
        #[arg(long, default_value = "1")]
        hours: f64,
        /// The deadline cannot slip
        #[arg(long)]
        strict: bool,
        /// Shortest session in minutes (default: 30)
        #[arg(long, default_value = "30")]
        min_session: i64,
        /// Longest session in minutes (default: 120)
        #[arg(long, default_value = "120")]
        max_session: i64,
        /// Estimate uncertainty (default: 0.2)
        #[arg(long, default_value = "0.2")]
        uncertainty: f64,
    },
    /// List coursework
    List {
        /// Only open coursework
        #[arg(long)]
        open: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark coursework as done so it is no longer scheduled
    Done {
        /// Coursework ID, e.g. "w1"
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = ScheduleDb::open()?;

    match action {
        TaskAction::Add {
            title,
            course,
            deadline,
            hours,
            strict,
            min_session,
            max_session,
            uncertainty,
        } => {
            let input = CourseworkInput {
                course,
                strictness: if strict {
                    Strictness::Strict
                } else {
                    Strictness::Flexible
                },
                est_hours: hours,
                min_session_minutes: min_session,
                max_session_minutes: max_session,
                deadline_at: deadline,
                uncertainty,
                ..CourseworkInput::new(title)
            };
            let id = db.add_coursework(input)?;
            println!("Task created: {id}");
        }
        TaskAction::List { open, json } => {
            let records: Vec<_> = db
                .list_coursework()?
                .into_iter()
                .filter(|r| !open || r.status == "open")
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for r in &records {
                    let deadline = r
                        .deadline_at
                        .as_ref()
                        .map(format_timestamp)
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{}\t{}\t{}\t{}h\t{}\t{}",
                        r.id, r.status, deadline, r.est_hours, r.strictness, r.title
                    );
                }
            }
        }
        TaskAction::Done { id } => {
            if !db.set_coursework_status(&id, "done")? {
                return Err(format!("no coursework with id '{id}'").into());
            }
            println!("Task done: {id}");
        }
    }
    Ok(())
}
