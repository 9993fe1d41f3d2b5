//! Fixed event intake commands for CLI.

use chrono::NaiveDateTime;
use clap::Subcommand;
use timetable_core::schedule::timefmt::format_timestamp;
use timetable_core::storage::EventInput;
use timetable_core::{ScheduleDb, TaskIntake};

use super::parse_time_arg;

#[derive(Subcommand)]
pub enum EventAction {
    /// Add a fixed event
    Add {
        /// Event title
        title: String,
        /// Start, e.g. "2025-10-20 12:00"
        #[arg(long, value_parser = parse_time_arg)]
        start: NaiveDateTime,
        /// End, e.g. "2025-10-20 14:00"
        #[arg(long, value_parser = parse_time_arg)]
        end: NaiveDateTime,
        /// Event description
        #[arg(long)]
        description: Option<String>,
    },
    /// List events
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: EventAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = ScheduleDb::open()?;

    match action {
        EventAction::Add {
            title,
            start,
            end,
            description,
        } => {
            let id = db.add_event(EventInput {
                title,
                description,
                start_at: start,
                end_at: end,
            })?;
            println!("Event created: {id}");
        }
        EventAction::List { json } => {
            let records = db.list_events()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for r in &records {
                    println!(
                        "{}\t{}\t{}\t{}",
                        r.id,
                        format_timestamp(&r.start_at),
                        format_timestamp(&r.end_at),
                        r.title
                    );
                }
            }
        }
    }
    Ok(())
}
