//! Schedule generation over stored coursework and events.

use chrono::{Duration, Local, NaiveDateTime};
use clap::Subcommand;
use timetable_core::schedule::timefmt::format_timestamp;
use timetable_core::{plan, plan_relaxed, RelaxationPolicy, ScheduleDb, SchedulePersistence, TaskIntake};

use super::{parse_time_arg, print_schedule, scheduler_config};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// Schedule every open coursework item around the stored events
    Generate {
        /// Start of the scheduling horizon (default: now)
        #[arg(long, value_parser = parse_time_arg)]
        now: Option<NaiveDateTime>,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
        /// Store the result as the latest schedule
        #[arg(long)]
        save: bool,
        /// Widen the flexible grace window by a day up to N times
        #[arg(long, value_name = "N")]
        relax: Option<u32>,
    },
    /// Show the latest stored schedule
    Show {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: ScheduleAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = ScheduleDb::open()?;

    match action {
        ScheduleAction::Generate {
            now,
            json,
            save,
            relax,
        } => {
            let config = scheduler_config()?;
            let now = now.unwrap_or_else(|| Local::now().naive_local());
            let request = db.load_request(now)?;

            let outcome = match relax {
                Some(max_attempts) => plan_relaxed(
                    &request,
                    &config,
                    RelaxationPolicy {
                        grace_step: Duration::days(1),
                        max_attempts,
                    },
                )?,
                None => plan(&request, &config)?,
            };

            print_schedule(&outcome.schedule, &outcome, json)?;

            if !outcome.report.ok {
                return Err(format!(
                    "schedule failed validation ({} violations)",
                    outcome.report.violations.len()
                )
                .into());
            }
            if save {
                let run_id = db.store_schedule(&outcome.schedule)?;
                eprintln!("saved schedule {run_id}");
            }
        }
        ScheduleAction::Show { json } => match db.latest_schedule()? {
            Some(stored) => {
                if !json {
                    println!(
                        "# run {} generated {}",
                        stored.run_id,
                        format_timestamp(&stored.generated_at)
                    );
                }
                print_schedule(&stored.schedule, &stored, json)?;
            }
            None => {
                if json {
                    println!("null");
                } else {
                    println!("no stored schedule");
                }
            }
        },
    }
    Ok(())
}
