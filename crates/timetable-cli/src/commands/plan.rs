//! `timetable plan`: schedule a request file.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use clap::Args;
use timetable_core::{plan, plan_relaxed, RelaxationPolicy, RequestFormat, ScheduleRequest};

use super::{parse_time_arg, print_schedule, scheduler_config};

#[derive(Args)]
pub struct PlanArgs {
    /// Request file (JSON, TOML or compact text); `-` reads stdin
    pub file: PathBuf,
    /// Request format, guessed from the file extension when omitted
    #[arg(long)]
    pub format: Option<RequestFormat>,
    /// Start of the scheduling horizon (default: the request's `now`, else the current time)
    #[arg(long, value_parser = parse_time_arg)]
    pub now: Option<NaiveDateTime>,
    /// Print the full outcome as JSON
    #[arg(long)]
    pub json: bool,
    /// Widen the flexible grace window by a day up to N times while flexible items stay unschedulable
    #[arg(long, value_name = "N")]
    pub relax: Option<u32>,
}

/// Read a request file, or stdin for `-`.
pub fn read_request(path: &Path, format: Option<RequestFormat>) -> Result<ScheduleRequest, Box<dyn std::error::Error>> {
    let input = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?
    };
    let format = format.unwrap_or_else(|| RequestFormat::from_path(path));
    let request = ScheduleRequest::parse(&input, format)?;
    tracing::debug!(
        path = %path.display(),
        ?format,
        work = request.work.len(),
        events = request.events.len(),
        "request loaded"
    );
    Ok(request)
}

pub fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = scheduler_config()?;
    let mut request = read_request(&args.file, args.format)?;
    if let Some(now) = args.now {
        request.now = Some(now);
    }

    let outcome = match args.relax {
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

    print_schedule(&outcome.schedule, &outcome, args.json)?;

    if !outcome.report.ok {
        for violation in &outcome.report.violations {
            eprintln!("violation: {}", violation.message);
        }
        return Err(format!("schedule failed validation ({} violations)", outcome.report.violations.len()).into());
    }
    Ok(())
}
