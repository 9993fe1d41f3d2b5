//! Compact text formats.
//!
//! Request: `work: w1, 2025-10-25 12:00, No, 10; w2, 2025-11-01 12:00, Yes, 25.
//! event: e1, 2025-10-20 12:00, 2025-10-20 14:00.`
//!
//! Output: one `taskID, startTime, stopTime` line per session.

use std::fmt::Write as _;

use super::timefmt::{format_timestamp, parse_timestamp};
use super::{Event, Schedule, ScheduleRequest, Session};
use crate::error::InputError;
use crate::task::{SessionBounds, Strictness, WorkItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Work,
    Event,
}

const HEADERS: &[(&str, Section)] = &[
    ("work:", Section::Work),
    ("events:", Section::Event),
    ("event:", Section::Event),
];

/// Locate every section header, in order of appearance.
fn find_headers(text: &str) -> Vec<(usize, usize, Section)> {
    let lower = text.to_ascii_lowercase();
    let mut found: Vec<(usize, usize, Section)> = Vec::new();
    for (header, section) in HEADERS {
        let mut from = 0;
        while let Some(pos) = lower[from..].find(header) {
            let at = from + pos;
            if !found.iter().any(|(p, len, _)| at >= *p && at < p + len) {
                found.push((at, header.len(), *section));
            }
            from = at + header.len();
        }
    }
    found.sort_by_key(|(pos, _, _)| *pos);
    found
}

fn split_fields(record: &str) -> Vec<&str> {
    record.split(',').map(str::trim).collect()
}

fn parse_hours(raw: &str, record: usize) -> Result<f64, InputError> {
    raw.parse::<f64>().map_err(|_| InputError::Malformed {
        record,
        message: format!("'{raw}' is not a number of hours"),
    })
}

fn parse_work(fields: &[&str], record: usize) -> Result<WorkItem, InputError> {
    if fields.len() != 4 && fields.len() != 6 {
        return Err(InputError::Malformed {
            record,
            message: format!(
                "work needs 'id, deadline, strictness, hours[, min, max]', got {} fields",
                fields.len()
            ),
        });
    }
    let strictness = fields[2]
        .parse::<Strictness>()
        .map_err(|message| InputError::Malformed { record, message })?;
    let mut item = WorkItem::new(
        fields[0],
        parse_timestamp(fields[1])?,
        strictness,
        parse_hours(fields[3], record)?,
    );
    if fields.len() == 6 {
        item = item.with_session_bounds(SessionBounds::new(
            parse_hours(fields[4], record)?,
            parse_hours(fields[5], record)?,
        ));
    }
    Ok(item)
}

fn parse_event(fields: &[&str], record: usize) -> Result<Event, InputError> {
    if fields.len() != 3 {
        return Err(InputError::Malformed {
            record,
            message: format!("event needs 'id, start, end', got {} fields", fields.len()),
        });
    }
    Ok(Event::new(
        fields[0],
        parse_timestamp(fields[1])?,
        parse_timestamp(fields[2])?,
    ))
}

/// Parse the compact request format.
///
/// Records are separated by `;` or newlines, fields by `,`. Strictness is
/// `Yes`/`strict` or `No`/`flexible`. A leading `Input:` label is ignored.
pub fn parse_compact(text: &str) -> Result<ScheduleRequest, InputError> {
    let headers = find_headers(text);

    let preamble = headers.first().map_or(text, |(pos, _, _)| &text[..*pos]).trim();
    let preamble = preamble
        .strip_prefix("Input:")
        .or_else(|| preamble.strip_prefix("input:"))
        .unwrap_or(preamble)
        .trim();
    if !preamble.is_empty() {
        return Err(InputError::Malformed {
            record: 0,
            message: format!("unexpected text before the first section: '{preamble}'"),
        });
    }

    let mut request = ScheduleRequest::default();
    let mut record = 0;

    for (i, (pos, len, section)) in headers.iter().enumerate() {
        let end = headers.get(i + 1).map_or(text.len(), |(next, _, _)| *next);
        let body = text[pos + len..end].trim();
        let body = body.strip_suffix('.').unwrap_or(body);

        for raw in body.split([';', '\n']) {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            record += 1;
            let fields = split_fields(raw);
            match section {
                Section::Work => request.work.push(parse_work(&fields, record)?),
                Section::Event => request.events.push(parse_event(&fields, record)?),
            }
        }
    }

    Ok(request)
}

/// Render a request back into the compact format.
pub fn render_compact(request: &ScheduleRequest) -> String {
    let work: Vec<String> = request
        .work
        .iter()
        .map(|w| {
            let strict = match w.strictness {
                Strictness::Strict => "Yes",
                Strictness::Flexible => "No",
            };
            let mut line = format!(
                "{}, {}, {}, {}",
                w.id,
                format_timestamp(&w.deadline),
                strict,
                w.required_hours
            );
            if let Some(bounds) = w.session_bounds {
                let _ = write!(line, ", {}, {}", bounds.min_hours, bounds.max_hours);
            }
            line
        })
        .collect();
    let events: Vec<String> = request
        .events
        .iter()
        .map(|e| {
            format!(
                "{}, {}, {}",
                e.id,
                format_timestamp(&e.start),
                format_timestamp(&e.end)
            )
        })
        .collect();
    format!("work: {}. event: {}.", work.join("; "), events.join("; "))
}

/// One `taskID, startTime, stopTime` line per session.
pub fn render_sessions(schedule: &Schedule) -> String {
    let mut out = String::new();
    for session in &schedule.sessions {
        let _ = writeln!(out, "{session}");
    }
    out
}

/// Sessions followed by `#`-prefixed unschedulable and soft-violation notes.
pub fn render_report(schedule: &Schedule) -> String {
    let mut out = render_sessions(schedule);
    if !schedule.unschedulable.is_empty() {
        out.push_str("# unschedulable\n");
        for item in &schedule.unschedulable {
            let _ = writeln!(out, "# {}: {}", item.task_id, item.reason);
        }
    }
    if !schedule.soft_violations.is_empty() {
        out.push_str("# soft violations\n");
        for violation in &schedule.soft_violations {
            let _ = writeln!(out, "# {violation}");
        }
    }
    out
}

/// Read `taskID, startTime, stopTime` lines back; `#` lines are skipped.
pub fn parse_sessions(text: &str) -> Result<Vec<Session>, InputError> {
    let mut sessions = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = split_fields(line);
        if fields.len() != 3 {
            return Err(InputError::Malformed {
                record: i + 1,
                message: format!("expected 'taskID, startTime, stopTime', got '{line}'"),
            });
        }
        sessions.push(Session::new(
            fields[0],
            parse_timestamp(fields[1])?,
            parse_timestamp(fields[2])?,
        ));
    }
    Ok(sessions)
}
