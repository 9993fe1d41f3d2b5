//! SQLite-based storage for coursework, events and generated schedules.

use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{data_dir, migrations, SchedulePersistence, TaskIntake};
use crate::error::{DatabaseError, InputError, Result, UnsplittableError};
use crate::schedule::request::check_hours;
use crate::schedule::timefmt::{self, format_timestamp, parse_timestamp};
use crate::schedule::{Event, Schedule, ScheduleRequest, Session};
use crate::task::{SessionBounds, Strictness, WorkItem};

const WORK_PREFIX: &str = "w";
const EVENT_PREFIX: &str = "e";

/// Coursework as entered through the intake form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseworkInput {
    pub title: String,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub strictness: Strictness,
    #[serde(default = "default_est_hours")]
    pub est_hours: f64,
    #[serde(default = "default_min_session_minutes")]
    pub min_session_minutes: i64,
    #[serde(default = "default_max_session_minutes")]
    pub max_session_minutes: i64,
    #[serde(default, with = "timefmt::serde_ts_opt")]
    pub deadline_at: Option<NaiveDateTime>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_uncertainty")]
    pub uncertainty: f64,
}

fn default_est_hours() -> f64 {
    1.0
}
fn default_min_session_minutes() -> i64 {
    30
}
fn default_max_session_minutes() -> i64 {
    120
}
fn default_status() -> String {
    "open".into()
}
fn default_uncertainty() -> f64 {
    0.2
}

impl CourseworkInput {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            course: None,
            strictness: Strictness::default(),
            est_hours: default_est_hours(),
            min_session_minutes: default_min_session_minutes(),
            max_session_minutes: default_max_session_minutes(),
            deadline_at: None,
            status: default_status(),
            uncertainty: default_uncertainty(),
        }
    }
}

/// A stored coursework row. `id` doubles as the work item id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseworkRecord {
    pub id: String,
    pub title: String,
    pub course: Option<String>,
    pub strictness: Strictness,
    pub est_hours: f64,
    pub min_session_minutes: i64,
    pub max_session_minutes: i64,
    #[serde(with = "timefmt::serde_ts_opt")]
    pub deadline_at: Option<NaiveDateTime>,
    pub status: String,
    pub uncertainty: f64,
    #[serde(with = "timefmt::serde_ts")]
    pub created_at: NaiveDateTime,
}

impl CourseworkRecord {
    /// The schedulable view of this row, if it is open and has a deadline.
    pub fn to_work_item(&self) -> Option<WorkItem> {
        if self.status != "open" {
            return None;
        }
        let deadline = self.deadline_at?;
        Some(
            WorkItem::new(self.id.clone(), deadline, self.strictness, self.est_hours).with_session_bounds(
                SessionBounds::new(
                    self.min_session_minutes as f64 / 60.0,
                    self.max_session_minutes as f64 / 60.0,
                ),
            ),
        )
    }
}

/// An event as entered through the intake form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInput {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "timefmt::serde_ts")]
    pub start_at: NaiveDateTime,
    #[serde(with = "timefmt::serde_ts")]
    pub end_at: NaiveDateTime,
}

/// A stored event row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(with = "timefmt::serde_ts")]
    pub start_at: NaiveDateTime,
    #[serde(with = "timefmt::serde_ts")]
    pub end_at: NaiveDateTime,
}

impl EventRecord {
    pub fn to_event(&self) -> Event {
        Event::new(self.id.clone(), self.start_at, self.end_at)
    }
}

/// A persisted scheduling run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSchedule {
    pub run_id: String,
    #[serde(with = "timefmt::serde_ts")]
    pub generated_at: NaiveDateTime,
    pub schedule: Schedule,
}

fn corrupt(table: &str, message: impl Into<String>) -> DatabaseError {
    DatabaseError::CorruptRow {
        table: table.to_string(),
        message: message.into(),
    }
}

fn parse_ts(table: &str, raw: &str) -> Result<NaiveDateTime, DatabaseError> {
    parse_timestamp(raw).map_err(|e| corrupt(table, e.to_string()))
}

fn parse_json<T: DeserializeOwned>(table: &str, raw: &str) -> Result<T, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| corrupt(table, e.to_string()))
}

/// Raw coursework columns, decoded outside the rusqlite row callback.
type CourseworkRow = (
    i64,
    String,
    Option<String>,
    String,
    f64,
    i64,
    i64,
    Option<String>,
    String,
    f64,
    String,
);

fn decode_coursework(row: CourseworkRow) -> Result<CourseworkRecord, DatabaseError> {
    let (id, title, course, strictness, est_hours, min, max, deadline, status, uncertainty, created) =
        row;
    Ok(CourseworkRecord {
        id: format!("{WORK_PREFIX}{id}"),
        title,
        course,
        strictness: strictness
            .parse()
            .map_err(|e: String| corrupt("coursework", e))?,
        est_hours,
        min_session_minutes: min,
        max_session_minutes: max,
        deadline_at: deadline
            .as_deref()
            .map(|d| parse_ts("coursework", d))
            .transpose()?,
        status,
        uncertainty,
        created_at: parse_ts("coursework", &created)?,
    })
}

/// SQLite database for coursework, events and schedule runs.
pub struct ScheduleDb {
    conn: Connection,
}

impl ScheduleDb {
    /// Open the database at `<data dir>/timetable.db`.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("timetable.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// All coursework rows, oldest first.
    pub fn list_coursework(&self) -> Result<Vec<CourseworkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, course, strictness, est_hours, min_session_minutes,
                    max_session_minutes, deadline_at, status, uncertainty, created_at
             FROM coursework ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                    row.get(8)?,
                    row.get(9)?,
                    row.get(10)?,
                ))
            })?
            .collect::<std::result::Result<Vec<CourseworkRow>, _>>()?;

        let records = rows
            .into_iter()
            .map(decode_coursework)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Change the status of a coursework row (`open`, `done`, ...).
    ///
    /// Returns `false` when no row has that id.
    pub fn set_coursework_status(&self, id: &str, status: &str) -> Result<bool> {
        let Some(rowid) = id.strip_prefix(WORK_PREFIX).and_then(|n| n.parse::<i64>().ok()) else {
            return Ok(false);
        };
        let changed = self.conn.execute(
            "UPDATE coursework SET status = ?1 WHERE id = ?2",
            params![status, rowid],
        )?;
        Ok(changed > 0)
    }

    /// All events, ordered by start.
    pub fn list_events(&self) -> Result<Vec<EventRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, description, start_at, end_at FROM events ORDER BY start_at, id")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut records = Vec::with_capacity(rows.len());
        for (id, title, description, start, end) in rows {
            records.push(EventRecord {
                id: format!("{EVENT_PREFIX}{id}"),
                title,
                description,
                start_at: parse_ts("events", &start)?,
                end_at: parse_ts("events", &end)?,
            });
        }
        Ok(records)
    }

    fn load_run_sessions(&self, run_id: &str) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT task_id, start_at, stop_at FROM scheduled_sessions
             WHERE run_id = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map([run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut sessions = Vec::with_capacity(rows.len());
        for (task_id, start, stop) in rows {
            sessions.push(Session::new(
                task_id,
                parse_ts("scheduled_sessions", &start)?,
                parse_ts("scheduled_sessions", &stop)?,
            ));
        }
        Ok(sessions)
    }
}

impl TaskIntake for ScheduleDb {
    fn add_coursework(&mut self, input: CourseworkInput) -> Result<String> {
        check_hours(&input.title, input.est_hours)?;
        if input.min_session_minutes <= 0 || input.min_session_minutes > input.max_session_minutes {
            return Err(UnsplittableError::InvalidBounds {
                min: input.min_session_minutes,
                max: input.max_session_minutes,
            }
            .into());
        }

        self.conn.execute(
            "INSERT INTO coursework (title, course, strictness, est_hours, min_session_minutes,
                                     max_session_minutes, deadline_at, status, uncertainty, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                input.title,
                input.course,
                input.strictness.to_string(),
                input.est_hours,
                input.min_session_minutes,
                input.max_session_minutes,
                input.deadline_at.as_ref().map(format_timestamp),
                input.status,
                input.uncertainty,
                format_timestamp(&Local::now().naive_local()),
            ],
        )?;
        let id = format!("{WORK_PREFIX}{}", self.conn.last_insert_rowid());
        debug!(%id, title = %input.title, "coursework added");
        Ok(id)
    }

    fn add_event(&mut self, input: EventInput) -> Result<String> {
        if input.start_at >= input.end_at {
            return Err(InputError::EmptyEvent {
                id: input.title,
                start: input.start_at,
                end: input.end_at,
            }
            .into());
        }

        self.conn.execute(
            "INSERT INTO events (title, description, start_at, end_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                input.title,
                input.description,
                format_timestamp(&input.start_at),
                format_timestamp(&input.end_at),
            ],
        )?;
        let id = format!("{EVENT_PREFIX}{}", self.conn.last_insert_rowid());
        debug!(%id, title = %input.title, "event added");
        Ok(id)
    }

    fn load_request(&self, now: NaiveDateTime) -> Result<ScheduleRequest> {
        let mut work = Vec::new();
        for record in self.list_coursework()? {
            if record.status != "open" {
                continue;
            }
            match record.to_work_item() {
                Some(item) => work.push(item),
                None => warn!(id = %record.id, title = %record.title, "coursework without deadline skipped"),
            }
        }

        let events = self
            .list_events()?
            .iter()
            .filter(|e| e.end_at > now)
            .map(EventRecord::to_event)
            .collect();

        Ok(ScheduleRequest::new(work, events).with_now(now))
    }
}

impl SchedulePersistence for ScheduleDb {
    fn store_schedule(&mut self, schedule: &Schedule) -> Result<String> {
        let run_id = Uuid::new_v4().to_string();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO schedule_runs (id, generated_at, outcomes_json, unschedulable_json, soft_violations_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                run_id,
                format_timestamp(&Local::now().naive_local()),
                serde_json::to_string(&schedule.outcomes)?,
                serde_json::to_string(&schedule.unschedulable)?,
                serde_json::to_string(&schedule.soft_violations)?,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO scheduled_sessions (run_id, position, task_id, start_at, stop_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, session) in schedule.sessions.iter().enumerate() {
                stmt.execute(params![
                    run_id,
                    position as i64,
                    session.task_id,
                    format_timestamp(&session.start),
                    format_timestamp(&session.stop),
                ])?;
            }
        }

        tx.commit()?;
        debug!(%run_id, sessions = schedule.sessions.len(), "schedule stored");
        Ok(run_id)
    }

    fn latest_schedule(&self) -> Result<Option<StoredSchedule>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, generated_at, outcomes_json, unschedulable_json, soft_violations_json
                 FROM schedule_runs ORDER BY rowid DESC LIMIT 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((run_id, generated_at, outcomes, unschedulable, soft_violations)) = row else {
            return Ok(None);
        };

        let schedule = Schedule {
            sessions: self.load_run_sessions(&run_id)?,
            outcomes: parse_json("schedule_runs", &outcomes)?,
            unschedulable: parse_json("schedule_runs", &unschedulable)?,
            soft_violations: parse_json("schedule_runs", &soft_violations)?,
        };

        Ok(Some(StoredSchedule {
            run_id,
            generated_at: parse_ts("schedule_runs", &generated_at)?,
            schedule,
        }))
    }
}
