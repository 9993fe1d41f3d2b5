//! Database schema migrations for the timetable store.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};
use tracing::{debug, warn};

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Create the schema_version table if it doesn't exist.
fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    })
    .unwrap_or_else(|e| {
        if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
            warn!(error = %e, "failed to read schema_version");
        }
        0
    })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    debug!(version, "schema migrated");
    Ok(())
}

/// Migration v1: coursework and event intake.
///
/// Coursework rows carry the intake form fields; only `open` rows with a
/// deadline are scheduled.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS coursework (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            title               TEXT NOT NULL,
            course              TEXT,
            strictness          TEXT NOT NULL DEFAULT 'flexible',
            est_hours           REAL NOT NULL DEFAULT 1,
            min_session_minutes INTEGER NOT NULL DEFAULT 30,
            max_session_minutes INTEGER NOT NULL DEFAULT 120,
            deadline_at         TEXT,
            status              TEXT NOT NULL DEFAULT 'open',
            uncertainty         REAL NOT NULL DEFAULT 0.2,
            created_at          TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            description TEXT,
            start_at    TEXT NOT NULL,
            end_at      TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_coursework_status ON coursework(status);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: stored schedule runs.
///
/// A run keeps its sessions as rows and its per-item outcomes, unschedulable
/// items and soft violations as JSON.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schedule_runs (
            id                   TEXT PRIMARY KEY,
            generated_at         TEXT NOT NULL,
            outcomes_json        TEXT NOT NULL DEFAULT '[]',
            unschedulable_json   TEXT NOT NULL DEFAULT '[]',
            soft_violations_json TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS scheduled_sessions (
            run_id   TEXT NOT NULL REFERENCES schedule_runs(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            task_id  TEXT NOT NULL,
            start_at TEXT NOT NULL,
            stop_at  TEXT NOT NULL,
            PRIMARY KEY (run_id, position)
        );",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()
}
