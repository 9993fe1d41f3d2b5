//! Intake -> plan -> persist round trip over SQLite.

use chrono::{NaiveDate, NaiveDateTime};
use timetable_core::storage::{CourseworkInput, EventInput};
use timetable_core::{plan, ScheduleDb, SchedulePersistence, SchedulerConfig, Strictness, TaskIntake};

fn ts(day: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 10, day)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

fn seed(db: &mut ScheduleDb) {
    db.add_coursework(CourseworkInput {
        course: Some("MATH201".into()),
        strictness: Strictness::Strict,
        est_hours: 4.0,
        deadline_at: Some(ts(22, 18)),
        ..CourseworkInput::new("Problem set")
    })
    .unwrap();
    db.add_coursework(CourseworkInput {
        est_hours: 2.0,
        deadline_at: Some(ts(21, 12)),
        ..CourseworkInput::new("Reading")
    })
    .unwrap();
    db.add_event(EventInput {
        title: "Lecture".into(),
        description: None,
        start_at: ts(20, 12),
        end_at: ts(20, 14),
    })
    .unwrap();
}

#[test]
fn stored_intake_schedules_and_persists() {
    let mut db = ScheduleDb::open_memory().unwrap();
    seed(&mut db);

    let request = db.load_request(ts(20, 0)).unwrap();
    assert_eq!(request.work.len(), 2);
    assert_eq!(request.events.len(), 1);

    let outcome = plan(&request, &SchedulerConfig::default()).unwrap();
    assert!(outcome.report.ok, "{:?}", outcome.report.violations);
    assert!(outcome.schedule.unschedulable.is_empty());
    assert_eq!(outcome.schedule.minutes_for("w1"), 240);
    assert_eq!(outcome.schedule.minutes_for("w2"), 120);
    // intake sessions are capped at two hours
    assert!(outcome.schedule.sessions.iter().all(|s| s.duration_minutes() <= 120));

    let run_id = db.store_schedule(&outcome.schedule).unwrap();
    let stored = db.latest_schedule().unwrap().unwrap();
    assert_eq!(stored.run_id, run_id);
    assert_eq!(stored.schedule, outcome.schedule);
}

#[test]
fn file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("timetable.db");

    {
        let mut db = ScheduleDb::open_at(&path).unwrap();
        seed(&mut db);
    }

    let db = ScheduleDb::open_at(&path).unwrap();
    let titles: Vec<String> = db.list_coursework().unwrap().into_iter().map(|c| c.title).collect();
    assert_eq!(titles, vec!["Problem set", "Reading"]);
    assert_eq!(db.list_events().unwrap()[0].id, "e1");
}
