//! Basic CLI E2E tests.
//!
//! Tests invoke the built `timetable` binary against a temporary data
//! directory and verify outputs.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

const SCENARIO_A: &str = "work: w1, 2025-10-25 12:00, No, 10; w2, 2025-11-01 12:00, Yes, 25. \
                          event: e1, 2025-10-20 12:00, 2025-10-20 14:00.";

/// Run a CLI command with `data_dir` as the data directory.
fn run_cli(data_dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_timetable"))
        .args(args)
        .env("TIMETABLE_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path.to_string_lossy().to_string()
}

#[test]
fn test_plan_compact_request() {
    let dir = TempDir::new().unwrap();
    let request = write_file(&dir, "request.txt", SCENARIO_A);

    let (code, stdout, stderr) = run_cli(dir.path(), &["plan", &request, "--now", "2025-10-20 00:00"]);
    assert_eq!(code, 0, "plan failed: {stderr}");

    let sessions: Vec<&str> = stdout.lines().filter(|l| !l.starts_with('#')).collect();
    assert_eq!(sessions.len(), 7);
    assert_eq!(sessions[0], "w2, 2025-10-21 12:00, 2025-10-21 17:00");
    assert!(sessions.contains(&"w1, 2025-10-25 12:00, 2025-10-25 17:00"));
    assert!(stdout.contains("# soft violations"));
    assert!(!stdout.contains("2025-10-20 12:00"));
}

#[test]
fn test_plan_json_output() {
    let dir = TempDir::new().unwrap();
    let request = write_file(
        &dir,
        "request.json",
        r#"{"now": "2025-10-20 00:00",
            "work": [{"id": "old", "deadline": "2025-10-18 12:00", "strictness": "strict", "required_hours": 2}]}"#,
    );

    let (code, stdout, stderr) = run_cli(dir.path(), &["plan", &request, "--json"]);
    assert_eq!(code, 0, "plan failed: {stderr}");

    let outcome: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(outcome["report"]["ok"], true);
    assert_eq!(outcome["schedule"]["sessions"].as_array().unwrap().len(), 0);
    assert_eq!(outcome["schedule"]["unschedulable"][0]["task_id"], "old");
    assert_eq!(outcome["schedule"]["unschedulable"][0]["reason"]["kind"], "deadline_passed");
}

#[test]
fn test_plan_rejects_free_text() {
    let dir = TempDir::new().unwrap();
    let request = write_file(&dir, "request.txt", "please plan my week");

    let (code, _, stderr) = run_cli(dir.path(), &["plan", &request]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_validate_flags_overlap() {
    let dir = TempDir::new().unwrap();
    let request = write_file(&dir, "request.txt", SCENARIO_A);
    let schedule = write_file(
        &dir,
        "schedule.txt",
        "w1, 2025-10-20 13:00, 2025-10-20 15:00\n",
    );

    let (code, stdout, _) = run_cli(dir.path(), &["validate", &request, &schedule]);
    assert_eq!(code, 1);
    assert!(stdout.contains("event_overlap"));
    assert!(stdout.contains("hours_mismatch"));
}

#[test]
fn test_plan_output_validates() {
    let dir = TempDir::new().unwrap();
    let request = write_file(&dir, "request.txt", SCENARIO_A);

    let (code, stdout, _) = run_cli(dir.path(), &["plan", &request, "--now", "2025-10-20 00:00", "--json"]);
    assert_eq!(code, 0);
    let schedule = write_file(&dir, "schedule.json", &stdout);

    let (code, stdout, stderr) = run_cli(dir.path(), &["validate", &request, &schedule]);
    assert_eq!(code, 0, "validate failed: {stdout}{stderr}");
    assert_eq!(stdout.trim(), "ok");
}

#[test]
fn test_relaxed_plan_validates_with_its_grace() {
    let dir = TempDir::new().unwrap();
    let (code, _, _) = run_cli(dir.path(), &["config", "set", "flexible.grace_days", "0"]);
    assert_eq!(code, 0);

    // 8h due Monday evening only fits with an extra day of grace
    let request = write_file(
        &dir,
        "request.json",
        r#"{"now": "2025-10-20 00:00",
            "work": [{"id": "w1", "deadline": "2025-10-20 18:00", "strictness": "flexible", "required_hours": 8}]}"#,
    );

    let (code, stdout, stderr) = run_cli(dir.path(), &["plan", &request, "--relax", "3", "--json"]);
    assert_eq!(code, 0, "plan failed: {stderr}");
    let outcome: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(outcome["grace_minutes"], 1440);
    assert_eq!(outcome["attempts"], 2);
    let schedule = write_file(&dir, "schedule.json", &stdout);

    let (code, stdout, stderr) = run_cli(dir.path(), &["validate", &request, &schedule]);
    assert_eq!(code, 0, "validate failed: {stdout}{stderr}");
    assert_eq!(stdout.trim(), "ok");
}

#[test]
fn test_intake_and_stored_schedule() {
    let dir = TempDir::new().unwrap();

    let (code, stdout, _) = run_cli(
        dir.path(),
        &["task", "add", "Essay", "--deadline", "2025-10-24 18:00", "--hours", "3", "--strict"],
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("w1"));

    let (code, stdout, _) = run_cli(
        dir.path(),
        &["event", "add", "Lecture", "--start", "2025-10-20 12:00", "--end", "2025-10-20 14:00"],
    );
    assert_eq!(code, 0);
    assert!(stdout.contains("e1"));

    let (code, stdout, _) = run_cli(dir.path(), &["task", "list", "--json"]);
    assert_eq!(code, 0);
    let tasks: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(tasks[0]["title"], "Essay");
    assert_eq!(tasks[0]["strictness"], "strict");

    let (code, stdout, stderr) = run_cli(
        dir.path(),
        &["schedule", "generate", "--now", "2025-10-20 00:00", "--save"],
    );
    assert_eq!(code, 0, "generate failed: {stderr}");
    // 3h in sessions of at most 2h, around the lecture
    assert!(stdout.starts_with("w1, 2025-10-20 14:00, 2025-10-20 16:00\n"));
    assert!(stderr.contains("saved schedule"));

    let (code, stdout, _) = run_cli(dir.path(), &["schedule", "show"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("w1, 2025-10-20 14:00, 2025-10-20 16:00"));
}

#[test]
fn test_show_without_runs() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["schedule", "show"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("no stored schedule"));
}

#[test]
fn test_config_get_set() {
    let dir = TempDir::new().unwrap();

    let (code, stdout, _) = run_cli(dir.path(), &["config", "get", "caps.weekday_hours"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3.0");

    let (code, _, _) = run_cli(dir.path(), &["config", "set", "caps.weekday_hours", "4"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "caps.weekday_hours"]);
    assert_eq!(stdout.trim(), "4.0");
    assert!(dir.path().join("config.toml").exists());

    let (code, _, stderr) = run_cli(dir.path(), &["config", "set", "caps.monthly_hours", "4"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("monthly_hours"));

    let (code, _, _) = run_cli(dir.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (_, stdout, _) = run_cli(dir.path(), &["config", "get", "caps.weekday_hours"]);
    assert_eq!(stdout.trim(), "3.0");
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(dir.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("timetable"));
}
