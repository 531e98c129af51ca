//! Integration tests for the `homeboard` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Runs in an empty directory so no stray `homeboard.toml` or `.env` applies.
fn cli(dir: &TempDir) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_homeboard"));
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove("HOMEBOARD_TIMEZONE");
    cmd
}

fn write_input(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

// ============ EXPAND ============

#[test]
fn test_expand_whole_day_series() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args([
            "expand",
            "--rule",
            "RRULE:FREQ=DAILY;COUNT=3",
            "--anchor",
            "2023-10-01",
            "--from",
            "2023-10-01",
            "--to",
            "2023-10-05",
        ])
        .assert()
        .success()
        .stdout("2023-10-01\n2023-10-02\n2023-10-03\n");
}

#[test]
fn test_expand_timed_series_in_civil_timezone() {
    let dir = TempDir::new().unwrap();
    let output = cli(&dir)
        .args([
            "expand",
            "--rule",
            "RRULE:FREQ=WEEKLY",
            "--anchor",
            "2023-10-01T00:00:00Z",
            "--from",
            "2023-10-01",
            "--to",
            "2023-10-29",
        ])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "2023-10-01T02:00:00+02:00");
    assert_eq!(lines[3], "2023-10-22T02:00:00+02:00");
}

#[test]
fn test_expand_respects_configured_timezone() {
    let dir = TempDir::new().unwrap();
    let config = write_input(&dir, "utc.toml", "timezone = \"UTC\"\n");
    cli(&dir)
        .args([
            "--config",
            config.to_str().unwrap(),
            "expand",
            "--rule",
            "FREQ=DAILY;COUNT=1",
            "--anchor",
            "2024-06-01T08:00:00Z",
            "--from",
            "2024-06-01",
            "--to",
            "2024-06-02",
        ])
        .assert()
        .success()
        .stdout("2024-06-01T08:00:00+00:00\n");
}

#[test]
fn test_expand_malformed_rule_fails() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args([
            "expand",
            "--rule",
            "RRULE:FREQ=WEEKLY;INTERVAL",
            "--anchor",
            "2023-10-01",
            "--from",
            "2023-10-01",
            "--to",
            "2023-10-05",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_expand_rejects_bad_window_date() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args([
            "expand",
            "--rule",
            "FREQ=DAILY",
            "--anchor",
            "2023-10-01",
            "--from",
            "01.10.2023",
            "--to",
            "2023-10-05",
        ])
        .assert()
        .failure();
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args([
            "--config",
            "absent.toml",
            "expand",
            "--rule",
            "FREQ=DAILY",
            "--anchor",
            "2023-10-01",
            "--from",
            "2023-10-01",
            "--to",
            "2023-10-01",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load configuration"));
}

// ============ CALENDAR ============

const EVENTS: &str = r#"{
    "items": [
        {
            "id": "training",
            "summary": "Training",
            "start": {"dateTime": "2023-09-26T17:00:00+02:00"},
            "end": {"dateTime": "2023-09-26T18:30:00+02:00"},
            "recurrence": ["RRULE:FREQ=WEEKLY"]
        },
        {
            "summary": "Herbstferien",
            "start": {"date": "2023-10-02"},
            "end": {"date": "2023-10-07"}
        }
    ]
}"#;

#[test]
fn test_calendar_lists_configured_days() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "events.json", EVENTS);
    cli(&dir)
        .arg("calendar")
        .arg(&input)
        .args(["--today", "2023-10-01"])
        .assert()
        .success()
        .stdout(
            "02.10.2023 (Mo.) - 06.10.2023 (Fr.)\tganztägig\tHerbstferien\n\
             03.10.2023 (Di.)\t17:00-18:30\tTraining\n\
             10.10.2023 (Di.)\t17:00-18:30\tTraining\n",
        );
}

#[test]
fn test_calendar_days_from_config() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "events.json", EVENTS);
    let config = write_input(&dir, "short.toml", "[calendar]\ndays_to_show = 3\n");
    cli(&dir)
        .arg("--config")
        .arg(&config)
        .arg("calendar")
        .arg(&input)
        .args(["--today", "2023-10-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("03.10.2023").and(predicate::str::contains("10.10.2023").not()));
}

// ============ SUBSTITUTION ============

const PLAN: &str = r#"{
    "date": "2023-10-02",
    "version": "2023-10-02T07:15:42",
    "infos": [],
    "events": [
        {"classes": ["5a"], "lessons": [1], "previousSubject": "M", "subject": "D",
         "previousRoom": "", "room": "", "previousTeacher": "", "teacher": "",
         "texts": ["Vertretung", ""]},
        {"classes": ["5a"], "lessons": [0], "previousSubject": "", "subject": "",
         "previousRoom": "", "room": "", "previousTeacher": "", "teacher": "",
         "texts": ["Buch mitbringen", ""]},
        {"classes": ["7c"], "lessons": [5], "previousSubject": "SP", "subject": "",
         "previousRoom": "", "room": "", "previousTeacher": "", "teacher": "",
         "texts": ["", "x"]}
    ]
}"#;

#[test]
fn test_substitution_merges_orphan_rows() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "plan.json", PLAN);
    let output = cli(&dir).arg("substitution").arg(&input).output().unwrap();

    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let events = plan["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["comment"], "Vertretung Buch mitbringen");
    assert_eq!(events[1]["canceled"], true);
}

#[test]
fn test_substitution_class_filter_from_stdin() {
    let dir = TempDir::new().unwrap();
    let output = cli(&dir)
        .args(["substitution", "-", "--class", "7c"])
        .write_stdin(PLAN)
        .output()
        .unwrap();

    assert!(output.status.success());
    let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let events = plan["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["classes"], "7c");
}

#[test]
fn test_substitution_invalid_json_fails() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .arg("substitution")
        .write_stdin("{not json")
        .assert()
        .failure();
}

// ============ WASTE ============

const COLLECTIONS: &str = r#"[
    {"id": 1, "bezirk": {"id": 10, "name": "R2", "gueltigAb": null, "fraktionId": 0}, "datum": "2023-10-12"},
    {"id": 2, "bezirk": {"id": 11, "name": "P1", "gueltigAb": null, "fraktionId": 1}, "datum": "2023-10-04"},
    {"id": 3, "bezirk": {"id": 12, "name": "G3", "gueltigAb": null, "fraktionId": 2}, "datum": "2023-10-06"},
    {"id": 4, "bezirk": {"id": 13, "name": "B1", "gueltigAb": null, "fraktionId": 3}, "datum": "2023-09-28"}
]"#;

#[test]
fn test_waste_upcoming() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "waste.json", COLLECTIONS);
    cli(&dir)
        .arg("waste")
        .arg(&input)
        .args(["--today", "2023-10-02"])
        .assert()
        .success()
        .stdout("2023-10-04\tPapier\n2023-10-06\tGelbe Tonne\n2023-10-12\tRestmüll\n");
}

#[test]
fn test_waste_this_week() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "waste.json", COLLECTIONS);
    cli(&dir)
        .arg("waste")
        .arg(&input)
        .args(["--today", "2023-10-02", "--week"])
        .assert()
        .success()
        .stdout("2023-10-04\tPapier\n2023-10-06\tGelbe Tonne\n");
}

#[test]
fn test_waste_due_within_alert_days() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "waste.json", COLLECTIONS);
    let config = write_input(&dir, "alert.toml", "[waste]\nalert_days = 2\n");
    cli(&dir)
        .arg("--config")
        .arg(&config)
        .arg("waste")
        .arg(&input)
        .args(["--today", "2023-10-02", "--alert"])
        .assert()
        .success()
        .stdout("2023-10-04\tPapier\n");
}

#[test]
fn test_waste_week_and_alert_conflict() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["waste", "-", "--today", "2023-10-02", "--week", "--alert"])
        .assert()
        .failure();
}

// ============ BOOKING ============

fn booking_page(summary: &str) -> String {
    format!(
        "<html><body><details><summary id=\"suggest_location_summary\">{summary}</summary></details></body></html>"
    )
}

#[test]
fn test_booking_announces_near_slot() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "page.html",
        &booking_page("Nächster Termin ab 05.10.2023, 08:30 Uhr"),
    );
    cli(&dir)
        .arg("booking")
        .arg(&input)
        .args(["--today", "2023-10-02"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Nächster freier Termin für 3 Dokumente: 05.10.2023 um 08:30",
        ));
}

#[test]
fn test_booking_slot_outside_timeframe() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "page.html",
        &booking_page("Nächster Termin ab 05.10.2023, 08:30 Uhr"),
    );
    cli(&dir)
        .arg("booking")
        .arg(&input)
        .args(["--today", "2023-10-02", "--days", "2"])
        .assert()
        .success()
        .stdout("no free appointment within 2 days (next: 05.10.2023 08:30)\n");
}

#[test]
fn test_booking_page_without_summary_fails() {
    let dir = TempDir::new().unwrap();
    cli(&dir)
        .args(["booking", "-", "--today", "2023-10-02"])
        .write_stdin("<html><body>Wartungsarbeiten</body></html>")
        .assert()
        .failure();
}
