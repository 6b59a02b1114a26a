//! Integration tests for the lull binary.
//!
//! These tests verify end-to-end behavior including:
//! - Logging, editing and deleting events
//! - Persisted log layout and suppression bookkeeping
//! - Status output (human and JSON)
//! - CSV export

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI pinned to a data directory, a zone and an instant
fn cli_at(data_dir: &Path, now: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lull"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .arg("--timezone")
        .arg("UTC")
        .arg("--now")
        .arg(now);
    cmd
}

fn read_log(data_dir: &Path) -> Value {
    let contents = fs::read_to_string(data_dir.join("log.json")).expect("Failed to read log");
    serde_json::from_str(&contents).expect("log.json is not valid JSON")
}

fn status_json(data_dir: &Path, now: &str) -> Value {
    let output = cli_at(data_dir, now)
        .arg("status")
        .arg("--json")
        .output()
        .expect("Failed to run status");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("status --json is not valid JSON")
}

#[test]
fn test_cli_help() {
    Command::new(assert_cmd::cargo::cargo_bin!("lull"))
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Infant nap and bedtime planner"));
}

#[test]
fn test_log_persists_event() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli_at(data_dir, "2024-05-01T07:30:00Z")
        .args(["log", "first_awake", "--at", "07:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged FirstAwake at 07:00"));

    let log = read_log(data_dir);
    let events = log["eventLog"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "FirstAwake");
    assert_eq!(events[0]["timestampUtc"], "2024-05-01T07:00:00Z");
    assert_eq!(events[0]["autoPredicted"], false);
    assert!(log["autoSuppressed"].as_array().unwrap().is_empty());
}

#[test]
fn test_status_json_reports_wake_window() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli_at(data_dir, "2024-05-01T07:30:00Z")
        .args(["log", "first_awake", "--at", "07:00"])
        .assert()
        .success();

    let status = status_json(data_dir, "2024-05-01T07:30:00Z");
    assert_eq!(status["is_asleep"], false);
    assert_eq!(status["tier"], "low_stimulation");
    assert_eq!(status["wake_window"]["earliest"], "2024-05-01T08:15:00Z");
    assert_eq!(status["wake_window"]["latest"], "2024-05-01T09:00:00Z");
    assert_eq!(status["hard_stop"], "2024-05-01T19:00:00Z");
    assert_eq!(status["pressure"]["trend"], "up");
}

#[test]
fn test_default_command_shows_status() {
    let temp_dir = setup_test_dir();

    cli_at(temp_dir.path(), "2024-05-01T06:30:00Z")
        .assert()
        .success()
        .stdout(predicate::str::contains("AWAKE"))
        .stdout(predicate::str::contains("Shift rules"));
}

#[test]
fn test_empty_log_gets_predicted_first_awake() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli_at(data_dir, "2024-05-01T06:30:00Z")
        .arg("status")
        .assert()
        .success();

    let log = read_log(data_dir);
    let events = log["eventLog"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "FirstAwake");
    assert_eq!(events[0]["timestampUtc"], "2024-05-01T06:00:00Z");
    assert_eq!(events[0]["autoPredicted"], true);
}

#[test]
fn test_deleted_prediction_is_suppressed() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli_at(data_dir, "2024-05-01T10:00:00Z")
        .args(["log", "first_awake", "--at", "07:00"])
        .assert()
        .success();

    let log = read_log(data_dir);
    let milk = log["eventLog"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["type"] == "MilkGiven")
        .expect("baseline feed predicted")
        .clone();
    assert_eq!(milk["autoPredicted"], true);
    assert_eq!(milk["timestampUtc"], "2024-05-01T09:30:00Z");

    cli_at(data_dir, "2024-05-01T10:00:00Z")
        .args(["delete", milk["id"].as_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted MilkGiven at 09:30"));

    // A later clock tick must not bring the feed back
    cli_at(data_dir, "2024-05-01T14:00:00Z")
        .arg("status")
        .assert()
        .success();

    let log = read_log(data_dir);
    let suppressed = log["autoSuppressed"].as_array().unwrap();
    assert_eq!(suppressed.len(), 1);
    assert_eq!(suppressed[0]["type"], "MilkGiven");
    assert_eq!(suppressed[0]["timestampUtc"], "2024-05-01T09:30:00Z");
    assert!(!log["eventLog"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["type"] == "MilkGiven" && e["timestampUtc"] == "2024-05-01T09:30:00Z"));
}

#[test]
fn test_wake_logged_after_status_replaces_prediction() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli_at(data_dir, "2024-05-01T08:35:00Z")
        .arg("status")
        .assert()
        .success();

    cli_at(data_dir, "2024-05-01T08:40:00Z")
        .args(["log", "first_awake", "--at", "07:00"])
        .assert()
        .success();

    let log = read_log(data_dir);
    let events = log["eventLog"].as_array().unwrap();
    let naps: Vec<&Value> = events
        .iter()
        .filter(|e| e["type"] == "NapStarted")
        .collect();
    assert_eq!(naps.len(), 1);
    assert_eq!(naps[0]["timestampUtc"], "2024-05-01T08:15:00Z");
    assert!(!events
        .iter()
        .any(|e| e["timestampUtc"] == "2024-05-01T06:00:00Z"));
}

#[test]
fn test_deleted_first_awake_stays_deleted() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli_at(data_dir, "2024-05-01T06:30:00Z")
        .arg("status")
        .assert()
        .success();

    let log = read_log(data_dir);
    let wake_id = log["eventLog"][0]["id"].as_str().unwrap().to_string();

    cli_at(data_dir, "2024-05-01T06:30:00Z")
        .args(["delete", wake_id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted FirstAwake at 06:00"));

    let status = status_json(data_dir, "2024-05-01T06:35:00Z");
    assert_eq!(status["tier"], "not_calibrated");
    assert!(read_log(data_dir)["eventLog"].as_array().unwrap().is_empty());
}

#[test]
fn test_edit_prediction_makes_it_real() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    cli_at(data_dir, "2024-05-01T08:30:00Z")
        .args(["log", "first_awake", "--at", "07:00"])
        .assert()
        .success();

    let log = read_log(data_dir);
    let nap_id = log["eventLog"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["type"] == "NapStarted")
        .and_then(|e| e["id"].as_str())
        .expect("baseline nap predicted")
        .to_string();

    cli_at(data_dir, "2024-05-01T08:30:00Z")
        .args(["edit", nap_id.as_str(), "--at", "08:25"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved"));

    let log = read_log(data_dir);
    let nap = log["eventLog"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["id"] == nap_id.as_str())
        .unwrap()
        .clone();
    assert_eq!(nap["autoPredicted"], false);
    assert_eq!(nap["timestampUtc"], "2024-05-01T08:25:00Z");
    assert_eq!(log["autoSuppressed"][0]["timestampUtc"], "2024-05-01T08:15:00Z");
}

#[test]
fn test_unknown_id_is_noop() {
    let temp_dir = setup_test_dir();

    cli_at(temp_dir.path(), "2024-05-01T08:00:00Z")
        .args(["delete", "does-not-exist"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No event with id does-not-exist"));

    cli_at(temp_dir.path(), "2024-05-01T08:00:00Z")
        .args(["edit", "does-not-exist", "--at", "08:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No event with id"));
}

#[test]
fn test_invalid_event_type_fails() {
    let temp_dir = setup_test_dir();

    cli_at(temp_dir.path(), "2024-05-01T08:00:00Z")
        .args(["log", "bath"])
        .assert()
        .failure();
}

#[test]
fn test_invalid_time_fails() {
    let temp_dir = setup_test_dir();

    cli_at(temp_dir.path(), "2024-05-01T08:00:00Z")
        .args(["log", "milk", "--at", "after lunch"])
        .assert()
        .failure();
}

#[test]
fn test_late_nap_pulls_bedtime_forward() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let now = "2024-05-01T16:05:00Z";

    for (kind, at) in [
        ("first_awake", "07:00"),
        ("nap_started", "15:00"),
        ("nap_ended", "16:00"),
    ] {
        cli_at(data_dir, now)
            .args(["log", kind, "--at", at])
            .assert()
            .success();
    }

    let status = status_json(data_dir, now);
    assert_eq!(status["hard_stop"], "2024-05-01T18:30:00Z");
    let bedtime = status["shifts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["rule"] == "late_nap_bedtime_cap")
        .unwrap()
        .clone();
    assert_eq!(bedtime["status"], "applied");
}

#[test]
fn test_local_time_uses_timezone() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    Command::new(assert_cmd::cargo::cargo_bin!("lull"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(["--timezone", "America/New_York"])
        .args(["--now", "2024-05-01T12:00:00Z"])
        .args(["log", "first_awake", "--at", "07:00"])
        .assert()
        .success();

    let log = read_log(data_dir);
    let wake = log["eventLog"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["type"] == "FirstAwake")
        .unwrap()
        .clone();
    // 07:00 EDT
    assert_eq!(wake["timestampUtc"], "2024-05-01T11:00:00Z");
}

#[test]
fn test_list_marks_predictions() {
    let temp_dir = setup_test_dir();

    cli_at(temp_dir.path(), "2024-05-01T10:00:00Z")
        .args(["log", "first_awake", "--at", "07:00"])
        .assert()
        .success();

    cli_at(temp_dir.path(), "2024-05-01T10:00:00Z")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("FirstAwake"))
        .stdout(predicate::str::contains("[auto]"));
}

#[test]
fn test_export_writes_csv() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();
    let csv_path = data_dir.join("export.csv");

    cli_at(data_dir, "2024-05-01T10:00:00Z")
        .args(["log", "first_awake", "--at", "07:00"])
        .assert()
        .success();

    cli_at(data_dir, "2024-05-01T10:00:00Z")
        .arg("export")
        .arg("--out")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 4 events"));

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("id,event_type,timestamp_utc,local_date,local_time,auto_predicted"));
    assert_eq!(csv.lines().count(), 5);
}
