use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::tempdir;

fn write_records(path: &std::path::Path) {
    let lines = [
        json!({
            "userId": "user_abc",
            "timestamp": "2024-03-01T10:00:00Z",
            "siteIndex": 0,
            "website": "https://www.ikea.com",
            "selection": "Accept All",
            "timeSpent": 12
        }),
        json!({
            "userId": "user_abc",
            "timestamp": "2024-03-01T10:01:00Z",
            "siteIndex": 1,
            "website": "https://www.aa.com",
            "selection": "Reject All",
            "timeSpent": 30
        }),
    ];
    let contents: String = lines.iter().map(|l| format!("{l}\n")).collect();
    fs::write(path, contents).unwrap();
}

#[test]
fn test_records_prints_table() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.jsonl");
    write_records(&path);

    cargo_bin_cmd!("consent")
        .env("CONSENT_HOME", dir.path())
        .args(["records", "--path"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("User ID"))
        .stdout(predicate::str::contains("user_abc"))
        .stdout(predicate::str::contains("https://www.aa.com"))
        .stdout(predicate::str::contains("✓"))
        .stdout(predicate::str::contains("30s"))
        .stdout(predicate::str::contains("2 records in"));
}

#[test]
fn test_records_defaults_to_home_file() {
    let dir = tempdir().unwrap();
    write_records(&dir.path().join("records.jsonl"));

    cargo_bin_cmd!("consent")
        .env("CONSENT_HOME", dir.path())
        .arg("records")
        .assert()
        .success()
        .stdout(predicate::str::contains("2 records in"));
}

#[test]
fn test_records_empty_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records.jsonl");
    fs::write(&path, "\n").unwrap();

    cargo_bin_cmd!("consent")
        .env("CONSENT_HOME", dir.path())
        .args(["records", "--path"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("No records in"));
}

#[test]
fn test_records_missing_file_fails() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("consent")
        .env("CONSENT_HOME", dir.path())
        .arg("records")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read records"));
}
