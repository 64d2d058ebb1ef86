//! Concurrency tests for the summary log.
//!
//! Several repflow processes appending to the same log must never interleave
//! or lose lines (fs2 exclusive locks).

use assert_cmd::Command;
use serde_json::Value;
use std::path::Path;
use std::thread;
use tempfile::TempDir;

fn cli(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repflow"));
    cmd.env("XDG_CONFIG_HOME", home.join("config"));
    cmd
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_parallel_runs_append_every_summary() {
    let temp_dir = setup_test_dir();
    let home = temp_dir.path().to_path_buf();
    let data_dir = temp_dir.path().join("data");

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let home = home.clone();
            let data_dir = data_dir.clone();
            thread::spawn(move || {
                let builtin = if i % 2 == 0 { "rest_pause" } else { "cluster" };
                cli(&home)
                    .args(["run", "--builtin", builtin, "--simulate", "--countdown", "0"])
                    .arg("--data-dir")
                    .arg(&data_dir)
                    .assert()
                    .success();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("run thread panicked");
    }

    let wal = std::fs::read_to_string(data_dir.join("wal/sessions.wal")).expect("Failed to read WAL");
    let lines: Vec<&str> = wal.lines().filter(|l| !l.trim().is_empty()).collect();
    assert_eq!(lines.len(), 6, "Expected 6 summaries, got {}", lines.len());

    for line in lines {
        let summary: Value = serde_json::from_str(line).expect("Interleaved or truncated line");
        assert!(summary["id"].is_string());
    }
}

#[test]
fn test_history_while_runs_append() {
    let temp_dir = setup_test_dir();
    let home = temp_dir.path().to_path_buf();
    let data_dir = temp_dir.path().join("data");

    let writer = {
        let home = home.clone();
        let data_dir = data_dir.clone();
        thread::spawn(move || {
            for _ in 0..3 {
                cli(&home)
                    .args(["run", "--builtin", "rest_pause", "--simulate", "--countdown", "0"])
                    .arg("--data-dir")
                    .arg(&data_dir)
                    .assert()
                    .success();
            }
        })
    };

    // Readers take a shared lock and never see a partial line
    for _ in 0..3 {
        cli(&home)
            .arg("history")
            .arg("--data-dir")
            .arg(&data_dir)
            .assert()
            .success();
    }

    writer.join().expect("writer thread panicked");

    let out = cli(&home)
        .args(["history", "--limit", "10"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&out);
    assert_eq!(text.matches("Bench Rest-Pause").count(), 3);
}
