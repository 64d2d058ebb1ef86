//! Integration tests for the repflow binary.
//!
//! These tests verify end-to-end behavior including:
//! - Simulated and stdin-driven sessions
//! - Summary logging, history and CSV export
//! - Program planning and validation

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

/// CLI isolated from the user's real config
fn cli(home: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("repflow"));
    cmd.env("XDG_CONFIG_HOME", home.join("config"))
        .env_remove("RUST_LOG");
    cmd
}

fn json_lines(stdout: &[u8]) -> Vec<Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).expect("stdout line is not JSON"))
        .collect()
}

const SQUAT_TOML: &str = r#"
name = "Squat day"

[[blocks]]
[blocks.kind]
type = "simple"

[[blocks.kind.items]]
exercise = { id = "back_squat", name = "Back Squat" }

[[blocks.kind.items.sets]]
kind = { type = "reps", target_reps = 5 }
load = { weight = 100.0 }

[[blocks.kind.items.sets]]
kind = { type = "reps", target_reps = 5 }
load = { weight = 100.0 }

[[blocks]]
[blocks.kind]
type = "rest"
rest_seconds = 60
"#;

const BAD_CLUSTER_JSON: &str = r#"{
    "name": "Broken clusters",
    "blocks": [{
        "kind": {
            "type": "method",
            "method": "cluster",
            "items": [{
                "exercise": { "id": "deadlift", "name": "Deadlift" },
                "sets": [{
                    "kind": { "type": "reps", "target_reps": 10 },
                    "cluster": { "cluster_size": 3, "min_percentage": 90.0, "max_percentage": 80.0 }
                }]
            }]
        }
    }]
}"#;

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Workout program execution engine"));
}

#[test]
fn test_list_builtins() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("tabata"))
        .stdout(predicate::str::contains("Lower Body Strength"));
}

#[test]
fn test_simulated_run_logs_summary() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");

    cli(temp_dir.path())
        .args(["run", "--builtin", "strength", "--simulate", "--countdown", "0"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("SESSION COMPLETE"))
        .stdout(predicate::str::contains("Session logged"));

    let wal = fs::read_to_string(data_dir.join("wal/sessions.wal")).expect("Failed to read WAL");
    assert_eq!(wal.lines().count(), 1);
    let summary: Value = serde_json::from_str(wal.trim()).unwrap();
    assert_eq!(summary["program_name"], "Lower Body Strength");
    // 3 squat sets + 3 RDL + 3 lunge
    assert_eq!(summary["set_records"].as_array().unwrap().len(), 9);
}

#[test]
fn test_simulated_tabata_json_events() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");

    let output = cli(temp_dir.path())
        .args(["run", "--builtin", "tabata", "--simulate", "--json", "--dry-run"])
        .args(["--countdown", "3"])
        .arg("--data-dir")
        .arg(&data_dir)
        .output()
        .unwrap();
    assert!(output.status.success());

    let lines = json_lines(&output.stdout);
    let rests = lines
        .iter()
        .filter(|l| l["event"] == "entered_rest")
        .count();
    // 2 rounds x 8 rests plus one recovery between rounds
    assert_eq!(rests, 17);

    let completed: Vec<_> = lines
        .iter()
        .filter(|l| l["event"] == "workout_completed")
        .collect();
    assert_eq!(completed.len(), 1);

    let summary = lines.last().unwrap();
    assert_eq!(summary["total_elapsed_seconds"], 2 * 8 * 30 + 60);
    assert!(!data_dir.join("wal/sessions.wal").exists());
}

#[test]
fn test_heart_rate_zone_accounting() {
    let temp_dir = setup_test_dir();

    let output = cli(temp_dir.path())
        .args(["run", "--builtin", "emom", "--simulate", "--json", "--dry-run"])
        .args(["--countdown", "0", "--heart-rate", "150"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary = json_lines(&output).pop().unwrap();
    // 150 bpm against the 190 fallback max is zone 3
    assert_eq!(summary["zone_durations"]["zone3"], 600);
    assert_eq!(summary["total_elapsed_seconds"], 600);
}

#[test]
fn test_stdin_driven_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");

    // Skip warm-up, confirm 3 squat sets, skip rest, skip 3 RDL sets, skip lunges
    cli(temp_dir.path())
        .args(["run", "--builtin", "strength", "--countdown", "0"])
        .arg("--data-dir")
        .arg(&data_dir)
        .write_stdin("n\nrpe 8\nc\nc\nc\nn\ns\ns\ns\nn\n")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("Sets: 3 done, 3 skipped"))
        .stdout(predicate::str::contains("Session logged"));

    assert!(data_dir.join("wal/sessions.wal").exists());
}

#[test]
fn test_quit_abandons_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");

    cli(temp_dir.path())
        .args(["run", "--builtin", "strength", "--countdown", "0"])
        .arg("--data-dir")
        .arg(&data_dir)
        .write_stdin("q\n")
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing logged"));

    assert!(!data_dir.join("wal/sessions.wal").exists());
}

#[test]
fn test_run_program_file() {
    let temp_dir = setup_test_dir();
    let program_path = temp_dir.path().join("squat.toml");
    fs::write(&program_path, SQUAT_TOML).unwrap();

    let output = cli(temp_dir.path())
        .arg("run")
        .arg(&program_path)
        .args(["--simulate", "--json", "--countdown", "0"])
        .arg("--data-dir")
        .arg(temp_dir.path().join("data"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary = json_lines(&output).pop().unwrap();
    assert_eq!(summary["program_name"], "Squat day");
    assert_eq!(summary["set_records"][1]["weight"], 100.0);
    // The trailing rest is the only ticking step
    assert_eq!(summary["total_elapsed_seconds"], 60);
}

#[test]
fn test_unknown_builtin_fails() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["run", "--builtin", "yoga", "--simulate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown built-in program"));
}

#[test]
fn test_run_requires_a_program() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path()).args(["run", "--simulate"]).assert().failure();
}

#[test]
fn test_plan_with_one_rep_max() {
    let temp_dir = setup_test_dir();
    let maxes = temp_dir.path().join("maxes.json");
    fs::write(&maxes, r#"{ "deadlift": 200.0 }"#).unwrap();

    cli(temp_dir.path())
        .args(["plan", "--builtin", "cluster"])
        .arg("--maxes")
        .arg(&maxes)
        .assert()
        .success()
        .stdout(predicate::str::contains("140 kg → 150 kg → 160 kg → 170 kg"));
}

#[test]
fn test_plan_without_maxes_shows_percentages() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["plan", "--builtin", "cluster"])
        .arg("--data-dir")
        .arg(temp_dir.path().join("data"))
        .assert()
        .success()
        .stdout(predicate::str::contains("70.0% → 75.0% → 80.0% → 85.0%"));
}

#[test]
fn test_plan_json() {
    let temp_dir = setup_test_dir();
    let output = cli(temp_dir.path())
        .args(["plan", "--builtin", "strength", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let plan: Value = serde_json::from_slice(&output).unwrap();
    let steps = plan["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 5);
    let sum: u64 = steps
        .iter()
        .map(|s| s["estimated_duration"].as_u64().unwrap())
        .sum();
    assert_eq!(plan["total_estimated_duration"].as_u64().unwrap(), sum);
}

#[test]
fn test_loads_wave() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["loads", "--reps", "10", "--cluster-size", "3"])
        .args(["--min", "70", "--max", "85", "--progression", "wave"])
        .args(["--one-rep-max", "200"])
        .assert()
        .success()
        .stdout(predicate::str::contains("10 reps in 4 clusters"))
        .stdout(predicate::str::contains("3. 3 reps @ 85.0% = 170 kg"))
        .stdout(predicate::str::contains("4. 1 reps @ 70.0% = 140 kg"));
}

#[test]
fn test_loads_rejects_bad_range() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["loads", "--reps", "10", "--cluster-size", "0", "--min", "70", "--max", "85"])
        .assert()
        .failure();

    cli(temp_dir.path())
        .args(["loads", "--reps", "10", "--cluster-size", "3", "--min", "90", "--max", "80"])
        .assert()
        .failure();
}

#[test]
fn test_validate_good_and_bad_programs() {
    let temp_dir = setup_test_dir();
    let good = temp_dir.path().join("squat.toml");
    let bad = temp_dir.path().join("bad.json");
    fs::write(&good, SQUAT_TOML).unwrap();
    fs::write(&bad, BAD_CLUSTER_JSON).unwrap();

    cli(temp_dir.path())
        .arg("validate")
        .arg(&good)
        .assert()
        .success()
        .stdout(predicate::str::contains("Squat day is valid (2 steps"));

    cli(temp_dir.path())
        .arg("validate")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicate::str::contains("min_percentage 90 is greater than max_percentage 80"));

    // An invalid file is also refused by run
    cli(temp_dir.path())
        .arg("run")
        .arg(&bad)
        .arg("--simulate")
        .assert()
        .failure();
}

#[test]
fn test_history() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");

    cli(temp_dir.path())
        .arg("history")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("No sessions logged yet"));

    for builtin in ["amrap", "rest_pause"] {
        cli(temp_dir.path())
            .args(["run", "--builtin", builtin, "--simulate", "--countdown", "0"])
            .arg("--data-dir")
            .arg(&data_dir)
            .assert()
            .success();
    }

    cli(temp_dir.path())
        .arg("history")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cindy"))
        .stdout(predicate::str::contains("Bench Rest-Pause"));
}

#[test]
fn test_export_archives_log() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");

    cli(temp_dir.path())
        .arg("export")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to export"));

    cli(temp_dir.path())
        .args(["run", "--builtin", "strength", "--simulate", "--countdown", "0"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    cli(temp_dir.path())
        .args(["export", "--cleanup"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 sessions (9 sets)"));

    assert!(data_dir.join("sessions.csv").exists());
    assert!(data_dir.join("sets.csv").exists());
    assert!(!data_dir.join("wal/sessions.wal").exists());
    assert!(!data_dir.join("wal/sessions.wal.processed").exists());

    let sets = fs::read_to_string(data_dir.join("sets.csv")).unwrap();
    assert_eq!(sets.lines().count(), 10);
    assert!(sets.contains("Back Squat"));
}

#[test]
fn test_config_theme_and_countdown() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("repflow.toml");
    fs::write(
        &config_path,
        "[session]\ncountdown_seconds = 0\n\n[motivation]\ntheme = \"coach\"\n",
    )
    .unwrap();

    cli(temp_dir.path())
        .args(["run", "--builtin", "emom", "--simulate", "--dry-run"])
        .arg("--config")
        .arg(&config_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("♪ [work] Move! Move! Move!"))
        .stdout(predicate::str::contains("Done! That's a wrap, champion!"));
}

#[test]
fn test_invalid_config_rejected() {
    let temp_dir = setup_test_dir();
    let config_path = temp_dir.path().join("repflow.toml");
    fs::write(&config_path, "[motivation]\nvolume = 2.5\n").unwrap();

    cli(temp_dir.path())
        .arg("list")
        .arg("--config")
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("volume"));
}
