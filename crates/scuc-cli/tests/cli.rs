use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, to_string_pretty, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn single_bus() -> Value {
    json!({
        "Parameters": {"Time horizon (h)": 2},
        "Buses": {"b1": {"Load (MW)": [10, 20]}},
        "Generators": {
            "g1": {
                "Bus": "b1",
                "Production cost curve (MW)": [0, 30],
                "Production cost curve ($)": [0, 150]
            }
        }
    })
}

fn two_bus() -> Value {
    json!({
        "Parameters": {"Time horizon (h)": 1},
        "Buses": {
            "b1": {"Load (MW)": 0, "Reference bus?": true},
            "b2": {"Load (MW)": 40}
        },
        "Generators": {
            "g1": {
                "Bus": "b1",
                "Production cost curve (MW)": [0, 50],
                "Production cost curve ($)": [0, 500]
            }
        },
        "Transmission lines": {
            "l12": {
                "Source bus": "b1",
                "Target bus": "b2",
                "Reactance (ohms)": 0.1,
                "Normal flow limit (MW)": 100
            }
        }
    })
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, to_string_pretty(value).unwrap()).unwrap();
    path
}

fn scuc() -> Command {
    Command::cargo_bin("scuc").unwrap()
}

#[test]
fn solve_prints_solution_document() {
    let dir = tempdir().unwrap();
    let instance = write_json(dir.path(), "case.json", &single_bus());

    let output = scuc()
        .args(["solve", instance.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let document: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(document["Status"], "optimal");
    let objective = document["Objective value"].as_f64().unwrap();
    assert!((objective - 150.0).abs() < 1e-4);
}

#[test]
fn solve_writes_files_and_summary() {
    let dir = tempdir().unwrap();
    let instance = write_json(dir.path(), "case.json", &single_bus());
    let out = dir.path().join("solution.json");
    let csv = dir.path().join("schedule.csv");

    scuc()
        .args([
            "solve",
            instance.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--csv",
            csv.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Status").and(predicate::str::contains("optimal")));
    assert!(out.exists());
    let schedule = fs::read_to_string(&csv).unwrap();
    assert!(schedule.starts_with("generator,period"));
}

#[test]
fn infeasible_solve_exits_with_two() {
    let dir = tempdir().unwrap();
    let mut value = single_bus();
    value["Parameters"]["Power balance penalty ($/MW)"] = Value::Null;
    value["Buses"]["b1"]["Load (MW)"] = json!([10, 50]);
    let instance = write_json(dir.path(), "short.json", &value);

    scuc()
        .args(["solve", instance.to_str().unwrap()])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("infeasible"));
}

#[test]
fn unknown_backend_is_rejected() {
    let dir = tempdir().unwrap();
    let instance = write_json(dir.path(), "case.json", &single_bus());

    scuc()
        .args(["solve", instance.to_str().unwrap(), "--backend", "cplex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown solver backend"));
}

#[test]
fn oversized_time_limit_is_rejected() {
    let dir = tempdir().unwrap();
    let instance = write_json(dir.path(), "case.json", &single_bus());

    scuc()
        .args(["solve", instance.to_str().unwrap(), "--time-limit", "1e20"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("too large"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempdir().unwrap();
    let instance = write_json(dir.path(), "case.json", &single_bus());
    let config = dir.path().join("scuc.toml");
    fs::write(&config, "[formulation]\ncost_segments = 0\n").unwrap();

    scuc()
        .args([
            "--config",
            config.to_str().unwrap(),
            "solve",
            instance.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cost_segments"));
}

#[test]
fn build_writes_lp_file() {
    let dir = tempdir().unwrap();
    let instance = write_json(dir.path(), "grid.json", &two_bus());
    let lp = dir.path().join("model.lp");

    scuc()
        .args(["build", instance.to_str().unwrap(), "-o", lp.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Binaries"));
    let text = fs::read_to_string(&lp).unwrap();
    assert!(text.contains("Minimize"));
}

#[test]
fn validate_reports_dangling_bus() {
    let dir = tempdir().unwrap();
    let mut value = single_bus();
    value["Generators"]["g1"]["Bus"] = json!("b9");
    let instance = write_json(dir.path(), "bad.json", &value);

    scuc()
        .args(["validate", instance.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("b9"));
}

#[test]
fn validate_accepts_clean_instance() {
    let dir = tempdir().unwrap();
    let instance = write_json(dir.path(), "case.json", &single_bus());

    scuc()
        .args(["validate", instance.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues"));
}

#[test]
fn factors_feed_back_into_solve() {
    let dir = tempdir().unwrap();
    let instance = write_json(dir.path(), "grid.json", &two_bus());
    let factors = dir.path().join("factors.json");

    scuc()
        .args([
            "factors",
            instance.to_str().unwrap(),
            "-o",
            factors.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ISF (1 x 2)"));
    assert!(factors.exists());

    let output = scuc()
        .args([
            "solve",
            instance.to_str().unwrap(),
            "--factors",
            factors.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let document: Value = serde_json::from_slice(&output.stdout).unwrap();
    let objective = document["Objective value"].as_f64().unwrap();
    assert!((objective - 400.0).abs() < 1e-4);
}
