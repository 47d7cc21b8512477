use std::path::PathBuf;
use std::process::{Command, Output};

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_loadshift-sim"))
        .args(args)
        .output()
        .expect("loadshift-sim process should run")
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("loadshift-sim-{}-{name}", std::process::id()))
}

fn manipulation_count(stdout: &str) -> usize {
    stdout
        .lines()
        .find_map(|line| line.strip_prefix("Manipulations:"))
        .and_then(|rest| rest.trim().parse().ok())
        .expect("report should list manipulations")
}

#[test]
fn clinic_scenario_shifts_the_mri_into_curtailment() {
    let devices_out = temp_path("clinic-devices.csv");
    let report_out = temp_path("clinic-report.json");
    let output = run(&[
        "--scenario",
        "scenarios/clinic.toml",
        "--devices-out",
        devices_out.to_str().expect("utf-8 temp path"),
        "--report-json",
        report_out.to_str().expect("utf-8 temp path"),
    ]);

    assert!(
        output.status.success(),
        "clinic run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    assert!(manipulation_count(&stdout) >= 1, "stdout={stdout}");

    let csv = std::fs::read_to_string(&devices_out).expect("device CSV written");
    let moved = csv
        .lines()
        .find(|line| line.starts_with("MRI,2020-06-01 10:30:00,"))
        .expect("MRI row at 10:30");
    let fields: Vec<&str> = moved.split(',').collect();
    assert_eq!(fields[5], "40.0000");
    assert_eq!(fields[6], "false");

    let raw = std::fs::read_to_string(&report_out).expect("JSON report written");
    let report: serde_json::Value = serde_json::from_str(&raw).expect("valid JSON");
    let first = &report["passes"][0];
    assert_eq!(first["device"], "MRI");
    assert_eq!(
        first["applied"][0],
        serde_json::json!({ "kind": "shifted", "clock": 10, "offset": 20 })
    );

    let _ = std::fs::remove_file(devices_out);
    let _ = std::fs::remove_file(report_out);
}

#[test]
fn demo_preset_prints_report_and_savings() {
    let output = run(&["--preset", "demo", "--seed", "3"]);
    assert!(
        output.status.success(),
        "demo run failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout should be valid UTF-8");
    assert!(stdout.contains("--- Curtailment Report ---"));
    assert!(stdout.contains("--- Savings ---"));
    assert!(manipulation_count(&stdout) >= 1, "stdout={stdout}");
}

#[test]
fn bad_arguments_exit_with_failure() {
    assert!(!run(&["--preset", "nowhere"]).status.success());
    assert!(!run(&["--seed", "minus-one"]).status.success());
    assert!(!run(&["--scenario", "scenarios/missing.toml"]).status.success());
}
