use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

fn cli(workdir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_formula_cli"));
    command
        .arg("--config")
        .arg(workdir.join("absent_config.json"))
        .arg("--state")
        .arg(workdir.join("formula_state.json"));
    command
}

fn fixture_file(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("stdout UTF-8");
    serde_json::from_str(stdout.trim()).expect("JSON payload on stdout")
}

#[test]
fn fit_linear_fixture_succeeds() {
    let dir = TempDir::new().unwrap();
    let output = cli(dir.path())
        .args(["fit", "--points", &fixture_file("linear_sg.json")])
        .output()
        .expect("failed to run formula_cli fit");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let json = stdout_json(&output);
    assert_eq!(json["accepted"], true);
    assert_eq!(
        json["formula"],
        "0.00000909*tilt^2+0.00124545*tilt+0.96445455"
    );
    assert_eq!(json["error"], "");
    assert_eq!(json["report"]["points"].as_array().map(Vec::len), Some(10));
    assert!(dir.path().join("formula_state.json").exists());
}

#[test]
fn fit_rejection_exits_with_two() {
    let dir = TempDir::new().unwrap();
    let output = cli(dir.path())
        .args([
            "fit",
            "--points",
            &fixture_file("field_sg.json"),
            "--max-deviation",
            "1.7",
        ])
        .output()
        .expect("failed to run rejected fit");
    assert_eq!(output.status.code(), Some(2));

    let json = stdout_json(&output);
    assert_eq!(json["accepted"], false);
    assert_eq!(json["formula"], "");
    assert_eq!(json["error_code"], 3002);
    assert!(json["error"]
        .as_str()
        .unwrap_or_default()
        .starts_with("Unable to find an accurate formula"));
}

#[test]
fn too_few_points_reports_insufficient_data() {
    let dir = TempDir::new().unwrap();
    let output = cli(dir.path())
        .args(["fit", "--points", &fixture_file("too_few.json")])
        .output()
        .expect("failed to run fit with too few points");
    assert_eq!(output.status.code(), Some(2));
    let json = stdout_json(&output);
    assert_eq!(json["error_code"], 3001);
    assert!(json.get("report").is_none());
}

#[test]
fn plato_unit_flag() {
    let dir = TempDir::new().unwrap();
    let output = cli(dir.path())
        .args([
            "fit",
            "--points",
            &fixture_file("linear_plato.json"),
            "--unit",
            "plato",
        ])
        .output()
        .expect("failed to run plato fit");
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["unit"], "P");
    assert_eq!(
        json["formula"],
        "0.00000913*tilt^2+0.00124188*tilt+0.96451759"
    );

    // The formula yields SG; the gravity command reports Plato again
    let gravity = Command::new(env!("CARGO_BIN_EXE_formula_cli"))
        .args(["--config", &plato_config(dir.path())])
        .arg("--state")
        .arg(dir.path().join("formula_state.json"))
        .args(["gravity", "--angle", "50"])
        .output()
        .expect("failed to run gravity");
    assert!(gravity.status.success());
    let json = stdout_json(&gravity);
    assert_eq!(json["unit"], "P");
    let plato = json["gravity"].as_f64().expect("gravity number");
    assert!((plato - 12.33).abs() < 1.0, "got {plato}");
}

fn plato_config(dir: &Path) -> String {
    let path = dir.join("plato_config.json");
    std::fs::write(&path, r#"{"gravity_unit": "P"}"#).expect("write config");
    path.to_string_lossy().into_owned()
}

#[test]
fn non_finite_threshold_is_an_error() {
    let dir = TempDir::new().unwrap();
    let output = cli(dir.path())
        .args([
            "fit",
            "--points",
            &fixture_file("field_sg.json"),
            "--max-deviation",
            "NaN",
        ])
        .output()
        .expect("failed to run fit with NaN threshold");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(
        stderr.contains("InvalidThreshold"),
        "expected threshold error, got {stderr}"
    );
    assert!(!dir.path().join("formula_state.json").exists());
}

#[test]
fn show_and_gravity_use_stored_formula() {
    let dir = TempDir::new().unwrap();
    let fit = cli(dir.path())
        .args(["fit", "--points", &fixture_file("linear_sg.json")])
        .output()
        .expect("failed to run fit");
    assert!(fit.status.success());

    let show = cli(dir.path())
        .arg("show")
        .output()
        .expect("failed to run show");
    assert!(show.status.success());
    let state = stdout_json(&show);
    assert_eq!(
        state["formula"],
        "0.00000909*tilt^2+0.00124545*tilt+0.96445455"
    );
    assert_eq!(state["error"], "");

    let gravity = cli(dir.path())
        .args(["gravity", "--angle", "30"])
        .output()
        .expect("failed to run gravity");
    assert!(gravity.status.success());
    let json = stdout_json(&gravity);
    let value = json["gravity"].as_f64().expect("gravity number");
    assert!((value - 1.01).abs() < 0.005, "got {value}");
    assert!(json.get("corrected").is_none());
}

#[test]
fn gravity_without_formula_exits_with_two() {
    let dir = TempDir::new().unwrap();
    let output = cli(dir.path())
        .args(["gravity", "--angle", "42"])
        .output()
        .expect("failed to run gravity");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(
        stderr.contains("No usable formula"),
        "expected hint in stderr, got {stderr}"
    );
}

#[test]
fn missing_points_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let output = cli(dir.path())
        .args(["fit", "--points", "does/not/exist.json"])
        .output()
        .expect("failed to run fit");
    assert_eq!(output.status.code(), Some(1));
}
