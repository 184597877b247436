//! CLI command integration tests.
//! Each test uses a temp directory via RV_DATA_DIR for full isolation.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// One denominator and a 3x3 grid: 16 streams per pass.
const SMALL_SWEEP: &str = r#"
[sweep]
denominator_min = 1
denominator_max = 1

[sweep.grid]
min = -1.0
max = 1.0
step = 1.0
decimals = 0
"#;

const STREAM: [&str; 8] = [
    "--denominator",
    "2",
    "--re",
    "1.0",
    "--im",
    "1.0",
    "--direction",
    "contracting",
];

fn rv_cmd(data_dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("rv").unwrap();
    cmd.env("RV_DATA_DIR", data_dir.path());
    cmd
}

fn write_config(data_dir: &TempDir, content: &str) {
    std::fs::write(data_dir.path().join("rv.toml"), content).unwrap();
}

fn extract_stat_value<'a>(output: &'a str, key: &str) -> &'a str {
    output
        .lines()
        .find(|l| l.starts_with(key))
        .and_then(|l| l.split_once(':'))
        .map(|(_, v)| v.trim())
        .unwrap_or("")
}

#[test]
fn stats_fresh_store() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("backend:     sqlite"))
        .stdout(predicate::str::contains("snapshots:   0"));
}

#[test]
fn generate_then_show() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .arg("generate")
        .args(STREAM)
        .args(["--places", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("n:           7"))
        .stdout(predicate::str::contains("coordinates: 28"));

    rv_cmd(&dir)
        .arg("show")
        .args(STREAM)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "key:         contracting/angle=piDividedBy2/alpha=1.0+1.0i",
        ))
        .stdout(predicate::str::contains("places:      3"));
}

#[test]
fn generate_is_resumed_not_repeated() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .arg("generate")
        .args(STREAM)
        .args(["--places", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("n:           3"));

    rv_cmd(&dir)
        .arg("generate")
        .args(STREAM)
        .args(["--places", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("n:           15"))
        .stdout(predicate::str::contains("coordinates: 60"));
}

#[test]
fn show_frame_prints_prefix() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .arg("generate")
        .args(STREAM)
        .args(["--places", "3"])
        .assert()
        .success();

    let output = rv_cmd(&dir)
        .arg("show")
        .args(STREAM)
        .args(["--frame", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 12);
    assert_eq!(lines[0], "0.5,-0.5,blue");
    assert!(lines[1].ends_with(",red"));
    for line in &lines {
        assert_eq!(line.split(',').count(), 3, "{line}");
    }
}

#[test]
fn show_missing_snapshot_fails() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .arg("show")
        .args(STREAM)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no snapshot"));
}

#[test]
fn zero_denominator_rejected() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .args(["generate", "--denominator", "0", "--re", "1.0", "--im", "1.0"])
        .args(["--places", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("denominator"));

    rv_cmd(&dir)
        .args(["deltas", "--denominator", "0"])
        .assert()
        .failure();
}

#[test]
fn non_finite_base_rejected() {
    let dir = TempDir::new().unwrap();
    for (re, im) in [("NaN", "1.0"), ("1.0", "inf")] {
        rv_cmd(&dir)
            .args(["generate", "--denominator", "2", "--re", re, "--im", im])
            .args(["--places", "2"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("finite"));
    }
    rv_cmd(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("snapshots:   0"));
}

#[test]
fn generate_zero_places_is_empty() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .arg("generate")
        .args(STREAM)
        .args(["--places", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("n:           0"))
        .stdout(predicate::str::contains("coordinates: 0"));
}

#[test]
fn zero_floor_base_resumes() {
    let dir = TempDir::new().unwrap();
    let zero = [
        "--denominator",
        "1",
        "--re",
        "0.0",
        "--im",
        "0.0",
        "--direction",
        "contracting",
    ];
    rv_cmd(&dir)
        .arg("generate")
        .args(zero)
        .args(["--places", "11"])
        .assert()
        .success()
        .stdout(predicate::str::contains("n:           2047"));

    // `show` reads the snapshot strictly and fails if it does not decode.
    rv_cmd(&dir)
        .arg("show")
        .args(zero)
        .assert()
        .success()
        .stdout(predicate::str::contains("n:           2047"));
}

#[test]
fn unknown_direction_rejected() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .args(["generate", "--denominator", "2", "--re", "1.0", "--im", "1.0"])
        .args(["--direction", "sideways", "--places", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sideways"));
}

#[test]
fn negative_arguments_accepted() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .args(["generate", "--denominator", "-3", "--re", "-0.5", "--im", "-0.5"])
        .args(["--direction", "Expanding", "--places", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("coordinates: 18"));
}

#[test]
fn deltas_lists_palette() {
    let dir = TempDir::new().unwrap();
    let output = rv_cmd(&dir)
        .args(["deltas", "--denominator", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("1+0i"));
    assert!(lines[0].ends_with("blue"));
    assert!(lines[3].ends_with("orange"));
}

#[test]
fn sweep_rounds_then_stats() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, SMALL_SWEEP);

    let output = rv_cmd(&dir)
        .args(["sweep", "--rounds", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(extract_stat_value(&stdout, "rounds:"), "2");
    assert_eq!(extract_stat_value(&stdout, "streams:"), "32");
    // Pass one reaches n=1, pass two n=3.
    assert_eq!(extract_stat_value(&stdout, "advances:"), "48");
    assert!(!stdout.contains("interrupted"));

    let output = rv_cmd(&dir).arg("stats").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(extract_stat_value(&stdout, "snapshots:"), "16");
    // 16 streams, n=3, 2 branches each.
    assert_eq!(extract_stat_value(&stdout, "coordinates:"), "96");
}

#[test]
fn sweep_skips_finished_streams() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, SMALL_SWEEP);

    rv_cmd(&dir)
        .args(["sweep", "--rounds", "1", "--start-places", "2"])
        .assert()
        .success();

    let output = rv_cmd(&dir)
        .args(["sweep", "--rounds", "1", "--start-places", "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(extract_stat_value(&stdout, "advances:"), "0");
}

#[test]
fn files_backend_layout() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .args(["--backend", "files", "generate"])
        .args(STREAM)
        .args(["--places", "3"])
        .assert()
        .success();

    let snapshot = dir
        .path()
        .join("snapshots")
        .join("contracting")
        .join("angle=piDividedBy2")
        .join("alpha=1.0+1.0i")
        .join("coordinates.json");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snapshot).unwrap()).unwrap();
    assert_eq!(json["n"], 7);
    assert_eq!(json["x_data"].as_array().unwrap().len(), 28);
    assert_eq!(json["colors"][0], "blue");
}

#[test]
fn ledger_written_when_configured() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "backend = \"files\"\nledger = true\n");
    rv_cmd(&dir)
        .arg("generate")
        .args(STREAM)
        .args(["--places", "2"])
        .assert()
        .success();

    let ledger = dir
        .path()
        .join("snapshots")
        .join("contracting")
        .join("angle=piDividedBy2")
        .join("alpha=1.0+1.0i")
        .join("coordinates.txt");
    let content = std::fs::read_to_string(ledger).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next(), Some("n, binary, revolving, gaussian, color"));
    assert_eq!(lines.count(), 3 * 4);
}

#[test]
fn backends_agree() {
    let dir = TempDir::new().unwrap();
    let mut outputs = Vec::new();
    for backend in ["sqlite", "files"] {
        rv_cmd(&dir)
            .args(["--backend", backend, "generate"])
            .args(STREAM)
            .args(["--places", "3"])
            .assert()
            .success();
        let output = rv_cmd(&dir)
            .args(["--backend", backend, "show"])
            .args(STREAM)
            .args(["--frame", "3"])
            .output()
            .unwrap();
        assert!(output.status.success());
        outputs.push(output.stdout);
    }
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn reset_deletes_snapshot() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .arg("generate")
        .args(STREAM)
        .args(["--places", "1"])
        .assert()
        .success();

    rv_cmd(&dir)
        .arg("reset")
        .args(STREAM)
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted"));

    rv_cmd(&dir)
        .arg("reset")
        .args(STREAM)
        .assert()
        .success()
        .stdout(predicate::str::contains("no snapshot"));
}

#[test]
fn invalid_config_reported() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "backend = \"tape\"\n");
    rv_cmd(&dir)
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}

#[test]
fn explicit_config_must_exist() {
    let dir = TempDir::new().unwrap();
    rv_cmd(&dir)
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .arg("stats")
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));
}
