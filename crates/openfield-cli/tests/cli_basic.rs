//! Basic CLI E2E tests.
//!
//! Tests invoke the built `openfield` binary and verify outputs. Each test
//! points OPENFIELD_CONFIG at its own temp dir so the user's config is
//! never touched.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command with `config` as config file and return
/// (stdout, stderr, exit code).
fn run_cli(config: &Path, args: &[&str], stdin: Option<&str>) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_openfield"))
        .args(args)
        .env("OPENFIELD_CONFIG", config)
        .env_remove("OPENFIELD_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");

    {
        let mut pipe = child.stdin.take().expect("stdin is piped");
        if let Some(input) = stdin {
            pipe.write_all(input.as_bytes()).expect("write stdin");
        }
    }

    let output = child.wait_with_output().expect("CLI did not finish");
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

fn write_script(dir: &Path, body: &str) -> String {
    let path = dir.join("trial.script");
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_replay_scenario_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let script = write_script(
        dir.path(),
        "0 press corner\n4 release corner\n4 press center\n10 stop\n",
    );
    let (stdout, stderr, code) = run_cli(
        &config,
        &["replay", &script, "--animal-id", "A1", "--duration", "10"],
        None,
    );
    assert_eq!(code, 0, "replay failed: {stderr}");
    assert!(stdout.starts_with("--- Open Field Test Report ---"));
    assert!(stdout.contains("Animal ID: A1"));
    assert!(stdout.contains("Scheduled Duration: 10 seconds"));
    assert!(stdout.contains("Effective Duration: 10.00 seconds"));
    assert!(stdout.contains("  Corner: 4.00 seconds (40.00%)"));
    assert!(stdout.contains("  Lateral: 0.00 seconds (0.00%)"));
    assert!(stdout.contains("  Center: 6.00 seconds (60.00%)"));
}

#[test]
fn test_replay_json_and_export() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let script = write_script(dir.path(), "1 press lateral\n3 release lateral\n");
    let export = dir.path().join("out.txt");
    let (stdout, stderr, code) = run_cli(
        &config,
        &[
            "replay",
            &script,
            "--animal-id",
            "R2",
            "--duration",
            "5",
            "--json",
            "--export",
            export.to_str().unwrap(),
            "--format",
            "text",
        ],
        None,
    );
    assert_eq!(code, 0, "replay failed: {stderr}");
    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["animal_id"], "R2");
    assert_eq!(report["stop_reason"], "auto_expired");
    assert_eq!(report["effective_duration_secs"], 5.0);
    assert_eq!(report["per_zone"]["lateral"]["seconds"], 2.0);

    let exported = std::fs::read_to_string(&export).unwrap();
    assert!(exported.contains("  Lateral: 2.00 seconds (40.00%)"));
}

#[test]
fn test_replay_save_to_configured_directory() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let reports = dir.path().join("reports").join("cohort1");
    let (_, _, code) = run_cli(
        &config,
        &["config", "set", "export.directory", reports.to_str().unwrap()],
        None,
    );
    assert_eq!(code, 0);

    let script = write_script(dir.path(), "0 press center\n2 stop\n");
    let (_, stderr, code) = run_cli(
        &config,
        &["replay", &script, "--animal-id", "S1", "--duration", "10", "--save", "--format", "json"],
        None,
    );
    assert_eq!(code, 0, "replay failed: {stderr}");
    let saved: Vec<_> = std::fs::read_dir(&reports).unwrap().collect();
    assert_eq!(saved.len(), 1);
    let name = saved[0].as_ref().unwrap().file_name();
    let name = name.to_string_lossy();
    assert!(name.starts_with("openfield_S1_") && name.ends_with(".json"), "{name}");
}

#[test]
fn test_replay_events() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let script = write_script(dir.path(), "0 press corner\n1 press center\n2 stop\n");
    let (stdout, stderr, code) = run_cli(
        &config,
        &["replay", &script, "--animal-id", "E1", "--duration", "10", "--events", "--json"],
        None,
    );
    assert_eq!(code, 0, "replay failed: {stderr}");
    let types: Vec<String> = stdout
        .lines()
        .take(4)
        .map(|line| {
            let event: serde_json::Value = serde_json::from_str(line).unwrap();
            event["type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        types,
        ["TrialStarted", "ZoneEntered", "ZoneSwitched", "TrialStopped"]
    );
}

#[test]
fn test_replay_rejects_missing_animal_id() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let script = write_script(dir.path(), "0 stop\n");
    let (_, stderr, code) = run_cli(
        &config,
        &["replay", &script, "--animal-id", " ", "--duration", "10"],
        None,
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("animal id is required"));
}

#[test]
fn test_replay_rejects_bad_duration() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let script = write_script(dir.path(), "0 stop\n");
    let (_, stderr, code) = run_cli(
        &config,
        &["replay", &script, "--animal-id", "A1", "--duration=-5"],
        None,
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("invalid trial duration '-5'"));
}

#[test]
fn test_run_stops_when_input_closes() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let (stdout, stderr, code) = run_cli(
        &config,
        &["run", "--animal-id", "LIVE1", "--duration", "60"],
        Some("c\nm\ns\n"),
    );
    assert_eq!(code, 0, "run failed: {stderr}");
    assert!(stdout.contains("Animal ID: LIVE1"));
    assert!(stdout.contains("Scheduled Duration: 60 seconds"));
    assert!(stderr.contains("Trial for LIVE1 finished!"));
}

#[test]
fn test_config_set_get() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");

    let (stdout, _, code) = run_cli(&config, &["config", "get", "trial.default_duration_secs"], None);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "300");

    let (_, _, code) = run_cli(&config, &["config", "set", "trial.default_duration_secs", "120"], None);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(&config, &["config", "get", "trial.default_duration_secs"], None);
    assert_eq!(stdout.trim(), "120");

    let (_, stderr, code) = run_cli(&config, &["config", "set", "trial.tick_interval_ms", "fast"], None);
    assert_ne!(code, 0);
    assert!(stderr.contains("trial.tick_interval_ms"));

    let (_, _, code) = run_cli(&config, &["config", "get", "nope.key"], None);
    assert_ne!(code, 0);
}

#[test]
fn test_config_list_and_reset() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    run_cli(&config, &["config", "set", "export.format", "json"], None);

    let (stdout, _, code) = run_cli(&config, &["config", "list"], None);
    assert_eq!(code, 0);
    let listed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(listed["export"]["format"], "json");

    let (_, _, code) = run_cli(&config, &["config", "reset"], None);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(&config, &["config", "get", "export.format"], None);
    assert_eq!(stdout.trim(), "text");
}
