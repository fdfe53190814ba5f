//! CLI 冒烟测试

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn cli() -> Command {
    Command::cargo_bin("bigbot-cli").unwrap()
}

#[test]
fn test_help_lists_options() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--sim-obstacle"))
        .stdout(predicate::str::contains("--match-duration"));
}

#[test]
fn test_invalid_color_is_rejected() {
    cli()
        .arg("green")
        .assert()
        .failure()
        .stderr(predicate::str::contains("green"));
}

#[test]
fn test_invalid_obstacle_script_is_rejected() {
    cli()
        .args(["yellow", "--sim-obstacle", "soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("AT:FOR"));
}

#[test]
fn test_unknown_config_key_fails() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[match]\nduration_s = 10\nturbo = true").unwrap();

    cli()
        .arg("yellow")
        .arg("--config")
        .arg(file.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_oversized_match_duration_fails_cleanly() {
    cli()
        .args(["yellow", "--no-start-switch", "--match-duration", "1e30"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Invalid configuration"))
        .stdout(predicate::str::contains("match.duration_s"));
}

#[test]
fn test_unknown_sequence_fails() {
    cli()
        .args(["blue", "--no-start-switch", "--sequence", "victory_dance"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Unknown sequence"));
}

#[test]
fn test_short_sequence_runs_to_completion() {
    cli()
        .args(["blue", "42", "--no-start-switch", "--sequence", "wheel_test"])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("All sequences done"));
}

#[test]
fn test_match_duration_ends_match() {
    cli()
        .args([
            "yellow",
            "--no-start-switch",
            "--match-duration",
            "0.3",
            "--sim-obstacle",
            "0.1:0.1",
        ])
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success()
        .stdout(predicate::str::contains("Match ended"));
}
