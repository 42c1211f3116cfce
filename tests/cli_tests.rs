//! CLI surface tests (offline; no statement is processed far enough to
//! hit the ECB feed).

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_describes_the_tool() {
    let mut cmd = Command::cargo_bin("tobcalc").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Belgian TOB calculator"));
}

#[test]
fn requires_at_least_one_input_file() {
    let mut cmd = Command::cargo_bin("tobcalc").unwrap();
    cmd.assert().failure();
}

#[test]
fn missing_input_file_fails_with_context() {
    let mut cmd = Command::cargo_bin("tobcalc").unwrap();
    cmd.arg("/nonexistent/statement.txt")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}
