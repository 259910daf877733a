//! Smoke tests for the `karta` binary.

use std::fs;
use std::str;

use assert_cmd::Command;
use rstest::{fixture, rstest};
use tempfile::TempDir;

const CHECKOUT: &str = "@shop\nFeature: Checkout\n  Iterations: 5\n  IterationPolicy: one scenario per iteration\n  @card\n  Scenario: Card\n    Probability: 40%\n    Given a customer\n      { \"name\": $random_string(8) }\n    Then the order is placed\n  Scenario: Voucher\n    Probability: 60%\n    Given a voucher\n    Then the order is placed\n";

#[fixture]
#[expect(clippy::expect_used, reason = "fixture setup failures should abort the test")]
fn workspace() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::create_dir_all(dir.path().join("nested")).expect("nested dir");
    fs::write(dir.path().join("checkout.kriya"), CHECKOUT).expect("write feature");
    dir
}

#[expect(clippy::expect_used, reason = "the binary is built for integration tests")]
fn karta() -> Command {
    let mut command = Command::cargo_bin("karta").expect("binary exists");
    command.env_remove("KARTA_LOG_LEVEL");
    command
}

#[rstest]
#[expect(clippy::expect_used, reason = "output is UTF-8")]
fn check_accepts_valid_features(workspace: TempDir) {
    let output = karta().arg("check").arg(workspace.path()).output().expect("runs");
    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).expect("utf8");
    assert!(stdout.contains("checkout.kriya (2 scenario(s))"), "{stdout}");
}

#[rstest]
#[expect(clippy::expect_used, reason = "output is UTF-8")]
fn check_fails_on_broken_features(workspace: TempDir) {
    fs::write(
        workspace.path().join("nested/broken.kriya"),
        "Feature: Broken\n  Scenario: S\n    Given x\n      { a: 1 ; }\n",
    )
    .expect("write feature");
    let output = karta().arg("check").arg(workspace.path()).output().expect("runs");
    assert!(!output.status.success());
    let stdout = str::from_utf8(&output.stdout).expect("utf8");
    assert!(stdout.contains("error "), "{stdout}");
    let stderr = str::from_utf8(&output.stderr).expect("utf8");
    assert!(stderr.contains("1 of 2 feature file(s) failed to load"), "{stderr}");
}

#[rstest]
#[expect(clippy::expect_used, reason = "compiled output is valid YAML")]
fn compiled_yaml_checks_again(workspace: TempDir) {
    let output = karta()
        .args(["compile", "--format", "yaml"])
        .arg(workspace.path().join("checkout.kriya"))
        .output()
        .expect("runs");
    assert!(output.status.success());
    let yaml = workspace.path().join("nested/checkout.yaml");
    fs::write(&yaml, &output.stdout).expect("write yaml");
    karta().arg("check").arg(&yaml).assert().success();
}

#[rstest]
#[expect(clippy::expect_used, reason = "output is UTF-8")]
fn scenarios_honour_tag_filters(workspace: TempDir) {
    let output = karta()
        .args(["scenarios", "--tags", "card"])
        .arg(workspace.path())
        .output()
        .expect("runs");
    assert!(output.status.success());
    let stdout = str::from_utf8(&output.stdout).expect("utf8");
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.starts_with("Checkout :: Card ("), "{stdout}");
}

#[rstest]
fn invalid_log_levels_are_rejected(workspace: TempDir) {
    karta()
        .env("KARTA_LOG_LEVEL", "shouty")
        .arg("check")
        .arg(workspace.path())
        .assert()
        .failure();
    karta()
        .args(["--log-level", "shouty", "check"])
        .arg(workspace.path())
        .assert()
        .failure();
}
