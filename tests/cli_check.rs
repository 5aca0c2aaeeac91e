//! CLI tests for the offline `check` command and startup validation.

mod common;

use assert_cmd::Command;
use common::temp_config_file;
use predicates::prelude::*;

fn deployer() -> Command {
    let mut cmd = Command::cargo_bin("k8s-cd-deployer").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("K8S_CD_DEPLOYER_LOG_LEVEL")
        .env_remove("K8S_CD_DEPLOYER_NAMESPACE_REGEX")
        .env_remove("K8S_CD_DEPLOYER_IMAGE_REGEX");
    cmd
}

#[test]
fn test_check_deployable_tag_with_defaults() {
    deployer()
        .args([
            "--config",
            "does-not-exist.yaml",
            "check",
            "gcr.io/project/app:INT",
            "--namespace",
            "svc-int",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("deployable = yes"))
        .stdout(predicate::str::contains("eligible = yes"))
        .stdout(predicate::str::contains("restart = yes"));
}

#[test]
fn test_missing_config_file_is_reported() {
    deployer()
        .args(["--config", "does-not-exist.yaml", "check", "repo/app:INT"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Config file not found at does-not-exist.yaml, using defaults",
        ));
}

#[test]
fn test_existing_config_file_is_not_reported_missing() {
    let (_dir, path) = temp_config_file("server:\n  enabled: false\n");

    deployer()
        .args(["--config", path.to_str().unwrap(), "check", "repo/app:INT"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config file not found").not());
}

#[test]
fn test_check_undeployable_tag() {
    deployer()
        .args([
            "--config",
            "does-not-exist.yaml",
            "check",
            "gcr.io/project/app:PROD",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("deployable = no"));
}

#[test]
fn test_check_uses_configured_patterns() {
    let (_dir, path) = temp_config_file(
        r#"
policy:
  namespace_pattern: "staging"
  image_pattern: ".*:latest"
"#,
    );

    deployer()
        .args([
            "--config",
            path.to_str().unwrap(),
            "check",
            "repo/app:latest",
            "--namespace",
            "staging-2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("deployable = yes"))
        .stdout(predicate::str::contains("eligible = no"));
}

#[test]
fn test_malformed_pattern_fails_startup() {
    let (_dir, path) = temp_config_file(
        r#"
policy:
  namespace_pattern: "([unclosed"
"#,
    );

    deployer()
        .args(["--config", path.to_str().unwrap(), "check", "repo/app:INT"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("namespace_pattern"));
}

#[test]
fn test_restart_requires_tag() {
    deployer().arg("restart").assert().failure();
}
