use assert_cmd::Command;
use predicates::boolean::PredicateBooleanExt;
use predicates::str::contains;
use std::fs;
use tempfile::tempdir;

fn svcctl() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("svcctl"))
}

#[test]
fn help_lists_the_commands() {
    svcctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("install").and(contains("uninstall")).and(contains("restart")));
}

#[test]
fn invalid_timeout_is_rejected() {
    let temp = tempdir().expect("failed to create tempdir");
    svcctl()
        .current_dir(temp.path())
        .args(["start", "svc", "--timeout", "soon"])
        .assert()
        .failure()
        .stderr(contains("Invalid duration value"));
}

#[test]
fn install_without_manifest_fails() {
    let temp = tempdir().expect("failed to create tempdir");
    svcctl()
        .current_dir(temp.path())
        .args(["install", "-c", "missing.yaml"])
        .assert()
        .failure()
        .stderr(contains("missing.yaml"));
}

#[test]
fn malformed_manifest_is_reported() {
    let temp = tempdir().expect("failed to create tempdir");
    fs::write(temp.path().join("services.yaml"), "version: [1\n").expect("write manifest");

    svcctl()
        .current_dir(temp.path())
        .args(["status", "svc"])
        .assert()
        .failure()
        .stderr(contains("Invalid YAML format"));
}

#[test]
fn undeclared_service_cannot_be_installed() {
    let temp = tempdir().expect("failed to create tempdir");
    fs::write(
        temp.path().join("services.yaml"),
        r#"version: "1"
services:
  agent:
    exe_path: agent.exe
"#,
    )
    .expect("write manifest");

    svcctl()
        .current_dir(temp.path())
        .args(["install", "-s", "other"])
        .assert()
        .failure()
        .stderr(contains("'other' is not declared"));
}

#[cfg(not(windows))]
#[test]
fn control_commands_fail_off_windows() {
    let temp = tempdir().expect("failed to create tempdir");
    for args in [
        vec!["status", "svc"],
        vec!["start", "svc"],
        vec!["uninstall", "svc"],
    ] {
        svcctl()
            .current_dir(temp.path())
            .args(&args)
            .assert()
            .failure()
            .stderr(contains("only supported on Windows"));
    }
}
