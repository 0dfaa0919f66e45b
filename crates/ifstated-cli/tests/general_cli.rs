//! Argument-handling and exit-code tests that don't require live netlink
//! access.

use assert_cmd::Command;
use predicates::prelude::*;

fn cli_command() -> Command {
    Command::cargo_bin("ifstated").expect("failed to find ifstated binary")
}

#[test]
fn help_mentions_config_flag() {
    let mut cmd = cli_command();
    cmd.arg("--help");
    cmd.assert().success().stdout(predicate::str::contains("--config"));
}

#[test]
fn missing_config_file_exits_config_malformed() {
    let mut cmd = cli_command();
    cmd.args(["--config", "/nonexistent/ifstated.yaml", "--check"]);
    cmd.assert().code(2);
}

#[test]
fn empty_config_exits_link_no_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ifstated.yaml");
    std::fs::write(&path, "namespaces: {}\n").unwrap();

    let mut cmd = cli_command();
    cmd.args(["--config", path.to_str().unwrap(), "--check"]);
    cmd.assert().code(5);
}

#[test]
fn apply_and_check_are_mutually_exclusive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ifstated.yaml");
    std::fs::write(&path, "namespaces: {}\n").unwrap();

    let mut cmd = cli_command();
    cmd.args(["--config", path.to_str().unwrap(), "--apply", "--check"]);
    cmd.assert().failure().stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn malformed_vrrp_selector_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ifstated.yaml");
    std::fs::write(&path, "namespaces: {}\n").unwrap();

    let mut cmd = cli_command();
    cmd.args(["--config", path.to_str().unwrap(), "--check", "--vrrp", "bogus"]);
    cmd.assert().failure();
}
