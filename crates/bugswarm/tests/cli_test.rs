//! Integration tests for the `bugswarm` CLI binary.
//!
//! Cover argument parsing, help output, completions, and the config
//! commands, all without a live BUGswarm server.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// `bugswarm` with env isolation: config lives under `config_home`.
fn bugswarm_cmd(config_home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("bugswarm");
    cmd.env("HOME", config_home)
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("BUGSWARM_PROFILE")
        .env_remove("BUGSWARM_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Write `contents` where the binary expects its config file.
fn write_config(config_home: &Path, contents: &str) -> std::path::PathBuf {
    let dir = config_home.join("bugswarm");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_usage() {
    let home = tempfile::tempdir().unwrap();
    let output = bugswarm_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("Usage"));
}

#[test]
fn help_lists_commands() {
    let home = tempfile::tempdir().unwrap();
    bugswarm_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("run")
                .and(predicate::str::contains("swarms"))
                .and(predicate::str::contains("invitations"))
                .and(predicate::str::contains("config")),
        );
}

#[test]
fn version_flag() {
    let home = tempfile::tempdir().unwrap();
    bugswarm_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bugswarm"));
}

#[test]
fn completions_bash() {
    let home = tempfile::tempdir().unwrap();
    bugswarm_cmd(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Argument errors ─────────────────────────────────────────────────

#[test]
fn invalid_subcommand() {
    let home = tempfile::tempdir().unwrap();
    bugswarm_cmd(home.path())
        .arg("frobnicate")
        .assert()
        .code(2);
}

#[test]
fn invalid_output_format() {
    let home = tempfile::tempdir().unwrap();
    bugswarm_cmd(home.path())
        .args(["--output", "xml", "config", "path"])
        .assert()
        .code(2);
}

#[test]
fn binary_feed_requires_name_and_path() {
    let home = tempfile::tempdir().unwrap();
    bugswarm_cmd(home.path())
        .args(["run", "--binary-feed", "snapshot"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("NAME=PATH"));
}

// ── Profiles ────────────────────────────────────────────────────────

#[test]
fn missing_profile_exits_not_found() {
    let home = tempfile::tempdir().unwrap();
    let output = bugswarm_cmd(home.path())
        .args(["swarms", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("Profile 'default' not found"));
}

#[test]
fn config_path_points_into_config_home() {
    let home = tempfile::tempdir().unwrap();
    bugswarm_cmd(home.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_show_redacts_keys() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        r#"
[profiles.default]
username = "alice"
configuration_key = "topsecret-config"
participation_key = "topsecret-part"
"#,
    );

    bugswarm_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("alice")
                .and(predicate::str::contains("topsecret").not()),
        );
}

#[test]
fn config_set_writes_profile() {
    let home = tempfile::tempdir().unwrap();
    let path = write_config(home.path(), "[profiles.lab]\nusername = \"alice\"\n");

    bugswarm_cmd(home.path())
        .args(["--profile", "lab", "config", "set", "messaging_port", "5222"])
        .assert()
        .success();

    let written = std::fs::read_to_string(path).unwrap();
    assert!(written.contains("messaging_port = 5222"));
    assert!(written.contains("username = \"alice\""));
}

#[test]
fn config_use_unknown_profile_fails() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "[profiles.lab]\nusername = \"alice\"\n");

    let output = bugswarm_cmd(home.path())
        .args(["config", "use", "garage"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(4));
    assert!(combined_output(&output).contains("garage"));
}

#[test]
fn config_profiles_marks_default() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        "default_profile = \"lab\"\n[profiles.lab]\n[profiles.garage]\n",
    );

    bugswarm_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lab *").and(predicate::str::contains("garage")));
}
