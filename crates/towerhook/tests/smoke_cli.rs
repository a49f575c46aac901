//! CLI-only smoke tests that don't require a container runtime.

use anyhow::Result;
use assert_cmd::Command;
use predicates::str;

const MISSING_RUNTIME: &str = "/nonexistent/towerhook-test/docker";

#[test]
fn smoke_cli_help_lists_subcommands() -> Result<()> {
    let mut cmd = Command::cargo_bin("towerhook")?;
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(str::contains("run"))
        .stdout(str::contains("inspect"));
    Ok(())
}

#[test]
fn smoke_cli_version() -> Result<()> {
    let mut cmd = Command::cargo_bin("towerhook")?;
    cmd.arg("--version");
    cmd.assert().success().stdout(str::contains("towerhook"));
    Ok(())
}

#[test]
fn smoke_cli_run_help_mentions_labels() -> Result<()> {
    let mut cmd = Command::cargo_bin("towerhook")?;
    cmd.args(["run", "--help"]);
    cmd.assert()
        .success()
        .stdout(str::contains("com.centurylinklabs.watchtower.lifecycle"));
    Ok(())
}

#[test]
fn smoke_cli_unknown_phase_rejected() -> Result<()> {
    let mut cmd = Command::cargo_bin("towerhook")?;
    cmd.args(["run", "mid-update", "web"]);
    cmd.assert()
        .failure()
        .stderr(str::contains("invalid value 'mid-update'"));
    Ok(())
}

#[test]
fn smoke_cli_pre_update_fails_without_runtime() -> Result<()> {
    let mut cmd = Command::cargo_bin("towerhook")?;
    cmd.args(["run", "pre-update", "abc", "--runtime-path", MISSING_RUNTIME]);
    cmd.assert()
        .failure()
        .stderr(str::contains("not installed"));
    Ok(())
}

#[test]
fn smoke_cli_post_update_swallows_lookup_failure() -> Result<()> {
    let mut cmd = Command::cargo_bin("towerhook")?;
    cmd.env_remove("TOWERHOOK_LOG")
        .env_remove("RUST_LOG")
        .args(["run", "post-update", "abc", "--runtime-path", MISSING_RUNTIME]);
    cmd.assert().success().stderr(str::contains("abc"));
    Ok(())
}

#[test]
fn smoke_cli_inspect_fails_without_runtime() -> Result<()> {
    let mut cmd = Command::cargo_bin("towerhook")?;
    cmd.args(["inspect", "abc", "--runtime-path", MISSING_RUNTIME]);
    cmd.assert()
        .failure()
        .stderr(str::contains("Failed to inspect container abc"));
    Ok(())
}
