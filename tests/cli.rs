// ABOUTME: CLI smoke tests using assert_cmd.
// ABOUTME: Exercises argument parsing, init, and config discovery errors.

use assert_cmd::Command;
use predicates::prelude::*;

fn cutover() -> Command {
    Command::cargo_bin("cutover").unwrap()
}

#[test]
fn help_lists_subcommands() {
    cutover()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("rollback"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn version_flag_works() {
    cutover().arg("--version").assert().success();
}

#[test]
fn status_without_config_fails() {
    let dir = tempfile::tempdir().unwrap();

    cutover()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file"));
}

#[test]
fn init_writes_a_parseable_config() {
    let dir = tempfile::tempdir().unwrap();

    cutover().current_dir(dir.path()).arg("init").assert().success();
    assert!(dir.path().join("cutover.yml").is_file());

    // Re-running without --force refuses to clobber.
    cutover()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    cutover()
        .current_dir(dir.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn deploy_rejects_invalid_revision_override() {
    let dir = tempfile::tempdir().unwrap();
    cutover().current_dir(dir.path()).arg("init").assert().success();

    cutover()
        .current_dir(dir.path())
        .args(["deploy", "--revision", "../escape"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn status_on_fresh_target_reports_no_current() {
    let dir = tempfile::tempdir().unwrap();
    let deploy_to = dir.path().join("srv");

    let config = format!(
        "deploy_to: {}\nrepo: git@example.com:org/app.git\nrevision: abc123\nruntime: \"3.2.0@app\"\nuser: deploy\n",
        deploy_to.display()
    );
    std::fs::write(dir.path().join("cutover.yml"), config).unwrap();

    cutover()
        .current_dir(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("current: (none)"))
        .stdout(predicate::str::contains("releases: 0"));
}
