//! End-to-end runs of the `tool` binary against scratch project directories.
#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const CONFIG: &str = "tool.config.toml";

fn tool(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tool"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("tool binary should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn start_runs_script_with_port() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(CONFIG),
        "port = 9999\nstart = \"echo Server will run on port {{port}} via $TOOL_PORT\"\n",
    )
    .unwrap();

    let output = tool(dir.path(), &["--start"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Server will run on port 9999 via 9999"));
    assert!(stderr(&output).contains("Starting the app"));
}

#[test]
fn missing_config_warns_and_prints_usage() {
    let dir = tempfile::tempdir().unwrap();

    let output = tool(dir.path(), &["--start"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("configuration file not found"));
    assert!(stdout(&output).contains("--start"));
}

#[test]
fn malformed_config_reports_cause() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(CONFIG), "start = \n").unwrap();

    let output = tool(dir.path(), &["--start"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("failed to load configuration"));
}

#[test]
fn config_without_start_lists_fields() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(CONFIG), "port = 1\nbuild = \"true\"\n").unwrap();

    let output = tool(dir.path(), &["--start"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("available fields: build, port"));
}

#[test]
fn failing_script_keeps_exit_code_zero() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(CONFIG), "start = \"exit 7\"\n").unwrap();

    let output = tool(dir.path(), &["--start"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("failed with exit code 7"));
}

#[test]
fn unknown_flag_prints_usage() {
    let dir = tempfile::tempdir().unwrap();

    let output = tool(dir.path(), &["--publish"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("--build"));
}

#[test]
fn build_flag_is_not_dispatched() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(CONFIG), "build = \"touch built\"\n").unwrap();

    let output = tool(dir.path(), &["--build"]);
    assert!(output.status.success());
    assert!(stderr(&output).contains("not dispatched"));
    assert!(!dir.path().join("built").exists());
}

#[test]
fn init_then_start_uses_example_config() {
    let dir = tempfile::tempdir().unwrap();

    let output = tool(dir.path(), &["--init", "--start"]);
    assert!(output.status.success());
    assert!(dir.path().join(CONFIG).exists());
    assert!(stdout(&output).contains("Server will run on port 9999"));

    let again = tool(dir.path(), &["--init"]);
    assert!(again.status.success());
    assert!(stderr(&again).contains("--force"));
}

#[test]
fn chdir_selects_project_directory() {
    let dir = tempfile::tempdir().unwrap();
    let project = dir.path().join("app");
    fs::create_dir(&project).unwrap();
    fs::write(project.join(CONFIG), "start = \"touch started\"\n").unwrap();

    let output = tool(dir.path(), &["-C", "app", "--start"]);
    assert!(output.status.success());
    assert!(project.join("started").exists());
}
