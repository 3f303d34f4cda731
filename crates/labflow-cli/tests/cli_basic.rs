//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own data directory.

use std::io::Write;
use std::process::{Command, Stdio};

use tempfile::TempDir;

struct Cli {
    home: TempDir,
}

impl Cli {
    fn new() -> Self {
        Self {
            home: tempfile::tempdir().expect("create temp home"),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_labflow"));
        cmd.args(args)
            .env("LABFLOW_HOME", self.home.path())
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run a command and return (stdout, stderr, exit code).
    fn run(&self, args: &[&str]) -> (String, String, i32) {
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .expect("Failed to execute CLI command");
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    fn run_with_input(&self, args: &[&str], input: &str) -> (String, String, i32) {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn CLI");
        child
            .stdin
            .take()
            .unwrap()
            .write_all(input.as_bytes())
            .unwrap();
        let output = child.wait_with_output().unwrap();
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code().unwrap_or(-1),
        )
    }

    fn define_field_scan(&self) {
        let (_, err, code) = self.run(&[
            "define",
            "scan",
            "--step",
            "set-field target={field}",
            "--step",
            "wait seconds=0",
        ]);
        assert_eq!(code, 0, "define failed: {err}");
    }
}

// ============================================================================
// Actions
// ============================================================================

#[test]
fn test_actions_list() {
    let cli = Cli::new();
    let (out, _, code) = cli.run(&["actions"]);
    assert_eq!(code, 0);
    assert!(out.contains("set-field target=<float> [device=cryo-01]"));
    assert!(out.contains("wait seconds=<float>"));
}

#[test]
fn test_actions_json() {
    let cli = Cli::new();
    let (out, _, code) = cli.run(&["actions", "set-laser-power", "--json"]);
    assert_eq!(code, 0);
    let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed[0]["name"], "set-laser-power");
}

#[test]
fn test_run_action() {
    let cli = Cli::new();
    let (out, err, code) = cli.run(&["run", "set-field", "target=0.5"]);
    assert_eq!(code, 0, "stderr: {err}");
    assert!(out.contains("ok set-field target=0.5 device=cryo-01"));
}

#[test]
fn test_run_unknown_action() {
    let cli = Cli::new();
    let (_, err, code) = cli.run(&["run", "warp-drive"]);
    assert_eq!(code, 1);
    assert!(err.contains("Action 'warp-drive' not found"));
}

#[test]
fn test_run_bad_value() {
    let cli = Cli::new();
    let (_, err, code) = cli.run(&["run", "set-field", "target=abc"]);
    assert_eq!(code, 1);
    assert!(err.contains("expects float"));
}

#[test]
fn test_run_handler_failure() {
    let cli = Cli::new();
    let (out, _, code) = cli.run(&["run", "set-field", "target=9"]);
    assert_eq!(code, 1);
    assert!(out.contains("FAILED set-field"));
}

// ============================================================================
// Recipes
// ============================================================================

#[test]
fn test_define_and_show() {
    let cli = Cli::new();
    cli.define_field_scan();

    let (out, _, code) = cli.run(&["recipe", "list"]);
    assert_eq!(code, 0);
    assert!(out.contains("scan (2 step(s)) [field]"));

    let (out, _, code) = cli.run(&["recipe", "show", "scan"]);
    assert_eq!(code, 0);
    assert!(out.contains("1. set-field target={field}"));
    assert!(out.contains("Valid."));
}

#[test]
fn test_define_rejects_unknown_action() {
    let cli = Cli::new();
    let (_, err, code) = cli.run(&["define", "bad", "--step", "warp-drive speed=9"]);
    assert_eq!(code, 1);
    assert!(err.contains("Unknown action 'warp-drive'"));

    let (out, _, _) = cli.run(&["recipe", "list"]);
    assert!(out.contains("No recipes found."));
}

#[test]
fn test_define_interactive() {
    let cli = Cli::new();
    let (out, err, code) =
        cli.run_with_input(&["define", "power"], "set-laser-power\n{p}\n\nfinish\n");
    assert_eq!(code, 0, "stderr: {err}");
    assert!(out.contains("Saved recipe 'power' (1 step(s))."));
    assert!(out.contains("Loop variables: p"));
}

#[test]
fn test_recipe_rename_and_remove() {
    let cli = Cli::new();
    cli.define_field_scan();

    let (_, _, code) = cli.run(&["recipe", "rename", "scan", "field-scan"]);
    assert_eq!(code, 0);
    let (_, err, code) = cli.run(&["recipe", "remove", "scan"]);
    assert_eq!(code, 1);
    assert!(err.contains("Recipe 'scan' not found"));
    let (_, _, code) = cli.run(&["recipe", "remove", "field-scan"]);
    assert_eq!(code, 0);
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_run_loop() {
    let cli = Cli::new();
    cli.define_field_scan();

    let (out, err, code) = cli.run(&[
        "run-loop", "scan", "--variable", "field", "--start", "0", "--end", "0.2", "--step",
        "0.1", "--yes",
    ]);
    assert_eq!(code, 0, "stderr: {err}");
    assert!(out.contains("[3/3] field=0.2"));
    assert!(out.contains("ok set-field target=0.1"));
    assert!(out.contains("Completed 3 of 3 iteration(s): 3 ok, 0 failed, 6 invocation(s)."));
}

#[test]
fn test_run_loop_json() {
    let cli = Cli::new();
    cli.define_field_scan();

    let (out, _, code) = cli.run(&[
        "run-loop", "scan", "--variable", "field", "--start", "1", "--end", "0", "--step",
        "-0.5", "--yes", "--json",
    ]);
    assert_eq!(code, 0);
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["outcome"], "completed");
    assert_eq!(report["iterations"].as_array().unwrap().len(), 3);
}

#[test]
fn test_run_loop_wrong_direction() {
    let cli = Cli::new();
    cli.define_field_scan();

    let (out, err, code) = cli.run(&[
        "run-loop", "scan", "--variable", "field", "--start", "0", "--end", "1", "--step",
        "-0.1", "--yes",
    ]);
    assert_eq!(code, 1);
    assert!(err.contains("never reaches"));
    assert!(!out.contains("set-field"));
}

#[test]
fn test_run_loop_aborts_on_failure() {
    let cli = Cli::new();
    cli.define_field_scan();

    let (out, _, code) = cli.run(&[
        "run-loop", "scan", "--variable", "field", "--start", "6", "--end", "9", "--step", "1",
        "--yes",
    ]);
    assert_eq!(code, 1);
    assert!(out.contains("Aborted at iteration 3 of 4"));
    assert!(!out.contains("[4/4]"));
}

#[test]
fn test_run_loop_skip_iteration() {
    let cli = Cli::new();
    cli.define_field_scan();

    let (out, _, code) = cli.run(&[
        "run-loop", "scan", "--variable", "field", "--start", "6", "--end", "9", "--step", "1",
        "--policy", "skip-iteration", "--yes",
    ]);
    assert_eq!(code, 1);
    assert!(out.contains("Completed 4 of 4 iteration(s): 2 ok, 2 failed"));
}

#[test]
fn test_run_loop_declined() {
    let cli = Cli::new();
    cli.define_field_scan();

    let (out, _, code) = cli.run_with_input(
        &["run-loop", "scan", "--variable", "field", "--start", "0", "--end", "1", "--step", "1"],
        "n\n",
    );
    assert_eq!(code, 0);
    assert!(out.contains("Not started."));
}

#[test]
fn test_run_multi() {
    let cli = Cli::new();
    cli.define_field_scan();
    let (_, _, code) = cli.run(&["define", "power", "--step", "set-laser-power power={p}"]);
    assert_eq!(code, 0);

    let (out, err, code) = cli.run(&[
        "run-multi", "scan", "power", "--var", "field=0,0.1", "--var", "p=1:3:1", "--yes",
    ]);
    assert_eq!(code, 0, "stderr: {err}");
    assert!(err.contains("axes differ in length"));
    assert!(out.contains("[3/3] field=0.1 p=3"));
    assert!(out.contains("9 invocation(s)"));
}

// ============================================================================
// Devices and config
// ============================================================================

#[test]
fn test_status() {
    let cli = Cli::new();
    let (out, _, code) = cli.run(&["status"]);
    assert_eq!(code, 0);
    assert!(out.contains("laser-01"));
    assert!(out.contains("cryo-01"));
}

#[test]
fn test_inspect_unknown_device() {
    let cli = Cli::new();
    let (_, err, code) = cli.run(&["inspect", "nope"]);
    assert_eq!(code, 1);
    assert!(err.contains("Device 'nope' not found"));
}

#[test]
fn test_config_get_set() {
    let cli = Cli::new();
    let (out, _, code) = cli.run(&["config", "get", "loop.failure_policy"]);
    assert_eq!(code, 0);
    assert_eq!(out.trim(), "abort-loop");

    let (_, _, code) = cli.run(&["config", "set", "loop.failure_policy", "skip-iteration"]);
    assert_eq!(code, 0);
    let (out, _, _) = cli.run(&["config", "get", "loop.failure_policy"]);
    assert_eq!(out.trim(), "skip-iteration");

    let (_, _, code) = cli.run(&["config", "get", "no.such.key"]);
    assert_eq!(code, 1);
}

#[test]
fn test_config_rejects_out_of_range_timeout() {
    let cli = Cli::new();
    let (_, err, code) = cli.run(&["config", "set", "invoker.default_timeout_secs", "1e30"]);
    assert_eq!(code, 1);
    assert!(err.contains("invoker.default_timeout_secs"));

    let (out, _, code) = cli.run(&["run", "wait", "seconds=0"]);
    assert_eq!(code, 0);
    assert!(out.contains("ok wait"));
}

#[test]
fn test_run_multi_rejects_out_of_range_delay() {
    let cli = Cli::new();
    cli.define_field_scan();
    let (_, err, code) = cli.run(&[
        "run-multi", "scan", "--var", "field=0,0.1", "--delay", "1e30", "--yes",
    ]);
    assert_eq!(code, 1);
    assert!(err.contains("invalid delay"));
}

// ============================================================================
// Shell and completions
// ============================================================================

#[test]
fn test_shell_shares_context() {
    let cli = Cli::new();
    let (out, err, code) = cli.run_with_input(
        &["shell"],
        "run set-var name=x value=1\nrun warp-drive\nrun note message=hello\nexit\n",
    );
    assert_eq!(code, 0);
    assert!(out.contains("ok set-var name=x value=1"));
    assert!(err.contains("Action 'warp-drive' not found"));
    assert!(out.contains("ok note message=hello"));
}

#[test]
fn test_completions() {
    let cli = Cli::new();
    let (out, _, code) = cli.run(&["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(out.contains("labflow"));
}
