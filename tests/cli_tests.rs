mod common;

use common::*;
use std::path::Path;
use std::process::Command;

fn cli_command() -> Command {
    Command::new(env!("CARGO_BIN_EXE_agent-orchestrator"))
}

const CONFIG: &str = r#"
agents:
  - type: reviewer
    name: Code Reviewer
    role: review
    rules:
      - pattern: "(?i)broken"
        fail: "cannot review broken code"
    default_response: "looks good"
  - type: docs
    name: Docs Writer
    default_response: "docs written"
"#;

fn write_config(dir: &Path) -> String {
    write_file(dir, "orchestrator.yaml", CONFIG);
    dir.join("orchestrator.yaml").display().to_string()
}

#[test]
fn test_cli_help() {
    let output = cli_command().arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Run tasks, batches and workflows"));
    assert!(stdout.contains("agents"));
    assert!(stdout.contains("status"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("batch"));
    assert!(stdout.contains("workflow"));
    assert!(stdout.contains("validate"));
}

#[test]
fn test_cli_version() {
    let output = cli_command().arg("--version").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("agent-orchestrator"));
}

#[test]
fn test_cli_run_help() {
    let output = cli_command().args(["run", "--help"]).output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Run a single task"));
    assert!(stdout.contains("--project"));
    assert!(stdout.contains("--context"));
}

#[test]
fn test_cli_agents_json() {
    let dir = create_test_dir();
    let config = write_config(dir.path());

    let output = cli_command()
        .args(["--config", &config, "--json", "agents"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let agents: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(agents[0]["type"], "docs");
    assert_eq!(agents[1]["type"], "reviewer");
    assert_eq!(agents[1]["role"], "review");
}

#[test]
fn test_cli_run_success() {
    let dir = create_test_dir();
    let config = write_config(dir.path());

    let output = cli_command()
        .args(["--config", &config, "--json", "run", "reviewer", "review login"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["success"], true);
    assert_eq!(result["result"]["output"], "looks good");
    assert!(result["executionRecordId"].is_string());
}

#[test]
fn test_cli_run_failure_exit_code() {
    let dir = create_test_dir();
    let config = write_config(dir.path());

    let output = cli_command()
        .args(["--config", &config, "run", "reviewer", "review broken module"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cannot review broken code"));
}

#[test]
fn test_cli_run_unknown_agent() {
    let dir = create_test_dir();
    let config = write_config(dir.path());

    let output = cli_command()
        .args(["--config", &config, "run", "ghost", "boo"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Agent not found: ghost"));
}

#[test]
fn test_cli_batch() {
    let dir = create_test_dir();
    let config = write_config(dir.path());
    write_file(
        dir.path(),
        "batch.yaml",
        r#"
- agent_type: reviewer
  task: review api
- agent_type: docs
  task: document api
"#,
    );

    let batch = dir.path().join("batch.yaml");
    let output = cli_command()
        .args(["--config", &config, "--json", "batch"])
        .arg(&batch)
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["total"], 2);
    assert_eq!(report["successful"], 2);
}

#[test]
fn test_cli_workflow_abort_exit_code() {
    let dir = create_test_dir();
    let config = write_config(dir.path());
    write_file(
        dir.path(),
        "flow.yaml",
        r#"
name: flow
steps:
  - agent_type: reviewer
    task: review broken code
  - agent_type: docs
    task: write docs
"#,
    );

    let output = cli_command()
        .args(["--config", &config, "workflow"])
        .arg(dir.path().join("flow.yaml"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Aborted"));
    assert!(stdout.contains("1 failed, 0 skipped"));
    assert!(stdout.contains("Not run: 1"));
}

#[test]
fn test_cli_non_critical_workflow_runs_every_step() {
    let dir = create_test_dir();
    let config = write_config(dir.path());
    write_file(
        dir.path(),
        "flow.yaml",
        r#"
name: non-critical
steps:
  - agent_type: reviewer
    task: review broken code
  - agent_type: docs
    task: write docs
  - agent_type: docs
    task: publish
    depends_on: [review broken code]
"#,
    );

    let output = cli_command()
        .args(["--config", &config, "workflow"])
        .arg(dir.path().join("flow.yaml"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 total, 1 completed, 1 failed, 1 skipped"));
    assert!(!stdout.contains("Aborted"));
    assert!(!stdout.contains("Not run"));
}

#[test]
fn test_cli_validate_reports_unresolvable_dependencies() {
    let dir = create_test_dir();
    write_file(
        dir.path(),
        "bad.yaml",
        r#"
name: bad
steps:
  - agent_type: docs
    task: publish
    depends_on: [build]
  - agent_type: docs
    task: build
"#,
    );

    let output = cli_command()
        .arg("validate")
        .arg(dir.path().join("bad.yaml"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("step 'publish' depends on 'build'"));
}

#[test]
fn test_cli_validate_missing_path() {
    let output = cli_command()
        .args(["validate", "/nonexistent/flow.yaml"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_validate_checks_agent_types_against_config() {
    let dir = create_test_dir();
    let config = write_config(dir.path());
    write_file(
        dir.path(),
        "flow.yaml",
        r#"
name: flow
steps:
  - agent_type: reviewer
    task: review
  - agent_type: translator
    task: translate
"#,
    );

    let output = cli_command()
        .args(["--config", &config, "validate"])
        .arg(dir.path().join("flow.yaml"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("agent type 'translator'"));
    assert!(!stdout.contains("agent type 'reviewer'"));
}
