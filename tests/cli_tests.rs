// ABOUTME: Integration tests for the CLI application
// ABOUTME: Runs the taskgraph binary end to end against generated task-graph files

use std::path::Path;
use std::process::{Command, Output};

mod common;
use common::{read_json_output, TestEnvironment, TestGraphBuilder};

fn taskgraph(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_taskgraph"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute taskgraph")
}

fn pipeline() -> TestGraphBuilder {
    TestGraphBuilder::new("pipeline")
        .with_description("CLI test pipeline")
        .with_default_tasks(vec!["package"])
        .add_echo_task("compile", "compiling")
        .add_dependent_task("test", "testing", vec!["compile"])
        .add_dependent_task("package", "packaging", vec!["compile"])
        .add_dependent_task("publish", "publishing", vec!["package", "test"])
}

#[test]
fn test_cli_help_command() {
    let env = TestEnvironment::new();
    let output = taskgraph(env.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("taskgraph"));
    assert!(stdout.contains("run"));
    assert!(stdout.contains("validate"));
}

#[test]
fn test_cli_version_command() {
    let env = TestEnvironment::new();
    let output = taskgraph(env.path(), &["--version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn test_cli_run_default_tasks() {
    let env = TestEnvironment::new();
    let file = env.create_graph_file("pipeline", &pipeline()).await;

    let output = taskgraph(env.path(), &["run", file.to_str().unwrap()]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("> [1/2] compile"));
    assert!(stdout.contains("> [2/2] package"));
    assert!(!stdout.contains("publish"));
    assert!(stdout.contains("Build SUCCESS"));
}

#[tokio::test]
async fn test_cli_run_writes_json_result() {
    let env = TestEnvironment::new();
    let file = env.create_graph_file("pipeline", &pipeline()).await;
    let output_file = env.output_file("result");

    let output = taskgraph(
        env.path(),
        &[
            "run",
            file.to_str().unwrap(),
            "publish",
            "--jobs",
            "2",
            "--output",
            output_file.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());

    let json = read_json_output(&output_file).await.unwrap();
    assert_eq!(json["status"], "Success");
    assert_eq!(json["summary"]["total"], 4);
    assert_eq!(json["summary"]["succeeded"], 4);
    assert_eq!(json["tasks"][0]["path"], "compile");
    assert_eq!(json["tasks"][3]["path"], "publish");
    assert!(json["tasks"][3]["output"]
        .as_str()
        .unwrap()
        .contains("publishing"));
}

#[tokio::test]
async fn test_cli_run_failure_exits_nonzero() {
    let env = TestEnvironment::new();
    let builder = TestGraphBuilder::new("failing")
        .add_echo_task("setup", "setting up")
        .add_failing_task("broken", vec!["setup"])
        .add_dependent_task("after", "never", vec!["broken"]);
    let file = env.create_graph_file("failing", &builder).await;

    let output = taskgraph(env.path(), &["run", file.to_str().unwrap(), "after"]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("✗ broken failed"));
    assert!(stdout.contains("Build PARTIAL_SUCCESS"));
    assert!(stdout.contains("1 not run"));
}

#[tokio::test]
async fn test_cli_run_continue_skips_dependents() {
    let env = TestEnvironment::new();
    let builder = TestGraphBuilder::new("continue")
        .add_failing_task("broken", vec![])
        .add_dependent_task("after", "never", vec!["broken"])
        .add_echo_task("independent", "still runs");
    let file = env.create_graph_file("continue", &builder).await;

    let output = taskgraph(env.path(), &["run", file.to_str().unwrap(), "--continue"]);

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("independent"));
    assert!(stdout.contains("1 succeeded, 1 failed, 1 skipped"));
}

#[tokio::test]
async fn test_cli_dry_run_prints_plan_only() {
    let env = TestEnvironment::new();
    let builder = pipeline().add_script_task("marker", "touch ran.txt", vec![]);
    let file = env.create_graph_file("pipeline", &builder).await;

    let output = taskgraph(
        env.path(),
        &["run", file.to_str().unwrap(), "publish", "marker", "--dry-run"],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("publish (depends on: package, test)"));
    assert!(stdout.contains("marker"));
    assert!(!env.path().join("ran.txt").exists());
}

#[tokio::test]
async fn test_cli_plan_with_exclusion() {
    let env = TestEnvironment::new();
    let file = env.create_graph_file("pipeline", &pipeline()).await;

    let output = taskgraph(
        env.path(),
        &["plan", file.to_str().unwrap(), "publish", "-x", "test"],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("  1. compile"));
    assert!(stdout.contains("  2. package (depends on: compile)"));
    assert!(stdout.contains("  3. publish (depends on: package)"));
    assert!(!stdout.contains(". test"));
}

#[tokio::test]
async fn test_cli_plan_dot_output() {
    let env = TestEnvironment::new();
    let file = env.create_graph_file("pipeline", &pipeline()).await;

    let output = taskgraph(env.path(), &["plan", file.to_str().unwrap(), "--dot"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("digraph"));
    assert!(stdout.contains("->"));
    assert!(stdout.contains("compile"));
}

#[tokio::test]
async fn test_cli_validate_valid_graph() {
    let env = TestEnvironment::new();
    let file = env.create_graph_file("pipeline", &pipeline()).await;

    let output = taskgraph(env.path(), &["validate", file.to_str().unwrap()]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Task graph 'pipeline' is valid"));
    assert!(stdout.contains("Tasks: 4"));
}

#[tokio::test]
async fn test_cli_validate_reports_cycle() {
    let env = TestEnvironment::new();
    let builder = TestGraphBuilder::new("loop")
        .add_dependent_task("a", "a", vec!["b"])
        .add_dependent_task("b", "b", vec!["a"]);
    let file = env.create_graph_file("loop", &builder).await;

    let output = taskgraph(env.path(), &["validate", file.to_str().unwrap()]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Circular dependency"));
}

#[tokio::test]
async fn test_cli_unknown_task_fails() {
    let env = TestEnvironment::new();
    let file = env.create_graph_file("pipeline", &pipeline()).await;

    let output = taskgraph(env.path(), &["run", file.to_str().unwrap(), "deploy"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("deploy"));
}

#[test]
fn test_cli_missing_file() {
    let env = TestEnvironment::new();
    let output = taskgraph(env.path(), &["run", "does-not-exist.yaml"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to parse task graph"));
}
