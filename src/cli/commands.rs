// ABOUTME: Command implementations for the taskgraph CLI
// ABOUTME: Handles execution of run, plan, and validate commands

use anyhow::{anyhow, Result};
use petgraph::dot::{Config as DotConfig, Dot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::config::Config;
use super::progress::{render_plan, render_summary, ConsoleProgress};
use crate::engine::{
    CancellationToken, ContinueOnFailure, ExcludeTasks, ParallelPlanExecutor, TaskGraphExecuter,
    TaskRef,
};
use crate::parser::{GraphFile, GraphFileParser};
use crate::tasks::TaskRegistry;

/// Options of the `run` command after merging flags over configuration.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub tasks: Vec<String>,
    pub exclude: Vec<String>,
    pub continue_on_failure: bool,
    pub max_workers: usize,
    pub dry_run: bool,
    pub output: Option<PathBuf>,
}

impl RunOptions {
    pub fn new(tasks: Vec<String>, config: &Config) -> Self {
        Self {
            tasks,
            exclude: Vec::new(),
            continue_on_failure: config.continue_on_failure,
            max_workers: config.max_workers,
            dry_run: false,
            output: None,
        }
    }
}

async fn load_graph(path: &Path) -> Result<(GraphFile, Arc<TaskRegistry>)> {
    let graph = GraphFileParser::new()
        .parse_file(path)
        .await
        .map_err(|e| anyhow!("Failed to parse task graph: {}", e))?;
    info!("Loaded task graph: {}", graph.name);

    let registry = Arc::new(TaskRegistry::from_graph(&graph));
    Ok((graph, registry))
}

/// Named tasks, else the file's default tasks, else every task.
fn requested_tasks(
    graph: &GraphFile,
    registry: &TaskRegistry,
    names: &[String],
) -> Result<Vec<TaskRef>> {
    let tasks = if !names.is_empty() {
        registry.lookup_all(names)
    } else if !graph.default_tasks.is_empty() {
        registry.lookup_all(&graph.default_tasks)
    } else {
        Ok(registry.all_tasks())
    };
    tasks.map_err(|e| anyhow!("{}", e))
}

fn build_executer(
    graph: &GraphFile,
    registry: &Arc<TaskRegistry>,
    names: &[String],
    exclude: &[String],
    max_workers: usize,
) -> Result<TaskGraphExecuter> {
    let mut executer = if max_workers > 1 {
        TaskGraphExecuter::new(registry.clone())
            .with_plan_executor(ParallelPlanExecutor::new(max_workers))
    } else {
        TaskGraphExecuter::new(registry.clone())
    };

    if !exclude.is_empty() {
        executer.use_filter(ExcludeTasks::new(exclude.iter().cloned()));
    }
    executer.add_tasks(requested_tasks(graph, registry, names)?);
    Ok(executer)
}

/// Execute the requested tasks of a task-graph file
pub async fn run_graph(file: PathBuf, options: RunOptions) -> Result<()> {
    info!("Starting build from: {}", file.display());
    let (graph, registry) = load_graph(&file).await?;

    let mut executer = build_executer(
        &graph,
        &registry,
        &options.tasks,
        &options.exclude,
        options.max_workers,
    )?;
    let plan = executer
        .plan()
        .map_err(|e| anyhow!("Failed to build task graph: {}", e))?;

    if options.dry_run {
        println!("Execution plan for '{}' ({} tasks):", graph.name, plan.len());
        print!("{}", render_plan(plan));
        info!("Dry run - nothing executed");
        return Ok(());
    }

    let total = plan.len();
    executer.add_task_execution_listener(Arc::new(ConsoleProgress::new(total)));
    if options.continue_on_failure {
        executer.use_failure_handler(ContinueOnFailure::new());
    }

    let token = executer.cancellation_token();
    let interrupt = tokio::spawn(cancel_on_ctrl_c(token));
    let result = executer.execute().await;
    interrupt.abort();
    let result = result.map_err(|e| anyhow!("Build failed: {}", e))?;

    if let Some(output_path) = &options.output {
        let json_content = serde_json::to_string_pretty(&result)
            .map_err(|e| anyhow!("Failed to serialize results to JSON: {}", e))?;
        std::fs::write(output_path, json_content).map_err(|e| {
            anyhow!(
                "Failed to write output file '{}': {}",
                output_path.display(),
                e
            )
        })?;
        info!("Results written to: {}", output_path.display());
    }

    print!("{}", render_summary(&result));

    if result.is_success() {
        Ok(())
    } else {
        Err(anyhow!("Build finished with status: {}", result.status))
    }
}

async fn cancel_on_ctrl_c(token: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("Interrupted, waiting for running tasks to finish");
        token.cancel();
    }
}

/// Print the execution order of the requested tasks
pub async fn plan_graph(
    file: PathBuf,
    tasks: Vec<String>,
    exclude: Vec<String>,
    dot: bool,
) -> Result<()> {
    let (graph, registry) = load_graph(&file).await?;
    let mut executer = build_executer(&graph, &registry, &tasks, &exclude, 1)?;
    let plan = executer
        .plan()
        .map_err(|e| anyhow!("Failed to build task graph: {}", e))?;

    if dot {
        let graph = plan.to_graph().map(|_, path| path.clone(), |_, _| "");
        println!("{}", Dot::with_config(&graph, &[DotConfig::EdgeNoLabel]));
    } else {
        print!("{}", render_plan(plan));
    }
    Ok(())
}

/// Validate a task-graph file, building the full graph to find cycles
pub async fn validate_graph(file: PathBuf) -> Result<()> {
    info!("Validating task graph: {}", file.display());
    let (graph, registry) = load_graph(&file).await?;

    let mut executer = TaskGraphExecuter::new(registry.clone());
    executer.add_tasks(registry.all_tasks());
    executer
        .populate()
        .map_err(|e| anyhow!("Task graph validation failed: {}", e))?;

    println!("✓ Task graph '{}' is valid", graph.name);
    println!("  Tasks: {}", graph.tasks.len());
    if !graph.default_tasks.is_empty() {
        println!("  Default tasks: {}", graph.default_tasks.join(", "));
    }

    info!("Task graph validation completed successfully");
    Ok(())
}
