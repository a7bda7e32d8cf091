// ABOUTME: Console output for builds: task progress lines, plans and summaries
// ABOUTME: Registered as an execution listener so every started task is announced

use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::engine::{
    BuildResult, ExecutionPlan, Task, TaskExecutionListener, TaskState, TaskStatus,
};

/// Prints a line when a task starts and a line when it fails.
#[derive(Debug)]
pub struct ConsoleProgress {
    total: usize,
    started: AtomicUsize,
}

impl ConsoleProgress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            started: AtomicUsize::new(0),
        }
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

impl TaskExecutionListener for ConsoleProgress {
    fn before_execute(&self, task: &dyn Task) -> anyhow::Result<()> {
        let position = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        println!("> [{}/{}] {}", position, self.total, task.path());
        Ok(())
    }

    fn after_execute(&self, task: &dyn Task, state: &TaskState) -> anyhow::Result<()> {
        if state.status() == TaskStatus::Failed {
            let reason = state
                .failure()
                .map(|f| f.message().to_string())
                .unwrap_or_default();
            println!("  ✗ {} failed: {}", task.path(), reason);
        }
        Ok(())
    }
}

/// One line per task in execution order with its resolved dependencies.
pub fn render_plan(plan: &ExecutionPlan) -> String {
    let mut out = String::new();
    for (position, path) in plan.paths().into_iter().enumerate() {
        let dependencies = plan.dependency_paths(path);
        if dependencies.is_empty() {
            let _ = writeln!(out, "{:>3}. {}", position + 1, path);
        } else {
            let _ = writeln!(
                out,
                "{:>3}. {} (depends on: {})",
                position + 1,
                path,
                dependencies.join(", ")
            );
        }
    }
    out
}

pub fn render_summary(result: &BuildResult) -> String {
    let mut out = String::new();
    let summary = &result.summary;
    let _ = writeln!(
        out,
        "Build {} in {:.2?}: {} succeeded, {} failed, {} skipped, {} not run",
        result.status.to_string().to_uppercase(),
        result.duration,
        summary.succeeded,
        summary.failed,
        summary.skipped,
        summary.not_run
    );
    for task in result.tasks.iter().filter(|t| t.is_failed()) {
        let _ = writeln!(
            out,
            "  Task '{}' failed: {}",
            task.path,
            task.error.as_deref().unwrap_or("unknown error")
        );
        if let Some(output) = &task.output {
            let _ = writeln!(out, "    Output: {}", output.trim());
        }
    }
    out
}
