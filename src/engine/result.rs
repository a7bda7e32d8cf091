// ABOUTME: Build result types assembled from an executed plan
// ABOUTME: Per-task outcomes, overall build status and summary counts for reporting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::plan::ExecutionPlan;
use super::task::TaskStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub path: String,
    pub status: TaskStatus,
    pub dependencies: Vec<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl TaskResult {
    pub fn is_successful(&self) -> bool {
        self.status == TaskStatus::Succeeded
    }

    pub fn is_failed(&self) -> bool {
        self.status == TaskStatus::Failed
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BuildStatus {
    Success,
    Failed,
    PartialSuccess,
    Cancelled,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_run: usize,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResult {
    pub run_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: Duration,
    pub status: BuildStatus,
    pub tasks: Vec<TaskResult>,
    pub summary: BuildSummary,
}

impl BuildResult {
    /// Collect the outcome of every task in `plan`, in plan order.
    pub fn from_plan(
        run_id: String,
        start_time: DateTime<Utc>,
        plan: &ExecutionPlan,
        cancelled: bool,
    ) -> Self {
        let tasks: Vec<TaskResult> = plan
            .nodes()
            .map(|node| {
                let task = node.task();
                let state = task.state().snapshot();
                TaskResult {
                    path: task.path().to_string(),
                    status: state.status,
                    dependencies: plan
                        .dependency_paths(task.path())
                        .into_iter()
                        .map(String::from)
                        .collect(),
                    start_time: state.start_time,
                    end_time: state.end_time,
                    duration: state.duration(),
                    output: task.output(),
                    error: state.failure.map(|f| f.message().to_string()),
                }
            })
            .collect();

        let summary = BuildSummary::from_tasks(&tasks);
        let status = if cancelled {
            BuildStatus::Cancelled
        } else {
            match (summary.failed > 0, summary.succeeded > 0) {
                (false, _) => BuildStatus::Success,
                (true, false) => BuildStatus::Failed,
                (true, true) => BuildStatus::PartialSuccess,
            }
        };

        let end_time = Utc::now();
        Self {
            run_id,
            start_time,
            end_time,
            duration: (end_time - start_time).to_std().unwrap_or(Duration::ZERO),
            status,
            tasks,
            summary,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == BuildStatus::Success
    }

    pub fn get_task_result(&self, path: &str) -> Option<&TaskResult> {
        self.tasks.iter().find(|t| t.path == path)
    }
}

impl BuildSummary {
    fn from_tasks(tasks: &[TaskResult]) -> Self {
        let count = |status: TaskStatus| tasks.iter().filter(|t| t.status == status).count();
        let total = tasks.len();
        let succeeded = tasks.iter().filter(|t| t.is_successful()).count();

        Self {
            total,
            succeeded,
            failed: tasks.iter().filter(|t| t.is_failed()).count(),
            skipped: count(TaskStatus::Skipped),
            not_run: count(TaskStatus::NotRun),
            success_rate: if total > 0 {
                (succeeded as f64 / total as f64) * 100.0
            } else {
                0.0
            },
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildStatus::Success => write!(f, "success"),
            BuildStatus::Failed => write!(f, "failed"),
            BuildStatus::PartialSuccess => write!(f, "partial_success"),
            BuildStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}
