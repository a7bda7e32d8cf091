// ABOUTME: The unit of work consumed by the engine and its observable state
// ABOUTME: Tasks are identified by path and record their own outcome

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::error::TaskFailure;

pub type TaskOutcome = std::result::Result<(), TaskFailure>;

/// An opaque unit of work.
///
/// The engine never looks inside a task: it orders tasks by [`Task::path`],
/// invokes [`Task::run`] once their prerequisites have succeeded, and
/// records the outcome on [`Task::state`]. Paths must be unique within one
/// build.
#[async_trait]
pub trait Task: Send + Sync + fmt::Debug {
    fn path(&self) -> &str;

    async fn run(&self) -> TaskOutcome;

    fn state(&self) -> &TaskState;

    /// Output captured by the last run, if the task keeps any.
    fn output(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    NotRun,
    Executing,
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::NotRun => "not run",
            TaskStatus::Executing => "executing",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Snapshot of a [`TaskState`] at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStateSnapshot {
    pub status: TaskStatus,
    pub failure: Option<TaskFailure>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl Default for TaskStateSnapshot {
    fn default() -> Self {
        Self {
            status: TaskStatus::NotRun,
            failure: None,
            start_time: None,
            end_time: None,
        }
    }
}

impl TaskStateSnapshot {
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((end - start).to_std().unwrap_or(Duration::ZERO)),
            _ => None,
        }
    }
}

/// Mutable execution state owned by a task and written by the engine.
#[derive(Debug, Default)]
pub struct TaskState {
    inner: Mutex<TaskStateSnapshot>,
}

impl TaskState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TaskStateSnapshot> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> TaskStateSnapshot {
        self.lock().clone()
    }

    pub fn status(&self) -> TaskStatus {
        self.lock().status
    }

    pub fn failure(&self) -> Option<TaskFailure> {
        self.lock().failure.clone()
    }

    /// True once the task's work has been invoked, whatever the outcome.
    pub fn executed(&self) -> bool {
        matches!(self.status(), TaskStatus::Succeeded | TaskStatus::Failed)
    }

    pub fn skipped(&self) -> bool {
        self.status() == TaskStatus::Skipped
    }

    pub(crate) fn mark_executing(&self) {
        let mut state = self.lock();
        state.status = TaskStatus::Executing;
        state.failure = None;
        state.start_time = Some(Utc::now());
        state.end_time = None;
    }

    pub(crate) fn record_outcome(&self, outcome: &TaskOutcome) {
        let mut state = self.lock();
        match outcome {
            Ok(()) => {
                state.status = TaskStatus::Succeeded;
                state.failure = None;
            }
            Err(failure) => {
                state.status = TaskStatus::Failed;
                state.failure = Some(failure.clone());
            }
        }
        state.end_time = Some(Utc::now());
    }

    pub(crate) fn mark_skipped(&self) {
        let mut state = self.lock();
        state.status = TaskStatus::Skipped;
        state.failure = None;
    }

    /// Return the state to `NotRun` so the task can take part in another build.
    pub fn reset(&self) {
        *self.lock() = TaskStateSnapshot::default();
    }
}
