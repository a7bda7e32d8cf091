// ABOUTME: Failure handler policies deciding whether a build continues after a task fails
// ABOUTME: Handlers are shared across workers and must tolerate concurrent calls

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::TaskFailure;
use super::task::Task;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailureDecision {
    /// Keep processing tasks that do not depend on the failed one.
    Continue,
    /// Start no further tasks; tasks already running finish.
    Stop,
}

pub trait TaskFailureHandler: Send + Sync {
    fn on_task_failure(&self, task: &dyn Task, failure: &TaskFailure) -> FailureDecision;
}

impl<F> TaskFailureHandler for F
where
    F: Fn(&dyn Task, &TaskFailure) -> FailureDecision + Send + Sync,
{
    fn on_task_failure(&self, task: &dyn Task, failure: &TaskFailure) -> FailureDecision {
        self(task, failure)
    }
}

/// The default policy: the first failure stops the build.
#[derive(Debug, Clone, Copy, Default)]
pub struct StopOnFirstFailure;

impl TaskFailureHandler for StopOnFirstFailure {
    fn on_task_failure(&self, _task: &dyn Task, _failure: &TaskFailure) -> FailureDecision {
        FailureDecision::Stop
    }
}

/// Keeps going after failures, counting them.
#[derive(Debug, Default)]
pub struct ContinueOnFailure {
    failures: AtomicUsize,
}

impl ContinueOnFailure {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

impl TaskFailureHandler for ContinueOnFailure {
    fn on_task_failure(&self, _task: &dyn Task, _failure: &TaskFailure) -> FailureDecision {
        self.failures.fetch_add(1, Ordering::SeqCst);
        FailureDecision::Continue
    }
}
