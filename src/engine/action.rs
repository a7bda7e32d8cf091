// ABOUTME: Closure-backed task implementation for programmatic task graphs
// ABOUTME: Useful for embedding the engine without a task-graph file

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;

use super::error::TaskFailure;
use super::task::{Task, TaskOutcome, TaskState};

type Action = Box<dyn Fn() -> BoxFuture<'static, TaskOutcome> + Send + Sync>;

/// A task whose work is a closure.
pub struct ActionTask {
    path: String,
    action: Action,
    state: TaskState,
}

impl ActionTask {
    /// A task that does nothing and succeeds.
    pub fn new(path: impl Into<String>) -> Self {
        Self::with_action(path, || Ok(()))
    }

    /// A task that always fails with `message`.
    pub fn failing(path: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::with_action(path, move || Err(TaskFailure::new(message.clone())))
    }

    pub fn with_action<F>(path: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> TaskOutcome + Send + Sync + 'static,
    {
        Self {
            path: path.into(),
            action: Box::new(move || futures::future::ready(action()).boxed()),
            state: TaskState::new(),
        }
    }

    pub fn with_async_action<F, Fut>(path: impl Into<String>, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskOutcome> + Send + 'static,
    {
        Self {
            path: path.into(),
            action: Box::new(move || action().boxed()),
            state: TaskState::new(),
        }
    }
}

impl fmt::Debug for ActionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionTask")
            .field("path", &self.path)
            .field("state", &self.state.status())
            .finish()
    }
}

#[async_trait]
impl Task for ActionTask {
    fn path(&self) -> &str {
        &self.path
    }

    async fn run(&self) -> TaskOutcome {
        (self.action)().await
    }

    fn state(&self) -> &TaskState {
        &self.state
    }
}
