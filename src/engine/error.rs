// ABOUTME: Error types for task graph construction and execution
// ABOUTME: Separates structural engine errors from task failures recorded as data

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Circular dependency between tasks. Cycle includes [{}].", cycle.join(", "))]
    CircularDependency { cycle: Vec<String> },

    #[error("Task information is not available: {0}")]
    IllegalState(String),

    #[error("Could not resolve dependencies of task '{task}': {message}")]
    UnresolvedDependency { task: String, message: String },

    #[error("{event} listener failed")]
    Listener {
        event: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Task worker failed: {0}")]
    Worker(String),
}

impl GraphError {
    pub(crate) fn not_populated() -> Self {
        GraphError::IllegalState(
            "this task execution graph has not been populated".to_string(),
        )
    }

    /// Task paths named by a circular dependency error, if this is one.
    pub fn cycle(&self) -> Option<&[String]> {
        match self {
            GraphError::CircularDependency { cycle } => Some(cycle),
            _ => None,
        }
    }
}

/// Outcome of a task's own work. Recorded on the task state and handed to
/// the failure handler; never returned as a [`GraphError`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TaskFailure {
    message: String,
}

impl TaskFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;
