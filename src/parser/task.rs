// ABOUTME: Task definition structures read from a task-graph file
// ABOUTME: Describes the command or script a task runs and its declared prerequisites

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskDefinition {
    pub description: Option<String>,

    /// Program to execute. Mutually exclusive with `script`.
    #[serde(default)]
    pub command: Option<String>,

    /// Arguments for `command`; ignored in script mode.
    #[serde(default)]
    pub args: Vec<String>,

    /// Shell script run through `shell`. Mutually exclusive with `command`.
    #[serde(default)]
    pub script: Option<String>,

    #[serde(default = "default_shell")]
    pub shell: String,

    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub env: HashMap<String, String>,

    pub working_dir: Option<PathBuf>,

    #[serde(with = "humantime_serde", default)]
    pub timeout: Option<Duration>,

    #[serde(default = "default_expected_exit_codes")]
    pub expected_exit_codes: Vec<i32>,
}

fn default_shell() -> String {
    "/bin/sh".to_string()
}

fn default_expected_exit_codes() -> Vec<i32> {
    vec![0]
}

impl TaskDefinition {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            description: None,
            command: Some(command.into()),
            args: Vec::new(),
            script: None,
            shell: default_shell(),
            depends_on: Vec::new(),
            env: HashMap::new(),
            working_dir: None,
            timeout: None,
            expected_exit_codes: default_expected_exit_codes(),
        }
    }

    pub fn script(script: impl Into<String>) -> Self {
        Self {
            command: None,
            script: Some(script.into()),
            ..Self::command("")
        }
    }

    pub fn is_script(&self) -> bool {
        self.script.is_some()
    }

    /// Check the fields that do not depend on other tasks.
    pub fn validate(&self, task: &str) -> Result<(), ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidTaskConfig {
            task: task.to_string(),
            reason: reason.to_string(),
        };

        match (&self.command, &self.script) {
            (Some(_), Some(_)) => return Err(invalid("'command' and 'script' are mutually exclusive")),
            (None, None) => return Err(invalid("one of 'command' or 'script' is required")),
            (Some(command), None) if command.trim().is_empty() => {
                return Err(invalid("'command' cannot be empty"))
            }
            (None, Some(script)) if script.trim().is_empty() => {
                return Err(invalid("'script' cannot be empty"))
            }
            _ => {}
        }

        if self.timeout == Some(Duration::ZERO) {
            return Err(invalid("'timeout' must be greater than zero"));
        }

        if self.expected_exit_codes.is_empty() {
            return Err(invalid("'expected_exit_codes' cannot be empty"));
        }

        Ok(())
    }
}
