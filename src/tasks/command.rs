// ABOUTME: Command task implementation for executing programs and shell scripts
// ABOUTME: Runs a task definition with tokio::process, enforcing timeouts and expected exit codes

use async_trait::async_trait;
use std::fmt;
use std::process::{Output, Stdio};
use std::sync::{Mutex, PoisonError};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::engine::{Task, TaskFailure, TaskOutcome, TaskState};
use crate::parser::TaskDefinition;

/// A task backed by an external command or script.
///
/// Simple commands run `command` with `args` directly. Scripts are handed
/// to `shell -c`, so pipes and variables work as in an interactive shell.
/// Captured stdout and stderr of the last run are kept for the build report.
pub struct CommandTask {
    path: String,
    definition: TaskDefinition,
    state: TaskState,
    output: Mutex<Option<String>>,
}

impl CommandTask {
    pub fn new(path: impl Into<String>, definition: TaskDefinition) -> Self {
        Self {
            path: path.into(),
            definition,
            state: TaskState::new(),
            output: Mutex::new(None),
        }
    }

    pub fn definition(&self) -> &TaskDefinition {
        &self.definition
    }

    fn build_command(&self) -> Option<Command> {
        let definition = &self.definition;
        let mut cmd = if let Some(script) = &definition.script {
            info!("Executing script task: {} - using {}", self.path, definition.shell);
            let mut cmd = Command::new(&definition.shell);
            cmd.arg("-c").arg(script);
            cmd
        } else {
            let command = definition.command.as_ref()?;
            info!("Executing command task: {} - {}", self.path, command);
            debug!("Command: {} {:?}", command, definition.args);
            let mut cmd = Command::new(command);
            cmd.args(&definition.args);
            cmd
        };

        for (key, value) in &definition.env {
            cmd.env(key, value);
        }
        if let Some(working_dir) = &definition.working_dir {
            cmd.current_dir(working_dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Some(cmd)
    }

    fn record_output(&self, output: Option<String>) {
        *self.output.lock().unwrap_or_else(PoisonError::into_inner) = output;
    }

    fn evaluate(&self, output: Output) -> TaskOutcome {
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        debug!("Command completed with exit code: {}", exit_code);

        let output_text = match (stdout.is_empty(), stderr.is_empty()) {
            (false, false) => Some(format!("STDOUT:\n{}\nSTDERR:\n{}", stdout, stderr)),
            (false, true) => Some(stdout),
            (true, false) => Some(format!("STDERR:\n{}", stderr)),
            (true, true) => None,
        };
        self.record_output(output_text);

        if self.definition.expected_exit_codes.contains(&exit_code) {
            Ok(())
        } else {
            let message = format!(
                "Command exited with unexpected code: {} (expected one of: {:?})",
                exit_code, self.definition.expected_exit_codes
            );
            error!("Task {}: {}", self.path, message);
            Err(TaskFailure::new(message))
        }
    }
}

impl fmt::Debug for CommandTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTask")
            .field("path", &self.path)
            .field("definition", &self.definition)
            .field("state", &self.state.status())
            .finish()
    }
}

#[async_trait]
impl Task for CommandTask {
    fn path(&self) -> &str {
        &self.path
    }

    async fn run(&self) -> TaskOutcome {
        self.record_output(None);
        let Some(mut cmd) = self.build_command() else {
            return Err(TaskFailure::new(
                "Either 'command' or 'script' must be provided",
            ));
        };

        let result = match self.definition.timeout {
            Some(limit) => match timeout(limit, cmd.output()).await {
                Ok(result) => result,
                Err(_) => {
                    let message = format!("Command timed out after {:?}", limit);
                    error!("Task {}: {}", self.path, message);
                    return Err(TaskFailure::new(message));
                }
            },
            None => cmd.output().await,
        };

        match result {
            Ok(output) => self.evaluate(output),
            Err(e) => {
                let message = format!("Failed to execute: {}", e);
                error!("Task {}: {}", self.path, message);
                Err(TaskFailure::new(message))
            }
        }
    }

    fn state(&self) -> &TaskState {
        &self.state
    }

    fn output(&self) -> Option<String> {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
