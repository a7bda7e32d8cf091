// ABOUTME: Common test utilities and helpers for integration tests
// ABOUTME: Provides task-graph file builders and temporary test environments

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::fs;

/// Builder for task-graph YAML files used by integration tests
pub struct TestGraphBuilder {
    name: String,
    description: Option<String>,
    default_tasks: Vec<String>,
    tasks: Vec<TestTask>,
}

pub struct TestTask {
    pub name: String,
    pub command: Option<String>,
    pub args: Vec<String>,
    pub script: Option<String>,
    pub depends_on: Vec<String>,
    pub timeout: Option<String>,
}

impl TestTask {
    fn command(name: &str, command: &str, args: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            command: Some(command.to_string()),
            args,
            script: None,
            depends_on: Vec::new(),
            timeout: None,
        }
    }
}

impl TestGraphBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            default_tasks: Vec::new(),
            tasks: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_default_tasks(mut self, tasks: Vec<&str>) -> Self {
        self.default_tasks = tasks.into_iter().map(String::from).collect();
        self
    }

    pub fn add_echo_task(mut self, name: &str, message: &str) -> Self {
        self.tasks
            .push(TestTask::command(name, "echo", vec![message.to_string()]));
        self
    }

    pub fn add_dependent_task(mut self, name: &str, message: &str, depends_on: Vec<&str>) -> Self {
        let mut task = TestTask::command(name, "echo", vec![message.to_string()]);
        task.depends_on = depends_on.into_iter().map(String::from).collect();
        self.tasks.push(task);
        self
    }

    pub fn add_failing_task(mut self, name: &str, depends_on: Vec<&str>) -> Self {
        let mut task = TestTask::command(name, "false", Vec::new());
        task.depends_on = depends_on.into_iter().map(String::from).collect();
        self.tasks.push(task);
        self
    }

    pub fn add_script_task(mut self, name: &str, script: &str, depends_on: Vec<&str>) -> Self {
        self.tasks.push(TestTask {
            name: name.to_string(),
            command: None,
            args: Vec::new(),
            script: Some(script.to_string()),
            depends_on: depends_on.into_iter().map(String::from).collect(),
            timeout: None,
        });
        self
    }

    pub fn add_slow_task(mut self, name: &str, seconds: u32, timeout: &str) -> Self {
        let mut task = TestTask::command(name, "sleep", vec![seconds.to_string()]);
        task.timeout = Some(timeout.to_string());
        self.tasks.push(task);
        self
    }

    pub fn generate_yaml(&self) -> String {
        let mut yaml = format!("name: {}\n", self.name);

        if let Some(description) = &self.description {
            yaml.push_str(&format!("description: \"{}\"\n", description));
        }

        if !self.default_tasks.is_empty() {
            yaml.push_str(&format!("default_tasks: [{}]\n", self.default_tasks.join(", ")));
        }

        yaml.push_str("tasks:\n");
        for task in &self.tasks {
            yaml.push_str(&format!("  {}:\n", task.name));
            if let Some(command) = &task.command {
                yaml.push_str(&format!("    command: \"{}\"\n", command));
            }
            if !task.args.is_empty() {
                yaml.push_str("    args:\n");
                for arg in &task.args {
                    yaml.push_str(&format!("      - \"{}\"\n", arg));
                }
            }
            if let Some(script) = &task.script {
                yaml.push_str("    script: |\n");
                for line in script.lines() {
                    yaml.push_str(&format!("      {}\n", line));
                }
            }
            if !task.depends_on.is_empty() {
                yaml.push_str(&format!("    depends_on: [{}]\n", task.depends_on.join(", ")));
            }
            if let Some(timeout) = &task.timeout {
                yaml.push_str(&format!("    timeout: {}\n", timeout));
            }
        }

        yaml
    }

    pub async fn write_to_file(&self, path: &Path) -> std::io::Result<()> {
        fs::write(path, self.generate_yaml()).await
    }
}

/// Temporary directory holding graph files and build outputs
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn graph_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.yaml", name))
    }

    pub fn output_file(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.json", name))
    }

    pub async fn create_graph_file(&self, name: &str, builder: &TestGraphBuilder) -> PathBuf {
        let graph_file = self.graph_file(name);
        builder
            .write_to_file(&graph_file)
            .await
            .expect("Failed to write graph file");
        graph_file
    }
}

pub async fn read_json_output(
    file_path: &Path,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(file_path).await?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_builder() {
        let yaml = TestGraphBuilder::new("test_graph")
            .with_description("Test graph description")
            .with_default_tasks(vec!["task2"])
            .add_echo_task("task1", "Hello World")
            .add_dependent_task("task2", "Dependent task", vec!["task1"])
            .generate_yaml();

        assert!(yaml.contains("name: test_graph"));
        assert!(yaml.contains("description: \"Test graph description\""));
        assert!(yaml.contains("default_tasks: [task2]"));
        assert!(yaml.contains("task1:"));
        assert!(yaml.contains("depends_on: [task1]"));
    }

    #[test]
    fn test_environment_setup() {
        let env = TestEnvironment::new();
        assert!(env.path().exists());
        assert!(env.graph_file("test").to_string_lossy().ends_with("test.yaml"));
    }
}
