// ABOUTME: Task-graph file structure and parsing functionality
// ABOUTME: Defines the GraphFile struct read from YAML and its structural validation

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use super::error::{ParserError, Result, ValidationError};
use super::task::TaskDefinition;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFile {
    pub name: String,
    pub description: Option<String>,
    /// Tasks requested when none are named on the command line.
    #[serde(default)]
    pub default_tasks: Vec<String>,
    pub tasks: IndexMap<String, TaskDefinition>,
}

impl GraphFile {
    /// Parse a task graph from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ParserError::IoError)?;
        Self::from_yaml(&content)
    }

    /// Parse a task graph from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let graph: GraphFile = serde_yaml::from_str(content).map_err(ParserError::YamlError)?;
        graph.validate_structure()?;
        Ok(graph)
    }

    /// Check names and references. Cycles are reported by the engine when
    /// the graph is built.
    pub fn validate_structure(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ParserError::MissingField("name".to_string()));
        }

        if self.tasks.is_empty() {
            return Err(ValidationError::EmptyGraph.into());
        }

        for (name, task) in &self.tasks {
            task.validate(name)?;
            if let Some(dependency) = task.depends_on.iter().find(|d| !self.tasks.contains_key(*d)) {
                return Err(ValidationError::UnknownDependency {
                    task: name.clone(),
                    dependency: dependency.clone(),
                }
                .into());
            }
        }

        if let Some(task) = self.default_tasks.iter().find(|t| !self.tasks.contains_key(*t)) {
            return Err(ValidationError::UnknownDefaultTask { task: task.clone() }.into());
        }

        Ok(())
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn get_task(&self, name: &str) -> Option<&TaskDefinition> {
        self.tasks.get(name)
    }

    pub fn has_task(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn get_task_dependencies(&self, name: &str) -> Vec<String> {
        self.get_task(name)
            .map(|task| task.depends_on.clone())
            .unwrap_or_default()
    }

    /// Tasks that list `name` in their `depends_on`
    pub fn get_dependent_tasks(&self, name: &str) -> Vec<String> {
        self.tasks
            .iter()
            .filter(|(_, task)| task.depends_on.iter().any(|d| d == name))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(ParserError::YamlError)
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphFileParser;

impl GraphFileParser {
    pub fn new() -> Self {
        Self
    }

    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<GraphFile> {
        let content = fs::read_to_string(path.as_ref())
            .await
            .map_err(ParserError::IoError)?;
        self.parse_string(&content)
    }

    pub fn parse_string(&self, content: &str) -> Result<GraphFile> {
        GraphFile::from_yaml(content)
    }
}
