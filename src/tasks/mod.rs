// ABOUTME: Concrete task implementations and the registry resolving task paths
// ABOUTME: Turns task-graph file definitions into engine tasks with declared prerequisites

pub mod command;

pub use command::CommandTask;

use indexmap::IndexMap;
use std::sync::Arc;

use crate::engine::{DependencyResolver, GraphError, Result, Task, TaskRef};
use crate::parser::GraphFile;

struct RegisteredTask {
    task: TaskRef,
    depends_on: Vec<String>,
}

/// Tasks of one build keyed by path, in definition order.
#[derive(Default)]
pub struct TaskRegistry {
    tasks: IndexMap<String, RegisteredTask>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`CommandTask`] per definition of `graph`.
    pub fn from_graph(graph: &GraphFile) -> Self {
        let mut registry = Self::new();
        for (name, definition) in &graph.tasks {
            let depends_on = definition.depends_on.clone();
            registry.register(
                Arc::new(CommandTask::new(name.clone(), definition.clone())),
                depends_on,
            );
        }
        registry
    }

    /// Register `task`, replacing any task with the same path.
    pub fn register(&mut self, task: TaskRef, depends_on: Vec<String>) {
        self.tasks.insert(
            task.path().to_string(),
            RegisteredTask { task, depends_on },
        );
    }

    pub fn get(&self, path: &str) -> Option<TaskRef> {
        self.tasks.get(path).map(|entry| Arc::clone(&entry.task))
    }

    /// Look up every path, failing on the first unknown one.
    pub fn lookup_all<S: AsRef<str>>(&self, paths: &[S]) -> Result<Vec<TaskRef>> {
        paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                self.get(path).ok_or_else(|| GraphError::UnresolvedDependency {
                    task: path.to_string(),
                    message: "no such task".to_string(),
                })
            })
            .collect()
    }

    pub fn all_tasks(&self) -> Vec<TaskRef> {
        self.tasks
            .values()
            .map(|entry| Arc::clone(&entry.task))
            .collect()
    }

    pub fn task_paths(&self) -> Vec<&str> {
        self.tasks.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl DependencyResolver for TaskRegistry {
    fn resolve(&self, task: &dyn Task) -> Result<Vec<TaskRef>> {
        let entry = self
            .tasks
            .get(task.path())
            .ok_or_else(|| GraphError::UnresolvedDependency {
                task: task.path().to_string(),
                message: "task is not registered".to_string(),
            })?;

        entry
            .depends_on
            .iter()
            .map(|dependency| {
                self.get(dependency)
                    .ok_or_else(|| GraphError::UnresolvedDependency {
                        task: task.path().to_string(),
                        message: format!("unknown dependency '{}'", dependency),
                    })
            })
            .collect()
    }
}
