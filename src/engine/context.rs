// ABOUTME: Dependency discovery collaborators consumed by the graph builder
// ABOUTME: Provides the resolver contract and a per-build caching context

use std::collections::HashMap;
use std::sync::Arc;

use super::error::Result;
use super::task::Task;

pub type TaskRef = Arc<dyn Task>;

/// Answers "what must run before this task". Implemented outside the
/// engine, e.g. by the task registry built from a task-graph file.
pub trait DependencyResolver: Send + Sync {
    fn resolve(&self, task: &dyn Task) -> Result<Vec<TaskRef>>;
}

impl<F> DependencyResolver for F
where
    F: Fn(&dyn Task) -> Result<Vec<TaskRef>> + Send + Sync,
{
    fn resolve(&self, task: &dyn Task) -> Result<Vec<TaskRef>> {
        self(task)
    }
}

/// The view of dependency discovery used during one graph build.
pub trait DependencyContext {
    /// Prerequisites of `task`, sorted by path with duplicates removed.
    fn dependencies_of(&mut self, task: &dyn Task) -> Result<Vec<TaskRef>>;
}

/// Memoizes resolver answers for the lifetime of one build. A fresh context
/// is created for every linearization, so nothing is shared across builds.
pub struct CachingDependencyContext<'a> {
    resolver: &'a dyn DependencyResolver,
    cache: HashMap<String, Vec<TaskRef>>,
}

impl<'a> CachingDependencyContext<'a> {
    pub fn new(resolver: &'a dyn DependencyResolver) -> Self {
        Self {
            resolver,
            cache: HashMap::new(),
        }
    }

    pub fn cached_tasks(&self) -> usize {
        self.cache.len()
    }
}

impl DependencyContext for CachingDependencyContext<'_> {
    fn dependencies_of(&mut self, task: &dyn Task) -> Result<Vec<TaskRef>> {
        if let Some(dependencies) = self.cache.get(task.path()) {
            return Ok(dependencies.clone());
        }

        let dependencies = sorted_unique(self.resolver.resolve(task)?);
        self.cache
            .insert(task.path().to_string(), dependencies.clone());
        Ok(dependencies)
    }
}

/// Sort tasks by path and drop repeated paths, keeping the first occurrence.
pub(crate) fn sorted_unique(mut tasks: Vec<TaskRef>) -> Vec<TaskRef> {
    tasks.sort_by(|a, b| a.path().cmp(b.path()));
    tasks.dedup_by(|a, b| a.path() == b.path());
    tasks
}
