// ABOUTME: Task filters restricting which tasks enter an execution plan
// ABOUTME: Rejected tasks are dropped along with the edges pointing at them

use std::collections::HashSet;

use super::task::Task;

pub trait TaskFilter: Send + Sync {
    fn accepts(&self, task: &dyn Task) -> bool;
}

impl<F> TaskFilter for F
where
    F: Fn(&dyn Task) -> bool + Send + Sync,
{
    fn accepts(&self, task: &dyn Task) -> bool {
        self(task)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl TaskFilter for AcceptAll {
    fn accepts(&self, _task: &dyn Task) -> bool {
        true
    }
}

/// Rejects tasks by path, like `-x` on the command line.
#[derive(Debug, Clone, Default)]
pub struct ExcludeTasks {
    paths: HashSet<String>,
}

impl ExcludeTasks {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl TaskFilter for ExcludeTasks {
    fn accepts(&self, task: &dyn Task) -> bool {
        !self.paths.contains(task.path())
    }
}
