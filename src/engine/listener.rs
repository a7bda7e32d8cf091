// ABOUTME: Typed listener registries for graph and task execution events
// ABOUTME: Broadcasts to observers in registration order and stops at the first error

use std::sync::Arc;

use super::context::TaskRef;
use super::plan::ExecutionPlan;
use super::task::{Task, TaskState};

/// Notified once the plan is linearized, before any task runs.
pub trait TaskExecutionGraphListener: Send + Sync {
    fn graph_populated(&self, graph: &ExecutionPlan) -> anyhow::Result<()>;
}

/// Notified around every task that is actually executed. Skipped tasks
/// produce no notifications.
pub trait TaskExecutionListener: Send + Sync {
    fn before_execute(&self, _task: &dyn Task) -> anyhow::Result<()> {
        Ok(())
    }

    fn after_execute(&self, _task: &dyn Task, _state: &TaskState) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Notified when a task is first expanded during graph construction.
pub trait TaskGraphNodeListener: Send + Sync {
    fn task_added(&self, node: &mut TaskGraphNode) -> anyhow::Result<()>;
}

/// A task being added to the graph. Listeners may attach extra
/// prerequisites, or dependees that must run after it, before the node's
/// dependencies are expanded.
#[derive(Debug)]
pub struct TaskGraphNode {
    task: TaskRef,
    dependencies: Vec<TaskRef>,
    dependees: Vec<TaskRef>,
}

impl TaskGraphNode {
    pub(crate) fn new(task: TaskRef, dependencies: Vec<TaskRef>) -> Self {
        Self {
            task,
            dependencies,
            dependees: Vec::new(),
        }
    }

    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    pub fn dependencies(&self) -> &[TaskRef] {
        &self.dependencies
    }

    pub fn add_dependency(&mut self, task: TaskRef) {
        self.dependencies.push(task);
    }

    pub fn dependees(&self) -> &[TaskRef] {
        &self.dependees
    }

    /// Pull `task` into the graph to run after this node.
    pub fn add_dependee(&mut self, task: TaskRef) {
        self.dependees.push(task);
    }

    pub(crate) fn into_parts(self) -> (Vec<TaskRef>, Vec<TaskRef>) {
        (self.dependencies, self.dependees)
    }
}

/// Ordered fan-out to listeners of one kind.
pub struct ListenerBroadcast<L: ?Sized> {
    listeners: Vec<Arc<L>>,
}

impl<L: ?Sized> ListenerBroadcast<L> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add(&mut self, listener: Arc<L>) {
        self.listeners.push(listener);
    }

    /// Remove a listener previously added, matched by pointer identity.
    pub fn remove(&mut self, listener: &Arc<L>) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invoke `event` on every listener in registration order. The first
    /// error aborts the remaining notifications and is returned.
    pub fn notify<F>(&self, mut event: F) -> anyhow::Result<()>
    where
        F: FnMut(&L) -> anyhow::Result<()>,
    {
        for listener in &self.listeners {
            event(listener)?;
        }
        Ok(())
    }
}

impl<L: ?Sized> Default for ListenerBroadcast<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Clone for ListenerBroadcast<L> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

pub(crate) struct GraphAction<F>(pub F);

impl<F> TaskExecutionGraphListener for GraphAction<F>
where
    F: Fn(&ExecutionPlan) -> anyhow::Result<()> + Send + Sync,
{
    fn graph_populated(&self, graph: &ExecutionPlan) -> anyhow::Result<()> {
        (self.0)(graph)
    }
}

pub(crate) struct BeforeTaskAction<F>(pub F);

impl<F> TaskExecutionListener for BeforeTaskAction<F>
where
    F: Fn(&dyn Task) -> anyhow::Result<()> + Send + Sync,
{
    fn before_execute(&self, task: &dyn Task) -> anyhow::Result<()> {
        (self.0)(task)
    }
}

pub(crate) struct AfterTaskAction<F>(pub F);

impl<F> TaskExecutionListener for AfterTaskAction<F>
where
    F: Fn(&dyn Task, &TaskState) -> anyhow::Result<()> + Send + Sync,
{
    fn after_execute(&self, task: &dyn Task, state: &TaskState) -> anyhow::Result<()> {
        (self.0)(task, state)
    }
}

pub(crate) struct NodeAction<F>(pub F);

impl<F> TaskGraphNodeListener for NodeAction<F>
where
    F: Fn(&mut TaskGraphNode) -> anyhow::Result<()> + Send + Sync,
{
    fn task_added(&self, node: &mut TaskGraphNode) -> anyhow::Result<()> {
        (self.0)(node)
    }
}
