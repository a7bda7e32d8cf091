// ABOUTME: Linearized execution plan and per-node execution state
// ABOUTME: An insertion-ordered node arena with atomic state transitions shared by workers

use indexmap::IndexMap;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use super::context::TaskRef;
use super::task::Task;

/// Position of a node in its plan.
pub type NodeId = usize;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeState {
    Pending = 0,
    /// Claimed by a worker and in flight.
    Running = 1,
    Executed = 2,
    Failed = 3,
    Skipped = 4,
}

impl NodeState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => NodeState::Pending,
            1 => NodeState::Running,
            2 => NodeState::Executed,
            3 => NodeState::Failed,
            _ => NodeState::Skipped,
        }
    }

    pub fn is_final(self) -> bool {
        matches!(
            self,
            NodeState::Executed | NodeState::Failed | NodeState::Skipped
        )
    }
}

/// Whether a pending node may be dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// A dependency is still pending or running.
    Waiting,
    /// A dependency failed or was skipped; the node can never run in this build.
    Blocked,
}

pub struct TaskNode {
    task: TaskRef,
    dependencies: Vec<NodeId>,
    state: AtomicU8,
}

impl TaskNode {
    pub fn task(&self) -> &TaskRef {
        &self.task
    }

    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    pub fn state(&self) -> NodeState {
        NodeState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True only after the task completed successfully.
    pub fn executed(&self) -> bool {
        self.state() == NodeState::Executed
    }

    fn transition(&self, from: NodeState, to: NodeState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("task", &self.task.path())
            .field("dependencies", &self.dependencies)
            .field("state", &self.state())
            .finish()
    }
}

/// Tasks in a valid topological order: every node comes after all of its
/// dependencies. Node state is the only thing that changes once a plan has
/// been built, and every change goes through a compare-and-set.
#[derive(Default)]
pub struct ExecutionPlan {
    nodes: IndexMap<String, TaskNode>,
}

impl ExecutionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. Dependencies must already be in the plan.
    pub(crate) fn insert(&mut self, task: TaskRef, dependencies: Vec<NodeId>) -> NodeId {
        debug_assert!(dependencies.iter().all(|&id| id < self.nodes.len()));
        let path = task.path().to_string();
        let (id, _) = self.nodes.insert_full(
            path,
            TaskNode {
                task,
                dependencies,
                state: AtomicU8::new(NodeState::Pending as u8),
            },
        );
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn has_task(&self, task: &dyn Task) -> bool {
        self.nodes.contains_key(task.path())
    }

    pub fn has_task_path(&self, path: &str) -> bool {
        self.nodes.values().any(|node| node.task.path() == path)
    }

    pub fn node_id(&self, path: &str) -> Option<NodeId> {
        self.nodes.get_index_of(path)
    }

    pub fn node(&self, id: NodeId) -> Option<&TaskNode> {
        self.nodes.get_index(id).map(|(_, node)| node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.values()
    }

    /// All tasks in execution order.
    pub fn all_tasks(&self) -> Vec<TaskRef> {
        self.nodes.values().map(|node| node.task.clone()).collect()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.nodes.keys().map(String::as_str).collect()
    }

    /// Paths of the resolved dependencies of `path`, in plan order.
    pub fn dependency_paths(&self, path: &str) -> Vec<&str> {
        let Some(node) = self.nodes.get(path) else {
            return Vec::new();
        };
        node.dependencies
            .iter()
            .filter_map(|&id| self.nodes.get_index(id).map(|(p, _)| p.as_str()))
            .collect()
    }

    pub fn readiness(&self, id: NodeId) -> Readiness {
        let Some(node) = self.node(id) else {
            return Readiness::Blocked;
        };

        let mut readiness = Readiness::Ready;
        for &dependency in &node.dependencies {
            match self.node(dependency).map(TaskNode::state) {
                Some(NodeState::Executed) => {}
                Some(NodeState::Pending) | Some(NodeState::Running) => {
                    readiness = Readiness::Waiting;
                }
                _ => return Readiness::Blocked,
            }
        }
        readiness
    }

    /// Claim a ready node for execution. Readiness and the
    /// `Pending -> Running` transition form one decision: at most one
    /// caller wins, and only while every dependency is executed.
    pub fn try_claim(&self, id: NodeId) -> bool {
        if self.readiness(id) != Readiness::Ready {
            return false;
        }
        self.node(id)
            .is_some_and(|node| node.transition(NodeState::Pending, NodeState::Running))
    }

    pub(crate) fn complete(&self, id: NodeId, succeeded: bool) {
        if let Some(node) = self.node(id) {
            let to = if succeeded {
                NodeState::Executed
            } else {
                NodeState::Failed
            };
            node.transition(NodeState::Running, to);
        }
    }

    /// Hand a claimed node back unstarted, `Running -> Pending`.
    pub(crate) fn release(&self, id: NodeId) -> bool {
        self.node(id)
            .is_some_and(|node| node.transition(NodeState::Running, NodeState::Pending))
    }

    /// Mark a blocked node as skipped. Returns false if the node was not
    /// pending or is not blocked.
    pub(crate) fn skip(&self, id: NodeId) -> bool {
        if self.readiness(id) != Readiness::Blocked {
            return false;
        }
        self.node(id)
            .is_some_and(|node| node.transition(NodeState::Pending, NodeState::Skipped))
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Dependency graph of the plan with edges pointing from a dependency to
    /// its dependent.
    pub fn to_graph(&self) -> DiGraph<String, ()> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), 0);
        let indices: Vec<NodeIndex> = self
            .nodes
            .keys()
            .map(|path| graph.add_node(path.clone()))
            .collect();

        for (id, node) in self.nodes.values().enumerate() {
            for &dependency in &node.dependencies {
                graph.add_edge(indices[dependency], indices[id], ());
            }
        }
        graph
    }
}

impl fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.values()).finish()
    }
}
