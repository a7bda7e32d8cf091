// ABOUTME: Task graph engine: graph building, execution planning and dispatch
// ABOUTME: Linearizes requested tasks with their prerequisites and runs them under listener and failure control

pub mod action;
pub mod cancel;
pub mod context;
pub mod dependency;
pub mod error;
pub mod executor;
pub mod failure;
pub mod filter;
pub mod listener;
pub mod plan;
pub mod result;
pub mod scheduler;
pub mod task;

pub use action::ActionTask;
pub use cancel::CancellationToken;
pub use context::{CachingDependencyContext, DependencyContext, DependencyResolver, TaskRef};
pub use dependency::GraphBuilder;
pub use error::{GraphError, Result, TaskFailure};
pub use executor::{GraphState, TaskGraphExecuter};
pub use failure::{ContinueOnFailure, FailureDecision, StopOnFirstFailure, TaskFailureHandler};
pub use filter::{AcceptAll, ExcludeTasks, TaskFilter};
pub use listener::{
    ListenerBroadcast, TaskExecutionGraphListener, TaskExecutionListener, TaskGraphNode,
    TaskGraphNodeListener,
};
pub use plan::{ExecutionPlan, NodeId, NodeState, Readiness, TaskNode};
pub use result::{BuildResult, BuildStatus, BuildSummary, TaskResult};
pub use scheduler::{ParallelPlanExecutor, PlanExecutor, SequentialPlanExecutor, TaskWorker};
pub use task::{Task, TaskOutcome, TaskState, TaskStateSnapshot, TaskStatus};
