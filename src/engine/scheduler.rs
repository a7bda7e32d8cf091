// ABOUTME: Dispatch strategies that walk an execution plan and run its tasks
// ABOUTME: Sequential baseline plus a semaphore-gated worker pool on tokio tasks

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::cancel::CancellationToken;
use super::error::{GraphError, Result, TaskFailure};
use super::failure::{FailureDecision, StopOnFirstFailure, TaskFailureHandler};
use super::listener::{ListenerBroadcast, TaskExecutionListener};
use super::plan::{ExecutionPlan, NodeId, NodeState, Readiness};

/// Runs a single claimed node: before-task notifications, the task itself,
/// the failure decision, after-task notifications, then the final node
/// state. Shared by every worker of one build.
pub struct TaskWorker {
    listeners: ListenerBroadcast<dyn TaskExecutionListener>,
    failure_handler: Arc<dyn TaskFailureHandler>,
    cancellation: CancellationToken,
    stopped: AtomicBool,
}

impl TaskWorker {
    pub fn new(
        listeners: ListenerBroadcast<dyn TaskExecutionListener>,
        failure_handler: Arc<dyn TaskFailureHandler>,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            listeners,
            failure_handler,
            cancellation,
            stopped: AtomicBool::new(false),
        }
    }

    /// True once a failure handler asked to stop or the build was cancelled.
    /// No new node may start after this turns true.
    pub fn should_stop(&self) -> bool {
        self.stopped.load(Ordering::SeqCst) || self.cancellation.is_cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Mark a blocked node and its task as skipped. No listener is notified.
    pub(crate) fn skip(&self, plan: &ExecutionPlan, id: NodeId) -> bool {
        if !plan.skip(id) {
            return false;
        }
        if let Some(node) = plan.node(id) {
            debug!("Skipping task {}: a dependency did not succeed", node.task().path());
            node.task().state().mark_skipped();
        }
        true
    }

    /// Execute a node previously claimed with [`ExecutionPlan::try_claim`].
    pub async fn execute(&self, plan: &ExecutionPlan, id: NodeId) -> Result<()> {
        let node = plan
            .node(id)
            .ok_or_else(|| GraphError::Worker(format!("no node with id {}", id)))?;
        let task = Arc::clone(node.task());

        // Claimed before a stop but not started yet.
        if self.should_stop() {
            debug!("Not starting task {}: build is stopping", task.path());
            plan.release(id);
            return Ok(());
        }

        if let Err(source) = self.listeners.notify(|l| l.before_execute(task.as_ref())) {
            self.abandon(plan, id);
            return Err(GraphError::Listener {
                event: "before_task",
                source,
            });
        }

        info!("Executing task: {}", task.path());
        task.state().mark_executing();
        let outcome = AssertUnwindSafe(task.run())
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(TaskFailure::new(format!(
                    "task panicked: {}",
                    panic_message(panic.as_ref())
                )))
            });
        task.state().record_outcome(&outcome);

        if let Err(failure) = &outcome {
            warn!("Task {} failed: {}", task.path(), failure);
            if self.failure_handler.on_task_failure(task.as_ref(), failure) == FailureDecision::Stop
            {
                debug!("Failure handler stopped the build after {}", task.path());
                self.stop();
            }
        }

        if let Err(source) = self
            .listeners
            .notify(|l| l.after_execute(task.as_ref(), task.state()))
        {
            self.abandon(plan, id);
            return Err(GraphError::Listener {
                event: "after_task",
                source,
            });
        }

        plan.complete(id, outcome.is_ok());
        Ok(())
    }

    fn abandon(&self, plan: &ExecutionPlan, id: NodeId) {
        self.stop();
        plan.complete(id, false);
    }
}

impl Default for TaskWorker {
    fn default() -> Self {
        Self::new(
            ListenerBroadcast::new(),
            Arc::new(StopOnFirstFailure),
            CancellationToken::new(),
        )
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Strategy for walking a populated plan.
#[async_trait]
pub trait PlanExecutor: Send + Sync {
    async fn process(&self, plan: Arc<ExecutionPlan>, worker: Arc<TaskWorker>) -> Result<()>;
}

/// One task at a time, in plan order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPlanExecutor;

#[async_trait]
impl PlanExecutor for SequentialPlanExecutor {
    async fn process(&self, plan: Arc<ExecutionPlan>, worker: Arc<TaskWorker>) -> Result<()> {
        for id in 0..plan.len() {
            if worker.should_stop() {
                break;
            }
            match plan.readiness(id) {
                Readiness::Blocked => {
                    worker.skip(&plan, id);
                }
                Readiness::Ready => {
                    if plan.try_claim(id) {
                        worker.execute(&plan, id).await?;
                    }
                }
                // Dependencies precede their dependents, so nothing waits here.
                Readiness::Waiting => {}
            }
        }

        if worker.is_cancelled() {
            info!("Build cancelled");
        }
        Ok(())
    }
}

/// Runs ready nodes concurrently on tokio tasks, at most `max_workers` at a
/// time. A single dispatcher scans the plan in order, so ties between ready
/// nodes are broken by plan position.
#[derive(Debug, Clone, Copy)]
pub struct ParallelPlanExecutor {
    max_workers: usize,
}

impl ParallelPlanExecutor {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Claim and spawn every node that can start now. Blocked nodes met on
    /// the way are skipped; plan order guarantees a skip is seen by later
    /// dependents within the same scan.
    fn dispatch(
        &self,
        plan: &Arc<ExecutionPlan>,
        worker: &Arc<TaskWorker>,
        semaphore: &Arc<Semaphore>,
        running: &mut JoinSet<Result<()>>,
    ) {
        for id in 0..plan.len() {
            if worker.should_stop() {
                return;
            }
            if plan.node(id).map(|node| node.state()) != Some(NodeState::Pending) {
                continue;
            }
            match plan.readiness(id) {
                Readiness::Blocked => {
                    worker.skip(plan, id);
                }
                Readiness::Ready => {
                    let Ok(permit) = Arc::clone(semaphore).try_acquire_owned() else {
                        return;
                    };
                    if plan.try_claim(id) {
                        let plan = Arc::clone(plan);
                        let worker = Arc::clone(worker);
                        running.spawn(async move {
                            let _permit = permit;
                            worker.execute(&plan, id).await
                        });
                    }
                }
                Readiness::Waiting => {}
            }
        }
    }
}

impl Default for ParallelPlanExecutor {
    fn default() -> Self {
        Self::new(
            std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1),
        )
    }
}

#[async_trait]
impl PlanExecutor for ParallelPlanExecutor {
    async fn process(&self, plan: Arc<ExecutionPlan>, worker: Arc<TaskWorker>) -> Result<()> {
        debug!("Processing plan with up to {} workers", self.max_workers);
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut running = JoinSet::new();
        let mut first_error: Option<GraphError> = None;

        loop {
            if first_error.is_none() {
                self.dispatch(&plan, &worker, &semaphore, &mut running);
            }

            // Nothing in flight and nothing dispatchable: the walk is over.
            let Some(joined) = running.join_next().await else {
                break;
            };
            let result = joined.unwrap_or_else(|join_error| {
                error!("Task worker died: {}", join_error);
                Err(GraphError::Worker(join_error.to_string()))
            });
            if let Err(e) = result {
                worker.stop();
                first_error.get_or_insert(e);
            }
        }

        if worker.is_cancelled() {
            info!("Build cancelled");
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
