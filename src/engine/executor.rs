// ABOUTME: Task graph executer owning requested tasks, listeners and the execution plan
// ABOUTME: Drives the EMPTY/DIRTY/POPULATED lifecycle and hands plans to a dispatch strategy

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::cancel::CancellationToken;
use super::context::{CachingDependencyContext, DependencyResolver, TaskRef};
use super::dependency::GraphBuilder;
use super::error::{GraphError, Result};
use super::failure::{StopOnFirstFailure, TaskFailureHandler};
use super::filter::{AcceptAll, TaskFilter};
use super::listener::{
    AfterTaskAction, BeforeTaskAction, GraphAction, ListenerBroadcast, NodeAction,
    TaskExecutionGraphListener, TaskExecutionListener, TaskGraphNode, TaskGraphNodeListener,
};
use super::plan::ExecutionPlan;
use super::result::BuildResult;
use super::scheduler::{PlanExecutor, SequentialPlanExecutor, TaskWorker};
use super::task::{Task, TaskState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// Nothing requested since the last execution.
    Empty,
    /// Requests or the filter changed; the plan must be rebuilt before use.
    Dirty,
    Populated,
}

pub struct TaskGraphExecuter {
    resolver: Arc<dyn DependencyResolver>,
    plan_executor: Box<dyn PlanExecutor>,
    graph_listeners: ListenerBroadcast<dyn TaskExecutionGraphListener>,
    execution_listeners: ListenerBroadcast<dyn TaskExecutionListener>,
    node_listeners: ListenerBroadcast<dyn TaskGraphNodeListener>,
    filter: Arc<dyn TaskFilter>,
    failure_handler: Option<Arc<dyn TaskFailureHandler>>,
    cancellation: CancellationToken,
    requested: Vec<Vec<TaskRef>>,
    plan: ExecutionPlan,
    state: GraphState,
}

impl TaskGraphExecuter {
    /// Create an executer that runs tasks one at a time.
    pub fn new(resolver: Arc<dyn DependencyResolver>) -> Self {
        Self {
            resolver,
            plan_executor: Box::new(SequentialPlanExecutor),
            graph_listeners: ListenerBroadcast::new(),
            execution_listeners: ListenerBroadcast::new(),
            node_listeners: ListenerBroadcast::new(),
            filter: Arc::new(AcceptAll),
            failure_handler: None,
            cancellation: CancellationToken::new(),
            requested: Vec::new(),
            plan: ExecutionPlan::new(),
            state: GraphState::Empty,
        }
    }

    pub fn with_plan_executor(mut self, plan_executor: impl PlanExecutor + 'static) -> Self {
        self.plan_executor = Box::new(plan_executor);
        self
    }

    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn state(&self) -> GraphState {
        self.state
    }

    /// Replace the filter deciding which tasks may enter the plan.
    pub fn use_filter(&mut self, filter: impl TaskFilter + 'static) {
        self.filter = Arc::new(filter);
        if self.state != GraphState::Empty {
            self.state = GraphState::Dirty;
        }
    }

    /// Handler consulted on task failures during the next execution only.
    pub fn use_failure_handler(&mut self, handler: impl TaskFailureHandler + 'static) {
        self.failure_handler = Some(Arc::new(handler));
    }

    /// Request tasks for the next execution. Each call is linearized after
    /// the previous ones.
    pub fn add_tasks(&mut self, tasks: impl IntoIterator<Item = TaskRef>) {
        let batch: Vec<TaskRef> = tasks.into_iter().collect();
        debug!("Requested {} task(s)", batch.len());
        self.requested.push(batch);
        self.state = GraphState::Dirty;
    }

    /// Linearize pending requests if needed. Fails with `IllegalState` when
    /// nothing was requested.
    pub fn populate(&mut self) -> Result<()> {
        match self.state {
            GraphState::Empty => Err(GraphError::not_populated()),
            GraphState::Populated => Ok(()),
            GraphState::Dirty => {
                let started = Instant::now();
                let built = {
                    let mut context = CachingDependencyContext::new(self.resolver.as_ref());
                    GraphBuilder::new(self.filter.as_ref())
                        .with_node_listeners(&self.node_listeners)
                        .build_batches(&self.requested, &mut context)
                };

                match built {
                    Ok(plan) => {
                        debug!(
                            "Linearized {} tasks in {:?}",
                            plan.len(),
                            started.elapsed()
                        );
                        self.plan = plan;
                        self.state = GraphState::Populated;
                        Ok(())
                    }
                    Err(e) => {
                        warn!("Could not build the task graph: {}", e);
                        self.reset();
                        Err(e)
                    }
                }
            }
        }
    }

    pub fn has_task(&mut self, task: &dyn Task) -> Result<bool> {
        self.populate()?;
        Ok(self.plan.has_task(task))
    }

    pub fn has_task_path(&mut self, path: &str) -> Result<bool> {
        self.populate()?;
        Ok(self.plan.has_task_path(path))
    }

    /// All planned tasks in execution order.
    pub fn all_tasks(&mut self) -> Result<Vec<TaskRef>> {
        self.populate()?;
        Ok(self.plan.all_tasks())
    }

    pub fn plan(&mut self) -> Result<&ExecutionPlan> {
        self.populate()?;
        Ok(&self.plan)
    }

    /// Run the populated plan. The plan is cleared and the failure handler
    /// released afterwards, whatever the outcome.
    #[instrument(skip(self))]
    pub async fn execute(&mut self) -> Result<BuildResult> {
        let handler = self
            .failure_handler
            .take()
            .unwrap_or_else(|| Arc::new(StopOnFirstFailure));

        let result = self.run_plan(handler).await;
        self.reset();
        result
    }

    async fn run_plan(&mut self, handler: Arc<dyn TaskFailureHandler>) -> Result<BuildResult> {
        self.populate()?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let start_time = Utc::now();
        let started = Instant::now();
        info!("Starting build {} with {} tasks", run_id, self.plan.len());

        for node in self.plan.nodes() {
            node.task().state().reset();
        }

        self.graph_listeners
            .notify(|l| l.graph_populated(&self.plan))
            .map_err(|source| GraphError::Listener {
                event: "graph_populated",
                source,
            })?;

        let plan = Arc::new(std::mem::take(&mut self.plan));
        let worker = Arc::new(TaskWorker::new(
            self.execution_listeners.clone(),
            handler,
            self.cancellation.clone(),
        ));
        let processed = self.plan_executor.process(Arc::clone(&plan), worker).await;
        debug!("Executed plan in {:?}", started.elapsed());
        processed?;

        let result = BuildResult::from_plan(
            run_id,
            start_time,
            &plan,
            self.cancellation.is_cancelled(),
        );
        info!(
            "Build {} finished with status {}: {} succeeded, {} failed, {} skipped",
            result.run_id,
            result.status,
            result.summary.succeeded,
            result.summary.failed,
            result.summary.skipped
        );
        Ok(result)
    }

    fn reset(&mut self) {
        self.requested.clear();
        self.plan.clear();
        self.state = GraphState::Empty;
    }

    pub fn add_task_execution_graph_listener(
        &mut self,
        listener: Arc<dyn TaskExecutionGraphListener>,
    ) {
        self.graph_listeners.add(listener);
    }

    pub fn remove_task_execution_graph_listener(
        &mut self,
        listener: &Arc<dyn TaskExecutionGraphListener>,
    ) -> bool {
        self.graph_listeners.remove(listener)
    }

    pub fn add_task_execution_listener(&mut self, listener: Arc<dyn TaskExecutionListener>) {
        self.execution_listeners.add(listener);
    }

    pub fn remove_task_execution_listener(
        &mut self,
        listener: &Arc<dyn TaskExecutionListener>,
    ) -> bool {
        self.execution_listeners.remove(listener)
    }

    pub fn add_task_graph_node_listener(&mut self, listener: Arc<dyn TaskGraphNodeListener>) {
        self.node_listeners.add(listener);
    }

    pub fn remove_task_graph_node_listener(
        &mut self,
        listener: &Arc<dyn TaskGraphNodeListener>,
    ) -> bool {
        self.node_listeners.remove(listener)
    }

    pub fn when_ready<F>(&mut self, action: F)
    where
        F: Fn(&ExecutionPlan) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.graph_listeners.add(Arc::new(GraphAction(action)));
    }

    pub fn before_task<F>(&mut self, action: F)
    where
        F: Fn(&dyn Task) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.execution_listeners.add(Arc::new(BeforeTaskAction(action)));
    }

    pub fn after_task<F>(&mut self, action: F)
    where
        F: Fn(&dyn Task, &TaskState) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.execution_listeners.add(Arc::new(AfterTaskAction(action)));
    }

    pub fn when_task_added<F>(&mut self, action: F)
    where
        F: Fn(&mut TaskGraphNode) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.node_listeners.add(Arc::new(NodeAction(action)));
    }
}
