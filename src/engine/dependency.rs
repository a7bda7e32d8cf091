// ABOUTME: Graph builder turning requested tasks into a linearized execution plan
// ABOUTME: Queue-based depth-first expansion with cycle detection and deterministic ordering

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

use super::context::{sorted_unique, DependencyContext, TaskRef};
use super::error::{GraphError, Result};
use super::filter::{AcceptAll, TaskFilter};
use super::listener::{ListenerBroadcast, TaskGraphNode, TaskGraphNodeListener};
use super::plan::ExecutionPlan;

pub struct GraphBuilder<'a> {
    filter: &'a dyn TaskFilter,
    node_listeners: Option<&'a ListenerBroadcast<dyn TaskGraphNodeListener>>,
}

impl Default for GraphBuilder<'_> {
    fn default() -> Self {
        Self {
            filter: &AcceptAll,
            node_listeners: None,
        }
    }
}

impl<'a> GraphBuilder<'a> {
    pub fn new(filter: &'a dyn TaskFilter) -> Self {
        Self {
            filter,
            node_listeners: None,
        }
    }

    pub fn with_node_listeners(
        mut self,
        listeners: &'a ListenerBroadcast<dyn TaskGraphNodeListener>,
    ) -> Self {
        self.node_listeners = Some(listeners);
        self
    }

    /// Build a plan for one set of requested tasks.
    pub fn build(
        &self,
        requested: &[TaskRef],
        context: &mut dyn DependencyContext,
    ) -> Result<ExecutionPlan> {
        self.build_batches(std::slice::from_ref(&requested.to_vec()), context)
    }

    /// Build a plan for several requests in order. Every task of an earlier
    /// batch comes before the tasks first introduced by a later one.
    pub fn build_batches(
        &self,
        batches: &[Vec<TaskRef>],
        context: &mut dyn DependencyContext,
    ) -> Result<ExecutionPlan> {
        let mut plan = ExecutionPlan::new();
        let mut expanded = HashMap::new();
        let mut follows = HashMap::new();
        for batch in batches {
            self.fill(&mut plan, batch, context, &mut expanded, &mut follows)?;
        }
        debug!("Linearized {} tasks from {} request(s)", plan.len(), batches.len());
        Ok(plan)
    }

    fn fill(
        &self,
        plan: &mut ExecutionPlan,
        requested: &[TaskRef],
        context: &mut dyn DependencyContext,
        expanded: &mut HashMap<String, Vec<TaskRef>>,
        follows: &mut HashMap<String, Vec<TaskRef>>,
    ) -> Result<()> {
        let mut queue: VecDeque<TaskRef> = sorted_unique(requested.to_vec()).into();
        let mut visiting: HashSet<String> = HashSet::new();

        while let Some(task) = queue.front().cloned() {
            let path = task.path();

            if !self.filter.accepts(task.as_ref()) {
                trace!("Task {} rejected by filter", path);
                queue.pop_front();
                continue;
            }
            if plan.node_id(path).is_some() {
                queue.pop_front();
                continue;
            }

            if visiting.insert(path.to_string()) {
                // First visit: queue the prerequisites ahead of this task and
                // leave it in place to be finalized once they are done.
                let (mut dependencies, dependees) = self.expand(&task, context)?;
                if let Some(predecessors) = follows.remove(path) {
                    dependencies.extend(predecessors);
                    dependencies = sorted_unique(dependencies);
                }

                let mut queued = 0;
                for dependency in dependencies.iter().rev() {
                    if visiting.contains(dependency.path()) {
                        return Err(GraphError::CircularDependency {
                            cycle: cycle_path(path, dependency.path(), &visiting, expanded),
                        });
                    }
                    if plan.node_id(dependency.path()).is_none() {
                        queue.push_front(Arc::clone(dependency));
                        queued += 1;
                    }
                }

                // Dependees go right behind this task and wait for it.
                for dependee in dependees.iter().rev() {
                    let dependee_path = dependee.path();
                    if visiting.contains(dependee_path) {
                        // Already on the way to this task, so it depends on it.
                        trace!("Dependee {} of {} is already being visited", dependee_path, path);
                        continue;
                    }
                    if plan.node_id(dependee_path).is_some() {
                        continue;
                    }
                    follows
                        .entry(dependee_path.to_string())
                        .or_default()
                        .push(Arc::clone(&task));
                    queue.insert(queued + 1, Arc::clone(dependee));
                }
                expanded.insert(path.to_string(), dependencies);
            } else {
                queue.pop_front();
                visiting.remove(path);

                // Prerequisites missing from the plan were filtered out.
                let dependency_ids = expanded
                    .get(path)
                    .map(|dependencies| {
                        dependencies
                            .iter()
                            .filter_map(|dependency| plan.node_id(dependency.path()))
                            .collect()
                    })
                    .unwrap_or_default();
                trace!("Adding {} to the plan", path);
                plan.insert(task, dependency_ids);
            }
        }

        Ok(())
    }

    /// Prerequisites and dependees of `task`, each sorted by path.
    fn expand(
        &self,
        task: &TaskRef,
        context: &mut dyn DependencyContext,
    ) -> Result<(Vec<TaskRef>, Vec<TaskRef>)> {
        let dependencies = context.dependencies_of(task.as_ref())?;
        let Some(listeners) = self.node_listeners.filter(|l| !l.is_empty()) else {
            return Ok((dependencies, Vec::new()));
        };

        let mut node = TaskGraphNode::new(Arc::clone(task), dependencies);
        listeners
            .notify(|listener| listener.task_added(&mut node))
            .map_err(|source| GraphError::Listener {
                event: "task_added",
                source,
            })?;
        let (dependencies, dependees) = node.into_parts();
        Ok((sorted_unique(dependencies), sorted_unique(dependees)))
    }
}

/// Reconstruct `task -> dependency -> ... -> task` from the expansions of the
/// tasks currently being visited.
fn cycle_path(
    task: &str,
    dependency: &str,
    visiting: &HashSet<String>,
    expanded: &HashMap<String, Vec<TaskRef>>,
) -> Vec<String> {
    if task == dependency {
        return vec![task.to_string(), task.to_string()];
    }

    let mut previous: HashMap<&str, &str> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::from([dependency]);
    while let Some(current) = queue.pop_front() {
        if current == task {
            let mut path = vec![task.to_string()];
            let mut step = task;
            while let Some(&before) = previous.get(step) {
                path.push(before.to_string());
                step = before;
            }
            path.push(task.to_string());
            path.reverse();
            return path;
        }
        let Some(next) = expanded.get(current) else {
            continue;
        };
        for candidate in next {
            let candidate = candidate.path();
            if visiting.contains(candidate)
                && candidate != dependency
                && !previous.contains_key(candidate)
            {
                previous.insert(candidate, current);
                queue.push_back(candidate);
            }
        }
    }

    vec![task.to_string(), dependency.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::action::ActionTask;
    use crate::engine::context::CachingDependencyContext;
    use crate::engine::filter::ExcludeTasks;
    use crate::engine::listener::NodeAction;
    use crate::engine::task::Task;

    /// Tasks keyed by path with their declared prerequisites.
    struct Fixture {
        tasks: HashMap<String, TaskRef>,
        edges: HashMap<String, Vec<String>>,
    }

    impl Fixture {
        fn new(graph: &[(&str, &[&str])]) -> Self {
            let mut tasks = HashMap::new();
            let mut edges = HashMap::new();
            for (path, deps) in graph {
                tasks.insert(
                    path.to_string(),
                    Arc::new(ActionTask::new(*path)) as TaskRef,
                );
                edges.insert(
                    path.to_string(),
                    deps.iter().map(|d| d.to_string()).collect(),
                );
            }
            Self { tasks, edges }
        }

        fn task(&self, path: &str) -> TaskRef {
            Arc::clone(&self.tasks[path])
        }

        fn tasks(&self, paths: &[&str]) -> Vec<TaskRef> {
            paths.iter().map(|p| self.task(p)).collect()
        }

        fn resolver(&self) -> impl Fn(&dyn Task) -> Result<Vec<TaskRef>> + '_ {
            move |task: &dyn Task| {
                Ok(self.edges[task.path()]
                    .iter()
                    .map(|d| self.task(d))
                    .collect())
            }
        }
    }

    fn paths(plan: &ExecutionPlan) -> Vec<String> {
        plan.paths().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_diamond_is_topologically_ordered() {
        let fixture = Fixture::new(&[
            ("a", &[]),
            ("b", &["a"]),
            ("c", &["a"]),
            ("d", &["c", "b"]),
        ]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);

        let plan = GraphBuilder::default()
            .build(&fixture.tasks(&["d"]), &mut context)
            .unwrap();

        assert_eq!(paths(&plan), vec!["a", "b", "c", "d"]);
        for node in plan.nodes() {
            let position = plan.node_id(node.task().path()).unwrap();
            assert!(node.dependencies().iter().all(|&dep| dep < position));
        }
        assert_eq!(plan.dependency_paths("d"), vec!["b", "c"]);
    }

    #[test]
    fn test_requested_tasks_are_sorted() {
        let fixture = Fixture::new(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);

        let plan = GraphBuilder::default()
            .build(&fixture.tasks(&["zeta", "mid", "alpha"]), &mut context)
            .unwrap();

        assert_eq!(paths(&plan), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_empty_request_gives_empty_plan() {
        let fixture = Fixture::new(&[]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);

        let plan = GraphBuilder::default().build(&[], &mut context).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_duplicate_request_is_idempotent() {
        let fixture = Fixture::new(&[("a", &[]), ("b", &["a"])]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);

        let plan = GraphBuilder::default()
            .build(&fixture.tasks(&["b", "a", "b"]), &mut context)
            .unwrap();

        assert_eq!(paths(&plan), vec!["a", "b"]);
    }

    #[test]
    fn test_two_task_cycle_names_both() {
        let fixture = Fixture::new(&[("a", &["b"]), ("b", &["a"])]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);

        let err = GraphBuilder::default()
            .build(&fixture.tasks(&["a"]), &mut context)
            .unwrap_err();

        let cycle = err.cycle().unwrap();
        assert!(cycle.contains(&"a".to_string()));
        assert!(cycle.contains(&"b".to_string()));
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn test_long_cycle_path() {
        let fixture = Fixture::new(&[
            ("a", &["b"]),
            ("b", &["c"]),
            ("c", &["a"]),
            ("root", &["a"]),
        ]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);

        let err = GraphBuilder::default()
            .build(&fixture.tasks(&["root"]), &mut context)
            .unwrap_err();

        assert_eq!(err.cycle().unwrap(), ["c", "a", "b", "c"]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let fixture = Fixture::new(&[("a", &["a"])]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);

        let err = GraphBuilder::default()
            .build(&fixture.tasks(&["a"]), &mut context)
            .unwrap_err();

        assert_eq!(err.cycle().unwrap(), ["a", "a"]);
    }

    #[test]
    fn test_filtered_dependency_is_dropped() {
        let fixture = Fixture::new(&[("a", &[]), ("b", &["a"])]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);
        let filter = ExcludeTasks::new(["a"]);

        let plan = GraphBuilder::new(&filter)
            .build(&fixture.tasks(&["a", "b"]), &mut context)
            .unwrap();

        assert_eq!(paths(&plan), vec!["b"]);
        assert!(plan.node(0).unwrap().dependencies().is_empty());
    }

    #[test]
    fn test_batches_keep_request_order() {
        let fixture = Fixture::new(&[("a", &[]), ("b", &[]), ("c", &["a"])]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);

        let plan = GraphBuilder::default()
            .build_batches(
                &[fixture.tasks(&["b"]), fixture.tasks(&["c", "b"])],
                &mut context,
            )
            .unwrap();

        assert_eq!(paths(&plan), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_node_listener_adds_prerequisite() {
        let fixture = Fixture::new(&[("compile", &[]), ("generate", &[])]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);

        let generate = fixture.task("generate");
        let mut listeners: ListenerBroadcast<dyn TaskGraphNodeListener> = ListenerBroadcast::new();
        listeners.add(Arc::new(NodeAction(
            move |node: &mut TaskGraphNode| -> anyhow::Result<()> {
                if node.task().path() == "compile" {
                    node.add_dependency(Arc::clone(&generate));
                }
                Ok(())
            },
        )));

        let plan = GraphBuilder::default()
            .with_node_listeners(&listeners)
            .build(&fixture.tasks(&["compile"]), &mut context)
            .unwrap();

        assert_eq!(paths(&plan), vec!["generate", "compile"]);
        assert_eq!(plan.dependency_paths("compile"), vec!["generate"]);
    }

    /// Node listener adding `dependees` to the task at `path`.
    fn dependee_listener(
        fixture: &Fixture,
        path: &'static str,
        dependees: &[&str],
    ) -> ListenerBroadcast<dyn TaskGraphNodeListener> {
        let dependees = fixture.tasks(dependees);
        let mut listeners: ListenerBroadcast<dyn TaskGraphNodeListener> = ListenerBroadcast::new();
        listeners.add(Arc::new(NodeAction(
            move |node: &mut TaskGraphNode| -> anyhow::Result<()> {
                if node.task().path() == path {
                    for dependee in &dependees {
                        node.add_dependee(Arc::clone(dependee));
                    }
                }
                Ok(())
            },
        )));
        listeners
    }

    #[test]
    fn test_node_listener_adds_dependees() {
        let fixture = Fixture::new(&[
            ("app", &[]),
            ("compile", &[]),
            ("test", &["compile"]),
            ("zip", &[]),
            ("docs", &["assets"]),
            ("assets", &[]),
        ]);
        let resolver = fixture.resolver();
        let listeners = dependee_listener(&fixture, "test", &["zip", "docs"]);

        let mut orders = Vec::new();
        for _ in 0..3 {
            let mut context = CachingDependencyContext::new(&resolver);
            let plan = GraphBuilder::default()
                .with_node_listeners(&listeners)
                .build(&fixture.tasks(&["test", "app"]), &mut context)
                .unwrap();
            assert_eq!(plan.dependency_paths("docs"), vec!["assets", "test"]);
            assert_eq!(plan.dependency_paths("zip"), vec!["test"]);
            orders.push(paths(&plan));
        }

        assert_eq!(
            orders[0],
            vec!["app", "compile", "test", "assets", "docs", "zip"]
        );
        assert!(orders.iter().all(|order| order == &orders[0]));
    }

    #[test]
    fn test_dependee_already_being_visited_is_skipped() {
        let fixture = Fixture::new(&[("app", &["test"]), ("test", &[])]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);
        let listeners = dependee_listener(&fixture, "test", &["app"]);

        let plan = GraphBuilder::default()
            .with_node_listeners(&listeners)
            .build(&fixture.tasks(&["app"]), &mut context)
            .unwrap();

        assert_eq!(paths(&plan), vec!["test", "app"]);
        assert_eq!(plan.dependency_paths("app"), vec!["test"]);
    }

    #[test]
    fn test_dependee_reached_through_a_prerequisite_is_a_cycle() {
        // report must follow test, but test needs report first.
        let fixture = Fixture::new(&[("test", &["report"]), ("report", &[])]);
        let resolver = fixture.resolver();
        let mut context = CachingDependencyContext::new(&resolver);
        let listeners = dependee_listener(&fixture, "test", &["report"]);

        let err = GraphBuilder::default()
            .with_node_listeners(&listeners)
            .build(&fixture.tasks(&["test"]), &mut context)
            .unwrap_err();

        assert_eq!(err.cycle().unwrap(), ["report", "test", "report"]);
    }

    #[test]
    fn test_resolver_error_aborts_build() {
        let resolver = |task: &dyn Task| -> Result<Vec<TaskRef>> {
            Err(GraphError::UnresolvedDependency {
                task: task.path().to_string(),
                message: "no such task".to_string(),
            })
        };
        let mut context = CachingDependencyContext::new(&resolver);
        let task: TaskRef = Arc::new(ActionTask::new("a"));

        let err = GraphBuilder::default()
            .build(&[task], &mut context)
            .unwrap_err();
        assert!(matches!(err, GraphError::UnresolvedDependency { .. }));
    }

    #[test]
    fn test_build_is_deterministic() {
        let fixture = Fixture::new(&[
            ("lib", &[]),
            ("api", &["lib"]),
            ("app", &["api", "lib", "ui"]),
            ("ui", &["lib"]),
            ("docs", &[]),
        ]);
        let resolver = fixture.resolver();

        let first = {
            let mut context = CachingDependencyContext::new(&resolver);
            GraphBuilder::default()
                .build(&fixture.tasks(&["docs", "app"]), &mut context)
                .unwrap()
        };
        let second = {
            let mut context = CachingDependencyContext::new(&resolver);
            GraphBuilder::default()
                .build(&fixture.tasks(&["app", "docs"]), &mut context)
                .unwrap()
        };

        assert_eq!(paths(&first), paths(&second));
        assert_eq!(paths(&first), vec!["lib", "api", "ui", "app", "docs"]);
    }
}
