// src/tasks/graph.rs

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use anyhow::anyhow;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::errors::{BuildError, Result};
use crate::fs::remove_tree;
use crate::pipeline::{ErrorHandler, FileSet, TransformOptions, TransformOutcome, TransformPipeline};
use crate::tasks::config::{ResolvedTask, TaskConfig, TaskKind};
use crate::tasks::TaskName;
use crate::watch::{EventSource, Notifier, WatchDispatcher, WatchHandle, WatcherRegistry};

/// A caller-supplied unit of work that can be depended upon.
pub type ExternalTask =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync>;

/// Names generated by [`TaskGraph::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredTasks {
    pub transform: TaskName,
    pub watch: TaskName,
}

enum TaskBody {
    Transform(Arc<ResolvedTask>),
    Watch(Arc<ResolvedTask>),
    External(ExternalTask),
}

struct TaskEntry {
    deps: Vec<TaskName>,
    body: TaskBody,
}

/// Named tasks with dependency edges.
///
/// Execution is sequential: [`TaskGraph::run`] walks the topological order of
/// a task and its transitive dependencies and awaits each one.
pub struct TaskGraph {
    tasks: BTreeMap<TaskName, TaskEntry>,
    pipeline: TransformPipeline,
    events: Arc<dyn EventSource>,
    notifier: Arc<dyn Notifier>,
    defaults: TransformOptions,
    cwd: PathBuf,
    on_error: Option<Arc<ErrorHandler>>,
}

impl fmt::Debug for TaskGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskGraph")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .field("cwd", &self.cwd)
            .finish_non_exhaustive()
    }
}

impl TaskGraph {
    pub fn new(
        pipeline: TransformPipeline,
        events: Arc<dyn EventSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            tasks: BTreeMap::new(),
            pipeline,
            events,
            notifier,
            defaults: TransformOptions::default(),
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            on_error: None,
        }
    }

    /// Compiler options every registered task starts from.
    pub fn with_defaults(mut self, defaults: TransformOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Directory relative task roots are resolved against.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Handler for transform failures of one-shot tasks. Without one, such a
    /// failure aborts the run.
    pub fn with_error_handler(mut self, handler: Arc<ErrorHandler>) -> Self {
        self.on_error = Some(handler);
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Register the transform and watch-transform tasks for `config`.
    ///
    /// Registering a prefix again replaces both definitions.
    pub fn register(&mut self, config: TaskConfig) -> Result<RegisteredTasks> {
        let task = Arc::new(ResolvedTask::resolve(&config, &self.defaults, &self.cwd)?);
        let names = RegisteredTasks {
            transform: task.name(TaskKind::Transform),
            watch: task.name(TaskKind::WatchTransform),
        };

        let replaced = self.tasks.contains_key(&names.transform);
        self.tasks.insert(
            names.transform.clone(),
            TaskEntry {
                deps: task.dependencies().to_vec(),
                body: TaskBody::Transform(Arc::clone(&task)),
            },
        );
        self.tasks.insert(
            names.watch.clone(),
            TaskEntry {
                deps: Vec::new(),
                body: TaskBody::Watch(Arc::clone(&task)),
            },
        );

        info!(
            transform = %names.transform,
            watch = %names.watch,
            replaced,
            globs = ?task.matcher().globs().to_strings(),
            "registered transform tasks"
        );
        Ok(names)
    }

    /// Register an arbitrary async task, e.g. a lint step other tasks depend on.
    pub fn register_external<F, Fut>(&mut self, name: impl Into<TaskName>, deps: Vec<TaskName>, run: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        debug!(task = %name, ?deps, "registered external task");
        let body: ExternalTask = Arc::new(
            move || -> Pin<Box<dyn Future<Output = Result<()>> + Send>> { Box::pin(run()) },
        );
        self.tasks.insert(
            name,
            TaskEntry {
                deps,
                body: TaskBody::External(body),
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// All task names, sorted.
    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn dependencies_of(&self, name: &str) -> Option<&[TaskName]> {
        self.tasks.get(name).map(|entry| entry.deps.as_slice())
    }

    /// The resolved definition behind a transform or watch task.
    pub fn resolved(&self, name: &str) -> Option<&Arc<ResolvedTask>> {
        match &self.tasks.get(name)?.body {
            TaskBody::Transform(task) | TaskBody::Watch(task) => Some(task),
            TaskBody::External(_) => None,
        }
    }

    /// `name` and its transitive dependencies, dependencies first.
    pub fn execution_order(&self, name: &str) -> Result<Vec<TaskName>> {
        if !self.tasks.contains_key(name) {
            return Err(BuildError::TaskNotFound(name.to_string()));
        }

        // Collect everything reachable through dependency edges.
        let mut reachable = BTreeSet::new();
        let mut stack = vec![name];
        while let Some(current) = stack.pop() {
            if !reachable.insert(current) {
                continue;
            }
            let entry = self.tasks.get(current).ok_or_else(|| {
                BuildError::TaskNotFound(current.to_string())
            })?;
            stack.extend(entry.deps.iter().map(String::as_str));
        }

        // Edge direction: dep -> task.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for task in &reachable {
            graph.add_node(*task);
        }
        for task in &reachable {
            for dep in &self.tasks[*task].deps {
                graph.add_edge(dep.as_str(), *task, ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(cycle) => Err(BuildError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// Run `name` after all of its dependencies. Stops at the first failure.
    ///
    /// Watch tasks leave their watcher in `registry`.
    pub async fn run(&self, name: &str, registry: &mut WatcherRegistry) -> Result<()> {
        self.run_all(&[name], registry).await
    }

    /// Run several tasks; a dependency shared between them runs once.
    pub async fn run_all<S: AsRef<str>>(
        &self,
        names: &[S],
        registry: &mut WatcherRegistry,
    ) -> Result<()> {
        let order = self.combined_order(names)?;
        info!(?order, "running tasks");

        for task in &order {
            self.run_single(task, registry).await?;
        }
        Ok(())
    }

    /// Concatenated execution orders, keeping the first occurrence of each
    /// task. Every task still follows all of its dependencies.
    pub fn combined_order<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<TaskName>> {
        let mut seen = BTreeSet::new();
        let mut combined = Vec::new();
        for name in names {
            for task in self.execution_order(name.as_ref())? {
                if seen.insert(task.clone()) {
                    combined.push(task);
                }
            }
        }
        Ok(combined)
    }

    async fn run_single(&self, name: &str, registry: &mut WatcherRegistry) -> Result<()> {
        let entry = self
            .tasks
            .get(name)
            .ok_or_else(|| BuildError::TaskNotFound(name.to_string()))?;

        debug!(task = %name, "starting task");
        match &entry.body {
            TaskBody::Transform(task) => self.run_transform(name, task).await,
            TaskBody::Watch(task) => self.start_watch(name, task, registry).await,
            TaskBody::External(run) => run().await,
        }
    }

    async fn run_transform(&self, name: &str, task: &ResolvedTask) -> Result<()> {
        let _guard = task.output_lock().lock().await;

        if task.clean() {
            info!(task = %name, output_root = ?task.output_root(), "cleaning output root");
            remove_tree(self.pipeline.fs().as_ref(), task.output_root())?;
        }

        let outcome = self
            .pipeline
            .run(
                FileSet::Globs(task.matcher()),
                task.input_root(),
                task.output_root(),
                task.options(),
                self.on_error.as_deref(),
            )
            .await?;

        match outcome {
            TransformOutcome::Completed { files } => {
                info!(task = %name, files, "task finished");
            }
            TransformOutcome::Failed => {
                warn!(task = %name, "transform failed; error passed to handler");
            }
        }
        Ok(())
    }

    async fn start_watch(
        &self,
        name: &str,
        task: &Arc<ResolvedTask>,
        registry: &mut WatcherRegistry,
    ) -> Result<()> {
        // Stop the old watcher first so no event is handled twice.
        if registry.remove(name) {
            debug!(task = %name, "stopped previous watcher");
        }

        let (signals, guard) = self.events.subscribe(task.input_root())?.into_parts();
        let dispatcher = WatchDispatcher::new(
            Arc::clone(task),
            self.pipeline.clone(),
            Arc::clone(&self.notifier),
        );

        let (ready_tx, ready_rx) = oneshot::channel();
        let join = tokio::spawn(dispatcher.run(signals, Some(ready_tx)));
        let handle = WatchHandle::new(join, guard);

        ready_rx.await.map_err(|_| {
            BuildError::Other(anyhow!(
                "event source for '{name}' closed before it was ready"
            ))
        })?;

        info!(task = %name, input_root = ?task.input_root(), "watching for changes");
        registry.insert(name.to_string(), handle);
        Ok(())
    }
}
