// src/watch/dispatcher.rs

//! Routes watch events of one task to a scoped transform or an output
//! deletion.
//!
//! The routing decision itself is the pure [`plan_action`]; the
//! [`WatchDispatcher`] executes it and owns the readiness state machine.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::errors::{BuildError, Result};
use crate::fs::remove_if_exists;
use crate::paths::OutputMapping;
use crate::pipeline::{ErrorHandler, FileSet, TransformOutcome, TransformPipeline};
use crate::tasks::{ResolvedTask, TaskKind};
use crate::watch::cache::ContentCache;
use crate::watch::event::{FileEvent, FileEventKind, WatchSignal};
use crate::watch::notifier::Notifier;

/// Lifecycle of a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Subscribed, but the source has not reported readiness yet. Events in
    /// this state are startup noise and get dropped.
    Idle,
    /// The source is armed.
    Ready,
    /// At least one event has been acted upon.
    Watching,
}

/// What to do about a single event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchAction {
    Ignore,
    /// Transform this one file.
    Transform(PathBuf),
    /// Delete every artifact of a removed source.
    Delete(OutputMapping),
}

/// Decide how `task` reacts to `event`. No side effects.
pub fn plan_action(task: &ResolvedTask, event: &FileEvent) -> Result<DispatchAction> {
    if task.is_ignored(&event.path) || !task.matcher().matches(&event.path) {
        return Ok(DispatchAction::Ignore);
    }

    match event.kind {
        FileEventKind::Added | FileEventKind::Changed => {
            Ok(DispatchAction::Transform(event.path.clone()))
        }
        FileEventKind::Removed => Ok(DispatchAction::Delete(task.map_outputs(&event.path)?)),
    }
}

/// Per-task event loop state.
pub struct WatchDispatcher {
    task: Arc<ResolvedTask>,
    pipeline: TransformPipeline,
    notifier: Arc<dyn Notifier>,
    state: DispatcherState,
    cache: ContentCache,
}

impl std::fmt::Debug for WatchDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchDispatcher")
            .field("task", &self.task)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl WatchDispatcher {
    pub fn new(
        task: Arc<ResolvedTask>,
        pipeline: TransformPipeline,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            task,
            pipeline,
            notifier,
            state: DispatcherState::Idle,
            cache: ContentCache::new(),
        }
    }

    pub fn state(&self) -> DispatcherState {
        self.state
    }

    /// Consume signals until the source closes.
    ///
    /// `ready` fires once, on the first [`WatchSignal::Ready`].
    pub async fn run(
        mut self,
        mut signals: mpsc::UnboundedReceiver<WatchSignal>,
        mut ready: Option<oneshot::Sender<()>>,
    ) {
        while let Some(signal) = signals.recv().await {
            self.handle(signal).await;

            if self.state != DispatcherState::Idle {
                if let Some(tx) = ready.take() {
                    let _ = tx.send(());
                }
            }
        }
        debug!(task = %self.task.name(TaskKind::WatchTransform), "watch signal stream ended");
    }

    /// Handle one signal. Never fails: errors go to the notifier.
    pub async fn handle(&mut self, signal: WatchSignal) {
        match signal {
            WatchSignal::Ready => {
                if self.state == DispatcherState::Idle {
                    info!(input_root = ?self.task.input_root(), "watcher ready");
                    self.state = DispatcherState::Ready;
                } else {
                    debug!("duplicate ready signal ignored");
                }
            }
            WatchSignal::Event(event) => {
                if self.state == DispatcherState::Idle {
                    debug!(path = ?event.path, kind = ?event.kind, "event before watcher was ready; discarding");
                    return;
                }
                if let Err(err) = self.handle_event(event).await {
                    self.notifier.notify("Watch Error", "See console for details.", &err);
                }
            }
        }
    }

    async fn handle_event(&mut self, event: FileEvent) -> Result<()> {
        let action = plan_action(&self.task, &event)?;
        if action == DispatchAction::Ignore {
            debug!(path = ?event.path, "event ignored");
            return Ok(());
        }

        info!(path = ?event.path, kind = ?event.kind, "watch transform event");
        self.state = DispatcherState::Watching;

        match action {
            DispatchAction::Ignore => Ok(()),
            DispatchAction::Transform(path) => self.transform(path, event.kind).await,
            DispatchAction::Delete(mapping) => {
                self.cache.forget(&event.path);
                self.delete(&mapping).await;
                Ok(())
            }
        }
    }

    async fn transform(&mut self, path: PathBuf, kind: FileEventKind) -> Result<()> {
        if self.task.skip_unchanged() {
            match self.cache.is_unchanged(self.pipeline.fs().as_ref(), &path) {
                Ok(true) if kind == FileEventKind::Changed => {
                    info!(path = ?path, "content unchanged; skipping transform");
                    return Ok(());
                }
                Ok(_) => {}
                Err(err) => warn!(path = ?path, error = %err, "failed to hash source; transforming anyway"),
            }
        }

        let lock = Arc::clone(self.task.output_lock());
        let _guard = lock.lock().await;

        let notifier = Arc::clone(&self.notifier);
        let on_error: &ErrorHandler = &move |err: &BuildError| {
            notifier.notify("Transform Error", "See console for details.", err);
        };

        let outcome = self
            .pipeline
            .run(
                FileSet::Single(&path),
                self.task.input_root(),
                self.task.output_root(),
                self.task.options(),
                Some(on_error),
            )
            .await;

        match outcome {
            Ok(TransformOutcome::Completed { .. }) => Ok(()),
            Ok(TransformOutcome::Failed) => {
                // Retry on the next save even if the bytes come back identical.
                self.cache.forget(&path);
                Ok(())
            }
            Err(err) => {
                self.cache.forget(&path);
                Err(err)
            }
        }
    }

    async fn delete(&self, mapping: &OutputMapping) {
        let lock = Arc::clone(self.task.output_lock());
        let _guard = lock.lock().await;

        let fs = self.pipeline.fs();
        for output in mapping.all() {
            match remove_if_exists(fs.as_ref(), output) {
                Ok(true) => info!(output = ?output, "removed output"),
                Ok(false) => debug!(output = ?output, "output already absent"),
                Err(err) => {
                    let err = BuildError::from(err);
                    warn!(output = ?output, error = %err, "failed to remove output");
                    self.notifier.notify("Delete Error", "See console for details.", &err);
                }
            }
        }
    }
}
