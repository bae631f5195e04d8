// src/watch/source.rs

//! Event sources: where a dispatcher gets its [`WatchSignal`]s from.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::watch::event::{FileEvent, FileEventKind, WatchSignal};

/// An active subscription. Dropping it cancels the underlying watch.
pub struct Subscription {
    signals: mpsc::UnboundedReceiver<WatchSignal>,
    guard: Option<Box<dyn Any + Send>>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("guarded", &self.guard.is_some())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    pub fn new(signals: mpsc::UnboundedReceiver<WatchSignal>) -> Self {
        Self {
            signals,
            guard: None,
        }
    }

    /// Subscription that keeps `guard` alive for as long as it exists.
    pub fn with_guard(
        signals: mpsc::UnboundedReceiver<WatchSignal>,
        guard: impl Any + Send,
    ) -> Self {
        Self {
            signals,
            guard: Some(Box::new(guard)),
        }
    }

    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<WatchSignal>, Option<Box<dyn Any + Send>>) {
        (self.signals, self.guard)
    }
}

/// Anything that can watch a directory tree and report file events.
///
/// Every call to `subscribe` starts a fresh sequence that begins with
/// [`WatchSignal::Ready`] once the watch is armed.
pub trait EventSource: Send + Sync {
    fn subscribe(&self, root: &Path) -> Result<Subscription>;
}

/// [`EventSource`] backed by the platform watcher from `notify`.
#[derive(Debug, Clone, Default)]
pub struct NotifyEventSource;

impl NotifyEventSource {
    pub fn new() -> Self {
        Self
    }
}

impl EventSource for NotifyEventSource {
    fn subscribe(&self, root: &Path) -> Result<Subscription> {
        let root = root.to_path_buf();
        // Canonicalize once so event paths can be mapped back onto `root`.
        let canonical_root = root.canonicalize().unwrap_or_else(|_| root.clone());

        let (tx, rx) = mpsc::unbounded_channel::<WatchSignal>();

        // Closure called synchronously by notify whenever an event arrives.
        let mut watcher = RecommendedWatcher::new(
            {
                let tx = tx.clone();
                let root = root.clone();
                let canonical_root = canonical_root.clone();
                move |res: notify::Result<Event>| match res {
                    Ok(event) => {
                        for file_event in translate_event(&event, &canonical_root, &root) {
                            if tx.send(WatchSignal::Event(file_event)).is_err() {
                                // Subscriber is gone; nothing left to do.
                                return;
                            }
                        }
                    }
                    Err(err) => warn!(error = %err, "file watch error"),
                }
            },
            Config::default(),
        )?;

        watcher
            .watch(&canonical_root, RecursiveMode::Recursive)
            .with_context(|| format!("watching {:?}", canonical_root))?;

        info!("file watcher started on {:?}", canonical_root);
        // Armed: anything after this is a real change.
        let _ = tx.send(WatchSignal::Ready);

        Ok(Subscription::with_guard(rx, watcher))
    }
}

/// Translate one notify event into file events below `root`.
///
/// Directory additions/changes are dropped; renames become a removal of the
/// old name and an addition of the new one.
pub fn translate_event(event: &Event, canonical_root: &Path, root: &Path) -> Vec<FileEvent> {
    let kinds: Vec<(FileEventKind, &PathBuf)> = match &event.kind {
        EventKind::Create(_) => event.paths.iter().map(|p| (FileEventKind::Added, p)).collect(),
        EventKind::Remove(_) => event.paths.iter().map(|p| (FileEventKind::Removed, p)).collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.iter().map(|p| (FileEventKind::Removed, p)).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.iter().map(|p| (FileEventKind::Added, p)).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => vec![(FileEventKind::Removed, from), (FileEventKind::Added, to)],
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if p.exists() {
                    FileEventKind::Added
                } else {
                    FileEventKind::Removed
                };
                (kind, p)
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => event.paths.iter().map(|p| (FileEventKind::Changed, p)).collect(),
        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    };

    kinds
        .into_iter()
        .filter(|(kind, path)| *kind == FileEventKind::Removed || !path.is_dir())
        .filter_map(|(kind, path)| {
            let rebased = rebase(path, canonical_root, root)?;
            debug!(?kind, path = ?rebased, "translated notify event");
            Some(FileEvent::new(rebased, kind))
        })
        .collect()
}

/// Map a path reported under `canonical_root` back under `root`.
///
/// macOS reports `/private/var/...` for `/var/...`, for example.
fn rebase(path: &Path, canonical_root: &Path, root: &Path) -> Option<PathBuf> {
    if let Ok(rel) = path.strip_prefix(canonical_root) {
        return Some(root.join(rel));
    }
    if path.starts_with(root) {
        return Some(path.to_path_buf());
    }
    None
}
