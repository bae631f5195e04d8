// src/watch/event.rs

use std::path::PathBuf;

/// What happened to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventKind {
    Added,
    Changed,
    Removed,
}

/// A single change below a watched root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Absolute path of the file.
    pub path: PathBuf,
    pub kind: FileEventKind,
}

impl FileEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FileEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileEventKind::Added)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileEventKind::Changed)
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileEventKind::Removed)
    }
}

/// Items delivered by an event source subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    /// The underlying watcher is armed; events from here on are real.
    Ready,
    Event(FileEvent),
}

impl From<FileEvent> for WatchSignal {
    fn from(event: FileEvent) -> Self {
        WatchSignal::Event(event)
    }
}
