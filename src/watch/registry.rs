// src/watch/registry.rs

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use tokio::task::JoinHandle;
use tracing::info;

use crate::tasks::TaskName;

/// A running watch: the dispatcher task plus whatever keeps its event source
/// alive. Dropping the handle stops both.
pub struct WatchHandle {
    join: JoinHandle<()>,
    _guard: Option<Box<dyn Any + Send>>,
}

impl fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchHandle")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl WatchHandle {
    pub fn new(join: JoinHandle<()>, guard: Option<Box<dyn Any + Send>>) -> Self {
        Self {
            join,
            _guard: guard,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}

/// Active watchers keyed by watch task name. At most one per name.
#[derive(Debug, Default)]
pub struct WatcherRegistry {
    watchers: HashMap<TaskName, WatchHandle>,
}

impl WatcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `handle` under `name`, stopping whatever was there before.
    pub fn insert(&mut self, name: TaskName, handle: WatchHandle) -> bool {
        let replaced = self.watchers.insert(name.clone(), handle);
        if replaced.is_some() {
            info!(task = %name, "replaced running watcher");
        }
        // `replaced` drops here, which aborts the old dispatcher.
        replaced.is_some()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.watchers.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.watchers.contains_key(name)
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.watchers.get(name).is_some_and(WatchHandle::is_running)
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }

    /// Names of active watchers, sorted.
    pub fn names(&self) -> Vec<TaskName> {
        let mut names: Vec<_> = self.watchers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Stop every watcher.
    pub fn clear(&mut self) {
        self.watchers.clear();
    }
}
