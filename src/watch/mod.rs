// src/watch/mod.rs

//! File watching and incremental transforms.
//!
//! This module is responsible for:
//! - Turning platform watcher events into [`FileEvent`]s (`source`).
//! - Routing each event of a task to a single-file transform or an output
//!   deletion (`dispatcher`).
//! - Keeping at most one running watcher per watch task (`registry`).
//! - Optional content hashing so a re-save with identical bytes does not
//!   re-run the compiler (`hash`, `cache`).
//!
//! It does **not** know about task dependencies; the task graph decides when
//! a watcher is started.

pub mod cache;
pub mod dispatcher;
pub mod event;
pub mod hash;
pub mod notifier;
pub mod registry;
pub mod source;

pub use cache::ContentCache;
pub use dispatcher::{plan_action, DispatchAction, DispatcherState, WatchDispatcher};
pub use event::{FileEvent, FileEventKind, WatchSignal};
pub use hash::{compute_file_hash, compute_tree_hash};
pub use notifier::{LogNotifier, Notifier};
pub use registry::{WatchHandle, WatcherRegistry};
pub use source::{translate_event, EventSource, NotifyEventSource, Subscription};
