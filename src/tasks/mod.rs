// src/tasks/mod.rs

//! Task registration and execution.
//!
//! - [`config`] holds the caller-facing [`TaskConfig`] and its resolved form.
//! - [`graph`] registers tasks, orders them by dependency and runs them.

pub mod config;
pub mod graph;

pub use config::{ResolvedTask, TaskConfig, TaskKind};
pub use graph::{ExternalTask, RegisteredTasks, TaskGraph};

/// Composed task identifier, e.g. `server-watch-transform`.
pub type TaskName = String;
