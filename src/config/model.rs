// src/config/model.rs

use std::path::Path;

use serde::Deserialize;

use crate::paths::absolutize;
use crate::pipeline::TransformOptions;
use crate::tasks::TaskConfig;

/// Build file as read from TOML, before validation.
///
/// ```toml
/// [transformer]
/// program = "tsc"
/// target = "ES5"
///
/// [[task]]
/// name_prefix = "server"
/// glob = ["**/*.js", "!**/*.spec.js"]
/// input_root = "src"
/// output_root = "lib"
///
/// [[task]]
/// name_prefix = "client"
/// glob = "**/*.ts"
/// input_root = "client"
/// output_root = "public/js"
/// dependencies = ["server-transform"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Compiler options shared by every task, from `[transformer]`.
    #[serde(default)]
    pub transformer: TransformOptions,

    /// All `[[task]]` entries, in file order.
    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// A validated build file.
///
/// Only constructed through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub transformer: TransformOptions,
    pub task: Vec<TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(transformer: TransformOptions, task: Vec<TaskConfig>) -> Self {
        Self { transformer, task }
    }

    /// Make every relative task root absolute against `base`.
    pub fn resolve_roots(&mut self, base: &Path) {
        for task in &mut self.task {
            task.input_root = absolutize(&task.input_root, base);
            task.output_root = absolutize(&task.output_root, base);
        }
    }

    /// Transform task names defined in this file, in file order.
    pub fn transform_task_names(&self) -> Vec<String> {
        self.task
            .iter()
            .map(|t| crate::tasks::TaskKind::Transform.task_name(&t.composed_prefix()))
            .collect()
    }

    /// Watch task names defined in this file, in file order.
    pub fn watch_task_names(&self) -> Vec<String> {
        self.task
            .iter()
            .map(|t| crate::tasks::TaskKind::WatchTransform.task_name(&t.composed_prefix()))
            .collect()
    }
}
