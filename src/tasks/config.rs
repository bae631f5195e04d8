// src/tasks/config.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::errors::{BuildError, Result};
use crate::paths::{
    absolutize, has_hidden_component, map_output_paths, normalize_lexically, resolve_globs,
    to_slash_string, GlobMatcher, GlobSpec, OutputMapping, OutputOptions,
};
use crate::pipeline::TransformOptions;
use crate::tasks::TaskName;

/// Caller-supplied description of one transform unit.
///
/// Also the `[[task]]` entry of the build file:
///
/// ```toml
/// [[task]]
/// name_prefix = "server"
/// glob = ["**/*.js", "!**/*.spec.js"]
/// input_root = "src"
/// output_root = "lib"
/// dependencies = ["lint-transform"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Pattern(s) relative to `input_root`; a leading `!` excludes.
    pub glob: GlobSpec,

    /// Directory output placement is computed from.
    pub input_root: PathBuf,

    /// Directory all artifacts of this task go to.
    pub output_root: PathBuf,

    /// Optional prefix for the generated task names (`<prefix>-transform`).
    #[serde(default)]
    pub name_prefix: Option<String>,

    /// Tasks that must complete before the transform task starts.
    #[serde(default)]
    pub dependencies: Vec<TaskName>,

    /// Overrides `[transformer].emit_declarations` for this task.
    #[serde(default)]
    pub emit_declarations: Option<bool>,

    /// Delete `output_root` before a full transform.
    #[serde(default = "default_clean")]
    pub clean: bool,

    /// Skip `changed` events whose content hash did not change.
    #[serde(default)]
    pub skip_unchanged: bool,

    /// Regex of paths the watcher ignores, on top of hidden files.
    #[serde(default)]
    pub ignore: Option<String>,
}

fn default_clean() -> bool {
    true
}

impl TaskConfig {
    pub fn new(
        glob: impl Into<GlobSpec>,
        input_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            glob: glob.into(),
            input_root: input_root.into(),
            output_root: output_root.into(),
            name_prefix: None,
            dependencies: Vec::new(),
            emit_declarations: None,
            clean: true,
            skip_unchanged: false,
            ignore: None,
        }
    }

    /// `"<name_prefix>-"`, or the empty string without a prefix.
    pub fn composed_prefix(&self) -> String {
        match self.name_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}-"),
            _ => String::new(),
        }
    }
}

/// The two kinds of tasks generated per [`TaskConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// One-shot: clean, then transform the full set.
    Transform,
    /// Persistent: transform-on-change, delete-on-removal.
    WatchTransform,
}

impl TaskKind {
    pub fn suffix(self) -> &'static str {
        match self {
            TaskKind::Transform => "transform",
            TaskKind::WatchTransform => "watch-transform",
        }
    }

    /// Composed task identifier for `prefix` (as returned by
    /// [`TaskConfig::composed_prefix`]).
    pub fn task_name(self, prefix: &str) -> TaskName {
        format!("{prefix}{}", self.suffix())
    }
}

/// A [`TaskConfig`] after registration: absolute roots, compiled globs and
/// merged compiler options. Immutable once built.
pub struct ResolvedTask {
    prefix: String,
    input_root: PathBuf,
    output_root: PathBuf,
    matcher: GlobMatcher,
    dependencies: Vec<TaskName>,
    options: TransformOptions,
    clean: bool,
    skip_unchanged: bool,
    ignore: Option<Regex>,
    /// Held while the task writes to or cleans its output tree.
    output_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for ResolvedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedTask")
            .field("prefix", &self.prefix)
            .field("input_root", &self.input_root)
            .field("output_root", &self.output_root)
            .field("globs", &self.matcher.globs().to_strings())
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl ResolvedTask {
    /// Resolve `config` against `cwd` (for relative roots) and the graph's
    /// default compiler options.
    pub fn resolve(config: &TaskConfig, defaults: &TransformOptions, cwd: &Path) -> Result<Self> {
        let input_root = absolutize(&config.input_root, cwd);
        let output_root = absolutize(&config.output_root, cwd);

        if input_root == output_root {
            return Err(BuildError::config(format!(
                "input root and output root are the same directory {:?}",
                input_root
            )));
        }
        if config.clean && input_root.starts_with(&output_root) {
            return Err(BuildError::config(format!(
                "output root {:?} contains input root {:?}; cleaning it would delete the sources",
                output_root, input_root
            )));
        }

        let globs = resolve_globs(&config.glob, &input_root)?;
        let matcher = GlobMatcher::new(&globs)?;

        let ignore = config
            .ignore
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    BuildError::config(format!("invalid ignore pattern {pattern:?}: {e}"))
                })
            })
            .transpose()?;

        let mut options = defaults.clone();
        if let Some(emit) = config.emit_declarations {
            options.emit_declarations = emit;
        }

        Ok(Self {
            prefix: config.composed_prefix(),
            input_root,
            output_root,
            matcher,
            dependencies: config.dependencies.clone(),
            options,
            clean: config.clean,
            skip_unchanged: config.skip_unchanged,
            ignore,
            output_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn name(&self, kind: TaskKind) -> TaskName {
        kind.task_name(&self.prefix)
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    pub fn matcher(&self) -> &GlobMatcher {
        &self.matcher
    }

    pub fn dependencies(&self) -> &[TaskName] {
        &self.dependencies
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    pub fn outputs(&self) -> OutputOptions {
        self.options.outputs()
    }

    pub fn clean(&self) -> bool {
        self.clean
    }

    pub fn skip_unchanged(&self) -> bool {
        self.skip_unchanged
    }

    pub fn output_lock(&self) -> &Arc<Mutex<()>> {
        &self.output_lock
    }

    /// Anything below a hidden component, the task's own output tree, and
    /// paths matching the ignore regex.
    pub fn is_ignored(&self, path: &Path) -> bool {
        if has_hidden_component(&self.input_root, path) {
            return true;
        }
        if normalize_lexically(path).starts_with(&self.output_root) {
            return true;
        }
        match &self.ignore {
            Some(re) => re.is_match(&to_slash_string(path)),
            None => false,
        }
    }

    /// Outputs this task produces for `source`.
    pub fn map_outputs(&self, source: &Path) -> Result<OutputMapping> {
        map_output_paths(source, &self.input_root, &self.output_root, self.outputs())
    }
}
