// src/pipeline/mod.rs

//! Transformation pipeline.
//!
//! Turns a [`FileSet`] into a concrete list of sources and hands it to the
//! [`Transformer`] together with the task's roots.
//!
//! - [`transformer`] defines the collaborator trait and the request type.
//! - [`command`] is the production collaborator (spawns the compiler).
//! - [`options`] holds the compiler options / `[transformer]` section.
//! - [`files`] walks an input root and applies a glob matcher.

pub mod command;
pub mod files;
pub mod options;
pub mod transformer;

pub use command::CommandTransformer;
pub use files::collect_matching_files;
pub use options::TransformOptions;
pub use transformer::{TransformRequest, Transformer};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{BuildError, Result};
use crate::fs::FileSystem;
use crate::paths::{check_collisions, normalize_lexically, relative_to, GlobMatcher};

/// Callback for transform failures that should not abort the caller.
pub type ErrorHandler = dyn Fn(&BuildError) + Send + Sync;

/// Which sources a run covers.
#[derive(Debug, Clone, Copy)]
pub enum FileSet<'a> {
    /// Every file below the input root that the matcher selects.
    Globs(&'a GlobMatcher),
    /// A single file, placed as if the full set had been transformed.
    Single(&'a Path),
}

/// Result of a run that did not return an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOutcome {
    Completed { files: usize },
    /// The collaborator failed and the error went to the supplied handler.
    Failed,
}

/// Runs the transformer over a file set with a fixed input/output pairing.
#[derive(Clone)]
pub struct TransformPipeline {
    transformer: Arc<dyn Transformer>,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl TransformPipeline {
    pub fn new(transformer: Arc<dyn Transformer>, fs: Arc<dyn FileSystem>) -> Self {
        Self { transformer, fs }
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Resolve `files` and transform them.
    ///
    /// The run's base is always `input_root`, so a single-file run places its
    /// output exactly where a full run would.
    ///
    /// A [`BuildError::TransformError`] is passed to `on_error` when given
    /// (the run then yields [`TransformOutcome::Failed`]); without a handler it
    /// is returned. All other errors are returned as-is.
    pub async fn run(
        &self,
        files: FileSet<'_>,
        input_root: &Path,
        output_root: &Path,
        options: &TransformOptions,
        on_error: Option<&ErrorHandler>,
    ) -> Result<TransformOutcome> {
        let sources = self.resolve(files, input_root, output_root, options)?;

        if sources.is_empty() {
            warn!(input_root = ?input_root, "no source files matched; nothing to transform");
            return Ok(TransformOutcome::Completed { files: 0 });
        }

        let request = TransformRequest {
            files: sources,
            base: normalize_lexically(input_root),
            out_dir: normalize_lexically(output_root),
            options: options.clone(),
        };

        debug!(files = ?request.files, "dispatching transform request");

        match self.transformer.transform(&request).await {
            Ok(()) => {
                info!(
                    files = request.files.len(),
                    out_dir = ?request.out_dir,
                    "transform completed"
                );
                Ok(TransformOutcome::Completed {
                    files: request.files.len(),
                })
            }
            Err(err) if err.is_transform() => match on_error {
                Some(handler) => {
                    handler(&err);
                    Ok(TransformOutcome::Failed)
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    fn resolve(
        &self,
        files: FileSet<'_>,
        input_root: &Path,
        output_root: &Path,
        options: &TransformOptions,
    ) -> Result<Vec<PathBuf>> {
        match files {
            FileSet::Globs(matcher) => {
                let sources = collect_matching_files(
                    self.fs.as_ref(),
                    input_root,
                    matcher,
                    Some(output_root),
                )?;
                check_collisions(&sources, input_root, output_root, options.outputs())?;
                Ok(sources)
            }
            FileSet::Single(path) => {
                if relative_to(input_root, path).is_none() {
                    return Err(BuildError::config(format!(
                        "source {:?} is not inside input root {:?}",
                        path, input_root
                    )));
                }
                Ok(vec![normalize_lexically(path)])
            }
        }
    }
}
