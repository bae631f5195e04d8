// src/pipeline/transformer.rs

//! Pluggable transformation collaborator.
//!
//! The pipeline talks to a `Transformer` instead of spawning the compiler
//! itself. Production code uses [`CommandTransformer`](super::CommandTransformer);
//! tests swap in a fake that writes outputs directly.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use crate::errors::Result;
use crate::pipeline::options::TransformOptions;

/// One invocation of the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    /// Absolute source files, sorted.
    pub files: Vec<PathBuf>,
    /// Directory output placement is computed from. Always the task's input
    /// root, also for single-file runs.
    pub base: PathBuf,
    /// Output root; nothing may be written outside of it.
    pub out_dir: PathBuf,
    pub options: TransformOptions,
}

/// Trait abstracting the source-to-source compiler.
pub trait Transformer: Send + Sync {
    /// Transform `request.files`, writing results below `request.out_dir`.
    ///
    /// A failure reported by the compiler must come back as
    /// [`BuildError::TransformError`](crate::errors::BuildError::TransformError).
    fn transform<'a>(
        &'a self,
        request: &'a TransformRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
