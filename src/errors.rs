// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildError {
    /// A source lies outside its input root, a glob is malformed, or the
    /// build file is inconsistent.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The transformation collaborator reported a failure.
    #[error("Transform failed for {files} file(s){}: {reason}", exit_suffix(.code))]
    TransformError {
        files: usize,
        code: Option<i32>,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {code})"),
        None => String::new(),
    }
}

impl BuildError {
    pub fn config(msg: impl Into<String>) -> Self {
        BuildError::ConfigError(msg.into())
    }

    /// Whether this error came from the transformation collaborator.
    pub fn is_transform(&self) -> bool {
        matches!(self, BuildError::TransformError { .. })
    }

    /// Process exit status for this error.
    ///
    /// Transform failures mirror the collaborator's own status; everything
    /// else exits with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            BuildError::TransformError {
                code: Some(code), ..
            } => u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1),
            _ => 1,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
