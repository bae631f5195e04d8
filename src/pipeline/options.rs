// src/pipeline/options.rs

use serde::Deserialize;

use crate::paths::OutputOptions;

/// Options handed to the transformation collaborator.
///
/// This is also the `[transformer]` section of the build file:
///
/// ```toml
/// [transformer]
/// program = "tsc"
/// module = "commonjs"
/// target = "ES5"
/// source_maps = true
/// ```
///
/// Every field is optional and falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformOptions {
    /// Compiler executable.
    pub program: String,
    /// Module system of the emitted code.
    pub module: String,
    /// Language level of the emitted code.
    pub target: String,
    pub allow_js: bool,
    pub no_resolve: bool,
    pub source_maps: bool,
    pub experimental_decorators: bool,
    pub emit_declarations: bool,
    /// Passed to the compiler verbatim, after everything else.
    pub extra_args: Vec<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            program: "tsc".to_string(),
            module: "commonjs".to_string(),
            target: "ES5".to_string(),
            allow_js: true,
            no_resolve: true,
            source_maps: true,
            experimental_decorators: true,
            emit_declarations: false,
            extra_args: Vec::new(),
        }
    }
}

impl TransformOptions {
    /// Auxiliary artifacts these options make the compiler emit.
    pub fn outputs(&self) -> OutputOptions {
        OutputOptions {
            source_maps: self.source_maps,
            declarations: self.emit_declarations,
        }
    }
}
