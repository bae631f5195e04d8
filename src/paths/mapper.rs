// src/paths/mapper.rs

//! Source path -> output artifact path mapping.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::errors::{BuildError, Result};
use crate::paths::normalize::{normalize_lexically, relative_to};

/// Source extensions stripped from a file name, in stripping order.
///
/// Each is removed at most once, so `logger.js.ts` collapses to `logger`
/// while `logger.ts.js` keeps its inner `.ts`.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// Extension of every primary output.
pub const OUTPUT_EXTENSION: &str = "js";

/// Suffix appended to the primary output for its source map.
pub const MAP_SUFFIX: &str = ".map";

/// Extension of emitted declaration files.
pub const DECLARATION_EXTENSION: &str = "d.ts";

/// Which auxiliary artifacts the transformer emits next to each output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub source_maps: bool,
    pub declarations: bool,
}

/// Every artifact produced for a single source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMapping {
    pub primary: PathBuf,
    pub auxiliary: Vec<PathBuf>,
}

impl OutputMapping {
    /// Primary output followed by the auxiliary ones.
    pub fn all(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.primary.as_path()).chain(self.auxiliary.iter().map(PathBuf::as_path))
    }
}

/// Map `source` to the artifacts the transformer writes for it.
///
/// The directory structure of `source` below `input_root` is reproduced below
/// `output_root`, and the file name gets its extension normalized.
pub fn map_output_paths(
    source: &Path,
    input_root: &Path,
    output_root: &Path,
    options: OutputOptions,
) -> Result<OutputMapping> {
    let rel = relative_to(input_root, source).ok_or_else(|| {
        BuildError::config(format!(
            "source {:?} is not inside input root {:?}",
            source, input_root
        ))
    })?;

    let file_name = rel
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| BuildError::config(format!("source {:?} has no usable file name", source)))?;

    let stem = strip_source_extensions(file_name);
    let out_dir = match rel.parent() {
        Some(parent) => normalize_lexically(&output_root.join(parent)),
        None => normalize_lexically(output_root),
    };

    let primary = out_dir.join(format!("{stem}.{OUTPUT_EXTENSION}"));

    let mut auxiliary = Vec::new();
    if options.source_maps {
        auxiliary.push(out_dir.join(format!("{stem}.{OUTPUT_EXTENSION}{MAP_SUFFIX}")));
    }
    if options.declarations {
        auxiliary.push(out_dir.join(format!("{stem}.{DECLARATION_EXTENSION}")));
    }

    Ok(OutputMapping { primary, auxiliary })
}

/// Strip the known source extensions from `file_name`.
///
/// A name that is nothing but an extension (e.g. `.ts`) is left alone.
fn strip_source_extensions(file_name: &str) -> &str {
    let mut stem = file_name;
    for ext in SOURCE_EXTENSIONS {
        if let Some(rest) = stem.strip_suffix(ext).and_then(|s| s.strip_suffix('.')) {
            if !rest.is_empty() {
                stem = rest;
            }
        }
    }
    stem
}

/// Fail if two sources would be written to the same primary output.
pub fn check_collisions(
    sources: &[PathBuf],
    input_root: &Path,
    output_root: &Path,
    options: OutputOptions,
) -> Result<()> {
    let mut seen: HashMap<PathBuf, &Path> = HashMap::with_capacity(sources.len());
    for source in sources {
        let mapping = map_output_paths(source, input_root, output_root, options)?;
        if let Some(previous) = seen.insert(mapping.primary.clone(), source.as_path()) {
            return Err(BuildError::config(format!(
                "sources {:?} and {:?} both map to output {:?}",
                previous, source, mapping.primary
            )));
        }
    }
    Ok(())
}
