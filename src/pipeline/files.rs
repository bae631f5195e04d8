// src/pipeline/files.rs

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::fs::FileSystem;
use crate::paths::{is_hidden, normalize_lexically, GlobMatcher};

/// Collect all files under `root` that the matcher selects.
///
/// Hidden entries (and everything below a hidden directory) are skipped, as
/// is the `exclude` directory when it lies inside `root`.
/// The result is sorted so that repeated runs see the same order.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    matcher: &GlobMatcher,
    exclude: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let exclude = exclude.map(normalize_lexically);
    let mut files = Vec::new();
    if !fs.is_dir(root) {
        return Ok(files);
    }

    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if is_hidden(&path) {
                continue;
            }
            if fs.is_dir(&path) {
                if exclude.as_deref() != Some(normalize_lexically(&path).as_path()) {
                    stack.push(path);
                }
            } else if fs.is_file(&path) && matcher.matches(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}
