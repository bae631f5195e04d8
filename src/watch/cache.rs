// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::hash::compute_file_hash;

/// Hash of the content each source had when it was last transformed.
///
/// Lets a dispatcher skip `changed` events that did not change anything
/// (editors re-saving, `touch`, ...).
#[derive(Debug, Default)]
pub struct ContentCache {
    hashes: HashMap<PathBuf, String>,
}

impl ContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `path` still has the content last recorded for it.
    ///
    /// Records the current hash either way, so the next call compares
    /// against what is on disk now.
    pub fn is_unchanged(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<bool> {
        let hash = compute_file_hash(fs, path)?;
        let previous = self.hashes.insert(path.to_path_buf(), hash.clone());
        let unchanged = previous.as_deref() == Some(hash.as_str());
        debug!(path = ?path, unchanged, "content cache lookup");
        Ok(unchanged)
    }

    /// Drop whatever is recorded for `path` (e.g. after it was removed or a
    /// transform of it failed).
    pub fn forget(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            debug!("invalidated content cache for {:?}", path);
        }
    }
}
