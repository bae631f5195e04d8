// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Read and deserialize a build file. No semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading build file {:?}", path))?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a build file, validate it and make its task roots absolute.
///
/// Relative roots are taken relative to the directory holding the file, so
/// the same file works from any working directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let mut config = ConfigFile::try_from(raw_config)?;
    config.resolve_roots(&config_base_dir(path));
    Ok(config)
}

/// Directory that relative paths in the build file at `path` refer to.
///
/// A bare file name (parent = "") means the working directory.
pub fn config_base_dir(path: &Path) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => crate::paths::absolutize(parent, &cwd),
        _ => cwd,
    }
}
