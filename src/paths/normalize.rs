// src/paths/normalize.rs

//! Lexical path helpers.

use std::path::{Component, Path, PathBuf};

/// Normalize `.` and `..` components without touching the file system.
///
/// `..` at the root is dropped, so `/a/../../b` becomes `/b`.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => true,
                    _ => false,
                };
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Make `path` absolute against `base` (if relative) and normalize it.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_lexically(path)
    } else {
        normalize_lexically(&base.join(path))
    }
}

/// Path of `path` relative to `root`, or `None` if it is not contained in
/// `root`. Both sides are normalized first.
pub fn relative_to(root: &Path, path: &Path) -> Option<PathBuf> {
    let root = normalize_lexically(root);
    let path = normalize_lexically(path);
    path.strip_prefix(&root).ok().map(Path::to_path_buf)
}

/// Render a path with forward slashes, the form globs are matched against.
pub fn to_slash_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Whether the basename of `path` starts with the hidden-file marker.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

/// Whether any component of `path` below `root` is hidden.
///
/// Paths outside `root` only have their basename checked.
pub fn has_hidden_component(root: &Path, path: &Path) -> bool {
    match relative_to(root, path) {
        Some(rel) => rel.components().any(|c| match c {
            Component::Normal(name) => name.to_str().is_some_and(|n| n.starts_with('.')),
            _ => false,
        }),
        None => is_hidden(path),
    }
}
