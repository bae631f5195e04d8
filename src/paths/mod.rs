// src/paths/mod.rs

//! Pure path handling: no process or file-system access happens here.
//!
//! - [`normalize`] holds lexical path normalization helpers.
//! - [`mapper`] maps a source file to the output artifacts it produces.
//! - [`globs`] resolves task globs against an input root and matches paths
//!   against the resolved, ordered pattern list.

pub mod globs;
pub mod mapper;
pub mod normalize;

pub use globs::{anchor_pattern, resolve_globs, GlobMatcher, GlobSpec, ResolvedGlobs, ResolvedPattern};
pub use mapper::{check_collisions, map_output_paths, OutputMapping, OutputOptions};
pub use normalize::{
    absolutize, has_hidden_component, is_hidden, normalize_lexically, relative_to, to_slash_string,
};
