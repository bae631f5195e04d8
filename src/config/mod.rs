// src/config/mod.rs

//! Build file (`Transform.toml`) loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a build file from disk (`loader.rs`).
//! - Validate task names and dependencies (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_base_dir, load_and_validate, load_from_path};
pub use model::{ConfigFile, RawConfigFile};
