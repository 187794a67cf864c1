// src/config/mod.rs

//! Configuration loading and validation for stackrun.
//!
//! Responsibilities:
//! - Define the TOML-backed data model for `module.toml` and `Stackrun.toml`
//!   (`model.rs`).
//! - Load config files from disk (`loader.rs`).
//! - Validate stack settings and compile exclude globs (`validate.rs`).
//! - Hold the per-run execution parameters (`options.rs`).

pub mod loader;
pub mod model;
pub mod options;
pub mod validate;

pub use loader::{
    MODULE_CONFIG_FILE, STACK_CONFIG_FILE, load_and_validate, load_from_path, load_module_config,
    load_stack_config,
};
pub use model::{ConfigSection, DependenciesSection, ModuleConfig, RawStackConfig, StackConfig};
pub use options::RunOptions;
