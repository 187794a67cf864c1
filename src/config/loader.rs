// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ModuleConfig, RawStackConfig, StackConfig};
use crate::errors::Result;

/// File name marking a directory as a module.
pub const MODULE_CONFIG_FILE: &str = "module.toml";

/// Default stack configuration file, looked up in the stack root.
pub const STACK_CONFIG_FILE: &str = "Stackrun.toml";

/// Load a stack configuration file and return the raw `RawStackConfig`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawStackConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawStackConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a stack configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<StackConfig> {
    let raw_config = load_from_path(&path)?;
    let config = StackConfig::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the stack configuration for a run.
///
/// - An explicit path must exist.
/// - Otherwise `Stackrun.toml` in `root` is used if present, and defaults
///   apply when it is not.
pub fn load_stack_config(root: &Path, explicit: Option<&Path>) -> Result<StackConfig> {
    if let Some(path) = explicit {
        return load_and_validate(path);
    }

    let path = default_config_path(root);
    if path.is_file() {
        debug!(path = %path.display(), "loading stack configuration");
        load_and_validate(&path)
    } else {
        debug!(root = %root.display(), "no stack configuration file; using defaults");
        Ok(StackConfig::default())
    }
}

/// Read and parse one module's `module.toml`.
pub fn load_module_config(path: impl AsRef<Path>) -> Result<ModuleConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: ModuleConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// `Stackrun.toml` inside the given stack root.
pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(STACK_CONFIG_FILE)
}
