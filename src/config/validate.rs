// src/config/validate.rs

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::model::{RawStackConfig, StackConfig};
use crate::errors::{Result, StackError};

impl TryFrom<RawStackConfig> for StackConfig {
    type Error = crate::errors::StackError;

    fn try_from(raw: RawStackConfig) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let excludes = build_exclude_set(&raw.config.exclude)?;
        Ok(StackConfig::new_unchecked(raw.config, excludes))
    }
}

impl StackConfig {
    /// Add exclude globs on top of the configured ones (e.g. from the CLI).
    pub fn with_extra_excludes(mut self, patterns: &[String]) -> Result<Self> {
        self.config.exclude.extend(patterns.iter().cloned());
        let excludes = build_exclude_set(&self.config.exclude)?;
        Ok(StackConfig::new_unchecked(self.config, excludes))
    }
}

fn validate_raw_config(cfg: &RawStackConfig) -> Result<()> {
    if cfg.config.parallelism == Some(0) {
        return Err(StackError::ConfigError(
            "[config].parallelism must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.tool.trim().is_empty() {
        return Err(StackError::ConfigError(
            "[config].tool must not be empty".to_string(),
        ));
    }

    if let Some(location) = &cfg.config.output_location {
        if location.trim().is_empty() {
            return Err(StackError::ConfigError(
                "[config].output_location must not be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Compile exclude globs. Module ids use `/` separators on every platform.
pub fn build_exclude_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            StackError::ConfigError(format!("invalid exclude pattern '{pattern}': {e}"))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| StackError::ConfigError(format!("building exclude patterns: {e}")))
}
