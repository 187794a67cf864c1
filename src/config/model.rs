// src/config/model.rs

use globset::GlobSet;
use serde::Deserialize;

/// Contents of a module's `module.toml`.
///
/// ```toml
/// assume_applied = false
///
/// [dependencies]
/// paths = ["../vpc", "../mysql"]
/// ```
///
/// Every field is optional; an empty file declares a module without
/// dependencies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    /// Treat the module as already applied: never run it, but let its
    /// dependents proceed.
    #[serde(default)]
    pub assume_applied: bool,

    /// Leave the module out of the stack entirely.
    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub dependencies: DependenciesSection,
}

/// `[dependencies]` section of `module.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependenciesSection {
    /// Module directories this module depends on, relative to the module.
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Raw `Stackrun.toml` as deserialized, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStackConfig {
    #[serde(default)]
    pub config: ConfigSection,
}

/// `[config]` section of `Stackrun.toml`.
///
/// ```toml
/// [config]
/// parallelism = 4
/// tool = "terraform"
/// auto_approve = true
/// output_location = "plans/{module}/tfplan"
/// exclude = ["legacy/**"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Maximum number of modules running at once. Defaults to the number of
    /// available CPUs.
    #[serde(default)]
    pub parallelism: Option<usize>,

    /// Tool binary run in every module.
    #[serde(default = "default_tool")]
    pub tool: String,

    /// Detach stdin and keep stderr capture-only.
    #[serde(default)]
    pub non_interactive: bool,

    /// Append `-auto-approve` to apply/destroy.
    #[serde(default = "default_auto_approve")]
    pub auto_approve: bool,

    /// Per-module plan file location, see
    /// [`resolve_output_path`](crate::exec::resolve_output_path).
    #[serde(default)]
    pub output_location: Option<String>,

    /// Globs over module ids; matching modules are treated as already applied.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_tool() -> String {
    "terraform".to_string()
}

fn default_auto_approve() -> bool {
    true
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            parallelism: None,
            tool: default_tool(),
            non_interactive: false,
            auto_approve: default_auto_approve(),
            output_location: None,
            exclude: Vec::new(),
        }
    }
}

/// Validated stack configuration.
///
/// Constructed via `TryFrom<RawStackConfig>` (see `validate.rs`), which
/// also compiles the exclude globs.
#[derive(Debug, Clone)]
pub struct StackConfig {
    pub config: ConfigSection,
    excludes: GlobSet,
}

impl StackConfig {
    pub(crate) fn new_unchecked(config: ConfigSection, excludes: GlobSet) -> Self {
        Self { config, excludes }
    }

    /// Whether a module id matches one of the `exclude` globs.
    pub fn is_excluded(&self, module_id: &str) -> bool {
        self.excludes.is_match(module_id)
    }

    /// Effective parallelism: the configured value, or the CPU count.
    pub fn parallelism(&self) -> usize {
        self.config.parallelism.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

impl Default for StackConfig {
    fn default() -> Self {
        Self::new_unchecked(ConfigSection::default(), GlobSet::empty())
    }
}
