// src/discovery.rs

//! Module discovery.
//!
//! Walks a directory tree and turns every directory holding a `module.toml`
//! into a [`Module`]. Dependency paths are resolved relative to the declaring
//! module and converted to ids (paths relative to the stack root), so they can
//! be matched against other modules without touching the filesystem again.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use crate::config::{MODULE_CONFIG_FILE, StackConfig, load_module_config};
use crate::dag::Module;
use crate::errors::{Result, StackError};

/// Discover all modules below `root`, sorted by id.
///
/// - Hidden directories (`.terraform`, `.git`, caches) are not descended into.
/// - Modules with `skip = true` are left out.
/// - Modules matching an `exclude` glob are marked `assume_applied`.
pub fn discover_modules(root: &Path, cfg: &StackConfig) -> Result<Vec<Module>> {
    let root = absolute_root(root)?;
    let mut module_dirs = Vec::new();
    collect_module_dirs(&root, &mut module_dirs)?;

    let mut modules = Vec::with_capacity(module_dirs.len());

    for dir in module_dirs {
        let config_path = dir.join(MODULE_CONFIG_FILE);
        let module_cfg = load_module_config(&config_path).map_err(|e| {
            StackError::ConfigError(format!("{}: {e}", config_path.display()))
        })?;

        let id = module_id(&root, &dir);

        if module_cfg.skip {
            info!(module = %id, "module has skip = true; leaving it out of the stack");
            continue;
        }

        let dependencies: BTreeSet<String> = module_cfg
            .dependencies
            .paths
            .iter()
            .map(|dep| module_id(&root, &normalize(&dir.join(dep))))
            .collect();

        let excluded = cfg.is_excluded(&id);
        if excluded {
            info!(module = %id, "module matches an exclude pattern; assuming it is applied");
        }

        debug!(module = %id, ?dependencies, "discovered module");

        modules.push(Module {
            id,
            path: dir,
            dependencies,
            assume_applied: module_cfg.assume_applied || excluded,
        });
    }

    modules.sort_by(|a, b| a.id.cmp(&b.id));
    info!(root = %root.display(), modules = modules.len(), "module discovery finished");
    Ok(modules)
}

fn absolute_root(root: &Path) -> Result<PathBuf> {
    let abs = std::path::absolute(root)
        .with_context(|| format!("resolving stack root {:?}", root))?;
    if !abs.is_dir() {
        return Err(StackError::ConfigError(format!(
            "stack root {} is not a directory",
            abs.display()
        )));
    }
    Ok(normalize(&abs))
}

fn collect_module_dirs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if dir.join(MODULE_CONFIG_FILE).is_file() {
        out.push(dir.to_path_buf());
    }

    let mut children = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.file_type()?.is_dir() {
            children.push(entry.path());
        }
    }
    children.sort();

    for child in children {
        collect_module_dirs(&child, out)?;
    }

    Ok(())
}

/// Id of a module directory: its path relative to `root`, `/`-separated.
///
/// The root itself is `.`. Directories outside the root keep their full
/// normalised path, which can never match a discovered module.
pub fn module_id(root: &Path, dir: &Path) -> String {
    match dir.strip_prefix(root) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => dir.display().to_string(),
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
