// src/exec/invocation.rs

//! Per-module tool invocations.
//!
//! Every module gets its own [`ModuleInvocation`], built from the shared
//! [`RunOptions`] before execution starts. Workers own their invocation, so
//! nothing about the argument list or output paths is shared between
//! concurrently running modules.

use std::path::{Path, PathBuf};

use crate::config::RunOptions;
use crate::dag::Module;
use crate::types::Command;

/// Placeholder replaced by the module id in `output_location`.
pub const MODULE_PLACEHOLDER: &str = "{module}";

/// File name used when `output_location` names a directory.
pub const DEFAULT_PLAN_FILE: &str = "tfplan";

/// Everything needed to run the tool once in one module directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInvocation {
    pub module_id: String,
    pub working_dir: PathBuf,
    pub program: String,
    pub args: Vec<String>,
    /// Per-module artifact path (plan file), if configured.
    pub output_path: Option<PathBuf>,
    /// Echo the tool's stderr live in addition to capturing it.
    pub mirror_stderr: bool,
    /// Hand our stdin to the tool. Only set for interactive runs with one
    /// module at a time, so concurrent tools never read the same terminal.
    pub inherit_stdin: bool,
}

/// Shared parameters from which per-module invocations are derived.
#[derive(Debug, Clone)]
pub struct InvocationTemplate {
    root: PathBuf,
    program: String,
    command: Command,
    extra_args: Vec<String>,
    non_interactive: bool,
    auto_approve: bool,
    serial: bool,
    output_location: Option<String>,
}

impl InvocationTemplate {
    pub fn new(root: impl Into<PathBuf>, options: &RunOptions) -> Self {
        Self {
            root: root.into(),
            program: options.tool.clone(),
            command: options.command.clone(),
            extra_args: options.extra_args.clone(),
            non_interactive: options.non_interactive,
            auto_approve: options.auto_approve,
            serial: options.parallelism <= 1,
            output_location: options.output_location.clone(),
        }
    }

    /// Build a fresh invocation for `module`.
    ///
    /// Flags we add go right after the command so a positional argument in
    /// the extra args (`apply tfplan`) does not end flag parsing before them.
    /// The plan file goes last.
    pub fn for_module(&self, module: &Module) -> ModuleInvocation {
        let mut args = Vec::with_capacity(self.extra_args.len() + 4);
        args.push(self.command.as_str().to_string());

        if self.command.needs_input() && !has_flag(&self.extra_args, "-input") {
            args.push("-input=false".to_string());
        }

        if self.auto_approve && self.command.is_mutating() && !has_flag(&self.extra_args, "-auto-approve") {
            args.push("-auto-approve".to_string());
        }

        args.extend(self.extra_args.iter().cloned());

        let output_path = self
            .output_location
            .as_deref()
            .map(|template| resolve_output_path(&self.root, template, &module.id));

        if let Some(path) = &output_path {
            match self.command {
                Command::Plan => args.push(format!("-out={}", path.display())),
                _ => args.push(path.display().to_string()),
            }
        }

        ModuleInvocation {
            module_id: module.id.clone(),
            working_dir: module.path.clone(),
            program: self.program.clone(),
            args,
            output_path,
            mirror_stderr: !self.non_interactive,
            inherit_stdin: self.serial && !self.non_interactive,
        }
    }
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|a| a == flag || a.strip_prefix(flag).is_some_and(|rest| rest.starts_with('=')))
}

/// Derive the artifact path for one module.
///
/// - `plans/{module}/out.tfplan` -> `plans/<id>/out.tfplan`
/// - `plans` (no placeholder) -> `plans/<id>/tfplan`
///
/// The root module (`.`) is written as `root`. Relative results are anchored
/// at the stack root.
pub fn resolve_output_path(root: &Path, template: &str, module_id: &str) -> PathBuf {
    let name = if module_id == "." { "root" } else { module_id };

    let path = if template.contains(MODULE_PLACEHOLDER) {
        PathBuf::from(template.replace(MODULE_PLACEHOLDER, name))
    } else {
        Path::new(template).join(name).join(DEFAULT_PLAN_FILE)
    };

    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
