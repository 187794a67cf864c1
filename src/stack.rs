// src/stack.rs

//! The stack: a root directory plus the modules discovered under it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{RunOptions, StackConfig};
use crate::dag::{self, DependencyCycle, Module, RunPlan};
use crate::discovery::discover_modules;
use crate::engine::{Diagnostics, ExecutionEngine, RunReport};
use crate::errors::{Result, StackError};
use crate::exec::{InvocationTemplate, ModuleRunner};
use crate::report::{DeployOrderGroup, GraphRenderer};
use crate::types::{Command, Direction, OrderingMode};

/// A validated set of modules rooted at one directory.
///
/// Construction guarantees the module list is non-empty, ids are unique,
/// every dependency resolves and the dependency relation is acyclic, so no
/// execution path is reachable for a broken stack.
#[derive(Debug, Clone)]
pub struct Stack {
    root: PathBuf,
    modules: Vec<Module>,
}

impl Stack {
    pub fn new(root: impl Into<PathBuf>, modules: Vec<Module>) -> Result<Self> {
        let root = root.into();

        if modules.is_empty() {
            return Err(StackError::NoModulesFound(root));
        }

        // Rejects duplicates and dangling references.
        dag::build_graph(&modules, Direction::Forward)?;

        let stack = Self { root, modules };
        stack.check_for_cycles()?;

        info!(root = %stack.root.display(), modules = stack.modules.len(), "stack ready");
        Ok(stack)
    }

    /// Discover modules under `root` and build a stack from them.
    pub fn discover(root: impl AsRef<Path>, cfg: &StackConfig) -> Result<Self> {
        let root = root.as_ref();
        let modules = discover_modules(root, cfg)?;
        Self::new(root, modules)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module(&self, id: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn check_for_cycles(&self) -> std::result::Result<(), DependencyCycle> {
        dag::check_for_cycles(&self.modules)
    }

    /// Run plan for `command`: reversed for destroy, forward otherwise.
    pub fn compute_run_plan(&self, command: &Command) -> Result<RunPlan> {
        self.plan_in(command.direction(&[]))
    }

    pub fn plan_in(&self, direction: Direction) -> Result<RunPlan> {
        let nodes = dag::build_graph(&self.modules, direction)?;
        dag::compute_run_plan(nodes)
    }

    /// Execute the stack.
    ///
    /// Returns the outcome table when nothing failed. If any module failed the
    /// table is carried by [`StackError::ExecutionFailed`]; a cancelled run
    /// without failures returns [`StackError::Cancelled`].
    pub async fn run(
        &self,
        options: &RunOptions,
        runner: Arc<dyn ModuleRunner>,
        diagnostics: &Diagnostics,
        cancel: CancellationToken,
    ) -> Result<RunReport> {
        let engine = ExecutionEngine::new(runner, options.parallelism);
        let template = InvocationTemplate::new(&self.root, options);
        let direction = options.direction();

        info!(
            command = %options.command,
            ?direction,
            ordering = ?options.ordering,
            parallelism = engine.parallelism(),
            "running stack"
        );

        let mut report = match options.ordering {
            OrderingMode::RespectDependencies => {
                let plan = self.plan_in(direction)?;
                let prerequisites = self.prerequisites(direction)?;
                engine.run_plan(&plan, &prerequisites, &template, &cancel).await
            }
            OrderingMode::IgnoreDependencies => {
                engine.run_unordered(&self.modules, &template, &cancel).await
            }
        };

        report.hints = diagnostics.analyse(&report, &self.modules, &options.command);
        for hint in &report.hints {
            warn!(module = %hint.module, rule = %hint.rule, "{}", hint.message);
        }

        if report.has_failures() {
            Err(StackError::ExecutionFailed(report))
        } else if !report.cancelled().is_empty() {
            Err(StackError::Cancelled(report))
        } else {
            if !report.skipped().is_empty() {
                info!(skipped = report.skipped().len(), "some modules were skipped");
            }
            Ok(report)
        }
    }

    fn prerequisites(&self, direction: Direction) -> Result<BTreeMap<String, BTreeSet<String>>> {
        dag::prerequisites(&self.modules, direction)
    }

    /// Human-readable deploy order for `command`.
    pub fn deploy_order_text(&self, command: &Command) -> Result<String> {
        Ok(crate::report::format_deploy_order(&self.compute_run_plan(command)?))
    }

    /// Structured deploy order for `command`, one record per group.
    pub fn deploy_order(&self, command: &Command) -> Result<Vec<DeployOrderGroup>> {
        Ok(crate::report::deploy_order_groups(&self.compute_run_plan(command)?))
    }

    pub fn deploy_order_json(&self, command: &Command) -> Result<String> {
        let groups = self.deploy_order(command)?;
        serde_json::to_string_pretty(&groups).map_err(|e| StackError::Other(e.into()))
    }

    /// Dependency graph rendered by `renderer`.
    pub fn render_graph(&self, renderer: &dyn GraphRenderer) -> String {
        renderer.render(&self.modules)
    }
}

/// Root path followed by one `  => Module ...` line per module, sorted by id.
impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut modules: Vec<&Module> = self.modules.iter().collect();
        modules.sort_by(|a, b| a.id.cmp(&b.id));

        write!(f, "Stack at {}:", self.root.display())?;
        for module in modules {
            write!(f, "\n  => {module}")?;
        }
        Ok(())
    }
}
