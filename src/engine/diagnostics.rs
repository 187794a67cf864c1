// src/engine/diagnostics.rs

//! Best-effort hints derived from captured tool output.
//!
//! Rules only ever read a finished [`RunReport`]; scheduling and execution
//! never depend on them. A rule whose pattern stops matching because the
//! tool changed its wording simply produces no hint.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::dag::Module;
use crate::engine::{ModuleOutcome, ModuleStatus, RunReport};
use crate::types::Command;

/// A hint attached to a module after a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticHint {
    pub module: String,
    pub rule: String,
    pub message: String,
}

/// One text-matching rule over a module outcome.
pub trait DiagnosticRule: Send + Sync {
    fn name(&self) -> &str;

    /// Return a hint for this outcome of `module`, if the rule applies.
    fn check(&self, outcome: &ModuleOutcome, module: &Module, command: &Command) -> Option<String>;
}

/// Terraform's wording for a `terraform_remote_state` data source whose
/// backend holds no state yet (old and current phrasings).
static REMOTE_STATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)(error running plan:.*resource 'data\.terraform_remote_state\.)|(unable to find remote state)",
    )
    .unwrap()
});

/// Flags plans that failed because a dependency's remote state does not
/// exist yet, which happens when planning a stack whose dependencies were
/// never applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteStateRule;

impl DiagnosticRule for RemoteStateRule {
    fn name(&self) -> &str {
        "remote-state"
    }

    fn check(&self, outcome: &ModuleOutcome, module: &Module, command: &Command) -> Option<String> {
        if *command != Command::Plan || outcome.status != ModuleStatus::Failed {
            return None;
        }
        if !REMOTE_STATE_RE.is_match(&outcome.stderr) {
            return None;
        }

        if module.dependencies.is_empty() {
            return Some(format!(
                "module '{}' reads remote state which may not exist yet; \
                 apply the modules it reads from first, then plan again",
                module.id
            ));
        }

        let deps: Vec<&str> = module.dependencies.iter().map(String::as_str).collect();
        Some(format!(
            "module '{}' depends on [{}] and reads their remote state, which may not exist yet; \
             apply the dependencies first, then plan again",
            module.id,
            deps.join(", ")
        ))
    }
}

/// Ordered set of rules run over a report.
pub struct Diagnostics {
    rules: Vec<Box<dyn DiagnosticRule>>,
}

impl Diagnostics {
    pub fn new(rules: Vec<Box<dyn DiagnosticRule>>) -> Self {
        Self { rules }
    }

    /// No rules at all; useful to turn hints off.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Run every rule over every outcome whose module is in `modules`.
    pub fn analyse(&self, report: &RunReport, modules: &[Module], command: &Command) -> Vec<DiagnosticHint> {
        let mut hints = Vec::new();

        for outcome in &report.outcomes {
            let Some(module) = modules.iter().find(|m| m.id == outcome.id) else {
                continue;
            };
            for rule in &self.rules {
                if let Some(message) = rule.check(outcome, module, command) {
                    debug!(module = %outcome.id, rule = rule.name(), "diagnostic rule matched");
                    hints.push(DiagnosticHint {
                        module: outcome.id.clone(),
                        rule: rule.name().to_string(),
                        message,
                    });
                }
            }
        }

        hints
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(vec![Box::new(RemoteStateRule)])
    }
}
