// src/engine/mod.rs

//! Execution engine for stackrun.
//!
//! This module ties together:
//! - the group-by-group executor ([`executor`]) that walks a run plan with
//!   bounded concurrency and skips dependents of failed modules
//! - the per-module outcome table returned to callers
//! - pluggable diagnostics ([`diagnostics`]) that look at captured tool
//!   output after a run and suggest fixes

use std::fmt;

pub mod diagnostics;
pub mod executor;

pub use diagnostics::{DiagnosticHint, DiagnosticRule, Diagnostics, RemoteStateRule};
pub use executor::ExecutionEngine;

/// Final status of one module in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    Succeeded,
    Failed,
    /// Not run because a prerequisite failed or was itself skipped.
    Skipped,
    /// Not run because cancellation was requested before it could start.
    Cancelled,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleStatus::Succeeded => "succeeded",
            ModuleStatus::Failed => "failed",
            ModuleStatus::Skipped => "skipped",
            ModuleStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Outcome of one module, written exactly once by the worker that ran it (or
/// by the engine when the module never started).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutcome {
    pub id: String,
    pub status: ModuleStatus,
    pub exit_code: Option<i32>,
    pub error: Option<String>,
    /// Captured stderr of the tool, empty when the module never ran.
    pub stderr: String,
}

impl ModuleOutcome {
    pub fn succeeded(id: impl Into<String>, stderr: String) -> Self {
        Self {
            id: id.into(),
            status: ModuleStatus::Succeeded,
            exit_code: Some(0),
            error: None,
            stderr,
        }
    }

    pub fn failed(id: impl Into<String>, exit_code: Option<i32>, error: impl Into<String>, stderr: String) -> Self {
        Self {
            id: id.into(),
            status: ModuleStatus::Failed,
            exit_code,
            error: Some(error.into()),
            stderr,
        }
    }

    pub fn skipped(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ModuleStatus::Skipped,
            exit_code: None,
            error: Some(reason.into()),
            stderr: String::new(),
        }
    }

    pub fn cancelled(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: ModuleStatus::Cancelled,
            exit_code: None,
            error: None,
            stderr: String::new(),
        }
    }
}

/// Per-module outcome table of a run, in plan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub outcomes: Vec<ModuleOutcome>,
    pub hints: Vec<DiagnosticHint>,
}

impl RunReport {
    pub fn outcome(&self, id: &str) -> Option<&ModuleOutcome> {
        self.outcomes.iter().find(|o| o.id == id)
    }

    pub fn status_of(&self, id: &str) -> Option<ModuleStatus> {
        self.outcome(id).map(|o| o.status)
    }

    pub fn ids_with(&self, status: ModuleStatus) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.id.as_str())
            .collect()
    }

    pub fn succeeded(&self) -> Vec<&str> {
        self.ids_with(ModuleStatus::Succeeded)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.ids_with(ModuleStatus::Failed)
    }

    pub fn skipped(&self) -> Vec<&str> {
        self.ids_with(ModuleStatus::Skipped)
    }

    pub fn cancelled(&self) -> Vec<&str> {
        self.ids_with(ModuleStatus::Cancelled)
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(|o| o.status == ModuleStatus::Failed)
    }
}
