// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::dag::DependencyCycle;
use crate::engine::RunReport;

#[derive(Error, Debug)]
pub enum StackError {
    #[error("No modules found under {}", .0.display())]
    NoModulesFound(PathBuf),

    #[error("Module '{module}' depends on '{dependency}', which is not part of the stack")]
    UnresolvedDependency { module: String, dependency: String },

    #[error("Module discovered twice: {0}")]
    DuplicateModule(String),

    #[error("Cycle detected in module dependencies: {0}")]
    DependencyCycle(#[from] DependencyCycle),

    #[error("Scheduling stalled with unscheduled modules: {}", .remaining.join(", "))]
    SchedulingStalled { remaining: Vec<String> },

    #[error("{} module(s) failed: {}", .0.failed().len(), .0.failed().join(", "))]
    ExecutionFailed(RunReport),

    #[error("Run cancelled; {} module(s) never started", .0.cancelled().len())]
    Cancelled(RunReport),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StackError {
    /// Outcome table of the run, for errors raised after execution started.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            StackError::ExecutionFailed(report) | StackError::Cancelled(report) => Some(report),
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, StackError>;
