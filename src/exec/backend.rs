// src/exec/backend.rs

//! Pluggable module runner abstraction.
//!
//! The execution engine talks to a `ModuleRunner` instead of spawning
//! processes itself. This makes it easy to swap in a fake runner in tests
//! while keeping the production implementation in [`process`].
//!
//! - `ProcessRunner` is the default implementation used by `stackrun`. It
//!   spawns the configured tool in the module directory.
//! - Tests can provide their own `ModuleRunner` that, for example, records
//!   invocations and returns scripted results.
//!
//! [`process`]: super::process

use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;

use super::invocation::ModuleInvocation;
use super::process::run_process;

/// What the engine observes of one module run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Captured stderr, kept for diagnostics.
    pub stderr: String,
}

impl RunOutput {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: Some(0),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            exit_code: Some(exit_code),
            stderr: stderr.into(),
        }
    }
}

/// Trait abstracting how a single module is executed.
///
/// Production code uses [`ProcessRunner`]; tests can provide their own
/// implementation that doesn't spawn real processes.
pub trait ModuleRunner: Send + Sync {
    /// Run the tool for one module and report how it went.
    ///
    /// An `Err` means the tool could not be run at all (e.g. the binary is
    /// missing); the engine records it as a failure of that module only.
    fn run_module(
        &self,
        invocation: ModuleInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutput>> + Send + '_>>;
}

/// Real runner used in production: spawns `invocation.program` with tokio.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleRunner for ProcessRunner {
    fn run_module(
        &self,
        invocation: ModuleInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<RunOutput>> + Send + '_>> {
        Box::pin(async move { Ok(run_process(invocation).await?) })
    }
}
