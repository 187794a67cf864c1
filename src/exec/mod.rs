// src/exec/mod.rs

//! Tool execution layer.
//!
//! This module is responsible for actually running the infrastructure tool
//! in each module directory, using `tokio::process::Command`, and reporting
//! the result back to the execution engine.
//!
//! - [`invocation`] derives each module's own argument list and output path
//!   from the shared run options.
//! - [`process`] runs one tool process, streaming stdout and capturing stderr.
//! - [`backend`] provides the `ModuleRunner` trait and the concrete
//!   `ProcessRunner` used in production, which tests replace with a fake.

pub mod backend;
pub mod invocation;
pub mod process;

pub use backend::{ModuleRunner, ProcessRunner, RunOutput};
pub use invocation::{InvocationTemplate, ModuleInvocation, resolve_output_path};
