// src/dag/mod.rs

//! Dependency graph and run planning.
//!
//! - [`module`] describes one schedulable unit of work.
//! - [`graph`] turns a module list into direction-aware graph nodes.
//! - [`cycle`] validates that declared dependencies are acyclic.
//! - [`plan`] peels graph nodes into ordered, concurrently runnable groups.

pub mod cycle;
pub mod graph;
pub mod module;
pub mod plan;

pub use cycle::{DependencyCycle, check_for_cycles};
pub use graph::{GraphNode, build_graph, prerequisites};
pub use module::Module;
pub use plan::{RunGroup, RunPlan, compute_run_plan};
