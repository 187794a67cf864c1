// src/report/mod.rs

//! Rendering of plans, graphs and run results.
//!
//! - [`text`] prints the deploy order and the end-of-run summary.
//! - [`json`] provides the structured deploy order.
//! - [`dot`] exports the dependency graph through a [`GraphRenderer`].

pub mod dot;
pub mod json;
pub mod text;

pub use dot::{DotRenderer, GraphRenderer};
pub use json::{DeployOrderGroup, deploy_order_groups};
pub use text::{format_deploy_order, format_summary};
