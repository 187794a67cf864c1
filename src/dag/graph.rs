// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::dag::module::Module;
use crate::errors::{Result, StackError};
use crate::types::Direction;

/// Scheduling-time wrapper around a [`Module`].
///
/// `remaining` starts as the module's prerequisites in the requested
/// direction and shrinks as earlier groups are peeled off. A node map is
/// built fresh for every planning call and never shared.
#[derive(Debug, Clone)]
pub struct GraphNode<'a> {
    pub module: &'a Module,
    pub remaining: BTreeSet<String>,
}

impl GraphNode<'_> {
    pub fn is_ready(&self) -> bool {
        self.remaining.is_empty() || self.module.assume_applied
    }
}

/// Build the id -> node map for the given modules.
///
/// - `Forward`: a node's prerequisites are its declared dependencies.
/// - `Reverse`: edges are inverted; for every module M declaring D, D gains
///   M as a prerequisite, so D is handled only after everything using it.
///
/// Fails on a declared dependency that names no module in `modules`.
pub fn build_graph(modules: &[Module], direction: Direction) -> Result<BTreeMap<String, GraphNode<'_>>> {
    let mut nodes: BTreeMap<String, GraphNode<'_>> = BTreeMap::new();

    for module in modules {
        let node = GraphNode {
            module,
            remaining: BTreeSet::new(),
        };
        if nodes.insert(module.id.clone(), node).is_some() {
            return Err(StackError::DuplicateModule(module.id.clone()));
        }
    }

    for module in modules {
        for dep in &module.dependencies {
            if !nodes.contains_key(dep) {
                return Err(StackError::UnresolvedDependency {
                    module: module.id.clone(),
                    dependency: dep.clone(),
                });
            }

            let (node_id, prerequisite) = match direction {
                Direction::Forward => (&module.id, dep),
                Direction::Reverse => (dep, &module.id),
            };

            if let Some(node) = nodes.get_mut(node_id) {
                node.remaining.insert(prerequisite.clone());
            }
        }
    }

    trace!(nodes = nodes.len(), ?direction, "built dependency graph");
    Ok(nodes)
}

/// Prerequisites of every module in the given direction, detached from the
/// node lifetimes. The engine uses this to decide skips.
pub fn prerequisites(modules: &[Module], direction: Direction) -> Result<BTreeMap<String, BTreeSet<String>>> {
    Ok(build_graph(modules, direction)?
        .into_iter()
        .map(|(id, node)| (id, node.remaining))
        .collect())
}
