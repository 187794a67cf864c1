// src/dag/plan.rs

//! Topological batching of graph nodes into a [`RunPlan`].

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::dag::graph::GraphNode;
use crate::dag::module::Module;
use crate::errors::{Result, StackError};

/// Lower bound on the number of peeling iterations.
///
/// The effective cap grows with the number of nodes, so only a cycle that
/// slipped past [`check_for_cycles`](crate::dag::check_for_cycles) can hit it.
pub const MIN_ITERATION_CAP: usize = 1000;

/// Modules that may run concurrently at one scheduling step, sorted by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunGroup {
    pub modules: Vec<Module>,
}

impl RunGroup {
    pub fn ids(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Ordered sequence of groups. Every module in group `k` has all of its
/// prerequisites in groups `< k`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPlan {
    pub groups: Vec<RunGroup>,
}

impl RunPlan {
    /// Group ids as plain strings, handy for assertions and reports.
    pub fn id_groups(&self) -> Vec<Vec<String>> {
        self.groups
            .iter()
            .map(|g| g.modules.iter().map(|m| m.id.clone()).collect())
            .collect()
    }

    pub fn module_count(&self) -> usize {
        self.groups.iter().map(RunGroup::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Peel ready nodes off the graph until it is empty.
///
/// A node is ready when it has no remaining prerequisites, or when its module
/// is `assume_applied`; the latter is removed without being scheduled. Every
/// ready id is then removed from the remaining sets of the other nodes.
///
/// An iteration that finds nothing ready means the graph still holds a
/// cycle; that is a fatal error, as is running past the iteration cap.
pub fn compute_run_plan(mut nodes: BTreeMap<String, GraphNode<'_>>) -> Result<RunPlan> {
    let cap = MIN_ITERATION_CAP.max(nodes.len());
    let mut plan = RunPlan::default();
    let mut iterations = 0;

    while !nodes.is_empty() {
        if iterations >= cap {
            warn!(cap, remaining = nodes.len(), "run plan iteration cap reached");
            return Err(stalled(&nodes));
        }
        iterations += 1;

        let ready: BTreeSet<String> = nodes
            .iter()
            .filter(|(_, node)| node.is_ready())
            .map(|(id, _)| id.clone())
            .collect();

        if ready.is_empty() {
            warn!(remaining = nodes.len(), "no module is ready; dependency graph is not acyclic");
            return Err(stalled(&nodes));
        }

        // BTreeMap iteration keeps the group sorted by id.
        let mut group = Vec::new();
        for id in &ready {
            if let Some(node) = nodes.remove(id) {
                if node.module.assume_applied {
                    debug!(module = %id, "assumed applied; unblocking dependents without scheduling");
                } else {
                    group.push(node.module.clone());
                }
            }
        }

        for node in nodes.values_mut() {
            node.remaining.retain(|dep| !ready.contains(dep));
        }

        if !group.is_empty() {
            debug!(
                group = plan.groups.len() + 1,
                modules = ?group.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
                "planned run group"
            );
            plan.groups.push(RunGroup { modules: group });
        }
    }

    Ok(plan)
}

fn stalled(nodes: &BTreeMap<String, GraphNode<'_>>) -> StackError {
    StackError::SchedulingStalled {
        remaining: nodes.keys().cloned().collect(),
    }
}
