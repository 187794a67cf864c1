// src/dag/cycle.rs

//! Cycle detection over declared module dependencies.
//!
//! Uses a depth-first traversal with three-colour marking so that a cycle is
//! reported as the actual path (`A -> B -> C -> A`) rather than a bare flag.
//! The declared (forward) direction is enough: a cycle in one direction is a
//! cycle in the other.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::debug;

use crate::dag::module::Module;

/// An ordered list of module ids forming a cycle. The last id repeats the
/// first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCycle {
    pub ids: Vec<String>,
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ids.join(" -> "))
    }
}

impl std::error::Error for DependencyCycle {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Return the first cycle found among `modules`, if any.
///
/// Modules and their dependencies are visited in id order, so the reported
/// cycle is the same on every call. Dependencies naming unknown modules are
/// ignored here; graph construction reports those.
pub fn check_for_cycles(modules: &[Module]) -> Result<(), DependencyCycle> {
    let edges: BTreeMap<&str, &BTreeSet<String>> = modules
        .iter()
        .map(|m| (m.id.as_str(), &m.dependencies))
        .collect();

    let mut marks: BTreeMap<&str, Mark> = edges.keys().map(|id| (*id, Mark::Unvisited)).collect();
    let mut path: Vec<&str> = Vec::new();

    for &id in edges.keys() {
        if marks.get(id) == Some(&Mark::Unvisited) {
            if let Some(cycle) = visit(id, &edges, &mut marks, &mut path) {
                debug!(%cycle, "dependency cycle detected");
                return Err(cycle);
            }
        }
    }

    Ok(())
}

fn visit<'a>(
    id: &'a str,
    edges: &BTreeMap<&'a str, &'a BTreeSet<String>>,
    marks: &mut BTreeMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
) -> Option<DependencyCycle> {
    marks.insert(id, Mark::InProgress);
    path.push(id);

    if let Some(&deps) = edges.get(id) {
        for dep in deps {
            match marks.get(dep.as_str()) {
                Some(Mark::InProgress) => {
                    let start = path.iter().position(|p| *p == dep.as_str()).unwrap_or(0);
                    let mut ids: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
                    ids.push(dep.clone());
                    return Some(DependencyCycle { ids });
                }
                Some(Mark::Unvisited) => {
                    if let Some(cycle) = visit(dep.as_str(), edges, marks, path) {
                        return Some(cycle);
                    }
                }
                Some(Mark::Done) | None => {}
            }
        }
    }

    path.pop();
    marks.insert(id, Mark::Done);
    None
}
