// src/report/dot.rs

use std::collections::{BTreeSet, HashMap};

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dag::Module;

/// Renders the module dependency graph for visualisation.
pub trait GraphRenderer {
    fn render(&self, modules: &[Module]) -> String;
}

/// Graphviz DOT output. Edges point from a module to what it depends on;
/// modules assumed applied are drawn dashed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotRenderer;

impl GraphRenderer for DotRenderer {
    fn render(&self, modules: &[Module]) -> String {
        let mut graph: DiGraph<String, &str> = DiGraph::new();
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for module in modules {
            let node = graph.add_node(module.id.clone());
            index.insert(module.id.as_str(), node);
        }

        for module in modules {
            for dep in &module.dependencies {
                if let (Some(&from), Some(&to)) = (index.get(module.id.as_str()), index.get(dep.as_str())) {
                    graph.add_edge(from, to, "");
                }
            }
        }

        let applied: BTreeSet<&str> = modules
            .iter()
            .filter(|m| m.assume_applied)
            .map(|m| m.id.as_str())
            .collect();

        let edge_attr = |_, _| String::new();
        let node_attr = |_, (_, id): (NodeIndex, &String)| {
            if applied.contains(id.as_str()) {
                "style = dashed".to_string()
            } else {
                String::new()
            }
        };

        let dot = Dot::with_attr_getters(&graph, &[Config::EdgeNoLabel], &edge_attr, &node_attr);

        format!("{dot}")
    }
}
