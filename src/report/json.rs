// src/report/json.rs

use serde::Serialize;

use crate::dag::RunPlan;

/// One group of the structured deploy order.
///
/// Emitted as an ordered array rather than a `"Group N"`-keyed map so that
/// consumers never see `Group 10` sorted before `Group 2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployOrderGroup {
    /// 1-based position in the run.
    pub group: usize,
    pub label: String,
    pub modules: Vec<String>,
}

pub fn deploy_order_groups(plan: &RunPlan) -> Vec<DeployOrderGroup> {
    plan.groups
        .iter()
        .enumerate()
        .map(|(index, group)| DeployOrderGroup {
            group: index + 1,
            label: format!("Group {}", index + 1),
            modules: group.modules.iter().map(|m| m.id.clone()).collect(),
        })
        .collect()
}
