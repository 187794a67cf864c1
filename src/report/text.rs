// src/report/text.rs

use std::fmt::Write;

use crate::dag::RunPlan;
use crate::engine::{ModuleStatus, RunReport};

/// Render `Group N` sections in execution order, one module id per line.
///
/// ```text
/// Group 1
///   - vpc
///
/// Group 2
///   - app
///   - mysql
/// ```
pub fn format_deploy_order(plan: &RunPlan) -> String {
    let mut out = String::new();

    for (index, group) in plan.groups.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = writeln!(out, "Group {}", index + 1);
        for module in &group.modules {
            let _ = writeln!(out, "  - {}", module.id);
        }
    }

    out
}

/// End-of-run table: one line per module, then counts and hints.
///
/// Failed modules also get the tail of their captured stderr so the cause is
/// visible even when output was not mirrored live.
pub fn format_summary(report: &RunReport) -> String {
    let mut out = String::new();

    for outcome in &report.outcomes {
        let _ = write!(out, "{:<10} {}", outcome.status.to_string(), outcome.id);
        if let Some(error) = &outcome.error {
            let _ = write!(out, " ({error})");
        }
        out.push('\n');

        if outcome.status == ModuleStatus::Failed {
            for line in tail(&outcome.stderr, 10) {
                let _ = writeln!(out, "    | {line}");
            }
        }
    }

    let _ = writeln!(
        out,
        "\n{} succeeded, {} failed, {} skipped, {} cancelled",
        report.succeeded().len(),
        report.failed().len(),
        report.skipped().len(),
        report.cancelled().len(),
    );

    for hint in &report.hints {
        let _ = writeln!(out, "hint: {}", hint.message);
    }

    out
}

fn tail(text: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].to_vec()
}
