// src/engine/executor.rs

//! Group-by-group module executor.
//!
//! Groups of a [`RunPlan`] run strictly in order. Inside a group, every
//! runnable module is spawned onto a `JoinSet` and gated by a shared
//! semaphore holding `parallelism` permits; the group is only finished once
//! the set has been fully joined. Skip decisions for a group are therefore
//! always made from final outcomes of earlier groups.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dag::{Module, RunPlan};
use crate::engine::{ModuleOutcome, ModuleStatus, RunReport};
use crate::exec::{InvocationTemplate, ModuleInvocation, ModuleRunner};

/// Runs modules through a [`ModuleRunner`] with bounded concurrency.
pub struct ExecutionEngine {
    runner: Arc<dyn ModuleRunner>,
    parallelism: usize,
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("parallelism", &self.parallelism)
            .finish_non_exhaustive()
    }
}

impl ExecutionEngine {
    /// `parallelism` is clamped to at least 1.
    pub fn new(runner: Arc<dyn ModuleRunner>, parallelism: usize) -> Self {
        Self {
            runner,
            parallelism: parallelism.max(1),
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Walk `plan` group by group.
    ///
    /// `prerequisites` maps every module id to the ids it waits for in the
    /// plan's direction. A module whose prerequisite failed or was skipped is
    /// marked Skipped and never started; modules without a failed ancestor
    /// run normally. Once `cancel` fires, running modules finish but nothing
    /// new is started and the rest are reported as Cancelled.
    pub async fn run_plan(
        &self,
        plan: &RunPlan,
        prerequisites: &BTreeMap<String, BTreeSet<String>>,
        template: &InvocationTemplate,
        cancel: &CancellationToken,
    ) -> RunReport {
        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut statuses: BTreeMap<String, ModuleStatus> = BTreeMap::new();
        let mut report = RunReport::default();

        for (index, group) in plan.groups.iter().enumerate() {
            info!(
                group = index + 1,
                of = plan.groups.len(),
                modules = ?group.ids(),
                "starting run group"
            );

            let mut slots: Vec<Option<ModuleOutcome>> = vec![None; group.len()];
            let mut runnable = Vec::new();

            for (slot, module) in group.modules.iter().enumerate() {
                if let Some(outcome) = blocked_outcome(module, prerequisites, &statuses) {
                    info!(module = %module.id, status = %outcome.status, "not starting module");
                    slots[slot] = Some(outcome);
                } else if cancel.is_cancelled() {
                    slots[slot] = Some(ModuleOutcome::cancelled(&module.id));
                } else {
                    runnable.push((slot, template.for_module(module)));
                }
            }

            self.join_all(runnable, &semaphore, cancel, &mut slots).await;

            for (slot, module) in slots.into_iter().zip(&group.modules) {
                let outcome = slot.unwrap_or_else(|| {
                    ModuleOutcome::failed(&module.id, None, "module worker ended without a result", String::new())
                });
                statuses.insert(outcome.id.clone(), outcome.status);
                report.outcomes.push(outcome);
            }

            debug!(group = index + 1, "run group resolved");
        }

        log_summary(&report);
        report
    }

    /// Run every module at once, ignoring dependencies entirely.
    ///
    /// Parallelism still applies; failures do not affect other modules.
    /// `assume_applied` modules are not run.
    pub async fn run_unordered(
        &self,
        modules: &[Module],
        template: &InvocationTemplate,
        cancel: &CancellationToken,
    ) -> RunReport {
        let mut selected: Vec<&Module> = modules.iter().filter(|m| !m.assume_applied).collect();
        selected.sort_by(|a, b| a.id.cmp(&b.id));

        info!(modules = selected.len(), "running all modules ignoring dependency order");

        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let mut slots: Vec<Option<ModuleOutcome>> = vec![None; selected.len()];
        let mut runnable = Vec::new();

        for (slot, module) in selected.iter().enumerate() {
            if cancel.is_cancelled() {
                slots[slot] = Some(ModuleOutcome::cancelled(&module.id));
            } else {
                runnable.push((slot, template.for_module(module)));
            }
        }

        self.join_all(runnable, &semaphore, cancel, &mut slots).await;

        let report = RunReport {
            outcomes: slots
                .into_iter()
                .zip(selected)
                .map(|(slot, module)| {
                    slot.unwrap_or_else(|| {
                        ModuleOutcome::failed(&module.id, None, "module worker ended without a result", String::new())
                    })
                })
                .collect(),
            hints: Vec::new(),
        };

        log_summary(&report);
        report
    }

    /// Spawn every invocation and wait for all of them: the group barrier.
    async fn join_all(
        &self,
        runnable: Vec<(usize, ModuleInvocation)>,
        semaphore: &Arc<Semaphore>,
        cancel: &CancellationToken,
        slots: &mut [Option<ModuleOutcome>],
    ) {
        let mut set = JoinSet::new();

        for (slot, invocation) in runnable {
            set.spawn(run_one(
                slot,
                invocation,
                Arc::clone(&self.runner),
                Arc::clone(semaphore),
                cancel.clone(),
            ));
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((slot, outcome)) => slots[slot] = Some(outcome),
                Err(err) => error!(error = %err, "module worker panicked or was aborted"),
            }
        }
    }
}

/// Worker for a single module: wait for a permit, then run it.
async fn run_one(
    slot: usize,
    invocation: ModuleInvocation,
    runner: Arc<dyn ModuleRunner>,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> (usize, ModuleOutcome) {
    let id = invocation.module_id.clone();

    let permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(module = %id, "cancelled while waiting for an execution slot");
            return (slot, ModuleOutcome::cancelled(id));
        }
        permit = semaphore.acquire_owned() => permit,
    };

    let _permit = match permit {
        Ok(p) => p,
        Err(_) => {
            return (
                slot,
                ModuleOutcome::failed(id, None, "execution slots closed unexpectedly", String::new()),
            );
        }
    };

    let outcome = match runner.run_module(invocation).await {
        Ok(output) if output.success => ModuleOutcome::succeeded(&id, output.stderr),
        Ok(output) => {
            let reason = match output.exit_code {
                Some(code) => format!("exited with code {code}"),
                None => "terminated by signal".to_string(),
            };
            warn!(module = %id, %reason, "module failed");
            ModuleOutcome::failed(&id, output.exit_code, reason, output.stderr)
        }
        Err(err) => {
            error!(module = %id, error = %err, "module could not be run");
            ModuleOutcome::failed(&id, None, err.to_string(), String::new())
        }
    };

    (slot, outcome)
}

/// Decide whether `module` must not start because of its prerequisites.
///
/// Prerequisites without a recorded status (`assume_applied` modules) count
/// as satisfied.
fn blocked_outcome(
    module: &Module,
    prerequisites: &BTreeMap<String, BTreeSet<String>>,
    statuses: &BTreeMap<String, ModuleStatus>,
) -> Option<ModuleOutcome> {
    let prereqs = prerequisites.get(&module.id)?;
    let mut cancelled = false;

    for prereq in prereqs {
        match statuses.get(prereq) {
            Some(ModuleStatus::Failed) => {
                return Some(ModuleOutcome::skipped(
                    &module.id,
                    format!("dependency '{prereq}' failed"),
                ));
            }
            Some(ModuleStatus::Skipped) => {
                return Some(ModuleOutcome::skipped(
                    &module.id,
                    format!("dependency '{prereq}' was skipped"),
                ));
            }
            Some(ModuleStatus::Cancelled) => cancelled = true,
            Some(ModuleStatus::Succeeded) | None => {}
        }
    }

    cancelled.then(|| ModuleOutcome::cancelled(&module.id))
}

fn log_summary(report: &RunReport) {
    info!(
        succeeded = report.succeeded().len(),
        failed = report.failed().len(),
        skipped = report.skipped().len(),
        cancelled = report.cancelled().len(),
        "run finished"
    );
}
