// tests/engine_execution.rs

mod common;
use crate::common::builders::{ModuleBuilder, StackBuilder, diamond};
use crate::common::fake_runner::{FakeRunner, RunEvent};
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use stackrun::Stack;
use stackrun::config::RunOptions;
use stackrun::dag::prerequisites;
use stackrun::engine::{ExecutionEngine, ModuleStatus, RunReport};
use stackrun::exec::InvocationTemplate;
use stackrun::types::{Command, Direction};

type TestResult = Result<(), Box<dyn Error>>;

/// Run `stack` forward through the engine directly, bypassing `Stack::run`.
async fn run_forward(stack: &Stack, runner: &FakeRunner, parallelism: usize) -> Result<RunReport, Box<dyn Error>> {
    run_with(stack, runner, parallelism, Command::Apply, &CancellationToken::new()).await
}

async fn run_with(
    stack: &Stack,
    runner: &FakeRunner,
    parallelism: usize,
    command: Command,
    cancel: &CancellationToken,
) -> Result<RunReport, Box<dyn Error>> {
    let options = RunOptions::new(command).with_parallelism(parallelism);
    let direction = options.direction();
    let plan = stack.plan_in(direction)?;
    let prereqs = prerequisites(stack.modules(), direction)?;
    let template = InvocationTemplate::new(stack.root(), &options);

    let engine = ExecutionEngine::new(runner.shared(), parallelism);
    Ok(with_timeout(engine.run_plan(&plan, &prereqs, &template, cancel)).await)
}

fn position(events: &[RunEvent], wanted: &RunEvent) -> usize {
    events
        .iter()
        .position(|e| e == wanted)
        .unwrap_or_else(|| panic!("event {wanted:?} not recorded in {events:?}"))
}

#[tokio::test]
async fn failed_module_skips_dependents_but_not_unrelated_modules() -> TestResult {
    init_tracing();

    let stack = StackBuilder::new()
        .with("A", &[])
        .with("B", &["A"])
        .with("C", &[])
        .build();
    let runner = FakeRunner::new().failing("A");

    let report = run_forward(&stack, &runner, 4).await?;

    assert_eq!(report.status_of("A"), Some(ModuleStatus::Failed));
    assert_eq!(report.status_of("B"), Some(ModuleStatus::Skipped));
    assert_eq!(report.status_of("C"), Some(ModuleStatus::Succeeded));
    assert_eq!(report.outcome("A").and_then(|o| o.exit_code), Some(1));

    let started = runner.started();
    assert!(!started.contains(&"B".to_string()), "B must never start: {started:?}");
    Ok(())
}

#[tokio::test]
async fn skip_propagates_transitively() -> TestResult {
    let stack = StackBuilder::new()
        .with("A", &[])
        .with("B", &["A"])
        .with("D", &["B"])
        .build();
    let runner = FakeRunner::new().failing("A");

    let report = run_forward(&stack, &runner, 2).await?;

    assert_eq!(report.failed(), vec!["A"]);
    assert_eq!(report.skipped(), vec!["B", "D"]);

    let reason = report.outcome("D").and_then(|o| o.error.clone()).unwrap_or_default();
    assert!(reason.contains("'B' was skipped"), "unexpected reason: {reason}");
    Ok(())
}

#[tokio::test]
async fn every_module_gets_exactly_one_outcome_in_plan_order() -> TestResult {
    let stack = diamond().build();
    let runner = FakeRunner::new();

    let report = run_forward(&stack, &runner, 3).await?;

    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B", "C", "D"]);
    assert_eq!(report.succeeded().len(), 4);
    assert!(!report.has_failures());
    Ok(())
}

#[tokio::test]
async fn groups_are_barriers() -> TestResult {
    let stack = diamond().build();
    let runner = FakeRunner::new().with_delay(Duration::from_millis(20));

    run_forward(&stack, &runner, 4).await?;
    let events = runner.events();

    let started = |id: &str| position(&events, &RunEvent::Started(id.to_string()));
    let finished = |id: &str| position(&events, &RunEvent::Finished(id.to_string()));

    assert!(finished("A") < started("B"));
    assert!(finished("A") < started("C"));
    assert!(finished("B") < started("D"));
    assert!(finished("C") < started("D"));
    Ok(())
}

#[tokio::test]
async fn independent_modules_in_a_group_run_concurrently() -> TestResult {
    let stack = StackBuilder::new().with("A", &[]).with("B", &[]).with("C", &[]).build();
    let runner = FakeRunner::new().with_delay(Duration::from_millis(30));

    run_forward(&stack, &runner, 3).await?;

    assert_eq!(runner.max_running(), 3);
    Ok(())
}

#[tokio::test]
async fn parallelism_bounds_concurrent_modules() -> TestResult {
    let mut builder = StackBuilder::new();
    for i in 0..8 {
        builder = builder.with(&format!("mod{i}"), &[]);
    }
    let stack = builder.build();
    let runner = FakeRunner::new().with_delay(Duration::from_millis(20));

    let report = run_forward(&stack, &runner, 2).await?;

    assert_eq!(report.succeeded().len(), 8);
    assert!(runner.max_running() <= 2, "max running was {}", runner.max_running());
    Ok(())
}

#[tokio::test]
async fn parallelism_of_one_runs_modules_serially() -> TestResult {
    let stack = diamond().build();
    let runner = FakeRunner::new().with_delay(Duration::from_millis(5));

    run_forward(&stack, &runner, 1).await?;

    assert_eq!(runner.max_running(), 1);
    Ok(())
}

#[tokio::test]
async fn destroy_runs_dependents_first_and_skips_prerequisites_on_failure() -> TestResult {
    let stack = StackBuilder::new()
        .with("vpc", &[])
        .with("app", &["vpc"])
        .with("dns", &[])
        .build();
    let runner = FakeRunner::new().failing("app");

    let report = run_with(&stack, &runner, 2, Command::Destroy, &CancellationToken::new()).await?;

    // Reverse direction: vpc waits for app, so a failed app destroy keeps vpc.
    assert_eq!(report.status_of("app"), Some(ModuleStatus::Failed));
    assert_eq!(report.status_of("vpc"), Some(ModuleStatus::Skipped));
    assert_eq!(report.status_of("dns"), Some(ModuleStatus::Succeeded));
    Ok(())
}

#[tokio::test]
async fn assume_applied_prerequisite_counts_as_satisfied() -> TestResult {
    let stack = StackBuilder::new()
        .with_module(ModuleBuilder::new("vpc").assume_applied().build())
        .with("app", &["vpc"])
        .build();
    let runner = FakeRunner::new();

    let report = run_forward(&stack, &runner, 2).await?;

    assert_eq!(report.status_of("app"), Some(ModuleStatus::Succeeded));
    assert_eq!(report.outcome("vpc"), None);
    assert_eq!(runner.started(), vec!["app".to_string()]);
    Ok(())
}

#[tokio::test]
async fn unrunnable_module_is_reported_as_failed() -> TestResult {
    let stack = StackBuilder::new().with("A", &[]).with("B", &["A"]).build();
    let runner = FakeRunner::new().unrunnable("A");

    let report = run_forward(&stack, &runner, 2).await?;

    let a = report.outcome("A").ok_or("missing outcome for A")?;
    assert_eq!(a.status, ModuleStatus::Failed);
    assert_eq!(a.exit_code, None);
    assert!(a.error.as_deref().unwrap_or_default().contains("no such tool"));
    assert_eq!(report.status_of("B"), Some(ModuleStatus::Skipped));
    Ok(())
}

#[tokio::test]
async fn failure_stderr_is_kept_in_the_outcome() -> TestResult {
    let stack = StackBuilder::new().with("A", &[]).build();
    let runner = FakeRunner::new()
        .failing("A")
        .with_stderr("A", "Error: Invalid provider configuration");

    let report = run_forward(&stack, &runner, 1).await?;

    let a = report.outcome("A").ok_or("missing outcome for A")?;
    assert!(a.stderr.contains("Invalid provider configuration"));
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_later_groups() -> TestResult {
    let stack = StackBuilder::new()
        .with("A", &[])
        .with("B", &["A"])
        .with("C", &["B"])
        .build();
    let cancel = CancellationToken::new();
    let runner = FakeRunner::new().cancel_when_started("A", cancel.clone());

    let report = run_with(&stack, &runner, 2, Command::Apply, &cancel).await?;

    // A was already running and finishes normally.
    assert_eq!(report.status_of("A"), Some(ModuleStatus::Succeeded));
    assert_eq!(report.cancelled(), vec!["B", "C"]);
    assert_eq!(runner.started(), vec!["A".to_string()]);
    Ok(())
}

#[tokio::test]
async fn cancellation_releases_modules_waiting_for_a_slot() -> TestResult {
    let stack = StackBuilder::new().with("A", &[]).with("B", &[]).with("C", &[]).build();
    let cancel = CancellationToken::new();
    let runner = FakeRunner::new()
        .with_delay(Duration::from_millis(20))
        .cancel_on_first_start(cancel.clone());

    let report = run_with(&stack, &runner, 1, Command::Apply, &cancel).await?;

    // One slot: the first module to start holds it and still finishes; its
    // siblings were queued behind it in the same group.
    let started = runner.started();
    assert_eq!(started.len(), 1, "only one module may start: {started:?}");
    assert_eq!(report.succeeded(), vec![started[0].as_str()]);
    assert_eq!(report.cancelled().len(), 2);
    assert_eq!(report.outcomes.len(), 3);
    Ok(())
}

#[tokio::test]
async fn cancelled_before_start_runs_nothing() -> TestResult {
    let stack = diamond().build();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let runner = FakeRunner::new();

    let report = run_with(&stack, &runner, 2, Command::Plan, &cancel).await?;

    assert_eq!(report.cancelled().len(), 4);
    assert!(runner.started().is_empty());
    Ok(())
}

#[tokio::test]
async fn ignoring_order_runs_everything_regardless_of_failures() -> TestResult {
    let stack = StackBuilder::new()
        .with("A", &[])
        .with("B", &["A"])
        .with_module(ModuleBuilder::new("C").after("B").assume_applied().build())
        .build();
    let runner = FakeRunner::new().failing("A");

    let options = RunOptions::new(Command::Plan).with_parallelism(4);
    let template = InvocationTemplate::new(stack.root(), &options);
    let engine = ExecutionEngine::new(runner.shared(), 4);

    let report = with_timeout(engine.run_unordered(stack.modules(), &template, &CancellationToken::new())).await;

    assert_eq!(report.status_of("A"), Some(ModuleStatus::Failed));
    assert_eq!(report.status_of("B"), Some(ModuleStatus::Succeeded));
    assert_eq!(report.outcome("C"), None, "assume_applied modules never run");
    assert!(report.skipped().is_empty());
    Ok(())
}

#[tokio::test]
async fn every_module_gets_its_own_invocation() -> TestResult {
    let stack = StackBuilder::new().with("A", &[]).with("B", &[]).build();
    let runner = FakeRunner::new();

    let cancel = CancellationToken::new();
    let mut options = RunOptions::new(Command::Apply).with_parallelism(2);
    options.non_interactive = true;
    let template = InvocationTemplate::new(stack.root(), &options);
    let plan = stack.plan_in(Direction::Forward)?;
    let prereqs = prerequisites(stack.modules(), Direction::Forward)?;

    ExecutionEngine::new(runner.shared(), 2)
        .run_plan(&plan, &prereqs, &template, &cancel)
        .await;

    let mut invocations = runner.invocations();
    invocations.sort_by(|a, b| a.module_id.cmp(&b.module_id));

    assert_eq!(invocations.len(), 2);
    for (invocation, id) in invocations.iter().zip(["A", "B"]) {
        assert_eq!(invocation.module_id, id);
        assert_eq!(invocation.working_dir, stack.root().join(id));
        assert_eq!(invocation.program, "terraform");
        assert_eq!(invocation.args, vec!["apply", "-input=false", "-auto-approve"]);
        assert!(!invocation.mirror_stderr);
        assert!(!invocation.inherit_stdin);
    }
    Ok(())
}

#[test]
fn zero_parallelism_is_clamped_to_one() {
    let engine = ExecutionEngine::new(FakeRunner::new().shared(), 0);
    assert_eq!(engine.parallelism(), 1);
}
