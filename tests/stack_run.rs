// tests/stack_run.rs

mod common;
use crate::common::builders::{ModuleBuilder, StackBuilder};
use crate::common::fake_runner::FakeRunner;
use crate::common::{init_tracing, with_timeout};

use std::error::Error;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use stackrun::Stack;
use stackrun::config::RunOptions;
use stackrun::engine::{Diagnostics, ModuleStatus};
use stackrun::errors::StackError;
use stackrun::types::{Command, OrderingMode};

type TestResult = Result<(), Box<dyn Error>>;

const REMOTE_STATE_STDERR: &str = "\
Error: Unable to find remote state

  with data.terraform_remote_state.vpc,
  on main.tf line 12, in data \"terraform_remote_state\" \"vpc\":
";

#[tokio::test]
async fn successful_run_returns_the_outcome_table() -> TestResult {
    init_tracing();

    let stack = StackBuilder::new().with("vpc", &[]).with("app", &["vpc"]).build();
    let runner = FakeRunner::new();
    let options = RunOptions::new(Command::Apply).with_parallelism(2);

    let report = with_timeout(stack.run(
        &options,
        runner.shared(),
        &Diagnostics::default(),
        CancellationToken::new(),
    ))
    .await?;

    assert_eq!(report.succeeded(), vec!["vpc", "app"]);
    assert!(report.hints.is_empty());
    assert_eq!(runner.started(), vec!["vpc".to_string(), "app".to_string()]);
    Ok(())
}

#[tokio::test]
async fn failures_are_reported_with_the_full_outcome_table() -> TestResult {
    let stack = StackBuilder::new()
        .with("vpc", &[])
        .with("app", &["vpc"])
        .with("dns", &[])
        .build();
    let runner = FakeRunner::new().failing("vpc");
    let options = RunOptions::new(Command::Apply).with_parallelism(2);

    let err = with_timeout(stack.run(
        &options,
        runner.shared(),
        &Diagnostics::default(),
        CancellationToken::new(),
    ))
    .await
    .unwrap_err();

    let StackError::ExecutionFailed(report) = &err else {
        panic!("Expected ExecutionFailed, got: {err:?}");
    };
    assert_eq!(report.status_of("vpc"), Some(ModuleStatus::Failed));
    assert_eq!(report.status_of("app"), Some(ModuleStatus::Skipped));
    assert_eq!(report.status_of("dns"), Some(ModuleStatus::Succeeded));
    assert!(err.to_string().contains("vpc"));
    assert!(err.report().is_some());
    Ok(())
}

#[tokio::test]
async fn remote_state_failure_on_plan_gets_a_hint() -> TestResult {
    let stack = StackBuilder::new().with("vpc", &[]).with("app", &["vpc"]).build();
    let runner = FakeRunner::new()
        .failing("app")
        .with_stderr("app", REMOTE_STATE_STDERR);
    let options = RunOptions::new(Command::Plan).with_parallelism(2);

    let err = with_timeout(stack.run(
        &options,
        runner.shared(),
        &Diagnostics::default(),
        CancellationToken::new(),
    ))
    .await
    .unwrap_err();

    let report = err.report().ok_or("expected an outcome table")?;
    assert_eq!(report.hints.len(), 1);
    assert_eq!(report.hints[0].module, "app");
    assert_eq!(report.hints[0].rule, "remote-state");
    assert!(report.hints[0].message.contains("apply the dependencies first"));
    assert!(report.hints[0].message.contains("[vpc]"), "{}", report.hints[0].message);
    Ok(())
}

#[tokio::test]
async fn remote_state_hint_names_every_dependency() -> TestResult {
    let stack = StackBuilder::new()
        .with("vpc", &[])
        .with("dns", &[])
        .with("app", &["vpc", "dns"])
        .build();
    let runner = FakeRunner::new()
        .failing("app")
        .with_stderr("app", REMOTE_STATE_STDERR);
    let options = RunOptions::new(Command::Plan).with_parallelism(2);

    let err = with_timeout(stack.run(
        &options,
        runner.shared(),
        &Diagnostics::default(),
        CancellationToken::new(),
    ))
    .await
    .unwrap_err();

    let report = err.report().ok_or("expected an outcome table")?;
    assert_eq!(report.hints.len(), 1);
    assert!(report.hints[0].message.contains("'app' depends on [dns, vpc]"), "{}", report.hints[0].message);
    Ok(())
}

#[tokio::test]
async fn remote_state_rule_ignores_apply() -> TestResult {
    let stack = StackBuilder::new().with("app", &[]).build();
    let runner = FakeRunner::new()
        .failing("app")
        .with_stderr("app", REMOTE_STATE_STDERR);
    let options = RunOptions::new(Command::Apply);

    let err = with_timeout(stack.run(
        &options,
        runner.shared(),
        &Diagnostics::default(),
        CancellationToken::new(),
    ))
    .await
    .unwrap_err();

    assert!(err.report().ok_or("expected an outcome table")?.hints.is_empty());
    Ok(())
}

#[tokio::test]
async fn empty_diagnostics_produce_no_hints() -> TestResult {
    let stack = StackBuilder::new().with("app", &[]).build();
    let runner = FakeRunner::new()
        .failing("app")
        .with_stderr("app", REMOTE_STATE_STDERR);
    let options = RunOptions::new(Command::Plan);

    let err = with_timeout(stack.run(
        &options,
        runner.shared(),
        &Diagnostics::empty(),
        CancellationToken::new(),
    ))
    .await
    .unwrap_err();

    assert!(err.report().ok_or("expected an outcome table")?.hints.is_empty());
    Ok(())
}

#[tokio::test]
async fn cancelled_run_without_failures_is_an_error() -> TestResult {
    let stack = StackBuilder::new().with("vpc", &[]).with("app", &["vpc"]).build();
    let cancel = CancellationToken::new();
    let runner = FakeRunner::new().cancel_when_started("vpc", cancel.clone());
    let options = RunOptions::new(Command::Apply);

    let err = with_timeout(stack.run(&options, runner.shared(), &Diagnostics::default(), cancel))
        .await
        .unwrap_err();

    let StackError::Cancelled(report) = &err else {
        panic!("Expected Cancelled, got: {err:?}");
    };
    assert_eq!(report.succeeded(), vec!["vpc"]);
    assert_eq!(report.cancelled(), vec!["app"]);
    Ok(())
}

#[tokio::test]
async fn ignore_dependency_order_runs_dependents_of_failed_modules() -> TestResult {
    let stack = StackBuilder::new().with("vpc", &[]).with("app", &["vpc"]).build();
    let runner = FakeRunner::new().failing("vpc");
    let options = RunOptions::new(Command::Plan)
        .with_parallelism(2)
        .with_ordering(OrderingMode::IgnoreDependencies);

    let err = with_timeout(stack.run(
        &options,
        runner.shared(),
        &Diagnostics::default(),
        CancellationToken::new(),
    ))
    .await
    .unwrap_err();

    let report = err.report().ok_or("expected an outcome table")?;
    assert_eq!(report.status_of("app"), Some(ModuleStatus::Succeeded));
    assert_eq!(report.failed(), vec!["vpc"]);
    Ok(())
}

#[tokio::test]
async fn destroy_extra_arg_runs_in_reverse() -> TestResult {
    let stack = StackBuilder::new().with("vpc", &[]).with("app", &["vpc"]).build();
    let runner = FakeRunner::new();
    let options = RunOptions::new(Command::Plan)
        .with_parallelism(1)
        .with_extra_args(vec!["-destroy".to_string()]);

    with_timeout(stack.run(
        &options,
        runner.shared(),
        &Diagnostics::default(),
        CancellationToken::new(),
    ))
    .await?;

    assert_eq!(runner.started(), vec!["app".to_string(), "vpc".to_string()]);
    assert_eq!(runner.invocations()[0].args, vec!["plan", "-input=false", "-destroy"]);
    Ok(())
}

#[test]
fn stack_display_lists_modules_sorted_by_id() {
    let stack = StackBuilder::new()
        .with("vpc", &[])
        .with_module(ModuleBuilder::new("dns").assume_applied().build())
        .with("app", &["vpc", "dns"])
        .build();

    assert_eq!(
        stack.to_string(),
        "Stack at /stack:\n\
         \x20 => Module app (assume applied: false, dependencies: [dns, vpc])\n\
         \x20 => Module dns (assume applied: true, dependencies: [])\n\
         \x20 => Module vpc (assume applied: false, dependencies: [])"
    );
}

#[test]
fn empty_stack_is_rejected() {
    match Stack::new("/stack", Vec::new()) {
        Err(StackError::NoModulesFound(root)) => assert_eq!(root, PathBuf::from("/stack")),
        other => panic!("Expected NoModulesFound, got: {:?}", other.map(|_| ())),
    }
}

#[test]
fn unresolved_dependency_is_rejected_before_execution() {
    let err = Stack::new("/stack", vec![common::builders::module("app", &["vpc"])]).unwrap_err();
    assert!(matches!(err, StackError::UnresolvedDependency { .. }));
    assert!(err.to_string().contains("'vpc'"));
}
