// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod report;
pub mod stack;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{RunOptions, StackConfig, load_stack_config};
use crate::engine::Diagnostics;
use crate::exec::ProcessRunner;
use crate::report::{DotRenderer, deploy_order_groups, format_deploy_order, format_summary};
use crate::types::{Command, OrderingMode};

pub use crate::stack::Stack;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - stack config loading and module discovery
/// - introspection (`--graph`, `--show-deploy-order`)
/// - the execution engine with the process runner
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_stack_config(&args.working_dir, args.config.as_deref())?;
    if !args.exclude_dirs.is_empty() {
        cfg = cfg.with_extra_excludes(&args.exclude_dirs)?;
    }

    let stack = Stack::discover(&args.working_dir, &cfg)?;
    let options = run_options(&args, &cfg)?;

    if args.graph {
        print!("{}", stack.render_graph(&DotRenderer));
        return Ok(());
    }

    if args.show_deploy_order {
        let plan = stack.plan_in(options.direction())?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&deploy_order_groups(&plan))?);
        } else {
            print!("{}", format_deploy_order(&plan));
        }
        return Ok(());
    }

    // Ctrl-C → stop starting new modules; running ones finish.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("interrupt received; waiting for running modules, starting no new ones");
            cancel.cancel();
        });
    }

    let result = stack
        .run(&options, Arc::new(ProcessRunner::new()), &Diagnostics::default(), cancel)
        .await;

    match result {
        Ok(report) => {
            eprint!("{}", format_summary(&report));
            info!("stack run complete");
            Ok(())
        }
        Err(err) => {
            if let Some(report) = err.report() {
                eprint!("{}", format_summary(report));
            }
            Err(err.into())
        }
    }
}

/// Layer CLI overrides on top of the stack configuration.
fn run_options(args: &CliArgs, cfg: &StackConfig) -> Result<RunOptions> {
    let command: Command = args.command.parse().map_err(anyhow::Error::msg)?;

    let mut options = RunOptions::from_config(command, cfg).with_extra_args(args.tool_args.clone());

    if let Some(parallelism) = args.parallelism {
        options = options.with_parallelism(parallelism);
    }
    if args.ignore_dependency_order {
        options = options.with_ordering(OrderingMode::IgnoreDependencies);
    }
    if args.non_interactive {
        options.non_interactive = true;
    }
    if let Some(auto_approve) = args.auto_approve_override() {
        options.auto_approve = auto_approve;
    }
    if let Some(out_dir) = &args.out_dir {
        options.output_location = Some(out_dir.clone());
    }
    if let Some(tool) = &args.tool {
        options.tool = tool.clone();
    }

    debug!(?options, "resolved run options");
    Ok(options)
}
