// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `stackrun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "stackrun",
    version,
    about = "Run an infrastructure tool across a stack of dependent modules.",
    long_about = None
)]
pub struct CliArgs {
    /// Tool subcommand run in every module (plan, apply, destroy, output, ...).
    #[arg(value_name = "COMMAND", default_value = "plan")]
    pub command: String,

    /// Extra arguments passed to the tool after the command (after `--`).
    #[arg(last = true, value_name = "ARGS")]
    pub tool_args: Vec<String>,

    /// Root directory of the stack.
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub working_dir: PathBuf,

    /// Stack config file. Default: `Stackrun.toml` in the working dir, if any.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maximum number of modules running at once.
    #[arg(long, value_name = "N", value_parser = parse_parallelism)]
    pub parallelism: Option<usize>,

    /// Run every module at once, ignoring dependencies.
    #[arg(long)]
    pub ignore_dependency_order: bool,

    /// Detach stdin and only capture stderr, without mirroring it live.
    #[arg(long)]
    pub non_interactive: bool,

    /// Append `-auto-approve` to apply/destroy.
    #[arg(long, overrides_with = "no_auto_approve")]
    pub auto_approve: bool,

    /// Do not append `-auto-approve`.
    #[arg(long, overrides_with = "auto_approve")]
    pub no_auto_approve: bool,

    /// Per-module plan file location; `{module}` is replaced by the module id.
    #[arg(long, value_name = "PATH")]
    pub out_dir: Option<String>,

    /// Treat modules matching this glob as already applied (repeatable).
    #[arg(long = "exclude-dir", value_name = "GLOB")]
    pub exclude_dirs: Vec<String>,

    /// Tool binary to run (default from config, else `terraform`).
    #[arg(long, value_name = "PATH")]
    pub tool: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `STACKRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the groups modules would run in, without running anything.
    #[arg(long)]
    pub show_deploy_order: bool,

    /// With `--show-deploy-order`, print JSON instead of text.
    #[arg(long, requires = "show_deploy_order")]
    pub json: bool,

    /// Print the dependency graph in Graphviz DOT format and exit.
    #[arg(long, conflicts_with = "show_deploy_order")]
    pub graph: bool,
}

impl CliArgs {
    /// Explicit auto-approve choice, if one was made on the command line.
    pub fn auto_approve_override(&self) -> Option<bool> {
        if self.no_auto_approve {
            Some(false)
        } else if self.auto_approve {
            Some(true)
        } else {
            None
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

fn parse_parallelism(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("parallelism must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(format!("invalid parallelism '{s}': {e}")),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
