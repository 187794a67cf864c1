// src/config/options.rs

use crate::config::model::StackConfig;
use crate::types::{Command, Direction, OrderingMode};

/// Execution parameters for one run of a stack.
///
/// Built from the stack configuration with CLI overrides layered on top. The
/// engine never mutates these; each module gets its own derived invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub command: Command,
    /// Extra arguments passed through to the tool after the command.
    pub extra_args: Vec<String>,
    /// Maximum number of modules running at once (>= 1).
    pub parallelism: usize,
    pub ordering: OrderingMode,
    pub non_interactive: bool,
    pub auto_approve: bool,
    pub output_location: Option<String>,
    /// Tool binary to run.
    pub tool: String,
}

impl RunOptions {
    /// Options with defaults taken from an empty stack configuration.
    pub fn new(command: Command) -> Self {
        Self::from_config(command, &StackConfig::default())
    }

    pub fn from_config(command: Command, cfg: &StackConfig) -> Self {
        Self {
            command,
            extra_args: Vec::new(),
            parallelism: cfg.parallelism().max(1),
            ordering: OrderingMode::default(),
            non_interactive: cfg.config.non_interactive,
            auto_approve: cfg.config.auto_approve,
            output_location: cfg.config.output_location.clone(),
            tool: cfg.config.tool.clone(),
        }
    }

    pub fn direction(&self) -> Direction {
        self.command.direction(&self.extra_args)
    }

    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn with_ordering(mut self, ordering: OrderingMode) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }
}
