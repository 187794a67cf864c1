// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Direction in which declared dependency edges are followed.
///
/// - `Forward`: a module runs after the modules it depends on (apply, plan).
/// - `Reverse`: a module runs after the modules that depend on it (destroy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// Whether the engine honours the dependency graph at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderingMode {
    /// Walk the run plan group by group and skip dependents of failures.
    #[default]
    RespectDependencies,
    /// Run every module at once (still bounded by parallelism), no skipping.
    IgnoreDependencies,
}

/// The tool subcommand to run in every module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Plan,
    Apply,
    Destroy,
    /// Any other subcommand (`output`, `validate`, `init`, ...), passed through as-is.
    Other(String),
}

impl Command {
    pub fn as_str(&self) -> &str {
        match self {
            Command::Plan => "plan",
            Command::Apply => "apply",
            Command::Destroy => "destroy",
            Command::Other(name) => name,
        }
    }

    /// Commands that change infrastructure and would normally prompt.
    pub fn is_mutating(&self) -> bool {
        matches!(self, Command::Apply | Command::Destroy)
    }

    /// Commands that may prompt for variables or confirmation on stdin.
    pub fn needs_input(&self) -> bool {
        match self {
            Command::Plan | Command::Apply | Command::Destroy => true,
            Command::Other(name) => matches!(name.as_str(), "refresh" | "import" | "init"),
        }
    }

    /// Direction for this command, taking a `-destroy` flag in the extra
    /// arguments into account (`plan -destroy`, `apply -destroy`).
    pub fn direction(&self, extra_args: &[String]) -> Direction {
        if *self == Command::Destroy || extra_args.iter().any(|a| a == "-destroy") {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err("command must not be empty".to_string()),
            "plan" => Ok(Command::Plan),
            "apply" => Ok(Command::Apply),
            "destroy" => Ok(Command::Destroy),
            other => Ok(Command::Other(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
