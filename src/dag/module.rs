// src/dag/module.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// One infrastructure module discovered on disk.
///
/// Immutable once discovery has finished; scheduling only ever reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Stable identity: the module directory relative to the stack root,
    /// `/`-separated, or `.` for the root itself.
    pub id: String,
    /// Directory the tool is run in.
    pub path: PathBuf,
    /// Ids of the modules this one depends on, as declared in `module.toml`.
    pub dependencies: BTreeSet<String>,
    /// Already satisfied externally: never executed, but still unblocks
    /// dependents.
    pub assume_applied: bool,
}

impl Module {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            dependencies: BTreeSet::new(),
            assume_applied: false,
        }
    }

    pub fn depends_on(&self, id: &str) -> bool {
        self.dependencies.contains(id)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deps: Vec<&str> = self.dependencies.iter().map(String::as_str).collect();
        write!(
            f,
            "Module {} (assume applied: {}, dependencies: [{}])",
            self.id,
            self.assume_applied,
            deps.join(", ")
        )
    }
}
