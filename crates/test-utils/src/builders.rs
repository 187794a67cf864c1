#![allow(dead_code)]

use std::path::PathBuf;

use stackrun::Stack;
use stackrun::dag::Module;

/// Builder for `Module` to simplify test setup.
///
/// The module path is a fake directory under `/stack`; nothing in the
/// scheduling code touches the filesystem.
pub struct ModuleBuilder {
    module: Module,
}

impl ModuleBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            module: Module::new(id, PathBuf::from("/stack").join(id)),
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.module.dependencies.insert(dep.to_string());
        self
    }

    pub fn assume_applied(mut self) -> Self {
        self.module.assume_applied = true;
        self
    }

    pub fn build(self) -> Module {
        self.module
    }
}

/// Shorthand: module `id` depending on `deps`.
pub fn module(id: &str, deps: &[&str]) -> Module {
    deps.iter()
        .fold(ModuleBuilder::new(id), |b, dep| b.after(dep))
        .build()
}

/// Builder for a validated `Stack`.
pub struct StackBuilder {
    modules: Vec<Module>,
}

impl StackBuilder {
    pub fn new() -> Self {
        Self { modules: Vec::new() }
    }

    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    /// Add a module `id` depending on `deps`.
    pub fn with(self, id: &str, deps: &[&str]) -> Self {
        self.with_module(module(id, deps))
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn build(self) -> Stack {
        Stack::new("/stack", self.modules).expect("Failed to build valid stack from builder")
    }
}

impl Default for StackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// `A` <- `B`, `A` <- `C`, `B`,`C` <- `D`.
pub fn diamond() -> StackBuilder {
    StackBuilder::new()
        .with("A", &[])
        .with("B", &["A"])
        .with("C", &["A"])
        .with("D", &["B", "C"])
}

/// A linear chain `m0000 <- m0001 <- ...` of `len` modules.
pub fn chain(len: usize) -> StackBuilder {
    (0..len).fold(StackBuilder::new(), |b, i| {
        let id = format!("m{i:04}");
        if i == 0 {
            b.with(&id, &[])
        } else {
            let prev = format!("m{:04}", i - 1);
            b.with(&id, &[prev.as_str()])
        }
    })
}
