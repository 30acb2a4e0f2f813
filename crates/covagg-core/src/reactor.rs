//! The reactor: every module built together in one session.
//!
//! Modules are indexed by [`ModuleKey`] so that dependency resolution is a
//! single map lookup. Registration order is kept separately for listings.

use std::collections::HashMap;

use crate::domain::{DependencyRecord, Module, ModuleKey};
use crate::error::{CoverageError, CoverageResult};

/// Read-only set of reactor modules keyed by group/artifact/version.
#[derive(Debug, Clone, Default)]
pub struct Reactor {
    modules: HashMap<ModuleKey, Module>,
    /// Registration order, for deterministic iteration.
    order: Vec<ModuleKey>,
}

impl Reactor {
    /// Build a reactor from `modules`.
    ///
    /// Returns [`CoverageError::DuplicateModule`] when two modules share a key.
    pub fn new(modules: impl IntoIterator<Item = Module>) -> CoverageResult<Self> {
        let mut reactor = Self::default();
        for module in modules {
            reactor.insert(module)?;
        }
        Ok(reactor)
    }

    fn insert(&mut self, module: Module) -> CoverageResult<()> {
        if self.modules.contains_key(&module.key) {
            return Err(CoverageError::DuplicateModule {
                key: module.key.to_string(),
            });
        }
        self.order.push(module.key.clone());
        self.modules.insert(module.key.clone(), module);
        Ok(())
    }

    /// Module with exactly this key, if it is part of the reactor.
    pub fn get(&self, key: &ModuleKey) -> Option<&Module> {
        self.modules.get(key)
    }

    /// Resolve a declared dependency to its reactor module.
    ///
    /// `None` means the dependency is built elsewhere (e.g. a published
    /// artifact); callers skip it.
    pub fn resolve(&self, dependency: &DependencyRecord) -> Option<&Module> {
        self.get(&dependency.key)
    }

    pub fn contains(&self, key: &ModuleKey) -> bool {
        self.modules.contains_key(key)
    }

    /// Modules in registration order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.order.iter().filter_map(|key| self.modules.get(key))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Injectable view of the project model consumed by the aggregator.
///
/// Implement this to plug in a build-tool host, a manifest file, or a test
/// stub.
pub trait ProjectModel {
    /// Key of the invoking project.
    fn project_key(&self) -> &ModuleKey;

    /// Dependencies declared by the invoking project, in declaration order.
    fn dependencies(&self) -> &[DependencyRecord];

    /// All modules of the current build session.
    fn reactor(&self) -> &Reactor;
}

/// [`ProjectModel`] for a root module that is itself part of the reactor.
#[derive(Debug, Clone)]
pub struct ReactorSession {
    root: ModuleKey,
    reactor: Reactor,
}

impl ReactorSession {
    /// Returns [`CoverageError::ProjectNotInReactor`] if `root` is absent.
    pub fn new(reactor: Reactor, root: ModuleKey) -> CoverageResult<Self> {
        if !reactor.contains(&root) {
            return Err(CoverageError::ProjectNotInReactor {
                key: root.to_string(),
            });
        }
        Ok(Self { root, reactor })
    }

    pub fn root(&self) -> &Module {
        // Presence is checked in `new` and the reactor is never mutated.
        &self.reactor.modules[&self.root]
    }
}

impl ProjectModel for ReactorSession {
    fn project_key(&self) -> &ModuleKey {
        &self.root
    }

    fn dependencies(&self) -> &[DependencyRecord] {
        &self.root().dependencies
    }

    fn reactor(&self) -> &Reactor {
        &self.reactor
    }
}
