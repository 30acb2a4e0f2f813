//! Dependency scope classification against the reactor.
//!
//! [`ScopeClassifier::find_dependencies`] selects the reactor modules a
//! project depends on with one of the requested scopes. The result keeps the
//! declaration order of the dependency list and is not deduplicated.

use crate::domain::{DependencyRecord, DependencyScope, Module};
use crate::reactor::{ProjectModel, Reactor};

/// Scopes whose modules contribute classes, sources and coverage data.
pub const REPORT_SCOPES: &[DependencyScope] = &[DependencyScope::ContributesSource];

/// Scopes whose modules contribute coverage data. Always a superset of
/// [`REPORT_SCOPES`].
pub const DATA_SCOPES: &[DependencyScope] = &[
    DependencyScope::ContributesSource,
    DependencyScope::DataOnly,
];

/// Pure lookup of a project's dependencies in the reactor.
#[derive(Debug, Clone, Copy)]
pub struct ScopeClassifier<'a> {
    dependencies: &'a [DependencyRecord],
    reactor: &'a Reactor,
}

impl<'a> ScopeClassifier<'a> {
    pub fn new(dependencies: &'a [DependencyRecord], reactor: &'a Reactor) -> Self {
        Self {
            dependencies,
            reactor,
        }
    }

    /// Classifier over the dependencies of `project`.
    pub fn for_project<P: ProjectModel + ?Sized>(project: &'a P) -> Self {
        Self::new(project.dependencies(), project.reactor())
    }

    /// Reactor modules declared with any of `scopes`, in declaration order.
    ///
    /// Dependencies that are not part of the reactor are skipped.
    pub fn find_dependencies(&self, scopes: &[DependencyScope]) -> Vec<&'a Module> {
        self.find_dependencies_with(scopes, |_| {})
    }

    /// Like [`find_dependencies`](Self::find_dependencies), but reports every
    /// in-scope dependency that has no reactor module to `on_unresolved`.
    pub fn find_dependencies_with<F>(
        &self,
        scopes: &[DependencyScope],
        mut on_unresolved: F,
    ) -> Vec<&'a Module>
    where
        F: FnMut(&DependencyRecord),
    {
        let reactor = self.reactor;
        self.dependencies
            .iter()
            .filter(|dependency| scopes.contains(&dependency.scope))
            .filter_map(|dependency| {
                let resolved = reactor.resolve(dependency);
                if resolved.is_none() {
                    on_unresolved(dependency);
                }
                resolved
            })
            .collect()
    }

    /// In-scope dependencies that are not part of the reactor.
    pub fn unresolved(&self, scopes: &[DependencyScope]) -> Vec<&'a DependencyRecord> {
        self.dependencies
            .iter()
            .filter(|dependency| scopes.contains(&dependency.scope))
            .filter(|dependency| !self.reactor.contains(&dependency.key))
            .collect()
    }
}
