//! Structured observability hooks for aggregation runs.
//!
//! This module provides:
//! - A run-scoped tracing span via the [`AggregationSpan`] RAII guard
//! - Emission functions for lifecycle events: start, data load, unresolved
//!   dependency, sub-report creation, finish, skip and failure
//!
//! Lifecycle events are emitted at `info!`, per-file events at `debug!`.
//! Use `RUST_LOG` to tune and `--json` on the CLI for JSON lines.

use std::path::Path;

use tracing::{debug, info};

use crate::domain::ModuleKey;

/// RAII guard that enters a span tagged with the aggregating project.
///
/// # Example
///
/// ```ignore
/// let _span = AggregationSpan::enter(&project_key);
/// // every event until the guard drops carries project = "g:a:v"
/// ```
pub struct AggregationSpan {
    _span: tracing::span::EnteredSpan,
}

impl AggregationSpan {
    pub fn enter(project: &ModuleKey) -> Self {
        let span = tracing::info_span!("covagg.aggregate", project = %project);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: aggregation started with the size of both module sets.
pub fn emit_aggregate_started(project: &ModuleKey, data_modules: usize, report_modules: usize) {
    info!(
        event = "aggregate.started",
        project = %project,
        data_modules = data_modules,
        report_modules = report_modules,
    );
}

/// Emit event: an in-scope dependency is not part of the reactor.
pub fn emit_dependency_unresolved(project: &ModuleKey, dependency: &ModuleKey) {
    debug!(event = "dependency.unresolved", project = %project, dependency = %dependency);
}

/// Emit event: a module's base directory was scanned for data files.
pub fn emit_module_scanned(module: &ModuleKey, base_dir: &Path, files: usize) {
    debug!(
        event = "data.scanned",
        module = %module,
        base_dir = %base_dir.display(),
        files = files,
    );
}

/// Emit event: one data file was merged into the session.
pub fn emit_data_loaded(module: &ModuleKey, path: &Path) {
    debug!(event = "data.loaded", module = %module, path = %path.display());
}

/// Emit event: a module sub-report was appended to the group.
pub fn emit_bundle_created(group: &str, module: &ModuleKey) {
    info!(event = "bundle.created", group = %group, module = %module);
}

/// Emit event: aggregation finished.
pub fn emit_aggregate_finished(
    project: &ModuleKey,
    duration_ms: u64,
    data_files: usize,
    bundles: usize,
) {
    info!(
        event = "aggregate.finished",
        project = %project,
        duration_ms = duration_ms,
        data_files = data_files,
        bundles = bundles,
    );
}

/// Emit event: the run was skipped by configuration.
pub fn emit_aggregate_skipped(project: &ModuleKey) {
    info!(event = "aggregate.skipped", project = %project);
}

/// Emit event: the run failed (warning level).
pub fn emit_aggregate_failed(project: &ModuleKey, error: &dyn std::fmt::Display) {
    tracing::warn!(event = "aggregate.failed", project = %project, error = %error);
}
