//! covagg core library
//!
//! Aggregates coverage data from the modules of a multi-module build into one
//! report:
//! - [`reactor::Reactor`] / [`reactor::ProjectModel`] — module lookup by key
//! - [`scope::ScopeClassifier`] — selects dependencies by scope
//! - [`matcher::FileFilter`] — include/exclude globbing of data files
//! - [`aggregator::aggregate`] — the two-phase data/report pipeline
//! - [`report::generate_report`] — pipeline plus JSON output

pub mod aggregator;
pub mod config;
pub mod domain;
pub mod error;
pub mod exec_data;
pub mod manifest;
pub mod matcher;
pub mod obs;
pub mod reactor;
pub mod report;
pub mod scope;
pub mod telemetry;

pub use aggregator::{
    aggregate, AggregationSummary, Aggregator, ExecutionDataLoader, ProjectRequest, ReportVisitor,
};
pub use config::{AggregateConfig, OUTPUT_DIR_SUFFIX, REPORT_NAME};
pub use domain::{DependencyRecord, DependencyScope, Module, ModuleKey};
pub use error::{CoverageError, CoverageResult};
pub use exec_data::{ExecutionDataStore, LoadedDataFile};
pub use manifest::ReactorManifest;
pub use matcher::{FileFilter, GlobMatcher, PathMatcher};
pub use reactor::{ProjectModel, Reactor, ReactorSession};
pub use report::{
    generate_report, GeneratedReport, JsonReportFormatter, ReportFormatter, ReportGroupNode,
    ReportTree,
};
pub use scope::{ScopeClassifier, DATA_SCOPES, REPORT_SCOPES};
pub use telemetry::init_tracing;

/// covagg version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
