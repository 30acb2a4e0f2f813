//! Report composition sinks and output formatting.
//!
//! - [`tree::ReportTree`] — in-memory [`ReportVisitor`](crate::aggregator::ReportVisitor)
//! - [`json::JsonReportFormatter`] — writes `index.json`
//! - [`generate_report`] — aggregation plus formatting in one call

pub mod json;
pub mod tree;

use std::path::{Path, PathBuf};

use crate::aggregator::{aggregate, AggregationSummary};
use crate::config::AggregateConfig;
use crate::error::CoverageResult;
use crate::exec_data::ExecutionDataStore;
use crate::reactor::ProjectModel;

pub use json::{JsonReportFormatter, ReportDocument};
pub use tree::{BundleReport, ReportGroupNode, ReportTree};

/// Configures and writes report output.
pub trait ReportFormatter {
    /// Prepare output renderers for `output_directory`.
    fn add_all_formatters(
        &mut self,
        output_directory: &Path,
        encoding: &str,
        footer: &str,
        locale: &str,
    ) -> CoverageResult<()>;

    /// Render the composed tree; returns the files written.
    fn write_report(
        &mut self,
        summary: &AggregationSummary,
        tree: &ReportTree,
        data: &ExecutionDataStore,
    ) -> CoverageResult<Vec<PathBuf>>;
}

/// Result of [`generate_report`].
#[derive(Debug, Clone)]
pub struct GeneratedReport {
    pub summary: AggregationSummary,
    pub tree: ReportTree,
    pub data: ExecutionDataStore,
    /// Files written by the formatter; empty when the run was skipped.
    pub written: Vec<PathBuf>,
}

/// Aggregate into a fresh data store and report tree, then format.
pub fn generate_report<P, F>(
    config: &AggregateConfig,
    project: &P,
    formatter: &mut F,
) -> CoverageResult<GeneratedReport>
where
    P: ProjectModel + ?Sized,
    F: ReportFormatter + ?Sized,
{
    let mut data = ExecutionDataStore::new();
    let mut tree = ReportTree::new();
    let summary = aggregate(config, project, &mut data, &mut tree)?;
    if summary.skipped {
        return Ok(GeneratedReport {
            summary,
            tree,
            data,
            written: Vec::new(),
        });
    }

    formatter.add_all_formatters(
        &config.output_directory,
        &config.output_encoding,
        &config.footer,
        &config.locale,
    )?;
    let written = formatter.write_report(&summary, &tree, &data)?;
    Ok(GeneratedReport {
        summary,
        tree,
        data,
        written,
    })
}
