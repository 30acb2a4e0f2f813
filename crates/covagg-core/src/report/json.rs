//! JSON rendering of an aggregated report.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::AggregationSummary;
use crate::config::REPORT_NAME;
use crate::domain::ModuleKey;
use crate::error::{CoverageError, CoverageResult};
use crate::exec_data::{ExecutionDataStore, LoadedDataFile};
use crate::report::tree::{ReportGroupNode, ReportTree};
use crate::report::ReportFormatter;

/// File name of the JSON report inside the output directory.
pub const INDEX_FILE: &str = "index.json";

pub const SCHEMA_VERSION: &str = "1.0";

/// Persisted report document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportDocument {
    pub schema_version: String,
    pub name: String,
    pub generated_at: DateTime<Utc>,
    pub project: ModuleKey,
    pub groups: Vec<ReportGroupNode>,
    pub data_files: Vec<LoadedDataFile>,
    pub session_digest: String,
    pub unresolved: Vec<ModuleKey>,
    pub footer: String,
    pub locale: String,
}

#[derive(Debug, Clone)]
struct FormatterSettings {
    output_directory: PathBuf,
    footer: String,
    locale: String,
}

/// [`ReportFormatter`] writing `index.json`.
#[derive(Debug, Clone, Default)]
pub struct JsonReportFormatter {
    settings: Option<FormatterSettings>,
}

impl JsonReportFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReportFormatter for JsonReportFormatter {
    fn add_all_formatters(
        &mut self,
        output_directory: &Path,
        encoding: &str,
        footer: &str,
        locale: &str,
    ) -> CoverageResult<()> {
        fs::create_dir_all(output_directory).map_err(|e| CoverageError::OutputDirectory {
            path: output_directory.to_path_buf(),
            reason: e.to_string(),
        })?;
        if !encoding.eq_ignore_ascii_case("utf-8") && !encoding.eq_ignore_ascii_case("utf8") {
            tracing::warn!(encoding = %encoding, "JSON output is always UTF-8");
        }
        self.settings = Some(FormatterSettings {
            output_directory: output_directory.to_path_buf(),
            footer: footer.to_string(),
            locale: locale.to_string(),
        });
        Ok(())
    }

    fn write_report(
        &mut self,
        summary: &AggregationSummary,
        tree: &ReportTree,
        data: &ExecutionDataStore,
    ) -> CoverageResult<Vec<PathBuf>> {
        let settings = self.settings.as_ref().ok_or_else(|| {
            CoverageError::Configuration("formatters not configured before writing".to_string())
        })?;
        let document = ReportDocument {
            schema_version: SCHEMA_VERSION.to_string(),
            name: REPORT_NAME.to_string(),
            generated_at: Utc::now(),
            project: summary.project.clone(),
            groups: tree.groups.clone(),
            data_files: data.files().to_vec(),
            session_digest: data.session_digest(),
            unresolved: summary.unresolved.clone(),
            footer: settings.footer.clone(),
            locale: settings.locale.clone(),
        };
        let path = settings.output_directory.join(INDEX_FILE);
        let content = serde_json::to_string_pretty(&document)?;
        fs::write(&path, content)?;
        tracing::info!(path = %path.display(), "report written");
        Ok(vec![path])
    }
}

/// Read back a written report document.
pub fn read_report(path: &Path) -> CoverageResult<ReportDocument> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn summary() -> AggregationSummary {
        AggregationSummary {
            project: ModuleKey::new("g", "root", "1"),
            title: "root".to_string(),
            data_modules: Vec::new(),
            data_files: Vec::new(),
            report_modules: Vec::new(),
            unresolved: vec![ModuleKey::new("ext", "lib", "2")],
            skipped: false,
        }
    }

    #[test]
    fn test_write_before_configure_fails() {
        let mut formatter = JsonReportFormatter::new();
        let err = formatter
            .write_report(&summary(), &ReportTree::new(), &ExecutionDataStore::new())
            .unwrap_err();
        assert!(matches!(err, CoverageError::Configuration(_)));
    }

    #[test]
    fn test_index_json_has_expected_keys() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("site/coverage-aggregate");
        let mut formatter = JsonReportFormatter::new();
        formatter
            .add_all_formatters(&out, "UTF-8", "built by ci", "en")
            .unwrap();

        let mut tree = ReportTree::new();
        tree.groups.push(ReportGroupNode::new("root"));
        let written = formatter
            .write_report(&summary(), &tree, &ExecutionDataStore::new())
            .unwrap();
        assert_eq!(written, vec![out.join(INDEX_FILE)]);

        let raw: Value =
            serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
        let obj = raw.as_object().expect("top-level object");
        for key in &[
            "schema_version",
            "name",
            "generated_at",
            "project",
            "groups",
            "data_files",
            "session_digest",
            "unresolved",
            "footer",
            "locale",
        ] {
            assert!(obj.contains_key(*key), "missing key: {}", key);
        }
        assert_eq!(raw["footer"], "built by ci");
        assert_eq!(raw["groups"][0]["title"], "root");
        assert_eq!(raw["unresolved"][0]["artifact_id"], "lib");

        let document = read_report(&written[0]).unwrap();
        assert_eq!(document.groups, tree.groups);
    }

    #[test]
    fn test_output_directory_blocked_by_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("site");
        fs::write(&blocker, b"x").unwrap();
        let mut formatter = JsonReportFormatter::new();
        let err = formatter
            .add_all_formatters(&blocker.join("coverage-aggregate"), "UTF-8", "", "en")
            .unwrap_err();
        assert!(matches!(err, CoverageError::OutputDirectory { .. }));
    }
}
