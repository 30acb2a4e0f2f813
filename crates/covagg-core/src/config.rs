//! Aggregation configuration.
//!
//! Every field has a default so a config file only needs the keys it
//! overrides. [`AggregateConfig::validate`] runs before any aggregation
//! phase and surfaces configuration errors up front.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoverageError, CoverageResult};
use crate::matcher::GlobMatcher;

/// Directory name appended to the reporting root.
pub const OUTPUT_DIR_SUFFIX: &str = "coverage-aggregate";

/// Human-readable report name.
pub const REPORT_NAME: &str = "Coverage Aggregate";

/// Default coverage data file pattern, relative to each module base directory.
pub const DEFAULT_DATA_FILE_INCLUDE: &str = "target/*.exec";

fn default_data_file_includes() -> Vec<String> {
    vec![DEFAULT_DATA_FILE_INCLUDE.to_string()]
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("target/site").join(OUTPUT_DIR_SUFFIX)
}

fn default_encoding() -> String {
    "UTF-8".to_string()
}

fn default_locale() -> String {
    "en".to_string()
}

/// Options consumed by the aggregation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateConfig {
    /// Coverage data files to load from each module (globs).
    pub data_file_includes: Vec<String>,
    /// Coverage data files to leave out (globs).
    pub data_file_excludes: Vec<String>,
    /// Where formatted output goes. Passed through to the formatter.
    pub output_directory: PathBuf,
    /// Report group title; `None` falls back to the project's artifact id.
    pub title: Option<String>,
    pub source_encoding: String,
    pub output_encoding: String,
    pub footer: String,
    pub locale: String,
    /// Class files to include in each module's sub-report (globs).
    pub includes: Vec<String>,
    /// Class files to exclude from each module's sub-report (globs).
    pub excludes: Vec<String>,
    /// Skip the whole run.
    pub skip: bool,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            data_file_includes: default_data_file_includes(),
            data_file_excludes: Vec::new(),
            output_directory: default_output_directory(),
            title: None,
            source_encoding: default_encoding(),
            output_encoding: default_encoding(),
            footer: String::new(),
            locale: default_locale(),
            includes: Vec::new(),
            excludes: Vec::new(),
            skip: false,
        }
    }
}

impl AggregateConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> CoverageResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_toml_file(path: &Path) -> CoverageResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Point output at `reporting_root/coverage-aggregate`, unless
    /// `reporting_root` already ends with that directory.
    pub fn with_report_output_directory(mut self, reporting_root: impl Into<PathBuf>) -> Self {
        let reporting_root = reporting_root.into();
        self.output_directory = if reporting_root.ends_with(OUTPUT_DIR_SUFFIX) {
            reporting_root
        } else {
            reporting_root.join(OUTPUT_DIR_SUFFIX)
        };
        self
    }

    /// Group title, defaulting to `fallback` (the project's artifact id).
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.title.as_deref().unwrap_or(fallback)
    }

    /// Fail fast on malformed globs or an unusable output directory.
    pub fn validate(&self) -> CoverageResult<()> {
        GlobMatcher::new(&self.data_file_includes[..], &self.data_file_excludes[..])?;
        GlobMatcher::new(&self.includes[..], &self.excludes[..])?;

        if self.output_directory.as_os_str().is_empty() {
            return Err(CoverageError::OutputDirectory {
                path: self.output_directory.clone(),
                reason: "path is empty".to_string(),
            });
        }
        // The nearest existing ancestor must be a directory for the output
        // directory to be creatable.
        let nearest = self
            .output_directory
            .ancestors()
            .filter(|p| !p.as_os_str().is_empty())
            .find(|p| p.exists());
        if let Some(existing) = nearest {
            if !existing.is_dir() {
                return Err(CoverageError::OutputDirectory {
                    path: self.output_directory.clone(),
                    reason: format!("{} exists and is not a directory", existing.display()),
                });
            }
        }
        if self.source_encoding.trim().is_empty() || self.output_encoding.trim().is_empty() {
            return Err(CoverageError::Configuration(
                "encodings must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
