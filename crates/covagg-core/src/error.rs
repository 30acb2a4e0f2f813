//! Error types for coverage aggregation.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the aggregation pipeline and its shipped collaborators.
///
/// An unresolved reactor dependency is not represented: it is skipped.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// A data-file or class-file glob could not be compiled.
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    /// The configured output directory cannot be used.
    #[error("output directory {path:?} is unusable: {reason}")]
    OutputDirectory { path: PathBuf, reason: String },

    /// Two reactor modules share the same group/artifact/version key.
    #[error("duplicate module in reactor: {key}")]
    DuplicateModule { key: String },

    /// The invoking project is not part of the reactor.
    #[error("project not found in reactor: {key}")]
    ProjectNotInReactor { key: String },

    /// Any other configuration problem detected before the run starts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A matched coverage data file could not be read.
    #[error("failed to load coverage data from {path:?}: {source}")]
    DataLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A matched coverage data file is not in the expected format.
    #[error("invalid coverage data in {path:?}: {detail}")]
    DataFormat { path: PathBuf, detail: String },

    /// The report visitor failed while composing the sub-report of a module.
    #[error("report composition failed for module {module}: {detail}")]
    ReportComposition { module: String, detail: String },

    /// Directory traversal failed below an existing base directory.
    #[error("failed to scan {path:?}: {detail}")]
    Scan { path: PathBuf, detail: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoverageError {
    /// `true` for errors raised by configuration validation, i.e. before any
    /// aggregation phase touched a collaborator.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidPattern { .. }
                | Self::OutputDirectory { .. }
                | Self::DuplicateModule { .. }
                | Self::ProjectNotInReactor { .. }
                | Self::Configuration(_)
                | Self::ConfigParse(_)
        )
    }
}

/// Convenience result alias.
pub type CoverageResult<T> = std::result::Result<T, CoverageError>;
