//! Reactor modules and their declared dependencies.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoverageError;

/// Identity of a module inside the reactor: `(group id, artifact id, version)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleKey {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ModuleKey {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

impl FromStr for ModuleKey {
    type Err = CoverageError;

    /// Parses the `group:artifact:version` coordinate form.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [g, a, v] if !g.is_empty() && !a.is_empty() && !v.is_empty() => {
                Ok(Self::new(*g, *a, *v))
            }
            _ => Err(CoverageError::Configuration(format!(
                "expected group:artifact:version, got '{s}'"
            ))),
        }
    }
}

/// Why one module depends on another.
///
/// Only [`DependencyScope::ContributesSource`] modules appear in the report;
/// [`DependencyScope::DataOnly`] modules only contribute coverage data
/// (typically integration-test modules).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum DependencyScope {
    /// Classes, sources and coverage data are aggregated (`compile`).
    #[default]
    ContributesSource,
    /// Only coverage data is aggregated (`test`).
    DataOnly,
    /// Ignored by aggregation (`provided`, `runtime`, `system`, ...).
    Other,
}

impl DependencyScope {
    /// Map a build-tool scope string onto the closed scope set.
    ///
    /// An empty string is the build tool's implicit default and maps to
    /// `ContributesSource`.
    pub fn from_scope_str(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "compile" | "contributes_source" => Self::ContributesSource,
            "test" | "data_only" => Self::DataOnly,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContributesSource => "contributes_source",
            Self::DataOnly => "data_only",
            Self::Other => "other",
        }
    }
}

impl From<String> for DependencyScope {
    fn from(raw: String) -> Self {
        Self::from_scope_str(&raw)
    }
}

impl From<DependencyScope> for &'static str {
    fn from(scope: DependencyScope) -> Self {
        scope.as_str()
    }
}

impl fmt::Display for DependencyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dependency declared by a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    #[serde(flatten)]
    pub key: ModuleKey,
    #[serde(default)]
    pub scope: DependencyScope,
}

impl DependencyRecord {
    pub fn new(key: ModuleKey, scope: DependencyScope) -> Self {
        Self { key, scope }
    }
}

/// A module of the reactor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    #[serde(flatten)]
    pub key: ModuleKey,
    /// Root of the module's sources and build outputs.
    pub base_dir: PathBuf,
    /// Declared dependencies, in declaration order.
    #[serde(default)]
    pub dependencies: Vec<DependencyRecord>,
}

impl Module {
    pub fn new(key: ModuleKey, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            key,
            base_dir: base_dir.into(),
            dependencies: Vec::new(),
        }
    }

    /// Builder-style helper to declare a dependency.
    pub fn with_dependency(mut self, key: ModuleKey, scope: DependencyScope) -> Self {
        self.dependencies.push(DependencyRecord::new(key, scope));
        self
    }

    pub fn artifact_id(&self) -> &str {
        &self.key.artifact_id
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
