//! JSON description of a reactor, the file-based project model.
//!
//! ```json
//! {
//!   "root": "org.example:report:1.0",
//!   "modules": [
//!     {
//!       "group_id": "org.example", "artifact_id": "report", "version": "1.0",
//!       "base_dir": "report",
//!       "dependencies": [
//!         { "group_id": "org.example", "artifact_id": "core", "version": "1.0", "scope": "compile" },
//!         { "group_id": "org.example", "artifact_id": "it", "version": "1.0", "scope": "test" }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Relative `base_dir`s are resolved against the manifest's directory.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Module, ModuleKey};
use crate::error::{CoverageError, CoverageResult};
use crate::reactor::{Reactor, ReactorSession};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactorManifest {
    /// Default invoking project as `group:artifact:version`.
    #[serde(default)]
    pub root: Option<String>,
    pub modules: Vec<Module>,
}

impl ReactorManifest {
    pub fn from_json_str(raw: &str) -> CoverageResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load a manifest and anchor relative base directories at its location.
    pub fn from_file(path: &Path) -> CoverageResult<Self> {
        let raw = fs::read_to_string(path)?;
        let mut manifest = Self::from_json_str(&raw)?;
        if let Some(dir) = path.parent() {
            manifest.resolve_base_dirs(dir);
        }
        Ok(manifest)
    }

    /// Join every relative `base_dir` onto `anchor`.
    pub fn resolve_base_dirs(&mut self, anchor: &Path) {
        for module in &mut self.modules {
            if module.base_dir.is_relative() {
                module.base_dir = anchor.join(&module.base_dir);
            }
        }
    }

    /// The manifest's declared root, parsed.
    pub fn root_key(&self) -> CoverageResult<Option<ModuleKey>> {
        self.root.as_deref().map(str::parse::<ModuleKey>).transpose()
    }

    /// Build a session for `root`, falling back to the manifest's root.
    pub fn into_session(self, root: Option<ModuleKey>) -> CoverageResult<ReactorSession> {
        let root = match root {
            Some(root) => root,
            None => self.root_key()?.ok_or_else(|| {
                CoverageError::Configuration(
                    "no root project: pass one explicitly or set \"root\" in the manifest"
                        .to_string(),
                )
            })?,
        };
        ReactorSession::new(Reactor::new(self.modules)?, root)
    }
}
