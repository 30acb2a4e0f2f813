//! In-memory report tree built by the aggregation's composition phase.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregator::{ProjectRequest, ReportVisitor};
use crate::domain::ModuleKey;
use crate::error::{CoverageError, CoverageResult};
use crate::matcher::{to_slash_path, FileFilter};

/// Class output directory, relative to a module base directory.
pub const CLASSES_DIR: &str = "target/classes";

/// Source roots, relative to a module base directory.
pub const SOURCE_ROOTS: &[&str] = &["src/main/java", "src/main/kotlin"];

/// Class file pattern used when no class includes are configured.
pub const DEFAULT_CLASS_INCLUDE: &str = "**/*.class";

/// Sub-report of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleReport {
    /// Display name inside the group.
    pub name: String,
    pub module: ModuleKey,
    pub base_dir: PathBuf,
    /// Class files relative to the classes directory, sorted.
    pub class_files: Vec<String>,
    /// Source files relative to their source root, sorted.
    pub source_files: Vec<String>,
    pub source_encoding: String,
}

/// A named group of module sub-reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportGroupNode {
    pub title: String,
    pub bundles: Vec<BundleReport>,
}

impl ReportGroupNode {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            bundles: Vec::new(),
        }
    }

    pub fn bundle_names(&self) -> Vec<&str> {
        self.bundles.iter().map(|b| b.name.as_str()).collect()
    }
}

/// [`ReportVisitor`] collecting closed groups in visit order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportTree {
    pub groups: Vec<ReportGroupNode>,
}

impl ReportTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group(&self, title: &str) -> Option<&ReportGroupNode> {
        self.groups.iter().find(|g| g.title == title)
    }
}

fn composition_error(module: &ModuleKey, err: impl std::fmt::Display) -> CoverageError {
    CoverageError::ReportComposition {
        module: module.to_string(),
        detail: err.to_string(),
    }
}

/// Files below `root` selected by `filter`, relative and sorted.
fn relative_files(filter: &FileFilter, root: &Path) -> CoverageResult<Vec<String>> {
    Ok(filter
        .get_files(root)?
        .iter()
        .filter_map(|path| path.strip_prefix(root).ok().map(to_slash_path))
        .collect())
}

impl ReportVisitor for ReportTree {
    type Group = ReportGroupNode;

    fn visit_group(&mut self, title: &str) -> CoverageResult<ReportGroupNode> {
        Ok(ReportGroupNode::new(title))
    }

    fn process_project(
        &mut self,
        group: &mut ReportGroupNode,
        request: &ProjectRequest<'_>,
    ) -> CoverageResult<()> {
        let module = request.module;
        let base_dir = module.base_dir();
        if base_dir.exists() && !base_dir.is_dir() {
            return Err(composition_error(
                &module.key,
                format!("base directory {} is not a directory", base_dir.display()),
            ));
        }

        let default_includes = [DEFAULT_CLASS_INCLUDE.to_string()];
        let includes = if request.includes.is_empty() {
            &default_includes[..]
        } else {
            request.includes
        };
        let class_filter = FileFilter::new(includes, request.excludes)?;
        let class_files = relative_files(&class_filter, &base_dir.join(CLASSES_DIR))
            .map_err(|e| composition_error(&module.key, e))?;

        let empty: [&str; 0] = [];
        let source_filter = FileFilter::new(&["**/*"], &empty)?;
        let mut source_files = Vec::new();
        for root in SOURCE_ROOTS {
            let files = relative_files(&source_filter, &base_dir.join(root))
                .map_err(|e| composition_error(&module.key, e))?;
            source_files.extend(files);
        }
        source_files.sort();

        group.bundles.push(BundleReport {
            name: request.name.to_string(),
            module: module.key.clone(),
            base_dir: base_dir.to_path_buf(),
            class_files,
            source_files,
            source_encoding: request.source_encoding.to_string(),
        });
        Ok(())
    }

    fn visit_end(&mut self, group: ReportGroupNode) -> CoverageResult<()> {
        self.groups.push(group);
        Ok(())
    }
}
