//! Wildcard include/exclude selection of files below a base directory.
//!
//! Matching is split from traversal: [`PathMatcher`] decides on a relative
//! path, [`FileFilter`] walks a directory and applies a matcher.
//!
//! Pattern syntax:
//! - `*` any run of characters within one path segment
//! - `?` exactly one character
//! - `**` any number of whole segments
//!
//! Patterns are relative to the base directory and always use `/`.

use std::io;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::error::{CoverageError, CoverageResult};

/// Decides whether a path relative to some base directory is selected.
pub trait PathMatcher {
    fn matches(&self, relative_path: &str) -> bool;
}

/// Include/exclude glob sets. Excludes win; an empty include list selects
/// nothing.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    includes: GlobSet,
    excludes: GlobSet,
}

impl GlobMatcher {
    /// Compile `includes` and `excludes`.
    ///
    /// Returns [`CoverageError::InvalidPattern`] for the first malformed glob.
    pub fn new<S: AsRef<str>>(includes: &[S], excludes: &[S]) -> CoverageResult<Self> {
        Ok(Self {
            includes: compile(includes)?,
            excludes: compile(excludes)?,
        })
    }
}

impl PathMatcher for GlobMatcher {
    fn matches(&self, relative_path: &str) -> bool {
        self.includes.is_match(relative_path) && !self.excludes.is_match(relative_path)
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> CoverageResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| CoverageError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| CoverageError::InvalidPattern {
        pattern: patterns
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<_>>()
            .join(","),
        source,
    })
}

/// Render `path` with `/` separators, dropping `.` components.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// A followed link whose target does not exist. Loops are still errors.
fn is_dangling_link(err: &walkdir::Error) -> bool {
    err.loop_ancestor().is_none()
        && err
            .io_error()
            .map_or(false, |e| e.kind() == io::ErrorKind::NotFound)
}

/// Finds files below a base directory that a [`PathMatcher`] selects.
#[derive(Debug, Clone)]
pub struct FileFilter<M = GlobMatcher> {
    matcher: M,
}

impl FileFilter<GlobMatcher> {
    /// Filter backed by compiled include/exclude globs.
    pub fn new<S: AsRef<str>>(includes: &[S], excludes: &[S]) -> CoverageResult<Self> {
        Ok(Self::with_matcher(GlobMatcher::new(includes, excludes)?))
    }
}

impl<M: PathMatcher> FileFilter<M> {
    pub fn with_matcher(matcher: M) -> Self {
        Self { matcher }
    }

    /// Select from an in-memory listing of relative paths, sorted.
    pub fn filter_listing<I, S>(&self, relative_paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selected: Vec<String> = relative_paths
            .into_iter()
            .map(|p| p.as_ref().replace('\\', "/"))
            .filter(|p| self.matcher.matches(p))
            .collect();
        selected.sort();
        selected
    }

    /// Regular files below `base_dir` selected by the matcher, sorted by
    /// relative path.
    ///
    /// Symlinks are followed and matched by their own path; dangling links
    /// are skipped. A missing base directory yields an empty list: a module
    /// may have no build output yet.
    pub fn get_files(&self, base_dir: &Path) -> CoverageResult<Vec<PathBuf>> {
        if !base_dir.is_dir() {
            tracing::debug!(base_dir = %base_dir.display(), "base directory absent, no files");
            return Ok(Vec::new());
        }

        let mut selected: Vec<(String, PathBuf)> = Vec::new();
        for entry in WalkDir::new(base_dir).follow_links(true).min_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if is_dangling_link(&err) => {
                    tracing::debug!(path = ?err.path(), "dangling symlink skipped");
                    continue;
                }
                Err(err) => {
                    return Err(CoverageError::Scan {
                        path: err.path().unwrap_or(base_dir).to_path_buf(),
                        detail: err.to_string(),
                    })
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(base_dir)
                .map(to_slash_path)
                .map_err(|e| CoverageError::Scan {
                    path: entry.path().to_path_buf(),
                    detail: e.to_string(),
                })?;
            if self.matcher.matches(&relative) {
                selected.push((relative, entry.into_path()));
            }
        }

        selected.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(selected.into_iter().map(|(_, path)| path).collect())
    }
}
