//! Two-phase coverage aggregation over reactor dependencies.
//!
//! 1. **Data loading**: every reactor dependency declared with
//!    [`DATA_SCOPES`] has its coverage data files matched and fed to an
//!    [`ExecutionDataLoader`].
//! 2. **Report composition**: every reactor dependency declared with
//!    [`REPORT_SCOPES`] gets one sub-report inside a single group opened on a
//!    [`ReportVisitor`].
//!
//! Phases run in order on one thread. Any collaborator error aborts the run;
//! there is no partial result.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::AggregateConfig;
use crate::domain::{DependencyScope, Module, ModuleKey};
use crate::error::CoverageResult;
use crate::matcher::FileFilter;
use crate::obs;
use crate::reactor::ProjectModel;
use crate::scope::{ScopeClassifier, DATA_SCOPES, REPORT_SCOPES};

/// Sink for coverage data files.
///
/// Implementations parse the file and merge it into a session-wide
/// accumulator.
pub trait ExecutionDataLoader {
    fn load_execution_data(&mut self, path: &Path) -> CoverageResult<()>;
}

/// Everything a [`ReportVisitor`] needs to build one module's sub-report.
#[derive(Debug, Clone, Copy)]
pub struct ProjectRequest<'a> {
    /// Display name of the sub-report (the module's artifact id).
    pub name: &'a str,
    /// Module whose classes and sources are reported.
    pub module: &'a Module,
    /// Class file include globs.
    pub includes: &'a [String],
    /// Class file exclude globs.
    pub excludes: &'a [String],
    pub source_encoding: &'a str,
}

/// Builds the report tree.
pub trait ReportVisitor {
    /// Node that collects the per-module sub-reports.
    type Group;

    /// Open an empty group titled `title`.
    fn visit_group(&mut self, title: &str) -> CoverageResult<Self::Group>;

    /// Append the sub-report described by `request` to `group`.
    fn process_project(
        &mut self,
        group: &mut Self::Group,
        request: &ProjectRequest<'_>,
    ) -> CoverageResult<()>;

    /// Close `group` once every module has been processed.
    fn visit_end(&mut self, group: Self::Group) -> CoverageResult<()>;
}

/// Outcome of one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSummary {
    pub project: ModuleKey,
    pub title: String,
    /// Modules whose data files were loaded, in load order.
    pub data_modules: Vec<ModuleKey>,
    /// Data files handed to the loader, in load order.
    pub data_files: Vec<PathBuf>,
    /// Modules that received a sub-report, in report order.
    pub report_modules: Vec<ModuleKey>,
    /// In-scope dependencies that are not part of the reactor.
    pub unresolved: Vec<ModuleKey>,
    /// `true` when the run was skipped by configuration.
    pub skipped: bool,
}

/// Runs both aggregation phases for one project.
pub struct Aggregator<'a, P: ProjectModel + ?Sized> {
    config: &'a AggregateConfig,
    project: &'a P,
    data_filter: FileFilter,
}

impl<'a, P: ProjectModel + ?Sized> Aggregator<'a, P> {
    /// Validate `config` and prepare the data file filter.
    pub fn new(config: &'a AggregateConfig, project: &'a P) -> CoverageResult<Self> {
        config.validate()?;
        let data_filter = FileFilter::new(
            &config.data_file_includes[..],
            &config.data_file_excludes[..],
        )?;
        Ok(Self {
            config,
            project,
            data_filter,
        })
    }

    /// Group title: configured title or the project's artifact id.
    pub fn title(&self) -> &'a str {
        self.config.title_or(&self.project.project_key().artifact_id)
    }

    /// Distinct reactor modules declared with one of `scopes`, first
    /// declaration wins.
    fn modules_for(&self, scopes: &[DependencyScope]) -> Vec<&'a Module> {
        let mut seen = HashSet::new();
        ScopeClassifier::for_project(self.project)
            .find_dependencies(scopes)
            .into_iter()
            .filter(|module| {
                let first = seen.insert(module.key.clone());
                if !first {
                    tracing::debug!(module = %module.key, "dependency declared twice, keeping first");
                }
                first
            })
            .collect()
    }

    /// Modules contributing coverage data.
    pub fn data_modules(&self) -> Vec<&'a Module> {
        self.modules_for(DATA_SCOPES)
    }

    /// Modules contributing classes and sources to the report.
    pub fn report_modules(&self) -> Vec<&'a Module> {
        self.modules_for(REPORT_SCOPES)
    }

    /// Phase 1: feed every matched data file to `loader`.
    ///
    /// Returns the loaded modules and files in load order.
    pub fn load_execution_data<L>(
        &self,
        loader: &mut L,
    ) -> CoverageResult<(Vec<ModuleKey>, Vec<PathBuf>)>
    where
        L: ExecutionDataLoader + ?Sized,
    {
        let mut modules = Vec::new();
        let mut loaded = Vec::new();
        for module in self.data_modules() {
            let files = self.data_filter.get_files(module.base_dir())?;
            obs::emit_module_scanned(&module.key, module.base_dir(), files.len());
            for file in files {
                loader.load_execution_data(&file)?;
                obs::emit_data_loaded(&module.key, &file);
                loaded.push(file);
            }
            modules.push(module.key.clone());
        }
        Ok((modules, loaded))
    }

    /// Phase 2: one group, one sub-report per report module.
    ///
    /// Returns the reported modules in order.
    pub fn create_report<V>(&self, visitor: &mut V) -> CoverageResult<Vec<ModuleKey>>
    where
        V: ReportVisitor + ?Sized,
    {
        let title = self.title();
        let mut group = visitor.visit_group(title)?;
        let mut reported = Vec::new();
        for module in self.report_modules() {
            let request = ProjectRequest {
                name: module.artifact_id(),
                module,
                includes: &self.config.includes,
                excludes: &self.config.excludes,
                source_encoding: &self.config.source_encoding,
            };
            visitor.process_project(&mut group, &request)?;
            obs::emit_bundle_created(title, &module.key);
            reported.push(module.key.clone());
        }
        visitor.visit_end(group)?;
        Ok(reported)
    }

    /// In-scope dependencies missing from the reactor.
    pub fn unresolved(&self) -> Vec<ModuleKey> {
        ScopeClassifier::for_project(self.project)
            .unresolved(DATA_SCOPES)
            .into_iter()
            .map(|dependency| dependency.key.clone())
            .collect()
    }
}

/// Run the full pipeline: validate, load data, compose the report.
///
/// With `config.skip` set nothing is validated and no collaborator is
/// touched.
pub fn aggregate<P, L, V>(
    config: &AggregateConfig,
    project: &P,
    loader: &mut L,
    visitor: &mut V,
) -> CoverageResult<AggregationSummary>
where
    P: ProjectModel + ?Sized,
    L: ExecutionDataLoader + ?Sized,
    V: ReportVisitor + ?Sized,
{
    let project_key = project.project_key().clone();
    let title = config.title_or(&project_key.artifact_id).to_string();

    if config.skip {
        obs::emit_aggregate_skipped(&project_key);
        return Ok(AggregationSummary {
            project: project_key,
            title,
            data_modules: Vec::new(),
            data_files: Vec::new(),
            report_modules: Vec::new(),
            unresolved: Vec::new(),
            skipped: true,
        });
    }

    let _span = obs::AggregationSpan::enter(&project_key);
    let started = Instant::now();

    let result = run_phases(config, project, loader, visitor, title);
    match &result {
        Ok(summary) => obs::emit_aggregate_finished(
            &project_key,
            started.elapsed().as_millis() as u64,
            summary.data_files.len(),
            summary.report_modules.len(),
        ),
        Err(err) => obs::emit_aggregate_failed(&project_key, err),
    }
    result
}

fn run_phases<P, L, V>(
    config: &AggregateConfig,
    project: &P,
    loader: &mut L,
    visitor: &mut V,
    title: String,
) -> CoverageResult<AggregationSummary>
where
    P: ProjectModel + ?Sized,
    L: ExecutionDataLoader + ?Sized,
    V: ReportVisitor + ?Sized,
{
    let project_key = project.project_key();
    let aggregator = Aggregator::new(config, project)?;

    let unresolved = aggregator.unresolved();
    for dependency in &unresolved {
        obs::emit_dependency_unresolved(project_key, dependency);
    }
    obs::emit_aggregate_started(
        project_key,
        aggregator.data_modules().len(),
        aggregator.report_modules().len(),
    );

    let (data_modules, data_files) = aggregator.load_execution_data(loader)?;
    let report_modules = aggregator.create_report(visitor)?;

    Ok(AggregationSummary {
        project: project_key.clone(),
        title,
        data_modules,
        data_files,
        report_modules,
        unresolved,
        skipped: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoverageError;
    use crate::reactor::{Reactor, ReactorSession};
    use std::fs;

    fn key(id: &str) -> ModuleKey {
        ModuleKey::new("org.example", id, "1.0")
    }

    /// Loader that remembers every path it was given.
    #[derive(Default)]
    struct RecordingLoader {
        paths: Vec<PathBuf>,
        fail_on: Option<String>,
    }

    impl ExecutionDataLoader for RecordingLoader {
        fn load_execution_data(&mut self, path: &Path) -> CoverageResult<()> {
            if let Some(name) = &self.fail_on {
                if path.ends_with(name) {
                    return Err(CoverageError::DataFormat {
                        path: path.to_path_buf(),
                        detail: "bad header".to_string(),
                    });
                }
            }
            self.paths.push(path.to_path_buf());
            Ok(())
        }
    }

    /// Visitor recording calls as strings.
    #[derive(Default)]
    struct RecordingVisitor {
        calls: Vec<String>,
        fail_for: Option<String>,
    }

    impl ReportVisitor for RecordingVisitor {
        type Group = Vec<String>;

        fn visit_group(&mut self, title: &str) -> CoverageResult<Self::Group> {
            self.calls.push(format!("group:{title}"));
            Ok(Vec::new())
        }

        fn process_project(
            &mut self,
            group: &mut Self::Group,
            request: &ProjectRequest<'_>,
        ) -> CoverageResult<()> {
            if self.fail_for.as_deref() == Some(request.name) {
                return Err(CoverageError::ReportComposition {
                    module: request.name.to_string(),
                    detail: "unreadable classes".to_string(),
                });
            }
            group.push(request.name.to_string());
            self.calls.push(format!("project:{}", request.name));
            Ok(())
        }

        fn visit_end(&mut self, group: Self::Group) -> CoverageResult<()> {
            self.calls.push(format!("end:{}", group.join(",")));
            Ok(())
        }
    }

    fn write_exec(base: &Path, relative: &str) {
        let path = base.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, [0x01, 0xC0, 0xC0]).unwrap();
    }

    /// root -> a[source], b[data-only], ext[source, not in reactor]
    fn session(root_dir: &Path) -> ReactorSession {
        let root = Module::new(key("root"), root_dir.join("root"))
            .with_dependency(key("a"), DependencyScope::ContributesSource)
            .with_dependency(key("b"), DependencyScope::DataOnly)
            .with_dependency(
                ModuleKey::new("com.external", "ext", "9"),
                DependencyScope::ContributesSource,
            );
        let a = Module::new(key("a"), root_dir.join("a"));
        let b = Module::new(key("b"), root_dir.join("b"));
        ReactorSession::new(Reactor::new(vec![root, a, b]).unwrap(), key("root")).unwrap()
    }

    fn config(out: &Path) -> AggregateConfig {
        AggregateConfig {
            output_directory: out.to_path_buf(),
            ..AggregateConfig::default()
        }
    }

    #[test]
    fn test_data_from_both_scopes_report_from_source_scope_only() {
        let dir = tempfile::tempdir().unwrap();
        write_exec(&dir.path().join("a"), "target/a.exec");
        write_exec(&dir.path().join("b"), "target/b.exec");
        let project = session(dir.path());

        let mut loader = RecordingLoader::default();
        let mut visitor = RecordingVisitor::default();
        let summary =
            aggregate(&config(&dir.path().join("out")), &project, &mut loader, &mut visitor)
                .unwrap();

        assert_eq!(loader.paths.len(), 2);
        assert!(loader.paths[0].ends_with("a/target/a.exec"));
        assert!(loader.paths[1].ends_with("b/target/b.exec"));
        assert_eq!(visitor.calls, ["group:root", "project:a", "end:a"]);
        assert_eq!(summary.data_modules, vec![key("a"), key("b")]);
        assert_eq!(summary.report_modules, vec![key("a")]);
        assert_eq!(
            summary.unresolved,
            vec![ModuleKey::new("com.external", "ext", "9")]
        );
        assert!(!summary.skipped);
    }

    #[test]
    fn test_module_without_data_files_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_exec(&dir.path().join("a"), "target/a.exec");
        let project = session(dir.path());

        let mut loader = RecordingLoader::default();
        let mut visitor = RecordingVisitor::default();
        let summary =
            aggregate(&config(&dir.path().join("out")), &project, &mut loader, &mut visitor)
                .unwrap();

        assert_eq!(loader.paths.len(), 1);
        assert_eq!(summary.data_modules, vec![key("a"), key("b")]);
        assert_eq!(summary.report_modules, vec![key("a")]);
    }

    #[test]
    fn test_loader_error_aborts_before_report() {
        let dir = tempfile::tempdir().unwrap();
        write_exec(&dir.path().join("a"), "target/a.exec");
        write_exec(&dir.path().join("b"), "target/b.exec");
        let project = session(dir.path());

        let mut loader = RecordingLoader {
            fail_on: Some("b.exec".to_string()),
            ..RecordingLoader::default()
        };
        let mut visitor = RecordingVisitor::default();
        let err = aggregate(&config(&dir.path().join("out")), &project, &mut loader, &mut visitor)
            .unwrap_err();

        assert!(matches!(err, CoverageError::DataFormat { .. }));
        assert!(visitor.calls.is_empty(), "no report may be started");
    }

    #[test]
    fn test_visitor_error_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let project = session(dir.path());
        let mut loader = RecordingLoader::default();
        let mut visitor = RecordingVisitor {
            fail_for: Some("a".to_string()),
            ..RecordingVisitor::default()
        };
        let err = aggregate(&config(&dir.path().join("out")), &project, &mut loader, &mut visitor)
            .unwrap_err();
        assert!(matches!(err, CoverageError::ReportComposition { .. }));
        assert!(!visitor.calls.iter().any(|c| c.starts_with("end:")));
    }

    #[test]
    fn test_configuration_error_surfaces_before_any_phase() {
        let dir = tempfile::tempdir().unwrap();
        write_exec(&dir.path().join("a"), "target/a.exec");
        let project = session(dir.path());
        let bad = AggregateConfig {
            data_file_excludes: vec!["target/[".to_string()],
            ..config(&dir.path().join("out"))
        };

        let mut loader = RecordingLoader::default();
        let mut visitor = RecordingVisitor::default();
        let err = aggregate(&bad, &project, &mut loader, &mut visitor).unwrap_err();
        assert!(err.is_configuration());
        assert!(loader.paths.is_empty());
        assert!(visitor.calls.is_empty());
    }

    #[test]
    fn test_output_directory_below_a_file_fails_before_any_phase() {
        let dir = tempfile::tempdir().unwrap();
        write_exec(&dir.path().join("a"), "target/a.exec");
        let project = session(dir.path());
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let bad = config(&blocker.join("coverage-aggregate"));

        let mut loader = RecordingLoader::default();
        let mut visitor = RecordingVisitor::default();
        let err = aggregate(&bad, &project, &mut loader, &mut visitor).unwrap_err();
        assert!(matches!(err, CoverageError::OutputDirectory { .. }));
        assert!(err.is_configuration());
        assert!(loader.paths.is_empty());
        assert!(visitor.calls.is_empty());
    }

    #[test]
    fn test_skip_touches_no_collaborator() {
        let dir = tempfile::tempdir().unwrap();
        write_exec(&dir.path().join("a"), "target/a.exec");
        let project = session(dir.path());
        let skip = AggregateConfig {
            skip: true,
            ..config(&dir.path().join("out"))
        };

        let mut loader = RecordingLoader::default();
        let mut visitor = RecordingVisitor::default();
        let summary = aggregate(&skip, &project, &mut loader, &mut visitor).unwrap();
        assert!(summary.skipped);
        assert!(loader.paths.is_empty());
        assert!(visitor.calls.is_empty());
    }

    #[test]
    fn test_duplicate_declaration_reported_once() {
        let dir = tempfile::tempdir().unwrap();
        write_exec(&dir.path().join("a"), "target/a.exec");
        let root = Module::new(key("root"), dir.path().join("root"))
            .with_dependency(key("a"), DependencyScope::ContributesSource)
            .with_dependency(key("a"), DependencyScope::DataOnly);
        let a = Module::new(key("a"), dir.path().join("a"));
        let project =
            ReactorSession::new(Reactor::new(vec![root, a]).unwrap(), key("root")).unwrap();

        let mut loader = RecordingLoader::default();
        let mut visitor = RecordingVisitor::default();
        let summary =
            aggregate(&config(&dir.path().join("out")), &project, &mut loader, &mut visitor)
                .unwrap();
        assert_eq!(loader.paths.len(), 1);
        assert_eq!(summary.report_modules, vec![key("a")]);
    }

    #[test]
    fn test_custom_title_and_request_passthrough() {
        struct Capture(Vec<(String, Vec<String>, String)>);

        impl ReportVisitor for Capture {
            type Group = ();

            fn visit_group(&mut self, title: &str) -> CoverageResult<()> {
                self.0.push((format!("group:{title}"), Vec::new(), String::new()));
                Ok(())
            }

            fn process_project(
                &mut self,
                _group: &mut (),
                request: &ProjectRequest<'_>,
            ) -> CoverageResult<()> {
                self.0.push((
                    request.name.to_string(),
                    request.excludes.to_vec(),
                    request.source_encoding.to_string(),
                ));
                Ok(())
            }

            fn visit_end(&mut self, _group: ()) -> CoverageResult<()> {
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let project = session(dir.path());
        let cfg = AggregateConfig {
            title: Some("Platform".to_string()),
            excludes: vec!["**/generated/**".to_string()],
            source_encoding: "ISO-8859-1".to_string(),
            ..config(&dir.path().join("out"))
        };
        let mut capture = Capture(Vec::new());
        aggregate(&cfg, &project, &mut RecordingLoader::default(), &mut capture).unwrap();

        assert_eq!(capture.0[0].0, "group:Platform");
        assert_eq!(capture.0[1].0, "a");
        assert_eq!(capture.0[1].1, vec!["**/generated/**".to_string()]);
        assert_eq!(capture.0[1].2, "ISO-8859-1");
    }
}
