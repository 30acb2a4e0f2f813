//! covagg - multi-module coverage aggregation CLI
//!
//! ## Commands
//!
//! - `report`: Aggregate coverage data across a reactor and write `index.json`
//! - `deps`: Show which reactor modules a project's dependencies resolve to

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};

use covagg_core::{
    generate_report, AggregateConfig, DependencyScope, JsonReportFormatter, ModuleKey,
    ProjectModel, ReactorManifest, ReactorSession, ScopeClassifier, DATA_SCOPES,
};

#[derive(Parser, Debug)]
#[command(name = "covagg")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Aggregate coverage reports across a multi-module build", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and command output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Aggregate coverage data and write the combined report
    Report {
        /// Reactor manifest (JSON)
        #[arg(short, long, env = "COVAGG_REACTOR")]
        reactor: PathBuf,

        /// Invoking project as group:artifact:version (default: manifest root)
        #[arg(long)]
        root: Option<String>,

        /// Configuration file (TOML)
        #[arg(short, long, env = "COVAGG_CONFIG")]
        config: Option<PathBuf>,

        /// Report title (default: the project's artifact id)
        #[arg(long)]
        title: Option<String>,

        /// Reporting root; `coverage-aggregate` is appended
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Data file include glob, relative to each module (repeatable)
        #[arg(long = "data-file-include")]
        data_file_include: Vec<String>,

        /// Data file exclude glob, relative to each module (repeatable)
        #[arg(long = "data-file-exclude")]
        data_file_exclude: Vec<String>,

        /// Skip aggregation entirely
        #[arg(long, env = "COVAGG_SKIP")]
        skip: bool,
    },

    /// List reactor modules selected by dependency scope
    Deps {
        /// Reactor manifest (JSON)
        #[arg(short, long, env = "COVAGG_REACTOR")]
        reactor: PathBuf,

        /// Invoking project as group:artifact:version (default: manifest root)
        #[arg(long)]
        root: Option<String>,

        /// Scopes to select, e.g. compile, test (default: compile and test)
        #[arg(long)]
        scope: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    covagg_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Report {
            reactor,
            root,
            config,
            title,
            output_dir,
            data_file_include,
            data_file_exclude,
            skip,
        } => {
            let overrides = ReportOverrides {
                title,
                output_dir,
                data_file_include,
                data_file_exclude,
                skip,
            };
            cmd_report(
                &reactor,
                root.as_deref(),
                config.as_deref(),
                overrides,
                cli.json,
            )
        }
        Commands::Deps {
            reactor,
            root,
            scope,
        } => cmd_deps(&reactor, root.as_deref(), &scope, cli.json),
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
struct ReportOverrides {
    title: Option<String>,
    output_dir: Option<PathBuf>,
    data_file_include: Vec<String>,
    data_file_exclude: Vec<String>,
    skip: bool,
}

fn load_session(reactor: &Path, root: Option<&str>) -> Result<ReactorSession> {
    let manifest = ReactorManifest::from_file(reactor)
        .with_context(|| format!("Failed to load reactor manifest {:?}", reactor))?;
    let root = root
        .map(str::parse::<ModuleKey>)
        .transpose()
        .context("Invalid --root")?;
    manifest
        .into_session(root)
        .context("Failed to resolve the invoking project")
}

fn build_config(config: Option<&Path>, overrides: ReportOverrides) -> Result<AggregateConfig> {
    let mut cfg = match config {
        Some(path) => AggregateConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => AggregateConfig::default(),
    };
    if let Some(dir) = overrides.output_dir {
        cfg = cfg.with_report_output_directory(dir);
    }
    if overrides.title.is_some() {
        cfg.title = overrides.title;
    }
    if !overrides.data_file_include.is_empty() {
        cfg.data_file_includes = overrides.data_file_include;
    }
    if !overrides.data_file_exclude.is_empty() {
        cfg.data_file_excludes = overrides.data_file_exclude;
    }
    cfg.skip |= overrides.skip;
    Ok(cfg)
}

/// Run the aggregation and print what was produced
fn cmd_report(
    reactor: &Path,
    root: Option<&str>,
    config: Option<&Path>,
    overrides: ReportOverrides,
    json: bool,
) -> Result<()> {
    let cfg = build_config(config, overrides)?;
    let session = load_session(reactor, root)?;

    let mut formatter = JsonReportFormatter::new();
    let report = generate_report(&cfg, &session, &mut formatter)
        .with_context(|| format!("Aggregation failed for {}", session.project_key()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.summary)?);
        return Ok(());
    }

    if report.summary.skipped {
        println!("Skipped coverage aggregation for {}", report.summary.project);
        return Ok(());
    }

    println!("Report:     {}", report.summary.title);
    println!("Project:    {}", report.summary.project);
    println!(
        "Data files: {} ({} bytes, digest {})",
        report.data.len(),
        report.data.total_bytes(),
        report.data.session_digest()
    );
    println!("Bundles:");
    for group in &report.tree.groups {
        for bundle in &group.bundles {
            println!(
                "  {:<30} {} classes, {} sources",
                bundle.name,
                bundle.class_files.len(),
                bundle.source_files.len()
            );
        }
    }
    if !report.summary.unresolved.is_empty() {
        println!("\nNot in reactor (ignored):");
        for key in &report.summary.unresolved {
            println!("  - {}", key);
        }
    }
    for path in &report.written {
        info!(path = %path.display(), "wrote report");
        println!("\nWrote {}", path.display());
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct DepsOutput {
    project: ModuleKey,
    scopes: Vec<DependencyScope>,
    modules: Vec<DepsEntry>,
    unresolved: Vec<ModuleKey>,
}

#[derive(Debug, Serialize)]
struct DepsEntry {
    key: ModuleKey,
    base_dir: PathBuf,
}

fn parse_scopes(raw: &[String]) -> Vec<DependencyScope> {
    if raw.is_empty() {
        return DATA_SCOPES.to_vec();
    }
    let mut scopes = Vec::new();
    for scope in raw.iter().map(|s| DependencyScope::from_scope_str(s)) {
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }
    scopes
}

fn classify(session: &ReactorSession, scopes: Vec<DependencyScope>) -> DepsOutput {
    let classifier = ScopeClassifier::for_project(session);
    let modules = classifier
        .find_dependencies(&scopes)
        .into_iter()
        .map(|module| DepsEntry {
            key: module.key.clone(),
            base_dir: module.base_dir.clone(),
        })
        .collect();
    let unresolved = classifier
        .unresolved(&scopes)
        .into_iter()
        .map(|dependency| dependency.key.clone())
        .collect();
    DepsOutput {
        project: session.project_key().clone(),
        scopes,
        modules,
        unresolved,
    }
}

/// Show the dependency classification for the invoking project
fn cmd_deps(reactor: &Path, root: Option<&str>, scopes: &[String], json: bool) -> Result<()> {
    let session = load_session(reactor, root)?;
    let output = classify(&session, parse_scopes(scopes));

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let scopes: Vec<&str> = output.scopes.iter().map(|s| s.as_str()).collect();
    println!("{} [{}]", output.project, scopes.join(", "));
    if output.modules.is_empty() {
        println!("  (no reactor modules)");
    }
    for entry in &output.modules {
        println!("  {:<40} {}", entry.key, entry.base_dir.display());
    }
    if !output.unresolved.is_empty() {
        println!("\nNot in reactor:");
        for key in &output.unresolved {
            println!("  - {}", key);
        }
    }
    Ok(())
}
