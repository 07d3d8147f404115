//! Build command - produce every bundle of a Phantom project

use anyhow::{Context, Result};
use colored::Colorize;
use phantom_build::{BuildConfig, BuildOrchestrator, BuildReport};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Build command arguments
#[derive(Default)]
pub struct BuildArgs {
    /// Manifest path override
    pub manifest: Option<PathBuf>,
    /// Entry point override
    pub entry: Option<PathBuf>,
    /// Output directory override
    pub out_dir: Option<PathBuf>,
    /// Explicit phantom.toml
    pub config: Option<PathBuf>,
    pub fail_fast: bool,
    pub sequential: bool,
    /// Per-target time limit in seconds
    pub timeout: Option<u64>,
    /// JSON output
    pub json: bool,
    /// Verbose output
    pub verbose: bool,
    /// Quiet output (errors only)
    pub quiet: bool,
    /// Project directory (defaults to current directory)
    pub project_dir: Option<PathBuf>,
}

/// Run the build command
pub fn run(args: BuildArgs) -> Result<()> {
    let project_dir = args
        .project_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));

    let config = resolve_config(&args, &project_dir)?;
    let orchestrator = BuildOrchestrator::new(&project_dir).with_config(config);

    let report = orchestrator.run().context("Build failed")?;

    if args.json {
        println!("{}", report_json(&report, &project_dir));
    } else if !args.quiet {
        print_summary(&report, &project_dir, args.verbose);
    }

    report.into_result().context("Build failed")?;
    Ok(())
}

/// phantom.toml (explicit or discovered), then flag overrides
fn resolve_config(args: &BuildArgs, project_dir: &Path) -> Result<BuildConfig> {
    let mut config = match &args.config {
        Some(path) => BuildConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => BuildConfig::discover(project_dir).context("Failed to load phantom.toml")?,
    };

    if let Some(ref manifest) = args.manifest {
        config.manifest_path = manifest.clone();
    }
    if let Some(ref entry) = args.entry {
        config.entry_point = entry.clone();
    }
    if let Some(ref out_dir) = args.out_dir {
        config.out_dir = out_dir.clone();
    }
    if args.fail_fast {
        config.fail_fast = true;
    }
    if args.sequential {
        config.parallel = false;
    }
    if let Some(secs) = args.timeout {
        config.target_timeout = Some(Duration::from_secs(secs));
    }

    Ok(config)
}

fn display_path(path: &Path, project_dir: &Path) -> String {
    path.strip_prefix(project_dir)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn report_json(report: &BuildReport, project_dir: &Path) -> serde_json::Value {
    serde_json::json!({
        "success": report.is_success(),
        "total_time": report.total_time.as_secs_f64(),
        "artifacts": report.artifacts.iter().map(|a| serde_json::json!({
            "target": a.target_id,
            "path": display_path(&a.output_path, project_dir),
            "size": a.size,
            "sha256": a.sha256,
            "declarations": a.declarations
                .iter()
                .map(|d| display_path(d, project_dir))
                .collect::<Vec<_>>(),
            "externals": a.externals,
            "time": a.elapsed.as_secs_f64(),
        })).collect::<Vec<_>>(),
        "failures": report.failures.iter().map(|f| serde_json::json!({
            "target": f.target_id,
            "stage": f.stage.to_string(),
            "error": f.cause.to_string(),
        })).collect::<Vec<_>>(),
        "skipped": report.skipped,
    })
}

fn print_summary(report: &BuildReport, project_dir: &Path, verbose: bool) {
    for artifact in &report.artifacts {
        println!(
            "  {} {:<17} {} ({} bytes)",
            "built".green(),
            artifact.target_id,
            display_path(&artifact.output_path, project_dir),
            artifact.size
        );
        if verbose {
            for declaration in &artifact.declarations {
                println!("{:>26} {}", "+", display_path(declaration, project_dir));
            }
        }
    }
    for failure in &report.failures {
        println!(
            "  {} {:<17} {}: {}",
            "failed".red(),
            failure.target_id,
            failure.stage,
            failure.cause
        );
    }
    for id in &report.skipped {
        println!("  {} {}", "skipped".yellow(), id);
    }

    println!("{}", "=".repeat(60));
    if report.is_success() {
        println!(
            "Build succeeded in {:.2}s ({} artifacts)",
            report.total_time.as_secs_f64(),
            report.artifacts.len()
        );
    } else {
        println!(
            "Build finished in {:.2}s: {} succeeded, {} failed, {} skipped",
            report.total_time.as_secs_f64(),
            report.artifacts.len(),
            report.failures.len(),
            report.skipped.len()
        );
    }
}
