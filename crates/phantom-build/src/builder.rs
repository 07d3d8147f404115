//! Build orchestration
//!
//! [`BuildOrchestrator`] reads the manifest once, derives the external
//! predicate and the plan, then runs every target's pipeline against the
//! shared entry point. A failing target never stops its siblings unless
//! fail-fast is enabled.

use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult, OrchestratorError, StageError, StageFailure};
use crate::external::ExternalPredicate;
use crate::output;
use crate::pipeline::{compose, PipelineContext, StageName, TransformationStage};
use crate::targets::{build_targets, BuildPlan, BuildTarget};
use crate::toolchain::{import_specifiers, Declaration, SourceFile, Toolchain};

use phantom_package::DependencyManifest;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One written bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub target_id: String,
    /// Path of the written bundle
    pub output_path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Hex SHA-256 of the bundle contents
    pub sha256: String,
    /// Declaration files written by this target
    pub declarations: Vec<PathBuf>,
    /// Imports left external
    pub externals: BTreeSet<String>,
    pub elapsed: Duration,
}

/// Outcome of one run
#[derive(Debug)]
pub struct BuildReport {
    /// Successful artifacts, in plan order
    pub artifacts: Vec<BuildArtifact>,
    /// Failed targets, in plan order
    pub failures: Vec<StageError>,
    /// Targets not run because of fail-fast
    pub skipped: Vec<String>,
    pub total_time: Duration,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn succeeded_paths(&self) -> Vec<PathBuf> {
        self.artifacts.iter().map(|a| a.output_path.clone()).collect()
    }

    pub fn failed_targets(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.target_id.as_str()).collect()
    }

    /// Turn any failure into an [`OrchestratorError`]
    pub fn into_result(self) -> Result<BuildReport, OrchestratorError> {
        if self.failures.is_empty() {
            return Ok(self);
        }

        let succeeded = self.succeeded_paths();
        Err(OrchestratorError {
            failures: self.failures,
            succeeded,
        })
    }
}

enum TargetOutcome {
    Built(BuildArtifact),
    Failed(StageError),
    Skipped(String),
}

/// Working state threaded through a target's stages
#[derive(Default)]
struct TargetState {
    entry: PathBuf,
    source: Option<SourceFile>,
    code: String,
    declarations: Vec<Declaration>,
    externals: BTreeSet<String>,
}

/// Runs build plans
pub struct BuildOrchestrator {
    root_dir: PathBuf,
    config: BuildConfig,
    toolchain: Toolchain,
}

impl BuildOrchestrator {
    /// Orchestrator for the project at `root_dir` with default config and toolchain
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self {
            root_dir: root_dir.as_ref().to_path_buf(),
            config: BuildConfig::default(),
            toolchain: Toolchain::default(),
        }
    }

    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = toolchain;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.fail_fast = fail_fast;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config.parallel = parallel;
        self
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.config.out_dir = out_dir.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.target_timeout = Some(timeout);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Directory artifact paths are relative to
    pub fn out_dir(&self) -> PathBuf {
        self.root_dir.join(&self.config.out_dir)
    }

    /// Read the project's dependency manifest
    pub fn load_manifest(&self) -> BuildResult<DependencyManifest> {
        let path = self.root_dir.join(&self.config.manifest_path);
        Ok(DependencyManifest::from_file(&path)?)
    }

    /// Load the manifest, build the plan and run it.
    ///
    /// Manifest and plan errors abort before any target runs. Target failures
    /// are reported in the returned [`BuildReport`].
    pub fn run(&self) -> BuildResult<BuildReport> {
        let manifest = self.load_manifest()?;
        let plan = build_targets(&manifest, &self.config.plan_options())?;

        info!(
            package = manifest.name().unwrap_or("<unnamed>"),
            targets = plan.len(),
            "starting build"
        );

        Ok(self.run_plan(&manifest, &plan))
    }

    /// Like [`run`](Self::run), but any target failure becomes an error
    pub fn run_checked(&self) -> BuildResult<BuildReport> {
        self.run()?.into_result().map_err(BuildError::from)
    }

    /// Execute an already validated plan
    pub fn run_plan(&self, manifest: &DependencyManifest, plan: &BuildPlan) -> BuildReport {
        let start = Instant::now();
        let predicate = ExternalPredicate::from_manifest(manifest);
        let context = PipelineContext::from_manifest(manifest, &self.config.extensions);
        let abort = AtomicBool::new(false);

        let outcomes: Vec<TargetOutcome> = if self.config.parallel {
            plan.targets()
                .par_iter()
                .map(|target| self.execute_target(target, &predicate, &context, &abort))
                .collect()
        } else {
            plan.targets()
                .iter()
                .map(|target| self.execute_target(target, &predicate, &context, &abort))
                .collect()
        };

        let mut report = BuildReport {
            artifacts: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            total_time: Duration::ZERO,
        };
        for outcome in outcomes {
            match outcome {
                TargetOutcome::Built(artifact) => report.artifacts.push(artifact),
                TargetOutcome::Failed(error) => report.failures.push(error),
                TargetOutcome::Skipped(id) => report.skipped.push(id),
            }
        }
        report.total_time = start.elapsed();

        info!(
            succeeded = report.artifacts.len(),
            failed = report.failures.len(),
            skipped = report.skipped.len(),
            elapsed_ms = report.total_time.as_millis() as u64,
            "build finished"
        );

        report
    }

    fn execute_target(
        &self,
        target: &BuildTarget,
        predicate: &ExternalPredicate,
        context: &PipelineContext,
        abort: &AtomicBool,
    ) -> TargetOutcome {
        if abort.load(Ordering::SeqCst) {
            debug!(target = %target.id, "skipped after earlier failure");
            return TargetOutcome::Skipped(target.id.clone());
        }

        let start = Instant::now();
        let mut state = TargetState::default();

        for stage in compose(target, context) {
            if abort.load(Ordering::SeqCst) {
                debug!(target = %target.id, "skipped after earlier failure");
                return TargetOutcome::Skipped(target.id.clone());
            }

            debug!(target = %target.id, stage = %stage.name(), "running stage");
            let result = self.run_stage(&stage, target, predicate, &mut state);

            let result = result.and_then(|()| match self.config.target_timeout {
                Some(limit) if start.elapsed() > limit => Err(StageFailure::Timeout {
                    elapsed: start.elapsed(),
                    limit,
                }),
                _ => Ok(()),
            });

            if let Err(cause) = result {
                return self.fail(target, stage.name(), cause, abort);
            }
        }

        match self.emit(target, &state) {
            Ok((output_path, bytes, declarations)) => {
                let artifact = BuildArtifact {
                    target_id: target.id.clone(),
                    output_path,
                    size: bytes.len() as u64,
                    sha256: format!("{:x}", Sha256::digest(&bytes)),
                    declarations,
                    externals: state.externals,
                    elapsed: start.elapsed(),
                };
                info!(
                    target = %artifact.target_id,
                    path = %artifact.output_path.display(),
                    bytes = artifact.size,
                    "wrote artifact"
                );
                TargetOutcome::Built(artifact)
            }
            Err(cause) => self.fail(target, StageName::Emit, cause, abort),
        }
    }

    fn fail(
        &self,
        target: &BuildTarget,
        stage: StageName,
        cause: StageFailure,
        abort: &AtomicBool,
    ) -> TargetOutcome {
        warn!(target = %target.id, stage = %stage, error = %cause, "target failed");
        if self.config.fail_fast {
            abort.store(true, Ordering::SeqCst);
        }
        TargetOutcome::Failed(StageError::new(&target.id, stage, cause))
    }

    fn run_stage(
        &self,
        stage: &TransformationStage,
        target: &BuildTarget,
        predicate: &ExternalPredicate,
        state: &mut TargetState,
    ) -> Result<(), StageFailure> {
        let toolchain = &self.toolchain;

        match stage {
            TransformationStage::Resolve { extensions } => {
                let entry = entry_identifier(&target.entry_point);
                state.entry = toolchain
                    .resolver
                    .resolve(&entry, &self.root_dir, extensions)?;

                let code = fs::read_to_string(&state.entry)
                    .map_err(|e| StageFailure::io(&state.entry, e))?;

                for identifier in import_specifiers(&code) {
                    if target.externalize && predicate.classify(&identifier) {
                        state.externals.insert(identifier);
                        continue;
                    }
                    let resolved = toolchain
                        .resolver
                        .resolve(&identifier, &state.entry, extensions)?;
                    debug!(
                        target = %target.id,
                        import = %identifier,
                        path = %resolved.display(),
                        "resolved import"
                    );
                }

                state.source = Some(SourceFile {
                    path: state.entry.clone(),
                    code,
                });
            }
            TransformationStage::Compile(options) => {
                let source = state.source.as_ref().ok_or_else(|| {
                    StageFailure::io(
                        &state.entry,
                        std::io::Error::new(std::io::ErrorKind::NotFound, "entry was not resolved"),
                    )
                })?;
                let compiled = toolchain.compiler.compile(source, options)?;
                state.code = compiled.code;
                state.declarations = compiled.declarations.unwrap_or_default();
            }
            TransformationStage::InjectRuntimeHelpers { version, options } => {
                state.code = toolchain.helpers.inject(&state.code, version, options);
            }
            TransformationStage::SubstituteEnvironment { bindings } => {
                state.code = toolchain.substitutor.substitute(&state.code, bindings);
            }
            TransformationStage::Minify(options) => {
                state.code = toolchain.minifier.minify(&state.code, options)?;
            }
        }

        Ok(())
    }

    /// Write the bundle and, for the declaration owner, its declarations
    fn emit(
        &self,
        target: &BuildTarget,
        state: &TargetState,
    ) -> Result<(PathBuf, Vec<u8>, Vec<PathBuf>), StageFailure> {
        let out_dir = self.out_dir();
        let output_path = out_dir.join(&target.output_path);
        let bytes = output::render(target, &state.code).into_bytes();

        write_file(&output_path, &bytes)?;

        let mut written = Vec::new();
        if let (true, Some(dir)) = (target.owns_declarations(), &target.declaration_dir) {
            let dir = out_dir.join(dir);
            for declaration in &state.declarations {
                let path = dir.join(&declaration.path);
                write_file(&path, declaration.contents.as_bytes())?;
                written.push(path);
            }
        }

        Ok((output_path, bytes, written))
    }
}

/// `src/index.ts` -> `./src/index.ts`, so the resolver treats it as a path
fn entry_identifier(entry: &Path) -> String {
    let raw = entry.to_string_lossy();
    if entry.is_absolute() || raw.starts_with("./") || raw.starts_with("../") {
        raw.into_owned()
    } else {
        format!("./{}", raw)
    }
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), StageFailure> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StageFailure::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| StageFailure::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_identifier() {
        assert_eq!(entry_identifier(Path::new("src/index.ts")), "./src/index.ts");
        assert_eq!(entry_identifier(Path::new("./src/index.ts")), "./src/index.ts");
        assert_eq!(entry_identifier(Path::new("../lib/index.ts")), "../lib/index.ts");
    }

    #[test]
    fn test_into_result_with_failures() {
        let report = BuildReport {
            artifacts: Vec::new(),
            failures: vec![StageError::new(
                "commonjs",
                StageName::Compile,
                crate::error::CompilationError::new("boom"),
            )],
            skipped: vec!["esmodule".to_string()],
            total_time: Duration::ZERO,
        };
        assert!(!report.is_success());

        let err = report.into_result().unwrap_err();
        assert_eq!(err.failed_targets(), vec!["commonjs"]);
        assert!(err.succeeded.is_empty());
    }
}
