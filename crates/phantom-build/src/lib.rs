//! Phantom build engine
//!
//! Turns a library entry point into the six distributable bundles:
//! - External module classification from the dependency manifest
//! - The build-target matrix and plan validation
//! - Per-target transformation pipelines
//! - Parallel orchestration with per-target failure reporting

pub mod builder;
pub mod config;
pub mod error;
pub mod external;
pub mod output;
pub mod pipeline;
pub mod targets;
pub mod toolchain;

// Re-export main types
pub use builder::{BuildArtifact, BuildOrchestrator, BuildReport};
pub use config::{BuildConfig, CONFIG_FILE};
pub use error::{
    BuildError, BuildResult, CompilationError, MinifyError, NotFound, OrchestratorError,
    PlanConfigurationError, SourceLocation, StageError, StageFailure,
};
pub use external::ExternalPredicate;
pub use pipeline::{compose, PipelineContext, StageName, TransformationStage};
pub use targets::{
    build_targets, BuildPlan, BuildTarget, EnvironmentMode, ExportsMode, LanguageLevel,
    ModuleFormat, PlanOptions, TargetFormat,
};
pub use toolchain::Toolchain;

// Re-export phantom-package types for convenience
pub use phantom_package::{DependencyManifest, ManifestError};
