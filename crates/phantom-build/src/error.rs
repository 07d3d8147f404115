/// Build engine error types
use crate::pipeline::StageName;
use phantom_package::ManifestError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

/// Top-level failure of a build run (before or around target execution)
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Invalid build plan: {0}")]
    Plan(#[from] PlanConfigurationError),

    #[error("Invalid configuration in {path}: {error}")]
    Config { path: PathBuf, error: String },

    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error(transparent)]
    Targets(#[from] OrchestratorError),
}

impl BuildError {
    /// Create a config error with path context
    pub fn config(path: impl Into<PathBuf>, error: impl ToString) -> Self {
        Self::Config {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}

/// Structural problem with a build plan, detected before any target runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanConfigurationError {
    #[error("Build plan has no targets")]
    EmptyPlan,

    #[error("Target id cannot be empty")]
    EmptyTargetId,

    #[error("Duplicate target id '{0}'")]
    DuplicateTargetId(String),

    #[error("Targets '{first}' and '{second}' both write {path}")]
    DuplicateOutputPath {
        path: PathBuf,
        first: String,
        second: String,
    },

    #[error(
        "Targets '{owner}' and '{other}' both emit declarations into {dir}; only one target may own a declaration directory"
    )]
    DuplicateDeclarationOwner {
        dir: PathBuf,
        owner: String,
        other: String,
    },

    #[error("Target '{0}' has a declaration directory but does not emit declarations")]
    DeclarationDirWithoutEmit(String),

    #[error("Target '{0}' enables minify without environment substitution")]
    MinifyWithoutEnvironment(String),

    #[error("Target '{target}' uses exports mode '{mode}', which is not valid for {format}")]
    IllegalExportsMode {
        target: String,
        mode: String,
        format: String,
    },

    #[error("UMD target '{0}' requires a global name")]
    MissingGlobalName(String),

    #[error("UMD target '{target}' has global name '{name}', which is not a JavaScript identifier")]
    InvalidGlobalName { target: String, name: String },
}

/// Source position inside a compiled file (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Failure reported by a compiler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{message}", location_prefix(.file, .location))]
pub struct CompilationError {
    pub message: String,
    pub file: Option<PathBuf>,
    pub location: Option<SourceLocation>,
}

impl CompilationError {
    /// Create a compilation error without position information
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            file: None,
            location: None,
        }
    }

    /// Attach the file being compiled
    pub fn in_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Attach a line/column position
    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.location = Some(SourceLocation { line, column });
        self
    }
}

fn location_prefix(file: &Option<PathBuf>, location: &Option<SourceLocation>) -> String {
    match (file, location) {
        (Some(file), Some(loc)) => format!("{}:{}: ", file.display(), loc),
        (Some(file), None) => format!("{}: ", file.display()),
        (None, Some(loc)) => format!("{}: ", loc),
        (None, None) => String::new(),
    }
}

/// Failure reported by a minifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct MinifyError(pub String);

/// Import that could not be mapped to a module source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot resolve '{identifier}' from {}", .from.display())]
pub struct NotFound {
    pub identifier: String,
    pub from: PathBuf,
}

/// Why a single stage failed
#[derive(Debug, Error)]
pub enum StageFailure {
    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error(transparent)]
    Compilation(#[from] CompilationError),

    #[error(transparent)]
    Minify(#[from] MinifyError),

    #[error("Timed out after {elapsed:.2?} (limit {limit:.2?})")]
    Timeout { elapsed: Duration, limit: Duration },

    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl StageFailure {
    /// Create an I/O failure with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }
}

/// A stage failure attributed to its target and stage
#[derive(Debug, Error)]
#[error("target '{target_id}' failed in {stage}: {cause}")]
pub struct StageError {
    pub target_id: String,
    pub stage: StageName,
    #[source]
    pub cause: StageFailure,
}

impl StageError {
    pub fn new(target_id: impl Into<String>, stage: StageName, cause: impl Into<StageFailure>) -> Self {
        Self {
            target_id: target_id.into(),
            stage,
            cause: cause.into(),
        }
    }
}

/// Every per-target failure from one run
#[derive(Debug, Error)]
#[error("{}", crate::output::format_failures(.failures))]
pub struct OrchestratorError {
    pub failures: Vec<StageError>,
    pub succeeded: Vec<PathBuf>,
}

impl OrchestratorError {
    /// Ids of the failed targets, in plan order
    pub fn failed_targets(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.target_id.as_str()).collect()
    }
}
