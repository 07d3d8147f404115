//! Collaborator interfaces used by the transformation stages
//!
//! Each stage delegates the real work to one of these traits. The engine only
//! decides which stages run, in which order and with which options. The
//! built-in implementations are small and deterministic; projects with a real
//! compiler or minifier plug theirs in through [`Toolchain`].

pub mod compiler;
pub mod helpers;
mod lexical;
pub mod minify;
pub mod resolver;
pub mod substitute;

pub use compiler::PassthroughCompiler;
pub use helpers::BabelRuntimeInjector;
pub use minify::CompactMinifier;
pub use resolver::{import_specifiers, FsResolver};
pub use substitute::LiteralSubstitutor;

use crate::error::{CompilationError, MinifyError, NotFound};
use crate::targets::LanguageLevel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A module's path and text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub code: String,
}

/// Options passed to [`Compiler::compile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    pub emit_declarations: bool,
    pub language_level: LanguageLevel,
}

/// A type declaration file, path relative to the declaration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub path: PathBuf,
    pub contents: String,
}

/// Result of compiling one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    pub code: String,
    /// Present only when declarations were requested
    pub declarations: Option<Vec<Declaration>>,
}

/// Options passed to [`RuntimeHelperInjector::inject`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperOptions {
    /// Reference the ES module build of the helpers
    pub use_module_helpers: bool,
}

/// Options passed to [`Minifier::minify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinifyOptions {
    /// Property reads have no side effects
    pub pure_getters: bool,
    /// Allow transforms that assume standard built-ins
    pub unsafe_transforms: bool,
    /// Allow folding of comparisons between literals
    pub unsafe_comps: bool,
    pub warnings: bool,
}

impl Default for MinifyOptions {
    fn default() -> Self {
        Self {
            pure_getters: true,
            unsafe_transforms: true,
            unsafe_comps: true,
            warnings: false,
        }
    }
}

/// Maps import identifiers to module sources
pub trait Resolver: Send + Sync {
    fn resolve(&self, identifier: &str, from: &Path, extensions: &[String])
        -> Result<PathBuf, NotFound>;
}

/// Translates source to JavaScript, optionally emitting declarations
pub trait Compiler: Send + Sync {
    fn compile(
        &self,
        source: &SourceFile,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompilationError>;
}

/// Replaces inline helper code with references to a shared runtime package
pub trait RuntimeHelperInjector: Send + Sync {
    fn inject(&self, code: &str, helper_version: &str, options: &HelperOptions) -> String;
}

/// Replaces expressions with literal values
pub trait Substitutor: Send + Sync {
    fn substitute(&self, code: &str, bindings: &BTreeMap<String, String>) -> String;
}

/// Shrinks code
pub trait Minifier: Send + Sync {
    fn minify(&self, code: &str, options: &MinifyOptions) -> Result<String, MinifyError>;
}

/// The collaborators a build run uses
pub struct Toolchain {
    pub resolver: Box<dyn Resolver>,
    pub compiler: Box<dyn Compiler>,
    pub helpers: Box<dyn RuntimeHelperInjector>,
    pub substitutor: Box<dyn Substitutor>,
    pub minifier: Box<dyn Minifier>,
}

impl Toolchain {
    /// Replace the resolver
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Replace the compiler
    pub fn with_compiler(mut self, compiler: impl Compiler + 'static) -> Self {
        self.compiler = Box::new(compiler);
        self
    }

    /// Replace the runtime helper injector
    pub fn with_helpers(mut self, helpers: impl RuntimeHelperInjector + 'static) -> Self {
        self.helpers = Box::new(helpers);
        self
    }

    /// Replace the substitutor
    pub fn with_substitutor(mut self, substitutor: impl Substitutor + 'static) -> Self {
        self.substitutor = Box::new(substitutor);
        self
    }

    /// Replace the minifier
    pub fn with_minifier(mut self, minifier: impl Minifier + 'static) -> Self {
        self.minifier = Box::new(minifier);
        self
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            resolver: Box::new(FsResolver),
            compiler: Box::new(PassthroughCompiler),
            helpers: Box::new(BabelRuntimeInjector),
            substitutor: Box::new(LiteralSubstitutor),
            minifier: Box::new(CompactMinifier),
        }
    }
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain").finish_non_exhaustive()
    }
}
