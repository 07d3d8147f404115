/// Build target matrix and plan construction
use crate::error::PlanConfigurationError;
use crate::external::ExternalPredicate;
use phantom_package::DependencyManifest;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// The artifact flavours Phantom knows how to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetFormat {
    /// CommonJS bundle published under an experimental path
    Experimental,
    /// CommonJS bundle for Node consumers
    #[serde(rename = "commonjs")]
    CommonJs,
    /// Native ES module for bundler consumers
    #[serde(rename = "esmodule")]
    EsModule,
    /// Self-contained, minified ES module for browsers
    #[serde(rename = "esmodule-browser")]
    EsModuleBrowser,
    /// UMD bundle with development checks kept
    UmdDev,
    /// Minified UMD bundle
    UmdProd,
}

impl TargetFormat {
    /// All formats in plan order
    pub const ALL: [TargetFormat; 6] = [
        Self::Experimental,
        Self::CommonJs,
        Self::EsModule,
        Self::EsModuleBrowser,
        Self::UmdDev,
        Self::UmdProd,
    ];

    /// Stable identifier, also used as the target id in the default plan
    pub fn id(&self) -> &'static str {
        match self {
            Self::Experimental => "experimental",
            Self::CommonJs => "commonjs",
            Self::EsModule => "esmodule",
            Self::EsModuleBrowser => "esmodule-browser",
            Self::UmdDev => "umd-dev",
            Self::UmdProd => "umd-prod",
        }
    }

    /// Module system of the emitted file
    pub fn module_format(&self) -> ModuleFormat {
        match self {
            Self::Experimental | Self::CommonJs => ModuleFormat::CommonJs,
            Self::EsModule | Self::EsModuleBrowser => ModuleFormat::EsModule,
            Self::UmdDev | Self::UmdProd => ModuleFormat::Umd,
        }
    }

    /// Export wrapping modes this format accepts
    pub fn legal_exports_modes(&self) -> &'static [ExportsMode] {
        match self {
            Self::Experimental | Self::CommonJs | Self::UmdDev | Self::UmdProd => {
                &[ExportsMode::Named, ExportsMode::Auto]
            }
            Self::EsModule => &[ExportsMode::Auto],
            Self::EsModuleBrowser => &[ExportsMode::None],
        }
    }

    /// Whether inline helpers are replaced by imports of the shared runtime
    pub fn uses_runtime_helpers(&self) -> bool {
        matches!(self, Self::Experimental | Self::CommonJs | Self::EsModule)
    }

    /// Whether runtime helpers are imported from their ES module build
    pub fn uses_module_helpers(&self) -> bool {
        matches!(self, Self::EsModule)
    }
}

impl std::fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Module system of an emitted file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    CommonJs,
    EsModule,
    Umd,
}

/// How exports are exposed by the module envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportsMode {
    Named,
    Auto,
    None,
}

impl std::fmt::Display for ExportsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named => write!(f, "named"),
            Self::Auto => write!(f, "auto"),
            Self::None => write!(f, "none"),
        }
    }
}

/// Value substituted for `process.env.NODE_ENV`, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentMode {
    Development,
    Production,
    None,
}

impl EnvironmentMode {
    /// The environment name, or `None` when guards are left for downstream bundlers
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Self::Development => Some("development"),
            Self::Production => Some("production"),
            Self::None => None,
        }
    }
}

/// Language level requested from the compiler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageLevel {
    /// Whatever the project's compiler settings say
    #[default]
    Default,
    Es2019,
}

/// One artifact configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    /// Target id (unique within a plan)
    pub id: String,
    pub format: TargetFormat,
    /// Library entry point, relative to the project root
    pub entry_point: PathBuf,
    /// Bundle path, relative to the output directory
    pub output_path: PathBuf,
    pub exports_mode: ExportsMode,
    /// Leave manifest dependencies as imports instead of bundling them
    pub externalize: bool,
    pub environment_mode: EnvironmentMode,
    pub minify: bool,
    /// Ask the compiler for declarations (and so type-check their emit)
    pub emits_declarations: bool,
    /// Where declarations are written, relative to the output directory.
    /// Only the declaration owner of a directory sets this.
    pub declaration_dir: Option<PathBuf>,
    pub language_level: LanguageLevel,
    /// Global variable name for UMD bundles
    pub global_name: Option<String>,
}

impl BuildTarget {
    /// Create a target with conservative defaults: nothing externalized,
    /// no substitution, no minification, no declarations.
    pub fn new(
        id: impl Into<String>,
        format: TargetFormat,
        entry_point: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            id: id.into(),
            format,
            entry_point: entry_point.into(),
            output_path: output_path.into(),
            exports_mode: format.legal_exports_modes()[0],
            externalize: false,
            environment_mode: EnvironmentMode::None,
            minify: false,
            emits_declarations: false,
            declaration_dir: None,
            language_level: LanguageLevel::Default,
            global_name: None,
        }
    }

    pub fn with_exports(mut self, mode: ExportsMode) -> Self {
        self.exports_mode = mode;
        self
    }

    pub fn with_externalize(mut self, externalize: bool) -> Self {
        self.externalize = externalize;
        self
    }

    pub fn with_environment(mut self, mode: EnvironmentMode) -> Self {
        self.environment_mode = mode;
        self
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    /// Emit declarations and write them into the given directory
    pub fn with_declarations(mut self, dir: impl Into<PathBuf>) -> Self {
        self.emits_declarations = true;
        self.declaration_dir = Some(dir.into());
        self
    }

    /// Emit declarations while compiling, but leave writing them to the owner
    pub fn with_declaration_emit(mut self) -> Self {
        self.emits_declarations = true;
        self.declaration_dir = None;
        self
    }

    /// Whether this target writes a declaration directory
    pub fn owns_declarations(&self) -> bool {
        self.emits_declarations && self.declaration_dir.is_some()
    }

    pub fn with_language_level(mut self, level: LanguageLevel) -> Self {
        self.language_level = level;
        self
    }

    pub fn with_global_name(mut self, name: impl Into<String>) -> Self {
        self.global_name = Some(name.into());
        self
    }

    /// Check the invariants that concern this target alone
    pub fn validate(&self) -> Result<(), PlanConfigurationError> {
        if self.id.is_empty() {
            return Err(PlanConfigurationError::EmptyTargetId);
        }

        if !self.format.legal_exports_modes().contains(&self.exports_mode) {
            return Err(PlanConfigurationError::IllegalExportsMode {
                target: self.id.clone(),
                mode: self.exports_mode.to_string(),
                format: self.format.to_string(),
            });
        }

        if self.minify && self.environment_mode == EnvironmentMode::None {
            return Err(PlanConfigurationError::MinifyWithoutEnvironment(
                self.id.clone(),
            ));
        }

        if self.declaration_dir.is_some() && !self.emits_declarations {
            return Err(PlanConfigurationError::DeclarationDirWithoutEmit(
                self.id.clone(),
            ));
        }

        if self.format.module_format() == ModuleFormat::Umd {
            match &self.global_name {
                None => return Err(PlanConfigurationError::MissingGlobalName(self.id.clone())),
                Some(name) if !is_identifier(name) => {
                    return Err(PlanConfigurationError::InvalidGlobalName {
                        target: self.id.clone(),
                        name: name.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Inputs that shape the default matrix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    /// Library entry point, relative to the project root
    pub entry_point: PathBuf,
    /// File name (without extension) shared by every bundle
    pub file_stem: String,
    /// UMD global name
    pub global_name: String,
    /// Shared declaration directory, written by the CommonJS target
    pub declaration_dir: PathBuf,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            entry_point: PathBuf::from("src/index.ts"),
            file_stem: "phantom".to_string(),
            global_name: "Phantom".to_string(),
            declaration_dir: PathBuf::from("types"),
        }
    }
}

/// Ordered, validated set of targets for one build run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    targets: Vec<BuildTarget>,
    /// Declaration directory -> id of the single target writing it
    declaration_owners: BTreeMap<PathBuf, String>,
}

impl BuildPlan {
    /// Validate a target list and freeze it into a plan
    pub fn new(targets: Vec<BuildTarget>) -> Result<Self, PlanConfigurationError> {
        if targets.is_empty() {
            return Err(PlanConfigurationError::EmptyPlan);
        }

        let mut ids = HashSet::new();
        let mut outputs: HashMap<PathBuf, &str> = HashMap::new();
        let mut declaration_owners: BTreeMap<PathBuf, String> = BTreeMap::new();

        for target in &targets {
            target.validate()?;

            if !ids.insert(target.id.as_str()) {
                return Err(PlanConfigurationError::DuplicateTargetId(target.id.clone()));
            }

            if let Some(first) = outputs.insert(normalize(&target.output_path), &target.id) {
                return Err(PlanConfigurationError::DuplicateOutputPath {
                    path: target.output_path.clone(),
                    first: first.to_string(),
                    second: target.id.clone(),
                });
            }

            if let (true, Some(dir)) = (target.owns_declarations(), &target.declaration_dir) {
                let dir = normalize(dir);
                if let Some(owner) = declaration_owners.get(&dir) {
                    return Err(PlanConfigurationError::DuplicateDeclarationOwner {
                        dir,
                        owner: owner.clone(),
                        other: target.id.clone(),
                    });
                }
                declaration_owners.insert(dir, target.id.clone());
            }
        }

        Ok(Self {
            targets,
            declaration_owners,
        })
    }

    /// Targets in plan order
    pub fn targets(&self) -> &[BuildTarget] {
        &self.targets
    }

    /// Look up a target by id
    pub fn get(&self, id: &str) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// The target that owns a declaration directory
    pub fn declaration_owner(&self, dir: &Path) -> Option<&str> {
        self.declaration_owners.get(&normalize(dir)).map(String::as_str)
    }

    /// All declaration directories with their owners, keyed by normalized path
    pub fn declaration_owners(&self) -> &BTreeMap<PathBuf, String> {
        &self.declaration_owners
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Lexical path normalization: drops `.` and folds `name/..`
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir
                if matches!(out.components().next_back(), Some(Component::Normal(_))) =>
            {
                out.pop();
            }
            Component::ParentDir if out.has_root() => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Build the fixed six-target plan for one run.
///
/// Node-facing targets (experimental, commonjs, esmodule) keep dependencies
/// external and leave `process.env.NODE_ENV` guards for the consumer's own
/// bundler. Browser and UMD targets inline everything and resolve the
/// environment up front, since nothing downstream is guaranteed to.
pub fn build_targets(
    manifest: &DependencyManifest,
    options: &PlanOptions,
) -> Result<BuildPlan, PlanConfigurationError> {
    let entry = &options.entry_point;
    let stem = &options.file_stem;
    let bundle = |dir: &str, ext: &str| PathBuf::from(dir).join(format!("{}.{}", stem, ext));

    let targets = vec![
        BuildTarget::new("experimental", TargetFormat::Experimental, entry, bundle("x", "js"))
            .with_exports(ExportsMode::Named)
            .with_externalize(true)
            .with_declaration_emit(),
        BuildTarget::new("commonjs", TargetFormat::CommonJs, entry, bundle("lib", "js"))
            .with_exports(ExportsMode::Named)
            .with_externalize(true)
            .with_declarations(&options.declaration_dir),
        BuildTarget::new("esmodule", TargetFormat::EsModule, entry, bundle("es", "js"))
            .with_exports(ExportsMode::Auto)
            .with_externalize(true),
        BuildTarget::new(
            "esmodule-browser",
            TargetFormat::EsModuleBrowser,
            entry,
            bundle("es", "mjs"),
        )
        .with_exports(ExportsMode::None)
        .with_environment(EnvironmentMode::Production)
        .with_minify(true)
        .with_language_level(LanguageLevel::Es2019),
        BuildTarget::new("umd-dev", TargetFormat::UmdDev, entry, bundle("dist", "js"))
            .with_exports(ExportsMode::Named)
            .with_environment(EnvironmentMode::Development)
            .with_global_name(&options.global_name),
        BuildTarget::new("umd-prod", TargetFormat::UmdProd, entry, bundle("dist", "min.js"))
            .with_exports(ExportsMode::Named)
            .with_environment(EnvironmentMode::Production)
            .with_minify(true)
            .with_language_level(LanguageLevel::Es2019)
            .with_global_name(&options.global_name),
    ];

    let plan = BuildPlan::new(targets)?;

    if ExternalPredicate::from_manifest(manifest).is_degenerate() {
        for target in plan.targets().iter().filter(|t| t.externalize) {
            warn!(
                target = %target.id,
                "manifest declares no dependencies; nothing will be externalized"
            );
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ids_are_distinct() {
        let ids: HashSet<&str> = TargetFormat::ALL.iter().map(|f| f.id()).collect();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn test_new_target_defaults_are_valid() {
        for format in TargetFormat::ALL {
            let mut target = BuildTarget::new(format.id(), format, "src/index.ts", "out.js");
            if format.module_format() == ModuleFormat::Umd {
                target = target.with_global_name("Lib");
            }
            assert!(target.validate().is_ok(), "{} defaults invalid", format);
        }
    }

    #[test]
    fn test_minify_requires_environment() {
        let target = BuildTarget::new("t", TargetFormat::EsModuleBrowser, "a.ts", "a.mjs")
            .with_minify(true);
        assert_eq!(
            target.validate(),
            Err(PlanConfigurationError::MinifyWithoutEnvironment("t".into()))
        );
    }

    #[test]
    fn test_browser_module_rejects_export_wrapping() {
        let target = BuildTarget::new("t", TargetFormat::EsModuleBrowser, "a.ts", "a.mjs")
            .with_exports(ExportsMode::Named);
        assert!(matches!(
            target.validate(),
            Err(PlanConfigurationError::IllegalExportsMode { .. })
        ));
    }

    #[test]
    fn test_umd_requires_global_name() {
        let target = BuildTarget::new("t", TargetFormat::UmdDev, "a.ts", "a.js");
        assert_eq!(
            target.validate(),
            Err(PlanConfigurationError::MissingGlobalName("t".into()))
        );
    }

    #[test]
    fn test_umd_global_name_must_be_identifier() {
        let target = BuildTarget::new("t", TargetFormat::UmdProd, "a.ts", "a.js")
            .with_global_name("my-lib");
        assert!(matches!(
            target.validate(),
            Err(PlanConfigurationError::InvalidGlobalName { .. })
        ));
        assert!(target.with_global_name("$myLib_2").validate().is_ok());
    }

    #[test]
    fn test_declaration_emit_without_writing() {
        let target = BuildTarget::new("t", TargetFormat::CommonJs, "a.ts", "a.js")
            .with_declaration_emit();
        assert!(target.emits_declarations);
        assert!(!target.owns_declarations());
        assert!(target.validate().is_ok());

        let mut orphan = target.clone();
        orphan.emits_declarations = false;
        orphan.declaration_dir = Some(PathBuf::from("types"));
        assert_eq!(
            orphan.validate(),
            Err(PlanConfigurationError::DeclarationDirWithoutEmit("t".into()))
        );
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("./types")), PathBuf::from("types"));
        assert_eq!(normalize(Path::new("lib/../es/./a.js")), PathBuf::from("es/a.js"));
        assert_eq!(normalize(Path::new("../out")), PathBuf::from("../out"));
        assert_eq!(normalize(Path::new("/../abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn test_environment_names() {
        assert_eq!(EnvironmentMode::Development.name(), Some("development"));
        assert_eq!(EnvironmentMode::Production.name(), Some("production"));
        assert_eq!(EnvironmentMode::None.name(), None);
    }
}
