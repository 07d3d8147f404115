//! Per-target transformation pipelines
//!
//! [`compose`] turns one [`BuildTarget`] into the ordered list of stages the
//! orchestrator executes. Ordering rules:
//!
//! - Resolve and Compile always run, in that order
//! - InjectRuntimeHelpers only for targets that reference the shared runtime
//! - SubstituteEnvironment only when the target has an environment mode
//! - Minify only when requested, and always last

use crate::targets::BuildTarget;
use crate::toolchain::{CompileOptions, HelperOptions, MinifyOptions};
use phantom_package::DependencyManifest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Expression replaced by the environment name
pub const NODE_ENV_EXPRESSION: &str = "process.env.NODE_ENV";

/// Stage identifiers, as reported in failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageName {
    Resolve,
    Compile,
    InjectRuntimeHelpers,
    SubstituteEnvironment,
    Minify,
    /// Writing the artifact and its declarations
    Emit,
}

impl StageName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Compile => "compile",
            Self::InjectRuntimeHelpers => "inject-runtime-helpers",
            Self::SubstituteEnvironment => "substitute-environment",
            Self::Minify => "minify",
            Self::Emit => "emit",
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a target's pipeline with its options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "kebab-case")]
pub enum TransformationStage {
    Resolve {
        extensions: Vec<String>,
    },
    Compile(CompileOptions),
    InjectRuntimeHelpers {
        version: String,
        options: HelperOptions,
    },
    SubstituteEnvironment {
        bindings: BTreeMap<String, String>,
    },
    Minify(MinifyOptions),
}

impl TransformationStage {
    pub fn name(&self) -> StageName {
        match self {
            Self::Resolve { .. } => StageName::Resolve,
            Self::Compile(_) => StageName::Compile,
            Self::InjectRuntimeHelpers { .. } => StageName::InjectRuntimeHelpers,
            Self::SubstituteEnvironment { .. } => StageName::SubstituteEnvironment,
            Self::Minify(_) => StageName::Minify,
        }
    }
}

/// Run-wide inputs shared by every target's pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    /// Extensions probed when resolving imports
    pub extensions: Vec<String>,
    /// Pinned runtime helper version from the manifest
    pub runtime_helper_version: String,
}

impl PipelineContext {
    pub fn new(extensions: Vec<String>, runtime_helper_version: impl Into<String>) -> Self {
        Self {
            extensions,
            runtime_helper_version: runtime_helper_version.into(),
        }
    }

    pub fn from_manifest(manifest: &DependencyManifest, extensions: &[String]) -> Self {
        Self::new(extensions.to_vec(), manifest.runtime_helper_version())
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new(vec![".ts".to_string()], "7.0.0")
    }
}

/// Assemble the stage sequence for one target
pub fn compose(target: &BuildTarget, context: &PipelineContext) -> Vec<TransformationStage> {
    let mut stages = vec![
        TransformationStage::Resolve {
            extensions: context.extensions.clone(),
        },
        TransformationStage::Compile(CompileOptions {
            emit_declarations: target.emits_declarations,
            language_level: target.language_level,
        }),
    ];

    if target.format.uses_runtime_helpers() {
        stages.push(TransformationStage::InjectRuntimeHelpers {
            version: context.runtime_helper_version.clone(),
            options: HelperOptions {
                use_module_helpers: target.format.uses_module_helpers(),
            },
        });
    }

    if let Some(env) = target.environment_mode.name() {
        let mut bindings = BTreeMap::new();
        bindings.insert(
            NODE_ENV_EXPRESSION.to_string(),
            serde_json::Value::from(env).to_string(),
        );
        stages.push(TransformationStage::SubstituteEnvironment { bindings });
    }

    if target.minify {
        stages.push(TransformationStage::Minify(MinifyOptions::default()));
    }

    stages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::{EnvironmentMode, TargetFormat};

    fn names(stages: &[TransformationStage]) -> Vec<StageName> {
        stages.iter().map(TransformationStage::name).collect()
    }

    #[test]
    fn test_commonjs_pipeline() {
        let target = BuildTarget::new("commonjs", TargetFormat::CommonJs, "src/index.ts", "lib/a.js")
            .with_declarations("types");
        let stages = compose(&target, &PipelineContext::default());

        assert_eq!(
            names(&stages),
            vec![
                StageName::Resolve,
                StageName::Compile,
                StageName::InjectRuntimeHelpers
            ]
        );
        assert_eq!(
            stages[1],
            TransformationStage::Compile(CompileOptions {
                emit_declarations: true,
                language_level: target.language_level,
            })
        );
    }

    #[test]
    fn test_esmodule_uses_module_helpers() {
        let target = BuildTarget::new("esmodule", TargetFormat::EsModule, "src/index.ts", "es/a.js");
        let context = PipelineContext::new(vec![".ts".into()], "7.9.2");
        let stages = compose(&target, &context);

        assert_eq!(
            stages[2],
            TransformationStage::InjectRuntimeHelpers {
                version: "7.9.2".into(),
                options: HelperOptions {
                    use_module_helpers: true
                },
            }
        );
    }

    #[test]
    fn test_environment_binding_is_quoted() {
        let target = BuildTarget::new("umd-dev", TargetFormat::UmdDev, "src/index.ts", "dist/a.js")
            .with_environment(EnvironmentMode::Development)
            .with_global_name("Lib");
        let stages = compose(&target, &PipelineContext::default());

        let TransformationStage::SubstituteEnvironment { bindings } = &stages[2] else {
            panic!("expected substitution, got {:?}", stages[2]);
        };
        assert_eq!(bindings[NODE_ENV_EXPRESSION], "\"development\"");
    }

    #[test]
    fn test_minify_is_last() {
        let target = BuildTarget::new("umd-prod", TargetFormat::UmdProd, "src/index.ts", "dist/a.min.js")
            .with_environment(EnvironmentMode::Production)
            .with_minify(true)
            .with_global_name("Lib");
        let stages = compose(&target, &PipelineContext::default());

        assert_eq!(
            names(&stages),
            vec![
                StageName::Resolve,
                StageName::Compile,
                StageName::SubstituteEnvironment,
                StageName::Minify
            ]
        );
    }

    #[test]
    fn test_stage_name_display() {
        assert_eq!(StageName::InjectRuntimeHelpers.to_string(), "inject-runtime-helpers");
        assert_eq!(StageName::Minify.to_string(), "minify");
    }
}
