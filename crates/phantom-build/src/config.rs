//! Build configuration
//!
//! Options come from three places, lowest priority first:
//! 1. Built-in defaults
//! 2. The `[build]` table of `phantom.toml`
//! 3. Explicit overrides (CLI flags, builder methods)

use crate::error::{BuildError, BuildResult};
use crate::targets::PlanOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name looked up in the project root
pub const CONFIG_FILE: &str = "phantom.toml";

/// Options for one build run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Manifest path, relative to the project root
    pub manifest_path: PathBuf,
    /// Library entry point, relative to the project root
    pub entry_point: PathBuf,
    /// Directory all artifact paths are relative to
    pub out_dir: PathBuf,
    /// Run targets on the thread pool
    pub parallel: bool,
    /// Skip remaining targets after the first failure
    pub fail_fast: bool,
    /// Wall-clock limit per target
    pub target_timeout: Option<Duration>,
    pub file_stem: String,
    pub global_name: String,
    /// Shared declaration directory
    pub declaration_dir: PathBuf,
    /// Extensions probed when resolving imports
    pub extensions: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let plan = PlanOptions::default();
        Self {
            manifest_path: PathBuf::from("package.json"),
            entry_point: plan.entry_point,
            out_dir: PathBuf::from("."),
            parallel: true,
            fail_fast: false,
            target_timeout: None,
            file_stem: plan.file_stem,
            global_name: plan.global_name,
            declaration_dir: plan.declaration_dir,
            extensions: vec![".ts".to_string()],
        }
    }
}

/// `phantom.toml` layout
#[derive(Debug, Default, Deserialize, Serialize)]
struct ConfigFile {
    #[serde(default)]
    build: BuildSection,
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
struct BuildSection {
    out_dir: Option<PathBuf>,
    entry: Option<PathBuf>,
    manifest: Option<PathBuf>,
    parallel: Option<bool>,
    fail_fast: Option<bool>,
    timeout_secs: Option<u64>,
    file_stem: Option<String>,
    global_name: Option<String>,
    declaration_dir: Option<PathBuf>,
    extensions: Option<Vec<String>>,
}

impl BuildConfig {
    /// Parse a `phantom.toml` document on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(content)?;
        Ok(Self::default().merge(file.build))
    }

    /// Load a `phantom.toml` file
    pub fn from_file(path: &Path) -> BuildResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        Self::from_toml_str(&content).map_err(|e| BuildError::config(path, e.message()))
    }

    /// Load `phantom.toml` from a project root, or the defaults if there is none
    pub fn discover(root_dir: &Path) -> BuildResult<Self> {
        let path = root_dir.join(CONFIG_FILE);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    fn merge(mut self, section: BuildSection) -> Self {
        if let Some(out_dir) = section.out_dir {
            self.out_dir = out_dir;
        }
        if let Some(entry) = section.entry {
            self.entry_point = entry;
        }
        if let Some(manifest) = section.manifest {
            self.manifest_path = manifest;
        }
        if let Some(parallel) = section.parallel {
            self.parallel = parallel;
        }
        if let Some(fail_fast) = section.fail_fast {
            self.fail_fast = fail_fast;
        }
        if let Some(secs) = section.timeout_secs {
            self.target_timeout = Some(Duration::from_secs(secs));
        }
        if let Some(stem) = section.file_stem {
            self.file_stem = stem;
        }
        if let Some(name) = section.global_name {
            self.global_name = name;
        }
        if let Some(dir) = section.declaration_dir {
            self.declaration_dir = dir;
        }
        if let Some(extensions) = section.extensions {
            self.extensions = extensions;
        }
        self
    }

    pub fn with_entry_point(mut self, entry: impl Into<PathBuf>) -> Self {
        self.entry_point = entry.into();
        self
    }

    pub fn with_manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.target_timeout = Some(timeout);
        self
    }

    /// Options for [`crate::targets::build_targets`]
    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            entry_point: self.entry_point.clone(),
            file_stem: self.file_stem.clone(),
            global_name: self.global_name.clone(),
            declaration_dir: self.declaration_dir.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.manifest_path, PathBuf::from("package.json"));
        assert_eq!(config.entry_point, PathBuf::from("src/index.ts"));
        assert!(config.parallel);
        assert!(!config.fail_fast);
        assert_eq!(config.target_timeout, None);
        assert_eq!(config.extensions, vec![".ts".to_string()]);
    }

    #[test]
    fn test_build_table_overrides_defaults() {
        let config = BuildConfig::from_toml_str(
            r#"
[build]
out_dir = "build"
fail_fast = true
timeout_secs = 30
global_name = "Ghost"
extensions = [".ts", ".tsx"]
"#,
        )
        .unwrap();

        assert_eq!(config.out_dir, PathBuf::from("build"));
        assert!(config.fail_fast);
        assert!(config.parallel);
        assert_eq!(config.target_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.plan_options().global_name, "Ghost");
        assert_eq!(config.plan_options().file_stem, "phantom");
        assert_eq!(config.extensions.len(), 2);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(BuildConfig::from_toml_str("").unwrap(), BuildConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(BuildConfig::from_toml_str("[build]\nminify_all = true\n").is_err());
    }

    #[test]
    fn test_discover_without_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(BuildConfig::discover(dir.path()).unwrap(), BuildConfig::default());
    }

    #[test]
    fn test_from_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "[build]\nparallel = \"yes\"\n").unwrap();

        let err = BuildConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, BuildError::Config { .. }));
        assert!(err.to_string().contains("phantom.toml"));
    }
}
