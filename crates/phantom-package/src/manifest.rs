//! Dependency manifest parsing (package.json)

use crate::{ManifestError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Package whose version pins the shared runtime helpers
pub const RUNTIME_HELPER_PACKAGE: &str = "@babel/runtime";

/// On-disk shape of package.json, restricted to the fields we read
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPackageJson {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    dependencies: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    peer_dependencies: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    dev_dependencies: Option<BTreeMap<String, serde_json::Value>>,
}

/// Keys of a dependency table; an empty key is an error
fn dependency_names(
    field: &str,
    table: Option<BTreeMap<String, serde_json::Value>>,
) -> Result<BTreeSet<String>> {
    let names: BTreeSet<String> = table.unwrap_or_default().into_keys().collect();
    if names.contains("") {
        return Err(ManifestError::InvalidField {
            field: field.to_string(),
            reason: "empty package name".to_string(),
        });
    }
    Ok(names)
}

/// Immutable view of the dependency information for one build run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyManifest {
    name: Option<String>,
    dependencies: BTreeSet<String>,
    peer_dependencies: BTreeSet<String>,
    runtime_helper_version: String,
}

impl DependencyManifest {
    /// Create a manifest directly from name sets
    pub fn new<D, P>(
        dependencies: D,
        peer_dependencies: P,
        runtime_helper_version: impl Into<String>,
    ) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            name: None,
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            peer_dependencies: peer_dependencies.into_iter().map(Into::into).collect(),
            runtime_helper_version: runtime_helper_version.into(),
        }
    }

    /// Set the package name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Parse a manifest from package.json text
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawPackageJson = serde_json::from_str(content)?;

        let helper_spec = raw
            .dev_dependencies
            .as_ref()
            .and_then(|deps| deps.get(RUNTIME_HELPER_PACKAGE))
            .ok_or_else(|| {
                ManifestError::MissingField(format!(
                    "devDependencies.\"{}\"",
                    RUNTIME_HELPER_PACKAGE
                ))
            })?;

        let helper_spec = helper_spec.as_str().ok_or_else(|| ManifestError::InvalidField {
            field: format!("devDependencies.\"{}\"", RUNTIME_HELPER_PACKAGE),
            reason: "expected a version string".to_string(),
        })?;

        let runtime_helper_version = strip_range_prefix(helper_spec);
        if runtime_helper_version.is_empty() {
            return Err(ManifestError::InvalidField {
                field: format!("devDependencies.\"{}\"", RUNTIME_HELPER_PACKAGE),
                reason: format!("'{}' contains no version number", helper_spec),
            });
        }

        Ok(Self {
            name: raw.name,
            dependencies: dependency_names("dependencies", raw.dependencies)?,
            peer_dependencies: dependency_names("peerDependencies", raw.peer_dependencies)?,
            runtime_helper_version: runtime_helper_version.to_string(),
        })
    }

    /// Load a manifest from a package.json file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|error| ManifestError::ReadError {
            path: path.to_path_buf(),
            error,
        })?;
        Self::from_json_str(&content)
    }

    /// Package name, if declared
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Direct dependency names
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    /// Peer dependency names
    pub fn peer_dependencies(&self) -> &BTreeSet<String> {
        &self.peer_dependencies
    }

    /// Pinned runtime-helper version, range operators removed
    pub fn runtime_helper_version(&self) -> &str {
        &self.runtime_helper_version
    }

    /// Union of direct and peer dependency names, sorted and deduplicated
    pub fn external_names(&self) -> BTreeSet<&str> {
        self.dependencies
            .iter()
            .chain(self.peer_dependencies.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Drop everything before the first digit (`^7.9.2` -> `7.9.2`)
fn strip_range_prefix(spec: &str) -> &str {
    let start = spec
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(spec.len());
    &spec[start..]
}
