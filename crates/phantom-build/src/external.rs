//! External module classification
//!
//! Decides which import identifiers stay out of a bundle. A module is
//! external when it is one of the manifest's direct or peer dependencies, or
//! a sub-path import of one (`react-dom/client`). Names are compared as
//! literal text, so characters like `.`, `+` or `*` in a package name never
//! act as wildcards.

use phantom_package::DependencyManifest;
use std::collections::BTreeSet;

/// Pure predicate over module identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalPredicate {
    /// No dependencies declared: every module is bundled
    Nothing,
    /// Exact names (and their sub-paths) are external
    Packages(BTreeSet<String>),
}

impl ExternalPredicate {
    /// Build the predicate from the union of direct and peer dependencies
    pub fn from_manifest(manifest: &DependencyManifest) -> Self {
        Self::from_names(manifest.external_names())
    }

    /// Build the predicate from an arbitrary name list.
    ///
    /// Empty names are dropped: `""` would otherwise make every absolute
    /// path (`/x`) external. Manifests with an empty dependency key are
    /// rejected when loaded.
    pub fn from_names<I>(names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let names: BTreeSet<String> = names
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| !name.is_empty())
            .collect();

        if names.is_empty() {
            Self::Nothing
        } else {
            Self::Packages(names)
        }
    }

    /// Whether the predicate can never match
    pub fn is_degenerate(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// Classify one identifier
    pub fn classify(&self, identifier: &str) -> bool {
        let names = match self {
            Self::Nothing => return false,
            Self::Packages(names) => names,
        };

        if names.contains(identifier) {
            return true;
        }

        // Every '/' splits a candidate package name from a sub-path.
        // Scoped packages (`@scope/pkg/sub`) are covered by the later splits.
        identifier
            .match_indices('/')
            .any(|(idx, _)| names.contains(&identifier[..idx]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_is_degenerate() {
        let predicate = ExternalPredicate::from_names(Vec::<String>::new());
        assert!(predicate.is_degenerate());
        assert!(!predicate.classify(""));
        assert!(!predicate.classify("react"));
    }

    #[test]
    fn test_empty_names_are_ignored() {
        let predicate = ExternalPredicate::from_names([""]);
        assert!(predicate.is_degenerate());
    }

    #[test]
    fn test_scoped_package_sub_path() {
        let predicate = ExternalPredicate::from_names(["@babel/runtime"]);
        assert!(predicate.classify("@babel/runtime"));
        assert!(predicate.classify("@babel/runtime/helpers/extends"));
        assert!(!predicate.classify("@babel"));
        assert!(!predicate.classify("@babel/runtime-corejs3"));
    }
}
