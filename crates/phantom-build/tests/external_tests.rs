//! External classification properties

use phantom_build::{DependencyManifest, ExternalPredicate};
use proptest::prelude::*;
use rstest::rstest;

fn react_manifest() -> DependencyManifest {
    DependencyManifest::new(["react"], ["react-dom"], "7.9.2")
}

#[rstest]
#[case("react", true)]
#[case("react-dom", true)]
#[case("react-dom/client", true)]
#[case("react/jsx-runtime", true)]
#[case("lodash", false)]
#[case("reactive", false)]
#[case("react-domx", false)]
#[case("./react", false)]
fn test_react_manifest(#[case] identifier: &str, #[case] expected: bool) {
    let predicate = ExternalPredicate::from_manifest(&react_manifest());
    assert_eq!(predicate.classify(identifier), expected, "{}", identifier);
}

#[test]
fn test_special_characters_are_literal() {
    let predicate = ExternalPredicate::from_names(["lodash.get", "c++", "@scope/pkg"]);

    assert!(predicate.classify("lodash.get"));
    assert!(!predicate.classify("lodashxget"));
    assert!(predicate.classify("c++"));
    assert!(!predicate.classify("cc"));
    assert!(predicate.classify("@scope/pkg/deep/file"));
    assert!(!predicate.classify("@scope/pkgx"));
    assert!(!predicate.classify("@scope"));
}

#[test]
fn test_manifest_without_dependencies_is_degenerate() {
    let manifest = DependencyManifest::new(Vec::<String>::new(), Vec::<String>::new(), "7.0.0");
    assert!(ExternalPredicate::from_manifest(&manifest).is_degenerate());
}

fn name() -> impl Strategy<Value = String> {
    "(@[a-z]{1,4}/)?[a-z.+*?()\\[\\]-]{1,8}"
}

fn oracle(names: &[String], identifier: &str) -> bool {
    names
        .iter()
        .any(|d| identifier == d || identifier.starts_with(&format!("{}/", d)))
}

proptest! {
    #[test]
    fn classify_matches_definition(
        names in proptest::collection::vec(name(), 0..6),
        identifier in "(@[a-z]{1,4}/)?[a-z.+*?()\\[\\]/-]{0,12}",
    ) {
        let predicate = ExternalPredicate::from_names(names.clone());
        prop_assert_eq!(predicate.classify(&identifier), oracle(&names, &identifier));
    }

    #[test]
    fn declared_names_and_subpaths_are_external(
        names in proptest::collection::vec(name(), 1..6),
        pick in any::<prop::sample::Index>(),
        suffix in "[a-z]{1,6}",
    ) {
        let predicate = ExternalPredicate::from_names(names.clone());
        let chosen = pick.get(&names);
        prop_assert!(predicate.classify(chosen));
        let subpath = format!("{}/{}", chosen, suffix);
        prop_assert!(predicate.classify(&subpath));
    }

    #[test]
    fn empty_set_never_matches(identifier in ".*") {
        let predicate = ExternalPredicate::from_names(Vec::<String>::new());
        prop_assert!(!predicate.classify(&identifier));
    }
}
