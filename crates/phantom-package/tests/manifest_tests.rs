//! package.json manifest tests

use phantom_package::{DependencyManifest, ManifestError};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_full_manifest() {
    let manifest = DependencyManifest::from_json_str(
        r#"{
            "name": "phantom",
            "dependencies": { "react": "^18.0.0", "lodash": "4.17.21" },
            "peerDependencies": { "react-dom": "^18.0.0" },
            "devDependencies": { "@babel/runtime": "^7.9.2", "typescript": "^5.0.0" }
        }"#,
    )
    .unwrap();

    assert_eq!(manifest.name(), Some("phantom"));
    assert_eq!(manifest.dependencies().len(), 2);
    assert!(manifest.dependencies().contains("react"));
    assert!(manifest.peer_dependencies().contains("react-dom"));
    assert_eq!(manifest.runtime_helper_version(), "7.9.2");
}

#[test]
fn test_missing_dependency_tables_are_empty() {
    let manifest = DependencyManifest::from_json_str(
        r#"{ "devDependencies": { "@babel/runtime": "7.0.0" } }"#,
    )
    .unwrap();

    assert!(manifest.dependencies().is_empty());
    assert!(manifest.peer_dependencies().is_empty());
    assert!(manifest.external_names().is_empty());
}

#[test]
fn test_null_dependency_tables_are_empty() {
    let manifest = DependencyManifest::from_json_str(
        r#"{
            "dependencies": null,
            "peerDependencies": null,
            "devDependencies": { "@babel/runtime": "~7.12.1" }
        }"#,
    )
    .unwrap();

    assert!(manifest.external_names().is_empty());
    assert_eq!(manifest.runtime_helper_version(), "7.12.1");
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_runtime_helper_version() {
    let err = DependencyManifest::from_json_str(r#"{ "dependencies": {} }"#).unwrap_err();
    assert!(matches!(err, ManifestError::MissingField(ref f) if f.contains("@babel/runtime")));
}

#[rstest]
#[case(r#"{ "dependencies": ["react"], "devDependencies": { "@babel/runtime": "7.0.0" } }"#)]
#[case(r#"{ "peerDependencies": "react", "devDependencies": { "@babel/runtime": "7.0.0" } }"#)]
#[case("not json")]
fn test_malformed_dependency_fields(#[case] content: &str) {
    let err = DependencyManifest::from_json_str(content).unwrap_err();
    assert!(matches!(err, ManifestError::ParseError(_)));
}

#[rstest]
#[case(r#"{ "devDependencies": { "@babel/runtime": 7 } }"#)]
#[case(r#"{ "devDependencies": { "@babel/runtime": "latest" } }"#)]
fn test_invalid_runtime_helper_version(#[case] content: &str) {
    let err = DependencyManifest::from_json_str(content).unwrap_err();
    assert!(matches!(err, ManifestError::InvalidField { .. }));
}

#[rstest]
#[case(r#"{ "dependencies": { "": "1.0.0" }, "devDependencies": { "@babel/runtime": "7.0.0" } }"#, "dependencies")]
#[case(r#"{ "peerDependencies": { "": "*" }, "devDependencies": { "@babel/runtime": "7.0.0" } }"#, "peerDependencies")]
fn test_empty_dependency_name_is_rejected(#[case] content: &str, #[case] table: &str) {
    let err = DependencyManifest::from_json_str(content).unwrap_err();
    assert!(matches!(err, ManifestError::InvalidField { ref field, .. } if field == table));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_load_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("package.json");
    fs::write(
        &path,
        r#"{ "peerDependencies": { "vue": "^3" }, "devDependencies": { "@babel/runtime": "^7.20.0" } }"#,
    )
    .unwrap();

    let manifest = DependencyManifest::from_file(&path).unwrap();
    assert!(manifest.peer_dependencies().contains("vue"));
    assert_eq!(manifest.runtime_helper_version(), "7.20.0");
}

#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = DependencyManifest::from_file(&temp_dir.path().join("package.json")).unwrap_err();
    assert!(matches!(err, ManifestError::ReadError { .. }));
    assert!(err.to_string().contains("package.json"));
}
