//! Filesystem module resolution

use super::lexical::{self, SegmentKind};
use super::Resolver;
use crate::error::NotFound;
use regex::Regex;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Node-style resolver.
///
/// Relative and absolute identifiers are resolved against the importing
/// file, trying the path as written, then each extension appended, then
/// `index` + extension inside a directory. Bare identifiers are looked up in
/// `node_modules` directories from the importer upwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsResolver;

impl Resolver for FsResolver {
    fn resolve(
        &self,
        identifier: &str,
        from: &Path,
        extensions: &[String],
    ) -> Result<PathBuf, NotFound> {
        let base_dir = if from.is_dir() {
            from
        } else {
            from.parent().unwrap_or_else(|| Path::new("."))
        };

        let found = if is_path_like(identifier) {
            probe(&base_dir.join(identifier), extensions)
        } else {
            base_dir.ancestors().find_map(|dir| {
                let candidate = dir.join("node_modules").join(identifier);
                probe(&candidate, extensions).or_else(|| candidate.is_dir().then_some(candidate))
            })
        };

        // `a/./b` -> `a/b`
        found
            .map(|path| path.components().collect())
            .ok_or_else(|| NotFound {
                identifier: identifier.to_string(),
                from: from.to_path_buf(),
            })
    }
}

fn is_path_like(identifier: &str) -> bool {
    identifier.starts_with("./")
        || identifier.starts_with("../")
        || identifier == "."
        || identifier == ".."
        || Path::new(identifier).is_absolute()
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}

fn probe(candidate: &Path, extensions: &[String]) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }

    extensions
        .iter()
        .map(|ext| with_suffix(candidate, ext))
        .chain(
            extensions
                .iter()
                .map(|ext| candidate.join(format!("index{}", ext))),
        )
        .find(|path| path.is_file())
}

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"\b(?:import|export)\b[^;'"]*?\bfrom\s*["']([^"'\n]+)["']|\bimport\s*\(?\s*["']([^"'\n]+)["']|\brequire\s*\(\s*["']([^"'\n]+)["']\s*\)"#,
        )
        .expect("import pattern is valid")
    })
}

/// Identifiers a module imports directly (`import`, `export ... from`,
/// dynamic `import()` and `require()`), ignoring strings and comments.
pub fn import_specifiers(code: &str) -> BTreeSet<String> {
    let segments = lexical::scan(code).ok();

    import_pattern()
        .captures_iter(code)
        .filter(|caps| {
            let start = caps.get(0).map_or(0, |m| m.start());
            segments.as_ref().map_or(true, |segments| {
                segments
                    .iter()
                    .any(|s| s.kind == SegmentKind::Code && s.range.contains(&start))
            })
        })
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec![".ts".to_string()]
    }

    #[test]
    fn test_relative_with_extension_probe() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.ts"), "").unwrap();
        fs::write(dir.path().join("src/util.ts"), "").unwrap();

        let from = dir.path().join("src/index.ts");
        let resolved = FsResolver.resolve("./util", &from, &exts()).unwrap();
        assert_eq!(resolved, dir.path().join("src/util.ts"));
        assert!(!resolved.to_string_lossy().contains("/./"));
    }

    #[test]
    fn test_directory_index() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/store")).unwrap();
        fs::write(dir.path().join("src/store/index.ts"), "").unwrap();

        let resolved = FsResolver
            .resolve("./src/store", dir.path(), &exts())
            .unwrap();
        assert!(resolved.ends_with("store/index.ts"));
    }

    #[test]
    fn test_bare_identifier_in_node_modules() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/tiny-invariant")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();

        let from = dir.path().join("src/index.ts");
        let resolved = FsResolver.resolve("tiny-invariant", &from, &exts()).unwrap();
        assert_eq!(resolved, dir.path().join("node_modules/tiny-invariant"));
    }

    #[test]
    fn test_import_specifiers() {
        let code = r#"import React from 'react';
import { render } from "react-dom/client";
export { a } from './a';
import './styles';
// import nope from 'commented';
const lazy = import('./lazy');
const legacy = require("legacy");
const text = "import x from 'string'";
"#;
        let found: Vec<String> = import_specifiers(code).into_iter().collect();
        assert_eq!(
            found,
            vec!["./a", "./lazy", "./styles", "legacy", "react", "react-dom/client"]
        );
    }

    #[test]
    fn test_not_found() {
        let dir = TempDir::new().unwrap();
        let err = FsResolver
            .resolve("./missing", dir.path(), &exts())
            .unwrap_err();
        assert_eq!(err.identifier, "./missing");
    }
}
