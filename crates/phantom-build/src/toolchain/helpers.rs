//! Runtime helper injection
//!
//! Compilers inline small helper functions (`_classCallCheck`, `_extends`, ...)
//! into every module that needs them. [`BabelRuntimeInjector`] removes those
//! inline copies and references the shared `@babel/runtime` package instead.
//! Helpers newer than the pinned runtime version are left inline.

use super::lexical::{self, matching_close, Segment, SegmentKind};
use super::{HelperOptions, RuntimeHelperInjector};
use phantom_package::RUNTIME_HELPER_PACKAGE;
use semver::Version;
use std::ops::Range;

/// (helper name, first runtime version that ships it)
const HELPERS: &[(&str, Version)] = &[
    ("assertThisInitialized", Version::new(7, 0, 0)),
    ("asyncToGenerator", Version::new(7, 0, 0)),
    ("classCallCheck", Version::new(7, 0, 0)),
    ("createClass", Version::new(7, 0, 0)),
    ("createSuper", Version::new(7, 9, 0)),
    ("defineProperty", Version::new(7, 0, 0)),
    ("extends", Version::new(7, 0, 0)),
    ("getPrototypeOf", Version::new(7, 0, 0)),
    ("inherits", Version::new(7, 0, 0)),
    ("objectSpread2", Version::new(7, 5, 0)),
    ("objectWithoutProperties", Version::new(7, 0, 0)),
    ("possibleConstructorReturn", Version::new(7, 0, 0)),
    ("setPrototypeOf", Version::new(7, 0, 0)),
    ("slicedToArray", Version::new(7, 0, 0)),
    ("toConsumableArray", Version::new(7, 0, 0)),
    ("typeof", Version::new(7, 0, 0)),
];

/// Rewrites inline helpers into `@babel/runtime` references
#[derive(Debug, Clone, Copy, Default)]
pub struct BabelRuntimeInjector;

impl RuntimeHelperInjector for BabelRuntimeInjector {
    fn inject(&self, code: &str, helper_version: &str, options: &HelperOptions) -> String {
        // Unlexable input is the compiler's problem; leave it untouched here.
        let Ok(segments) = lexical::scan(code) else {
            return code.to_string();
        };

        let Some(pinned) = parse_version(helper_version) else {
            return code.to_string();
        };
        let mut removals: Vec<Range<usize>> = Vec::new();
        let mut references = Vec::new();

        for (name, since) in HELPERS {
            if pinned < *since {
                continue;
            }
            if let Some(range) = find_inline_helper(code, &segments, name) {
                removals.push(range);
                references.push(reference(name, options));
            }
        }

        if references.is_empty() {
            return code.to_string();
        }

        removals.sort_by_key(|r| r.start);
        let mut out = references.join("\n");
        out.push_str("\n\n");

        let mut cursor = 0;
        for range in removals {
            if range.start < cursor {
                continue;
            }
            out.push_str(&code[cursor..range.start]);
            cursor = range.end;
        }
        out.push_str(&code[cursor..]);
        out
    }
}

fn reference(name: &str, options: &HelperOptions) -> String {
    if options.use_module_helpers {
        format!(
            "import _{name} from \"{RUNTIME_HELPER_PACKAGE}/helpers/esm/{name}\";"
        )
    } else {
        format!(
            "var _{name} = require(\"{RUNTIME_HELPER_PACKAGE}/helpers/{name}\");"
        )
    }
}

/// Byte range of `function _name(...) { ... }` plus its trailing newline
fn find_inline_helper(code: &str, segments: &[Segment], name: &str) -> Option<Range<usize>> {
    let needle = format!("function _{}(", name);

    let start = code.match_indices(&needle).map(|(idx, _)| idx).find(|&idx| {
        in_code(segments, idx)
            && code[..idx]
                .chars()
                .next_back()
                .map_or(true, |c| !(c.is_alphanumeric() || c == '_' || c == '$'))
    })?;

    let params_open = start + needle.len() - 1;
    let params_close = matching_close(code, segments, params_open)?;
    let body_open = code[params_close..]
        .find('{')
        .map(|n| params_close + n)
        .filter(|&idx| in_code(segments, idx))?;
    let body_close = matching_close(code, segments, body_open)?;

    let mut end = body_close + 1;
    if code[end..].starts_with('\n') {
        end += 1;
    }
    Some(start..end)
}

fn in_code(segments: &[Segment], offset: usize) -> bool {
    segments
        .iter()
        .any(|s| s.kind == SegmentKind::Code && s.range.contains(&offset))
}

/// Pinned runtime version; `7` and `7.9` are read as `7.0.0` and `7.9.0`
fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim();
    Version::parse(version)
        .or_else(|_| Version::parse(&format!("{version}.0")))
        .or_else(|_| Version::parse(&format!("{version}.0.0")))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INLINE: &str = "function _classCallCheck(instance, Constructor) { if (!(instance instanceof Constructor)) { throw new TypeError(\"Cannot call a class as a function\"); } }\nvar Store = function Store() { _classCallCheck(this, Store); };\n";

    #[test]
    fn test_inline_helper_becomes_require() {
        let out = BabelRuntimeInjector.inject(
            INLINE,
            "7.9.2",
            &HelperOptions {
                use_module_helpers: false,
            },
        );
        assert_eq!(
            out,
            "var _classCallCheck = require(\"@babel/runtime/helpers/classCallCheck\");\n\nvar Store = function Store() { _classCallCheck(this, Store); };\n"
        );
    }

    #[test]
    fn test_module_helpers_use_esm_path() {
        let out = BabelRuntimeInjector.inject(
            INLINE,
            "7.9.2",
            &HelperOptions {
                use_module_helpers: true,
            },
        );
        assert!(out.starts_with(
            "import _classCallCheck from \"@babel/runtime/helpers/esm/classCallCheck\";"
        ));
        assert!(!out.contains("function _classCallCheck"));
    }

    #[test]
    fn test_helper_newer_than_pinned_version_stays_inline() {
        let code = "function _createSuper(Derived) { return Derived; }\n";
        let options = HelperOptions {
            use_module_helpers: false,
        };
        assert_eq!(BabelRuntimeInjector.inject(code, "7.8.0", &options), code);
        assert!(BabelRuntimeInjector
            .inject(code, "7.9.0", &options)
            .contains("helpers/createSuper"));
    }

    #[test]
    fn test_helper_name_in_string_is_ignored() {
        let code = "var s = \"function _extends(a) { }\";\n";
        let options = HelperOptions {
            use_module_helpers: false,
        };
        assert_eq!(BabelRuntimeInjector.inject(code, "7.0.0", &options), code);
    }

    #[test]
    fn test_prerelease_runtime_lacks_newer_helpers() {
        let code = "function _createSuper(Derived) { return Derived; }\n";
        let options = HelperOptions {
            use_module_helpers: false,
        };
        assert_eq!(BabelRuntimeInjector.inject(code, "7.9.0-beta.1", &options), code);
        assert!(BabelRuntimeInjector
            .inject(code, "7.10.0-rc.1", &options)
            .contains("helpers/createSuper"));
    }

    #[test]
    fn test_unparseable_version_leaves_code_alone() {
        let options = HelperOptions {
            use_module_helpers: false,
        };
        assert_eq!(BabelRuntimeInjector.inject(INLINE, "latest", &options), INLINE);
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("7.9.2"), Some(Version::new(7, 9, 2)));
        assert_eq!(parse_version("7"), Some(Version::new(7, 0, 0)));
        assert_eq!(parse_version("7.9"), Some(Version::new(7, 9, 0)));
        assert_eq!(parse_version("next"), None);

        let beta = parse_version("7.0.0-beta.44").unwrap();
        assert!(beta < Version::new(7, 0, 0));
        assert!(parse_version("7.10.0").unwrap() > Version::new(7, 9, 0));
    }
}
