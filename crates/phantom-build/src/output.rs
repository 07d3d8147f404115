//! Module-format envelopes and failure reports

use crate::error::StageError;
use crate::targets::{BuildTarget, ExportsMode, ModuleFormat};

/// Wrap finished code in the envelope of the target's module format.
///
/// ES modules are emitted as-is. CommonJS bundles get strict mode and, for
/// named exports, the `__esModule` interop marker. UMD bundles are wrapped
/// so they load under CommonJS, AMD or as a browser global. Minified targets
/// get the compact form of each envelope.
pub fn render(target: &BuildTarget, code: &str) -> String {
    let compact = target.minify;

    match target.format.module_format() {
        ModuleFormat::EsModule => terminated(code),
        ModuleFormat::CommonJs => {
            let mut out = String::from("'use strict';\n");
            if target.exports_mode == ExportsMode::Named {
                out.push_str("Object.defineProperty(exports, '__esModule', { value: true });\n");
            }
            if !compact {
                out.push('\n');
            }
            out.push_str(&terminated(code));
            out
        }
        ModuleFormat::Umd => {
            let global = target.global_name.as_deref().unwrap_or("lib");
            if compact {
                format!(
                    "!function(e,t){{\"object\"==typeof exports&&\"undefined\"!=typeof module?t(exports):\"function\"==typeof define&&define.amd?define([\"exports\"],t):t((e=\"undefined\"!=typeof globalThis?globalThis:e||self).{global}={{}})}}(this,function(exports){{\"use strict\";\n{body}}});\n",
                    global = global,
                    body = terminated(code),
                )
            } else {
                format!(
                    "(function (global, factory) {{\n  typeof exports === 'object' && typeof module !== 'undefined' ? factory(exports) :\n  typeof define === 'function' && define.amd ? define(['exports'], factory) :\n  (global = typeof globalThis !== 'undefined' ? globalThis : global || self, factory(global.{global} = {{}}));\n}}(this, (function (exports) {{ 'use strict';\n\n{body}\n}})));\n",
                    global = global,
                    body = terminated(code),
                )
            }
        }
    }
}

fn terminated(code: &str) -> String {
    let mut out = code.trim_end().to_string();
    out.push('\n');
    out
}

/// Multi-line report with one entry per failed target
pub fn format_failures(failures: &[StageError]) -> String {
    let mut out = match failures.len() {
        1 => "1 target failed:".to_string(),
        n => format!("{} targets failed:", n),
    };

    for failure in failures {
        out.push_str(&format!(
            "\n  - {} [{}]: {}",
            failure.target_id, failure.stage, failure.cause
        ));
    }

    out
}
