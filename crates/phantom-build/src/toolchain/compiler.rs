//! Pass-through compiler
//!
//! Emits the source unchanged after checking that brackets balance, and
//! writes stub declarations for top-level exports. Projects with a real
//! TypeScript toolchain replace it through [`super::Toolchain::with_compiler`].

use super::lexical::{self, code_chars, line_col};
use super::{CompileOptions, CompileOutput, Compiler, Declaration, SourceFile};
use crate::error::CompilationError;
use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Compiler that validates structure and copies code through
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCompiler;

impl Compiler for PassthroughCompiler {
    fn compile(
        &self,
        source: &SourceFile,
        options: &CompileOptions,
    ) -> Result<CompileOutput, CompilationError> {
        check_brackets(&source.code).map_err(|e| e.in_file(&source.path))?;

        let declarations = options
            .emit_declarations
            .then(|| vec![declaration_stub(source)]);

        Ok(CompileOutput {
            code: source.code.clone(),
            declarations,
        })
    }
}

fn check_brackets(code: &str) -> Result<(), CompilationError> {
    let segments = lexical::scan(code).map_err(|e| {
        let (line, column) = line_col(code, e.offset);
        CompilationError::new(e.message).at(line, column)
    })?;

    let mut open: Vec<(char, usize)> = Vec::new();
    for (offset, c) in code_chars(code, &segments) {
        let expected = match c {
            '{' | '(' | '[' => {
                open.push((c, offset));
                continue;
            }
            '}' => '{',
            ')' => '(',
            ']' => '[',
            _ => continue,
        };

        match open.pop() {
            Some((opener, _)) if opener == expected => {}
            _ => {
                let (line, column) = line_col(code, offset);
                return Err(CompilationError::new(format!("Unexpected '{}'", c)).at(line, column));
            }
        }
    }

    if let Some((opener, offset)) = open.pop() {
        let (line, column) = line_col(code, offset);
        return Err(CompilationError::new(format!("Unclosed '{}'", opener)).at(line, column));
    }

    Ok(())
}

fn export_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?m)^export\s+(?:default\s+)?(?:declare\s+)?(?:async\s+)?(function\*?|class|const|let|var|interface|type|enum)\s+([A-Za-z_$][\w$]*)",
        )
        .expect("export pattern is valid")
    })
}

/// `src/index.ts` -> `index.d.ts` holding one stub per exported binding
fn declaration_stub(source: &SourceFile) -> Declaration {
    let stem = source
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("index");

    let mut contents = String::new();
    for caps in export_pattern().captures_iter(&source.code) {
        let name = &caps[2];
        let line = match &caps[1] {
            "function" | "function*" => format!("export declare function {}(...args: any[]): any;", name),
            "class" => format!("export declare class {} {{}}", name),
            "interface" | "type" => format!("export type {} = any;", name),
            "enum" => format!("export declare enum {} {{}}", name),
            _ => format!("export declare const {}: any;", name),
        };
        contents.push_str(&line);
        contents.push('\n');
    }

    if contents.is_empty() {
        contents.push_str("export {};\n");
    }

    Declaration {
        path: PathBuf::from(format!("{}.d.ts", stem)),
        contents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::LanguageLevel;

    fn source(code: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from("src/index.ts"),
            code: code.to_string(),
        }
    }

    fn options(emit_declarations: bool) -> CompileOptions {
        CompileOptions {
            emit_declarations,
            language_level: LanguageLevel::Default,
        }
    }

    #[test]
    fn test_code_passes_through() {
        let code = "export const a = { b: [1, 2] };\n";
        let out = PassthroughCompiler.compile(&source(code), &options(false)).unwrap();
        assert_eq!(out.code, code);
        assert!(out.declarations.is_none());
    }

    #[test]
    fn test_unexpected_closer_has_location() {
        let err = PassthroughCompiler
            .compile(&source("let a = 1;\nfoo());\n"), &options(false))
            .unwrap_err();
        assert_eq!(err.message, "Unexpected ')'");
        assert_eq!(err.location.map(|l| (l.line, l.column)), Some((2, 6)));
        assert_eq!(err.file, Some(PathBuf::from("src/index.ts")));
    }

    #[test]
    fn test_unclosed_opener() {
        let err = PassthroughCompiler
            .compile(&source("function f() {\n  return 1;\n"), &options(false))
            .unwrap_err();
        assert_eq!(err.message, "Unclosed '{'");
        assert_eq!(err.location.map(|l| l.line), Some(1));
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        let code = "const s = '}' + \"(\"; // ]\n";
        assert!(PassthroughCompiler.compile(&source(code), &options(false)).is_ok());
    }

    #[test]
    fn test_declaration_stubs() {
        let code = "export function add(a, b) { return a + b; }\nexport const VERSION = '1';\nexport interface Opts {}\nconst hidden = 1;\n";
        let out = PassthroughCompiler.compile(&source(code), &options(true)).unwrap();
        let declarations = out.declarations.unwrap();
        assert_eq!(declarations.len(), 1);
        assert_eq!(declarations[0].path, PathBuf::from("index.d.ts"));
        assert_eq!(
            declarations[0].contents,
            "export declare function add(...args: any[]): any;\nexport declare const VERSION: any;\nexport type Opts = any;\n"
        );
    }

    #[test]
    fn test_declaration_stub_without_exports() {
        let out = PassthroughCompiler.compile(&source("let x = 1;"), &options(true)).unwrap();
        assert_eq!(out.declarations.unwrap()[0].contents, "export {};\n");
    }
}
