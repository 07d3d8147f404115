//! Compact minifier
//!
//! A deliberately small minifier: strips comments (keeping `/*!` license
//! banners), folds comparisons between string literals, drops branches whose
//! condition became a constant, and squeezes whitespace. The folding is what
//! makes environment substitution pay off: once `process.env.NODE_ENV` is a
//! literal, development-only branches disappear.

use super::lexical::{self, line_col, matching_close, Segment, SegmentKind};
use super::{Minifier, MinifyOptions};
use crate::error::MinifyError;
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

/// Comment-stripping, constant-folding minifier
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactMinifier;

impl Minifier for CompactMinifier {
    fn minify(&self, code: &str, options: &MinifyOptions) -> Result<String, MinifyError> {
        let mut text = strip_comments(code)?;

        if options.unsafe_comps {
            text = fold_comparisons(&text)?;
        }
        text = fold_constant_branches(&text)?;

        squeeze_whitespace(&text)
    }
}

fn scan(code: &str) -> Result<Vec<Segment>, MinifyError> {
    lexical::scan(code).map_err(|e| {
        let (line, column) = line_col(code, e.offset);
        MinifyError(format!("{} at {}:{}", e.message, line, column))
    })
}

fn strip_comments(code: &str) -> Result<String, MinifyError> {
    let segments = scan(code)?;
    let mut out = String::with_capacity(code.len());

    for segment in &segments {
        let text = &code[segment.range.clone()];
        match segment.kind {
            SegmentKind::Code | SegmentKind::Str => out.push_str(text),
            SegmentKind::Comment { preserve: true } => {
                out.push_str(text);
                out.push('\n');
            }
            SegmentKind::Comment { preserve: false } if text.starts_with("/*") => out.push(' '),
            SegmentKind::Comment { preserve: false } => {}
        }
    }

    Ok(out)
}

fn comparison_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"("[^"\\\n]*"|'[^'\\\n]*')\s*(===|!==|==|!=)\s*("[^"\\\n]*"|'[^'\\\n]*')"#,
        )
        .expect("comparison pattern is valid")
    })
}

fn branch_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\bif\s*\(\s*(true|false)\s*\)\s*\{").expect("branch pattern is valid")
    })
}

fn else_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*else\b\s*").expect("else pattern is valid"))
}

fn if_head_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^if\s*\(").expect("if pattern is valid"))
}

fn block_open_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*\{").expect("block pattern is valid"))
}

/// `"production" !== "production"` -> `false`, when nothing around the
/// comparison binds tighter than equality.
fn fold_comparisons(code: &str) -> Result<String, MinifyError> {
    let segments = scan(code)?;
    let mut out = String::with_capacity(code.len());
    let mut cursor = 0;

    for caps in comparison_pattern().captures_iter(code) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let (left, right) = (&caps[1], &caps[3]);

        let starts_string = segments
            .iter()
            .any(|s| s.kind == SegmentKind::Str && s.range.start == whole.start());
        let ends_string = segments
            .iter()
            .any(|s| s.kind == SegmentKind::Str && s.range.end == whole.end());
        if !starts_string
            || !ends_string
            || whole.start() < cursor
            || !loose_before(&code[..whole.start()])
            || !loose_after(&code[whole.end()..])
        {
            continue;
        }

        let equal = left[1..left.len() - 1] == right[1..right.len() - 1];
        let result = match &caps[2] {
            "===" | "==" => equal,
            _ => !equal,
        };

        out.push_str(&code[cursor..whole.start()]);
        out.push_str(if result { "true" } else { "false" });
        cursor = whole.end();
    }

    out.push_str(&code[cursor..]);
    Ok(out)
}

fn loose_before(before: &str) -> bool {
    let mut chars = before.trim_end().chars().rev();
    match chars.next() {
        None => true,
        Some('(' | '[' | ',' | ';' | '{' | '}' | '?' | ':' | '&' | '|') => true,
        Some('=') => !matches!(
            chars.next(),
            Some('=' | '!' | '<' | '>' | '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^')
        ),
        Some(_) => false,
    }
}

fn loose_after(after: &str) -> bool {
    matches!(
        after.trim_start().chars().next(),
        None | Some(')' | ']' | ',' | ';' | '}' | '?' | ':' | '&' | '|')
    )
}

/// `if (true) {A} else {B}` -> `{A}`, `if (false) {A} else {B}` -> `{B}`,
/// `if (false) {A} else if ..` -> `if ..`, `if (false) {A}` -> nothing
fn fold_constant_branches(code: &str) -> Result<String, MinifyError> {
    let mut text = code.to_string();
    while let Some((range, replacement)) = next_constant_branch(&text)? {
        text.replace_range(range, &replacement);
    }
    Ok(text)
}

/// What follows the braced `then` block of an `if`
#[derive(Debug, Clone, Copy)]
enum ElseBranch {
    None,
    /// `else { .. }`: offsets of the braces
    Block(usize, usize),
    /// `else if ..`: start of the nested `if` and end of its chain
    If(usize, usize),
}

/// `None` when the `else` is not followed by a block or a braced `if`
fn else_branch(text: &str, segments: &[Segment], then_close: usize) -> Option<ElseBranch> {
    let Some(m) = else_pattern().find(&text[then_close + 1..]) else {
        return Some(ElseBranch::None);
    };
    let start = then_close + 1 + m.end();

    if text[start..].starts_with('{') {
        let close = matching_close(text, segments, start)?;
        return Some(ElseBranch::Block(start, close));
    }
    let end = if_chain_end(text, segments, start)?;
    Some(ElseBranch::If(start, end))
}

/// Exclusive end of the braced `if` / `else` chain starting at `start`
fn if_chain_end(text: &str, segments: &[Segment], start: usize) -> Option<usize> {
    let head = if_head_pattern().find(&text[start..])?;
    let paren_close = matching_close(text, segments, start + head.end() - 1)?;
    let block = block_open_pattern().find(&text[paren_close + 1..])?;
    let then_close = matching_close(text, segments, paren_close + block.end())?;

    match else_branch(text, segments, then_close)? {
        ElseBranch::None => Some(then_close + 1),
        ElseBranch::Block(_, close) => Some(close + 1),
        ElseBranch::If(_, end) => Some(end),
    }
}

/// Offset of an `else` keyword directly before `at`
fn preceding_else(text: &str, at: usize) -> Option<usize> {
    let head = text[..at].trim_end().strip_suffix("else")?;
    if head.chars().next_back().is_some_and(is_ident_char) {
        return None;
    }
    Some(head.len())
}

fn next_constant_branch(text: &str) -> Result<Option<(Range<usize>, String)>, MinifyError> {
    let segments = scan(text)?;

    for caps in branch_pattern().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let in_code = segments
            .iter()
            .any(|s| s.kind == SegmentKind::Code && s.range.contains(&whole.start()));
        if !in_code {
            continue;
        }

        let then_open = whole.end() - 1;
        let Some(then_close) = matching_close(text, &segments, then_open) else {
            continue;
        };
        let Some(branch) = else_branch(text, &segments, then_close) else {
            continue;
        };

        let then_block = || text[then_open..=then_close].to_string();
        let (start, end, replacement) = match (&caps[1] == "true", branch) {
            (true, ElseBranch::None) => (whole.start(), then_close + 1, then_block()),
            (true, ElseBranch::Block(_, close)) => (whole.start(), close + 1, then_block()),
            (true, ElseBranch::If(_, end)) => (whole.start(), end, then_block()),
            (false, ElseBranch::Block(open, close)) => {
                (whole.start(), close + 1, text[open..=close].to_string())
            }
            // the nested `if` takes this one's place, including after an `else`
            (false, ElseBranch::If(nested, _)) => (whole.start(), nested, String::new()),
            // nothing is left, so an `else` in front must go too
            (false, ElseBranch::None) => (
                preceding_else(text, whole.start()).unwrap_or(whole.start()),
                then_close + 1,
                String::new(),
            ),
        };

        return Ok(Some((start..end, replacement)));
    }

    Ok(None)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn squeeze_whitespace(code: &str) -> Result<String, MinifyError> {
    let segments = scan(code)?;
    let mut out = String::with_capacity(code.len());

    for segment in &segments {
        let text = &code[segment.range.clone()];
        if segment.kind != SegmentKind::Code {
            out.push_str(text);
            continue;
        }

        let mut chars = text.char_indices().peekable();
        while let Some((idx, c)) = chars.next() {
            if !c.is_whitespace() {
                out.push(c);
                continue;
            }

            let mut saw_newline = c == '\n';
            while let Some(&(_, next)) = chars.peek() {
                if !next.is_whitespace() {
                    break;
                }
                saw_newline |= next == '\n';
                chars.next();
            }

            let prev = out.chars().next_back();
            let next = chars
                .peek()
                .map(|&(_, n)| n)
                .or_else(|| code[segment.range.start + idx..].trim_start().chars().next());

            match (prev, next) {
                (None, _) | (Some('\n'), _) | (_, None) => {}
                _ if saw_newline => out.push('\n'),
                (Some(p), Some(n))
                    if (is_ident_char(p) && is_ident_char(n))
                        || (matches!(p, '+' | '-') && matches!(n, '+' | '-')) =>
                {
                    out.push(' ')
                }
                _ => {}
            }
        }
    }

    Ok(out.trim_end().to_string())
}
