//! Minimal lexical splitting of JavaScript-like source into code, string and
//! comment segments. Regex literals are not recognised.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    Code,
    Str,
    /// `preserve` is set for `/*! ... */` license comments
    Comment { preserve: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub kind: SegmentKind,
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub message: &'static str,
    pub offset: usize,
}

/// Split `src` into segments covering every byte exactly once
pub(crate) fn scan(src: &str) -> Result<Vec<Segment>, LexError> {
    let bytes = src.as_bytes();
    let mut segments = Vec::new();
    let mut code_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                flush_code(&mut segments, code_start, i);
                let end = src[i..].find('\n').map_or(bytes.len(), |n| i + n);
                segments.push(Segment {
                    kind: SegmentKind::Comment { preserve: false },
                    range: i..end,
                });
                i = end;
                code_start = i;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                flush_code(&mut segments, code_start, i);
                let end = src[i + 2..]
                    .find("*/")
                    .map(|n| i + 2 + n + 2)
                    .ok_or(LexError {
                        message: "Unterminated block comment",
                        offset: i,
                    })?;
                segments.push(Segment {
                    kind: SegmentKind::Comment {
                        preserve: bytes.get(i + 2) == Some(&b'!'),
                    },
                    range: i..end,
                });
                i = end;
                code_start = i;
            }
            quote @ (b'"' | b'\'' | b'`') => {
                flush_code(&mut segments, code_start, i);
                let mut j = i + 1;
                loop {
                    match bytes.get(j) {
                        None => {
                            return Err(LexError {
                                message: "Unterminated string literal",
                                offset: i,
                            })
                        }
                        Some(b'\\') => j += 2,
                        Some(b'\n') if quote != b'`' => {
                            return Err(LexError {
                                message: "Unterminated string literal",
                                offset: i,
                            })
                        }
                        Some(&c) if c == quote => {
                            j += 1;
                            break;
                        }
                        Some(_) => j += 1,
                    }
                }
                let end = j.min(bytes.len());
                segments.push(Segment {
                    kind: SegmentKind::Str,
                    range: i..end,
                });
                i = end;
                code_start = i;
            }
            _ => i += 1,
        }
    }

    flush_code(&mut segments, code_start, bytes.len());
    Ok(segments)
}

fn flush_code(segments: &mut Vec<Segment>, start: usize, end: usize) {
    if start < end {
        segments.push(Segment {
            kind: SegmentKind::Code,
            range: start..end,
        });
    }
}

/// Characters of code segments with their byte offsets
pub(crate) fn code_chars<'a>(
    src: &'a str,
    segments: &'a [Segment],
) -> impl Iterator<Item = (usize, char)> + 'a {
    segments
        .iter()
        .filter(|s| s.kind == SegmentKind::Code)
        .flat_map(move |s| {
            src[s.range.clone()]
                .char_indices()
                .map(move |(idx, c)| (s.range.start + idx, c))
        })
}

/// Offset of the bracket closing the one at `open`, skipping strings and comments
pub(crate) fn matching_close(src: &str, segments: &[Segment], open: usize) -> Option<usize> {
    let open_char = src[open..].chars().next()?;
    let close_char = match open_char {
        '{' => '}',
        '(' => ')',
        '[' => ']',
        _ => return None,
    };

    let mut depth = 0usize;
    for (offset, c) in code_chars(src, segments).skip_while(|(offset, _)| *offset < open) {
        if c == open_char {
            depth += 1;
        } else if c == close_char {
            depth -= 1;
            if depth == 0 {
                return Some(offset);
            }
        }
    }
    None
}

/// 1-based line and column of a byte offset
pub(crate) fn line_col(src: &str, offset: usize) -> (usize, usize) {
    let before = &src[..offset.min(src.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |n| n + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
