//! Environment literal substitution

use super::lexical::{self, SegmentKind};
use super::Substitutor;
use std::collections::BTreeMap;

/// Replaces whole expressions such as `process.env.NODE_ENV` with literals.
///
/// Matches only in code (never inside strings or comments) and only on
/// expression boundaries, so `myprocess.env.NODE_ENV` or
/// `process.env.NODE_ENV_EXTRA` are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralSubstitutor;

impl Substitutor for LiteralSubstitutor {
    fn substitute(&self, code: &str, bindings: &BTreeMap<String, String>) -> String {
        if bindings.is_empty() {
            return code.to_string();
        }

        let mut keys: Vec<(&String, &String)> =
            bindings.iter().filter(|(k, _)| !k.is_empty()).collect();
        keys.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

        let segments = match lexical::scan(code) {
            Ok(segments) => segments,
            Err(_) => return replace_all(code, &keys),
        };

        let mut out = String::with_capacity(code.len());
        for segment in &segments {
            let text = &code[segment.range.clone()];
            if segment.kind == SegmentKind::Code {
                out.push_str(&replace_all(text, &keys));
            } else {
                out.push_str(text);
            }
        }
        out
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn replace_all(text: &str, keys: &[(&String, &String)]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    'scan: while i < text.len() {
        for (key, literal) in keys {
            if text[i..].starts_with(key.as_str()) {
                let before_ok = text[..i]
                    .chars()
                    .next_back()
                    .map_or(true, |c| !is_ident_char(c) && c != '.');
                let after_ok = text[i + key.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| !is_ident_char(c));
                if before_ok && after_ok {
                    out.push_str(literal);
                    i += key.len();
                    continue 'scan;
                }
            }
        }

        let Some(c) = text[i..].chars().next() else {
            break;
        };
        out.push(c);
        i += c.len_utf8();
    }

    out
}
