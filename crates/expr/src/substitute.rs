//! Inline `${...}` substitution in literal text and attribute values.

use crate::engine::Resolver;
use crate::error::ExprError;
use crate::parser::parse_expression;
use std::borrow::Cow;

/// Replaces every `${expr}` in `text` with the string form of its value.
///
/// `\${` produces a literal `${`. Text without any expression is returned
/// borrowed.
pub fn substitute<'t>(text: &'t str, resolver: &dyn Resolver) -> Result<Cow<'t, str>, ExprError> {
    if !text.contains("${") {
        return Ok(Cow::Borrowed(text));
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("${") {
        if rest[..start].ends_with('\\') {
            out.push_str(&rest[..start - 1]);
            out.push_str("${");
            rest = &rest[start + 2..];
            continue;
        }
        out.push_str(&rest[..start]);
        let body = &rest[start + 2..];
        let end = find_closing_brace(body).ok_or_else(|| ExprError::Unterminated(text.to_string()))?;
        let value = parse_expression(&body[..end])?.evaluate(resolver)?;
        out.push_str(&value.to_string());
        rest = &body[end + 1..];
    }
    out.push_str(rest);
    Ok(Cow::Owned(out))
}

/// Byte offset of the `}` closing an expression body, skipping nested braces and
/// quoted strings.
fn find_closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}
