//! Conversion of externally supplied data into initial template variables.
//!
//! JSON documents keep their object key order. Properties files follow the
//! `key=value` / `key: value` / `key value` line format with `#` and `!`
//! comments, backslash continuation lines and `\uXXXX` escapes.

use indexmap::IndexMap;
use xtemplate_expr::Value;

pub fn value_from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .unwrap_or(Value::Null),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => {
            Value::array(items.into_iter().map(value_from_json).collect())
        }
        serde_json::Value::Object(entries) => Value::map(
            entries
                .into_iter()
                .map(|(key, value)| (key, value_from_json(value)))
                .collect(),
        ),
    }
}

pub fn parse_json(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str::<serde_json::Value>(text).map(value_from_json)
}

/// Parses properties text into a mapping of string values. Later keys replace earlier ones.
pub fn parse_properties(text: &str) -> Value {
    let mut entries = IndexMap::new();
    for line in logical_lines(text) {
        let (key, value) = split_entry(&line);
        entries.insert(key, Value::String(value));
    }
    Value::map(entries)
}

const PROPERTY_WHITESPACE: [char; 3] = [' ', '\t', '\x0c'];

/// Joins continuation lines and drops blank and comment lines.
fn logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut continuing = false;
    for raw in text.lines() {
        let line = raw.trim_start_matches(PROPERTY_WHITESPACE);
        if !continuing && (line.is_empty() || line.starts_with(['#', '!'])) {
            continue;
        }
        let backslashes = line.chars().rev().take_while(|&c| c == '\\').count();
        if backslashes % 2 == 1 {
            current.push_str(&line[..line.len() - 1]);
            continuing = true;
        } else {
            current.push_str(line);
            lines.push(std::mem::take(&mut current));
            continuing = false;
        }
    }
    if continuing {
        lines.push(current);
    }
    lines
}

fn split_entry(line: &str) -> (String, String) {
    let mut key_end = line.len();
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }
    let mut rest = line[key_end..].trim_start_matches(PROPERTY_WHITESPACE);
    if let Some(stripped) = rest.strip_prefix(['=', ':']) {
        rest = stripped.trim_start_matches(PROPERTY_WHITESPACE);
    }
    (unescape(&line[..key_end]), unescape(rest))
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(ch) => out.push(ch),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

/// Interprets a command-line value: `null`, `true`/`false` (any case), an
/// integer (decimal, `0x`/`#` hex or leading-zero octal), a float, or else the
/// text itself.
pub fn parse_arg(arg: &str) -> Value {
    if arg.eq_ignore_ascii_case("null") {
        Value::Null
    } else if arg.eq_ignore_ascii_case("true") {
        Value::Bool(true)
    } else if arg.eq_ignore_ascii_case("false") {
        Value::Bool(false)
    } else if let Some(i) = decode_integer(arg) {
        Value::Int(i)
    } else if let Ok(f) = arg.parse::<f64>() {
        Value::Float(f)
    } else {
        Value::String(arg.to_string())
    }
}

fn decode_integer(s: &str) -> Option<i64> {
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (radix, digits) = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
        .or_else(|| unsigned.strip_prefix('#'))
    {
        (16, hex)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (8, &unsigned[1..])
    } else {
        (10, unsigned)
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    i64::try_from(if negative { -magnitude } else { magnitude }).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_keeps_key_order_and_types() {
        let value = parse_json(r#"{"z": 1, "a": [true, null, 2.5], "m": {"k": "v"}}"#).unwrap();
        let Value::Map(entries) = &value else {
            panic!("expected map, got {:?}", value);
        };
        assert_eq!(entries.keys().collect::<Vec<_>>(), vec!["z", "a", "m"]);
        assert_eq!(entries["z"], Value::Int(1));
        assert_eq!(
            entries["a"],
            Value::array(vec![Value::Bool(true), Value::Null, Value::Float(2.5)])
        );
        assert_eq!(value.to_string(), "{z=1, a=[true, , 2.5], m={k=v}}");
    }

    #[test]
    fn test_invalid_json() {
        assert!(parse_json("{").is_err());
    }

    #[test]
    fn test_properties() {
        let text = "# comment\n! also comment\n\nname=Fred\ntitle : Mr \\\n    Smith\npath c:\\\\temp\nsnow=\\u2603\nempty\n";
        let Value::Map(entries) = parse_properties(text) else {
            panic!("expected map");
        };
        assert_eq!(entries["name"], Value::from("Fred"));
        assert_eq!(entries["title"], Value::from("Mr Smith"));
        assert_eq!(entries["path"], Value::from("c:\\temp"));
        assert_eq!(entries["snow"], Value::from("\u{2603}"));
        assert_eq!(entries["empty"], Value::from(""));
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn test_parse_arg() {
        assert_eq!(parse_arg("NULL"), Value::Null);
        assert_eq!(parse_arg("True"), Value::Bool(true));
        assert_eq!(parse_arg("42"), Value::Int(42));
        assert_eq!(parse_arg("-0x1F"), Value::Int(-31));
        assert_eq!(parse_arg("#ff"), Value::Int(255));
        assert_eq!(parse_arg("010"), Value::Int(8));
        assert_eq!(parse_arg("1.5"), Value::Float(1.5));
        assert_eq!(parse_arg("hello"), Value::from("hello"));
        assert_eq!(parse_arg("09"), Value::Float(9.0));
    }
}
