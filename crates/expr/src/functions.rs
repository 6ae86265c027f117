//! Function libraries callable as `prefix:name(...)` from expressions.

use crate::error::ExprError;
use crate::value::Value;
use std::fmt::Debug;

/// Namespace of the standard string functions, conventionally bound to the `fn` prefix.
pub const JSTL_FUNCTIONS_NAMESPACE: &str = "http://java.sun.com/jsp/jstl/functions";

/// A set of functions registered under one namespace URI.
pub trait FunctionLibrary: Debug + Send + Sync {
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExprError>;
}

/// The JSTL string function set.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringFunctions;

fn expect_args(function: &str, args: &[Value], count: usize) -> Result<(), ExprError> {
    if args.len() != count {
        return Err(ExprError::function(
            function,
            format!("expected {} argument(s), got {}", count, args.len()),
        ));
    }
    Ok(())
}

/// String form of an argument; null is the empty string.
fn text(v: &Value) -> String {
    v.to_string()
}

fn char_index(s: &str, byte_index: usize) -> i64 {
    s[..byte_index].chars().count() as i64
}

impl FunctionLibrary for StringFunctions {
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, ExprError> {
        match name {
            "length" => {
                expect_args(name, args, 1)?;
                let len = match &args[0] {
                    Value::Null => 0,
                    Value::Array(items) => items.len(),
                    Value::Map(entries) => entries.len(),
                    other => text(other).chars().count(),
                };
                Ok(Value::Int(len as i64))
            }
            "toUpperCase" => {
                expect_args(name, args, 1)?;
                Ok(Value::String(text(&args[0]).to_uppercase()))
            }
            "toLowerCase" => {
                expect_args(name, args, 1)?;
                Ok(Value::String(text(&args[0]).to_lowercase()))
            }
            "trim" => {
                expect_args(name, args, 1)?;
                Ok(Value::String(text(&args[0]).trim().to_string()))
            }
            "substring" => {
                expect_args(name, args, 3)?;
                let s: Vec<char> = text(&args[0]).chars().collect();
                let len = s.len() as i64;
                let begin = args[1].as_int()?.max(0);
                let end = match args[2].as_int()? {
                    e if e < 0 || e > len => len,
                    e => e,
                };
                if begin >= end {
                    return Ok(Value::String(String::new()));
                }
                Ok(Value::String(s[begin as usize..end as usize].iter().collect()))
            }
            "substringAfter" => {
                expect_args(name, args, 2)?;
                let (s, sub) = (text(&args[0]), text(&args[1]));
                Ok(Value::String(
                    s.find(&sub)
                        .map(|i| s[i + sub.len()..].to_string())
                        .unwrap_or_default(),
                ))
            }
            "substringBefore" => {
                expect_args(name, args, 2)?;
                let (s, sub) = (text(&args[0]), text(&args[1]));
                Ok(Value::String(
                    s.find(&sub).map(|i| s[..i].to_string()).unwrap_or_default(),
                ))
            }
            "contains" => {
                expect_args(name, args, 2)?;
                Ok(Value::Bool(text(&args[0]).contains(&text(&args[1]))))
            }
            "containsIgnoreCase" => {
                expect_args(name, args, 2)?;
                let s = text(&args[0]).to_lowercase();
                Ok(Value::Bool(s.contains(&text(&args[1]).to_lowercase())))
            }
            "startsWith" => {
                expect_args(name, args, 2)?;
                Ok(Value::Bool(text(&args[0]).starts_with(&text(&args[1]))))
            }
            "endsWith" => {
                expect_args(name, args, 2)?;
                Ok(Value::Bool(text(&args[0]).ends_with(&text(&args[1]))))
            }
            "indexOf" => {
                expect_args(name, args, 2)?;
                let s = text(&args[0]);
                Ok(Value::Int(
                    s.find(&text(&args[1]))
                        .map(|i| char_index(&s, i))
                        .unwrap_or(-1),
                ))
            }
            "replace" => {
                expect_args(name, args, 3)?;
                let (s, before) = (text(&args[0]), text(&args[1]));
                if before.is_empty() {
                    return Ok(Value::String(s));
                }
                Ok(Value::String(s.replace(&before, &text(&args[2]))))
            }
            "split" => {
                expect_args(name, args, 2)?;
                let (s, delims) = (text(&args[0]), text(&args[1]));
                if s.is_empty() {
                    return Ok(Value::array(vec![Value::String(String::new())]));
                }
                let parts = s
                    .split(|c: char| delims.contains(c))
                    .filter(|t| !t.is_empty())
                    .map(Value::from)
                    .collect();
                Ok(Value::array(parts))
            }
            "join" => {
                expect_args(name, args, 2)?;
                let sep = text(&args[1]);
                let joined = match &args[0] {
                    Value::Null => String::new(),
                    Value::Array(items) => items
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(&sep),
                    other => {
                        return Err(ExprError::function(
                            name,
                            format!("can't join {}", other.type_name()),
                        ));
                    }
                };
                Ok(Value::String(joined))
            }
            "escapeXml" => {
                expect_args(name, args, 1)?;
                Ok(Value::String(
                    quick_xml::escape::escape(text(&args[0]).as_str()).into_owned(),
                ))
            }
            _ => Err(ExprError::UnknownFunction(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> Value {
        StringFunctions.call(name, args).unwrap()
    }

    #[test]
    fn test_substring_clamps_bounds() {
        let s = Value::from("template");
        assert_eq!(call("substring", &[s.clone(), Value::Int(0), Value::Int(4)]), Value::from("temp"));
        assert_eq!(call("substring", &[s.clone(), Value::Int(-3), Value::Int(-1)]), Value::from("template"));
        assert_eq!(call("substring", &[s, Value::Int(5), Value::Int(2)]), Value::from(""));
    }

    #[test]
    fn test_search_functions() {
        let s = Value::from("a.b.c");
        assert_eq!(call("substringAfter", &[s.clone(), Value::from(".")]), Value::from("b.c"));
        assert_eq!(call("substringBefore", &[s.clone(), Value::from(".")]), Value::from("a"));
        assert_eq!(call("substringAfter", &[s.clone(), Value::from("x")]), Value::from(""));
        assert_eq!(call("indexOf", &[s.clone(), Value::from("b")]), Value::Int(2));
        assert_eq!(call("indexOf", &[s.clone(), Value::from("z")]), Value::Int(-1));
        assert_eq!(call("containsIgnoreCase", &[s, Value::from("B.C")]), Value::Bool(true));
    }

    #[test]
    fn test_split_and_join() {
        let parts = call("split", &[Value::from("a, b,,c"), Value::from(", ")]);
        assert_eq!(
            parts,
            Value::array(vec![Value::from("a"), Value::from("b"), Value::from("c")])
        );
        assert_eq!(call("join", &[parts, Value::from("-")]), Value::from("a-b-c"));
    }

    #[test]
    fn test_misc() {
        assert_eq!(call("length", &[Value::from("héllo")]), Value::Int(5));
        assert_eq!(call("length", &[Value::Null]), Value::Int(0));
        assert_eq!(call("escapeXml", &[Value::from("<a&b>")]), Value::from("&lt;a&amp;b&gt;"));
        assert_eq!(call("replace", &[Value::from("aXbX"), Value::from("X"), Value::from("-")]), Value::from("a-b-"));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            StringFunctions.call("nope", &[]),
            Err(ExprError::UnknownFunction("nope".to_string()))
        );
        assert!(matches!(
            StringFunctions.call("trim", &[]),
            Err(ExprError::Function { .. })
        ));
    }
}
