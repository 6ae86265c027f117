//! Runtime values produced by expression evaluation and bound to template variables.

use crate::error::ExprError;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use xtemplate_dom::{NodeKind, NodeRef};

/// A dynamically typed value.
///
/// Arrays and maps are shared behind `Arc` so that cloning a value out of a scope
/// is cheap. `Element` wraps a node of a loaded document and exposes the
/// `tagName`, `elems`, `attrs` and `text` properties to expressions.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Arc<Vec<Value>>),
    Map(Arc<IndexMap<String, Value>>),
    Element(NodeRef),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }

    pub fn map(entries: IndexMap<String, Value>) -> Self {
        Value::Map(Arc::new(entries))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Element(_) => "element",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True only for `Float`; numeric strings don't count, whatever they contain.
    pub fn is_floating(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    /// EL `empty` semantics.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Map(m) => m.is_empty(),
            _ => false,
        }
    }

    pub fn as_boolean(&self) -> Result<bool, ExprError> {
        match self {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s.is_empty() => Ok(false),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(ExprError::Coercion {
                from: other.type_name(),
                to: "boolean",
            }),
        }
    }

    pub fn as_int(&self) -> Result<i64, ExprError> {
        let err = || ExprError::Coercion {
            from: self.type_name(),
            to: "integer",
        };
        match self {
            Value::Null => Ok(0),
            Value::Int(i) => Ok(*i),
            Value::Float(f) => float_to_int(*f).ok_or_else(err),
            Value::String(s) => match parse_number(s) {
                Some(Value::Int(i)) => Ok(i),
                Some(Value::Float(f)) => float_to_int(f).ok_or_else(err),
                _ => Err(err()),
            },
            _ => Err(err()),
        }
    }

    pub fn as_double(&self) -> Result<f64, ExprError> {
        match self {
            Value::Null => Ok(0.0),
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::String(s) => match parse_number(s) {
                Some(Value::Int(i)) => Ok(i as f64),
                Some(Value::Float(f)) => Ok(f),
                _ => Err(ExprError::Coercion {
                    from: "string",
                    to: "float",
                }),
            },
            other => Err(ExprError::Coercion {
                from: other.type_name(),
                to: "float",
            }),
        }
    }

    /// Numeric view of the value: `Int` and `Float` pass through, `Null` is zero and
    /// numeric strings are parsed. Anything else is `None`.
    pub fn to_number(&self) -> Option<Value> {
        match self {
            Value::Null => Some(Value::Int(0)),
            Value::Int(_) | Value::Float(_) => Some(self.clone()),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    }

    /// Items yielded when the value is used as a `<for collection=...>` source.
    /// Maps yield their values. `None` means the value can't be iterated.
    pub fn iterate(&self) -> Option<Vec<Value>> {
        match self {
            Value::Null => Some(Vec::new()),
            Value::Array(items) => Some(items.as_ref().clone()),
            Value::Map(entries) => Some(entries.values().cloned().collect()),
            _ => None,
        }
    }

    /// Looks up a named property of a map or element.
    pub fn property(&self, name: &str) -> Result<Value, ExprError> {
        match self {
            Value::Null => Ok(Value::Null),
            Value::Map(entries) => Ok(entries.get(name).cloned().unwrap_or_default()),
            Value::Element(node) => Ok(element_property(node, name)),
            other => Err(ExprError::Type(format!(
                "Can't access property '{}' of {}",
                name,
                other.type_name()
            ))),
        }
    }
}

fn float_to_int(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}

/// Parses a string as a number, preferring an integer.
pub(crate) fn parse_number(s: &str) -> Option<Value> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::Int(i));
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(Value::Float)
}

fn element_property(node: &NodeRef, name: &str) -> Value {
    match name {
        "tagName" => node
            .tag_name()
            .map(|t| Value::String(t.to_string()))
            .unwrap_or_default(),
        "elems" => Value::array(node.child_elements().map(Value::Element).collect()),
        "attrs" => Value::map(
            node.attributes()
                .iter()
                .filter(|a| !a.is_namespace_declaration())
                .map(|a| (a.name.clone(), Value::String(a.value.clone())))
                .collect(),
        ),
        "text" => Value::String(node.text_content()),
        _ => Value::Null,
    }
}

fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else {
        f.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => f.write_str(&format_float(*x)),
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Element(node) => match node.kind() {
                NodeKind::Element(_) => f.write_str(&node.text_content()),
                _ => f.write_str(node.text().unwrap_or_default()),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NodeRef> for Value {
    fn from(node: NodeRef) -> Self {
        Value::Element(node)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::map(entries)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtemplate_dom::Document;

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(
            Value::array(vec![Value::Int(1), Value::from("a")]).to_string(),
            "[1, a]"
        );
    }

    #[test]
    fn test_boolean_coercion() {
        assert!(!Value::Null.as_boolean().unwrap());
        assert!(Value::from("TRUE").as_boolean().unwrap());
        assert!(!Value::from("").as_boolean().unwrap());
        assert!(Value::Int(1).as_boolean().is_err());
    }

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(Value::from(" 12 ").as_int().unwrap(), 12);
        assert_eq!(Value::Float(3.0).as_int().unwrap(), 3);
        assert!(Value::Float(3.5).as_int().is_err());
        assert_eq!(Value::from("2.5").as_double().unwrap(), 2.5);
        assert!(Value::from("abc").as_double().is_err());
        assert!(Value::Float(2.0).is_floating());
        assert!(!Value::from("2.5").is_floating());
        assert!(!Value::Int(2).is_floating());
    }

    #[test]
    fn test_element_properties() {
        let doc = Document::parse(r#"<row a="1" b="2"><x>one</x><y>two</y></row>"#).unwrap();
        let row = Value::Element(doc.document_element().unwrap());
        assert_eq!(row.property("tagName").unwrap(), Value::from("row"));
        assert_eq!(row.property("text").unwrap(), Value::from("onetwo"));
        match row.property("elems").unwrap() {
            Value::Array(items) => assert_eq!(items.len(), 2),
            other => panic!("expected array, got {:?}", other),
        }
        let attrs = row.property("attrs").unwrap();
        assert_eq!(attrs.property("b").unwrap(), Value::from("2"));
        assert_eq!(row.property("missing").unwrap(), Value::Null);
    }

    #[test]
    fn test_iterate() {
        let mut m = IndexMap::new();
        m.insert("k1".to_string(), Value::Int(1));
        m.insert("k2".to_string(), Value::Int(2));
        assert_eq!(
            Value::map(m).iterate().unwrap(),
            vec![Value::Int(1), Value::Int(2)]
        );
        assert_eq!(Value::Null.iterate().unwrap(), Vec::<Value>::new());
        assert!(Value::Int(3).iterate().is_none());
    }
}
