//! The evaluation engine for parsed expressions.

use super::ast::*;
use crate::error::ExprError;
use crate::functions::FunctionLibrary;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Supplies the environment an expression is evaluated in.
pub trait Resolver {
    /// Looks up a variable. `None` means the name is not bound anywhere.
    fn resolve(&self, identifier: &str) -> Option<Value>;

    /// Maps a function prefix to its namespace URI.
    fn resolve_prefix(&self, _prefix: &str) -> Option<String> {
        None
    }

    /// Finds the function library registered for a namespace URI.
    fn resolve_namespace(&self, _uri: &str) -> Option<Arc<dyn FunctionLibrary>> {
        None
    }
}

impl Resolver for HashMap<String, Value> {
    fn resolve(&self, identifier: &str) -> Option<Value> {
        self.get(identifier).cloned()
    }
}

/// The main entry point for evaluating an expression.
pub fn evaluate(expr: &Expression, resolver: &dyn Resolver) -> Result<Value, ExprError> {
    match expr {
        Expression::Literal(v) => Ok(v.clone()),
        Expression::Identifier(name) => resolver
            .resolve(name)
            .ok_or_else(|| ExprError::UnknownVariable(name.clone())),
        Expression::Array(items) => {
            let values = items
                .iter()
                .map(|e| evaluate(e, resolver))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::array(values))
        }
        Expression::Object(entries) => {
            let map = entries
                .iter()
                .map(|(k, e)| Ok((k.clone(), evaluate(e, resolver)?)))
                .collect::<Result<_, ExprError>>()?;
            Ok(Value::map(map))
        }
        Expression::Property { target, name } => evaluate(target, resolver)?.property(name),
        Expression::Index { target, index } => {
            let target = evaluate(target, resolver)?;
            let index = evaluate(index, resolver)?;
            evaluate_index(&target, &index)
        }
        Expression::FunctionCall { prefix, name, args } => {
            let uri = resolver
                .resolve_prefix(prefix)
                .ok_or_else(|| ExprError::UnknownPrefix(prefix.clone()))?;
            let library = resolver
                .resolve_namespace(&uri)
                .ok_or_else(|| ExprError::UnknownNamespace(uri.clone()))?;
            let args = args
                .iter()
                .map(|e| evaluate(e, resolver))
                .collect::<Result<Vec<_>, _>>()?;
            library.call(name, &args)
        }
        Expression::UnaryOp { op, expr } => {
            let value = evaluate(expr, resolver)?;
            match op {
                UnaryOperator::Not => Ok(Value::Bool(!value.as_boolean()?)),
                UnaryOperator::Empty => Ok(Value::Bool(value.is_empty())),
                UnaryOperator::Minus => negate(&value),
            }
        }
        Expression::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => {
                if !evaluate(left, resolver)?.as_boolean()? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(evaluate(right, resolver)?.as_boolean()?))
            }
            BinaryOperator::Or => {
                if evaluate(left, resolver)?.as_boolean()? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(evaluate(right, resolver)?.as_boolean()?))
            }
            _ => {
                let l = evaluate(left, resolver)?;
                let r = evaluate(right, resolver)?;
                evaluate_binary(&l, *op, &r)
            }
        },
        Expression::Conditional {
            test,
            then,
            otherwise,
        } => {
            if evaluate(test, resolver)?.as_boolean()? {
                evaluate(then, resolver)
            } else {
                evaluate(otherwise, resolver)
            }
        }
    }
}

fn evaluate_index(target: &Value, index: &Value) -> Result<Value, ExprError> {
    match target {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => {
            let i = index.as_int()?;
            Ok(usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or_default())
        }
        Value::Map(_) | Value::Element(_) => target.property(&index.to_string()),
        other => Err(ExprError::Type(format!(
            "Can't index into {}",
            other.type_name()
        ))),
    }
}

fn negate(value: &Value) -> Result<Value, ExprError> {
    match value.to_number() {
        Some(Value::Int(i)) => i
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| ExprError::Arithmetic("integer overflow".to_string())),
        Some(Value::Float(f)) => Ok(Value::Float(-f)),
        _ => Err(ExprError::Type(format!(
            "Can't negate {}",
            value.type_name()
        ))),
    }
}

fn evaluate_binary(l: &Value, op: BinaryOperator, r: &Value) -> Result<Value, ExprError> {
    match op {
        BinaryOperator::Equals => Ok(Value::Bool(values_equal(l, r))),
        BinaryOperator::NotEquals => Ok(Value::Bool(!values_equal(l, r))),
        BinaryOperator::LessThan
        | BinaryOperator::LessThanOrEqual
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterThanOrEqual => {
            let ordering = compare(l, r)?;
            Ok(Value::Bool(match op {
                BinaryOperator::LessThan => ordering == Ordering::Less,
                BinaryOperator::LessThanOrEqual => ordering != Ordering::Greater,
                BinaryOperator::GreaterThan => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        BinaryOperator::Plus
            if matches!(l, Value::String(_)) || matches!(r, Value::String(_)) =>
        {
            Ok(Value::String(format!("{}{}", l, r)))
        }
        BinaryOperator::Divide => {
            let (a, b) = (numeric_operand(l)?, numeric_operand(r)?);
            Ok(Value::Float(to_f64(&a) / to_f64(&b)))
        }
        BinaryOperator::Plus
        | BinaryOperator::Minus
        | BinaryOperator::Multiply
        | BinaryOperator::Modulo => {
            let (a, b) = (numeric_operand(l)?, numeric_operand(r)?);
            match (a, b) {
                (Value::Int(x), Value::Int(y)) => integer_arithmetic(x, op, y),
                (a, b) => {
                    let (x, y) = (to_f64(&a), to_f64(&b));
                    Ok(Value::Float(match op {
                        BinaryOperator::Plus => x + y,
                        BinaryOperator::Minus => x - y,
                        BinaryOperator::Multiply => x * y,
                        _ => x % y,
                    }))
                }
            }
        }
        BinaryOperator::And => Ok(Value::Bool(l.as_boolean()? && r.as_boolean()?)),
        BinaryOperator::Or => Ok(Value::Bool(l.as_boolean()? || r.as_boolean()?)),
    }
}

fn integer_arithmetic(x: i64, op: BinaryOperator, y: i64) -> Result<Value, ExprError> {
    let result = match op {
        BinaryOperator::Plus => x.checked_add(y),
        BinaryOperator::Minus => x.checked_sub(y),
        BinaryOperator::Multiply => x.checked_mul(y),
        _ => {
            if y == 0 {
                return Err(ExprError::Arithmetic("Modulo by zero".to_string()));
            }
            x.checked_rem(y)
        }
    };
    result
        .map(Value::Int)
        .ok_or_else(|| ExprError::Arithmetic("integer overflow".to_string()))
}

fn numeric_operand(v: &Value) -> Result<Value, ExprError> {
    v.to_number().ok_or_else(|| {
        ExprError::Type(format!("Can't use {} in arithmetic", v.type_name()))
    })
}

fn to_f64(v: &Value) -> f64 {
    match v {
        Value::Int(i) => *i as f64,
        Value::Float(f) => *f,
        _ => f64::NAN,
    }
}

/// Equality with numeric coercion: `"3" == 3` holds, as does `"true" == true`.
pub(crate) fn values_equal(l: &Value, r: &Value) -> bool {
    match (l, r) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Bool(b), Value::String(s)) | (Value::String(s), Value::Bool(b)) => {
            s.eq_ignore_ascii_case(if *b { "true" } else { "false" })
        }
        (Value::String(a), Value::String(b)) => a == b,
        (
            Value::Int(_) | Value::Float(_) | Value::String(_),
            Value::Int(_) | Value::Float(_) | Value::String(_),
        ) => match (l.to_number(), r.to_number()) {
            (Some(a), Some(b)) => to_f64(&a) == to_f64(&b),
            _ => false,
        },
        _ => l == r,
    }
}

fn compare(l: &Value, r: &Value) -> Result<Ordering, ExprError> {
    if let (Value::String(a), Value::String(b)) = (l, r) {
        return Ok(a.cmp(b));
    }
    match (l.to_number(), r.to_number()) {
        (Some(Value::Int(a)), Some(Value::Int(b))) => Ok(a.cmp(&b)),
        (Some(a), Some(b)) => to_f64(&a).partial_cmp(&to_f64(&b)).ok_or_else(|| {
            ExprError::Arithmetic("Can't compare NaN".to_string())
        }),
        _ => Err(ExprError::Type(format!(
            "Can't compare {} with {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_expression;

    fn eval(text: &str, vars: &HashMap<String, Value>) -> Result<Value, ExprError> {
        evaluate(&parse_expression(text).unwrap(), vars)
    }

    fn vars() -> HashMap<String, Value> {
        let mut v = HashMap::new();
        v.insert("a".to_string(), Value::Int(3));
        v.insert("name".to_string(), Value::from("xt"));
        v.insert("count".to_string(), Value::from("3"));
        v.insert(
            "list".to_string(),
            Value::array(vec![Value::Int(10), Value::Int(20)]),
        );
        v
    }

    #[test]
    fn test_arithmetic() {
        let v = vars();
        assert_eq!(eval("a * a", &v).unwrap(), Value::Int(9));
        assert_eq!(eval("a + 0.5", &v).unwrap(), Value::Float(3.5));
        assert_eq!(eval("7 / 2", &v).unwrap(), Value::Float(3.5));
        assert_eq!(eval("7 mod 4", &v).unwrap(), Value::Int(3));
        assert_eq!(eval("-a", &v).unwrap(), Value::Int(-3));
        assert_eq!(eval("count * 2", &v).unwrap(), Value::Int(6));
        assert!(matches!(eval("1 % 0", &v), Err(ExprError::Arithmetic(_))));
    }

    #[test]
    fn test_string_concatenation() {
        let v = vars();
        assert_eq!(eval("name + '-' + a", &v).unwrap(), Value::from("xt-3"));
    }

    #[test]
    fn test_comparison_and_logic() {
        let v = vars();
        assert_eq!(eval("a == count", &v).unwrap(), Value::Bool(true));
        assert_eq!(eval("a gt 2 && name eq 'xt'", &v).unwrap(), Value::Bool(true));
        assert_eq!(eval("'abc' < 'abd'", &v).unwrap(), Value::Bool(true));
        assert!(eval("empty missing || true", &v).is_err());
        assert_eq!(eval("false && missing", &v).unwrap(), Value::Bool(false));
        assert_eq!(eval("a == null", &v).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_accessors_and_conditional() {
        let v = vars();
        assert_eq!(eval("list[1]", &v).unwrap(), Value::Int(20));
        assert_eq!(eval("list[5]", &v).unwrap(), Value::Null);
        assert_eq!(eval("{'k': a}.k", &v).unwrap(), Value::Int(3));
        assert_eq!(eval("empty list ? 'none' : 'some'", &v).unwrap(), Value::from("some"));
    }

    #[test]
    fn test_unknown_names() {
        let v = vars();
        assert_eq!(
            eval("missing", &v),
            Err(ExprError::UnknownVariable("missing".to_string()))
        );
        assert_eq!(
            eval("fn:length(name)", &v),
            Err(ExprError::UnknownPrefix("fn".to_string()))
        );
    }

    #[test]
    fn test_type_errors() {
        let v = vars();
        assert!(matches!(eval("list - 1", &v), Err(ExprError::Type(_))));
        assert!(matches!(eval("a.b", &v), Err(ExprError::Type(_))));
        assert!(matches!(eval("!a", &v), Err(ExprError::Coercion { .. })));
    }
}
