//! Defines the Abstract Syntax Tree (AST) for template expressions.

use crate::value::Value;

/// The top-level expression that can be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Identifier(String),
    Array(Vec<Expression>),
    Object(Vec<(String, Expression)>),
    /// `target.name`
    Property {
        target: Box<Expression>,
        name: String,
    },
    /// `target[index]`
    Index {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    /// `prefix:name(args...)`
    FunctionCall {
        prefix: String,
        name: String,
        args: Vec<Expression>,
    },
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    Conditional {
        test: Box<Expression>,
        then: Box<Expression>,
        otherwise: Box<Expression>,
    },
}

impl Expression {
    /// Parses expression source text.
    pub fn parse(text: &str) -> Result<Expression, crate::ExprError> {
        crate::parser::parse_expression(text)
    }

    /// Evaluates the expression against a resolver.
    pub fn evaluate(&self, resolver: &dyn crate::Resolver) -> Result<Value, crate::ExprError> {
        crate::engine::evaluate(self, resolver)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Not,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Logical
    Or,
    And,
    // Equality
    Equals,
    NotEquals,
    // Relational
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    // Additive
    Plus,
    Minus,
    // Multiplicative
    Multiply,
    Divide,
    Modulo,
}
