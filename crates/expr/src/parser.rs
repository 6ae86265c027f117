//! A `nom`-based parser for the template expression language.
//!
//! The grammar follows the JSP expression language: literals, identifiers,
//! `.name` and `[index]` accessors, `prefix:fn(...)` calls, the usual arithmetic,
//! relational and logical operators (with their word forms such as `eq`, `and`,
//! `div`), `empty`, and the `a ? b : c` conditional.

use super::ast::*;
use crate::error::ExprError;
use crate::value::Value;
use indexmap::IndexMap;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0, one_of},
    combinator::{map, not, opt, peek, recognize, verify},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
};

// --- Main Public Parser ---

pub fn parse_expression(input: &str) -> Result<Expression, ExprError> {
    match expression(input.trim()) {
        Ok(("", expr)) => Ok(expr),
        Ok((rem, _)) => Err(ExprError::Parse {
            expression: input.to_string(),
            message: format!("Unexpected input at '{}'", rem),
        }),
        Err(e) => Err(ExprError::Parse {
            expression: input.to_string(),
            message: e.to_string(),
        }),
    }
}

const RESERVED_WORDS: &[&str] = &[
    "and", "or", "not", "eq", "ne", "lt", "gt", "le", "ge", "true", "false", "null", "empty",
    "div", "mod", "instanceof",
];

/// True for a name usable as a variable, macro or loop name: an identifier start
/// followed by identifier parts, and not a reserved word of the expression language.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_identifier_start(c) => {}
        _ => return false,
    }
    chars.all(is_identifier_part) && !RESERVED_WORDS.contains(&name)
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

// --- Combinators & Helpers ---

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

/// Matches a word operator such as `and` only when it is not the prefix of a longer name.
fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, Output = &'a str, Error = nom::error::Error<&'a str>> {
    terminated(tag(word), not(peek(take_while1(is_identifier_part))))
}

fn build_binary_expr_parser<'a, F, G>(
    sub_expr_parser: F,
    op_parser: G,
) -> impl FnMut(&'a str) -> IResult<&'a str, Expression>
where
    F: Parser<&'a str, Output = Expression, Error = nom::error::Error<&'a str>> + Clone,
    G: Parser<&'a str, Output = BinaryOperator, Error = nom::error::Error<&'a str>> + Clone,
{
    move |input: &str| {
        let (input, mut left) = sub_expr_parser.clone().parse(input)?;
        let (input, remainder) =
            many0(pair(ws(op_parser.clone()), sub_expr_parser.clone())).parse(input)?;

        for (op, right) in remainder {
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok((input, left))
    }
}

// --- Expression Parsers (in order of precedence) ---

fn expression(input: &str) -> IResult<&str, Expression> {
    conditional_expr(input)
}

fn conditional_expr(input: &str) -> IResult<&str, Expression> {
    let (input, test) = or_expr(input)?;
    let (input, branches) = opt(pair(
        preceded(ws(char('?')), expression),
        preceded(ws(char(':')), expression),
    ))
    .parse(input)?;
    match branches {
        Some((then, otherwise)) => Ok((
            input,
            Expression::Conditional {
                test: Box::new(test),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
        )),
        None => Ok((input, test)),
    }
}

fn or_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(alt((tag("||"), keyword("or"))), |_| BinaryOperator::Or).parse(input)
}

fn and_op(input: &str) -> IResult<&str, BinaryOperator> {
    map(alt((tag("&&"), keyword("and"))), |_| BinaryOperator::And).parse(input)
}

fn or_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(and_expr, or_op)(input)
}

fn and_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(equality_expr, and_op)(input)
}

fn equality_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(alt((tag("=="), keyword("eq"))), |_| BinaryOperator::Equals),
        map(alt((tag("!="), keyword("ne"))), |_| BinaryOperator::NotEquals),
    ))
    .parse(input)
}

fn relational_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(alt((tag("<="), keyword("le"))), |_| BinaryOperator::LessThanOrEqual),
        map(alt((tag(">="), keyword("ge"))), |_| BinaryOperator::GreaterThanOrEqual),
        map(alt((tag("<"), keyword("lt"))), |_| BinaryOperator::LessThan),
        map(alt((tag(">"), keyword("gt"))), |_| BinaryOperator::GreaterThan),
    ))
    .parse(input)
}

fn additive_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(char('+'), |_| BinaryOperator::Plus),
        map(char('-'), |_| BinaryOperator::Minus),
    ))
    .parse(input)
}

fn multiplicative_op(input: &str) -> IResult<&str, BinaryOperator> {
    alt((
        map(char('*'), |_| BinaryOperator::Multiply),
        map(alt((tag("/"), keyword("div"))), |_| BinaryOperator::Divide),
        map(alt((tag("%"), keyword("mod"))), |_| BinaryOperator::Modulo),
    ))
    .parse(input)
}

fn equality_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(relational_expr, equality_op)(input)
}

fn relational_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(additive_expr, relational_op)(input)
}

fn additive_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(multiplicative_expr, additive_op)(input)
}

fn multiplicative_expr(input: &str) -> IResult<&str, Expression> {
    build_binary_expr_parser(unary_expr, multiplicative_op)(input)
}

fn unary_op(input: &str) -> IResult<&str, UnaryOperator> {
    alt((
        map(char('-'), |_| UnaryOperator::Minus),
        map(terminated(char('!'), not(peek(char('=')))), |_| UnaryOperator::Not),
        map(keyword("not"), |_| UnaryOperator::Not),
        map(keyword("empty"), |_| UnaryOperator::Empty),
    ))
    .parse(input)
}

fn unary_expr(input: &str) -> IResult<&str, Expression> {
    let (i, op) = opt(ws(unary_op)).parse(input)?;
    match op {
        Some(op) => {
            let (i, expr) = unary_expr(i)?;
            Ok((
                i,
                Expression::UnaryOp {
                    op,
                    expr: Box::new(expr),
                },
            ))
        }
        None => postfix_expr(i),
    }
}

enum Accessor {
    Property(String),
    Index(Expression),
}

fn accessor(input: &str) -> IResult<&str, Accessor> {
    alt((
        map(preceded(ws(char('.')), identifier), |name| {
            Accessor::Property(name.to_string())
        }),
        map(
            delimited(ws(char('[')), expression, ws(char(']'))),
            Accessor::Index,
        ),
    ))
    .parse(input)
}

fn postfix_expr(input: &str) -> IResult<&str, Expression> {
    let (input, mut expr) = ws(primary_expr).parse(input)?;
    let (input, accessors) = many0(accessor).parse(input)?;
    for accessor in accessors {
        expr = match accessor {
            Accessor::Property(name) => Expression::Property {
                target: Box::new(expr),
                name,
            },
            Accessor::Index(index) => Expression::Index {
                target: Box::new(expr),
                index: Box::new(index),
            },
        };
    }
    Ok((input, expr))
}

// --- Primary Expressions ---

fn primary_expr(input: &str) -> IResult<&str, Expression> {
    alt((
        delimited(ws(char('(')), expression, ws(char(')'))),
        map(number_literal, Expression::Literal),
        map(string_literal, |s| Expression::Literal(Value::String(s))),
        map(keyword("true"), |_| Expression::Literal(Value::Bool(true))),
        map(keyword("false"), |_| Expression::Literal(Value::Bool(false))),
        map(keyword("null"), |_| Expression::Literal(Value::Null)),
        array_literal,
        object_literal,
        function_call,
        map(variable_name, |name| Expression::Identifier(name.to_string())),
    ))
    .parse(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(is_identifier_start),
        take_while(is_identifier_part),
    ))
    .parse(input)
}

fn variable_name(input: &str) -> IResult<&str, &str> {
    verify(identifier, |name: &str| !RESERVED_WORDS.contains(&name)).parse(input)
}

fn function_call(input: &str) -> IResult<&str, Expression> {
    let (input, (prefix, name)) = separated_pair(identifier, char(':'), identifier).parse(input)?;
    let (input, args) = delimited(
        ws(char('(')),
        separated_list0(ws(char(',')), expression),
        ws(char(')')),
    )
    .parse(input)?;
    Ok((
        input,
        Expression::FunctionCall {
            prefix: prefix.to_string(),
            name: name.to_string(),
            args,
        },
    ))
}

fn array_literal(input: &str) -> IResult<&str, Expression> {
    map(
        delimited(
            ws(char('[')),
            separated_list0(ws(char(',')), expression),
            ws(char(']')),
        ),
        Expression::Array,
    )
    .parse(input)
}

fn object_literal(input: &str) -> IResult<&str, Expression> {
    let entry = separated_pair(
        ws(alt((string_literal, map(identifier, str::to_string)))),
        char(':'),
        expression,
    );
    let (input, entries) = delimited(
        ws(char('{')),
        separated_list0(ws(char(',')), entry),
        ws(char('}')),
    )
    .parse(input)?;
    // Later duplicates replace earlier ones, keeping first-seen order.
    let mut unique: IndexMap<String, Expression> = IndexMap::new();
    for (key, value) in entries {
        unique.insert(key, value);
    }
    Ok((input, Expression::Object(unique.into_iter().collect())))
}

fn number_literal(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize(pair(
        digit1,
        pair(
            opt(pair(char('.'), digit1)),
            opt((one_of("eE"), opt(one_of("+-")), digit1)),
        ),
    ))
    .parse(input)?;
    let is_float = text.contains(['.', 'e', 'E']);
    let value = if is_float {
        text.parse::<f64>().ok().map(Value::Float)
    } else {
        text.parse::<i64>()
            .ok()
            .map(Value::Int)
            .or_else(|| text.parse::<f64>().ok().map(Value::Float))
    };
    match value {
        Some(v) => Ok((rest, v)),
        None => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Float,
        ))),
    }
}

/// Single- or double-quoted string with backslash escapes.
fn string_literal(input: &str) -> IResult<&str, String> {
    let fail = || nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Char));
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, q @ ('\'' | '"'))) => q,
        _ => return Err(fail()),
    };
    let mut out = String::new();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, escaped)) => out.push(escaped),
                None => return Err(fail()),
            },
            c if c == quote => return Ok((&input[i + c.len_utf8()..], out)),
            c => out.push(c),
        }
    }
    Err(fail())
}
