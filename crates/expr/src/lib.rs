//! Expression language used by xtemplate directives.
//!
//! Expressions are parsed once into an [`Expression`] tree and evaluated against a
//! [`Resolver`], which supplies variable values, namespace prefixes and function
//! libraries. [`substitute`] performs inline `${...}` replacement inside literal
//! text and attribute values.

pub mod ast;
pub mod engine;
pub mod error;
pub mod functions;
pub mod parser;
pub mod substitute;
pub mod value;

pub use ast::{BinaryOperator, Expression, UnaryOperator};
pub use engine::{Resolver, evaluate};
pub use error::ExprError;
pub use functions::{FunctionLibrary, JSTL_FUNCTIONS_NAMESPACE, StringFunctions};
pub use parser::{is_valid_identifier, parse_expression};
pub use substitute::substitute;
pub use value::Value;
