use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("Expression parse error in '{expression}': {message}")]
    Parse { expression: String, message: String },

    #[error("Unterminated expression in '{0}'")]
    Unterminated(String),

    #[error("Identifier not recognised - {0}")]
    UnknownVariable(String),

    #[error("Namespace prefix not recognised - {0}")]
    UnknownPrefix(String),

    #[error("No implementation registered for namespace - {0}")]
    UnknownNamespace(String),

    #[error("Function not recognised - {0}")]
    UnknownFunction(String),

    #[error("Type error: {0}")]
    Type(String),

    #[error("Can't convert {from} to {to}")]
    Coercion { from: &'static str, to: &'static str },

    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    #[error("Function '{function}' error: {message}")]
    Function { function: String, message: String },
}

impl ExprError {
    pub fn function(function: impl Into<String>, message: impl Into<String>) -> Self {
        ExprError::Function {
            function: function.into(),
            message: message.into(),
        }
    }
}
