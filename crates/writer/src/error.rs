use thiserror::Error;

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unbalanced end element: expected </{expected}>, found </{found}>")]
    UnbalancedEnd { expected: String, found: String },

    #[error("End element </{0}> with no open element")]
    NoOpenElement(String),

    #[error("Document ended with {0} unclosed element(s)")]
    UnclosedElements(usize),

    #[error("Invalid whitespace option - {0}")]
    InvalidWhitespace(String),
}
