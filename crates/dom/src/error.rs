use crate::node::Location;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DomError {
    #[error("XML syntax error at {location}: {message}")]
    Syntax { message: String, location: Location },

    #[error("Unbound namespace prefix '{prefix}' at {location}")]
    UnboundPrefix { prefix: String, location: Location },

    #[error("Mismatched end tag '{found}' (expected '{expected}') at {location}")]
    MismatchedEndTag {
        expected: String,
        found: String,
        location: Location,
    },

    #[error("Unknown entity reference '&{name};' at {location}")]
    UnknownEntity { name: String, location: Location },

    #[error("Element '{0}' is not closed")]
    UnclosedElement(String),

    #[error("Document has no root element")]
    NoRootElement,

    #[error("Document has more than one root element")]
    MultipleRootElements,
}

impl DomError {
    pub(crate) fn syntax(message: impl Into<String>, location: Location) -> Self {
        DomError::Syntax {
            message: message.into(),
            location,
        }
    }
}
