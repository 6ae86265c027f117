//! Read-only XML document tree used by the template interpreter.
//!
//! Documents are parsed once into an arena of nodes addressed by [`NodeId`].
//! A [`NodeRef`] pairs a shared [`Document`] with a node id, so node handles can
//! be stored in variables, intercept rules and diagnostics without borrowing
//! from the parser input.

pub mod error;
pub mod node;
pub mod parser;

pub use error::DomError;
pub use node::{
    Attribute, Document, Element, Location, NodeId, NodeKind, NodeRef, XML_NAMESPACE,
    XMLNS_NAMESPACE,
};
