//! Output side of xtemplate.
//!
//! The interpreter emits an ordered stream of document events into an
//! [`OutputSink`]. [`XmlWriter`] and [`HtmlWriter`] serialize that stream to any
//! `io::Write`, applying a [`Whitespace`] policy; [`RecordingSink`] keeps the
//! events in memory.

pub mod error;
mod formatter;
pub mod html;
pub mod sink;
pub mod xml;

pub use error::WriteError;
pub use html::HtmlWriter;
pub use sink::{ElementName, OutputAttribute, OutputEvent, OutputSink, RecordingSink, Whitespace};
pub use xml::XmlWriter;
