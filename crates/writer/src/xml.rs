//! XML serialization of the output event stream.

use crate::formatter::{Dialect, Formatter, delegate_sink};
use crate::sink::Whitespace;
use std::io::Write;

/// Writes well-formed XML to an `io::Write`.
///
/// Empty elements collapse to `<a/>`. The XML declaration is only written when
/// enabled with [`XmlWriter::with_declaration`].
#[derive(Debug)]
pub struct XmlWriter<W: Write> {
    inner: Formatter<W>,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(out: W) -> Self {
        XmlWriter {
            inner: Formatter::new(out, Dialect::Xml),
        }
    }

    pub fn with_whitespace(mut self, whitespace: Whitespace) -> Self {
        self.inner.whitespace = whitespace;
        self
    }

    pub fn with_declaration(mut self, declaration: bool) -> Self {
        self.inner.xml_declaration = declaration;
        self
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

delegate_sink!(XmlWriter);
