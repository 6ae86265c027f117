//! HTML serialization of the output event stream.

use crate::formatter::{Dialect, Formatter, delegate_sink};
use crate::sink::Whitespace;
use std::io::Write;

/// Writes HTML: void elements have no end tag, other empty elements are written
/// as `<a></a>`, and `script`/`style` content is not escaped.
#[derive(Debug)]
pub struct HtmlWriter<W: Write> {
    inner: Formatter<W>,
}

impl<W: Write> HtmlWriter<W> {
    pub fn new(out: W) -> Self {
        HtmlWriter {
            inner: Formatter::new(out, Dialect::Html),
        }
    }

    pub fn with_whitespace(mut self, whitespace: Whitespace) -> Self {
        self.inner.whitespace = whitespace;
        self
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

delegate_sink!(HtmlWriter);
