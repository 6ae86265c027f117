//! Serialization state shared by the XML and HTML writers.

use crate::error::WriteError;
use crate::sink::{ElementName, OutputAttribute, Whitespace};
use quick_xml::escape::{escape, partial_escape};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    Xml,
    Html,
}

const HTML_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const HTML_RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

fn is_one_of(name: &str, list: &[&str]) -> bool {
    list.iter().any(|n| n.eq_ignore_ascii_case(name))
}

#[derive(Debug)]
struct OpenElement {
    name: String,
    has_child_elements: bool,
    has_text: bool,
    void: bool,
    raw_text: bool,
}

#[derive(Debug)]
pub(crate) struct Formatter<W: Write> {
    out: W,
    dialect: Dialect,
    pub(crate) whitespace: Whitespace,
    pub(crate) xml_declaration: bool,
    open: Vec<OpenElement>,
    start_tag_open: bool,
    pending_text: String,
    in_cdata: bool,
    cdata: String,
    written: bool,
    at_line_start: bool,
}

impl<W: Write> Formatter<W> {
    pub(crate) fn new(out: W, dialect: Dialect) -> Self {
        Formatter {
            out,
            dialect,
            whitespace: Whitespace::default(),
            xml_declaration: false,
            open: Vec::new(),
            start_tag_open: false,
            pending_text: String::new(),
            in_cdata: false,
            cdata: String::new(),
            written: false,
            at_line_start: true,
        }
    }

    pub(crate) fn into_inner(self) -> W {
        self.out
    }

    fn write_str(&mut self, s: &str) -> Result<(), WriteError> {
        if s.is_empty() {
            return Ok(());
        }
        self.out.write_all(s.as_bytes())?;
        self.written = true;
        self.at_line_start = s.ends_with('\n');
        Ok(())
    }

    fn close_start_tag(&mut self) -> Result<(), WriteError> {
        if self.start_tag_open {
            self.start_tag_open = false;
            self.write_str(">")?;
        }
        Ok(())
    }

    fn newline_indent(&mut self, depth: usize) -> Result<(), WriteError> {
        if self.whitespace != Whitespace::Indent || !self.written {
            return Ok(());
        }
        let mut s = String::with_capacity(depth * 2 + 1);
        if !self.at_line_start {
            s.push('\n');
        }
        s.push_str(&"  ".repeat(depth));
        self.write_str(&s)
    }

    fn flush_text(&mut self) -> Result<(), WriteError> {
        if self.pending_text.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.pending_text);
        if self.whitespace != Whitespace::All && text.chars().all(char::is_whitespace) {
            return Ok(());
        }
        self.close_start_tag()?;
        let raw = self.open.last().is_some_and(|e| e.raw_text);
        if let Some(parent) = self.open.last_mut() {
            parent.has_text = true;
        }
        if raw {
            self.write_str(&text)
        } else {
            self.write_str(&partial_escape(text.as_str()))
        }
    }

    pub(crate) fn start_document(&mut self) -> Result<(), WriteError> {
        if self.dialect == Dialect::Xml && self.xml_declaration {
            self.write_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n")?;
        }
        Ok(())
    }

    pub(crate) fn end_document(&mut self) -> Result<(), WriteError> {
        self.flush_text()?;
        if !self.open.is_empty() {
            return Err(WriteError::UnclosedElements(self.open.len()));
        }
        if self.whitespace == Whitespace::Indent && !self.at_line_start {
            self.write_str("\n")?;
        }
        self.out.flush()?;
        Ok(())
    }

    pub(crate) fn start_element(
        &mut self,
        name: &ElementName,
        attributes: &[OutputAttribute],
    ) -> Result<(), WriteError> {
        self.flush_text()?;
        self.close_start_tag()?;
        let parent_has_text = self.open.last().is_some_and(|e| e.has_text);
        if !parent_has_text {
            self.newline_indent(self.open.len())?;
        }
        if let Some(parent) = self.open.last_mut() {
            parent.has_child_elements = true;
        }
        let mut tag = String::with_capacity(64);
        tag.push('<');
        tag.push_str(&name.qualified_name);
        for attr in attributes {
            tag.push(' ');
            tag.push_str(&attr.qualified_name);
            tag.push_str("=\"");
            tag.push_str(&escape(attr.value.as_str()));
            tag.push('"');
        }
        self.write_str(&tag)?;
        self.start_tag_open = true;
        let html = self.dialect == Dialect::Html;
        self.open.push(OpenElement {
            name: name.qualified_name.clone(),
            has_child_elements: false,
            has_text: false,
            void: html && is_one_of(&name.local_name, HTML_VOID_ELEMENTS),
            raw_text: html && is_one_of(&name.local_name, HTML_RAW_TEXT_ELEMENTS),
        });
        Ok(())
    }

    pub(crate) fn end_element(&mut self, name: &ElementName) -> Result<(), WriteError> {
        self.flush_text()?;
        let element = self
            .open
            .pop()
            .ok_or_else(|| WriteError::NoOpenElement(name.qualified_name.clone()))?;
        if element.name != name.qualified_name {
            return Err(WriteError::UnbalancedEnd {
                expected: element.name,
                found: name.qualified_name.clone(),
            });
        }
        if self.start_tag_open && self.dialect == Dialect::Xml {
            self.start_tag_open = false;
            return self.write_str("/>");
        }
        self.close_start_tag()?;
        if element.void {
            return Ok(());
        }
        if element.has_child_elements && !element.has_text {
            self.newline_indent(self.open.len())?;
        }
        self.write_str(&format!("</{}>", element.name))
    }

    pub(crate) fn characters(&mut self, text: &str) -> Result<(), WriteError> {
        if self.in_cdata {
            self.cdata.push_str(text);
        } else {
            self.pending_text.push_str(text);
        }
        Ok(())
    }

    pub(crate) fn start_cdata(&mut self) -> Result<(), WriteError> {
        self.flush_text()?;
        self.in_cdata = true;
        Ok(())
    }

    pub(crate) fn end_cdata(&mut self) -> Result<(), WriteError> {
        self.in_cdata = false;
        let data = std::mem::take(&mut self.cdata);
        self.close_start_tag()?;
        if let Some(parent) = self.open.last_mut() {
            parent.has_text = true;
        }
        match self.dialect {
            Dialect::Xml => self.write_str(&format!(
                "<![CDATA[{}]]>",
                data.replace("]]>", "]]]]><![CDATA[>")
            )),
            Dialect::Html => self.write_str(&partial_escape(data.as_str())),
        }
    }

    pub(crate) fn start_dtd(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<(), WriteError> {
        self.flush_text()?;
        self.close_start_tag()?;
        let mut dtd = format!("<!DOCTYPE {}", name);
        match (public_id, system_id) {
            (Some(public), Some(system)) => {
                dtd.push_str(&format!(" PUBLIC \"{}\" \"{}\"", public, system))
            }
            (Some(public), None) => dtd.push_str(&format!(" PUBLIC \"{}\"", public)),
            (None, Some(system)) => dtd.push_str(&format!(" SYSTEM \"{}\"", system)),
            (None, None) => {}
        }
        dtd.push_str(">\n");
        self.write_str(&dtd)
    }

    pub(crate) fn end_dtd(&mut self) -> Result<(), WriteError> {
        Ok(())
    }
}

/// Implements `OutputSink` for a newtype wrapping a `Formatter` in field `inner`.
macro_rules! delegate_sink {
    ($writer:ident) => {
        impl<W: std::io::Write> $crate::sink::OutputSink for $writer<W> {
            fn start_document(&mut self) -> Result<(), $crate::WriteError> {
                self.inner.start_document()
            }

            fn end_document(&mut self) -> Result<(), $crate::WriteError> {
                self.inner.end_document()
            }

            fn start_element(
                &mut self,
                name: &$crate::ElementName,
                attributes: &[$crate::OutputAttribute],
            ) -> Result<(), $crate::WriteError> {
                self.inner.start_element(name, attributes)
            }

            fn end_element(&mut self, name: &$crate::ElementName) -> Result<(), $crate::WriteError> {
                self.inner.end_element(name)
            }

            fn characters(&mut self, text: &str) -> Result<(), $crate::WriteError> {
                self.inner.characters(text)
            }

            fn start_cdata(&mut self) -> Result<(), $crate::WriteError> {
                self.inner.start_cdata()
            }

            fn end_cdata(&mut self) -> Result<(), $crate::WriteError> {
                self.inner.end_cdata()
            }

            fn start_dtd(
                &mut self,
                name: &str,
                public_id: Option<&str>,
                system_id: Option<&str>,
            ) -> Result<(), $crate::WriteError> {
                self.inner.start_dtd(name, public_id, system_id)
            }

            fn end_dtd(&mut self) -> Result<(), $crate::WriteError> {
                self.inner.end_dtd()
            }
        }
    };
}

pub(crate) use delegate_sink;
