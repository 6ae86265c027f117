//! Builds a [`Document`] arena from quick-xml reader events.
use crate::error::DomError;
use crate::node::{
    Attribute, Document, Element, Location, NodeData, NodeId, NodeKind, XML_NAMESPACE,
    XMLNS_NAMESPACE,
};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event as XmlEvent};

/// Drives the parsing process, feeding every significant XML event to a [`TreeBuilder`].
pub fn parse_document(source: &str) -> Result<Document, DomError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);
    let mut builder = TreeBuilder::new(source);

    loop {
        let pos = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| DomError::syntax(e.to_string(), builder.location(pos)))?;
        match event {
            XmlEvent::Start(e) => builder.start_element(&e, pos, false)?,
            XmlEvent::Empty(e) => builder.start_element(&e, pos, true)?,
            XmlEvent::End(e) => {
                let name = utf8(e.name().as_ref(), builder.location(pos))?.to_string();
                builder.end_element(&name, pos)?;
            }
            XmlEvent::Text(e) => {
                let text = e
                    .decode()
                    .map_err(|err| DomError::syntax(err.to_string(), builder.location(pos)))?;
                builder.text(&text, pos)?;
            }
            XmlEvent::GeneralRef(e) => {
                let name = e
                    .decode()
                    .map_err(|err| DomError::syntax(err.to_string(), builder.location(pos)))?;
                let resolved = resolve_entity(&name, builder.location(pos))?;
                builder.text(&resolved, pos)?;
            }
            XmlEvent::CData(e) => {
                let text = utf8(e.as_ref(), builder.location(pos))?.to_string();
                builder.leaf(NodeKind::CData(text), pos)?;
            }
            XmlEvent::Comment(e) => {
                let text = utf8(e.as_ref(), builder.location(pos))?.to_string();
                builder.leaf(NodeKind::Comment(text), pos)?;
            }
            XmlEvent::PI(e) => {
                let content = utf8(e.as_ref(), builder.location(pos))?;
                let (target, data) = content
                    .split_once(char::is_whitespace)
                    .unwrap_or((content, ""));
                builder.leaf(
                    NodeKind::ProcessingInstruction {
                        target: target.to_string(),
                        data: data.trim().to_string(),
                    },
                    pos,
                )?;
            }
            XmlEvent::Eof => break,
            // XML declaration and DOCTYPE carry nothing the tree needs.
            _ => (),
        }
    }

    builder.finish()
}

fn utf8(bytes: &[u8], location: Location) -> Result<&str, DomError> {
    std::str::from_utf8(bytes).map_err(|e| DomError::syntax(e.to_string(), location))
}

fn resolve_entity(name: &str, location: Location) -> Result<String, DomError> {
    let predefined = match name {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        _ => None,
    };
    if let Some(s) = predefined {
        return Ok(s.to_string());
    }
    if let Some(rest) = name.strip_prefix('#') {
        let code = match rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => rest.parse::<u32>().ok(),
        };
        if let Some(ch) = code.and_then(char::from_u32) {
            return Ok(ch.to_string());
        }
    }
    Err(DomError::UnknownEntity {
        name: name.to_string(),
        location,
    })
}

fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

struct TreeBuilder {
    nodes: Vec<NodeData>,
    /// Open elements, innermost last.
    open: Vec<NodeId>,
    line_starts: Vec<usize>,
}

impl TreeBuilder {
    fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        TreeBuilder {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
                location: Location { line: 1, col: 1 },
            }],
            open: Vec::new(),
            line_starts,
        }
    }

    fn location(&self, pos: usize) -> Location {
        let line = self.line_starts.partition_point(|&start| start <= pos);
        let line_start = self.line_starts[line.saturating_sub(1)];
        Location {
            line,
            col: pos - line_start + 1,
        }
    }

    fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(NodeId(0))
    }

    fn push_node(&mut self, kind: NodeKind, pos: usize) -> NodeId {
        let parent = self.current();
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            location: self.location(pos),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Resolves a prefix against the open elements, innermost declaration first.
    fn resolve_prefix(&self, prefix: Option<&str>, pending: &[(Option<String>, String)]) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE.to_string());
        }
        let found = pending
            .iter()
            .find(|(p, _)| p.as_deref() == prefix)
            .map(|(_, uri)| uri.clone())
            .or_else(|| {
                self.open.iter().rev().find_map(|id| match &self.nodes[id.0].kind {
                    NodeKind::Element(e) => e
                        .declarations
                        .iter()
                        .find(|(p, _)| p.as_deref() == prefix)
                        .map(|(_, uri)| uri.clone()),
                    _ => None,
                })
            });
        // An empty URI undeclares the default namespace.
        found.filter(|uri| !uri.is_empty())
    }

    fn start_element(&mut self, e: &BytesStart<'_>, pos: usize, empty: bool) -> Result<(), DomError> {
        let location = self.location(pos);
        if self.open.is_empty() && self.nodes[0].children.iter().any(|id| {
            matches!(self.nodes[id.0].kind, NodeKind::Element(_))
        }) {
            return Err(DomError::MultipleRootElements);
        }

        let tag_name = utf8(e.name().as_ref(), location)?.to_string();
        let mut raw_attributes = Vec::new();
        let mut declarations = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| DomError::syntax(err.to_string(), location))?;
            let name = utf8(attr.key.as_ref(), location)?.to_string();
            let value = attr
                .unescape_value()
                .map_err(|err| DomError::syntax(err.to_string(), location))?
                .into_owned();
            if name == "xmlns" {
                declarations.push((None, value.clone()));
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                declarations.push((Some(prefix.to_string()), value.clone()));
            }
            raw_attributes.push((name, value));
        }

        let (prefix, local_name) = split_qname(&tag_name);
        let namespace = self.resolve_prefix(prefix, &declarations);
        if let Some(p) = prefix
            && namespace.is_none()
        {
            return Err(DomError::UnboundPrefix {
                prefix: p.to_string(),
                location,
            });
        }

        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (name, value) in raw_attributes {
            let (attr_prefix, attr_local) = split_qname(&name);
            let attr_namespace = if name == "xmlns" || attr_prefix == Some("xmlns") {
                Some(XMLNS_NAMESPACE.to_string())
            } else if let Some(p) = attr_prefix {
                Some(self.resolve_prefix(Some(p), &declarations).ok_or_else(|| {
                    DomError::UnboundPrefix {
                        prefix: p.to_string(),
                        location,
                    }
                })?)
            } else {
                None
            };
            attributes.push(Attribute {
                prefix: attr_prefix.map(str::to_string),
                local_name: attr_local.to_string(),
                namespace: attr_namespace,
                value,
                name,
            });
        }

        let element = Element {
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
            namespace,
            attributes,
            declarations,
            tag_name,
        };
        let id = self.push_node(NodeKind::Element(element), pos);
        if !empty {
            self.open.push(id);
        }
        Ok(())
    }

    fn end_element(&mut self, name: &str, pos: usize) -> Result<(), DomError> {
        let location = self.location(pos);
        let Some(id) = self.open.pop() else {
            return Err(DomError::syntax(format!("Unexpected end tag '{}'", name), location));
        };
        match &self.nodes[id.0].kind {
            NodeKind::Element(e) if e.tag_name == name => Ok(()),
            NodeKind::Element(e) => Err(DomError::MismatchedEndTag {
                expected: e.tag_name.clone(),
                found: name.to_string(),
                location,
            }),
            _ => Err(DomError::syntax("End tag closes a non-element", location)),
        }
    }

    /// Appends character data, merging with an immediately preceding text node.
    fn text(&mut self, text: &str, pos: usize) -> Result<(), DomError> {
        if text.is_empty() {
            return Ok(());
        }
        if self.open.is_empty() {
            if text.chars().all(char::is_whitespace) {
                return Ok(());
            }
            return Err(DomError::syntax(
                "Character data outside the root element",
                self.location(pos),
            ));
        }
        let parent = self.current();
        if let Some(&last) = self.nodes[parent.0].children.last()
            && let NodeKind::Text(existing) = &mut self.nodes[last.0].kind
        {
            existing.push_str(text);
            return Ok(());
        }
        self.push_node(NodeKind::Text(text.to_string()), pos);
        Ok(())
    }

    fn leaf(&mut self, kind: NodeKind, pos: usize) -> Result<(), DomError> {
        if self.open.is_empty() && matches!(kind, NodeKind::CData(_)) {
            return Err(DomError::syntax(
                "CDATA section outside the root element",
                self.location(pos),
            ));
        }
        self.push_node(kind, pos);
        Ok(())
    }

    fn finish(self) -> Result<Document, DomError> {
        if let Some(id) = self.open.last() {
            let name = match &self.nodes[id.0].kind {
                NodeKind::Element(e) => e.tag_name.clone(),
                _ => String::new(),
            };
            return Err(DomError::UnclosedElement(name));
        }
        let has_root = self.nodes[0]
            .children
            .iter()
            .any(|id| matches!(self.nodes[id.0].kind, NodeKind::Element(_)));
        if !has_root {
            return Err(DomError::NoRootElement);
        }
        log::trace!("Parsed document with {} nodes", self.nodes.len());
        Ok(Document { nodes: self.nodes })
    }
}
