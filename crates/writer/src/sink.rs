//! The `OutputSink` event interface and its in-memory implementation.

use crate::error::WriteError;
use std::fmt;
use std::str::FromStr;

/// Name of an emitted element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementName {
    pub namespace: Option<String>,
    pub local_name: String,
    /// Name as written to the output, including any prefix.
    pub qualified_name: String,
}

impl ElementName {
    pub fn new(namespace: Option<&str>, local_name: &str, qualified_name: &str) -> Self {
        ElementName {
            namespace: namespace.map(str::to_string),
            local_name: local_name.to_string(),
            qualified_name: qualified_name.to_string(),
        }
    }

    /// A name with no namespace, e.g. for tests or generated markup.
    pub fn local(name: &str) -> Self {
        ElementName::new(None, name, name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputAttribute {
    pub namespace: Option<String>,
    pub local_name: String,
    pub qualified_name: String,
    pub value: String,
}

impl OutputAttribute {
    pub fn new(qualified_name: &str, value: impl Into<String>) -> Self {
        let local_name = qualified_name
            .split_once(':')
            .map_or(qualified_name, |(_, local)| local);
        OutputAttribute {
            namespace: None,
            local_name: local_name.to_string(),
            qualified_name: qualified_name.to_string(),
            value: value.into(),
        }
    }
}

/// Whitespace handling applied by the serializers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Whitespace {
    /// Drop whitespace-only character runs.
    None,
    /// Write character data exactly as received.
    #[default]
    All,
    /// Drop whitespace-only runs and indent element-only content.
    Indent,
}

impl FromStr for Whitespace {
    type Err = WriteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("none") {
            Ok(Whitespace::None)
        } else if s.eq_ignore_ascii_case("all") {
            Ok(Whitespace::All)
        } else if s.eq_ignore_ascii_case("indent") {
            Ok(Whitespace::Indent)
        } else {
            Err(WriteError::InvalidWhitespace(s.to_string()))
        }
    }
}

impl fmt::Display for Whitespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Whitespace::None => "none",
            Whitespace::All => "all",
            Whitespace::Indent => "indent",
        })
    }
}

/// Receives the ordered stream of document events produced by the interpreter.
pub trait OutputSink {
    fn start_document(&mut self) -> Result<(), WriteError>;
    fn end_document(&mut self) -> Result<(), WriteError>;

    fn start_element(
        &mut self,
        name: &ElementName,
        attributes: &[OutputAttribute],
    ) -> Result<(), WriteError>;
    fn end_element(&mut self, name: &ElementName) -> Result<(), WriteError>;

    fn characters(&mut self, text: &str) -> Result<(), WriteError>;

    fn start_cdata(&mut self) -> Result<(), WriteError>;
    fn end_cdata(&mut self) -> Result<(), WriteError>;

    fn start_dtd(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<(), WriteError>;
    fn end_dtd(&mut self) -> Result<(), WriteError>;
}

/// One recorded call on a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    StartDocument,
    EndDocument,
    StartElement {
        name: String,
        attributes: Vec<(String, String)>,
    },
    EndElement(String),
    Characters(String),
    StartCData,
    EndCData,
    StartDtd {
        name: String,
        public_id: Option<String>,
        system_id: Option<String>,
    },
    EndDtd,
}

/// Keeps every event in memory. Adjacent character events are merged.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub events: Vec<OutputEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Qualified names of all started elements, in document order.
    pub fn element_names(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                OutputEvent::StartElement { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Concatenation of all character data.
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                OutputEvent::Characters(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl OutputSink for RecordingSink {
    fn start_document(&mut self) -> Result<(), WriteError> {
        self.events.push(OutputEvent::StartDocument);
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), WriteError> {
        self.events.push(OutputEvent::EndDocument);
        Ok(())
    }

    fn start_element(
        &mut self,
        name: &ElementName,
        attributes: &[OutputAttribute],
    ) -> Result<(), WriteError> {
        self.events.push(OutputEvent::StartElement {
            name: name.qualified_name.clone(),
            attributes: attributes
                .iter()
                .map(|a| (a.qualified_name.clone(), a.value.clone()))
                .collect(),
        });
        Ok(())
    }

    fn end_element(&mut self, name: &ElementName) -> Result<(), WriteError> {
        self.events
            .push(OutputEvent::EndElement(name.qualified_name.clone()));
        Ok(())
    }

    fn characters(&mut self, text: &str) -> Result<(), WriteError> {
        if let Some(OutputEvent::Characters(last)) = self.events.last_mut() {
            last.push_str(text);
        } else {
            self.events.push(OutputEvent::Characters(text.to_string()));
        }
        Ok(())
    }

    fn start_cdata(&mut self) -> Result<(), WriteError> {
        self.events.push(OutputEvent::StartCData);
        Ok(())
    }

    fn end_cdata(&mut self) -> Result<(), WriteError> {
        self.events.push(OutputEvent::EndCData);
        Ok(())
    }

    fn start_dtd(
        &mut self,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<(), WriteError> {
        self.events.push(OutputEvent::StartDtd {
            name: name.to_string(),
            public_id: public_id.map(str::to_string),
            system_id: system_id.map(str::to_string),
        });
        Ok(())
    }

    fn end_dtd(&mut self) -> Result<(), WriteError> {
        self.events.push(OutputEvent::EndDtd);
        Ok(())
    }
}
