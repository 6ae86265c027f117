use crate::context::ScopeError;
use std::error::Error as StdError;
use thiserror::Error;
use xtemplate_dom::{Location, NodeKind, NodeRef};
use xtemplate_expr::ExprError;
use xtemplate_writer::WriteError;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Broad category of a [`TemplateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed directive: missing or illegal attributes, invalid names, bad content.
    Config,
    /// An expression failed to parse, evaluate or coerce.
    Expression,
    /// Raised by an `<error>` directive.
    Explicit,
    /// An included document could not be resolved, read or parsed.
    Include,
    /// A value of the wrong type, e.g. `<copy>` of something that is not an element.
    Type,
    /// The output sink failed.
    Output,
}

/// The single error type surfaced by template processing.
///
/// Carries the node that caused the failure and, where relevant, the attribute.
/// The path locator is only computed when asked for with [`TemplateError::path`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct TemplateError {
    kind: ErrorKind,
    message: String,
    node: Option<NodeRef>,
    attribute: Option<String>,
    #[source]
    source: Option<BoxedSource>,
}

impl TemplateError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        TemplateError {
            kind,
            message: message.into(),
            node: None,
            attribute: None,
            source: None,
        }
    }

    pub fn config(node: &NodeRef, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message).at(node)
    }

    pub fn explicit(node: &NodeRef, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Explicit, message).at(node)
    }

    pub fn type_error(node: &NodeRef, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, message).at(node)
    }

    pub fn include(node: &NodeRef, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Include, message).at(node)
    }

    /// An expression failure, prefixed with what was being evaluated.
    pub fn expression(node: &NodeRef, context: &str, source: ExprError) -> Self {
        TemplateError {
            kind: ErrorKind::Expression,
            message: format!("{}: {}", context, source),
            node: Some(node.clone()),
            attribute: None,
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn scope(node: &NodeRef, source: ScopeError) -> Self {
        Self::config(node, source.to_string()).with_source(source)
    }

    pub fn at(mut self, node: &NodeRef) -> Self {
        self.node = Some(node.clone());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>) -> Self {
        self.attribute = Some(name.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn node(&self) -> Option<&NodeRef> {
        self.node.as_ref()
    }

    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Source position of the failing node.
    pub fn location(&self) -> Option<Location> {
        self.node.as_ref().map(NodeRef::location)
    }

    /// XPath-like locator of the failing node, e.g. `/ html / body / div#main / @class`.
    pub fn path(&self) -> Option<String> {
        self.node
            .as_ref()
            .map(|node| path_locator(node, self.attribute.as_deref()))
    }
}

impl From<WriteError> for TemplateError {
    fn from(e: WriteError) -> Self {
        TemplateError::new(ErrorKind::Output, format!("Output error: {}", e)).with_source(e)
    }
}

fn path_locator(node: &NodeRef, attribute: Option<&str>) -> String {
    let mut steps = Vec::new();
    if let Some(attr) = attribute {
        steps.push(format!("@{}", attr));
    }
    let mut current = Some(node.clone());
    if attribute.is_none() && node.text().is_some() {
        steps.push(format!("text(){}", position_suffix(node, |n| n.text().is_some())));
        current = node.parent();
    }
    while let Some(n) = current {
        let Some(element) = n.as_element() else {
            break;
        };
        let step = match n.attribute("id").filter(|id| !id.is_empty()) {
            Some(id) => format!("{}#{}", element.tag_name, id),
            None => format!(
                "{}{}",
                element.tag_name,
                position_suffix(&n, |s| s.tag_name() == Some(element.tag_name.as_str()))
            ),
        };
        steps.push(step);
        current = n.parent();
    }
    steps.reverse();
    format!("/ {}", steps.join(" / "))
}

/// `[n]` giving the 1-based position among siblings of the same kind, or nothing
/// when the node has no such siblings.
fn position_suffix(node: &NodeRef, same_kind: impl Fn(&NodeRef) -> bool) -> String {
    let Some(parent) = node.parent() else {
        return String::new();
    };
    let mut before = 0;
    let mut others = 0;
    let mut seen = false;
    for sibling in parent.children() {
        if sibling == *node {
            seen = true;
        } else if same_kind(&sibling) {
            others += 1;
            if !seen {
                before += 1;
            }
        }
    }
    if others == 0 || matches!(parent.kind(), NodeKind::Document) {
        String::new()
    } else {
        format!("[{}]", before + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xtemplate_dom::Document;

    const SOURCE: &str = r#"<html><body><div id="main"><p>one</p><p>two<b/>three</p></div></body></html>"#;

    fn second_p() -> NodeRef {
        let doc = Document::parse(SOURCE).unwrap();
        let div = doc
            .document_element()
            .unwrap()
            .child_elements()
            .next()
            .unwrap()
            .child_elements()
            .next()
            .unwrap();
        div.child_elements().nth(1).unwrap()
    }

    #[test]
    fn test_element_path_uses_id_and_position() {
        let err = TemplateError::config(&second_p(), "bad");
        assert_eq!(err.path().as_deref(), Some("/ html / body / div#main / p[2]"));
    }

    #[test]
    fn test_attribute_path() {
        let err = TemplateError::config(&second_p(), "bad").with_attribute("test");
        assert_eq!(
            err.path().as_deref(),
            Some("/ html / body / div#main / p[2] / @test")
        );
    }

    #[test]
    fn test_text_path() {
        let p = second_p();
        let last_text = p.children().last().unwrap();
        let err = TemplateError::new(ErrorKind::Expression, "bad").at(&last_text);
        assert_eq!(
            err.path().as_deref(),
            Some("/ html / body / div#main / p[2] / text()[2]")
        );
        let only_text = p.parent().unwrap().child_elements().next().unwrap().children().next().unwrap();
        let err = TemplateError::new(ErrorKind::Expression, "bad").at(&only_text);
        assert_eq!(
            err.path().as_deref(),
            Some("/ html / body / div#main / p[1] / text()")
        );
    }

    #[test]
    fn test_no_node_no_path() {
        let err = TemplateError::new(ErrorKind::Output, "failed");
        assert!(err.path().is_none());
        assert!(err.location().is_none());
        assert_eq!(err.to_string(), "failed");
    }

    #[test]
    fn test_display_is_message_and_source_is_chained() {
        let cause = xtemplate_expr::Expression::parse("1 +").unwrap_err();
        let err = TemplateError::expression(&second_p(), "Error in test", cause.clone());
        assert_eq!(err.to_string(), format!("Error in test: {}", cause));
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), cause.to_string());
        assert!(source.downcast_ref::<ExprError>().is_some());

        let plain = TemplateError::config(&second_p(), "Value missing");
        assert_eq!(plain.to_string(), "Value missing");
        assert!(plain.source().is_none());
    }
}
