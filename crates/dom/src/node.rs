//! Arena node storage and the [`NodeRef`] navigation handle.

use crate::error::DomError;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Namespace bound to `xmlns` / `xmlns:*` declaration attributes.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
/// Namespace implicitly bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

impl From<(usize, usize)> for Location {
    fn from((line, col): (usize, usize)) -> Self {
        Location { line, col }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// An attribute as written in the source, with its resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name as written, e.g. `xt:if` or `href`.
    pub name: String,
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace: Option<String>,
    pub value: String,
}

impl Attribute {
    pub fn is_namespace_declaration(&self) -> bool {
        self.namespace.as_deref() == Some(XMLNS_NAMESPACE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified tag name as written, e.g. `xt:for` or `div`.
    pub tag_name: String,
    pub prefix: Option<String>,
    pub local_name: String,
    pub namespace: Option<String>,
    pub attributes: Vec<Attribute>,
    /// Namespace declarations made on this element: `(prefix, uri)`, `None` for the default namespace.
    pub declarations: Vec<(Option<String>, String)>,
}

impl Element {
    /// Looks up an attribute by its qualified name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_ns(&self, namespace: &str, local_name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.namespace.as_deref() == Some(namespace) && a.local_name == local_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) location: Location,
}

/// A parsed, immutable document.
#[derive(Debug)]
pub struct Document {
    pub(crate) nodes: Vec<NodeData>,
}

impl Document {
    /// Parses XML source text into a shared document.
    pub fn parse(source: &str) -> Result<Arc<Document>, DomError> {
        crate::parser::parse_document(source).map(Arc::new)
    }

    pub fn root(self: &Arc<Self>) -> NodeRef {
        NodeRef {
            doc: Arc::clone(self),
            id: NodeId(0),
        }
    }

    /// The single top-level element.
    pub fn document_element(self: &Arc<Self>) -> Option<NodeRef> {
        self.root().children().find(NodeRef::is_element)
    }

    pub fn node(self: &Arc<Self>, id: NodeId) -> Option<NodeRef> {
        (id.0 < self.nodes.len()).then(|| NodeRef {
            doc: Arc::clone(self),
            id,
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// A cheap, clonable handle to one node of a shared [`Document`].
///
/// Equality is identity: two handles are equal when they address the same node
/// of the same document instance.
#[derive(Clone)]
pub struct NodeRef {
    doc: Arc<Document>,
    id: NodeId,
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.doc, &other.doc)
    }
}

impl Eq for NodeRef {}

impl Hash for NodeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.doc) as usize).hash(state);
        self.id.hash(state);
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Element(e) => write!(f, "NodeRef(<{}> #{})", e.tag_name, self.id.0),
            NodeKind::Document => write!(f, "NodeRef(document)"),
            NodeKind::Text(_) => write!(f, "NodeRef(text #{})", self.id.0),
            NodeKind::CData(_) => write!(f, "NodeRef(cdata #{})", self.id.0),
            NodeKind::Comment(_) => write!(f, "NodeRef(comment #{})", self.id.0),
            NodeKind::ProcessingInstruction { target, .. } => {
                write!(f, "NodeRef(<?{}?> #{})", target, self.id.0)
            }
        }
    }
}

impl NodeRef {
    fn data(&self) -> &NodeData {
        &self.doc.nodes[self.id.0]
    }

    fn with_id(&self, id: NodeId) -> NodeRef {
        NodeRef {
            doc: Arc::clone(&self.doc),
            id,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.doc
    }

    pub fn kind(&self) -> &NodeKind {
        &self.data().kind
    }

    pub fn location(&self) -> Location {
        self.data().location
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind(), NodeKind::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind(), NodeKind::Text(_))
    }

    pub fn is_cdata(&self) -> bool {
        matches!(self.kind(), NodeKind::CData(_))
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self.kind() {
            NodeKind::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Character data of a text or CDATA node.
    pub fn text(&self) -> Option<&str> {
        match self.kind() {
            NodeKind::Text(t) | NodeKind::CData(t) => Some(t),
            _ => None,
        }
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.as_element().map(|e| e.tag_name.as_str())
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.data().parent.map(|id| self.with_id(id))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.data().children.iter().map(|&id| self.with_id(id))
    }

    pub fn child_elements(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.children().filter(NodeRef::is_element)
    }

    pub fn ancestors(&self) -> impl Iterator<Item = NodeRef> + '_ {
        std::iter::successors(self.parent(), NodeRef::parent)
    }

    pub fn attributes(&self) -> &[Attribute] {
        match self.kind() {
            NodeKind::Element(e) => &e.attributes,
            _ => &[],
        }
    }

    /// Value of the attribute with the given qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.as_element()
            .and_then(|e| e.attribute(name))
            .map(|a| a.value.as_str())
    }

    pub fn attribute_ns(&self, namespace: &str, local_name: &str) -> Option<&Attribute> {
        self.as_element()
            .and_then(|e| e.attribute_ns(namespace, local_name))
    }

    /// True for an element in `namespace` with the given local name.
    pub fn matches(&self, namespace: &str, local_name: &str) -> bool {
        self.as_element().is_some_and(|e| {
            e.namespace.as_deref() == Some(namespace) && e.local_name == local_name
        })
    }

    /// Concatenated character data of all descendant text and CDATA nodes.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.append_text(&mut out);
        out
    }

    fn append_text(&self, out: &mut String) {
        match self.kind() {
            NodeKind::Text(t) | NodeKind::CData(t) => out.push_str(t),
            NodeKind::Element(_) | NodeKind::Document => {
                for child in self.children() {
                    child.append_text(out);
                }
            }
            _ => {}
        }
    }

    /// Comments and whitespace-only character data carry no content.
    pub fn is_comment_or_whitespace(&self) -> bool {
        match self.kind() {
            NodeKind::Comment(_) => true,
            NodeKind::Text(t) | NodeKind::CData(t) => t.chars().all(char::is_whitespace),
            _ => false,
        }
    }

    /// True when every child is a comment or whitespace.
    pub fn is_content_empty(&self) -> bool {
        self.children().all(|c| c.is_comment_or_whitespace())
    }

    /// Resolves a namespace prefix by walking this node and its physical ancestors
    /// for a matching declaration. `None` looks up the default namespace.
    pub fn lookup_namespace(&self, prefix: Option<&str>) -> Option<String> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE.to_string());
        }
        std::iter::once(self.clone())
            .chain(self.ancestors())
            .filter_map(|n| {
                n.as_element().and_then(|e| {
                    e.declarations
                        .iter()
                        .find(|(p, _)| p.as_deref() == prefix)
                        .map(|(_, uri)| uri.clone())
                })
            })
            .next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"<root xmlns:a="urn:a"><a:item id="x">one<![CDATA[<two>]]></a:item><!-- c --><item/></root>"#;

    #[test]
    fn test_navigation() {
        let doc = Document::parse(SOURCE).unwrap();
        let root = doc.document_element().unwrap();
        assert_eq!(root.tag_name(), Some("root"));
        let children: Vec<_> = root.children().collect();
        assert_eq!(children.len(), 3);
        assert!(children[1].is_comment_or_whitespace());
        let item = &children[0];
        assert!(item.matches("urn:a", "item"));
        assert_eq!(item.parent().unwrap(), root);
        assert_eq!(item.attribute("id"), Some("x"));
        assert_eq!(item.text_content(), "one<two>");
        assert!(item.children().nth(1).unwrap().is_cdata());
    }

    #[test]
    fn test_identity_equality() {
        let doc = Document::parse(SOURCE).unwrap();
        let other = Document::parse(SOURCE).unwrap();
        assert_eq!(doc.document_element(), doc.document_element());
        assert_ne!(doc.document_element(), other.document_element());
    }

    #[test]
    fn test_lookup_namespace_walks_ancestors() {
        let doc = Document::parse(SOURCE).unwrap();
        let item = doc.document_element().unwrap().child_elements().last().unwrap();
        assert_eq!(item.lookup_namespace(Some("a")).as_deref(), Some("urn:a"));
        assert_eq!(item.lookup_namespace(Some("b")), None);
        assert_eq!(item.lookup_namespace(Some("xml")).as_deref(), Some(XML_NAMESPACE));
    }
}
