//! Mutable template tree
//!
//! Templates are rewritten in place, so they use their own node type with
//! explicit `text` and `tail` slots. `xmltree` is only used at the edges to
//! parse and serialize.

mod store;

pub use store::TemplateStore;

use xmltree::{Element, EmitterConfig, XMLNode};

use crate::error::{ConvertError, Result};

/// Tag of a duplicated fragment whose children replace it on insertion
pub const UNWRAP_TAG: &str = "__COPY__";

/// One element of a template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    pub tag: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    /// Content before the first child
    pub text: Option<String>,
    /// Content after this node, before the next sibling
    pub tail: Option<String>,
    pub children: Vec<Node>,
}

/// Which text slot of a node is being worked on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Text,
    Tail,
}

impl Slot {
    pub fn get(self, node: &Node) -> Option<&str> {
        match self {
            Slot::Text => node.text.as_deref(),
            Slot::Tail => node.tail.as_deref(),
        }
    }

    pub fn set(self, node: &mut Node, value: String) {
        match self {
            Slot::Text => node.text = Some(value),
            Slot::Tail => node.tail = Some(value),
        }
    }
}

impl Node {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// First child with `tag`
    pub fn find(&self, tag: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.tag == tag)
    }

    /// Depth-first iterator over this node and all descendants
    pub fn descendants(&self) -> Vec<&Node> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }

    /// Parse a template document
    pub fn parse(xml: &str) -> Result<Self> {
        let root = Element::parse(xml.as_bytes()).map_err(|e| ConvertError::Template(e.to_string()))?;
        Ok(Self::from_element(&root))
    }

    /// Build a node from a parsed element; comments and processing
    /// instructions are dropped
    pub fn from_element(element: &Element) -> Self {
        let tag = match &element.prefix {
            Some(prefix) => format!("{}:{}", prefix, element.name),
            None => element.name.clone(),
        };
        let mut node = Node::new(tag);
        node.attributes = element
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        for child in &element.children {
            match child {
                XMLNode::Element(el) => node.children.push(Node::from_element(el)),
                XMLNode::Text(text) | XMLNode::CData(text) => {
                    let slot = match node.children.last_mut() {
                        Some(last) => &mut last.tail,
                        None => &mut node.text,
                    };
                    slot.get_or_insert_with(String::new).push_str(text);
                }
                _ => {}
            }
        }
        node
    }

    /// Convert back into an `xmltree` element; the node's own tail is dropped
    pub fn to_element(&self) -> Element {
        let mut element = Element::new(&self.tag);
        for (name, value) in &self.attributes {
            element.attributes.insert(name.clone(), value.clone());
        }
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            element.children.push(XMLNode::Text(text.to_string()));
        }
        for child in &self.children {
            element.children.push(XMLNode::Element(child.to_element()));
            if let Some(tail) = child.tail.as_deref().filter(|t| !t.is_empty()) {
                element.children.push(XMLNode::Text(tail.to_string()));
            }
        }
        element
    }

    /// Serialize as a standalone document with XML declaration
    pub fn to_xml(&self) -> Result<String> {
        let config = EmitterConfig::new()
            .perform_indent(false)
            .write_document_declaration(true);
        let mut out = Vec::new();
        self.to_element()
            .write_with_config(&mut out, config)
            .map_err(|e| ConvertError::Serialize(e.to_string()))?;
        String::from_utf8(out).map_err(|e| ConvertError::Serialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_and_tail() {
        let node = Node::parse(r#"<a x="1" y="2">head<b/>after-b<c>inner</c>after-c</a>"#).unwrap();

        assert_eq!(node.tag, "a");
        assert_eq!(node.attributes, vec![("x".to_string(), "1".to_string()), ("y".to_string(), "2".to_string())]);
        assert_eq!(node.text.as_deref(), Some("head"));
        assert_eq!(node.children[0].tail.as_deref(), Some("after-b"));
        assert_eq!(node.children[1].text.as_deref(), Some("inner"));
        assert_eq!(node.children[1].tail.as_deref(), Some("after-c"));
    }

    #[test]
    fn test_attribute_order_survives_roundtrip() {
        let node = Node::parse(r#"<item zeta="1" alpha="2" mid="3"/>"#).unwrap();
        let again = Node::parse(&node.to_xml().unwrap()).unwrap();
        let names: Vec<&str> = again.attributes.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_comments_are_dropped() {
        let node = Node::parse("<a><!-- note --><b/></a>").unwrap();
        assert_eq!(node.children.len(), 1);
        assert_eq!(node.text, None);
    }

    #[test]
    fn test_serialize_reparses_to_same_tree() {
        let source = r#"<atv><body><listScrollerSplit id="list">{{VAL(title)}}<items/>tail</listScrollerSplit></body></atv>"#;
        let node = Node::parse(source).unwrap();
        let xml = node.to_xml().unwrap();

        assert!(xml.starts_with("<?xml"));
        assert_eq!(Node::parse(&xml).unwrap(), node);
    }

    #[test]
    fn test_set_attr_keeps_position() {
        let mut node = Node::new("a").with_attr("one", "1").with_attr("two", "2");
        node.set_attr("one", "uno");
        assert_eq!(node.attributes[0], ("one".to_string(), "uno".to_string()));
        assert_eq!(node.attr("two"), Some("2"));
    }

    #[test]
    fn test_built_node_matches_parsed() {
        let built = Node::new("a")
            .with_text("head")
            .with_child(Node::new("b").with_tail("after-b"))
            .with_child(Node::new("c").with_text("inner"));
        assert_eq!(built, Node::parse("<a>head<b/>after-b<c>inner</c></a>").unwrap());
    }

    #[test]
    fn test_malformed_template() {
        assert!(matches!(Node::parse("<a><b></a>"), Err(ConvertError::Template(_))));
    }
}
