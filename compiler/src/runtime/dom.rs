//! In-Memory Document
//!
//! The host tree the runtime renders into. Nodes live in an
//! arena addressed by `NodeId`; parents and children are kept
//! as id links. Only the node kinds and mutations compiled
//! templates need are supported: elements (optionally
//! namespaced), text nodes and fragments, with attributes and
//! properties on elements.
//!

use crate::compiler::patterns::XLINK_NAMESPACE;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

// ------------------------------------------------------------- Public Types

/// Handle to a node in one `Document`.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomError {
    #[error("Unknown node {0}")]
    UnknownNode(NodeId),
    #[error("Node {0} is not an element")]
    NotAnElement(NodeId),
    #[error("Node {0} cannot have children")]
    NotAContainer(NodeId),
    #[error("Node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("Inserting {child} into {parent} would make a node its own ancestor")]
    HierarchyRequest { parent: NodeId, child: NodeId },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomAttribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    pub tag: String,
    pub namespace: Option<String>,
    pub attributes: Vec<DomAttribute>,
    /// Values assigned directly to the element object. Not
    /// reflected in serialized markup.
    ///
    pub properties: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
    /// A parentless container. Inserting it moves its children
    /// and leaves it empty.
    ///
    Fragment,
}

#[derive(Debug, Default)]
pub struct Document {
    nodes: Vec<NodeData>,
}

// ------------------------------------------------------------- Private Types

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

// ------------------------------------------------------------- Public Implementations

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData {
            tag: tag.to_string(),
            namespace: None,
            attributes: Vec::new(),
            properties: IndexMap::new(),
        }))
    }

    pub fn create_element_ns(&mut self, namespace: &str, tag: &str) -> NodeId {
        self.alloc(NodeKind::Element(ElementData {
            tag: tag.to_string(),
            namespace: Some(namespace.to_string()),
            attributes: Vec::new(),
            properties: IndexMap::new(),
        }))
    }

    pub fn create_text_node(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(id.0).map(|node| &node.kind)
    }

    pub fn parent_node(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn child_nodes(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.insert_before(parent, child, None)
    }

    /// Inserts `child` into `parent` before `reference`, or at the
    /// end when there is none. The child is first detached from
    /// its current parent. A fragment child contributes its
    /// children instead of itself.
    ///
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<(), DomError> {
        self.node(child)?;
        if !matches!(
            self.node(parent)?.kind,
            NodeKind::Element(_) | NodeKind::Fragment
        ) {
            return Err(DomError::NotAContainer(parent));
        }
        if let Some(reference) = reference {
            if self.parent_node(reference) != Some(parent) {
                return Err(DomError::NotAChild {
                    parent,
                    child: reference,
                });
            }
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest { parent, child });
        }

        let moved = if matches!(self.nodes[child.0].kind, NodeKind::Fragment) {
            std::mem::take(&mut self.nodes[child.0].children)
        } else {
            if reference == Some(child) {
                return Ok(());
            }
            self.detach(child)?;
            vec![child]
        };

        let siblings = &self.nodes[parent.0].children;
        let index = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());

        for node in &moved {
            self.nodes[node.0].parent = Some(parent);
        }
        self.nodes[parent.0].children.splice(index..index, moved);
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.node(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child)
    }

    /// Removes a node from its parent, if it has one.
    ///
    pub fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        if let Some(parent) = self.node_mut(id)?.parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
        Ok(())
    }

    /// Replaces the content of a text node. On elements and
    /// fragments every child is replaced by a single text node.
    ///
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), DomError> {
        if let NodeKind::Text(content) = &mut self.node_mut(id)?.kind {
            *content = text.to_string();
            return Ok(());
        }

        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        let node = self.create_text_node(text);
        self.append_child(id, node)
    }

    /// Concatenated text of the node and all its descendants, in
    /// document order.
    ///
    pub fn text_content(&self, id: NodeId) -> String {
        let mut text = String::new();
        let mut stack = vec![id];

        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current.0) else {
                continue;
            };
            if let NodeKind::Text(content) = &node.kind {
                text.push_str(content);
            }
            stack.extend(node.children.iter().rev());
        }
        text
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element(element) => Some(&element.tag),
            _ => None,
        }
    }

    pub fn namespace(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element(element) => element.namespace.as_deref(),
            _ => None,
        }
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        self.store_attribute(id, None, name, value)
    }

    pub fn set_attribute_ns(
        &mut self,
        id: NodeId,
        namespace: &str,
        name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        self.store_attribute(id, Some(namespace), name, value)
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        self.element_mut(id)?
            .attributes
            .retain(|a| a.namespace.is_some() || a.name != name);
        Ok(())
    }

    pub fn remove_attribute_ns(
        &mut self,
        id: NodeId,
        namespace: &str,
        name: &str,
    ) -> Result<(), DomError> {
        self.element_mut(id)?
            .attributes
            .retain(|a| a.namespace.as_deref() != Some(namespace) || a.name != name);
        Ok(())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.find_attribute(id, None, name)
    }

    pub fn attribute_ns(&self, id: NodeId, namespace: &str, name: &str) -> Option<&str> {
        self.find_attribute(id, Some(namespace), name)
    }

    pub fn set_property(&mut self, id: NodeId, name: &str, value: Value) -> Result<(), DomError> {
        self.element_mut(id)?
            .properties
            .insert(name.to_string(), value);
        Ok(())
    }

    pub fn remove_property(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        self.element_mut(id)?.properties.shift_remove(name);
        Ok(())
    }

    pub fn property(&self, id: NodeId, name: &str) -> Option<&Value> {
        match self.kind(id)? {
            NodeKind::Element(element) => element.properties.get(name),
            _ => None,
        }
    }

    /// Serializes a node and its subtree as markup. Fragments
    /// serialize as their children. Properties are not included.
    ///
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize(id, &mut out);
        out
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl DomAttribute {
    /// Name with the conventional prefix for the link namespace.
    ///
    pub fn qualified_name(&self) -> String {
        match self.namespace.as_deref() {
            Some(XLINK_NAMESPACE) => format!("xlink:{}", self.name),
            _ => self.name.clone(),
        }
    }
}

// ------------------------------------------------------------- Private Implementations

impl Document {
    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> Result<&NodeData, DomError> {
        self.nodes.get(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, DomError> {
        self.nodes.get_mut(id.0).ok_or(DomError::UnknownNode(id))
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(element) => Ok(element),
            _ => Err(DomError::NotAnElement(id)),
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_node(id);
        }
        false
    }

    fn store_attribute(
        &mut self,
        id: NodeId,
        namespace: Option<&str>,
        name: &str,
        value: &str,
    ) -> Result<(), DomError> {
        let element = self.element_mut(id)?;
        let existing = element
            .attributes
            .iter_mut()
            .find(|a| a.namespace.as_deref() == namespace && a.name == name);

        match existing {
            Some(attribute) => attribute.value = value.to_string(),
            None => element.attributes.push(DomAttribute {
                namespace: namespace.map(str::to_string),
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    fn find_attribute(&self, id: NodeId, namespace: Option<&str>, name: &str) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element(element) => element
                .attributes
                .iter()
                .find(|a| a.namespace.as_deref() == namespace && a.name == name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    fn serialize(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id.0) else {
            return;
        };

        match &node.kind {
            NodeKind::Text(content) => out.push_str(&escape(content, false)),
            NodeKind::Fragment => {
                for child in &node.children {
                    self.serialize(*child, out);
                }
            }
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for attribute in &element.attributes {
                    out.push(' ');
                    out.push_str(&attribute.qualified_name());
                    out.push_str("=\"");
                    out.push_str(&escape(&attribute.value, true));
                    out.push('"');
                }
                out.push('>');
                for child in &node.children {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
    }
}

// ------------------------------------------------------------- Private Functions

fn escape(text: &str, attribute: bool) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' if !attribute => escaped.push_str("&gt;"),
            '"' if attribute => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ------------------------------------------------------------- Unit Tests

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ----------------------------------------- tree tests

    #[test]
    fn test_append_and_serialize() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let text = doc.create_text_node("a < b");
        doc.append_child(div, text).unwrap();
        doc.set_attribute(div, "class", "x\"y").unwrap();

        assert_eq!(doc.outer_html(div), "<div class=\"x&quot;y\">a &lt; b</div>");
        assert_eq!(doc.parent_node(text), Some(div));
    }

    #[test]
    fn test_append_moves_from_previous_parent() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let child = doc.create_text_node("x");

        doc.append_child(a, child).unwrap();
        doc.append_child(b, child).unwrap();

        assert!(doc.child_nodes(a).is_empty());
        assert_eq!(doc.child_nodes(b), [child]);
    }

    #[test]
    fn test_insert_fragment_moves_children() {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        let anchor = doc.create_text_node("");
        doc.append_child(list, anchor).unwrap();

        let fragment = doc.create_fragment();
        let first = doc.create_element("li");
        let second = doc.create_element("li");
        doc.append_child(fragment, first).unwrap();
        doc.append_child(fragment, second).unwrap();

        doc.insert_before(list, fragment, Some(anchor)).unwrap();

        assert_eq!(doc.child_nodes(list), [first, second, anchor]);
        assert!(doc.child_nodes(fragment).is_empty());
        assert_eq!(doc.parent_node(first), Some(list));
    }

    #[test]
    fn test_insert_before_requires_child_reference() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        let stray = doc.create_text_node("");

        assert_eq!(
            doc.insert_before(a, b, Some(stray)),
            Err(DomError::NotAChild {
                parent: a,
                child: stray
            })
        );
    }

    #[test]
    fn test_insert_rejects_cycles_and_text_parents() {
        let mut doc = Document::new();
        let outer = doc.create_element("div");
        let inner = doc.create_element("p");
        let text = doc.create_text_node("t");
        doc.append_child(outer, inner).unwrap();

        assert!(matches!(
            doc.append_child(inner, outer),
            Err(DomError::HierarchyRequest { .. })
        ));
        assert_eq!(doc.append_child(text, inner), Err(DomError::NotAContainer(text)));
    }

    #[test]
    fn test_remove_child() {
        let mut doc = Document::new();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        doc.append_child(a, b).unwrap();

        doc.remove_child(a, b).unwrap();
        assert_eq!(doc.parent_node(b), None);
        assert_eq!(doc.remove_child(a, b), Err(DomError::NotAChild { parent: a, child: b }));
    }

    // ----------------------------------------- text tests

    #[test]
    fn test_set_text_and_text_content() {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let text = doc.create_text_node("Hello ");
        doc.append_child(p, text).unwrap();

        doc.set_text(text, "Hello Ada").unwrap();
        assert_eq!(doc.text_content(p), "Hello Ada");

        doc.set_text(p, "replaced").unwrap();
        assert_eq!(doc.child_nodes(p).len(), 1);
        assert_eq!(doc.outer_html(p), "<p>replaced</p>");
    }

    // ----------------------------------------- attribute tests

    #[test]
    fn test_attributes_and_namespaces() {
        let mut doc = Document::new();
        let svg = doc.create_element_ns("http://www.w3.org/2000/svg", "use");
        doc.set_attribute_ns(svg, XLINK_NAMESPACE, "href", "#a").unwrap();
        doc.set_attribute(svg, "href", "plain").unwrap();

        assert_eq!(doc.attribute_ns(svg, XLINK_NAMESPACE, "href"), Some("#a"));
        assert_eq!(doc.attribute(svg, "href"), Some("plain"));
        assert_eq!(doc.namespace(svg), Some("http://www.w3.org/2000/svg"));
        assert_eq!(
            doc.outer_html(svg),
            "<use xlink:href=\"#a\" href=\"plain\"></use>"
        );

        doc.remove_attribute(svg, "href").unwrap();
        assert_eq!(doc.attribute(svg, "href"), None);
        assert_eq!(doc.attribute_ns(svg, XLINK_NAMESPACE, "href"), Some("#a"));

        doc.remove_attribute_ns(svg, XLINK_NAMESPACE, "href").unwrap();
        assert_eq!(doc.attribute_ns(svg, XLINK_NAMESPACE, "href"), None);
    }

    #[test]
    fn test_set_attribute_overwrites_in_place() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        doc.set_attribute(div, "a", "1").unwrap();
        doc.set_attribute(div, "b", "2").unwrap();
        doc.set_attribute(div, "a", "3").unwrap();
        assert_eq!(doc.outer_html(div), "<div a=\"3\" b=\"2\"></div>");
    }

    #[test]
    fn test_properties() {
        let mut doc = Document::new();
        let input = doc.create_element("input");
        doc.set_property(input, "checked", json!(true)).unwrap();

        assert_eq!(doc.property(input, "checked"), Some(&json!(true)));
        assert_eq!(doc.outer_html(input), "<input></input>");

        doc.remove_property(input, "checked").unwrap();
        assert_eq!(doc.property(input, "checked"), None);
    }

    #[test]
    fn test_element_only_operations() {
        let mut doc = Document::new();
        let text = doc.create_text_node("t");
        assert_eq!(
            doc.set_attribute(text, "a", "b"),
            Err(DomError::NotAnElement(text))
        );
        assert_eq!(doc.tag_name(text), None);
    }
}
