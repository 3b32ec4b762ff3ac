//! Host tree nodes
//!
//! Compact sibling-linked representation: a node stores its parent,
//! first/last child and prev/next sibling as `NodeId` links plus a
//! `NodeData` payload. Attributes and properties live inline in small
//! vectors since most elements carry only a handful of each.

use smallvec::SmallVec;

use crate::NodeId;

/// A single node in the host tree.
#[derive(Debug)]
pub struct Node {
    /// Parent node (None if detached or root)
    pub parent: Option<NodeId>,
    /// First child
    pub first_child: Option<NodeId>,
    /// Last child (for O(1) append)
    pub last_child: Option<NodeId>,
    /// Previous sibling
    pub prev_sibling: Option<NodeId>,
    /// Next sibling
    pub next_sibling: Option<NodeId>,
    /// Node-specific data
    pub data: NodeData,
}

impl Node {
    /// Create a new element node
    pub fn element(tag: &str, namespaced: bool) -> Self {
        Self {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            data: NodeData::Element(ElementData::new(tag, namespaced)),
        }
    }

    /// Create a new text node
    pub fn text(content: &str) -> Self {
        Self {
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            data: NodeData::Text(TextData {
                content: content.to_string(),
            }),
        }
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(&t.content),
            _ => None,
        }
    }
}

/// Node-specific data
#[derive(Debug)]
pub enum NodeData {
    /// Element
    Element(ElementData),
    /// Text content
    Text(TextData),
}

/// Element-specific data
#[derive(Debug)]
pub struct ElementData {
    /// Tag name
    pub tag: String,
    /// Whether the element lives in the vector-graphics namespace
    pub namespaced: bool,
    /// Attributes, in set order
    pub attrs: SmallVec<[Attribute; 4]>,
    /// Properties (externally mutable element state, e.g. `value`)
    pub props: SmallVec<[Property; 2]>,
    /// Inline style declarations, in set order
    pub style: SmallVec<[(String, String); 4]>,
    /// Raw markup override; when set it supplants the children
    pub raw_markup: Option<String>,
}

impl ElementData {
    pub fn new(tag: &str, namespaced: bool) -> Self {
        Self {
            tag: tag.to_string(),
            namespaced,
            attrs: SmallVec::new(),
            props: SmallVec::new(),
            style: SmallVec::new(),
            raw_markup: None,
        }
    }

    /// Get an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing in place to preserve order
    pub fn set_attr(&mut self, name: &str, value: &str) {
        for attr in self.attrs.iter_mut() {
            if attr.name == name {
                attr.value = value.to_string();
                return;
            }
        }
        self.attrs.push(Attribute {
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(idx).value)
    }

    /// Get a property value
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.props.iter().find(|p| p.name == name).map(|p| &p.value)
    }

    /// Set a property, replacing in place
    pub fn set_property(&mut self, name: &str, value: PropertyValue) {
        for prop in self.props.iter_mut() {
            if prop.name == name {
                prop.value = value;
                return;
            }
        }
        self.props.push(Property {
            name: name.to_string(),
            value,
        });
    }

    /// Remove a property, returning its previous value
    pub fn remove_property(&mut self, name: &str) -> Option<PropertyValue> {
        let idx = self.props.iter().position(|p| p.name == name)?;
        Some(self.props.remove(idx).value)
    }

    /// Get one inline style declaration
    pub fn style_property(&self, name: &str) -> Option<&str> {
        self.style
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set one inline style declaration; an empty value removes it
    pub fn set_style_property(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            self.style.retain(|(n, _)| n.as_str() != name);
            return;
        }
        for entry in self.style.iter_mut() {
            if entry.0 == name {
                entry.1 = value.to_string();
                return;
            }
        }
        self.style.push((name.to_string(), value.to_string()));
    }
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element property
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

/// Property values: strings or booleans, matching the two shapes the
/// environment mutates behind the renderer's back (`value`, `checked`).
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Str(String),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            Self::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Str(_) => None,
        }
    }
}

/// Text node data
#[derive(Debug)]
pub struct TextData {
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_order_preserved() {
        let mut el = ElementData::new("div", false);
        el.set_attr("id", "a");
        el.set_attr("class", "b");
        el.set_attr("id", "c");

        let names: Vec<&str> = el.attrs.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["id", "class"]);
        assert_eq!(el.attr("id"), Some("c"));
    }

    #[test]
    fn test_style_property_removal() {
        let mut el = ElementData::new("div", false);
        el.set_style_property("color", "red");
        el.set_style_property("flex", "1");
        el.set_style_property("color", "");

        assert_eq!(el.style_property("color"), None);
        assert_eq!(el.style_property("flex"), Some("1"));
    }

    #[test]
    fn test_node_kinds() {
        let el = Node::element("span", false);
        let tx = Node::text("hi");

        assert!(el.is_element());
        assert!(!el.is_text());
        assert_eq!(tx.as_text(), Some("hi"));
        assert!(tx.as_element().is_none());
    }
}
