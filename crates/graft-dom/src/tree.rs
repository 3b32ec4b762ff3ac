//! Host tree (arena-based allocation)
//!
//! Structural mutation follows DOM semantics: inserting a node that is
//! already attached first unlinks it from its old position, and every
//! operation validates ids and hierarchy. The arena is append-only;
//! detached subtrees keep their slots so callers may retain and later
//! re-insert them.

use tracing::trace;

use crate::node::{Node, NodeData, PropertyValue};
use crate::{DomError, DomResult, NodeId};

/// Element property names the host exposes. Everything else is an
/// attribute; writing an unknown property is an environment fault.
const PROPERTY_NAMES: &[&str] = &["value", "checked", "selected", "disabled", "spellcheck"];

/// Properties carrying string values; the rest are boolean toggles.
const STRING_PROPERTIES: &[&str] = &["value"];

/// Arena-based host tree
#[derive(Debug, Default)]
pub struct DomTree {
    nodes: Vec<Node>,
    /// Count of applied mutations (structure, text, attributes, style)
    mutations: u64,
}

impl DomTree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of allocated nodes (including detached ones)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the arena is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total number of mutations applied so far
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Check whether an id is allocated
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> DomResult<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(DomError::NotFound(id))
    }

    // ---------------------------------------------------------------
    // Creation
    // ---------------------------------------------------------------

    /// Create a detached element node
    pub fn create_element(&mut self, tag: &str, namespaced: bool) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::element(tag, namespaced));
        self.mutations += 1;
        trace!(?id, tag, namespaced, "create element");
        id
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::text(content));
        self.mutations += 1;
        trace!(?id, "create text");
        id
    }

    // ---------------------------------------------------------------
    // Traversal
    // ---------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child)
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.last_child)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling)
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling)
    }

    /// Child at `index`, walking the sibling chain
    pub fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        let mut cur = self.first_child(parent);
        for _ in 0..index {
            cur = cur.and_then(|c| self.next_sibling(c));
        }
        cur
    }

    /// Number of children
    pub fn child_count(&self, parent: NodeId) -> usize {
        let mut count = 0;
        let mut cur = self.first_child(parent);
        while let Some(c) = cur {
            count += 1;
            cur = self.next_sibling(c);
        }
        count
    }

    /// Children of `parent`, in order
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.first_child(parent);
        while let Some(c) = cur {
            out.push(c);
            cur = self.next_sibling(c);
        }
        out
    }

    /// Check whether `ancestor` contains `node` (inclusive)
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(c) = cur {
            if c == ancestor {
                return true;
            }
            cur = self.parent(c);
        }
        false
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.is_element())
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.is_text())
    }

    /// Tag name of an element node
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.get(id)
            .and_then(|n| n.as_element())
            .map(|e| e.tag.as_str())
    }

    /// Whether the node was created in the vector-graphics namespace
    pub fn is_namespaced(&self, id: NodeId) -> bool {
        self.get(id)
            .and_then(|n| n.as_element())
            .is_some_and(|e| e.namespaced)
    }

    // ---------------------------------------------------------------
    // Structure
    // ---------------------------------------------------------------

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<()> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent`, before `before` (append when None)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        before: Option<NodeId>,
    ) -> DomResult<()> {
        if !self.node(parent)?.is_element() {
            return Err(DomError::NotAnElement(parent));
        }
        self.node(child)?;
        if self.is_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest {
                parent,
                node: child,
            });
        }
        if let Some(b) = before {
            if self.parent(b) != Some(parent) {
                return Err(DomError::NotAChild { parent, child: b });
            }
            if b == child {
                return Ok(());
            }
        }

        self.unlink(child);

        match before {
            None => {
                let old_last = self.node(parent)?.last_child;
                {
                    let c = self.node_mut(child)?;
                    c.parent = Some(parent);
                    c.prev_sibling = old_last;
                    c.next_sibling = None;
                }
                if let Some(last) = old_last {
                    self.node_mut(last)?.next_sibling = Some(child);
                } else {
                    self.node_mut(parent)?.first_child = Some(child);
                }
                self.node_mut(parent)?.last_child = Some(child);
            }
            Some(b) => {
                let prev = self.node(b)?.prev_sibling;
                {
                    let c = self.node_mut(child)?;
                    c.parent = Some(parent);
                    c.prev_sibling = prev;
                    c.next_sibling = Some(b);
                }
                self.node_mut(b)?.prev_sibling = Some(child);
                match prev {
                    Some(p) => self.node_mut(p)?.next_sibling = Some(child),
                    None => self.node_mut(parent)?.first_child = Some(child),
                }
            }
        }

        self.mutations += 1;
        trace!(?parent, ?child, ?before, "insert");
        Ok(())
    }

    /// Replace `old` with `new` under `parent`
    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> DomResult<()> {
        if self.parent(old) != Some(parent) {
            return Err(DomError::NotAChild { parent, child: old });
        }
        if new == old {
            return Ok(());
        }
        let after = self.next_sibling(old);
        self.detach(old)?;
        match after {
            Some(a) if a != new => self.insert_before(parent, new, Some(a)),
            // `new` was old's next sibling and already occupies the slot
            Some(_) => Ok(()),
            None => self.insert_before(parent, new, None),
        }
    }

    /// Remove `node` from its parent, keeping its subtree intact
    pub fn detach(&mut self, node: NodeId) -> DomResult<()> {
        self.node(node)?;
        if self.parent(node).is_some() {
            self.unlink(node);
            self.mutations += 1;
            trace!(?node, "detach");
        }
        Ok(())
    }

    fn unlink(&mut self, node: NodeId) {
        let (parent, prev, next) = {
            let Some(n) = self.get(node) else { return };
            (n.parent, n.prev_sibling, n.next_sibling)
        };
        let Some(parent) = parent else { return };

        match prev {
            Some(p) => {
                if let Some(n) = self.get_mut(p) {
                    n.next_sibling = next;
                }
            }
            None => {
                if let Some(n) = self.get_mut(parent) {
                    n.first_child = next;
                }
            }
        }
        match next {
            Some(x) => {
                if let Some(n) = self.get_mut(x) {
                    n.prev_sibling = prev;
                }
            }
            None => {
                if let Some(n) = self.get_mut(parent) {
                    n.last_child = prev;
                }
            }
        }
        if let Some(n) = self.get_mut(node) {
            n.parent = None;
            n.prev_sibling = None;
            n.next_sibling = None;
        }
    }

    // ---------------------------------------------------------------
    // Text
    // ---------------------------------------------------------------

    /// Text content of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| n.as_text())
    }

    /// Update a text node's content
    pub fn set_text(&mut self, id: NodeId, content: &str) -> DomResult<()> {
        let node = self.node_mut(id)?;
        match &mut node.data {
            NodeData::Text(t) => {
                if t.content != content {
                    t.content = content.to_string();
                    self.mutations += 1;
                }
                Ok(())
            }
            NodeData::Element(_) => Err(DomError::NotText(id)),
        }
    }

    // ---------------------------------------------------------------
    // Attributes
    // ---------------------------------------------------------------

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).and_then(|n| n.as_element()).and_then(|e| e.attr(name))
    }

    /// Attribute (name, value) pairs in set order
    pub fn attributes(&self, id: NodeId) -> Vec<(String, String)> {
        self.get(id)
            .and_then(|n| n.as_element())
            .map(|e| {
                e.attrs
                    .iter()
                    .map(|a| (a.name.clone(), a.value.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let node = self.node_mut(id)?;
        let el = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        if el.attr(name) != Some(value) {
            el.set_attr(name, value);
            self.mutations += 1;
        }
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        let node = self.node_mut(id)?;
        let el = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        if el.remove_attr(name).is_some() {
            self.mutations += 1;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Properties
    // ---------------------------------------------------------------

    pub fn property(&self, id: NodeId, name: &str) -> Option<&PropertyValue> {
        self.get(id).and_then(|n| n.as_element()).and_then(|e| e.property(name))
    }

    /// Set an element property.
    ///
    /// Faults (unknown property name, wrong value shape, non-element
    /// target) surface as errors; callers decide whether to treat them
    /// as environment quirks.
    pub fn set_property(&mut self, id: NodeId, name: &str, value: PropertyValue) -> DomResult<()> {
        if !PROPERTY_NAMES.contains(&name) {
            return Err(DomError::UnknownProperty {
                node: id,
                name: name.to_string(),
            });
        }
        let wants_string = STRING_PROPERTIES.contains(&name);
        let ok = match &value {
            PropertyValue::Str(_) => wants_string,
            PropertyValue::Bool(_) => !wants_string,
        };
        if !ok {
            return Err(DomError::InvalidPropertyValue {
                node: id,
                name: name.to_string(),
            });
        }
        let node = self.node_mut(id)?;
        let el = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        if el.property(name) != Some(&value) {
            el.set_property(name, value);
            self.mutations += 1;
        }
        Ok(())
    }

    pub fn remove_property(&mut self, id: NodeId, name: &str) -> DomResult<()> {
        let node = self.node_mut(id)?;
        let el = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        if el.remove_property(name).is_some() {
            self.mutations += 1;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Style
    // ---------------------------------------------------------------

    pub fn style_property(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)
            .and_then(|n| n.as_element())
            .and_then(|e| e.style_property(name))
    }

    /// Set one inline style declaration; empty string removes it
    pub fn set_style_property(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let node = self.node_mut(id)?;
        let el = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        if el.style_property(name).unwrap_or("") != value {
            el.set_style_property(name, value);
            self.mutations += 1;
        }
        Ok(())
    }

    /// Replace the whole inline style with parsed `name: value` pairs
    pub fn set_style_text(&mut self, id: NodeId, text: &str) -> DomResult<()> {
        let node = self.node_mut(id)?;
        let el = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        el.style.clear();
        for decl in text.split(';') {
            if let Some((name, value)) = decl.split_once(':') {
                let (name, value) = (name.trim(), value.trim());
                if !name.is_empty() && !value.is_empty() {
                    el.set_style_property(name, value);
                }
            }
        }
        self.mutations += 1;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Raw markup
    // ---------------------------------------------------------------

    pub fn raw_markup(&self, id: NodeId) -> Option<&str> {
        self.get(id)
            .and_then(|n| n.as_element())
            .and_then(|e| e.raw_markup.as_deref())
    }

    /// Set or clear an element's raw markup override.
    ///
    /// Setting raw markup drops the element's children, matching how
    /// raw-content injection supplants structured content.
    pub fn set_raw_markup(&mut self, id: NodeId, markup: Option<String>) -> DomResult<()> {
        if markup.is_some() {
            let children = self.children(id);
            for c in children {
                self.detach(c)?;
            }
        }
        let node = self.node_mut(id)?;
        let el = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        el.raw_markup = markup;
        self.mutations += 1;
        Ok(())
    }

    // ---------------------------------------------------------------
    // Serialization
    // ---------------------------------------------------------------

    /// Serialize a subtree to markup, for tests and demos
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else { return };
        match &node.data {
            NodeData::Text(t) => out.push_str(&escape(&t.content)),
            NodeData::Element(el) => {
                out.push('<');
                out.push_str(&el.tag);
                for attr in &el.attrs {
                    out.push(' ');
                    out.push_str(&attr.name);
                    out.push_str("=\"");
                    out.push_str(&escape(&attr.value));
                    out.push('"');
                }
                if !el.style.is_empty() {
                    out.push_str(" style=\"");
                    for (i, (name, value)) in el.style.iter().enumerate() {
                        if i > 0 {
                            out.push_str("; ");
                        }
                        out.push_str(name);
                        out.push_str(": ");
                        out.push_str(value);
                    }
                    out.push('"');
                }
                out.push('>');
                if let Some(raw) = &el.raw_markup {
                    out.push_str(raw);
                } else {
                    let mut cur = node.first_child;
                    while let Some(c) = cur {
                        self.write_markup(c, out);
                        cur = self.next_sibling(c);
                    }
                }
                out.push_str("</");
                out.push_str(&el.tag);
                out.push('>');
            }
        }
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree_with_children() -> (DomTree, NodeId, Vec<NodeId>) {
        let mut tree = DomTree::new();
        let root = tree.create_element("ul", false);
        let kids: Vec<NodeId> = (0..3)
            .map(|i| {
                let li = tree.create_element("li", false);
                tree.set_attribute(li, "data-i", &i.to_string()).unwrap();
                tree.append_child(root, li).unwrap();
                li
            })
            .collect();
        (tree, root, kids)
    }

    #[test]
    fn test_append_and_order() {
        let (tree, root, kids) = tree_with_children();
        assert_eq!(tree.children(root), kids);
        assert_eq!(tree.child_count(root), 3);
        assert_eq!(tree.child_at(root, 1), Some(kids[1]));
        assert_eq!(tree.parent(kids[2]), Some(root));
    }

    #[test]
    fn test_insert_before_moves_existing() {
        let (mut tree, root, kids) = tree_with_children();
        // move last child to the front
        tree.insert_before(root, kids[2], Some(kids[0])).unwrap();
        assert_eq!(tree.children(root), vec![kids[2], kids[0], kids[1]]);
    }

    #[test]
    fn test_replace_child() {
        let (mut tree, root, kids) = tree_with_children();
        let new = tree.create_element("li", false);
        tree.replace_child(root, new, kids[1]).unwrap();
        assert_eq!(tree.children(root), vec![kids[0], new, kids[2]]);
        assert_eq!(tree.parent(kids[1]), None);
    }

    #[test]
    fn test_detach_keeps_subtree() {
        let mut tree = DomTree::new();
        let root = tree.create_element("div", false);
        let child = tree.create_element("span", false);
        let grand = tree.create_text("x");
        tree.append_child(root, child).unwrap();
        tree.append_child(child, grand).unwrap();

        tree.detach(child).unwrap();
        assert_eq!(tree.parent(child), None);
        assert_eq!(tree.first_child(root), None);
        // subtree intact
        assert_eq!(tree.first_child(child), Some(grand));
    }

    #[test]
    fn test_hierarchy_violation() {
        let mut tree = DomTree::new();
        let a = tree.create_element("div", false);
        let b = tree.create_element("div", false);
        tree.append_child(a, b).unwrap();
        let err = tree.append_child(b, a).unwrap_err();
        assert!(matches!(err, DomError::HierarchyRequest { .. }));
    }

    #[test]
    fn test_property_faults() {
        let mut tree = DomTree::new();
        let input = tree.create_element("input", false);
        let text = tree.create_text("t");

        tree.set_property(input, "value", PropertyValue::Str("abc".into()))
            .unwrap();
        tree.set_property(input, "checked", PropertyValue::Bool(true))
            .unwrap();

        assert!(matches!(
            tree.set_property(input, "volume", PropertyValue::Str("1".into())),
            Err(DomError::UnknownProperty { .. })
        ));
        assert!(matches!(
            tree.set_property(input, "checked", PropertyValue::Str("yes".into())),
            Err(DomError::InvalidPropertyValue { .. })
        ));
        assert!(matches!(
            tree.set_property(text, "value", PropertyValue::Str("x".into())),
            Err(DomError::NotAnElement(_))
        ));
    }

    #[test]
    fn test_mutation_count_stable_for_noops() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div", false);
        tree.set_attribute(div, "id", "a").unwrap();
        let n = tree.mutation_count();

        tree.set_attribute(div, "id", "a").unwrap();
        tree.remove_attribute(div, "missing").unwrap();
        tree.detach(div).unwrap(); // already detached
        assert_eq!(tree.mutation_count(), n);
    }

    #[test]
    fn test_raw_markup_supplants_children() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div", false);
        let child = tree.create_text("old");
        tree.append_child(div, child).unwrap();

        tree.set_raw_markup(div, Some("<b>raw</b>".into())).unwrap();
        assert_eq!(tree.child_count(div), 0);
        assert_eq!(tree.to_markup(div), "<div><b>raw</b></div>");
    }

    #[test]
    fn test_markup_escaping() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div", false);
        let text = tree.create_text("a<b & \"c\"");
        tree.append_child(div, text).unwrap();
        assert_eq!(
            tree.to_markup(div),
            "<div>a&lt;b &amp; &quot;c&quot;</div>"
        );
    }
}
