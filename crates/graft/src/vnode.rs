//! Virtual tree nodes.

use crate::component::ComponentKind;
use crate::props::PropMap;

/// What a virtual node names: a host tag or a component type.
#[derive(Clone, Debug, PartialEq)]
pub enum VName {
    Tag(String),
    Component(ComponentKind),
}

impl VName {
    pub fn tag(name: impl Into<String>) -> Self {
        VName::Tag(name.into())
    }

    pub fn is_component(&self) -> bool {
        matches!(self, VName::Component(_))
    }
}

impl From<&str> for VName {
    fn from(s: &str) -> Self {
        VName::Tag(s.to_string())
    }
}

impl From<String> for VName {
    fn from(s: String) -> Self {
        VName::Tag(s)
    }
}

impl From<ComponentKind> for VName {
    fn from(kind: ComponentKind) -> Self {
        VName::Component(kind)
    }
}

/// One child slot: a nested node or a text leaf.
#[derive(Clone, Debug, PartialEq)]
pub enum VChild {
    Text(String),
    Node(VNode),
}

impl VChild {
    /// Reconciliation key, when the child is a keyed node.
    pub fn key(&self) -> Option<&str> {
        match self {
            VChild::Node(n) => n.key.as_deref(),
            VChild::Text(_) => None,
        }
    }
}

/// Declarative description of one desired tree node.
///
/// Immutable once built, as far as the reconciler is concerned.
#[derive(Clone, Debug, PartialEq)]
pub struct VNode {
    pub name: VName,
    pub attributes: PropMap,
    pub children: Vec<VChild>,
    /// Identity key for keyed child matching
    pub key: Option<String>,
}

impl VNode {
    pub fn new(name: impl Into<VName>) -> Self {
        Self {
            name: name.into(),
            attributes: PropMap::new(),
            children: Vec::new(),
            key: None,
        }
    }
}
