//! graft-dom - DOM-like host tree
//!
//! Arena-allocated mutable tree the graft reconciler renders into.
//! Nodes are addressed by `NodeId`; the arena is append-only so that
//! detached subtrees stay addressable and can be reused later.

mod node;
mod tree;

pub use node::{Attribute, ElementData, Node, NodeData, Property, PropertyValue, TextData};
pub use tree::DomTree;

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Raw index value
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Result type for host tree operations
pub type DomResult<T> = Result<T, DomError>;

/// Host tree operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} not found")]
    NotFound(NodeId),

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} is not a text node")]
    NotText(NodeId),

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("inserting {node:?} under {parent:?} would create a cycle")]
    HierarchyRequest { parent: NodeId, node: NodeId },

    #[error("unknown property `{name}` on {node:?}")]
    UnknownProperty { node: NodeId, name: String },

    #[error("invalid value for property `{name}` on {node:?}")]
    InvalidPropertyValue { node: NodeId, name: String },
}
