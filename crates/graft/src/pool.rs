//! Instance pool.
//!
//! Retired component objects keyed by constructor identity. A retired
//! entry keeps only the boxed user object and its last host node (the
//! reuse hint); all other instance bookkeeping is rebuilt on checkout.

use std::any::TypeId;
use std::collections::HashMap;

use graft_dom::NodeId;

use crate::component::{Component, ComponentKind};

pub(crate) struct Retired {
    pub component: Box<dyn Component>,
    pub next_base: Option<NodeId>,
}

/// Store of retired component instances available for reuse.
#[derive(Default)]
pub struct InstancePool {
    retired: HashMap<TypeId, Vec<Retired>>,
}

impl InstancePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total retired instances across all kinds.
    pub fn size(&self) -> usize {
        self.retired.values().map(Vec::len).sum()
    }

    /// Retired instances of one kind.
    pub fn size_of(&self, kind: &ComponentKind) -> usize {
        self.retired.get(&kind.type_id()).map_or(0, Vec::len)
    }

    pub(crate) fn put(&mut self, kind: &ComponentKind, entry: Retired) {
        self.retired.entry(kind.type_id()).or_default().push(entry);
    }

    pub(crate) fn take(&mut self, kind: &ComponentKind) -> Option<Retired> {
        self.retired.get_mut(&kind.type_id())?.pop()
    }
}
