//! Component instances.
//!
//! Instances live in a slot map owned by the engine; every association
//! (host node to owning instance, high-order parent/child) goes through
//! ids rather than embedded references, so a stale link degrades to a
//! failed lookup instead of dangling state.

use bitflags::bitflags;
use graft_dom::NodeId;
use slotmap::new_key_type;

use crate::component::{Component, ComponentKind, RenderCallback};
use crate::props::PropMap;
use crate::value::RefSlot;

new_key_type! {
    /// Key into the engine's instance arena.
    pub struct InstanceId;
}

bitflags! {
    /// Per-instance bookkeeping bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InstanceFlags: u8 {
        /// A re-render is queued.
        const DIRTY = 1 << 0;
        /// Reentrancy guard: hooks are running or teardown started.
        const DISABLED = 1 << 1;
    }
}

/// A mounted (or mounting) component instance.
pub struct Instance {
    pub(crate) kind: ComponentKind,
    pub(crate) component: Box<dyn Component>,

    pub(crate) props: PropMap,
    pub(crate) state: PropMap,
    pub(crate) context: PropMap,

    /// Snapshots taken on the first assignment since the last render;
    /// later assignments before a render keep the original snapshot.
    pub(crate) prev_props: Option<PropMap>,
    pub(crate) prev_state: Option<PropMap>,
    pub(crate) prev_context: Option<PropMap>,

    /// Materialized host node; shared across a high-order chain.
    pub(crate) base: Option<NodeId>,
    /// Detached node retained as a reuse hint.
    pub(crate) next_base: Option<NodeId>,

    /// High-order child (this instance rendered another component).
    pub(crate) child: Option<InstanceId>,
    /// High-order parent (this instance is another's rendered output).
    pub(crate) parent: Option<InstanceId>,

    pub(crate) key: Option<String>,
    pub(crate) ref_slot: Option<RefSlot>,

    pub(crate) flags: InstanceFlags,

    /// One-shot post-render callbacks, drained newest-first.
    pub(crate) callbacks: Vec<RenderCallback>,
}

impl Instance {
    /// Fresh instance bookkeeping. New instances start dirty so a
    /// redundant enqueue before the first render is a no-op.
    pub(crate) fn new(kind: ComponentKind, component: Box<dyn Component>) -> Self {
        Self {
            kind,
            component,
            props: PropMap::new(),
            state: PropMap::new(),
            context: PropMap::new(),
            prev_props: None,
            prev_state: None,
            prev_context: None,
            base: None,
            next_base: None,
            child: None,
            parent: None,
            key: None,
            ref_slot: None,
            flags: InstanceFlags::DIRTY,
            callbacks: Vec::new(),
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.flags.contains(InstanceFlags::DIRTY)
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.flags.contains(InstanceFlags::DISABLED)
    }
}
