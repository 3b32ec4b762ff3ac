//! The engine: owns the host tree, the instance arena, every
//! association table, the scheduler queue, and the diff-pass state.
//!
//! All rendering is single-threaded and cooperative. A pass, once
//! started, runs to completion synchronously; "async" rendering only
//! means deferral of the pass's start through the scheduler queue.

use std::collections::{HashMap, VecDeque};

use graft_dom::{DomTree, NodeId};
use slotmap::SlotMap;

use crate::builder::TreeBuilder;
use crate::component::{Component, Cx, StateOp};
use crate::error::RenderResult;
use crate::event::ListenerEntry;
use crate::instance::{Instance, InstanceFlags, InstanceId};
use crate::lifecycle::RenderMode;
use crate::options::Options;
use crate::pool::InstancePool;
use crate::props::PropMap;
use crate::queue::RenderQueue;
use crate::vnode::{VChild, VNode};

/// The graft runtime.
pub struct Engine {
    /// The host tree being kept in sync
    pub dom: DomTree,

    pub(crate) instances: SlotMap<InstanceId, Instance>,
    /// Host node -> owning instance (the outermost of a high-order chain)
    pub(crate) node_owner: HashMap<NodeId, InstanceId>,
    /// Host node -> last-applied attribute set
    pub(crate) attr_cache: HashMap<NodeId, PropMap>,
    /// Host node -> event listener table
    pub(crate) listeners: HashMap<NodeId, Vec<ListenerEntry>>,

    pub(crate) pool: InstancePool,
    pub(crate) queue: RenderQueue,
    /// Instances awaiting a deferred did-mount, in mount order
    pub(crate) mounts: VecDeque<InstanceId>,

    /// Diff recursion depth; the mount flush runs once per outermost pass
    pub(crate) diff_level: u32,
    /// Whether the pass is inside a vector-graphics subtree
    pub(crate) svg_mode: bool,
    /// Whether the pass is consuming externally created nodes
    pub(crate) hydrating: bool,

    pub(crate) options: Options,
}

impl Engine {
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    pub fn with_options(mut options: Options) -> Self {
        let schedule = options.schedule.take();
        Self {
            dom: DomTree::new(),
            instances: SlotMap::with_key(),
            node_owner: HashMap::new(),
            attr_cache: HashMap::new(),
            listeners: HashMap::new(),
            pool: InstancePool::new(),
            queue: RenderQueue::new(schedule),
            mounts: VecDeque::new(),
            diff_level: 0,
            svg_mode: false,
            hydrating: false,
            options,
        }
    }

    /// A tree builder wired to this engine's vnode extension hook.
    pub fn builder(&self) -> TreeBuilder {
        TreeBuilder {
            vnode_hook: self.options.vnode.clone(),
        }
    }

    /// Materialize (or update) a tree rooted at `container`.
    pub fn render(&mut self, vnode: VNode, container: NodeId) -> RenderResult<NodeId> {
        self.render_over(vnode, container, None)
    }

    /// Materialize a tree rooted at `container`, reconciling against an
    /// existing node. An externally created `merge` node without prior
    /// bookkeeping is hydrated in place.
    pub fn render_over(
        &mut self,
        vnode: VNode,
        container: NodeId,
        merge: Option<NodeId>,
    ) -> RenderResult<NodeId> {
        let child = VChild::Node(vnode);
        self.diff(
            merge,
            Some(&child),
            &PropMap::new(),
            false,
            Some(container),
            false,
        )
    }

    // ---------------------------------------------------------------
    // State entry points
    // ---------------------------------------------------------------

    /// Merge a partial state into an instance and queue a re-render.
    pub fn set_state(&mut self, id: InstanceId, patch: PropMap) {
        self.merge_state(id, patch);
        self.enqueue_render(id);
    }

    /// `set_state` plus a one-shot callback run after the next pass.
    pub fn set_state_with(
        &mut self,
        id: InstanceId,
        patch: PropMap,
        callback: impl FnOnce(&mut Engine) + 'static,
    ) {
        if let Some(inst) = self.instances.get_mut(id) {
            inst.callbacks.push(Box::new(callback));
        }
        self.set_state(id, patch);
    }

    /// Render an instance immediately, bypassing its should-update gate.
    pub fn force_update(&mut self, id: InstanceId) -> RenderResult<()> {
        self.render_component(id, RenderMode::Force, false, false)
    }

    pub(crate) fn merge_state(&mut self, id: InstanceId, patch: PropMap) {
        if let Some(inst) = self.instances.get_mut(id) {
            if inst.prev_state.is_none() {
                inst.prev_state = Some(inst.state.clone());
            }
            inst.state.extend(&patch);
        }
    }

    // ---------------------------------------------------------------
    // Scheduler
    // ---------------------------------------------------------------

    /// Queue a deferred render pass. A no-op for already-dirty
    /// instances, so repeated enqueues coalesce into one pass.
    pub fn enqueue_render(&mut self, id: InstanceId) {
        let Some(inst) = self.instances.get_mut(id) else {
            return;
        };
        if inst.is_dirty() {
            return;
        }
        inst.flags.insert(InstanceFlags::DIRTY);
        self.queue.push(id);
    }

    /// Flush the render queue, newest first. Entries that were
    /// unmounted or already resolved by an ancestor's pass fail their
    /// liveness/dirty check and are skipped.
    pub fn rerender(&mut self) -> RenderResult<()> {
        while let Some(id) = self.queue.pop() {
            let still_dirty = self.instances.get(id).is_some_and(Instance::is_dirty);
            if still_dirty {
                self.render_component(id, RenderMode::Async, false, false)?;
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------

    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    pub fn pool(&self) -> &InstancePool {
        &self.pool
    }

    /// Materialized host node of an instance.
    pub fn base_of(&self, id: InstanceId) -> Option<NodeId> {
        self.instances.get(id).and_then(|i| i.base)
    }

    /// Instance owning a host node, when one does.
    pub fn owner_of(&self, node: NodeId) -> Option<InstanceId> {
        self.node_owner.get(&node).copied()
    }

    pub fn props_of(&self, id: InstanceId) -> Option<&PropMap> {
        self.instances.get(id).map(|i| &i.props)
    }

    pub fn state_of(&self, id: InstanceId) -> Option<&PropMap> {
        self.instances.get(id).map(|i| &i.state)
    }

    /// Whether an instance is still mounted (pooled instances are not).
    pub fn is_live(&self, id: InstanceId) -> bool {
        self.instances.contains_key(id)
    }

    /// High-order child of an instance, when its render output was
    /// itself a component.
    pub fn child_of(&self, id: InstanceId) -> Option<InstanceId> {
        self.instances.get(id).and_then(|i| i.child)
    }

    /// High-order parent of an instance.
    pub fn parent_of(&self, id: InstanceId) -> Option<InstanceId> {
        self.instances.get(id).and_then(|i| i.parent)
    }

    /// Type name of an instance's component.
    pub fn kind_of(&self, id: InstanceId) -> Option<&'static str> {
        self.instances.get(id).map(|i| i.kind.name())
    }

    // ---------------------------------------------------------------
    // Hook plumbing
    // ---------------------------------------------------------------

    /// Run a hook against an instance's component with a context over
    /// its current props/state/context, then apply the deferred ops the
    /// hook requested.
    pub(crate) fn with_hook_cx<R>(
        &mut self,
        id: InstanceId,
        f: impl FnOnce(&mut dyn Component, &mut Cx<'_>) -> R,
    ) -> Option<R> {
        let (result, ops) = {
            let inst = self.instances.get_mut(id)?;
            let Instance {
                component,
                props,
                state,
                context,
                ..
            } = inst;
            let mut cx = Cx::new(id, &*props, &*state, &*context);
            let result = f(component.as_mut(), &mut cx);
            (result, cx.take_ops())
        };
        self.apply_state_ops(id, ops);
        Some(result)
    }

    pub(crate) fn apply_state_ops(&mut self, id: InstanceId, ops: Vec<StateOp>) {
        for op in ops {
            match op {
                StateOp::Merge(patch) => {
                    self.merge_state(id, patch);
                    self.enqueue_render(id);
                }
                StateOp::Callback(cb) => {
                    if let Some(inst) = self.instances.get_mut(id) {
                        inst.callbacks.push(cb);
                    }
                }
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
