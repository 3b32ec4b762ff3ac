//! Component lifecycle manager.
//!
//! Drives an instance through props assignment, rendering and
//! teardown, including high-order chaining: when a component's render
//! output is itself a component, the two instances link up and share
//! one materialized host node, however deep the chain goes.
//!
//! Ordering rules this module maintains:
//! - dirty flag and snapshot fields clear *before* the user render
//!   runs, so an update requested from inside render is neither lost
//!   nor able to recurse into the in-flight pass;
//! - a parent's render (including synchronous high-order descendant
//!   renders) completes before control returns to the scheduler;
//! - did-update runs inline; did-mount defers to the end of the
//!   outermost pass, children before parents.

use graft_dom::NodeId;
use tracing::debug;

use crate::accessor::{KEY_ATTR, REF_ATTR};
use crate::component::ComponentKind;
use crate::engine::Engine;
use crate::error::{RenderError, RenderResult};
use crate::instance::{Instance, InstanceFlags, InstanceId};
use crate::pool::Retired;
use crate::props::PropMap;
use crate::value::{apply_ref, RefTarget, Value};
use crate::vnode::{VChild, VName, VNode};

/// How a props assignment propagates into rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Update state only; no render
    NoRender,
    /// Render immediately
    Sync,
    /// Render immediately, bypassing the should-update gate
    Force,
    /// Defer through the scheduler (unless this is the first mount or
    /// synchronous updates are globally enabled)
    Async,
}

impl Engine {
    /// Props a component instance receives for a component-typed vnode:
    /// the attributes, embedded children, and declared defaults.
    pub(crate) fn get_node_props(&self, kind: &ComponentKind, vnode: &VNode) -> PropMap {
        let mut props = vnode.attributes.clone();
        if !vnode.children.is_empty() {
            props.set(
                crate::accessor::CHILDREN_PROP,
                Value::Nodes(vnode.children.clone()),
            );
        }
        if let Some(defaults) = kind.default_props {
            for (name, value) in defaults().iter() {
                if !props.contains(name) {
                    props.set(name, value.clone());
                }
            }
        }
        props
    }

    /// Allocate an instance, reusing a pooled one of the same kind when
    /// available. Checkout fully resets bookkeeping; only the boxed
    /// user object and the retained node hint survive.
    pub(crate) fn create_component(
        &mut self,
        kind: ComponentKind,
        props: PropMap,
        context: PropMap,
    ) -> InstanceId {
        let (component, next_base) = match self.pool.take(&kind) {
            Some(retired) => (retired.component, retired.next_base),
            None => (kind.instantiate(), None),
        };
        let mut inst = Instance::new(kind, component);
        inst.props = props;
        inst.context = context;
        inst.next_base = next_base;
        let id = self.instances.insert(inst);
        debug!(kind = kind.name(), ?id, "create instance");
        id
    }

    /// Assign props to an instance and possibly render it.
    pub(crate) fn set_component_props(
        &mut self,
        id: InstanceId,
        mut props: PropMap,
        mode: RenderMode,
        context: PropMap,
        mount_all: bool,
    ) -> RenderResult<()> {
        {
            let Some(inst) = self.instances.get_mut(id) else {
                return Ok(());
            };
            // reentrant calls while disabled are ignored
            if inst.is_disabled() {
                return Ok(());
            }
            inst.flags.insert(InstanceFlags::DISABLED);

            // reserved names never reach user code
            inst.ref_slot = match props.remove(REF_ATTR) {
                Some(Value::Ref(slot)) => Some(slot),
                _ => None,
            };
            inst.key = props.remove(KEY_ATTR).map(|v| v.to_text());
        }

        let (has_derived, fresh) = match self.instances.get(id) {
            Some(inst) => (inst.kind.derived_state.is_some(), inst.base.is_none()),
            None => return Ok(()),
        };

        // the static derive-state hook supplants both will-hooks;
        // derived state merges later, during render
        if !has_derived {
            if fresh || mount_all {
                self.with_hook_cx(id, |comp, cx| comp.will_mount(cx));
            } else {
                let next_props = props.clone();
                let next_context = context.clone();
                self.with_hook_cx(id, |comp, cx| {
                    comp.will_receive_props(&next_props, &next_context, cx)
                });
            }
        }

        {
            let Some(inst) = self.instances.get_mut(id) else {
                return Ok(());
            };
            if !context.is_empty() && context != inst.context {
                if inst.prev_context.is_none() {
                    inst.prev_context = Some(inst.context.clone());
                }
                inst.context = context;
            }
            // snapshot only on the first assignment since the last
            // render; batched assignments keep the original snapshot
            if inst.prev_props.is_none() {
                inst.prev_props = Some(inst.props.clone());
            }
            inst.props = props;
            inst.flags.remove(InstanceFlags::DISABLED);
        }

        if mode != RenderMode::NoRender {
            if mode == RenderMode::Sync || self.options.sync_component_updates || fresh {
                self.render_component(id, RenderMode::Sync, mount_all, false)?;
            } else {
                self.enqueue_render(id);
            }
        }

        let slot = self.instances.get(id).and_then(|i| i.ref_slot.clone());
        apply_ref(slot.as_ref(), Some(RefTarget::Instance(id)));
        Ok(())
    }

    /// Render an instance, taking high-order composition into account.
    pub(crate) fn render_component(
        &mut self,
        id: InstanceId,
        mode: RenderMode,
        mount_all: bool,
        is_child: bool,
    ) -> RenderResult<()> {
        let Some(inst) = self.instances.get(id) else {
            return Ok(());
        };
        if inst.is_disabled() {
            return Ok(());
        }

        let kind = inst.kind;
        let props = inst.props.clone();
        let mut state = inst.state.clone();
        let context = inst.context.clone();
        let previous_props = inst.prev_props.clone().unwrap_or_else(|| props.clone());
        let previous_state = inst.prev_state.clone().unwrap_or_else(|| state.clone());
        let previous_context = inst.prev_context.clone().unwrap_or_else(|| context.clone());
        let is_update = inst.base;
        let next_base = inst.next_base;
        let initial_base = is_update.or(next_base);
        let initial_child = inst.child;
        let mut skip = false;
        let mut snapshot: Option<Value> = None;

        if let Some(derive) = kind.derived_state {
            let patch = derive(&props, &state);
            state.extend(&patch);
            if let Some(inst) = self.instances.get_mut(id) {
                inst.state = state.clone();
            }
        }

        if is_update.is_some() {
            // the update gate runs against the previous values
            if let Some(inst) = self.instances.get_mut(id) {
                inst.props = previous_props.clone();
                inst.state = previous_state.clone();
                inst.context = previous_context.clone();
            }
            let mut allowed = true;
            if mode != RenderMode::Force {
                allowed = self
                    .with_hook_cx(id, |comp, cx| comp.should_update(&props, &state, &context, cx))
                    .unwrap_or(true);
            }
            if allowed {
                self.with_hook_cx(id, |comp, cx| comp.will_update(&props, &state, &context, cx));
            } else {
                skip = true;
            }
            if let Some(inst) = self.instances.get_mut(id) {
                inst.props = props.clone();
                inst.state = state.clone();
                inst.context = context.clone();
            }
        }

        // clearing before the user render keeps a mid-render update
        // from being lost or recursing into this pass
        if let Some(inst) = self.instances.get_mut(id) {
            inst.prev_props = None;
            inst.prev_state = None;
            inst.prev_context = None;
            inst.next_base = None;
            inst.flags.remove(InstanceFlags::DIRTY);
        }

        if !skip {
            let rendered: Option<VNode> = self
                .with_hook_cx(id, |comp, cx| comp.render(cx))
                .flatten();

            // context contribution for descendants
            let mut child_context = context.clone();
            if let Some(Some(extra)) = self.with_hook_cx(id, |comp, cx| comp.child_context(cx)) {
                child_context = PropMap::merged(&child_context, &extra);
            }

            if is_update.is_some() {
                snapshot = self
                    .with_hook_cx(id, |comp, _cx| {
                        comp.snapshot_before_update(&previous_props, &previous_state)
                    })
                    .flatten();
            }

            let child_kind = match &rendered {
                Some(vnode) => match &vnode.name {
                    VName::Component(k) => Some(*k),
                    VName::Tag(_) => None,
                },
                None => None,
            };

            let mut to_unmount: Option<InstanceId> = None;
            let mut new_child: Option<InstanceId> = None;
            let base: Option<NodeId>;

            if let (Some(vnode), Some(ck)) = (rendered.as_ref(), child_kind) {
                // high-order composition: the rendered root is itself a
                // component sharing this instance's base
                let child_props = self.get_node_props(&ck, vnode);
                let child_key = vnode.key.clone();

                let reuse = initial_child.filter(|&ci| {
                    self.instances
                        .get(ci)
                        .is_some_and(|i| i.kind.same(&ck) && i.key == child_key)
                });

                match reuse {
                    Some(ci) => {
                        self.set_component_props(
                            ci,
                            child_props,
                            RenderMode::Sync,
                            child_context.clone(),
                            false,
                        )?;
                        new_child = Some(ci);
                    }
                    None => {
                        to_unmount = initial_child;

                        let ci = self.create_component(ck, child_props.clone(), child_context.clone());
                        if let Some(child_inst) = self.instances.get_mut(ci) {
                            if child_inst.next_base.is_none() {
                                child_inst.next_base = next_base;
                            }
                            child_inst.parent = Some(id);
                        }
                        if let Some(inst) = self.instances.get_mut(id) {
                            inst.child = Some(ci);
                        }
                        self.set_component_props(
                            ci,
                            child_props,
                            RenderMode::NoRender,
                            child_context.clone(),
                            false,
                        )?;
                        self.render_component(ci, RenderMode::Sync, mount_all, true)?;
                        new_child = Some(ci);
                    }
                }

                base = new_child
                    .and_then(|ci| self.instances.get(ci))
                    .and_then(|i| i.base);
            } else {
                // host-typed (or empty) root
                let mut cbase = initial_base;

                // stale high-order link tears down
                to_unmount = initial_child;
                if to_unmount.is_some() {
                    cbase = None;
                    if let Some(inst) = self.instances.get_mut(id) {
                        inst.child = None;
                    }
                }

                if initial_base.is_some() || mode == RenderMode::Sync {
                    if let Some(cb) = cbase {
                        self.node_owner.remove(&cb);
                    }
                    let parent_node = initial_base.and_then(|b| self.dom.parent(b));
                    let rendered_child = rendered.map(VChild::Node);
                    let node = self.diff(
                        cbase,
                        rendered_child.as_ref(),
                        &child_context,
                        mount_all || is_update.is_none(),
                        parent_node,
                        true,
                    )?;
                    base = Some(node);
                } else {
                    base = None;
                }
            }

            // base identity changed: splice the new node into the old
            // position and recycle the displaced one (unless a live
            // high-order child took ownership of it)
            if let (Some(old_base), Some(new_base)) = (initial_base, base) {
                if new_base != old_base && new_child != initial_child {
                    if let Some(base_parent) = self.dom.parent(old_base) {
                        if new_base != base_parent {
                            self.dom.replace_child(base_parent, new_base, old_base)?;
                            if to_unmount.is_none() {
                                self.node_owner.remove(&old_base);
                                self.recollect_node_tree(old_base, false)?;
                            }
                        }
                    }
                }
            }

            if let Some(stale) = to_unmount {
                self.unmount_component(stale)?;
            }

            if let Some(inst) = self.instances.get_mut(id) {
                inst.base = base;
            }

            if base.is_some() && !is_child {
                // every ancestor in a high-order chain points at the
                // same node; the outermost owns it
                let mut root = id;
                let mut cursor = id;
                while let Some(parent) = self.instances.get(cursor).and_then(|i| i.parent) {
                    if let Some(pi) = self.instances.get_mut(parent) {
                        pi.base = base;
                    }
                    root = parent;
                    cursor = parent;
                }
                if let Some(b) = base {
                    self.node_owner.insert(b, root);
                }
            }
        }

        // mount bookkeeping happens even for a skipped pass
        if is_update.is_none() || mount_all {
            self.mounts.push_back(id);
        } else if !skip {
            let snap = snapshot;
            self.with_hook_cx(id, |comp, cx| {
                comp.did_update(&previous_props, &previous_state, snap.as_ref(), cx)
            });
            if let Some(hook) = self.options.after_update.clone() {
                hook(id);
            }
        }

        // drain one-shot callbacks, newest first
        loop {
            let cb = match self.instances.get_mut(id) {
                Some(inst) => inst.callbacks.pop(),
                None => None,
            };
            match cb {
                Some(cb) => cb(self),
                None => break,
            }
        }

        if self.diff_level == 0 && !is_child {
            self.flush_mounts()?;
        }
        Ok(())
    }

    /// Apply a component-typed vnode to a host position, matching an
    /// existing owning instance by constructor identity where possible.
    pub(crate) fn build_component_from_vnode(
        &mut self,
        dom: Option<NodeId>,
        kind: ComponentKind,
        vnode: &VNode,
        context: &PropMap,
        mount_all: bool,
    ) -> RenderResult<NodeId> {
        let mut dom = dom;
        let mut c = dom
            .and_then(|d| self.node_owner.get(&d).copied())
            .filter(|&ci| self.instances.contains_key(ci));
        let original_component = c;
        let mut old_dom = dom;

        let is_direct_owner =
            c.is_some_and(|ci| self.instances.get(ci).is_some_and(|i| i.kind.same(&kind)));
        let mut is_owner = is_direct_owner;

        // walk the high-order chain for a matching constructor
        while let Some(ci) = c {
            if is_owner {
                break;
            }
            c = self.instances.get(ci).and_then(|i| i.parent);
            if let Some(p) = c {
                is_owner = self.instances.get(p).is_some_and(|i| i.kind.same(&kind));
            }
        }

        let props = self.get_node_props(&kind, vnode);

        if let Some(ci) = c {
            let mounted_child = self.instances.get(ci).is_some_and(|i| i.child.is_some());
            let has_base = self.instances.get(ci).and_then(|i| i.base).is_some();
            if is_owner && (!mount_all || mounted_child) && has_base {
                self.set_component_props(ci, props.clone(), RenderMode::Async, context.clone(), mount_all)?;
                if let Some(base) = self.instances.get(ci).and_then(|i| i.base) {
                    return Ok(base);
                }
            }
        }

        // mismatched owner: tear it down and build a fresh instance
        if let Some(orig) = original_component {
            if !is_direct_owner {
                self.unmount_component(orig)?;
                dom = None;
                old_dom = None;
            }
        }

        let ci = self.create_component(kind, props.clone(), context.clone());
        if let Some(d) = dom {
            if self.instances.get(ci).is_some_and(|i| i.next_base.is_none()) {
                if let Some(inst) = self.instances.get_mut(ci) {
                    inst.next_base = Some(d);
                }
                // adopted as the reuse hint; skip the recycling below
                old_dom = None;
            }
        }
        self.set_component_props(ci, props, RenderMode::Sync, context.clone(), mount_all)?;
        let base = self
            .instances
            .get(ci)
            .and_then(|i| i.base)
            .ok_or(RenderError::MissingBase(kind.name()))?;

        if let Some(od) = old_dom {
            if od != base {
                self.node_owner.remove(&od);
                self.recollect_node_tree(od, false)?;
            }
        }
        Ok(base)
    }

    /// Tear an instance down, recycle its host node as a reuse hint and
    /// return the user object to the pool.
    pub(crate) fn unmount_component(&mut self, id: InstanceId) -> RenderResult<()> {
        if !self.instances.contains_key(id) {
            return Ok(());
        }
        if let Some(hook) = self.options.before_unmount.clone() {
            hook(id);
        }
        debug!(?id, "unmount");

        let base = self.instances.get(id).and_then(|i| i.base);
        if let Some(inst) = self.instances.get_mut(id) {
            inst.flags.insert(InstanceFlags::DISABLED);
            inst.component.will_unmount();
            inst.base = None;
        }

        let inner = self.instances.get(id).and_then(|i| i.child);
        if let Some(inner) = inner {
            // high-order children tear down first, recursively
            self.unmount_component(inner)?;
        } else if let Some(b) = base {
            // detach the node-tied ref before the node goes away
            let node_ref = self.attr_cache.get(&b).and_then(|c| match c.get(REF_ATTR) {
                Some(Value::Ref(slot)) => Some(slot.clone()),
                _ => None,
            });
            if node_ref.is_some() {
                apply_ref(node_ref.as_ref(), None);
            }

            if let Some(inst) = self.instances.get_mut(id) {
                inst.next_base = Some(b);
            }
            self.dom.detach(b)?;
            self.remove_children(b)?;
        }

        // the instance's own external ref detaches last
        let slot = self.instances.get(id).and_then(|i| i.ref_slot.clone());
        apply_ref(slot.as_ref(), None);

        if let Some(b) = base {
            if self.node_owner.get(&b) == Some(&id) {
                self.node_owner.remove(&b);
            }
        }
        if let Some(inst) = self.instances.remove(id) {
            // high-order wrappers own no node of their own; only the
            // innermost instance returns to the pool
            if inst.child.is_none() {
                self.pool.put(
                    &inst.kind,
                    Retired {
                        component: inst.component,
                        next_base: inst.next_base,
                    },
                );
            }
        }
        Ok(())
    }
}
