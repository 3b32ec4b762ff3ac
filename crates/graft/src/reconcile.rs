//! Reconciler.
//!
//! Diffs a virtual subtree against a materialized host subtree,
//! applying the minimal set of mutations. Entry at recursion depth zero
//! resolves the namespace and hydration mode; returning to depth zero
//! flushes deferred mounts exactly once per outermost pass.

use std::collections::HashMap;

use graft_dom::{NodeId, PropertyValue};
use tracing::trace;

use crate::accessor::{CHILDREN_PROP, KEY_ATTR, LIVE_PROPERTIES, RAW_MARKUP_ATTR, REF_ATTR};
use crate::engine::Engine;
use crate::error::RenderResult;
use crate::props::PropMap;
use crate::value::{apply_ref, Value};
use crate::vnode::{VChild, VName};

impl Engine {
    /// Apply differences between `vnode` (and its descendants) and an
    /// existing host node, materializing into `container`.
    pub(crate) fn diff(
        &mut self,
        dom: Option<NodeId>,
        vnode: Option<&VChild>,
        context: &PropMap,
        mount_all: bool,
        container: Option<NodeId>,
        component_root: bool,
    ) -> RenderResult<NodeId> {
        if self.diff_level == 0 {
            // initial entry: resolve namespace from the container and
            // detect hydration from missing bookkeeping
            self.svg_mode = container.is_some_and(|p| self.dom.is_namespaced(p));
            self.hydrating = dom.is_some_and(|d| !self.attr_cache.contains_key(&d));
        }
        self.diff_level += 1;

        let result = self.idiff(dom, vnode, context, mount_all, component_root);

        self.diff_level -= 1;
        let ret = match result {
            Ok(node) => node,
            Err(err) => {
                if self.diff_level == 0 {
                    self.hydrating = false;
                }
                return Err(err);
            }
        };

        if let Some(container) = container {
            if self.dom.parent(ret) != Some(container) {
                self.dom.append_child(container, ret)?;
            }
        }

        if self.diff_level == 0 {
            self.hydrating = false;
            if !component_root {
                self.flush_mounts()?;
            }
        }
        Ok(ret)
    }

    /// Structural diff for one node, bypassing depth bookkeeping.
    fn idiff(
        &mut self,
        dom: Option<NodeId>,
        vnode: Option<&VChild>,
        context: &PropMap,
        mount_all: bool,
        component_root: bool,
    ) -> RenderResult<NodeId> {
        let prev_svg = self.svg_mode;

        // empty values and primitive leaves render as text nodes
        let text = match vnode {
            None => Some(""),
            Some(VChild::Text(t)) => Some(t.as_str()),
            Some(VChild::Node(_)) => None,
        };
        if let Some(text) = text {
            let reusable = dom.filter(|&d| {
                self.dom.is_text(d)
                    && self.dom.parent(d).is_some()
                    && (!self.node_owner.contains_key(&d) || component_root)
            });
            let out = match reusable {
                Some(d) => {
                    // in-place value update, only when changed
                    self.dom.set_text(d, text)?;
                    d
                }
                None => {
                    let out = self.dom.create_text(text);
                    if let Some(d) = dom {
                        if let Some(parent) = self.dom.parent(d) {
                            self.dom.replace_child(parent, out, d)?;
                        }
                        self.recollect_node_tree(d, true)?;
                    }
                    out
                }
            };
            self.attr_cache.entry(out).or_default();
            return Ok(out);
        }

        let vn = match vnode {
            Some(VChild::Node(vn)) => vn,
            _ => unreachable!("primitive leaves handled above"),
        };

        let tag = match &vn.name {
            VName::Component(kind) => {
                return self.build_component_from_vnode(dom, *kind, vn, context, mount_all);
            }
            VName::Tag(tag) => tag,
        };

        // namespace tracking: enter at the svg tag, exit at the escape tag
        self.svg_mode = match tag.as_str() {
            "svg" => true,
            "foreignObject" => false,
            _ => self.svg_mode,
        };

        let out = match dom.filter(|&d| self.is_named_node(d, tag)) {
            Some(d) => d,
            None => {
                // no existing node or wrong tag: create in the current
                // namespace, migrate children, recycle the displaced node
                let node = self.dom.create_element(tag, self.svg_mode);
                trace!(%tag, ?node, "create");
                if let Some(d) = dom {
                    while let Some(fc) = self.dom.first_child(d) {
                        self.dom.append_child(node, fc)?;
                    }
                    if let Some(parent) = self.dom.parent(d) {
                        self.dom.replace_child(parent, node, d)?;
                    }
                    self.recollect_node_tree(d, true)?;
                }
                node
            }
        };

        // lazily rebuild the attribute cache from live attributes
        if !self.attr_cache.contains_key(&out) {
            let mut cache = PropMap::new();
            for (name, value) in self.dom.attributes(out) {
                cache.set(name, Value::Str(value));
            }
            self.attr_cache.insert(out, cache);
        }

        let first = self.dom.first_child(out);
        let vchildren = &vn.children;
        let single_text = match vchildren.as_slice() {
            [VChild::Text(t)] => Some(t.as_str()),
            _ => None,
        };

        let fast = !self.hydrating
            && single_text.is_some()
            && first.is_some_and(|f| self.dom.is_text(f) && self.dom.next_sibling(f).is_none());
        if fast {
            // sole-text fast path: overwrite the value directly
            if let (Some(text), Some(f)) = (single_text, first) {
                self.dom.set_text(f, text)?;
            }
        } else if !vchildren.is_empty() || first.is_some() {
            let raw = self
                .attr_cache
                .get(&out)
                .and_then(|c| c.get(RAW_MARKUP_ATTR))
                .is_some_and(Value::is_truthy);
            self.inner_diff_node(out, vchildren, context, mount_all, self.hydrating || raw)?;
        }

        self.diff_attributes(out, &vn.attributes)?;

        self.svg_mode = prev_svg;
        Ok(out)
    }

    fn is_named_node(&self, node: NodeId, tag: &str) -> bool {
        self.dom
            .tag(node)
            .is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Keyed/positional child reconciliation.
    fn inner_diff_node(
        &mut self,
        dom: NodeId,
        vchildren: &[VChild],
        context: &PropMap,
        mount_all: bool,
        is_hydrating: bool,
    ) -> RenderResult<()> {
        let original_children = self.dom.children(dom);
        let vlen = vchildren.len();

        // file existing children into a key map and a positional pool
        let mut keyed: HashMap<String, Option<NodeId>> = HashMap::new();
        let mut keyed_count = 0usize;
        let mut children: Vec<Option<NodeId>> = Vec::new();

        for &child in &original_children {
            let cache = self.attr_cache.get(&child);
            let key: Option<String> = if vlen > 0 && cache.is_some() {
                match self
                    .node_owner
                    .get(&child)
                    .and_then(|&ci| self.instances.get(ci))
                {
                    Some(inst) => inst.key.clone(),
                    None => cache.and_then(|c| c.get(KEY_ATTR)).map(Value::to_text),
                }
            } else {
                None
            };

            if let Some(key) = key {
                use std::collections::hash_map::Entry;
                match keyed.entry(key) {
                    Entry::Vacant(slot) => {
                        slot.insert(Some(child));
                        keyed_count += 1;
                    }
                    // duplicate sibling key: the extra occurrence
                    // degrades to positional matching
                    Entry::Occupied(_) => children.push(Some(child)),
                }
            } else {
                let poolable = if cache.is_some() {
                    true
                } else if self.dom.is_text(child) {
                    if is_hydrating {
                        self.dom.text(child).is_some_and(|t| !t.trim().is_empty())
                    } else {
                        true
                    }
                } else {
                    is_hydrating
                };
                if poolable {
                    children.push(Some(child));
                }
            }
        }

        let mut child_len = children.len();
        let mut min = 0usize;

        for (i, vchild) in vchildren.iter().enumerate() {
            let mut child: Option<NodeId> = None;
            let mut try_positional = false;

            match vchild.key() {
                Some(key) => match keyed.get_mut(key) {
                    Some(slot @ Some(_)) => {
                        child = slot.take();
                        keyed_count = keyed_count.saturating_sub(1);
                    }
                    // key already consumed by an earlier sibling
                    Some(None) => try_positional = true,
                    None => {}
                },
                None => try_positional = true,
            }

            // scan forward from the advancing cursor for a type match
            if child.is_none() && try_positional && min < child_len {
                for j in min..child_len {
                    if let Some(candidate) = children[j] {
                        if self.is_same_node_type(candidate, vchild, is_hydrating) {
                            child = children[j].take();
                            if j == child_len - 1 {
                                child_len -= 1;
                            }
                            if j == min {
                                min += 1;
                            }
                            break;
                        }
                    }
                }
            }

            let materialized = self.idiff(child, Some(vchild), context, mount_all, false)?;

            // reposition only when the node is not already in its slot
            let occupant = self.dom.child_at(dom, i);
            if materialized != dom && occupant != Some(materialized) {
                match occupant {
                    None => self.dom.append_child(dom, materialized)?,
                    Some(f) if self.dom.next_sibling(f) == Some(materialized) => {
                        self.dom.detach(f)?;
                    }
                    Some(f) => self.dom.insert_before(dom, materialized, Some(f))?,
                }
            }
        }

        // recycle unconsumed keyed nodes
        if keyed_count > 0 {
            let leftover: Vec<NodeId> = keyed.values().filter_map(|slot| *slot).collect();
            for node in leftover {
                self.recollect_node_tree(node, false)?;
            }
        }

        // recycle orphaned positional nodes
        for j in (min..child_len).rev() {
            if let Some(node) = children[j].take() {
                self.recollect_node_tree(node, false)?;
            }
        }
        Ok(())
    }

    /// Whether an existing node can stand in for a new child: same tag,
    /// or same primitive-vs-element kind, relaxed during hydration.
    fn is_same_node_type(&self, node: NodeId, vchild: &VChild, hydrating: bool) -> bool {
        match vchild {
            VChild::Text(_) => self.dom.is_text(node),
            VChild::Node(vn) => match &vn.name {
                VName::Tag(tag) => {
                    !self.node_owner.contains_key(&node) && self.is_named_node(node, tag)
                }
                VName::Component(kind) => {
                    hydrating
                        || self
                            .node_owner
                            .get(&node)
                            .and_then(|&ci| self.instances.get(ci))
                            .is_some_and(|i| i.kind.same(kind))
                }
            },
        }
    }

    /// Cache-driven attribute reconciliation.
    pub(crate) fn diff_attributes(&mut self, dom: NodeId, attrs: &PropMap) -> RenderResult<()> {
        let old = self.attr_cache.get(&dom).cloned().unwrap_or_default();

        // clear names absent (or null) from the new attributes
        for (name, old_value) in old.iter() {
            let absent = matches!(attrs.get(name), None | Some(Value::Null));
            if absent && !matches!(old_value, Value::Null) {
                self.set_accessor(dom, name, Some(old_value), None, self.svg_mode)?;
                if let Some(cache) = self.attr_cache.get_mut(&dom) {
                    cache.remove(name);
                }
            }
        }

        // apply new and changed values
        for (name, value) in attrs.iter() {
            if name == CHILDREN_PROP {
                continue;
            }
            let changed = match old.get(name) {
                None => true,
                Some(old_value) => {
                    if LIVE_PROPERTIES.contains(&name) {
                        // external interaction can move these; compare
                        // against the live node, not the cache
                        !self.live_property_matches(dom, name, value)
                    } else {
                        old_value != value
                    }
                }
            };
            if changed {
                self.set_accessor(dom, name, old.get(name), Some(value), self.svg_mode)?;
                self.attr_cache
                    .entry(dom)
                    .or_default()
                    .set(name, value.clone());
            }
        }
        Ok(())
    }

    fn live_property_matches(&self, node: NodeId, name: &str, value: &Value) -> bool {
        match self.dom.property(node, name) {
            Some(PropertyValue::Str(s)) => value.to_text() == *s,
            Some(PropertyValue::Bool(b)) => matches!(value, Value::Bool(v) if v == b),
            None => false,
        }
    }

    /// Recursively recycle (or just unmount) a node and its descendants.
    pub(crate) fn recollect_node_tree(
        &mut self,
        node: NodeId,
        unmount_only: bool,
    ) -> RenderResult<()> {
        let owner = self
            .node_owner
            .get(&node)
            .copied()
            .filter(|&ci| self.instances.contains_key(ci));
        if let Some(ci) = owner {
            // owned nodes tear down through their component
            return self.unmount_component(ci);
        }
        self.node_owner.remove(&node);

        let node_ref = self.attr_cache.get(&node).and_then(|c| match c.get(REF_ATTR) {
            Some(Value::Ref(slot)) => Some(slot.clone()),
            _ => None,
        });
        if node_ref.is_some() {
            apply_ref(node_ref.as_ref(), None);
        }

        if !unmount_only || !self.attr_cache.contains_key(&node) {
            self.dom.detach(node)?;
        }
        self.remove_children(node)
    }

    /// Recollect all children, last to first.
    pub(crate) fn remove_children(&mut self, node: NodeId) -> RenderResult<()> {
        let mut cur = self.dom.last_child(node);
        while let Some(child) = cur {
            let prev = self.dom.prev_sibling(child);
            self.recollect_node_tree(child, true)?;
            cur = prev;
        }
        Ok(())
    }

    /// Invoke queued did-mount hooks, in first-mounted order.
    pub(crate) fn flush_mounts(&mut self) -> RenderResult<()> {
        while let Some(id) = self.mounts.pop_front() {
            if !self.instances.contains_key(id) {
                continue;
            }
            if let Some(hook) = self.options.after_mount.clone() {
                hook(id);
            }
            self.with_hook_cx(id, |comp, cx| comp.did_mount(cx));
        }
        Ok(())
    }
}
