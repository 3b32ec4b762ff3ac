//! Component model.
//!
//! A component type is a `ComponentKind`: a copyable descriptor pairing
//! a `TypeId` (constructor identity, used for matching and pooling)
//! with a factory for the boxed user object. The user object implements
//! `Component`; every hook is optional except `render`.
//!
//! Hooks never touch the engine directly. They receive a `Cx` exposing
//! the instance's current props/state/context plus deferred operations
//! (`set_state`, `after_render`) the engine applies once the hook
//! returns - state requested from inside a render pass is never lost
//! and cannot recurse into it.

use std::any::{Any, TypeId};

use crate::engine::Engine;
use crate::instance::InstanceId;
use crate::props::PropMap;
use crate::value::Value;
use crate::vnode::VNode;

/// One-shot post-render callback.
pub type RenderCallback = Box<dyn FnOnce(&mut Engine)>;

/// A user component.
pub trait Component: Any {
    /// Produce the component's virtual tree. `None` renders as empty.
    fn render(&mut self, cx: &mut Cx<'_>) -> Option<VNode>;

    /// First mount (or forced remount), before props are assigned.
    fn will_mount(&mut self, _cx: &mut Cx<'_>) {}

    /// Update, before the incoming props are assigned.
    fn will_receive_props(&mut self, _next_props: &PropMap, _next_context: &PropMap, _cx: &mut Cx<'_>) {
    }

    /// Gate an update pass. Returning `false` skips rendering for this
    /// pass; ignored under a forced render.
    fn should_update(
        &mut self,
        _next_props: &PropMap,
        _next_state: &PropMap,
        _next_context: &PropMap,
        _cx: &mut Cx<'_>,
    ) -> bool {
        true
    }

    /// Update pass was not skipped; the new values are about to apply.
    fn will_update(
        &mut self,
        _next_props: &PropMap,
        _next_state: &PropMap,
        _next_context: &PropMap,
        _cx: &mut Cx<'_>,
    ) {
    }

    /// Context contribution merged into what descendants receive.
    fn child_context(&mut self, _cx: &mut Cx<'_>) -> Option<PropMap> {
        None
    }

    /// Capture a value right before host mutations apply; handed back
    /// to `did_update`.
    fn snapshot_before_update(&mut self, _prev_props: &PropMap, _prev_state: &PropMap) -> Option<Value> {
        None
    }

    /// The instance's tree is attached. Deferred to the end of the
    /// outermost pass, children before parents.
    fn did_mount(&mut self, _cx: &mut Cx<'_>) {}

    /// An update pass finished applying.
    fn did_update(
        &mut self,
        _prev_props: &PropMap,
        _prev_state: &PropMap,
        _snapshot: Option<&Value>,
        _cx: &mut Cx<'_>,
    ) {
    }

    /// The instance is about to be torn down.
    fn will_unmount(&mut self) {}
}

/// Component type descriptor ("constructor").
///
/// Define one kind per component type; identity comparisons and pool
/// keying go through the `TypeId`.
#[derive(Clone, Copy)]
pub struct ComponentKind {
    name: &'static str,
    type_id: TypeId,
    create: fn() -> Box<dyn Component>,
    /// Static derive-state-from-props hook. Its presence suppresses
    /// `will_mount`/`will_receive_props`; the returned partial state is
    /// merged during render.
    pub(crate) derived_state: Option<fn(&PropMap, &PropMap) -> PropMap>,
    /// Defaults filled into missing props before assignment.
    pub(crate) default_props: Option<fn() -> PropMap>,
}

impl ComponentKind {
    /// Descriptor for component type `C`.
    pub fn of<C: Component + Default>() -> Self {
        Self {
            name: short_type_name::<C>(),
            type_id: TypeId::of::<C>(),
            create: instantiate::<C>,
            derived_state: None,
            default_props: None,
        }
    }

    pub fn with_derived_state(mut self, f: fn(&PropMap, &PropMap) -> PropMap) -> Self {
        self.derived_state = Some(f);
        self
    }

    pub fn with_default_props(mut self, f: fn() -> PropMap) -> Self {
        self.default_props = Some(f);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Constructor identity comparison.
    pub fn same(&self, other: &ComponentKind) -> bool {
        self.type_id == other.type_id
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub(crate) fn instantiate(&self) -> Box<dyn Component> {
        (self.create)()
    }
}

impl PartialEq for ComponentKind {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl std::fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentKind({})", self.name)
    }
}

fn instantiate<C: Component + Default>() -> Box<dyn Component> {
    Box::new(C::default())
}

fn short_type_name<C>() -> &'static str {
    let full = std::any::type_name::<C>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Hook context: a view of the instance's current props/state/context
/// plus deferred operations applied after the hook returns.
pub struct Cx<'a> {
    id: InstanceId,
    pub props: &'a PropMap,
    pub state: &'a PropMap,
    pub context: &'a PropMap,
    ops: Vec<StateOp>,
}

pub(crate) enum StateOp {
    Merge(PropMap),
    Callback(RenderCallback),
}

impl<'a> Cx<'a> {
    pub(crate) fn new(
        id: InstanceId,
        props: &'a PropMap,
        state: &'a PropMap,
        context: &'a PropMap,
    ) -> Self {
        Self {
            id,
            props,
            state,
            context,
            ops: Vec::new(),
        }
    }

    /// The instance this hook runs for. Handlers built during render
    /// capture this to address the instance later.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Merge a partial state and queue a re-render.
    pub fn set_state(&mut self, patch: PropMap) {
        self.ops.push(StateOp::Merge(patch));
    }

    /// Run once after the current render pass settles.
    pub fn after_render(&mut self, f: impl FnOnce(&mut Engine) + 'static) {
        self.ops.push(StateOp::Callback(Box::new(f)));
    }

    pub(crate) fn take_ops(self) -> Vec<StateOp> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct A;
    impl Component for A {
        fn render(&mut self, _cx: &mut Cx<'_>) -> Option<VNode> {
            None
        }
    }

    #[derive(Default)]
    struct B;
    impl Component for B {
        fn render(&mut self, _cx: &mut Cx<'_>) -> Option<VNode> {
            None
        }
    }

    #[test]
    fn test_kind_identity() {
        let a1 = ComponentKind::of::<A>();
        let a2 = ComponentKind::of::<A>();
        let b = ComponentKind::of::<B>();

        assert!(a1.same(&a2));
        assert!(!a1.same(&b));
        assert_eq!(a1.name(), "A");
    }
}
