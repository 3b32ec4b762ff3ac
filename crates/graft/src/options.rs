//! Runtime extension points.
//!
//! All hooks are injected at engine construction; nothing here is
//! ambient global state.

use std::rc::Rc;

use crate::event::Event;
use crate::instance::InstanceId;
use crate::queue::ScheduleFn;
use crate::vnode::VNode;

/// Optional hooks configuring an [`Engine`](crate::Engine).
#[derive(Default)]
pub struct Options {
    /// When set, default-mode prop updates render immediately instead
    /// of deferring through the scheduler.
    pub sync_component_updates: bool,

    /// Receives every virtual node the engine's builder constructs.
    pub vnode: Option<Rc<dyn Fn(&mut VNode)>>,

    /// Custom async-flush scheduling: fired when the render queue
    /// transitions to pending. The embedder arranges a later call to
    /// `Engine::rerender` (e.g. aligned with its paint cycle).
    pub schedule: Option<ScheduleFn>,

    /// Fired after an instance's deferred did-mount runs.
    pub after_mount: Option<Rc<dyn Fn(InstanceId)>>,

    /// Fired after an instance's did-update runs.
    pub after_update: Option<Rc<dyn Fn(InstanceId)>>,

    /// Fired immediately before an instance unmounts.
    pub before_unmount: Option<Rc<dyn Fn(InstanceId)>>,

    /// Intercepts every dispatched event before any listener sees it.
    pub event: Option<Rc<dyn Fn(&mut Event)>>,
}
