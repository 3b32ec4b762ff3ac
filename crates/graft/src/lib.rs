//! # graft
//!
//! Reconciling UI runtime: renders a declarative description of a UI
//! tree into a mutable host tree by computing and applying a minimal
//! set of mutations between successive renders.
//!
//! ## Architecture
//!
//! - [`builder`] - normalizes nested child arguments into a [`VNode`] tree
//! - [`Engine`] - owns the host tree, the component instance arena and
//!   every association table
//! - the reconciler diffs virtual subtrees against materialized host
//!   subtrees (keyed child matching, cache-driven attribute patching)
//! - the lifecycle manager drives instances through props assignment,
//!   rendering and teardown, including high-order chains sharing one
//!   host node
//! - the scheduler queues dirty instances and flushes them newest-first
//!   on a later cooperative turn
//!
//! Everything is single-threaded; a render pass runs to completion
//! synchronously however deep the recursion goes.
//!
//! ```
//! use graft::{build, props, Engine};
//!
//! let mut engine = Engine::new();
//! let container = engine.dom.create_element("body", false);
//! let tree = build("div", props! { "id" => "greeting" }, vec!["hello".into()]);
//! let root = engine.render(tree, container).unwrap();
//! assert_eq!(engine.dom.to_markup(root), "<div id=\"greeting\">hello</div>");
//! ```

mod accessor;
mod builder;
mod component;
mod engine;
mod error;
mod event;
mod instance;
mod lifecycle;
mod options;
mod pool;
mod props;
mod queue;
mod reconcile;
mod value;
mod vnode;

pub use accessor::{CHILDREN_PROP, RAW_MARKUP_ATTR};
pub use builder::{build, Child, TreeBuilder};
pub use component::{Component, ComponentKind, Cx};
pub use engine::Engine;
pub use error::{RenderError, RenderResult};
pub use event::{Event, ListenPhase};
pub use instance::{InstanceFlags, InstanceId};
pub use lifecycle::RenderMode;
pub use options::Options;
pub use pool::InstancePool;
pub use props::PropMap;
pub use queue::{RenderQueue, ScheduleFn};
pub use value::{
    apply_ref, EventHandler, RefCallback, RefSlot, RefTarget, Style, StyleValue, Value,
};
pub use vnode::{VChild, VName, VNode};

pub use graft_dom::{DomError, DomResult, DomTree, NodeId, PropertyValue};
