//! Events and the dispatch trampoline.
//!
//! Listeners are not stored on host nodes; they live in a per-node
//! name->handler table owned by the engine, toggled by the attribute
//! accessor. Dispatch looks up the live handler at call time, so a
//! handler swapped during a render pass is picked up without any
//! listener re-registration.

use graft_dom::NodeId;
use tracing::trace;

use crate::engine::Engine;
use crate::value::{EventHandler, Value};

/// Listener phase: capture runs root-to-target, bubble target-to-root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenPhase {
    Capture,
    Bubble,
}

pub(crate) struct ListenerEntry {
    pub name: String,
    pub phase: ListenPhase,
    pub handler: EventHandler,
}

/// A dispatched event.
#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
    pub current_target: Option<NodeId>,
    /// Event payload (e.g. an input's new text)
    pub value: Value,
    pub bubbles: bool,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            current_target: None,
            value: Value::Null,
            bubbles: true,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    pub fn non_bubbling(mut self) -> Self {
        self.bubbles = false;
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

impl Engine {
    /// Dispatch an event at `target`, walking capture then bubble
    /// phases through the per-node handler tables. Returns whether any
    /// handler ran.
    pub fn dispatch_event(&mut self, target: NodeId, mut event: Event) -> bool {
        if let Some(hook) = self.options.event.clone() {
            hook(&mut event);
        }

        let mut path = vec![target];
        let mut cur = target;
        while let Some(parent) = self.dom.parent(cur) {
            path.push(parent);
            cur = parent;
        }

        trace!(name = %event.name, ?target, depth = path.len(), "dispatch");
        let mut handled = false;

        // capture: root towards target
        for &node in path.iter().rev() {
            if event.is_propagation_stopped() {
                return handled;
            }
            if let Some(handler) = self.listener(node, &event.name, ListenPhase::Capture) {
                event.current_target = Some(node);
                handler(&mut event, self);
                handled = true;
            }
        }

        // bubble: target towards root
        for &node in path.iter() {
            if event.is_propagation_stopped() {
                return handled;
            }
            if let Some(handler) = self.listener(node, &event.name, ListenPhase::Bubble) {
                event.current_target = Some(node);
                handler(&mut event, self);
                handled = true;
            }
            if !event.bubbles {
                break;
            }
        }

        handled
    }

    /// Live handler lookup in a node's table.
    pub(crate) fn listener(
        &self,
        node: NodeId,
        name: &str,
        phase: ListenPhase,
    ) -> Option<EventHandler> {
        self.listeners
            .get(&node)?
            .iter()
            .find(|e| e.phase == phase && e.name == name)
            .map(|e| e.handler.clone())
    }

    pub(crate) fn set_listener(
        &mut self,
        node: NodeId,
        name: &str,
        phase: ListenPhase,
        handler: Option<EventHandler>,
    ) {
        let entries = self.listeners.entry(node).or_default();
        match handler {
            Some(handler) => {
                for entry in entries.iter_mut() {
                    if entry.phase == phase && entry.name == name {
                        entry.handler = handler;
                        return;
                    }
                }
                entries.push(ListenerEntry {
                    name: name.to_string(),
                    phase,
                    handler,
                });
            }
            None => {
                entries.retain(|e| !(e.phase == phase && e.name == name));
            }
        }
    }
}
