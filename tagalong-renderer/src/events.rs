use std::collections::HashMap;

use tagalong_core::Value;
use tagalong_dom::{Document, Listener, NodeId};

/// Listeners currently attached to live nodes, keyed by node identity.
///
/// Each reconciler owns one registry, so independent template instances
/// never see each other's handlers.
#[derive(Default)]
pub struct EventRegistry {
    handlers: HashMap<NodeId, Vec<Listener>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever was attached to `node`. An empty list attaches nothing.
    pub fn attach(&mut self, node: NodeId, listeners: Vec<Listener>) {
        if listeners.is_empty() {
            self.handlers.remove(&node);
        } else {
            self.handlers.insert(node, listeners);
        }
    }

    /// Detach and return the listeners of `node`.
    pub fn detach(&mut self, node: NodeId) -> Vec<Listener> {
        self.handlers.remove(&node).unwrap_or_default()
    }

    pub fn listeners(&self, node: NodeId) -> &[Listener] {
        self.handlers.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn has(&self, node: NodeId, event: &str) -> bool {
        self.listeners(node).iter().any(|l| l.event == event)
    }

    /// Number of nodes with at least one listener.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.handlers.iter().map(|(id, ls)| (id, ls.len())))
            .finish()
    }
}

/// The event object handed to handlers: `{type, target, detail}`, where
/// `target` describes the node the event was dispatched on.
pub fn event_object(doc: &Document, target: NodeId, event: &str, detail: Value) -> Value {
    let target_info = Value::object([
        ("node", Value::from(target.index())),
        ("tag", Value::from(doc.tag_name(target))),
        ("id", Value::from(doc.get_attribute(target, "id"))),
    ]);
    Value::object([
        ("type", Value::from(event)),
        ("target", target_info),
        ("detail", detail),
    ])
}

/// Invoke the `event` listeners of `target` and then of each ancestor.
/// Returns the number of listeners invoked.
pub fn dispatch(registry: &EventRegistry, doc: &Document, target: NodeId, event: &str, detail: Value) -> usize {
    let object = event_object(doc, target, event, detail);
    let mut invoked = 0;
    let mut current = Some(target);
    while let Some(node) = current {
        // handlers are cloned out so a handler never observes the borrow
        let matching: Vec<Listener> = registry
            .listeners(node)
            .iter()
            .filter(|l| l.event == event)
            .cloned()
            .collect();
        for listener in matching {
            (listener.handler)(&object);
            invoked += 1;
        }
        current = doc.parent(node);
    }
    tracing::trace!(event, ?target, invoked, "dispatched");
    invoked
}
