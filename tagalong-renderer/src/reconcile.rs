//! In-place patching of a live subtree from a rendered [`VNode`] list.
//!
//! Children are walked with a cursor in the order they were rendered. An
//! element reuses the live child under the cursor when tag, namespace and key
//! agree and, for unkeyed nodes, when it was rendered by the same template
//! element; otherwise a matching child further along is moved into place, and
//! only then is a new node created. Whatever is left after the cursor once a
//! parent's children are done is stale: it is removed and released.

use std::collections::HashMap;

use tagalong_core::Value;
use tagalong_dom::diff::{AttrPatch, diff_attrs};
use tagalong_dom::{Document, NodeId, NodeKind, Props, VNode};

use crate::events::{self, EventRegistry};

/// What the last pass committed to one live node.
#[derive(Debug, Clone, Default, PartialEq)]
struct Record {
    key: Option<String>,
    /// `None` until a pass with a slotted node claims it.
    slot: Option<usize>,
    attrs: Vec<(String, String)>,
    text: Option<String>,
}

#[derive(Debug)]
pub struct Reconciler {
    key_attribute: String,
    records: HashMap<NodeId, Record>,
    events: EventRegistry,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new("key")
    }
}

impl Reconciler {
    /// `key_attribute` names the attribute that carries a pre-existing
    /// node's key.
    pub fn new(key_attribute: impl Into<String>) -> Self {
        Self {
            key_attribute: key_attribute.into(),
            records: HashMap::new(),
            events: EventRegistry::new(),
        }
    }

    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    /// Number of live nodes this reconciler tracks.
    pub fn tracked(&self) -> usize {
        self.records.len()
    }

    /// Make the children of `target` match `nodes`.
    pub fn patch(&mut self, doc: &mut Document, target: NodeId, nodes: &[VNode]) {
        self.patch_children(doc, target, nodes);
    }

    /// Invoke listeners for `event` on `target` and its ancestors.
    pub fn dispatch(&self, doc: &Document, target: NodeId, event: &str, detail: Value) -> usize {
        events::dispatch(&self.events, doc, target, event, detail)
    }

    fn record(&mut self, doc: &Document, id: NodeId) -> &mut Record {
        let key_attribute = &self.key_attribute;
        self.records.entry(id).or_insert_with(|| Record {
            key: doc.get_attribute(id, key_attribute).map(str::to_string),
            slot: None,
            attrs: doc.attributes(id).to_vec(),
            text: doc.text(id).map(str::to_string),
        })
    }

    fn patch_children(&mut self, doc: &mut Document, parent: NodeId, nodes: &[VNode]) {
        let mut cursor = 0;
        for node in nodes {
            let current = doc.children(parent).get(cursor).copied();
            match node {
                VNode::Text(text) => self.patch_text(doc, parent, current, text),
                VNode::Element { tag, props, children } => {
                    let id = self.resolve_element(doc, parent, cursor, tag, props);
                    self.events.detach(id);
                    self.patch_attrs(doc, id, props);
                    self.patch_children(doc, id, children);
                    self.events.attach(id, props.listeners.clone());
                }
            }
            cursor += 1;
        }

        let stale: Vec<NodeId> = doc.children(parent).get(cursor..).unwrap_or_default().to_vec();
        for id in stale {
            tracing::trace!(?parent, node = ?id, "removing stale node");
            self.forget(doc, id);
            doc.remove_child(parent, id);
            doc.release(id);
        }
    }

    fn patch_text(&mut self, doc: &mut Document, parent: NodeId, current: Option<NodeId>, text: &str) {
        match current.filter(|&id| doc.text(id).is_some()) {
            Some(id) => {
                let record = self.record(doc, id);
                if record.text.as_deref() != Some(text) {
                    record.text = Some(text.to_string());
                    doc.set_text(id, text);
                }
            }
            None => {
                let id = doc.create_text(text);
                doc.insert_before(parent, id, current);
                self.record(doc, id);
                tracing::trace!(?parent, node = ?id, "created text");
            }
        }
    }

    /// The live element for the child at `cursor`, reused, moved or created.
    fn resolve_element(&mut self, doc: &mut Document, parent: NodeId, cursor: usize, tag: &str, props: &Props) -> NodeId {
        let current = doc.children(parent).get(cursor).copied();

        if let Some(id) = current.filter(|&id| self.matches(doc, id, tag, props)) {
            tracing::trace!(node = ?id, tag, "reused");
            return id;
        }

        let later = (cursor + 1..doc.children(parent).len())
            .map(|i| doc.children(parent)[i])
            .find(|&id| self.matches(doc, id, tag, props));
        if let Some(id) = later {
            tracing::trace!(node = ?id, tag, key = props.key.as_deref(), "moved");
            doc.insert_before(parent, id, current);
            return id;
        }

        let id = doc.create_element_ns(props.namespace.as_deref(), tag);
        doc.insert_before(parent, id, current);
        self.records.insert(
            id,
            Record {
                key: props.key.clone(),
                slot: props.slot,
                ..Record::default()
            },
        );
        tracing::trace!(node = ?id, tag, "created");
        id
    }

    fn matches(&mut self, doc: &Document, id: NodeId, tag: &str, props: &Props) -> bool {
        let NodeKind::Element(el) = doc.kind(id) else {
            return false;
        };
        let same_tag = match props.namespace {
            None => el.name.eq_ignore_ascii_case(tag),
            Some(_) => el.name == tag,
        };
        if !same_tag || el.namespace != props.namespace {
            return false;
        }
        let record = self.record(doc, id);
        let same_slot = props.key.is_some() || record.slot.is_none() || record.slot == props.slot;
        record.key == props.key && same_slot
    }

    fn patch_attrs(&mut self, doc: &mut Document, id: NodeId, props: &Props) {
        let record = self.record(doc, id);
        let patches = diff_attrs(&record.attrs, &props.attrs);
        record.attrs.clone_from(&props.attrs);
        record.key.clone_from(&props.key);
        record.slot = props.slot;
        for patch in patches {
            match patch {
                AttrPatch::Set(name, value) => doc.set_attribute(id, &name, &value),
                AttrPatch::Remove(name) => {
                    doc.remove_attribute(id, &name);
                }
            }
        }
    }

    /// Drop records and listeners for `id` and its subtree.
    fn forget(&mut self, doc: &Document, id: NodeId) {
        for node in doc.descendants(id).into_iter().chain([id]) {
            self.records.remove(&node);
            self.events.detach(node);
        }
    }
}
