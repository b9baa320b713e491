use std::fmt;
use std::rc::Rc;

use tagalong_core::Value;

pub mod diff;
pub mod document;
mod html;
pub mod ns;

pub use document::{Document, NodeId, NodeKind, Selection};
pub use ns::QualName;

/// One render pass's description of the tree it wants.
#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
    Element {
        tag: String,
        props: Props,
        children: Vec<VNode>,
    },
    Text(String),
}

impl VNode {
    pub fn tag(&self) -> Option<&str> {
        match self {
            VNode::Element { tag, .. } => Some(tag),
            VNode::Text(_) => None,
        }
    }

    pub fn props(&self) -> Option<&Props> {
        match self {
            VNode::Element { props, .. } => Some(props),
            VNode::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Element { children, .. } => children,
            VNode::Text(_) => &[],
        }
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        match self {
            VNode::Text(t) => t.clone(),
            VNode::Element { children, .. } => children.iter().map(VNode::text_content).collect(),
        }
    }
}

/// Called with the event object when a subscribed event reaches the node.
pub type Handler = Rc<dyn Fn(&Value)>;

/// An event subscription declared by a render pass.
#[derive(Clone)]
pub struct Listener {
    pub event: String,
    pub handler: Handler,
}

impl Listener {
    pub fn new(event: impl Into<String>, handler: impl Fn(&Value) + 'static) -> Self {
        Self {
            event: event.into(),
            handler: Rc::new(handler),
        }
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("event", &self.event).finish_non_exhaustive()
    }
}

// Handlers are fresh closures every pass; two listeners are the same
// subscription when they name the same event.
impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.event == other.event
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Props {
    /// Element namespace URI; `None` is HTML.
    pub namespace: Option<String>,
    pub attrs: Vec<(String, String)>,
    pub key: Option<String>,
    /// Which compiled template element produced this node. Unkeyed nodes
    /// are only reused by the element that rendered them.
    pub slot: Option<usize>,
    pub listeners: Vec<Listener>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, k: impl Into<String>, v: impl Into<String>) -> Self {
        self.insert(k, v);
        self
    }

    /// Set an attribute, keeping its original position when it already exists.
    pub fn insert(&mut self, k: impl Into<String>, v: impl Into<String>) {
        let k = k.into();
        let v = v.into();
        match self.attrs.iter_mut().find(|(name, _)| *name == k) {
            Some(slot) => slot.1 = v,
            None => self.attrs.push((k, v)),
        }
    }

    pub fn get(&self, k: &str) -> Option<&str> {
        self.attrs.iter().find(|(name, _)| name == k).map(|(_, v)| v.as_str())
    }

    pub fn remove(&mut self, k: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|(name, _)| name == k)?;
        Some(self.attrs.remove(pos).1)
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn on(mut self, event: impl Into<String>, handler: impl Fn(&Value) + 'static) -> Self {
        self.listeners.push(Listener::new(event, handler));
        self
    }
}

// Allow concise props creation
impl From<()> for Props {
    fn from(_: ()) -> Self {
        Props::default()
    }
}
impl From<Vec<(&str, &str)>> for Props {
    fn from(v: Vec<(&str, &str)>) -> Self {
        let mut p = Props::new();
        for (k, v) in v {
            p.insert(k, v);
        }
        p
    }
}

pub fn h(tag: impl Into<String>, props: impl Into<Props>, children: Vec<VNode>) -> VNode {
    VNode::Element {
        tag: tag.into(),
        props: props.into(),
        children,
    }
}
pub fn text(t: impl Into<String>) -> VNode {
    VNode::Text(t.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_tree() {
        let node = h(
            "ul",
            vec![("class", "list")],
            vec![text("hello"), h("li", Props::new().key("a"), vec![text("world")])],
        );
        assert_eq!(node.tag(), Some("ul"));
        assert_eq!(node.props().and_then(|p| p.get("class")), Some("list"));
        assert_eq!(node.children().len(), 2);
        assert_eq!(node.children()[1].props().and_then(|p| p.key.as_deref()), Some("a"));
        assert_eq!(node.text_content(), "helloworld");
    }

    #[test]
    fn insert_keeps_attribute_order() {
        let mut p = Props::from(vec![("a", "1"), ("b", "2")]);
        p.insert("a", "3");
        p.insert("c", "4");
        assert_eq!(p.attrs, [("a".into(), "3".into()), ("b".into(), "2".into()), ("c".into(), "4".into())]);
        assert_eq!(p.remove("b").as_deref(), Some("2"));
        assert_eq!(p.get("b"), None);
    }

    #[test]
    fn listeners_compare_by_event() {
        let a = Props::new().on("click", |_| {});
        let b = Props::new().on("click", |_| {});
        assert_eq!(a, b);
        assert_ne!(a, Props::new().on("input", |_| {}));
    }
}
