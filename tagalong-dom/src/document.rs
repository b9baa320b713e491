//! In-memory host tree.
//!
//! Nodes live in an arena owned by the [`Document`] and are addressed by
//! [`NodeId`]. Detaching a node keeps it in the arena, so it can be
//! re-inserted later with its identity intact. A detached subtree that is no
//! longer wanted is handed back with [`Document::release`]; its ids are then
//! recycled by later allocations.

use crate::html;
use crate::ns;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Fragment,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    /// `None` is HTML.
    pub namespace: Option<String>,
    pub attrs: Vec<(String, String)>,
}

/// A text selection range inside one node, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    /// Released slots, reused before the arena grows.
    free: Vec<NodeId>,
    focused: Option<NodeId>,
    selection: Option<Selection>,
    mutations: usize,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            free: Vec::new(),
            focused: None,
            selection: None,
            mutations: 0,
        };
        doc.root = doc.alloc(NodeKind::Fragment);
        doc
    }

    /// Parse `markup` into a fresh document.
    pub fn parse(markup: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.root;
        html::parse_into(&mut doc, root, markup);
        doc
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = node;
                id
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Free a detached subtree. Its ids must not be used afterwards; they
    /// will be handed out again by `create_*`. Returns `false` and does
    /// nothing when `id` is the root or still has a parent.
    pub fn release(&mut self, id: NodeId) -> bool {
        if id == self.root || self.nodes[id.0].parent.is_some() {
            return false;
        }
        self.clear_interaction_within(id);
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let node = &mut self.nodes[next.0];
            stack.append(&mut node.children);
            node.kind = NodeKind::Fragment;
            node.parent = None;
            self.free.push(next);
        }
        true
    }

    /// Nodes currently allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Slots the arena has ever grown to.
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.create_element_ns(None, name)
    }

    pub fn create_element_ns(&mut self, namespace: Option<&str>, name: &str) -> NodeId {
        self.alloc(NodeKind::Element(Element {
            name: name.to_string(),
            namespace: namespace.map(str::to_string),
            attrs: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Text(text.to_string()))
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(NodeKind::Fragment)
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.name.as_str())
    }

    pub fn namespace(&self, id: NodeId) -> Option<&str> {
        self.element(id).and_then(|el| el.namespace.as_deref())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Is `node` `ancestor` itself or one of its descendants?
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if id == ancestor {
                return true;
            }
            cur = self.parent(id);
        }
        false
    }

    /// Is `id` attached, directly or transitively, to the document root?
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.contains(self.root, id)
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match self.element(id) {
            Some(el) => &el.attrs,
            None => &[],
        }
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Look an attribute up by namespace URI and local name.
    pub fn get_attribute_ns(&self, id: NodeId, namespace: &str, local: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|(k, _)| {
                let q = ns::QualName::parse(k);
                q.local == local && q.namespace() == Some(namespace)
            })
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        match el.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => el.attrs.push((name.to_string(), value.to_string())),
        }
        self.mutations += 1;
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        let Some(el) = self.element_mut(id) else {
            return false;
        };
        let Some(pos) = el.attrs.iter().position(|(k, _)| k == name) else {
            return false;
        };
        el.attrs.remove(pos);
        self.mutations += 1;
        true
    }

    /// Text of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: &str) {
        if let NodeKind::Text(t) = &mut self.nodes[id.0].kind {
            text.clone_into(t);
            self.mutations += 1;
        }
    }

    /// Concatenated text of `id` and all its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => out.push_str(t),
            _ => {
                for &child in &self.nodes[id.0].children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Insert `child` into `parent` before `reference` (at the end when
    /// `reference` is `None` or not a child of `parent`).
    ///
    /// A child that already has a parent is moved; moving keeps focus. A
    /// fragment is emptied into `parent` in its place.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if self.contains(child, parent) {
            tracing::warn!(?parent, ?child, "refusing to insert a node into its own subtree");
            return;
        }
        if matches!(self.nodes[child.0].kind, NodeKind::Fragment) {
            let moved = std::mem::take(&mut self.nodes[child.0].children);
            for node in moved {
                self.nodes[node.0].parent = None;
                self.insert_before(parent, node, reference);
            }
            return;
        }
        if Some(child) == reference {
            return;
        }
        self.detach(child);
        let siblings = &mut self.nodes[parent.0].children;
        let pos = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        siblings.insert(pos, child);
        self.nodes[child.0].parent = Some(parent);
        self.mutations += 1;
    }

    /// Detach `child` from `parent`. Clears focus if it was inside `child`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.nodes[child.0].parent != Some(parent) {
            return false;
        }
        self.clear_interaction_within(child);
        self.detach(child);
        self.mutations += 1;
        true
    }

    /// Drop focus and selection held anywhere inside `id`.
    fn clear_interaction_within(&mut self, id: NodeId) {
        if self.focused.is_some_and(|f| self.contains(id, f)) {
            self.focused = None;
        }
        if self.selection.is_some_and(|s| self.contains(id, s.node)) {
            self.selection = None;
        }
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.nodes[child.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != child);
        }
    }

    pub fn focus(&mut self, id: NodeId) {
        self.focused = Some(id);
    }

    pub fn blur(&mut self) {
        self.focused = None;
    }

    pub fn active_element(&self) -> Option<NodeId> {
        self.focused
    }

    /// Select `start..end` within `node`. Moving the node keeps it.
    pub fn set_selection(&mut self, node: NodeId, start: usize, end: usize) {
        self.selection = Some(Selection {
            node,
            start: start.min(end),
            end: start.max(end),
        });
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Descendants of `id` in document order, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// First element in the document matching `#id` or a tag name.
    pub fn select(&self, selector: &str) -> Option<NodeId> {
        self.select_within(self.root, selector)
    }

    pub fn select_within(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        self.descendants(scope).into_iter().find(|&id| match selector.strip_prefix('#') {
            Some(wanted) => self.get_attribute(id, "id") == Some(wanted),
            None => self
                .tag_name(id)
                .is_some_and(|tag| tag.eq_ignore_ascii_case(selector)),
        })
    }

    /// Number of tree, attribute and text mutations applied so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    /// Replace the children of `id` with parsed `markup`.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) {
        for child in self.children(id).to_vec() {
            self.remove_child(id, child);
        }
        html::parse_into(self, id, markup);
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            html::write_node(self, child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        html::write_node(self, id, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_moves_existing_children() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element("a");
        let b = doc.create_element("b");
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.insert_before(root, b, Some(a));
        assert_eq!(doc.children(root), [b, a]);
        assert_eq!(doc.parent(b), Some(root));
    }

    #[test]
    fn fragments_empty_into_parent() {
        let mut doc = Document::new();
        let root = doc.root();
        let frag = doc.create_fragment();
        let t1 = doc.create_text("x");
        let t2 = doc.create_text("y");
        doc.append_child(frag, t1);
        doc.append_child(frag, t2);
        doc.append_child(root, frag);
        assert_eq!(doc.children(root), [t1, t2]);
        assert!(doc.children(frag).is_empty());
        assert_eq!(doc.text_content(root), "xy");
    }

    #[test]
    fn cannot_insert_into_own_subtree() {
        let mut doc = Document::new();
        let root = doc.root();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(root, outer);
        doc.append_child(outer, inner);
        doc.append_child(inner, outer);
        assert_eq!(doc.parent(outer), Some(root));
    }

    #[test]
    fn attributes_update_in_place() {
        let mut doc = Document::new();
        let el = doc.create_element("div");
        doc.set_attribute(el, "id", "a");
        doc.set_attribute(el, "class", "b");
        doc.set_attribute(el, "id", "c");
        assert_eq!(doc.attributes(el), [("id".into(), "c".into()), ("class".into(), "b".into())]);
        assert!(doc.remove_attribute(el, "id"));
        assert!(!doc.remove_attribute(el, "id"));
        assert_eq!(doc.mutation_count(), 4);
    }

    #[test]
    fn released_subtrees_are_recycled() {
        let mut doc = Document::parse("<ul><li>a</li><li>b</li></ul>");
        let root = doc.root();
        let ul = doc.children(root)[0];
        let allocated = doc.node_count();
        assert!(!doc.release(ul), "attached nodes stay");

        doc.remove_child(root, ul);
        assert!(doc.release(ul));
        assert_eq!(doc.node_count(), allocated - 5);
        assert!(!doc.release(root));

        let capacity = doc.capacity();
        let p = doc.create_element("p");
        let t = doc.create_text("x");
        doc.append_child(p, t);
        doc.append_child(root, p);
        assert_eq!(doc.capacity(), capacity);
        assert_eq!(doc.inner_html(root), "<p>x</p>");
        assert_eq!(doc.tag_name(p), Some("p"));
        assert!(doc.attributes(p).is_empty());
    }

    #[test]
    fn releasing_clears_focus_inside() {
        let mut doc = Document::parse("<div><input></div>");
        let root = doc.root();
        let div = doc.children(root)[0];
        let input = doc.children(div)[0];
        doc.focus(input);
        doc.remove_child(root, div);
        assert_eq!(doc.active_element(), None);
        doc.focus(input);
        doc.release(div);
        assert_eq!(doc.active_element(), None);
    }

    #[test]
    fn selection_follows_moves_and_clears_on_removal() {
        let mut doc = Document::parse("<p>one</p><p>two</p>");
        let root = doc.root();
        let [first, second] = [doc.children(root)[0], doc.children(root)[1]];
        let text = doc.children(second)[0];
        doc.set_selection(text, 2, 1);
        assert_eq!(doc.selection(), Some(Selection { node: text, start: 1, end: 2 }));

        doc.insert_before(root, second, Some(first));
        assert_eq!(doc.selection().map(|s| s.node), Some(text));

        doc.remove_child(root, first);
        assert!(doc.selection().is_some());
        doc.remove_child(root, second);
        assert_eq!(doc.selection(), None);
    }
}
