use tagalong_dom::{Document, NodeId, NodeKind, QualName, VNode, h, text};

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateAttr {
    pub name: QualName,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateElement {
    /// Tag name as written, possibly `prefix:local`.
    pub name: String,
    /// Namespace the live node was created in; `None` is HTML.
    pub namespace: Option<String>,
    pub attrs: Vec<TemplateAttr>,
    pub children: Vec<TemplateNode>,
}

/// Immutable snapshot of a live node, taken once at compile time.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateNode {
    Element(TemplateElement),
    Text(String),
    Fragment(Vec<TemplateNode>),
}

impl TemplateNode {
    pub fn from_live(doc: &Document, id: NodeId) -> Self {
        match doc.kind(id) {
            NodeKind::Text(t) => TemplateNode::Text(t.clone()),
            NodeKind::Fragment => TemplateNode::Fragment(Self::children_of(doc, id)),
            NodeKind::Element(el) => TemplateNode::Element(TemplateElement {
                name: el.name.clone(),
                namespace: el.namespace.clone(),
                attrs: el
                    .attrs
                    .iter()
                    .map(|(k, v)| TemplateAttr {
                        name: QualName::parse(k),
                        value: v.clone(),
                    })
                    .collect(),
                children: Self::children_of(doc, id),
            }),
        }
    }

    fn children_of(doc: &Document, id: NodeId) -> Vec<TemplateNode> {
        doc.children(id).iter().map(|&c| Self::from_live(doc, c)).collect()
    }

    /// Parse markup into a fragment template.
    pub fn parse(markup: &str) -> Self {
        let doc = Document::parse(markup);
        Self::from_live(&doc, doc.root())
    }

    pub fn children(&self) -> &[TemplateNode] {
        match self {
            TemplateNode::Element(el) => &el.children,
            TemplateNode::Fragment(children) => children,
            TemplateNode::Text(_) => &[],
        }
    }

    /// Is this a text node holding only whitespace?
    pub fn is_blank(&self) -> bool {
        matches!(self, TemplateNode::Text(t) if t.trim().is_empty())
    }

    /// The node as written, with no directive processing.
    pub fn to_vnodes(&self) -> Vec<VNode> {
        match self {
            TemplateNode::Text(t) => vec![text(t.as_str())],
            TemplateNode::Fragment(children) => children.iter().flat_map(TemplateNode::to_vnodes).collect(),
            TemplateNode::Element(el) => vec![el.to_vnode()],
        }
    }
}

impl TemplateElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name.to_string() == name)
            .map(|a| a.value.as_str())
    }

    pub fn to_vnode(&self) -> VNode {
        let mut node = h(
            self.name.as_str(),
            (),
            self.children.iter().flat_map(TemplateNode::to_vnodes).collect(),
        );
        if let VNode::Element { props, .. } = &mut node {
            props.namespace = self.namespace.clone();
            for a in &self.attrs {
                props.insert(a.name.to_string(), a.value.as_str());
            }
        }
        node
    }
}
