//! The directive-driven render compiler.
//!
//! A [`Template`] is compiled once from a [`TemplateNode`] and renders the
//! node's children into a list of [`VNode`]s for any data value. Compiled
//! nodes are immutable; per-pass state lives in the [`Scope`] only.

use std::rc::Rc;

use tagalong_core::{Scope, Value};
use tagalong_dom::{Document, NodeId, Props, QualName, VNode, ns};
use tagalong_expr::{Expression, Interpolation, compile_interpolation};

use crate::CompileError;
use crate::attrs::{AttrSlot, AttributeMap, EventBinding};
use crate::directives::{Directives, Repeat};
use crate::options::{CompileOptions, HIDE_STYLE};
use crate::template_ast::{TemplateElement, TemplateNode};

#[derive(Debug)]
enum Node {
    Text(Interpolation),
    Element(Box<ElementNode>),
}

#[derive(Debug, Clone)]
enum Condition {
    Always,
    If(Expression),
    Unless(Expression),
}

impl Condition {
    fn holds(&self, data: &Value, scope: &Scope) -> bool {
        match self {
            Condition::Always => true,
            Condition::If(e) => e.evaluate(data, scope).is_truthy(),
            Condition::Unless(e) => !e.evaluate(data, scope).is_truthy(),
        }
    }
}

#[derive(Debug)]
enum Content {
    Text(Expression),
    Children(Vec<Node>),
}

#[derive(Debug)]
struct ElementNode {
    /// Unique within the template; stamped on every instance.
    slot: usize,
    tag: String,
    namespace: Option<String>,
    attrs: Vec<AttrSlot>,
    events: Vec<EventBinding>,
    condition: Condition,
    repeat: Repeat,
    alias: Option<String>,
    content: Content,
    /// Stand-in for an empty `each` when preserving directives.
    placeholder: Option<VNode>,
}

/// A compiled template.
#[derive(Debug, Clone)]
pub struct Template {
    nodes: Rc<[Node]>,
    options: Rc<CompileOptions>,
}

impl Template {
    /// Compile the children of `root`. The root itself is only a container.
    pub fn compile(root: &TemplateNode, options: CompileOptions) -> Result<Self, CompileError> {
        let mut slots = 0;
        let nodes = compile_children(root.children(), &options, &mut slots)?;
        Ok(Self {
            nodes: nodes.into(),
            options: Rc::new(options),
        })
    }

    /// Snapshot the live node `id` and compile it.
    pub fn from_live(doc: &Document, id: NodeId, options: CompileOptions) -> Result<Self, CompileError> {
        Self::compile(&TemplateNode::from_live(doc, id), options)
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Render one pass. `scope` is left as it was given.
    pub fn render(&self, data: &Value, scope: &Scope) -> Vec<VNode> {
        let mut scope = scope.clone();
        let mut out = Vec::new();
        let cx = Cx { options: &self.options };
        for node in self.nodes.iter() {
            node.render(data, &mut scope, &mut out, &cx);
        }
        out
    }
}

fn compile_children(
    children: &[TemplateNode],
    options: &CompileOptions,
    slots: &mut usize,
) -> Result<Vec<Node>, CompileError> {
    let mut nodes = Vec::with_capacity(children.len());
    // Condition of the nearest preceding element sibling, for `else`.
    let mut previous: Option<Condition> = None;
    for child in children {
        match child {
            TemplateNode::Text(t) => {
                if !child.is_blank() {
                    previous = None;
                }
                let text = compile_interpolation(t).map_err(|error| CompileError::Expression {
                    tag: "#text".to_string(),
                    attribute: "text".to_string(),
                    error,
                })?;
                nodes.push(Node::Text(text));
            }
            TemplateNode::Element(el) => {
                let sibling = previous.take();
                match compile_element(el, sibling, options, slots)? {
                    Some(node) => {
                        previous = Some(node.condition.clone());
                        nodes.push(Node::Element(Box::new(node)));
                    }
                    None => previous = None,
                }
            }
            TemplateNode::Fragment(inner) => {
                previous = None;
                nodes.extend(compile_children(inner, options, slots)?);
            }
        }
    }
    Ok(nodes)
}

fn compile_element(
    el: &TemplateElement,
    sibling: Option<Condition>,
    options: &CompileOptions,
    slots: &mut usize,
) -> Result<Option<ElementNode>, CompileError> {
    let map = AttributeMap::build(&el.name, &el.attrs, options)?;
    let Some(directives) = Directives::parse(&el.name, &map)? else {
        tracing::debug!(tag = %el.name, "skipping subtree");
        return Ok(None);
    };

    let condition = match (directives.condition, directives.is_else) {
        (Some(expr), _) => Condition::If(expr),
        (None, true) => match sibling {
            Some(Condition::If(expr)) => Condition::Unless(expr),
            _ => {
                return Err(CompileError::ElseWithoutIf {
                    tag: el.name.clone(),
                });
            }
        },
        (None, false) => Condition::Always,
    };

    let slot = *slots;
    *slots += 1;

    let qualified = QualName::parse(&el.name);
    let (tag, namespace) = match qualified.namespace() {
        Some(uri) => (qualified.local, Some(uri.to_string())),
        None if el.name.eq_ignore_ascii_case("svg") => (el.name.clone(), Some(ns::SVG.to_string())),
        None => (el.name.clone(), el.namespace.clone()),
    };

    let content = match directives.text {
        Some(expr) => Content::Text(expr),
        None => Content::Children(compile_children(&el.children, options, slots)?),
    };

    tracing::debug!(
        tag = %tag,
        slot,
        repeat = directives.repeat.kind(),
        conditional = !matches!(condition, Condition::Always),
        alias = directives.alias.as_deref(),
        "compiled element"
    );

    let placeholder = (options.preserve_directives && matches!(directives.repeat, Repeat::Each(_))).then(|| {
        let mut node = el.to_vnode();
        if let VNode::Element { props, .. } = &mut node {
            props.insert("style", HIDE_STYLE);
            props.slot = Some(slot);
        }
        node
    });

    Ok(Some(ElementNode {
        slot,
        tag,
        namespace,
        attrs: map.slots,
        events: map.events,
        condition,
        repeat: directives.repeat,
        alias: directives.alias,
        content,
        placeholder,
    }))
}

struct Cx<'a> {
    options: &'a CompileOptions,
}

impl Node {
    fn render(&self, data: &Value, scope: &mut Scope, out: &mut Vec<VNode>, cx: &Cx<'_>) {
        match self {
            Node::Text(text) => out.push(VNode::Text(text.render(data, scope))),
            Node::Element(el) => el.render(data, scope, out, cx),
        }
    }
}

/// Items of an iterable value: array elements, `{key, value}` pairs of an
/// object in insertion order, characters of a string. Anything else is empty.
pub fn iterate(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.to_vec(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| Value::object([("key", Value::from(k.as_str())), ("value", v.clone())]))
            .collect(),
        Value::String(s) => s.chars().map(|c| Value::from(c.to_string())).collect(),
        _ => Vec::new(),
    }
}

impl ElementNode {
    fn render(&self, data: &Value, scope: &mut Scope, out: &mut Vec<VNode>, cx: &Cx<'_>) {
        match &self.repeat {
            Repeat::Each(items) => {
                let items = iterate(&items.evaluate(data, scope));
                tracing::trace!(tag = %self.tag, count = items.len(), "each");
                if items.is_empty() {
                    if let Some(placeholder) = &self.placeholder {
                        out.push(placeholder.clone());
                    }
                    return;
                }
                let start = out.len();
                for (i, item) in items.iter().enumerate() {
                    scope.with_frame(&cx.options.index_symbol, Value::from(i), |scope| {
                        self.aliased(item, scope, |scope| {
                            if self.condition.holds(item, scope) {
                                out.push(self.element(item, scope, None, cx));
                            }
                        });
                    });
                }
                if cx.options.preserve_directives {
                    mark_repeats(&mut out[start..], cx.options);
                }
            }
            Repeat::ForEach(items) => {
                if self.condition.holds(data, scope) {
                    out.push(self.element(data, scope, Some(items), cx));
                }
            }
            Repeat::With(narrow) => {
                if !self.condition.holds(data, scope) {
                    return;
                }
                let narrowed = narrow.evaluate(data, scope);
                self.aliased(&narrowed, scope, |scope| {
                    out.push(self.element(&narrowed, scope, None, cx));
                });
            }
            Repeat::Once => {
                if !self.condition.holds(data, scope) {
                    return;
                }
                self.aliased(data, scope, |scope| out.push(self.element(data, scope, None, cx)));
            }
        }
    }

    fn aliased<R>(&self, value: &Value, scope: &mut Scope, f: impl FnOnce(&mut Scope) -> R) -> R {
        match &self.alias {
            Some(alias) => scope.with_frame(alias, value.clone(), f),
            None => f(scope),
        }
    }

    /// One instance of the element. `children_each` repeats the children.
    fn element(&self, data: &Value, scope: &mut Scope, children_each: Option<&Expression>, cx: &Cx<'_>) -> VNode {
        let mut props = Props {
            namespace: self.namespace.clone(),
            slot: Some(self.slot),
            ..Props::default()
        };
        for slot in &self.attrs {
            if let Some((name, value)) = slot.render(data, scope) {
                props.insert(name, value);
            }
        }
        props.key = props.get(&cx.options.key_attribute).map(str::to_string);
        props.listeners = self.events.iter().map(|e| e.bind(data, scope)).collect();

        let mut children = Vec::new();
        match &self.content {
            Content::Text(expr) => {
                let value = expr.evaluate(data, scope);
                if !value.is_nullish() {
                    children.push(VNode::Text(value.to_display()));
                }
            }
            Content::Children(nodes) => match children_each {
                Some(items) => {
                    for (i, item) in iterate(&items.evaluate(data, scope)).iter().enumerate() {
                        scope.with_frame(&cx.options.index_symbol, Value::from(i), |scope| {
                            self.aliased(item, scope, |scope| {
                                for node in nodes {
                                    node.render(item, scope, &mut children, cx);
                                }
                            });
                        });
                    }
                }
                None => {
                    for node in nodes {
                        node.render(data, scope, &mut children, cx);
                    }
                }
            },
        }

        VNode::Element {
            tag: self.tag.clone(),
            props,
            children,
        }
    }
}

/// Instances after the first carry the skip directive instead of `each`.
fn mark_repeats(instances: &mut [VNode], options: &CompileOptions) {
    let each = options.directive_name("each");
    let skip = options.directive_name("skip");
    for node in instances.iter_mut().skip(1) {
        if let VNode::Element { props, .. } = node {
            props.remove(&each);
            props.insert(skip.as_str(), "");
        }
    }
}
