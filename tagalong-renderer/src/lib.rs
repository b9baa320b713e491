//! Rendering compiled templates into a live [`Document`].
//!
//! [`compile`] turns a live node into a [`RenderFn`]; each call to
//! [`RenderFn::render`] evaluates the template against new data and patches
//! the target in place, keeping node identity wherever the output allows.
//! [`render_string`] is the server-side shortcut: markup in, markup out.

use tagalong_core::{Scope, Value};
use tagalong_dom::{Document, NodeId};
use tagalong_template::{CompileError, CompileOptions, Template};
use thiserror::Error;

pub mod events;
mod reconcile;

pub use events::EventRegistry;
pub use reconcile::Reconciler;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no node matches {0:?}")]
    NodeNotFound(String),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// A compiled template plus the reconciliation state of the targets it has
/// rendered into.
#[derive(Debug)]
pub struct RenderFn {
    template: Template,
    reconciler: Reconciler,
}

impl RenderFn {
    pub fn new(template: Template) -> Self {
        let reconciler = Reconciler::new(template.options().key_attribute.as_str());
        Self { template, reconciler }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// One render pass into `target`. Returns `target`.
    pub fn render(&mut self, doc: &mut Document, target: NodeId, data: &Value, scope: &Scope) -> NodeId {
        let _span = tracing::debug_span!("render", target = target.index()).entered();
        let nodes = self.template.render(data, scope);
        let before = doc.mutation_count();
        self.reconciler.patch(doc, target, &nodes);
        tracing::debug!(mutations = doc.mutation_count() - before, "patched");
        target
    }

    /// Dispatch `event` at `target`, bubbling through its ancestors.
    pub fn dispatch(&self, doc: &Document, target: NodeId, event: &str, detail: Value) -> usize {
        self.reconciler.dispatch(doc, target, event, detail)
    }
}

/// Compile the children of `node` with default options.
pub fn compile(doc: &Document, node: NodeId) -> Result<RenderFn, RenderError> {
    compile_with(doc, node, CompileOptions::default())
}

pub fn compile_with(doc: &Document, node: NodeId, options: CompileOptions) -> Result<RenderFn, RenderError> {
    Ok(RenderFn::new(Template::from_live(doc, node, options)?))
}

/// Compile `node` and render it into itself. The returned function re-renders
/// the same node.
pub fn bind(doc: &mut Document, node: NodeId, data: &Value, scope: &Scope) -> Result<RenderFn, RenderError> {
    let mut render = compile(doc, node)?;
    render.render(doc, node, data, scope);
    Ok(render)
}

/// Compile and render `node` into itself once.
pub fn render_node(doc: &mut Document, node: NodeId, data: &Value, scope: &Scope) -> Result<NodeId, RenderError> {
    bind(doc, node, data, scope).map(|_| node)
}

fn select(doc: &Document, selector: &str) -> Result<NodeId, RenderError> {
    doc.select(selector)
        .ok_or_else(|| RenderError::NodeNotFound(selector.to_string()))
}

/// Compile the first node matching `selector` (`#id` or a tag name).
pub fn compile_selector(doc: &Document, selector: &str) -> Result<(NodeId, RenderFn), RenderError> {
    let node = select(doc, selector)?;
    Ok((node, compile(doc, node)?))
}

pub fn render_selector(doc: &mut Document, selector: &str, data: &Value, scope: &Scope) -> Result<NodeId, RenderError> {
    let node = select(doc, selector)?;
    render_node(doc, node, data, scope)
}

/// Render `markup` to markup, keeping directives so the output can be
/// rendered again.
pub fn render_string(markup: &str, data: &Value, scope: &Scope) -> Result<String, RenderError> {
    render_string_with(markup, data, scope, CompileOptions::default().preserving(true))
}

pub fn render_string_with(
    markup: &str,
    data: &Value,
    scope: &Scope,
    options: CompileOptions,
) -> Result<String, RenderError> {
    let mut doc = Document::parse(markup);
    let root = doc.root();
    let mut render = compile_with(&doc, root, options)?;
    render.render(&mut doc, root, data, scope);
    Ok(doc.inner_html(root))
}
