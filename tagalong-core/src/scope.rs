// tagalong-core/src/scope.rs

use std::rc::Rc;

use crate::Value;

/// Name resolution environment for one render pass.
///
/// Lookups consult, in order: the current data value, the pushed frames
/// (innermost first), then the caller's context table. Frames carry aliases
/// and the per-iteration index and live only for the subtree that pushed them.
#[derive(Clone, Debug, Default)]
pub struct Scope {
    context: Value,
    frames: Vec<(Rc<str>, Value)>,
}

impl Scope {
    pub fn new(context: impl Into<Value>) -> Self {
        Self {
            context: context.into(),
            frames: Vec::new(),
        }
    }

    pub fn context(&self) -> &Value {
        &self.context
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push(&mut self, name: impl Into<Rc<str>>, value: Value) {
        self.frames.push((name.into(), value));
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.frames.pop().map(|(_, v)| v)
    }

    /// Run `f` with `name` bound to `value`; the frame is popped afterwards.
    pub fn with_frame<R>(&mut self, name: &str, value: Value, f: impl FnOnce(&mut Scope) -> R) -> R {
        let depth = self.frames.len();
        self.push(name, value);
        let out = f(self);
        self.frames.truncate(depth);
        out
    }

    /// Frames, then the context table. An `undefined` frame binds nothing.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.frames
            .iter()
            .rev()
            .find(|(n, v)| &**n == name && !v.is_undefined())
            .map(|(_, v)| v.clone())
            .or_else(|| self.context.get(name))
    }

    /// Full two-level resolution: the data value first, then [`Scope::lookup`].
    pub fn resolve(&self, data: &Value, name: &str) -> Value {
        data.get(name)
            .or_else(|| self.lookup(name))
            .unwrap_or_default()
    }
}
