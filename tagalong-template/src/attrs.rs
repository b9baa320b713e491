//! Per-element attribute partitioning.
//!
//! A prefixed attribute (`t-href`, `xlink:t-href`) is a directive when its
//! remainder is a reserved name, an event subscription when the remainder
//! starts with the event prefix, and a dynamic binding otherwise. Everything
//! else passes through as written.

use tagalong_core::{Scope, Value};
use tagalong_dom::{Listener, QualName};
use tagalong_expr::{ExprError, Expression, Interpolation, compile_expression, compile_interpolation, is_arrow, is_template};

use crate::options::{CompileOptions, HIDE_STYLE};
use crate::template_ast::TemplateAttr;
use crate::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    If,
    Else,
    Each,
    ForEach,
    With,
    As,
    Text,
    Skip,
}

impl Directive {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "if" => Directive::If,
            "else" => Directive::Else,
            "each" => Directive::Each,
            "foreach" => Directive::ForEach,
            "with" => Directive::With,
            "as" => Directive::As,
            "text" => Directive::Text,
            "skip" => Directive::Skip,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Directive::If => "if",
            Directive::Else => "else",
            Directive::Each => "each",
            Directive::ForEach => "foreach",
            Directive::With => "with",
            Directive::As => "as",
            Directive::Text => "text",
            Directive::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrKind {
    Static,
    Dynamic(String),
    Event(String),
    Directive(Directive),
}

/// Classify one attribute name.
pub fn classify(name: &QualName, options: &CompileOptions) -> AttrKind {
    let Some(rest) = name.local.strip_prefix(options.prefix.as_str()) else {
        return AttrKind::Static;
    };
    if let Some(directive) = Directive::from_name(rest) {
        return AttrKind::Directive(directive);
    }
    match rest.strip_prefix(options.event_prefix.as_str()) {
        Some(event) if !event.is_empty() => AttrKind::Event(event.to_string()),
        _ => AttrKind::Dynamic(name.with_local(rest).to_string()),
    }
}

/// A dynamic attribute value: an interpolated string or an expression.
#[derive(Debug, Clone)]
pub enum Binding {
    Template(Interpolation),
    Expression(Expression),
}

impl Binding {
    /// Interpolation when the text has `{{ }}` spans, otherwise an expression.
    /// Text that reads both ways is rejected.
    pub fn compile(source: &str) -> Result<Self, ExprError> {
        if is_template(source) {
            if is_arrow(source) {
                return Err(ExprError::Ambiguous {
                    expression: source.to_string(),
                });
            }
            return Ok(Binding::Template(compile_interpolation(source)?));
        }
        Ok(Binding::Expression(compile_expression(source)?))
    }

    pub fn evaluate(&self, data: &Value, scope: &Scope) -> Value {
        match self {
            Binding::Template(t) => Value::from(t.render(data, scope)),
            Binding::Expression(e) => e.evaluate(data, scope),
        }
    }
}

/// How a dynamic value is turned into attribute text.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Plain,
    /// Union with the element's static class tokens.
    Class(Vec<String>),
    Style,
}

#[derive(Debug, Clone)]
pub enum AttrSlot {
    Static(String, String),
    Dynamic {
        name: String,
        binding: Binding,
        shape: Shape,
    },
}

impl AttrSlot {
    fn name(&self) -> &str {
        match self {
            AttrSlot::Static(name, _) => name,
            AttrSlot::Dynamic { name, .. } => name,
        }
    }

    /// Rendered `(name, value)`, or `None` when the attribute is omitted.
    pub fn render(&self, data: &Value, scope: &Scope) -> Option<(String, String)> {
        match self {
            AttrSlot::Static(name, value) => Some((name.clone(), value.clone())),
            AttrSlot::Dynamic { name, binding, shape } => {
                let value = binding.evaluate(data, scope);
                let text = match shape {
                    Shape::Plain => (!value.is_nullish()).then(|| value.to_display()),
                    Shape::Class(statics) => format_class(statics, &value),
                    Shape::Style => format_style(&value),
                }?;
                Some((name.clone(), text))
            }
        }
    }
}

/// An event subscription declared by `t-on<type>`.
#[derive(Debug, Clone)]
pub struct EventBinding {
    pub event: String,
    pub handler: Expression,
}

impl EventBinding {
    /// A listener that calls the handler with `(data, event)`, bound to this
    /// render's data and scope.
    pub fn bind(&self, data: &Value, scope: &Scope) -> Listener {
        let handler = self.handler.clone();
        let data = data.clone();
        let scope = scope.clone();
        Listener::new(self.event.as_str(), move |event: &Value| {
            handler.invoke(&[data.clone(), event.clone()], &scope);
        })
    }
}

/// One element's attributes, partitioned.
#[derive(Debug, Clone, Default)]
pub struct AttributeMap {
    /// Rendered attributes in source order.
    pub slots: Vec<AttrSlot>,
    pub events: Vec<EventBinding>,
    /// Directive values keyed by directive, in source order.
    pub directives: Vec<(Directive, String)>,
}

impl AttributeMap {
    pub fn build(tag: &str, attrs: &[TemplateAttr], options: &CompileOptions) -> Result<Self, CompileError> {
        let mut map = AttributeMap::default();
        let preserve = options.preserve_directives;
        for attr in attrs {
            let raw_name = attr.name.to_string();
            let kind = classify(&attr.name, options);
            if preserve && kind != AttrKind::Static {
                map.push_static(raw_name.clone(), attr.value.clone());
            }
            match kind {
                AttrKind::Static => {
                    if preserve && raw_name == "style" && attr.value.trim() == HIDE_STYLE {
                        continue;
                    }
                    map.push_static(raw_name, attr.value.clone());
                }
                AttrKind::Directive(directive) => map.directives.push((directive, attr.value.clone())),
                AttrKind::Event(event) => {
                    let handler = compile_expression(&attr.value).map_err(|error| CompileError::Expression {
                        tag: tag.to_string(),
                        attribute: raw_name.clone(),
                        error,
                    })?;
                    map.events.push(EventBinding { event, handler });
                }
                AttrKind::Dynamic(name) => {
                    let binding = Binding::compile(&attr.value).map_err(|error| CompileError::Expression {
                        tag: tag.to_string(),
                        attribute: raw_name.clone(),
                        error,
                    })?;
                    map.push_dynamic(name, binding);
                }
            }
        }
        Ok(map)
    }

    fn push_static(&mut self, name: String, value: String) {
        match self.slots.iter_mut().find(|s| s.name() == name) {
            Some(AttrSlot::Dynamic {
                shape: Shape::Class(statics),
                ..
            }) => statics.extend(class_tokens(&value)),
            // a dynamic binding of the same name wins
            Some(AttrSlot::Dynamic { .. }) => {}
            Some(slot) => *slot = AttrSlot::Static(name, value),
            None => self.slots.push(AttrSlot::Static(name, value)),
        }
    }

    fn push_dynamic(&mut self, name: String, binding: Binding) {
        let existing = self.slots.iter().position(|s| s.name() == name);
        let shape = match name.as_str() {
            "class" => Shape::Class(match existing.map(|i| &self.slots[i]) {
                Some(AttrSlot::Static(_, value)) => class_tokens(value),
                _ => Vec::new(),
            }),
            "style" => Shape::Style,
            _ => Shape::Plain,
        };
        let slot = AttrSlot::Dynamic { name, binding, shape };
        match existing {
            Some(i) => self.slots[i] = slot,
            None => self.slots.push(slot),
        }
    }

    pub fn directive(&self, directive: Directive) -> Option<&str> {
        self.directives
            .iter()
            .find(|(d, _)| *d == directive)
            .map(|(_, v)| v.as_str())
    }

    pub fn has(&self, directive: Directive) -> bool {
        self.directive(directive).is_some()
    }
}

fn class_tokens(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

/// Static tokens plus the dynamic value: a string of names, an array of
/// names, or an object of name to flag (a falsy flag also removes a static
/// token). `None` when nothing is left.
pub fn format_class(statics: &[String], value: &Value) -> Option<String> {
    let mut classes: Vec<String> = Vec::new();
    let mut add = |name: String, on: bool| {
        classes.retain(|c| *c != name);
        if on {
            classes.push(name);
        }
    };
    for s in statics {
        add(s.clone(), true);
    }
    match value {
        Value::Array(items) => {
            for item in items.iter().filter(|v| !v.is_nullish()) {
                for token in class_tokens(&item.to_display()) {
                    add(token, true);
                }
            }
        }
        Value::Object(flags) => {
            for (name, flag) in flags.iter() {
                add(name.clone(), flag.is_truthy());
            }
        }
        v if v.is_truthy() => {
            for token in class_tokens(&v.to_display()) {
                add(token, true);
            }
        }
        _ => {}
    }
    (!classes.is_empty()).then(|| classes.join(" "))
}

/// An object becomes `prop-name: value;` pairs joined by a space (camelCase
/// names are hyphenated, nullish values skipped); an array is joined with
/// `; `; anything else is used as is.
pub fn format_style(value: &Value) -> Option<String> {
    match value {
        v if v.is_nullish() => None,
        Value::Object(props) => Some(
            props
                .iter()
                .filter(|(_, v)| !v.is_nullish())
                .map(|(k, v)| format!("{}: {};", hyphenate(k), v.to_display()))
                .collect::<Vec<_>>()
                .join(" "),
        ),
        Value::Array(items) => Some(items.iter().map(Value::to_text).collect::<Vec<_>>().join("; ")),
        v => Some(v.to_display()),
    }
}

fn hyphenate(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
