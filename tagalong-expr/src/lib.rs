//! The micro expression language used by directive attributes and `{{ }}`
//! spans.
//!
//! Expression strings are compiled once into an [`Expression`] and evaluated
//! any number of times against a data value and a [`Scope`]. Source forms, in
//! the order they are recognized:
//!
//! 1. a parameterized (arrow) form, `x => x.name` / `(d, i) => { d[i] }`;
//! 2. `.`, the data value itself;
//! 3. `.path.to.value`, a path rooted at the data value;
//! 4. any other expression, whose free names resolve against the data value
//!    first and the scope second.
//!
//! Evaluation never fails: a miss anywhere inside an expression turns the
//! whole result into `undefined`.

use std::fmt;
use std::rc::Rc;

use tagalong_core::{Scope, Value};
use thiserror::Error;

pub mod ast;
mod eval;
pub mod interpolate;
mod parser;

pub use interpolate::{Interpolation, compile_interpolation, is_template};

use ast::{Expr, Lambda};
use eval::Env;

#[derive(Debug, Error)]
pub enum ExprError {
    #[error("invalid arrow expression \"{expression}\": {message}")]
    Syntax { expression: String, message: String },

    #[error("\"{expression}\" reads both as an interpolation template and as an arrow expression")]
    Ambiguous { expression: String },
}

#[derive(Clone)]
enum Compiled {
    Constant(Value),
    Identity,
    General(Rc<Expr>),
    Arrow(Rc<Lambda>),
}

/// A compiled, immutable projection over `(data, scope)`.
#[derive(Clone)]
pub struct Expression {
    source: Rc<str>,
    compiled: Compiled,
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expression").field(&self.source).finish()
    }
}

impl Expression {
    /// An expression that always yields `value`.
    pub fn constant(value: Value) -> Self {
        Self {
            source: Rc::from(""),
            compiled: Compiled::Constant(value),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_arrow(&self) -> bool {
        matches!(self.compiled, Compiled::Arrow(_))
    }

    /// Evaluate against `data`. Arrow forms are applied with `data` as their
    /// first argument.
    pub fn evaluate(&self, data: &Value, scope: &Scope) -> Value {
        match &self.compiled {
            Compiled::Constant(v) => v.clone(),
            Compiled::Identity => data.clone(),
            Compiled::General(expr) => {
                let env = Env {
                    data: Some(data),
                    locals: &[],
                    scope,
                };
                settle(&self.source, eval::eval(expr, &env))
            }
            Compiled::Arrow(_) => self.invoke(std::slice::from_ref(data), scope),
        }
    }

    /// Call the expression with positional arguments.
    ///
    /// Arrow forms bind `args` to their parameters. Any other form is
    /// evaluated against `args[0]`; if that yields a function, the function is
    /// called with `args`.
    pub fn invoke(&self, args: &[Value], scope: &Scope) -> Value {
        if let Compiled::Arrow(lambda) = &self.compiled {
            let env = Env {
                data: None,
                locals: &[],
                scope,
            };
            return settle(&self.source, eval::apply(lambda, args, &env));
        }
        let data = args.first().cloned().unwrap_or_default();
        match self.evaluate(&data, scope) {
            Value::Function(f) => f.call(args),
            other => other,
        }
    }
}

fn settle(source: &str, result: Result<Value, eval::EvalError>) -> Value {
    result.unwrap_or_else(|err| {
        tracing::trace!(expression = source, %err, "evaluated to undefined");
        Value::Undefined
    })
}

/// Compile an expression string.
///
/// Only a malformed arrow form is an error. Any other unparsable input is
/// logged and compiles to a constant `undefined`.
pub fn compile_expression(source: &str) -> Result<Expression, ExprError> {
    let trimmed = source.trim();
    let compiled = if trimmed.is_empty() {
        Compiled::Constant(Value::Undefined)
    } else if parser::looks_like_arrow(trimmed) {
        let lambda = parser::parse_arrow(trimmed).map_err(|e| ExprError::Syntax {
            expression: source.to_string(),
            message: e.to_string(),
        })?;
        Compiled::Arrow(lambda)
    } else if trimmed == "." {
        Compiled::Identity
    } else {
        match parser::parse_expression(trimmed) {
            Ok(expr) => Compiled::General(Rc::new(expr)),
            Err(err) => {
                tracing::warn!(expression = source, %err, "unparsable expression compiles to undefined");
                Compiled::Constant(Value::Undefined)
            }
        }
    };
    Ok(Expression {
        source: Rc::from(source),
        compiled,
    })
}

/// Does `source` parse as a complete arrow form?
pub fn is_arrow(source: &str) -> bool {
    let trimmed = source.trim();
    parser::looks_like_arrow(trimmed) && parser::parse_arrow(trimmed).is_ok()
}

/// Compile and evaluate in one step. Compile errors evaluate to `undefined`.
pub fn evaluate(source: &str, data: &Value, scope: &Scope) -> Value {
    compile_expression(source)
        .map(|e| e.evaluate(data, scope))
        .unwrap_or_default()
}
