use std::cmp::Ordering;
use std::rc::Rc;

use tagalong_core::{Function, Scope, Value};
use thiserror::Error;

use crate::ast::{BinaryOp, Expr, Lambda, UnaryOp};

/// Why an evaluation produced no value. Never escapes the crate: callers
/// see `undefined` instead.
#[derive(Debug, Error)]
pub(crate) enum EvalError {
    #[error("cannot read property \"{name}\" of {target}")]
    NullishAccess { name: String, target: &'static str },

    #[error("{callee} is not a function")]
    NotCallable { callee: String },
}

type EvalResult = Result<Value, EvalError>;

type Locals = Vec<(Rc<str>, Value)>;

/// Lookup layers for one evaluation: lambda locals, then the data value (if
/// any), then the scope's frames and context.
pub(crate) struct Env<'a> {
    pub data: Option<&'a Value>,
    pub locals: &'a [(Rc<str>, Value)],
    pub scope: &'a Scope,
}

impl Env<'_> {
    fn resolve(&self, name: &str) -> Value {
        if let Some((_, v)) = self.locals.iter().rev().find(|(n, _)| &**n == name) {
            return v.clone();
        }
        match self.data {
            Some(data) => self.scope.resolve(data, name),
            None => self.scope.lookup(name).unwrap_or_default(),
        }
    }
}

pub(crate) fn eval(expr: &Expr, env: &Env<'_>) -> EvalResult {
    match expr {
        Expr::Data => Ok(env.data.cloned().unwrap_or_default()),
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Ident(name) => Ok(env.resolve(name)),
        Expr::Array(items) => {
            let values = items.iter().map(|e| eval(e, env)).collect::<Result<Vec<_>, _>>()?;
            Ok(Value::from(values))
        }
        Expr::Object(entries) => {
            let mut map = tagalong_core::Object::with_capacity(entries.len());
            for (k, e) in entries {
                map.insert(k.clone(), eval(e, env)?);
            }
            Ok(Value::from(map))
        }
        Expr::Member(target, name) => {
            let target = eval(target, env)?;
            property(&target, name)
        }
        Expr::Index(target, key) => {
            let target = eval(target, env)?;
            let key = eval(key, env)?.to_display();
            property(&target, &key)
        }
        Expr::Call(callee, args) => call(callee, args, env),
        Expr::Unary(op, operand) => {
            let v = eval(operand, env)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!v.is_truthy()),
                UnaryOp::Neg => Value::Number(-v.to_number()),
                UnaryOp::Pos => Value::Number(v.to_number()),
            })
        }
        Expr::Binary(op, lhs, rhs) => binary(*op, lhs, rhs, env),
        Expr::Conditional(test, then, otherwise) => {
            if eval(test, env)?.is_truthy() {
                eval(then, env)
            } else {
                eval(otherwise, env)
            }
        }
        Expr::Lambda(lambda) => Ok(Value::Function(closure(lambda.clone(), env))),
    }
}

/// Call `lambda` with positional `args`. Missing arguments are `undefined`.
pub(crate) fn apply(lambda: &Lambda, args: &[Value], env: &Env<'_>) -> EvalResult {
    let mut locals: Locals = env.locals.to_vec();
    for (i, param) in lambda.params.iter().enumerate() {
        locals.push((Rc::from(param.as_str()), args.get(i).cloned().unwrap_or_default()));
    }
    let inner = Env {
        data: env.data,
        locals: &locals,
        scope: env.scope,
    };
    eval(&lambda.body, &inner)
}

/// Capture the current environment so the lambda can run after this
/// evaluation returns.
fn closure(lambda: Rc<Lambda>, env: &Env<'_>) -> Function {
    let data = env.data.cloned();
    let locals: Locals = env.locals.to_vec();
    let scope = env.scope.clone();
    Function::new(move |args| {
        let env = Env {
            data: data.as_ref(),
            locals: &locals,
            scope: &scope,
        };
        apply(&lambda, args, &env).unwrap_or_else(|err| {
            tracing::trace!(%err, "lambda evaluated to undefined");
            Value::Undefined
        })
    })
}

fn property(target: &Value, name: &str) -> EvalResult {
    if target.is_nullish() {
        return Err(EvalError::NullishAccess {
            name: name.to_string(),
            target: target.type_name(),
        });
    }
    Ok(target.get(name).unwrap_or_default())
}

fn call(callee: &Expr, args: &[Expr], env: &Env<'_>) -> EvalResult {
    let args = args.iter().map(|a| eval(a, env)).collect::<Result<Vec<_>, _>>()?;
    let (target, func) = match callee {
        Expr::Member(target, name) => {
            let target = eval(target, env)?;
            if let Some(result) = builtin_method(&target, name, &args) {
                return Ok(result);
            }
            let func = property(&target, name)?;
            (name.clone(), func)
        }
        other => (describe(other), eval(other, env)?),
    };
    match func {
        Value::Function(f) => Ok(f.call(&args)),
        _ => Err(EvalError::NotCallable { callee: target }),
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member(_, name) => name.clone(),
        _ => "expression".to_string(),
    }
}

/// The few string and array methods templates commonly reach for.
fn builtin_method(target: &Value, name: &str, args: &[Value]) -> Option<Value> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    match target {
        Value::String(s) => match name {
            "toUpperCase" => Some(Value::from(s.to_uppercase())),
            "toLowerCase" => Some(Value::from(s.to_lowercase())),
            "trim" => Some(Value::from(s.trim())),
            "includes" => Some(Value::Bool(s.contains(arg(0).to_display().as_str()))),
            "indexOf" => {
                let needle = arg(0).to_display();
                Some(Value::Number(
                    s.find(needle.as_str())
                        .map_or(-1.0, |byte| s[..byte].chars().count() as f64),
                ))
            }
            _ => None,
        },
        Value::Array(items) => match name {
            "join" => {
                let sep = match arg(0) {
                    Value::Undefined => ",".to_string(),
                    other => other.to_display(),
                };
                Some(Value::from(
                    items.iter().map(Value::to_text).collect::<Vec<_>>().join(&sep),
                ))
            }
            "includes" => Some(Value::Bool(items.iter().any(|v| v.strict_eq(&arg(0))))),
            "indexOf" => Some(Value::Number(
                items
                    .iter()
                    .position(|v| v.strict_eq(&arg(0)))
                    .map_or(-1.0, |i| i as f64),
            )),
            _ => None,
        },
        _ => None,
    }
}

fn binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, env: &Env<'_>) -> EvalResult {
    let left = eval(lhs, env)?;
    match op {
        BinaryOp::And => return if left.is_truthy() { eval(rhs, env) } else { Ok(left) },
        BinaryOp::Or => return if left.is_truthy() { Ok(left) } else { eval(rhs, env) },
        BinaryOp::Nullish => return if left.is_nullish() { eval(rhs, env) } else { Ok(left) },
        _ => {}
    }
    let right = eval(rhs, env)?;
    Ok(match op {
        BinaryOp::StrictEq => Value::Bool(left.strict_eq(&right)),
        BinaryOp::StrictNe => Value::Bool(!left.strict_eq(&right)),
        BinaryOp::Eq => Value::Bool(left.loose_eq(&right)),
        BinaryOp::Ne => Value::Bool(!left.loose_eq(&right)),
        BinaryOp::Lt => Value::Bool(compare(&left, &right) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(compare(&left, &right), Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Gt => Value::Bool(compare(&left, &right) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(compare(&left, &right), Some(Ordering::Greater | Ordering::Equal))),
        BinaryOp::Add => add(&left, &right),
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Nullish => unreachable!("short-circuit handled above"),
    })
}

fn add(left: &Value, right: &Value) -> Value {
    let textual = |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_));
    if textual(left) || textual(right) {
        Value::from(format!("{}{}", left.to_display(), right.to_display()))
    } else {
        Value::Number(left.to_number() + right.to_number())
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => left.to_number().partial_cmp(&right.to_number()),
    }
}
