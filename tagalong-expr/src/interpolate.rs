use tagalong_core::{Scope, Value};

use crate::{Expression, ExprError, compile_expression};

#[derive(Debug, Clone)]
enum Part {
    Literal(String),
    Span(Expression),
}

/// Text with `{{ expr }}` spans, compiled once.
#[derive(Debug, Clone)]
pub struct Interpolation {
    parts: Vec<Part>,
}

impl Interpolation {
    /// True when the text had no spans at all.
    pub fn is_constant(&self) -> bool {
        self.parts.iter().all(|p| matches!(p, Part::Literal(_)))
    }

    pub fn render(&self, data: &Value, scope: &Scope) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Span(expr) => out.push_str(&expr.evaluate(data, scope).to_text()),
            }
        }
        out
    }
}

/// Byte ranges of each `{{ ... }}` span and of its inner expression.
///
/// A span opens at `{{`, takes one or more characters other than `}`, and
/// must close with `}}` right there; otherwise scanning resumes one byte
/// after the failed opener.
fn spans(text: &str) -> Vec<(usize, usize, usize, usize)> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            let inner_start = i + 2;
            let close = bytes[inner_start..]
                .iter()
                .position(|&b| b == b'}')
                .map(|off| inner_start + off);
            if let Some(j) = close {
                if j > inner_start && bytes.get(j + 1) == Some(&b'}') {
                    found.push((i, inner_start, j, j + 2));
                    i = j + 2;
                    continue;
                }
            }
        }
        i += 1;
    }
    found
}

/// Does `text` contain at least one `{{ expr }}` span?
pub fn is_template(text: &str) -> bool {
    !spans(text).is_empty()
}

/// Compile text into an [`Interpolation`]. Each span goes through
/// [`compile_expression`]; literal runs pass through unchanged.
pub fn compile_interpolation(text: &str) -> Result<Interpolation, ExprError> {
    let mut parts = Vec::new();
    let mut last = 0;
    for (open, inner_start, inner_end, close) in spans(text) {
        if open > last {
            parts.push(Part::Literal(text[last..open].to_string()));
        }
        parts.push(Part::Span(compile_expression(&text[inner_start..inner_end])?));
        last = close;
    }
    if last < text.len() || parts.is_empty() {
        parts.push(Part::Literal(text[last..].to_string()));
    }
    Ok(Interpolation { parts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_templates() {
        for s in ["{{x}}", "{{ x }}", "y {{ x }}", "y {{ x }} z"] {
            assert!(is_template(s), "{s}");
        }
        for s in ["", "foo", "foo{}", "{}", "{{", "{{}", "{}}", "}}", "{{}}"] {
            assert!(!is_template(s), "{s}");
        }
    }

    #[test]
    fn nested_braces_pass_through() {
        let t = compile_interpolation("a {{ {b} }} c").unwrap();
        assert!(t.is_constant());
        assert_eq!(t.render(&Value::Null, &Scope::default()), "a {{ {b} }} c");
    }

    #[test]
    fn literal_fragments_are_kept() {
        let data = Value::object([("x", Value::from(100))]);
        let t = compile_interpolation("x = {{ x }}!").unwrap();
        assert_eq!(t.render(&data, &Scope::default()), "x = 100!");
    }
}
