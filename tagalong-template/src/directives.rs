use tagalong_expr::{Expression, compile_expression};

use crate::CompileError;
use crate::attrs::{AttributeMap, Directive};

/// How an element repeats.
#[derive(Debug, Clone)]
pub enum Repeat {
    Once,
    /// The element itself, once per item.
    Each(Expression),
    /// The element's children, once per item.
    ForEach(Expression),
    /// Once, with the data narrowed.
    With(Expression),
}

impl Repeat {
    pub fn kind(&self) -> &'static str {
        match self {
            Repeat::Once => "once",
            Repeat::Each(_) => "each",
            Repeat::ForEach(_) => "foreach",
            Repeat::With(_) => "with",
        }
    }
}

/// Control directives of one element, validated.
#[derive(Debug, Clone)]
pub struct Directives {
    pub condition: Option<Expression>,
    pub is_else: bool,
    pub repeat: Repeat,
    pub alias: Option<String>,
    pub text: Option<Expression>,
}

impl Directives {
    /// `None` when the element carries the skip directive.
    pub fn parse(tag: &str, map: &AttributeMap) -> Result<Option<Self>, CompileError> {
        if map.has(Directive::Skip) {
            return Ok(None);
        }
        let compile = |directive: Directive| -> Result<Option<Expression>, CompileError> {
            map.directive(directive)
                .map(|src| {
                    compile_expression(src).map_err(|error| CompileError::Expression {
                        tag: tag.to_string(),
                        attribute: directive.name().to_string(),
                        error,
                    })
                })
                .transpose()
        };

        if map.has(Directive::If) && map.has(Directive::Else) {
            return Err(conflict(tag, Directive::If, Directive::Else));
        }
        let repeats: Vec<Directive> = [Directive::Each, Directive::ForEach, Directive::With]
            .into_iter()
            .filter(|&d| map.has(d))
            .collect();
        if let &[first, second, ..] = repeats.as_slice() {
            return Err(conflict(tag, first, second));
        }

        let repeat = match repeats.first() {
            Some(Directive::Each) => compile(Directive::Each)?.map(Repeat::Each),
            Some(Directive::ForEach) => compile(Directive::ForEach)?.map(Repeat::ForEach),
            Some(Directive::With) => compile(Directive::With)?.map(Repeat::With),
            _ => None,
        }
        .unwrap_or(Repeat::Once);

        let alias = match map.directive(Directive::As).map(str::trim) {
            None => None,
            Some(name) if is_identifier(name) => Some(name.to_string()),
            Some(name) => {
                return Err(CompileError::InvalidAlias {
                    tag: tag.to_string(),
                    alias: name.to_string(),
                });
            }
        };

        Ok(Some(Self {
            condition: compile(Directive::If)?,
            is_else: map.has(Directive::Else),
            repeat,
            alias,
            text: compile(Directive::Text)?,
        }))
    }
}

fn conflict(tag: &str, first: Directive, second: Directive) -> CompileError {
    CompileError::ConflictingDirectives {
        tag: tag.to_string(),
        first: first.name(),
        second: second.name(),
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
