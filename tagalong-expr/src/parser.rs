use std::rc::Rc;
use std::sync::LazyLock;

use pest::Parser;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use tagalong_core::Value;

use crate::ast::{BinaryOp, Expr, Lambda, UnaryOp};

#[derive(pest_derive::Parser)]
#[grammar = "expr.pest"]
struct ExprParser;

pub(crate) type ParseError = Box<pest::error::Error<Rule>>;

static PRATT: LazyLock<PrattParser<Rule>> = LazyLock::new(|| {
    PrattParser::new()
        .op(Op::infix(Rule::nullish, Assoc::Left))
        .op(Op::infix(Rule::or, Assoc::Left))
        .op(Op::infix(Rule::and, Assoc::Left))
        .op(Op::infix(Rule::strict_eq, Assoc::Left)
            | Op::infix(Rule::strict_ne, Assoc::Left)
            | Op::infix(Rule::eq, Assoc::Left)
            | Op::infix(Rule::ne, Assoc::Left))
        .op(Op::infix(Rule::lt, Assoc::Left)
            | Op::infix(Rule::le, Assoc::Left)
            | Op::infix(Rule::gt, Assoc::Left)
            | Op::infix(Rule::ge, Assoc::Left))
        .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::sub, Assoc::Left))
        .op(Op::infix(Rule::mul, Assoc::Left)
            | Op::infix(Rule::div, Assoc::Left)
            | Op::infix(Rule::rem, Assoc::Left))
        .op(Op::prefix(Rule::not) | Op::prefix(Rule::neg) | Op::prefix(Rule::pos))
        .op(Op::postfix(Rule::member) | Op::postfix(Rule::index) | Op::postfix(Rule::call))
});

/// Parse a general expression.
pub(crate) fn parse_expression(src: &str) -> Result<Expr, ParseError> {
    let mut pairs = ExprParser::parse(Rule::expression, src).map_err(Box::new)?;
    let top = pairs.next().and_then(|p| p.into_inner().next());
    Ok(top.map(build_expr).unwrap_or(Expr::Literal(Value::Undefined)))
}

/// Does `src` open with a parameter list followed by `=>`?
pub(crate) fn looks_like_arrow(src: &str) -> bool {
    ExprParser::parse(Rule::arrow_head, src).is_ok()
}

/// Parse a whole-string parameterized form.
pub(crate) fn parse_arrow(src: &str) -> Result<Rc<Lambda>, ParseError> {
    let mut pairs = ExprParser::parse(Rule::arrow_form, src).map_err(Box::new)?;
    let arrow = pairs
        .next()
        .and_then(|p| p.into_inner().next())
        .map(build_arrow);
    Ok(arrow.unwrap_or_else(|| {
        Rc::new(Lambda {
            params: Vec::new(),
            body: Expr::Literal(Value::Undefined),
        })
    }))
}

fn build_expr(pair: Pair<Rule>) -> Expr {
    match pair.as_rule() {
        Rule::expr => pair
            .into_inner()
            .next()
            .map(build_expr)
            .unwrap_or(Expr::Literal(Value::Undefined)),
        Rule::arrow => Expr::Lambda(build_arrow(pair)),
        Rule::ternary => {
            let mut inner = pair.into_inner();
            let test = inner.next().map(build_expr).unwrap_or(Expr::Literal(Value::Undefined));
            match (inner.next(), inner.next()) {
                (Some(then), Some(otherwise)) => Expr::Conditional(
                    Box::new(test),
                    Box::new(build_expr(then)),
                    Box::new(build_expr(otherwise)),
                ),
                _ => test,
            }
        }
        Rule::chain => build_chain(pair),
        _ => build_primary(pair),
    }
}

fn build_chain(pair: Pair<Rule>) -> Expr {
    PRATT
        .map_primary(build_primary)
        .map_prefix(|op, rhs| {
            let op = match op.as_rule() {
                Rule::not => UnaryOp::Not,
                Rule::neg => UnaryOp::Neg,
                Rule::pos => UnaryOp::Pos,
                rule => unreachable!("unexpected prefix rule {rule:?}"),
            };
            Expr::Unary(op, Box::new(rhs))
        })
        .map_postfix(|lhs, op| match op.as_rule() {
            Rule::member => {
                let name = op.into_inner().next().map(|p| p.as_str().to_string()).unwrap_or_default();
                Expr::Member(Box::new(lhs), name)
            }
            Rule::index => {
                let key = op.into_inner().next().map(build_expr).unwrap_or(Expr::Literal(Value::Undefined));
                Expr::Index(Box::new(lhs), Box::new(key))
            }
            Rule::call => Expr::Call(Box::new(lhs), op.into_inner().map(build_expr).collect()),
            rule => unreachable!("unexpected postfix rule {rule:?}"),
        })
        .map_infix(|lhs, op, rhs| {
            let op = match op.as_rule() {
                Rule::nullish => BinaryOp::Nullish,
                Rule::or => BinaryOp::Or,
                Rule::and => BinaryOp::And,
                Rule::strict_eq => BinaryOp::StrictEq,
                Rule::strict_ne => BinaryOp::StrictNe,
                Rule::eq => BinaryOp::Eq,
                Rule::ne => BinaryOp::Ne,
                Rule::lt => BinaryOp::Lt,
                Rule::le => BinaryOp::Le,
                Rule::gt => BinaryOp::Gt,
                Rule::ge => BinaryOp::Ge,
                Rule::add => BinaryOp::Add,
                Rule::sub => BinaryOp::Sub,
                Rule::mul => BinaryOp::Mul,
                Rule::div => BinaryOp::Div,
                Rule::rem => BinaryOp::Rem,
                rule => unreachable!("unexpected infix rule {rule:?}"),
            };
            Expr::Binary(op, Box::new(lhs), Box::new(rhs))
        })
        .parse(pair.into_inner())
}

fn build_primary(pair: Pair<Rule>) -> Expr {
    match pair.as_rule() {
        Rule::number => Expr::Literal(Value::Number(pair.as_str().parse().unwrap_or(f64::NAN))),
        Rule::string => {
            let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or_default();
            Expr::Literal(Value::from(unescape(raw)))
        }
        Rule::true_lit => Expr::Literal(Value::Bool(true)),
        Rule::false_lit => Expr::Literal(Value::Bool(false)),
        Rule::null_lit => Expr::Literal(Value::Null),
        Rule::undefined_lit => Expr::Literal(Value::Undefined),
        Rule::root => Expr::Data,
        Rule::ident => Expr::Ident(pair.as_str().to_string()),
        Rule::array => Expr::Array(pair.into_inner().map(build_expr).collect()),
        Rule::object => Expr::Object(
            pair.into_inner()
                .filter_map(|entry| {
                    let mut inner = entry.into_inner();
                    let key = inner.next()?;
                    let key = match key.as_rule() {
                        Rule::string => unescape(key.into_inner().next().map(|p| p.as_str()).unwrap_or_default()),
                        _ => key.as_str().to_string(),
                    };
                    Some((key, build_expr(inner.next()?)))
                })
                .collect(),
        ),
        Rule::expr | Rule::ternary | Rule::chain | Rule::arrow => build_expr(pair),
        rule => unreachable!("unexpected primary rule {rule:?}"),
    }
}

fn build_arrow(pair: Pair<Rule>) -> Rc<Lambda> {
    let mut params = Vec::new();
    let mut body = Expr::Literal(Value::Undefined);
    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::params => params = part.into_inner().map(|p| p.as_str().to_string()).collect(),
            Rule::block => {
                if let Some(e) = part.into_inner().find(|p| p.as_rule() == Rule::expr) {
                    body = build_expr(e);
                }
            }
            _ => body = build_expr(part),
        }
    }
    Rc::new(Lambda { params, body })
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Expr {
        parse_expression(src).unwrap_or_else(|e| panic!("{src}: {e}"))
    }

    #[test]
    fn precedence_and_postfix() {
        assert_eq!(
            parse("a + b * c"),
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Ident("a".into())),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Ident("b".into())),
                    Box::new(Expr::Ident("c".into()))
                ))
            )
        );
        assert_eq!(
            parse("-a.b"),
            Expr::Unary(
                UnaryOp::Neg,
                Box::new(Expr::Member(Box::new(Expr::Ident("a".into())), "b".into()))
            )
        );
    }

    #[test]
    fn leading_dot_is_rooted_at_data() {
        assert_eq!(
            parse(".foo.bar"),
            Expr::Member(
                Box::new(Expr::Member(Box::new(Expr::Data), "foo".into())),
                "bar".into()
            )
        );
    }

    #[test]
    fn literals() {
        assert_eq!(parse("'it\\'s'"), Expr::Literal(Value::from("it's")));
        assert_eq!(parse(".5"), Expr::Literal(Value::from(0.5)));
        assert_eq!(parse("null"), Expr::Literal(Value::Null));
        assert!(matches!(parse("nullable"), Expr::Ident(ref n) if n == "nullable"));
        assert!(matches!(parse("{a: 1, 'b c': 2}"), Expr::Object(ref pairs) if pairs.len() == 2));
        assert!(matches!(parse("[1, 2,]"), Expr::Array(ref items) if items.len() == 2));
    }

    #[test]
    fn arrow_heads() {
        for src in ["x => x", "(x) => x", "(a, b) => a", "() => 1", " ( d , e )=>{ d }"] {
            assert!(looks_like_arrow(src), "{src}");
        }
        for src in ["x", "(x)", "x >= 1", "f(x => x)"] {
            assert!(!looks_like_arrow(src), "{src}");
        }
    }

    #[test]
    fn arrow_bodies() {
        let lambda = parse_arrow("(x) => { return x[0]; }").unwrap();
        assert_eq!(lambda.params, ["x"]);
        assert!(matches!(lambda.body, Expr::Index(..)));

        let empty = parse_arrow("() => { }").unwrap();
        assert_eq!(empty.body, Expr::Literal(Value::Undefined));

        assert!(parse_arrow("x => +").is_err());
    }
}
