//! Compiles marked-up nodes into reusable render functions.
//!
//! Attributes with the directive prefix (`t-` by default) control rendering:
//!
//! | attribute | effect |
//! |---|---|
//! | `t-if="expr"` | render only when `expr` is truthy |
//! | `t-else` | render only when the preceding sibling's `t-if` is falsy |
//! | `t-each="expr"` | repeat the element once per item |
//! | `t-foreach="expr"` | repeat the element's children once per item |
//! | `t-with="expr"` | narrow the data for the subtree |
//! | `t-as="name"` | also bind the item (or data) to `name` |
//! | `t-text="expr"` | replace the children with text |
//! | `t-skip` | never render the subtree |
//! | `t-on<type>="expr"` | subscribe to `<type>` events |
//! | `t-<attr>="expr"` | bind `<attr>` to an expression or `{{ }}` template |

use tagalong_expr::ExprError;
use thiserror::Error;

pub mod attrs;
mod compile;
pub mod directives;
pub mod options;
pub mod template_ast;

pub use compile::{Template, iterate};
pub use options::{CompileOptions, HIDE_STYLE};
pub use template_ast::{TemplateAttr, TemplateElement, TemplateNode};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("<{tag}> cannot combine {first} with {second}")]
    ConflictingDirectives {
        tag: String,
        first: &'static str,
        second: &'static str,
    },

    #[error("<{tag}> has else but no preceding sibling with if")]
    ElseWithoutIf { tag: String },

    #[error("<{tag}> has an invalid alias \"{alias}\"")]
    InvalidAlias { tag: String, alias: String },

    #[error("<{tag}> {attribute}: {error}")]
    Expression {
        tag: String,
        attribute: String,
        #[source]
        error: ExprError,
    },
}
