//! Data model shared by the template engine: a dynamic [`Value`] with
//! script-like coercions, and the [`Scope`] chain names resolve against.

pub mod scope;
pub mod value;

pub use scope::Scope;
pub use value::{Function, Object, Value};
