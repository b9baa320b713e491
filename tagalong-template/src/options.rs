use serde::Deserialize;

/// Inline style that hides a placeholder instance.
pub const HIDE_STYLE: &str = "display: none !important;";

/// Knobs for the template compiler.
///
/// Readable from JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Attribute prefix marking directives and dynamic attributes.
    pub prefix: String,
    /// Prefix (after `prefix`) marking event subscriptions, e.g. `t-onclick`.
    pub event_prefix: String,
    /// Name the current iteration index is bound to.
    pub index_symbol: String,
    /// Rendered attribute whose value keys an element for reuse.
    pub key_attribute: String,
    /// Re-emit directive and dynamic attributes so the output can be
    /// compiled again.
    pub preserve_directives: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            prefix: "t-".to_string(),
            event_prefix: "on".to_string(),
            index_symbol: "$i".to_string(),
            key_attribute: "key".to_string(),
            preserve_directives: false,
        }
    }
}

impl CompileOptions {
    pub fn preserving(mut self, preserve: bool) -> Self {
        self.preserve_directives = preserve;
        self
    }

    /// Full attribute name of a directive, e.g. `t-each`.
    pub fn directive_name(&self, directive: &str) -> String {
        format!("{}{directive}", self.prefix)
    }
}
