//! Namespace prefixes understood in qualified element and attribute names.

use std::fmt;

pub const SVG: &str = "http://www.w3.org/2000/svg";
pub const MATHML: &str = "http://www.w3.org/1998/Math/MathML";
pub const XLINK: &str = "http://www.w3.org/1999/xlink";
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";

const PREFIXES: [(&str, &str); 5] = [
    ("svg", SVG),
    ("math", MATHML),
    ("xlink", XLINK),
    ("xml", XML),
    ("xmlns", XMLNS),
];

pub fn uri_for_prefix(prefix: &str) -> Option<&'static str> {
    PREFIXES.iter().find(|(p, _)| *p == prefix).map(|(_, uri)| *uri)
}

pub fn prefix_for_uri(uri: &str) -> Option<&'static str> {
    PREFIXES.iter().find(|(_, u)| *u == uri).map(|(p, _)| *p)
}

/// A name split on its first `:`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QualName {
    pub fn parse(name: &str) -> Self {
        match name.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() => Self {
                prefix: Some(prefix.to_string()),
                local: local.to_string(),
            },
            _ => Self {
                prefix: None,
                local: name.to_string(),
            },
        }
    }

    /// Namespace URI of a known prefix.
    pub fn namespace(&self) -> Option<&'static str> {
        self.prefix.as_deref().and_then(uri_for_prefix)
    }

    /// Same prefix, different local part.
    pub fn with_local(&self, local: impl Into<String>) -> Self {
        Self {
            prefix: self.prefix.clone(),
            local: local.into(),
        }
    }
}

impl fmt::Display for QualName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}
