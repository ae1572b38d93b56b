use serde::Deserialize;

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Knobs shared by parsing and evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Options {
    /// Deepest block nesting the parser will build. Block tags past this
    /// depth are kept as literal text.
    pub max_depth: usize,
    /// HTML-escape the output of `{{ ... }}`.
    pub escape_html: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            escape_html: false,
        }
    }
}

impl Options {
    pub fn from_json(text: &str) -> crate::errors::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
