use thiserror::Error;

/// Errors surfaced by the engine's outer edges.
///
/// Parsing and evaluating a template never fail; these only come from
/// loading a context, reading files, or from a filter function, whose
/// failure the evaluator swallows after logging it.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid context JSON: {0}")]
    Context(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("function `{name}` failed: {message}")]
    Function { name: String, message: String },
}

impl TemplateError {
    pub fn function(name: &str, message: impl Into<String>) -> Self {
        TemplateError::Function {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;
