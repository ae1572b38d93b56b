use crate::context::Context;
use crate::errors::Result;
use crate::expression::Expr;
use crate::functions::Registry;
use crate::options::Options;
use crate::template::Template;
use serde_json::Value;

/// =========================
/// Public API (Engine)
/// =========================

/// Parses and renders templates with one function registry and one set of
/// options.
#[derive(Clone)]
pub struct Engine {
    registry: Registry,
    options: Options,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Registry::with_builtins())
    }
}

impl Engine {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            options: Options::default(),
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn compile(&self, src: &str) -> Template {
        Template::parse_with(src, &self.options)
    }

    /// Wrap `data` in a context carrying this engine's registry and options.
    pub fn context(&self, data: Value) -> Context {
        Context::new(data)
            .with_registry(self.registry.clone())
            .with_options(self.options.clone())
    }

    pub fn render(&self, src: &str, data: &Value) -> String {
        self.compile(src).render(&self.context(data.clone()))
    }

    /// Render against a context given as JSON text. Only a bad context is
    /// an error; the template itself always renders.
    pub fn render_json(&self, src: &str, json_text: &str) -> Result<String> {
        let data: Value = serde_json::from_str(json_text)?;
        Ok(self.render(src, &data))
    }
}

/// =========================
/// Public API (Library funcs)
/// =========================

/// Parse `src` into an expression tree with default options.
pub fn parse(src: &str) -> Expr {
    Template::parse(src).into_root()
}

/// Evaluate a parsed tree against `data` with the built-in functions.
pub fn evaluate(expr: &Expr, data: &Value) -> String {
    expr.evaluate(&Context::new(data.clone()))
}

/// Parse and render in one step with the default engine.
pub fn render(src: &str, data: &Value) -> String {
    Engine::default().render(src, data)
}
