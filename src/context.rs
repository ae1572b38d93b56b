use serde_json::{Map, Value};
use std::sync::Arc;

use crate::functions::Registry;
use crate::options::Options;
use crate::value::lookup;

/// Read-only evaluation context: the variables a template sees, plus the
/// function registry and options that shape how values are rendered.
///
/// Cloning is cheap. [`Context::bind`] returns a new context and never
/// touches the one it was called on: bindings live in a chain of scopes in
/// front of the shared root mapping, so binding costs the same however
/// large the root is.
#[derive(Clone)]
pub struct Context {
    vars: Arc<Map<String, Value>>,
    locals: Option<Arc<Scope>>,
    registry: Registry,
    options: Options,
}

/// One binding, newest first.
struct Scope {
    name: String,
    value: Value,
    parent: Option<Arc<Scope>>,
}

impl Drop for Scope {
    // Unlink iteratively so a long chain cannot overflow the stack.
    fn drop(&mut self) {
        let mut next = self.parent.take();
        while let Some(scope) = next {
            match Arc::try_unwrap(scope) {
                Ok(mut scope) => next = scope.parent.take(),
                Err(_) => break,
            }
        }
    }
}

impl Context {
    /// Build a context from a JSON value. A root that is not a mapping
    /// behaves as an empty one.
    pub fn new(root: Value) -> Self {
        let vars = match root {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                tracing::debug!(kind = kind_of(&other), "context root is not a mapping, ignoring it");
                Map::new()
            }
        };
        Self {
            vars: Arc::new(vars),
            locals: None,
            registry: Registry::with_builtins(),
            options: Options::default(),
        }
    }

    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// A copy of this context with `name` bound to `value`, shadowing any
    /// existing entry of that name.
    pub fn bind(&self, name: &str, value: Value) -> Self {
        self.clone().with_var(name, value)
    }

    /// Owned form of [`Context::bind`]; avoids a second copy when chaining.
    pub fn with_var(mut self, name: &str, value: Value) -> Self {
        self.locals = Some(Arc::new(Scope {
            name: name.to_string(),
            value,
            parent: self.locals.take(),
        }));
        self
    }

    /// Resolve a dotted path already split into segments.
    pub fn resolve<S: AsRef<str>>(&self, segments: &[S]) -> Option<&Value> {
        let (head, rest) = segments.split_first()?;
        let root = self.get(head.as_ref())?;
        lookup(root, rest)
    }

    /// The innermost binding of `name`, else the root entry.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let mut scope = self.locals.as_deref();
        while let Some(s) = scope {
            if s.name == name {
                return Some(&s.value);
            }
            scope = s.parent.as_deref();
        }
        self.vars.get(name)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

impl Default for Context {
    fn default() -> Self {
        Context::new(Value::Null)
    }
}

impl From<Value> for Context {
    fn from(root: Value) -> Self {
        Context::new(root)
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
