use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use crate::errors::{Result, TemplateError};

/// Trait for filters applied in `{{ value | name(args) }}`.
pub trait Function: Send + Sync {
    fn name(&self) -> &'static str;
    /// Accepted number of arguments, not counting the piped-in value.
    fn arity(&self) -> std::ops::RangeInclusive<usize>;
    fn call(&self, input: &Value, args: &[Value]) -> Result<Value>;
}

/// Thread-safe function registry.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<HashMap<&'static str, Arc<dyn Function>>>,
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn with_builtins() -> Self {
        static BUILTINS: OnceLock<Registry> = OnceLock::new();
        BUILTINS
            .get_or_init(|| {
                let mut reg = Registry::new();
                reg.register(builtins::Lower);
                reg.register(builtins::Upper);
                reg.register(builtins::Trim);
                reg.register(builtins::Length);
                reg.register(builtins::First);
                reg.register(builtins::Last);
                reg.register(builtins::Unique);
                reg.register(builtins::Join);
                reg.register(builtins::DefaultValue);
                reg
            })
            .clone()
    }

    pub fn register<F: Function + 'static>(&mut self, f: F) {
        let mut_map = Arc::make_mut(&mut self.inner);
        mut_map.insert(f.name(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.inner.get(name).cloned()
    }

    /// Look up `name`, check the argument count and call it.
    pub fn apply(&self, name: &str, input: &Value, args: &[Value]) -> Result<Value> {
        let f = self
            .get(name)
            .ok_or_else(|| TemplateError::function(name, "unknown function"))?;
        if !f.arity().contains(&args.len()) {
            return Err(TemplateError::function(
                name,
                format!("expected {:?} arguments, got {}", f.arity(), args.len()),
            ));
        }
        f.call(input, args)
    }
}

pub mod builtins {
    use super::*;
    use crate::value::render_value;
    use itertools::Itertools;

    pub struct Lower;
    impl Function for Lower {
        fn name(&self) -> &'static str { "lower" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=0 }
        fn call(&self, input: &Value, _args: &[Value]) -> Result<Value> {
            Ok(match input {
                Value::String(t) => Value::String(t.to_lowercase()),
                other => other.clone(),
            })
        }
    }

    pub struct Upper;
    impl Function for Upper {
        fn name(&self) -> &'static str { "upper" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=0 }
        fn call(&self, input: &Value, _args: &[Value]) -> Result<Value> {
            Ok(match input {
                Value::String(t) => Value::String(t.to_uppercase()),
                other => other.clone(),
            })
        }
    }

    pub struct Trim;
    impl Function for Trim {
        fn name(&self) -> &'static str { "trim" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=0 }
        fn call(&self, input: &Value, _args: &[Value]) -> Result<Value> {
            Ok(match input {
                Value::String(t) => Value::String(t.trim().to_string()),
                other => other.clone(),
            })
        }
    }

    pub struct Length;
    impl Function for Length {
        fn name(&self) -> &'static str { "length" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=0 }
        fn call(&self, input: &Value, _args: &[Value]) -> Result<Value> {
            let len = match input {
                Value::Array(a) => a.len(),
                Value::Object(m) => m.len(),
                Value::String(s) => s.chars().count(),
                _ => 0,
            };
            Ok(Value::from(len))
        }
    }

    pub struct First;
    impl Function for First {
        fn name(&self) -> &'static str { "first" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=0 }
        fn call(&self, input: &Value, _args: &[Value]) -> Result<Value> {
            Ok(match input {
                Value::Array(a) => a.first().cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            })
        }
    }

    pub struct Last;
    impl Function for Last {
        fn name(&self) -> &'static str { "last" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=0 }
        fn call(&self, input: &Value, _args: &[Value]) -> Result<Value> {
            Ok(match input {
                Value::Array(a) => a.last().cloned().unwrap_or(Value::Null),
                _ => Value::Null,
            })
        }
    }

    /// Deduplicate a sequence; identity for anything else.
    pub struct Unique;
    impl Function for Unique {
        fn name(&self) -> &'static str { "unique" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=0 }
        fn call(&self, input: &Value, _args: &[Value]) -> Result<Value> {
            Ok(match input {
                Value::Array(a) => Value::Array(
                    a.iter()
                        .unique_by(|x| x.to_string())
                        .cloned()
                        .collect(),
                ),
                other => other.clone(),
            })
        }
    }

    pub struct Join;
    impl Function for Join {
        fn name(&self) -> &'static str { "join" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 0..=1 }
        fn call(&self, input: &Value, args: &[Value]) -> Result<Value> {
            let sep = match args.first() {
                Some(Value::String(s)) => s.clone(),
                Some(other) => render_value(other),
                None => String::new(),
            };
            match input {
                Value::Array(a) => Ok(Value::String(a.iter().map(render_value).join(&sep))),
                other => Err(TemplateError::function(
                    self.name(),
                    format!("cannot join a non-sequence value {other}"),
                )),
            }
        }
    }

    /// Replace null, missing or empty-string values with the argument.
    pub struct DefaultValue;
    impl Function for DefaultValue {
        fn name(&self) -> &'static str { "default" }
        fn arity(&self) -> std::ops::RangeInclusive<usize> { 1..=1 }
        fn call(&self, input: &Value, args: &[Value]) -> Result<Value> {
            let fallback = args.first().cloned().unwrap_or(Value::Null);
            Ok(match input {
                Value::Null => fallback,
                Value::String(s) if s.is_empty() => fallback,
                other => other.clone(),
            })
        }
    }
}
