pub mod errors;
pub mod options;
pub mod context;
pub mod engine;
pub mod functions; // plugin model for `{{ value | filter }}`
pub mod expression;
pub mod template;
pub mod condition;
mod parser;
mod value;

pub use context::Context;
pub use engine::{evaluate, parse, render, Engine};
pub use errors::{Result, TemplateError};
pub use expression::Expr;
pub use functions::{Function, Registry};
pub use options::Options;
pub use template::Template;
pub use value::truthy;
