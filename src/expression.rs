// src/expression.rs
use serde_json::{json, Value};

use crate::condition::{fallback_path, Condition};
use crate::context::Context;
use crate::parser::{ParseError, Parser};
use crate::value::{escape_html, render_value};

/// A node of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Text(String),
    Variable(Variable),
    Conditional {
        condition: Condition,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    Loop {
        var: String,
        collection: Vec<String>,
        body: Box<Expr>,
        /// `{% else %}` branch, rendered when there is nothing to iterate.
        empty: Option<Box<Expr>>,
    },
    Composite(Vec<Expr>),
}

impl Expr {
    pub fn evaluate(&self, ctx: &Context) -> String {
        let mut out = String::new();
        self.render_into(ctx, &mut out);
        out
    }

    pub fn render_into(&self, ctx: &Context, out: &mut String) {
        match self {
            Expr::Text(s) => out.push_str(s),
            Expr::Variable(var) => {
                let text = render_value(&var.eval(ctx));
                if ctx.options().escape_html {
                    out.push_str(&escape_html(&text));
                } else {
                    out.push_str(&text);
                }
            }
            Expr::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if condition.eval(ctx) {
                    then_branch.render_into(ctx, out);
                } else if let Some(other) = else_branch {
                    other.render_into(ctx, out);
                }
            }
            Expr::Loop {
                var,
                collection,
                body,
                empty,
            } => {
                let keys;
                let items: &[Value] = match ctx.resolve(collection.as_slice()) {
                    Some(Value::Array(arr)) => arr,
                    Some(Value::Object(map)) => {
                        keys = map.keys().cloned().map(Value::String).collect::<Vec<_>>();
                        &keys
                    }
                    Some(other) => {
                        tracing::debug!(
                            collection = %collection.join("."),
                            value = %other,
                            "loop over a non-collection renders nothing"
                        );
                        &[]
                    }
                    None => &[],
                };
                let length = items.len();
                if length == 0 {
                    if let Some(empty) = empty {
                        empty.render_into(ctx, out);
                    }
                    return;
                }
                for (i, item) in items.iter().enumerate() {
                    let meta = json!({
                        "index": i + 1,
                        "index0": i,
                        "first": i == 0,
                        "last": i + 1 == length,
                        "length": length,
                    });
                    let scope = ctx.bind("loop", meta).with_var(var, item.clone());
                    body.render_into(&scope, out);
                }
            }
            Expr::Composite(children) => {
                for child in children {
                    child.render_into(ctx, out);
                }
            }
        }
    }
}

/// `{{ path | filter | filter(arg, ...) }}`
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub path: Vec<String>,
    pub filters: Vec<FilterCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Value>,
}

impl Variable {
    /// Parse the inside of a `{{ ... }}` tag. Text that is not a path with
    /// an optional filter pipeline is kept whole as a single path segment,
    /// which resolves to nothing. An empty tag is the empty path.
    pub fn parse(inner: &str) -> Variable {
        let trimmed = inner.trim();
        match parse_variable(trimmed) {
            Ok(var) => var,
            Err(e) => {
                tracing::debug!(expr = trimmed, error = %e, "unparsable variable, reading it as a path");
                Variable {
                    path: fallback_path(trimmed),
                    filters: Vec::new(),
                }
            }
        }
    }

    /// Resolve the path and run the filters. Missing values are null.
    pub fn eval(&self, ctx: &Context) -> Value {
        let mut value = ctx
            .resolve(self.path.as_slice())
            .cloned()
            .unwrap_or(Value::Null);
        for filter in &self.filters {
            match ctx.registry().apply(&filter.name, &value, &filter.args) {
                Ok(v) => value = v,
                Err(e) => tracing::debug!(filter = %filter.name, error = %e, "filter skipped"),
            }
        }
        value
    }
}

fn parse_variable(input: &str) -> Result<Variable, ParseError> {
    let mut p = Parser::new(input);
    let path = p.parse_path()?;
    let mut filters = Vec::new();
    loop {
        p.skip_ws();
        if p.eof() {
            break;
        }
        p.expect('|')?;
        p.skip_ws();
        let name = p.parse_identifier()?;
        p.skip_ws();
        let args = if p.consume_char('(') {
            parse_args(&mut p)?
        } else {
            Vec::new()
        };
        filters.push(FilterCall { name, args });
    }
    Ok(Variable { path, filters })
}

fn parse_args(p: &mut Parser) -> Result<Vec<Value>, ParseError> {
    let mut out = Vec::new();
    p.skip_ws();
    if p.consume_char(')') {
        return Ok(out);
    }
    loop {
        p.skip_ws();
        out.push(p.parse_literal()?);
        p.skip_ws();
        if p.consume_char(',') {
            continue;
        }
        p.expect(')')?;
        break;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn variable_with_filters() {
        let var = Variable::parse(" user.name | trim | default('anon') ");
        assert_eq!(var.path, vec!["user", "name"]);
        assert_eq!(
            var.filters,
            vec![
                FilterCall { name: "trim".into(), args: vec![] },
                FilterCall { name: "default".into(), args: vec![json!("anon")] },
            ]
        );
    }

    #[test]
    fn bad_variable_is_kept_as_one_segment() {
        let var = Variable::parse("a b");
        assert_eq!(var.path, vec!["a b"]);
        assert!(var.filters.is_empty());
    }

    #[test]
    fn empty_tag_does_not_read_the_blank_key() {
        let ctx = Context::new(json!({"": "boom"}));
        let var = Variable::parse("  ");
        assert!(var.path.is_empty());
        assert_eq!(var.eval(&ctx), Value::Null);
        assert_eq!(Expr::Variable(var).evaluate(&ctx), "");
    }

    #[test]
    fn failing_filter_leaves_value_unchanged() {
        let ctx = Context::new(json!({"n": 5}));
        let var = Variable::parse("n | join(',') | nosuch");
        assert_eq!(var.eval(&ctx), json!(5));
    }

    #[test]
    fn composite_concatenates_children() {
        let expr = Expr::Composite(vec![
            Expr::Text("a".into()),
            Expr::Variable(Variable::parse("x")),
            Expr::Text("c".into()),
        ]);
        assert_eq!(expr.evaluate(&Context::new(json!({"x": "b"}))), "abc");
    }

    #[test]
    fn loop_exposes_metadata_and_restores_scope() {
        let body = Expr::Composite(vec![
            Expr::Variable(Variable::parse("loop.index")),
            Expr::Text(":".into()),
            Expr::Variable(Variable::parse("x")),
            Expr::Conditional {
                condition: Condition::parse("not loop.last"),
                then_branch: Box::new(Expr::Text(",".into())),
                else_branch: None,
            },
        ]);
        let expr = Expr::Composite(vec![
            Expr::Loop {
                var: "x".into(),
                collection: vec!["xs".into()],
                body: Box::new(body),
                empty: None,
            },
            Expr::Text("|".into()),
            Expr::Variable(Variable::parse("x")),
        ]);
        let ctx = Context::new(json!({"xs": ["a", "b"], "x": "outer"}));
        assert_eq!(expr.evaluate(&ctx), "1:a,2:b|outer");
    }

    #[test]
    fn escape_html_applies_to_variables_only() {
        let ctx = Context::new(json!({"v": "<b>"})).with_options(crate::options::Options {
            escape_html: true,
            ..Default::default()
        });
        let expr = Expr::Composite(vec![
            Expr::Text("<p>".into()),
            Expr::Variable(Variable::parse("v")),
        ]);
        assert_eq!(expr.evaluate(&ctx), "<p>&lt;b&gt;");
    }
}
