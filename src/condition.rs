use serde_json::Value;

use crate::context::Context;
use crate::options::DEFAULT_MAX_DEPTH;
use crate::parser::{ParseError, Parser};
use crate::value::{cmp_values, truthy};

/// Boolean expression in an `{% if ... %}` tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Operand, Operand),
    Ne(Operand, Operand),
    Lt(Operand, Operand),
    Lte(Operand, Operand),
    Gt(Operand, Operand),
    Gte(Operand, Operand),
    /// Two or more terms; `a and b and c` is one flat node.
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
    Truthy(Operand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Path(Vec<String>),
    Literal(Value),
}

impl Condition {
    /// Parse a condition. Input that does not fit the grammar becomes a
    /// truthiness test of the whole text read as a dotted path.
    pub fn parse(input: &str) -> Condition {
        Self::parse_with_depth(input, DEFAULT_MAX_DEPTH)
    }

    /// Like [`Condition::parse`], with parentheses nested at most
    /// `max_depth` deep. Deeper input is unparsable.
    pub fn parse_with_depth(input: &str, max_depth: usize) -> Condition {
        let mut cp = CondParser::new(input, max_depth);
        let parsed = cp.parse_or().and_then(|cond| {
            cp.p.skip_ws();
            if cp.p.eof() {
                Ok(cond)
            } else {
                Err(ParseError::InvalidSyntax(format!("trailing input `{}`", cp.p.rest())))
            }
        });
        match parsed {
            Ok(cond) => cond,
            Err(e) => {
                tracing::debug!(condition = input, error = %e, "unparsable condition, reading it as a path");
                Condition::Truthy(Operand::Path(fallback_path(input)))
            }
        }
    }

    pub fn eval(&self, ctx: &Context) -> bool {
        match self {
            Condition::Eq(a, b) => cmp_values(&a.eval(ctx), &b.eval(ctx), |o| o == 0),
            Condition::Ne(a, b) => cmp_values(&a.eval(ctx), &b.eval(ctx), |o| o != 0),
            Condition::Lt(a, b) => cmp_values(&a.eval(ctx), &b.eval(ctx), |o| o < 0),
            Condition::Lte(a, b) => cmp_values(&a.eval(ctx), &b.eval(ctx), |o| o <= 0),
            Condition::Gt(a, b) => cmp_values(&a.eval(ctx), &b.eval(ctx), |o| o > 0),
            Condition::Gte(a, b) => cmp_values(&a.eval(ctx), &b.eval(ctx), |o| o >= 0),
            Condition::And(terms) => terms.iter().all(|c| c.eval(ctx)),
            Condition::Or(terms) => terms.iter().any(|c| c.eval(ctx)),
            Condition::Not(inner) => !inner.eval(ctx),
            Condition::Truthy(op) => truthy(&op.eval(ctx)),
        }
    }
}

impl Operand {
    fn eval(&self, ctx: &Context) -> Value {
        match self {
            Operand::Literal(v) => v.clone(),
            Operand::Path(segments) => ctx.resolve(segments.as_slice()).cloned().unwrap_or(Value::Null),
        }
    }
}

/// Split unparsable text into path segments. Blank text is the empty path,
/// which resolves to nothing.
pub(crate) fn fallback_path(input: &str) -> Vec<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed.split('.').map(str::to_string).collect()
}

struct CondParser<'a> {
    p: Parser<'a>,
    depth: usize,
    max_depth: usize,
}

impl<'a> CondParser<'a> {
    fn new(s: &'a str, max_depth: usize) -> Self {
        Self {
            p: Parser::new(s),
            depth: 0,
            max_depth,
        }
    }

    fn parse_or(&mut self) -> Result<Condition, ParseError> {
        let mut terms = vec![self.parse_and()?];
        loop {
            self.p.skip_ws();
            if self.p.consume_keyword("or") {
                terms.push(self.parse_and()?);
            } else {
                break;
            }
        }
        Ok(flatten(terms, Condition::Or))
    }

    fn parse_and(&mut self) -> Result<Condition, ParseError> {
        let mut terms = vec![self.parse_not()?];
        loop {
            self.p.skip_ws();
            if self.p.consume_keyword("and") {
                terms.push(self.parse_not()?);
            } else {
                break;
            }
        }
        Ok(flatten(terms, Condition::And))
    }

    /// A run of `not`s folds to at most one negation.
    fn parse_not(&mut self) -> Result<Condition, ParseError> {
        let mut negate = false;
        loop {
            self.p.skip_ws();
            if self.p.consume_keyword("not") {
                negate = !negate;
            } else {
                break;
            }
        }
        let inner = self.parse_compare()?;
        Ok(if negate {
            Condition::Not(Box::new(inner))
        } else {
            inner
        })
    }

    fn parse_compare(&mut self) -> Result<Condition, ParseError> {
        self.p.skip_ws();
        if self.p.consume_char('(') {
            if self.depth >= self.max_depth {
                return Err(ParseError::InvalidSyntax("parentheses nested too deep".into()));
            }
            self.depth += 1;
            let inner = self.parse_or()?;
            self.depth -= 1;
            self.p.skip_ws();
            self.p.expect(')')?;
            return Ok(inner);
        }
        let left = self.parse_operand()?;
        self.p.skip_ws();
        let op = ["==", "!=", "<=", ">=", "<", ">"]
            .into_iter()
            .find(|op| self.p.consume_str(op));
        let Some(op) = op else {
            return Ok(Condition::Truthy(left));
        };
        self.p.skip_ws();
        let right = self.parse_operand()?;
        Ok(match op {
            "==" => Condition::Eq(left, right),
            "!=" => Condition::Ne(left, right),
            "<" => Condition::Lt(left, right),
            "<=" => Condition::Lte(left, right),
            ">" => Condition::Gt(left, right),
            _ => Condition::Gte(left, right),
        })
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        self.p.skip_ws();
        let start = self.p.pos();
        if let Ok(v) = self.p.parse_literal() {
            return Ok(Operand::Literal(v));
        }
        self.p.seek(start);
        self.p.parse_path().map(Operand::Path)
    }
}

fn flatten(mut terms: Vec<Condition>, join: fn(Vec<Condition>) -> Condition) -> Condition {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        join(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> Operand {
        Operand::Path(p.split('.').map(str::to_string).collect())
    }

    #[test]
    fn plain_path() {
        assert_eq!(Condition::parse(" user.active "), Condition::Truthy(path("user.active")));
    }

    #[test]
    fn precedence_and_binds_tighter_than_or() {
        let cond = Condition::parse("a or b and not c");
        assert_eq!(
            cond,
            Condition::Or(vec![
                Condition::Truthy(path("a")),
                Condition::And(vec![
                    Condition::Truthy(path("b")),
                    Condition::Not(Box::new(Condition::Truthy(path("c")))),
                ]),
            ])
        );
    }

    #[test]
    fn chains_stay_flat() {
        let cond = Condition::parse("a and b and c");
        assert_eq!(
            cond,
            Condition::And(vec![
                Condition::Truthy(path("a")),
                Condition::Truthy(path("b")),
                Condition::Truthy(path("c")),
            ])
        );
    }

    #[test]
    fn repeated_not_folds_by_parity() {
        assert_eq!(Condition::parse("not not a"), Condition::Truthy(path("a")));
        assert_eq!(
            Condition::parse("not not not a"),
            Condition::Not(Box::new(Condition::Truthy(path("a"))))
        );
    }

    #[test]
    fn parentheses_past_the_depth_are_a_path() {
        let ctx = Context::new(json!({"a": true}));
        assert!(Condition::parse_with_depth("((a))", 2).eval(&ctx));
        let cond = Condition::parse_with_depth("(((a)))", 2);
        assert_eq!(cond, Condition::Truthy(path("(((a)))")));
        assert!(!cond.eval(&ctx));
    }

    #[test]
    fn blank_condition_is_the_empty_path() {
        let ctx = Context::new(json!({"": true}));
        let cond = Condition::parse("   ");
        assert_eq!(cond, Condition::Truthy(Operand::Path(Vec::new())));
        assert!(!cond.eval(&ctx));
    }

    #[test]
    fn comparisons_against_context() {
        let ctx = Context::new(json!({"age": 21, "role": "admin", "tags": []}));
        assert!(Condition::parse("age >= 18").eval(&ctx));
        assert!(!Condition::parse("age < 18").eval(&ctx));
        assert!(Condition::parse("role == 'admin' and not tags").eval(&ctx));
        assert!(Condition::parse("(role != \"admin\") or age == 21").eval(&ctx));
        assert!(!Condition::parse("missing.deep").eval(&ctx));
    }

    #[test]
    fn garbage_falls_back_to_a_missing_path() {
        let ctx = Context::new(json!({"a": true}));
        let cond = Condition::parse("a ===");
        assert!(matches!(cond, Condition::Truthy(Operand::Path(_))));
        assert!(!cond.eval(&ctx));
    }

    #[test]
    fn keyword_prefixed_names_are_paths() {
        let ctx = Context::new(json!({"notice": 1, "order": 0}));
        assert!(Condition::parse("notice").eval(&ctx));
        assert!(!Condition::parse("order").eval(&ctx));
    }
}
