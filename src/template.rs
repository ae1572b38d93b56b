use crate::condition::Condition;
use crate::context::Context;
use crate::expression::{Expr, Variable};
use crate::options::Options;
use crate::parser::{ParseError, Parser};

/// A parsed template, ready to be evaluated any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    root: Expr,
}

impl Template {
    /// Parse with default options. Never fails: malformed tags stay in the
    /// output as literal text.
    pub fn parse(src: &str) -> Template {
        Self::parse_with(src, &Options::default())
    }

    pub fn parse_with(src: &str, opts: &Options) -> Template {
        let tags = tokenize(src);
        let blocks = match_blocks(&tags);
        let builder = Builder {
            src,
            tags: &tags,
            blocks: &blocks,
            max_depth: opts.max_depth,
        };
        Template {
            root: builder.build(0, tags.len(), 0, src.len(), 0),
        }
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn into_root(self) -> Expr {
        self.root
    }

    pub fn render(&self, ctx: &Context) -> String {
        self.root.evaluate(ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    If,
    For,
}

impl BlockKind {
    fn from_end_keyword(kw: &str) -> Option<BlockKind> {
        match kw {
            "endif" => Some(BlockKind::If),
            "endfor" => Some(BlockKind::For),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        match self {
            BlockKind::If => 0,
            BlockKind::For => 1,
        }
    }
}

/// Byte span of a whole tag, delimiters included.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
}

#[derive(Debug)]
enum TagKind<'a> {
    Variable(&'a str),
    Comment,
    If(&'a str),
    For(String, Vec<String>),
    Else,
    End(BlockKind),
    /// Unknown keyword or malformed `for` header.
    Other,
}

#[derive(Debug)]
struct Tag<'a> {
    span: Span,
    kind: TagKind<'a>,
}

impl Tag<'_> {
    fn opens(&self) -> Option<BlockKind> {
        match self.kind {
            TagKind::If(_) => Some(BlockKind::If),
            TagKind::For(..) => Some(BlockKind::For),
            _ => None,
        }
    }
}

/// Tag indices of a block's optional `{% else %}` and its end tag.
#[derive(Debug, Clone, Copy)]
struct BlockEnd {
    else_idx: Option<usize>,
    end_idx: usize,
}

/// Remembers the last hit of one closing delimiter, so a run of unclosed
/// openers does not rescan the rest of the input for each of them.
struct Closer {
    pat: &'static str,
    last: Option<Option<usize>>,
}

impl Closer {
    fn new(pat: &'static str) -> Self {
        Self { pat, last: None }
    }

    fn find(&mut self, src: &str, from: usize) -> Option<usize> {
        match self.last {
            Some(None) => return None,
            Some(Some(at)) if at >= from => return Some(at),
            _ => {}
        }
        let hit = src[from..].find(self.pat).map(|i| i + from);
        self.last = Some(hit);
        hit
    }
}

/// Cut `src` into tags. An opener with no closer anywhere after it is not
/// a tag; scanning resumes right after its two bytes.
fn tokenize(src: &str) -> Vec<Tag<'_>> {
    let bytes = src.as_bytes();
    let mut vars = Closer::new("}}");
    let mut blocks = Closer::new("%}");
    let mut comments = Closer::new("#}");
    let mut tags = Vec::new();
    let mut pos = 0;

    while let Some(open) = next_open(bytes, pos) {
        let after_open = open + 2;
        let closer = match bytes[open + 1] {
            b'{' => &mut vars,
            b'%' => &mut blocks,
            _ => &mut comments,
        };
        let Some(close) = closer.find(src, after_open) else {
            tracing::debug!(at = open, opener = &src[open..after_open], "unclosed tag kept as text");
            pos = after_open;
            continue;
        };
        let inner = &src[after_open..close];
        let kind = match bytes[open + 1] {
            b'{' => TagKind::Variable(inner),
            b'%' => block_tag(inner.trim()),
            _ => TagKind::Comment,
        };
        let span = Span {
            start: open,
            end: close + 2,
        };
        tags.push(Tag { span, kind });
        pos = span.end;
    }
    tracing::trace!(tags = tags.len(), "tokenized");
    tags
}

fn block_tag(inner: &str) -> TagKind<'_> {
    let (keyword, rest) = split_keyword(inner);
    match keyword {
        "if" => TagKind::If(rest),
        "for" => match parse_for_header(inner) {
            Ok((var, collection)) => TagKind::For(var, collection),
            Err(e) => {
                tracing::debug!(tag = inner, error = %e, "malformed for header kept as text");
                TagKind::Other
            }
        },
        "else" => TagKind::Else,
        _ => BlockKind::from_end_keyword(keyword).map_or(TagKind::Other, TagKind::End),
    }
}

/// Next `{{`, `{%` or `{#` at or after `pos`.
fn next_open(bytes: &[u8], pos: usize) -> Option<usize> {
    let mut i = pos;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && matches!(bytes[i + 1], b'{' | b'%' | b'#') {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Pair every opener with its end tag in one pass over the tags.
///
/// Open blocks sit on a stack. An end tag closes the nearest open block of
/// its kind and drops the unclosed blocks above it, which stay literal. An
/// end tag with no open block of its kind is a stray. An `else` belongs to
/// the innermost open block if that block has none yet.
fn match_blocks(tags: &[Tag<'_>]) -> Vec<Option<BlockEnd>> {
    struct Open {
        idx: usize,
        kind: BlockKind,
        else_idx: Option<usize>,
    }

    let mut blocks = vec![None; tags.len()];
    let mut stack: Vec<Open> = Vec::new();
    let mut open_of_kind = [0usize; 2];

    for (i, tag) in tags.iter().enumerate() {
        if let Some(kind) = tag.opens() {
            stack.push(Open {
                idx: i,
                kind,
                else_idx: None,
            });
            open_of_kind[kind.slot()] += 1;
            continue;
        }
        match tag.kind {
            TagKind::Else => {
                if let Some(top) = stack.last_mut() {
                    if top.else_idx.is_none() {
                        top.else_idx = Some(i);
                    }
                }
            }
            TagKind::End(kind) if open_of_kind[kind.slot()] > 0 => {
                let Some(at) = stack.iter().rposition(|o| o.kind == kind) else {
                    continue;
                };
                for dropped in stack.drain(at + 1..) {
                    open_of_kind[dropped.kind.slot()] -= 1;
                }
                if let Some(open) = stack.pop() {
                    open_of_kind[kind.slot()] -= 1;
                    blocks[open.idx] = Some(BlockEnd {
                        else_idx: open.else_idx,
                        end_idx: i,
                    });
                }
            }
            _ => {}
        }
    }
    blocks
}

struct Builder<'s, 't> {
    src: &'s str,
    tags: &'t [Tag<'s>],
    blocks: &'t [Option<BlockEnd>],
    max_depth: usize,
}

impl<'s, 't> Builder<'s, 't> {
    /// Build tags `lo..hi`, which lie inside `src[start..end]`.
    fn build(&self, lo: usize, hi: usize, start: usize, end: usize, depth: usize) -> Expr {
        let mut nodes = Vec::new();
        let mut text_start = start;
        let mut i = lo;

        while i < hi {
            let tag = &self.tags[i];
            match &tag.kind {
                TagKind::Variable(inner) => {
                    self.flush_text(&mut nodes, text_start, tag.span.start);
                    nodes.push(Expr::Variable(Variable::parse(inner)));
                    text_start = tag.span.end;
                    i += 1;
                }
                TagKind::Comment => {
                    self.flush_text(&mut nodes, text_start, tag.span.start);
                    text_start = tag.span.end;
                    i += 1;
                }
                TagKind::If(_) | TagKind::For(..) => match self.block(i, hi, depth) {
                    Some((node, end_idx)) => {
                        self.flush_text(&mut nodes, text_start, tag.span.start);
                        nodes.push(node);
                        text_start = self.tags[end_idx].span.end;
                        i = end_idx + 1;
                    }
                    None => i += 1,
                },
                TagKind::Else | TagKind::End(_) | TagKind::Other => {
                    tracing::debug!(tag = self.text(tag.span), "stray or unknown tag kept as text");
                    i += 1;
                }
            }
        }
        self.flush_text(&mut nodes, text_start, end);
        Expr::Composite(nodes)
    }

    /// Build the block opened by tag `i`. Returns the node and the index of
    /// its end tag, or `None` when the opener is to be kept as text.
    fn block(&self, i: usize, hi: usize, depth: usize) -> Option<(Expr, usize)> {
        let tag = &self.tags[i];
        let Some(block) = self.blocks[i].filter(|b| b.end_idx < hi) else {
            tracing::debug!(tag = self.text(tag.span), "unclosed block kept as text");
            return None;
        };
        if depth >= self.max_depth {
            tracing::debug!(depth, "nesting limit reached, block kept as text");
            return None;
        }

        let body_end = block.else_idx.unwrap_or(block.end_idx);
        let body = self.build(
            i + 1,
            body_end,
            tag.span.end,
            self.tags[body_end].span.start,
            depth + 1,
        );
        let else_branch = block.else_idx.map(|e| {
            Box::new(self.build(
                e + 1,
                block.end_idx,
                self.tags[e].span.end,
                self.tags[block.end_idx].span.start,
                depth + 1,
            ))
        });

        let node = match &tag.kind {
            TagKind::For(var, collection) => Expr::Loop {
                var: var.clone(),
                collection: collection.clone(),
                body: Box::new(body),
                empty: else_branch,
            },
            TagKind::If(cond) => Expr::Conditional {
                condition: Condition::parse_with_depth(cond, self.max_depth),
                then_branch: Box::new(body),
                else_branch,
            },
            _ => return None,
        };
        tracing::trace!(kind = ?tag.opens(), depth, "parsed block");
        Some((node, block.end_idx))
    }

    fn text(&self, span: Span) -> &'s str {
        &self.src[span.start..span.end]
    }

    fn flush_text(&self, nodes: &mut Vec<Expr>, start: usize, end: usize) {
        if start < end {
            nodes.push(Expr::Text(self.src[start..end].to_string()));
        }
    }
}

/// Split a tag body into its leading keyword and the remainder.
fn split_keyword(inner: &str) -> (&str, &str) {
    let cut = inner
        .find(|c: char| !(c == '_' || c.is_ascii_alphanumeric()))
        .unwrap_or(inner.len());
    inner.split_at(cut)
}

/// `for <name> in <dotted.path>`
fn parse_for_header(inner: &str) -> Result<(String, Vec<String>), ParseError> {
    let mut p = Parser::new(inner);
    if !p.consume_keyword("for") {
        return Err(ParseError::InvalidSyntax("expected `for`".into()));
    }
    p.skip_ws();
    let var = p.parse_identifier()?;
    p.skip_ws();
    if !p.consume_keyword("in") {
        return Err(ParseError::InvalidSyntax("expected `in`".into()));
    }
    p.skip_ws();
    let collection = p.parse_path()?;
    p.skip_ws();
    if !p.eof() {
        return Err(ParseError::InvalidSyntax(format!("trailing input `{}`", p.rest())));
    }
    Ok((var, collection))
}
