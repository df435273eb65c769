//! Stylesheet parser.
//!
//! Built on the `cssparser` tokenizer: blocks, strings, comments and
//! `url(...)` are handled by the tokenizer, and this module only groups
//! tokens into rules, at-rules and declarations. Selector, prelude and value
//! text is kept exactly as written (sliced from the source), so the stages
//! rewrite names without reformatting anything else.
//!
//! ```text
//! .a { color: red }      ->  Rule { selector: ".a", nodes: [Decl] }
//! @import "./b.css";     ->  AtRule { name: "import", nodes: None }
//! @media print { ... }   ->  AtRule { name: "media", nodes: Some([...]) }
//! ```

use cssparser::{
    ParseError, ParseErrorKind, Parser, ParserInput, SourceLocation, SourcePosition, Token,
};

use super::ast::{AtRule, Declaration, Node, Rule, Stylesheet};
use crate::error::CssParseError;
use crate::resource::file::FileId;

type NodeError<'i> = ParseError<'i, CssParseError>;

/// Parse `source` into a [`Stylesheet`].
pub fn parse(source: &str, id: &FileId) -> Result<Stylesheet, CssParseError> {
    let cx = Context { id, source };
    let mut input = ParserInput::new(source);
    let mut parser = Parser::new(&mut input);
    match parse_nodes(&mut parser, &cx) {
        Ok(nodes) => Ok(Stylesheet { nodes }),
        Err(err) => Err(cx.convert(err)),
    }
}

/// The file being parsed, for error positions.
struct Context<'a> {
    id: &'a FileId,
    source: &'a str,
}

impl Context<'_> {
    fn error<'i>(
        &self,
        p: &Parser<'i, '_>,
        offset: usize,
        message: impl Into<String>,
    ) -> NodeError<'i> {
        p.new_custom_error(CssParseError::at(self.id.clone(), self.source, offset, message))
    }

    fn convert(&self, err: NodeError<'_>) -> CssParseError {
        match err.kind {
            ParseErrorKind::Custom(err) => err,
            ParseErrorKind::Basic(kind) => CssParseError::at(
                self.id.clone(),
                self.source,
                offset_of(self.source, err.location),
                format!("{kind:?}"),
            ),
        }
    }
}

/// Parse the nodes of a block (or of the whole sheet) until its end.
fn parse_nodes<'i>(
    p: &mut Parser<'i, '_>,
    cx: &Context<'_>,
) -> Result<Vec<Node>, NodeError<'i>> {
    let mut nodes = Vec::new();
    loop {
        let start = p.position();
        let token = match p.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(nodes),
        };

        match token {
            Token::WhiteSpace(_) | Token::Semicolon | Token::CDO | Token::CDC => {}
            Token::Comment(text) => {
                if !p.slice_from(start).ends_with("*/") || p.slice_from(start).len() < 4 {
                    return Err(cx.error(p, start.byte_index(), "unclosed comment"));
                }
                nodes.push(Node::Comment(text.to_string()));
            }
            Token::CloseCurlyBracket => {
                return Err(cx.error(p, start.byte_index(), "unexpected '}'"));
            }
            Token::AtKeyword(name) => nodes.push(at_rule(p, cx, start, name.to_string())?),
            first => nodes.push(rule_or_decl(p, cx, start, first)?),
        }
    }
}

fn at_rule<'i>(
    p: &mut Parser<'i, '_>,
    cx: &Context<'_>,
    start: SourcePosition,
    name: String,
) -> Result<Node, NodeError<'i>> {
    let offset = start.byte_index();
    let prelude = p.position();
    loop {
        let before = p.position();
        let token = match p.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => {
                return Ok(Node::AtRule(AtRule {
                    name,
                    params: p.slice_from(prelude).trim().to_string(),
                    nodes: None,
                    offset,
                }));
            }
        };

        match token {
            Token::Semicolon => {
                return Ok(Node::AtRule(AtRule {
                    name,
                    params: p.slice(prelude..before).trim().to_string(),
                    nodes: None,
                    offset,
                }));
            }
            Token::CurlyBracketBlock => {
                let params = p.slice(prelude..before).trim().to_string();
                let nodes = block(p, cx, before, offset)?;
                return Ok(Node::AtRule(AtRule {
                    name,
                    params,
                    nodes: Some(nodes),
                    offset,
                }));
            }
            other => check_token(p, cx, before, &other)?,
        }
    }
}

fn rule_or_decl<'i>(
    p: &mut Parser<'i, '_>,
    cx: &Context<'_>,
    start: SourcePosition,
    first: Token<'i>,
) -> Result<Node, NodeError<'i>> {
    let offset = start.byte_index();
    let first_end = p.position();
    let is_ident = matches!(first, Token::Ident(_));
    let mut colon: Option<(SourcePosition, SourcePosition)> = None;
    let mut before = start;
    let mut token = first;

    loop {
        match token {
            Token::CurlyBracketBlock => {
                let selector = p.slice(start..before).trim().to_string();
                if selector.is_empty() {
                    return Err(cx.error(p, offset, "missing selector"));
                }
                let nodes = block(p, cx, before, offset)?;
                return Ok(Node::Rule(Rule {
                    selector,
                    nodes,
                    offset,
                }));
            }
            Token::Semicolon => break,
            Token::Colon if colon.is_none() => colon = Some((before, p.position())),
            ref other => check_token(p, cx, before, other)?,
        }

        before = p.position();
        token = match p.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
    }

    let end = before;
    match colon {
        Some((colon_start, colon_end))
            if is_ident && p.slice(first_end..colon_start).trim().is_empty() =>
        {
            Ok(Node::Decl(Declaration {
                prop: p.slice(start..first_end).to_string(),
                value: p.slice(colon_end..end).trim().to_string(),
                offset,
            }))
        }
        _ => {
            let text = p.slice(start..end).trim();
            Err(cx.error(p, offset, format!("unknown word '{text}'")))
        }
    }
}

/// Parse the block just opened at `open`, owned by the node at `owner`.
fn block<'i>(
    p: &mut Parser<'i, '_>,
    cx: &Context<'_>,
    open: SourcePosition,
    owner: usize,
) -> Result<Vec<Node>, NodeError<'i>> {
    let (nodes, content_end) = p.parse_nested_block(|p| -> Result<_, NodeError<'i>> {
        let nodes = parse_nodes(p, cx)?;
        Ok((nodes, p.position()))
    })?;
    // Without a closing brace the block runs to the end of input.
    if p.position() == content_end || !p.slice_from(open).ends_with('}') {
        return Err(cx.error(p, owner, "unclosed block"));
    }
    Ok(nodes)
}

/// Reject tokens that can only come from malformed input.
fn check_token<'i>(
    p: &Parser<'i, '_>,
    cx: &Context<'_>,
    at: SourcePosition,
    token: &Token<'i>,
) -> Result<(), NodeError<'i>> {
    let message = match token {
        Token::BadString(_) => "unclosed string",
        Token::BadUrl(_) => "bad url",
        Token::CloseCurlyBracket => "unexpected '}'",
        _ => return Ok(()),
    };
    Err(cx.error(p, at.byte_index(), message))
}

/// Byte offset of a tokenizer location (0-based line, 1-based column).
fn offset_of(source: &str, location: SourceLocation) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(location.line as usize)
        .map(str::len)
        .sum();
    line_start + (location.column as usize).saturating_sub(1)
}
