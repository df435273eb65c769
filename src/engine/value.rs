//! Token-level rewriting of declaration values and at-rule preludes.
//!
//! Values are tokenized with `cssparser`, so identifiers inside strings,
//! `url(...)` and comments are never touched, and everything that is not
//! rewritten is copied back exactly as written.

use cssparser::{ParseError, Parser, ParserInput, Token};

/// Re-emit `text`, replacing each identifier for which `map` returns a
/// replacement. Identifiers inside functions and parentheses are visited too.
pub(crate) fn map_idents(text: &str, map: &mut impl FnMut(&str) -> Option<String>) -> String {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    let mut out = String::with_capacity(text.len());
    map_idents_in(&mut parser, map, &mut out);
    out
}

fn map_idents_in<'i, F>(p: &mut Parser<'i, '_>, map: &mut F, out: &mut String)
where
    F: FnMut(&str) -> Option<String>,
{
    loop {
        let start = p.position();
        let token = match p.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return,
        };
        match token {
            Token::Ident(name) => match map(&*name) {
                Some(replacement) => out.push_str(&replacement),
                None => out.push_str(p.slice_from(start)),
            },
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                out.push_str(p.slice_from(start));
                let inner = p.parse_nested_block(|p| -> Result<String, ParseError<'i, ()>> {
                    let mut inner = String::new();
                    map_idents_in(p, map, &mut inner);
                    Ok(inner)
                });
                out.push_str(&inner.unwrap_or_default());
                let close = closing(&token);
                if p.slice_from(start).ends_with(close) {
                    out.push(close);
                }
            }
            _ => out.push_str(p.slice_from(start)),
        }
    }
}

/// Closing character of a block token.
pub(crate) fn closing(token: &Token<'_>) -> char {
    match token {
        Token::SquareBracketBlock => ']',
        Token::CurlyBracketBlock => '}',
        _ => ')',
    }
}
