//! Selector rewriting shared by the stages.
//!
//! Selectors are tokenized with `cssparser`; only class names, ids and the
//! `:global` / `:local` pseudo-classes are rewritten. Every other token is
//! copied back from the source slice, so whitespace, attribute selectors and
//! escapes survive untouched.

use cssparser::{BasicParseError, ParseError, ParseErrorKind, Parser, ParserInput, Token};

use crate::engine::value::closing;

/// Locality of the names being scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Local,
    Global,
}

/// A `:global` / `:local` switch following a colon.
enum Switch {
    /// `:global(...)` / `:local(...)`
    Function(Mode),
    /// Bare `:global` / `:local`
    Bare(Mode),
}

type SelectorError<'i> = ParseError<'i, String>;

/// Rewrite a selector list so class and id names are wrapped in
/// `:local(...)` unless they are global.
///
/// - `:global(.a)` becomes `.a`
/// - `:local(.a)` stays local
/// - a bare `:global` / `:local` switches the mode for the rest of that
///   selector
pub(super) fn localize_selector(selector: &str) -> Result<String, String> {
    let mut input = ParserInput::new(selector);
    let mut parser = Parser::new(&mut input);
    let localized =
        localize_block(&mut parser, Mode::Local, false).map_err(|err| message(err, selector))?;
    Ok(localized.trim().to_string())
}

fn localize_block<'i>(
    p: &mut Parser<'i, '_>,
    initial: Mode,
    in_switch: bool,
) -> Result<String, SelectorError<'i>> {
    let mut out = String::new();
    let mut mode = initial;
    let mut skip_whitespace = false;

    loop {
        let start = p.position();
        let token = match p.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(out),
        };
        let skip = std::mem::take(&mut skip_whitespace);

        match token {
            Token::WhiteSpace(_) if skip => {}
            Token::Comma => {
                mode = initial;
                out.push(',');
            }
            Token::Delim('.') => {
                if p.try_parse(next_ident).is_ok() {
                    push_name(&mut out, mode, p.slice_from(start));
                } else {
                    out.push('.');
                }
            }
            Token::IDHash(_) => push_name(&mut out, mode, p.slice_from(start)),
            Token::Colon => match p.try_parse(mode_switch) {
                Ok(_) if in_switch => {
                    return Err(p.new_custom_error("nested :global/:local".to_string()));
                }
                Ok(Switch::Function(inner)) => {
                    let localized = p.parse_nested_block(|p| localize_block(p, inner, true))?;
                    match inner {
                        Mode::Global => out.push_str(localized.trim()),
                        Mode::Local => out.push_str(&localized),
                    }
                }
                Ok(Switch::Bare(next)) => {
                    mode = next;
                    skip_whitespace = out.is_empty() || out.ends_with(char::is_whitespace);
                }
                Err(_) => out.push(':'),
            },
            Token::Function(_) | Token::ParenthesisBlock => {
                out.push_str(p.slice_from(start));
                let inner = p.parse_nested_block(|p| localize_block(p, mode, in_switch))?;
                out.push_str(&inner);
                if p.slice_from(start).ends_with(')') {
                    out.push(')');
                }
            }
            Token::SquareBracketBlock | Token::CurlyBracketBlock => {
                skip_block(p)?;
                out.push_str(p.slice_from(start));
            }
            _ => out.push_str(p.slice_from(start)),
        }
    }
}

fn push_name(out: &mut String, mode: Mode, name: &str) {
    match mode {
        Mode::Local => {
            out.push_str(":local(");
            out.push_str(name);
            out.push(')');
        }
        Mode::Global => out.push_str(name),
    }
}

/// Replace every `.name`, `#name` and bare `name` inside `:local(...)` with
/// the result of `rename`, removing the `:local` wrapper.
///
/// Also used on declaration values and `@keyframes` preludes, where the
/// wrapped name is a bare identifier.
pub(super) fn rename_locals(
    text: &str,
    rename: &mut impl FnMut(&str) -> String,
) -> Result<String, String> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);
    rename_block(&mut parser, rename, false).map_err(|err| message(err, text))
}

fn rename_block<'i, F>(
    p: &mut Parser<'i, '_>,
    rename: &mut F,
    in_local: bool,
) -> Result<String, SelectorError<'i>>
where
    F: FnMut(&str) -> String,
{
    let mut out = String::new();

    loop {
        let start = p.position();
        let token = match p.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(_) => return Ok(out),
        };

        match token {
            Token::Colon if !in_local => match p.try_parse(mode_switch) {
                Ok(Switch::Function(Mode::Local)) => {
                    let renamed = p.parse_nested_block(|p| rename_block(p, rename, true))?;
                    out.push_str(&renamed);
                }
                Ok(Switch::Function(Mode::Global)) => {
                    skip_block(p)?;
                    out.push_str(p.slice_from(start));
                }
                Ok(Switch::Bare(_)) => out.push_str(p.slice_from(start)),
                Err(_) => out.push(':'),
            },
            Token::Delim('.') if in_local => {
                let name_start = p.position();
                if p.try_parse(next_ident).is_ok() {
                    out.push('.');
                    out.push_str(&rename(p.slice_from(name_start)));
                } else {
                    out.push('.');
                }
            }
            Token::IDHash(_) if in_local => {
                out.push('#');
                out.push_str(&rename(&p.slice_from(start)[1..]));
            }
            Token::Ident(_) if in_local => out.push_str(&rename(p.slice_from(start))),
            Token::Function(_) | Token::ParenthesisBlock => {
                out.push_str(p.slice_from(start));
                let inner = p.parse_nested_block(|p| rename_block(p, rename, in_local))?;
                out.push_str(&inner);
                let close = closing(&token);
                if p.slice_from(start).ends_with(close) {
                    out.push(close);
                }
            }
            Token::SquareBracketBlock | Token::CurlyBracketBlock => {
                skip_block(p)?;
                out.push_str(p.slice_from(start));
            }
            _ => out.push_str(p.slice_from(start)),
        }
    }
}

/// The class name if the selector is exactly one `:local(.name)`.
pub(super) fn single_local_class(selector: &str) -> Option<String> {
    let mut input = ParserInput::new(selector);
    let mut parser = Parser::new(&mut input);
    parser.parse_entirely(|p| single_class(p)).ok()
}

fn single_class<'i>(p: &mut Parser<'i, '_>) -> Result<String, ParseError<'i, ()>> {
    p.expect_colon()?;
    p.expect_function_matching("local")?;
    p.parse_nested_block(|p| {
        p.expect_delim('.')?;
        let start = p.position();
        let is_ident = matches!(p.next_including_whitespace()?, Token::Ident(_));
        if !is_ident {
            return Err(p.new_custom_error(()));
        }
        Ok(p.slice_from(start).to_string())
    })
}

/// Consume an identifier immediately following the current position.
fn next_ident<'i>(p: &mut Parser<'i, '_>) -> Result<(), BasicParseError<'i>> {
    let token = p.next_including_whitespace()?.clone();
    match token {
        Token::Ident(_) => Ok(()),
        _ => Err(p.new_basic_unexpected_token_error(token)),
    }
}

/// Recognize `global` / `local` (bare or functional) after a colon.
fn mode_switch<'i>(p: &mut Parser<'i, '_>) -> Result<Switch, BasicParseError<'i>> {
    let token = p.next_including_whitespace()?.clone();
    let (name, function) = match token {
        Token::Function(ref name) => (name.to_ascii_lowercase(), true),
        Token::Ident(ref name) => (name.to_ascii_lowercase(), false),
        _ => return Err(p.new_basic_unexpected_token_error(token)),
    };
    let mode = match name.as_str() {
        "global" => Mode::Global,
        "local" => Mode::Local,
        _ => return Err(p.new_basic_unexpected_token_error(token)),
    };
    Ok(if function {
        Switch::Function(mode)
    } else {
        Switch::Bare(mode)
    })
}

/// Consume the rest of the block just opened.
fn skip_block<'i>(p: &mut Parser<'i, '_>) -> Result<(), SelectorError<'i>> {
    p.parse_nested_block(|p| {
        while p.next_including_whitespace_and_comments().is_ok() {}
        Ok(())
    })
}

fn message(err: SelectorError<'_>, text: &str) -> String {
    match err.kind {
        ParseErrorKind::Custom(message) => format!("{message} in selector '{text}'"),
        ParseErrorKind::Basic(_) => format!("invalid selector '{text}'"),
    }
}
