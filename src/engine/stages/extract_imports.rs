//! `composes … from` and `@import` references.

use std::sync::LazyLock;

use regex::Regex;

use super::{unquote, Stage};
use crate::engine::{CssModule, Node};
use crate::error::CssParseError;

static COMPOSES_FROM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([\w\s-]+?)\s+from\s+("[^"]+"|'[^']+'|global)$"#)
        .expect("composes pattern is valid")
});

static NAMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+(?:\s+[\w-]+)*$").expect("names pattern is valid"));

static IMPORT_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:url\(\s*)?("[^"]+"|'[^']+'|[^\s)"']+)\s*\)?"#)
        .expect("import pattern is valid")
});

/// Turns cross-file references into ICSS imports.
///
/// - `composes: a b from "./x.css"` imports `a` and `b` as temporary
///   symbols and rewrites the declaration to use them
/// - `composes: a from global` rewrites to `global(a)` (unscoped)
/// - `@import "./x.css";` registers `./x.css` as a dependency and removes
///   the rule; its CSS ends up in the imported bucket instead
///
/// Remote imports (`http:`, `https:`, protocol-relative) are kept as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractImports;

impl Stage for ExtractImports {
    fn name(&self) -> &str {
        "extract-imports"
    }

    fn process(&self, module: &mut CssModule) -> Result<(), CssParseError> {
        let mut nodes = std::mem::take(&mut module.sheet.nodes);
        let result = extract_at_imports(module, &mut nodes)
            .and_then(|()| extract_composes(module, &mut nodes));
        module.sheet.nodes = nodes;
        result
    }
}

fn extract_at_imports(module: &mut CssModule, nodes: &mut Vec<Node>) -> Result<(), CssParseError> {
    let mut result = Ok(());
    nodes.retain(|node| {
        let Node::AtRule(at) = node else {
            return true;
        };
        if !at.name.eq_ignore_ascii_case("import") || result.is_err() {
            return true;
        }
        let Some(caps) = IMPORT_URL.captures(&at.params) else {
            result = Err(module.error_at(at.offset, format!("invalid @import '{}'", at.params)));
            return true;
        };
        let target = &caps[1];
        let target = unquote(target).unwrap_or(target);
        if is_remote(target) {
            return true;
        }
        module.icss.add_dependency(target);
        false
    });
    result
}

fn extract_composes(module: &mut CssModule, nodes: &mut [Node]) -> Result<(), CssParseError> {
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                for child in &mut rule.nodes {
                    if let Node::Decl(decl) = child
                        && (decl.prop == "composes" || decl.prop == "compose-with")
                    {
                        decl.prop = "composes".to_string();
                        decl.value = rewrite_composes(module, &decl.value, decl.offset)?;
                    }
                }
            }
            Node::AtRule(at) => {
                if let Some(children) = &mut at.nodes {
                    extract_composes(module, children)?;
                }
            }
            Node::Decl(_) | Node::Comment(_) => {}
        }
    }
    Ok(())
}

fn rewrite_composes(
    module: &mut CssModule,
    value: &str,
    offset: usize,
) -> Result<String, CssParseError> {
    let value = value.trim();
    let Some(caps) = COMPOSES_FROM.captures(value) else {
        if NAMES.is_match(value) && !value.split_whitespace().any(|word| word == "from") {
            return Ok(value.to_string());
        }
        return Err(module.error_at(offset, format!("invalid composes '{value}'")));
    };

    let names = caps[1].split_whitespace();
    let source = &caps[2];
    if source == "global" {
        return Ok(names
            .map(|name| format!("global({name})"))
            .collect::<Vec<_>>()
            .join(" "));
    }

    let reference = unquote(source).unwrap_or(source).to_string();
    let mut symbols = Vec::new();
    for name in names {
        let symbol = match module.icss.find_import(&reference, name) {
            Some(existing) => existing.to_string(),
            None => {
                let symbol = format!("i__imported_{}_{}", name, module.icss.symbol_count());
                module
                    .icss
                    .add_import(&reference, symbol.clone(), name.to_string());
                symbol
            }
        };
        symbols.push(symbol);
    }
    Ok(symbols.join(" "))
}

fn is_remote(target: &str) -> bool {
    target.starts_with("//") || target.contains("://") || target.starts_with("data:")
}
