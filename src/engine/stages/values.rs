//! `@value` constants.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use super::{unquote, Stage};
use crate::engine::{replace_symbols, substitute_symbols, CssModule, Node};
use crate::error::CssParseError;

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(.+?)\s+from\s+("[^"]*"|'[^']*'|[\w-]+)$"#)
        .expect("value import pattern is valid")
});

static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w-]+)\s*:?\s*([\s\S]*)$").expect("value definition pattern is valid")
});

static ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([\w-]+)(?:\s+as\s+([\w-]+))?$").expect("value alias pattern is valid")
});

/// Defines, imports and substitutes `@value` constants.
///
/// ```css
/// @value primary: #0c77f8;
/// @value small: (max-width: 599px);
/// @value brand, accent as highlight from "./colors.css";
///
/// @media small { .a { color: primary; } }
/// ```
///
/// Values are substituted in declaration values and `@media` preludes only.
/// Every value is exported under its local name. Imported values become
/// temporary symbols that are linked once the referenced file is loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Values;

impl Stage for Values {
    fn name(&self) -> &str {
        "values"
    }

    fn process(&self, module: &mut CssModule) -> Result<(), CssParseError> {
        let mut definitions: IndexMap<String, String> = IndexMap::new();
        let mut nodes = std::mem::take(&mut module.sheet.nodes);
        let mut result = Ok(());

        nodes.retain(|node| {
            let Node::AtRule(at) = node else {
                return true;
            };
            if at.name != "value" || result.is_err() {
                return true;
            }
            result = define(module, &mut definitions, &at.params, at.offset);
            false
        });
        module.sheet.nodes = nodes;
        result?;

        if definitions.is_empty() {
            return Ok(());
        }

        substitute_symbols(&mut module.sheet, &definitions);

        for (name, value) in definitions {
            module.icss.exports.insert(name, value);
        }
        Ok(())
    }
}

fn define(
    module: &mut CssModule,
    definitions: &mut IndexMap<String, String>,
    params: &str,
    offset: usize,
) -> Result<(), CssParseError> {
    if let Some(caps) = IMPORT.captures(params) {
        let source = &caps[2];
        let reference = match unquote(source) {
            Some(path) => path.to_string(),
            None => definitions
                .get(source)
                .and_then(|value| unquote(value))
                .map(str::to_string)
                .ok_or_else(|| {
                    module.error_at(offset, format!("@value source '{source}' is not a path"))
                })?,
        };

        let names = caps[1].trim().trim_start_matches('(').trim_end_matches(')');
        for name in names.split(',') {
            let Some(alias) = ALIAS.captures(name.trim()) else {
                let message = format!("invalid @value import '{}'", name.trim());
                return Err(module.error_at(offset, message));
            };
            let remote = alias[1].to_string();
            let local = alias.get(2).map_or(remote.as_str(), |m| m.as_str()).to_string();
            let symbol = format!("i__value_{local}_{}", module.icss.symbol_count());
            module.icss.add_import(&reference, symbol.clone(), remote);
            definitions.insert(local, symbol);
        }
        return Ok(());
    }

    let Some(caps) = DEFINITION.captures(params.trim()) else {
        return Err(module.error_at(offset, format!("invalid @value definition '{params}'")));
    };
    let value = caps[2].trim();
    if value.is_empty() {
        return Err(module.error_at(offset, format!("@value '{}' has no value", &caps[1])));
    }
    let value = replace_symbols(value, definitions);
    definitions.insert(caps[1].to_string(), value);
    Ok(())
}
