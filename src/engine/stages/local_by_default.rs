//! Mark names local unless declared global.

use rustc_hash::FxHashSet;

use super::selector::localize_selector;
use super::{is_animation_prop, is_keyframes, Stage};
use crate::engine::value::map_idents;
use crate::engine::{CssModule, Node};
use crate::error::CssParseError;

/// Wraps class and id selectors, keyframes names and the animation names
/// that refer to them in `:local(...)`.
///
/// `:global(...)` and a bare `:global` opt out; see the selector rules on
/// [`Scope`](super::Scope). Rules inside `@keyframes` are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalByDefault;

impl Stage for LocalByDefault {
    fn name(&self) -> &str {
        "local-by-default"
    }

    fn process(&self, module: &mut CssModule) -> Result<(), CssParseError> {
        let mut keyframes = FxHashSet::default();
        let mut nodes = std::mem::take(&mut module.sheet.nodes);
        let result = localize_nodes(module, &mut nodes, &mut keyframes);
        module.sheet.nodes = nodes;
        result?;

        if keyframes.is_empty() {
            return Ok(());
        }

        module.sheet.for_each_mut(|node| {
            if let Node::Decl(decl) = node
                && is_animation_prop(&decl.prop)
            {
                decl.value = localize_animation(&decl.value, &keyframes);
            }
        });
        Ok(())
    }
}

fn localize_nodes(
    module: &CssModule,
    nodes: &mut [Node],
    keyframes: &mut FxHashSet<String>,
) -> Result<(), CssParseError> {
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                rule.selector = localize_selector(&rule.selector)
                    .map_err(|message| module.error_at(rule.offset, message))?;
                localize_nodes(module, &mut rule.nodes, keyframes)?;
            }
            Node::AtRule(at) if is_keyframes(&at.name) => {
                let params = at.params.trim();
                if let Some(inner) = params
                    .strip_prefix(":global(")
                    .and_then(|p| p.strip_suffix(')'))
                {
                    at.params = inner.trim().to_string();
                } else if let Some(inner) = params
                    .strip_prefix(":local(")
                    .and_then(|p| p.strip_suffix(')'))
                {
                    keyframes.insert(inner.trim().to_string());
                } else if !params.is_empty() {
                    keyframes.insert(params.to_string());
                    at.params = format!(":local({params})");
                }
            }
            Node::AtRule(at) => {
                if let Some(children) = &mut at.nodes {
                    localize_nodes(module, children, keyframes)?;
                }
            }
            Node::Decl(_) | Node::Comment(_) => {}
        }
    }
    Ok(())
}

/// Wrap identifiers naming local keyframes in `:local(...)`.
fn localize_animation(value: &str, keyframes: &FxHashSet<String>) -> String {
    map_idents(value, &mut |name| {
        keyframes.contains(name).then(|| format!(":local({name})"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::file::FileId;

    fn run(source: &str) -> Result<String, CssParseError> {
        let mut module = CssModule::parse(source, &FileId::new("/src/a.css"))?;
        LocalByDefault.process(&mut module)?;
        Ok(module.sheet.to_css())
    }

    #[test]
    fn test_rules_are_localized() {
        let css = run(".a .b { color: red; }\n:global(.app) { margin: 0; }").unwrap();
        assert!(css.contains(":local(.a) :local(.b) {"));
        assert!(css.contains(".app {"));
    }

    #[test]
    fn test_nested_in_media() {
        let css = run("@media print { .a { display: none; } }").unwrap();
        assert!(css.contains("  :local(.a) {"));
    }

    #[test]
    fn test_keyframes_and_animation() {
        let css = run(
            "@keyframes fade { from { opacity: 0; } 50.5% { opacity: .5; } }\n\
             .a { animation: fade 1s ease-in; animation-name: fade, other; }",
        )
        .unwrap();

        assert!(css.contains("@keyframes :local(fade) {"));
        assert!(css.contains("  from {"));
        assert!(css.contains("  50.5% {"));
        assert!(css.contains("animation: :local(fade) 1s ease-in;"));
        assert!(css.contains("animation-name: :local(fade), other;"));
    }

    #[test]
    fn test_animation_matches_whole_names() {
        let css = run("@keyframes fade {}\n.a { animation: fade-in 1s, fade 2s; }").unwrap();
        assert!(css.contains("animation: fade-in 1s, :local(fade) 2s;"));
    }

    #[test]
    fn test_global_keyframes() {
        let css = run("@keyframes :global(spin) { to { opacity: 1; } }\n.a { animation: spin 1s; }")
            .unwrap();
        assert!(css.contains("@keyframes spin {"));
        assert!(css.contains("animation: spin 1s;"));
    }

    #[test]
    fn test_invalid_selector_reports_position() {
        let err = run("\n:global(:local(.b)) { color: red; }").unwrap_err();
        assert_eq!(err.line, 2);
    }
}
