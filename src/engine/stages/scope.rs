//! Rename local names and build the exports.

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use super::selector::{rename_locals, single_local_class};
use super::{is_keyframes, Stage};
use crate::engine::{CssModule, Node, ScopedNameGenerator};
use crate::error::CssParseError;

/// Replaces every `:local(...)` name with its scoped name and exports it.
///
/// `composes` declarations are folded into the exports of the rule's class:
///
/// ```css
/// .button { composes: base from "./base.css"; composes: rounded; color: red; }
/// ```
///
/// exports `button` as `"<button> <base> <rounded>"`. Composition is only
/// allowed in a rule whose selector is a single local class. Local
/// compositions are transitive and may refer forward; a composition cycle is
/// an error.
pub struct Scope {
    generator: Arc<dyn ScopedNameGenerator>,
}

impl Scope {
    /// Create the stage with the given name generator.
    pub fn new(generator: Arc<dyn ScopedNameGenerator>) -> Self {
        Self { generator }
    }
}

/// A `composes` declaration waiting for every class to be known.
#[derive(Debug, Clone)]
struct Composition {
    class: String,
    names: Vec<String>,
    offset: usize,
}

/// Resolves compositions depth-first, memoizing each class.
struct Composer<'a> {
    module: &'a CssModule,
    exports: &'a IndexMap<String, Vec<String>>,
    pending: IndexMap<String, Vec<Composition>>,
    resolved: FxHashMap<String, Vec<String>>,
    visiting: FxHashSet<String>,
}

impl<'a> Composer<'a> {
    fn new(
        module: &'a CssModule,
        exports: &'a IndexMap<String, Vec<String>>,
        compositions: Vec<Composition>,
    ) -> Self {
        let mut pending: IndexMap<String, Vec<Composition>> = IndexMap::new();
        for composition in compositions {
            pending
                .entry(composition.class.clone())
                .or_default()
                .push(composition);
        }
        Self {
            module,
            exports,
            pending,
            resolved: FxHashMap::default(),
            visiting: FxHashSet::default(),
        }
    }

    /// Every scoped name `class` stands for, its own first.
    fn resolve(&mut self, class: &str, offset: usize) -> Result<Vec<String>, CssParseError> {
        if let Some(names) = self.resolved.get(class) {
            return Ok(names.clone());
        }
        let Some(own) = self.exports.get(class) else {
            return Err(self.module.error_at(
                offset,
                format!("referenced class name '{class}' in composes not found"),
            ));
        };
        if !self.visiting.insert(class.to_string()) {
            return Err(self
                .module
                .error_at(offset, format!("circular composition of class '{class}'")));
        }

        let mut names = own.clone();
        let compositions = self.pending.get(class).cloned().unwrap_or_default();
        for composition in &compositions {
            for name in &composition.names {
                let composed = if let Some(global) = name
                    .strip_prefix("global(")
                    .and_then(|n| n.strip_suffix(')'))
                {
                    vec![global.to_string()]
                } else if self.module.icss.is_imported_symbol(name) {
                    vec![name.clone()]
                } else {
                    self.resolve(name, composition.offset)?
                };
                for name in composed {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
        }

        self.visiting.remove(class);
        self.resolved.insert(class.to_string(), names.clone());
        Ok(names)
    }
}

impl Stage for Scope {
    fn name(&self) -> &str {
        "scope"
    }

    fn process(&self, module: &mut CssModule) -> Result<(), CssParseError> {
        let mut exports: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut compositions = Vec::new();

        let mut nodes = std::mem::take(&mut module.sheet.nodes);
        let result = self.scope_nodes(module, &mut nodes, &mut exports, &mut compositions);
        module.sheet.nodes = nodes;
        result?;

        let composed = {
            let mut composer = Composer::new(module, &exports, compositions);
            let classes: Vec<_> = composer
                .pending
                .values()
                .filter_map(|list| list.first())
                .map(|first| (first.class.clone(), first.offset))
                .collect();
            let mut composed = Vec::with_capacity(classes.len());
            for (class, offset) in classes {
                let names = composer.resolve(&class, offset)?;
                composed.push((class, names));
            }
            composed
        };
        for (class, names) in composed {
            exports.insert(class, names);
        }

        for (name, values) in exports {
            module.icss.exports.insert(name, values.join(" "));
        }
        Ok(())
    }
}

impl Scope {
    fn scoped(&self, module: &CssModule, name: &str) -> String {
        self.generator.generate(name, &module.id, &module.source)
    }

    fn export(
        &self,
        module: &CssModule,
        exports: &mut IndexMap<String, Vec<String>>,
        name: &str,
    ) -> String {
        let scoped = self.scoped(module, name);
        let entry = exports.entry(name.to_string()).or_default();
        if !entry.contains(&scoped) {
            entry.push(scoped.clone());
        }
        scoped
    }

    /// Replace the `:local(...)` names in `text`, exporting each.
    fn rename(
        &self,
        module: &CssModule,
        exports: &mut IndexMap<String, Vec<String>>,
        text: &str,
    ) -> Result<String, String> {
        rename_locals(text, &mut |name| self.export(module, exports, name))
    }

    fn scope_nodes(
        &self,
        module: &CssModule,
        nodes: &mut [Node],
        exports: &mut IndexMap<String, Vec<String>>,
        compositions: &mut Vec<Composition>,
    ) -> Result<(), CssParseError> {
        for node in nodes {
            match node {
                Node::Rule(rule) => {
                    let single = single_local_class(&rule.selector);
                    rule.selector = self
                        .rename(module, exports, &rule.selector)
                        .map_err(|message| module.error_at(rule.offset, message))?;

                    let mut failed = None;
                    rule.nodes.retain(|child| {
                        let Node::Decl(decl) = child else {
                            return true;
                        };
                        if decl.prop != "composes" {
                            return true;
                        }
                        match &single {
                            Some(class) => compositions.push(Composition {
                                class: class.clone(),
                                names: decl.value.split_whitespace().map(str::to_string).collect(),
                                offset: decl.offset,
                            }),
                            None => {
                                failed.get_or_insert(decl.offset);
                            }
                        }
                        false
                    });
                    if let Some(offset) = failed {
                        return Err(module.error_at(
                            offset,
                            "composition is only allowed when selector is single :local class name",
                        ));
                    }

                    self.scope_nodes(module, &mut rule.nodes, exports, compositions)?;
                }
                Node::AtRule(at) => {
                    if is_keyframes(&at.name) && at.params.contains(":local(") {
                        at.params = self
                            .rename(module, exports, &at.params)
                            .map_err(|message| module.error_at(at.offset, message))?;
                    }
                    if let Some(children) = &mut at.nodes {
                        self.scope_nodes(module, children, exports, compositions)?;
                    }
                }
                Node::Decl(decl) => {
                    if decl.value.contains(":local(") {
                        decl.value = self
                            .rename(module, exports, &decl.value)
                            .map_err(|message| module.error_at(decl.offset, message))?;
                    }
                }
                Node::Comment(_) => {}
            }
        }
        Ok(())
    }
}
