//! CSS scoping engine.
//!
//! Turns one stylesheet into scoped CSS plus an export token mapping:
//!
//! ```text
//! source ──► parse ──► stages ──────────────► fetch imports ──► link ──► LoadResult
//!                      │ before…              │ (concurrent)
//!                      │ Values               │
//!                      │ LocalByDefault       └─► ImportResolver::resolve
//!                      │ ExtractImports
//!                      │ Scope
//!                      │ …after
//! ```
//!
//! Stages communicate through the ICSS symbol table ([`Icss`]): imports
//! map temporary local symbols to names exported by another file, and
//! exports become the file's token mapping once linked.

pub mod ast;
mod name;
mod parser;
mod resolve;
pub mod stages;
mod value;

use std::sync::Arc;

use futures_util::future::{try_join_all, BoxFuture};
use indexmap::IndexMap;
use tracing::trace;

pub use ast::{AtRule, Declaration, Node, Rule, Stylesheet};
pub use name::{generate_long_name, LongNameGenerator, ScopedNameGenerator};
pub use parser::parse;
pub use resolve::{ImportResolver, ImportTrace, StaticResolver};
pub use stages::{ExtractImports, LocalByDefault, Scope, Stage, Values};

use crate::error::{CssParseError, Result};
use crate::resource::file::FileId;

/// Mapping from author-written names to generated names, in export order.
pub type ExportTokens = IndexMap<String, String>;

/// Output of loading one stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    /// Scoped CSS, ready to inject.
    pub injectable_source: String,
    /// Local name → scoped name(s).
    pub export_tokens: ExportTokens,
}

/// Interoperable symbol table shared by the stages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Icss {
    /// Reference (unquoted, as written) → local symbol → remote name.
    pub imports: IndexMap<String, IndexMap<String, String>>,
    /// Exported name → value (may contain unlinked local symbols).
    pub exports: IndexMap<String, String>,
}

impl Icss {
    /// Register a reference with no imported names.
    pub fn add_dependency(&mut self, reference: &str) {
        self.imports.entry(reference.to_string()).or_default();
    }

    /// Import `remote` from `reference` as the local symbol `local`.
    pub fn add_import(&mut self, reference: &str, local: String, remote: String) {
        self.imports
            .entry(reference.to_string())
            .or_default()
            .insert(local, remote);
    }

    /// Find the local symbol already bound to `remote` from `reference`.
    pub fn find_import(&self, reference: &str, remote: &str) -> Option<&str> {
        self.imports
            .get(reference)?
            .iter()
            .find(|(_, r)| r.as_str() == remote)
            .map(|(local, _)| local.as_str())
    }

    /// Whether `symbol` is a local symbol bound by some import.
    pub fn is_imported_symbol(&self, symbol: &str) -> bool {
        self.imports.values().any(|names| names.contains_key(symbol))
    }

    /// Total number of imported symbols, used to keep symbols unique.
    pub fn symbol_count(&self) -> usize {
        self.imports.values().map(IndexMap::len).sum()
    }
}

/// A stylesheet moving through the stages.
#[derive(Debug, Clone)]
pub struct CssModule {
    /// File the stylesheet was loaded from.
    pub id: FileId,
    /// Original source text.
    pub source: String,
    /// Syntax tree, rewritten in place by the stages.
    pub sheet: Stylesheet,
    /// Symbols collected by the stages.
    pub icss: Icss,
}

impl CssModule {
    /// Parse `source` into a module.
    pub fn parse(source: &str, id: &FileId) -> Result<Self, CssParseError> {
        Ok(Self {
            id: id.clone(),
            source: source.to_string(),
            sheet: parse(source, id)?,
            icss: Icss::default(),
        })
    }

    /// Error located at `offset` in this module's source.
    pub fn error_at(&self, offset: usize, message: impl Into<String>) -> CssParseError {
        CssParseError::at(self.id.clone(), &self.source, offset, message)
    }

    /// Error not tied to a location.
    pub fn error(&self, message: impl Into<String>) -> CssParseError {
        CssParseError::new(self.id.clone(), message)
    }
}

/// The scoping engine boundary.
pub trait ScopingEngine: Send + Sync {
    /// Load the stylesheet `code` of file `trace.current()`, resolving its
    /// imports through `resolver`.
    fn load<'a>(
        &'a self,
        code: &'a str,
        trace: &'a ImportTrace,
        resolver: &'a dyn ImportResolver,
    ) -> BoxFuture<'a, Result<LoadResult>>;
}

/// Stage-pipeline engine.
///
/// # Example
///
/// ```ignore
/// let core = Core::with_defaults(Arc::new(LongNameGenerator::new(root)), vec![], vec![]);
/// let result = core.load(code, &ImportTrace::new(id), &resolver).await?;
/// ```
pub struct Core {
    stages: Vec<Arc<dyn Stage>>,
}

impl Core {
    /// Create an engine running `stages` in order.
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Create an engine with the default stages, with `before` and `after`
    /// spliced around them.
    pub fn with_defaults(
        generator: Arc<dyn ScopedNameGenerator>,
        before: Vec<Arc<dyn Stage>>,
        after: Vec<Arc<dyn Stage>>,
    ) -> Self {
        let mut stages = before;
        stages.extend(Self::default_stages(generator));
        stages.extend(after);
        Self::new(stages)
    }

    /// `Values`, `LocalByDefault`, `ExtractImports`, `Scope`.
    pub fn default_stages(generator: Arc<dyn ScopedNameGenerator>) -> Vec<Arc<dyn Stage>> {
        vec![
            Arc::new(Values),
            Arc::new(LocalByDefault),
            Arc::new(ExtractImports),
            Arc::new(Scope::new(generator)),
        ]
    }

    /// Names of the configured stages, in order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Parse and run every stage, without touching imports.
    pub fn process(&self, code: &str, id: &FileId) -> Result<CssModule, CssParseError> {
        let mut module = CssModule::parse(code, id)?;
        for stage in &self.stages {
            trace!(stage = stage.name(), file = %id, "running stage");
            stage.process(&mut module)?;
        }
        Ok(module)
    }
}

impl ScopingEngine for Core {
    fn load<'a>(
        &'a self,
        code: &'a str,
        trace: &'a ImportTrace,
        resolver: &'a dyn ImportResolver,
    ) -> BoxFuture<'a, Result<LoadResult>> {
        Box::pin(async move {
            let module = self.process(code, trace.current())?;
            let resolved = try_join_all(
                module
                    .icss
                    .imports
                    .keys()
                    .map(|reference| resolver.resolve(reference, trace)),
            )
            .await?;
            Ok(link(module, &resolved)?)
        })
    }
}

/// Replace whole identifiers in `text` using `map`. Strings, urls and
/// hashes are left as written.
pub fn replace_symbols(text: &str, map: &IndexMap<String, String>) -> String {
    value::map_idents(text, &mut |name| map.get(name).cloned())
}

/// Replace symbols in declaration values and `@media` preludes.
///
/// Other at-rule preludes (`@import`, `@keyframes`, ...) name files and
/// identifiers, not values, and are left alone.
pub(crate) fn substitute_symbols(sheet: &mut Stylesheet, map: &IndexMap<String, String>) {
    sheet.for_each_mut(|node| match node {
        Node::Decl(decl) => decl.value = replace_symbols(&decl.value, map),
        Node::AtRule(at) if at.name.eq_ignore_ascii_case("media") => {
            at.params = replace_symbols(&at.params, map);
        }
        _ => {}
    });
}

/// Substitute imported tokens for local symbols and produce the result.
///
/// `resolved` holds the tokens of each import, in `module.icss.imports`
/// order.
fn link(mut module: CssModule, resolved: &[ExportTokens]) -> Result<LoadResult, CssParseError> {
    let mut translations = IndexMap::new();
    for ((reference, names), tokens) in module.icss.imports.iter().zip(resolved) {
        for (local, remote) in names {
            let value = tokens.get(remote).ok_or_else(|| {
                module.error(format!("'{remote}' is not exported by \"{reference}\""))
            })?;
            translations.insert(local.clone(), value.clone());
        }
    }

    if !translations.is_empty() {
        substitute_symbols(&mut module.sheet, &translations);
        for value in module.icss.exports.values_mut() {
            *value = replace_symbols(value, &translations);
        }
    }

    Ok(LoadResult {
        injectable_source: module.sheet.to_css(),
        export_tokens: module.icss.exports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn core() -> Core {
        Core::with_defaults(Arc::new(LongNameGenerator::new("/project")), vec![], vec![])
    }

    fn tokens(pairs: &[(&str, &str)]) -> ExportTokens {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_stage_order() {
        assert_eq!(
            core().stage_names(),
            ["values", "local-by-default", "extract-imports", "scope"]
        );
    }

    #[test]
    fn test_before_and_after_are_spliced() {
        struct Named(&'static str);
        impl Stage for Named {
            fn name(&self) -> &str {
                self.0
            }
            fn process(&self, _: &mut CssModule) -> Result<(), CssParseError> {
                Ok(())
            }
        }

        let core = Core::with_defaults(
            Arc::new(LongNameGenerator::new("/")),
            vec![Arc::new(Named("first"))],
            vec![Arc::new(Named("last"))],
        );
        let names = core.stage_names();
        assert_eq!(names.first(), Some(&"first"));
        assert_eq!(names.last(), Some(&"last"));
        assert_eq!(names.len(), 6);
    }

    #[tokio::test]
    async fn test_load_local_classes() {
        let id = FileId::new("/project/src/button.css");
        let result = core()
            .load(
                ".primary { color: red; }\n.primary:hover { color: blue; }",
                &ImportTrace::new(id),
                &StaticResolver::new(),
            )
            .await
            .unwrap();

        assert_eq!(result.export_tokens, tokens(&[("primary", "_src_button__primary")]));
        assert_eq!(
            result.injectable_source,
            "._src_button__primary {\n  color: red;\n}\n._src_button__primary:hover {\n  color: blue;\n}\n"
        );
    }

    #[tokio::test]
    async fn test_load_links_composed_imports() {
        let id = FileId::new("/project/src/button.css");
        let resolver =
            StaticResolver::new().with("./base.css", tokens(&[("base", "_src_base__base")]));

        let result = core()
            .load(
                ".button { composes: base from \"./base.css\"; color: red; }",
                &ImportTrace::new(id),
                &resolver,
            )
            .await
            .unwrap();

        assert_eq!(result.export_tokens["button"], "_src_button__button _src_base__base");
        assert!(!result.injectable_source.contains("composes"));
        assert!(!result.injectable_source.contains("i__imported"));
    }

    #[tokio::test]
    async fn test_load_links_imported_values() {
        let id = FileId::new("/project/src/button.css");
        let resolver = StaticResolver::new().with("./colors.css", tokens(&[("brand", "#f00")]));

        let result = core()
            .load(
                "@value brand from \"./colors.css\";\n.a { color: brand; }",
                &ImportTrace::new(id),
                &resolver,
            )
            .await
            .unwrap();

        assert!(result.injectable_source.contains("color: #f00;"));
        assert_eq!(result.export_tokens["brand"], "#f00");
    }

    #[tokio::test]
    async fn test_load_missing_export() {
        let id = FileId::new("/project/src/button.css");
        let resolver = StaticResolver::new().with("./base.css", tokens(&[("other", "_x")]));

        let err = core()
            .load(
                ".button { composes: base from \"./base.css\"; }",
                &ImportTrace::new(id),
                &resolver,
            )
            .await
            .unwrap_err();

        let parse = err.css_parse().expect("parse error");
        assert!(parse.message.contains("'base' is not exported"));
    }

    #[tokio::test]
    async fn test_load_propagates_resolver_error() {
        let id = FileId::new("/project/src/button.css");
        let err = core()
            .load(
                ".button { composes: base from \"./missing.css\"; }",
                &ImportTrace::new(id),
                &StaticResolver::new(),
            )
            .await
            .unwrap_err();

        assert!(err.is_file_error());
    }

    #[test]
    fn test_replace_symbols_whole_words() {
        let map = tokens(&[("brand", "red")]);
        assert_eq!(replace_symbols("brand brand-dark brand", &map), "red brand-dark red");
    }

    #[test]
    fn test_substitute_symbols_only_in_values_and_media() {
        let id = FileId::new("/project/a.css");
        let mut sheet = parse(
            "@import \"./theme.css\";\n@supports (display: theme) {}\n\
             @media theme { .a { color: theme; } }",
            &id,
        )
        .unwrap();
        substitute_symbols(&mut sheet, &tokens(&[("theme", "print")]));

        let css = sheet.to_css();
        assert!(css.contains("@import \"./theme.css\";"));
        assert!(css.contains("@supports (display: theme)"));
        assert!(css.contains("@media print {"));
        assert!(css.contains("color: print;"));
    }
}
