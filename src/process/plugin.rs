//! The bundler-facing plugin.

use std::sync::Arc;

use tracing::{debug, instrument, trace};

use super::intro::{export_tokens, inject_css};
use super::loader::ModuleLoader;
use super::state::{Bucket, BuildState};
use crate::config::Config;
use crate::engine::{Core, ImportTrace, ScopingEngine};
use crate::error::Result;
use crate::resource::file::{DiskLoader, FileId, FileLoader};

/// Output of a handled transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    /// Module body: `export default {…tokens};`.
    pub code: String,
    /// Imported files read while loading, for the host's watcher.
    pub dependencies: Vec<FileId>,
}

/// CSS modules plugin for one build.
///
/// Owns the accumulated CSS. Transforms may run concurrently against a
/// shared reference; [`intro`](Self::intro) should be called once every
/// transform has finished.
///
/// # Example
///
/// ```ignore
/// let plugin = CssModulesPlugin::new(ConfigBuilder::new().root("/project").build()?);
///
/// if let Some(output) = plugin.transform(code, "/project/src/button.css").await? {
///     emit_module(output.code);
/// }
/// let intro = plugin.intro();
/// ```
pub struct CssModulesPlugin {
    config: Config,
    engine: Arc<dyn ScopingEngine>,
    files: Arc<dyn FileLoader>,
    state: BuildState,
}

impl CssModulesPlugin {
    /// Plugin name reported to the host.
    pub const NAME: &'static str = "css-module-inject";

    /// Create a plugin reading imports from disk.
    pub fn new(config: Config) -> Self {
        Self::with_loader(config, Arc::new(DiskLoader))
    }

    /// Create a plugin reading imports through `files`.
    pub fn with_loader(config: Config, files: Arc<dyn FileLoader>) -> Self {
        let engine = Core::with_defaults(
            Arc::clone(config.generator()),
            config.before().to_vec(),
            config.after().to_vec(),
        );
        Self {
            config,
            engine: Arc::new(engine),
            files,
            state: BuildState::new(),
        }
    }

    /// Replace the scoping engine.
    pub fn with_engine(mut self, engine: impl ScopingEngine + 'static) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    /// Plugin name reported to the host.
    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    /// The configuration this plugin was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// CSS accumulated so far.
    pub fn state(&self) -> &BuildState {
        &self.state
    }

    /// Transform the module `id` with source `code`.
    ///
    /// Returns `Ok(None)` for ids this plugin does not handle. Otherwise the
    /// stylesheet and its imports are loaded, its CSS is stored in the
    /// global or local bucket, and the module body exporting its tokens is
    /// returned. On error nothing is stored for `id`.
    #[instrument(skip(self, code))]
    pub async fn transform(&self, code: &str, id: &str) -> Result<Option<TransformOutput>> {
        if !self.config.handles(id) {
            trace!("not handled");
            return Ok(None);
        }

        let file = FileId::within(self.config.root(), id);
        let loader = ModuleLoader::new(self.engine.as_ref(), self.files.as_ref(), &self.state);
        let result = loader.load_css(code, &ImportTrace::new(file.clone())).await?;

        let bucket = if self.config.is_global(&file) {
            Bucket::Global
        } else {
            Bucket::Local
        };
        debug!(?bucket, tokens = result.export_tokens.len(), "transformed");

        let code = export_tokens(&result.export_tokens);
        self.state.insert(bucket, file, result.injectable_source);
        Ok(Some(TransformOutput {
            code,
            dependencies: loader.into_dependencies(),
        }))
    }

    /// Bundle intro injecting all accumulated CSS.
    ///
    /// Global CSS comes first, then imported, then local, each in insertion
    /// order. Does not modify the state.
    pub fn intro(&self) -> String {
        inject_css(&self.state.concat())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::future::{self, BoxFuture};

    use super::*;
    use crate::config::ConfigBuilder;
    use crate::engine::{ExportTokens, ImportResolver, LoadResult};
    use crate::error::Error;
    use crate::resource::file::MemoryLoader;

    fn plugin(builder: ConfigBuilder, files: &Arc<MemoryLoader>) -> CssModulesPlugin {
        let config = builder.root("/p").build().unwrap();
        CssModulesPlugin::with_loader(config, files.clone())
    }

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("{needle} not found"))
    }

    #[tokio::test]
    async fn test_local_module() {
        let files = Arc::new(MemoryLoader::new());
        let plugin = plugin(ConfigBuilder::new(), &files);

        let output = plugin
            .transform(".a { color: red; }", "/p/src/a.css")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(output.code, r#"export default {"a":"_src_a__a"};"#);
        assert!(output.dependencies.is_empty());
        assert_eq!(plugin.state().ids(Bucket::Local), [FileId::new("/p/src/a.css")]);
        assert_eq!(plugin.state().len(Bucket::Global), 0);
        assert_eq!(plugin.state().len(Bucket::Imported), 0);
    }

    #[tokio::test]
    async fn test_global_module() {
        let files = Arc::new(MemoryLoader::new());
        let plugin = plugin(ConfigBuilder::new().global("src/global.css"), &files);

        plugin
            .transform(".reset { margin: 0; }", "/p/src/global.css")
            .await
            .unwrap();

        assert_eq!(plugin.state().ids(Bucket::Global), [FileId::new("/p/src/global.css")]);
        assert_eq!(plugin.state().len(Bucket::Local), 0);
        assert_eq!(plugin.state().len(Bucket::Imported), 0);
    }

    #[tokio::test]
    async fn test_import_chain_order() {
        let files = Arc::new(
            MemoryLoader::new()
                .with_file("/p/src/b.css", "@import \"./c.css\";\n.b { color: blue; }")
                .with_file("/p/src/c.css", ".c { color: green; }"),
        );
        let plugin = plugin(ConfigBuilder::new(), &files);

        let output = plugin
            .transform("@import \"./b.css\";\n.a { color: red; }", "/p/src/a.css")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            plugin.state().ids(Bucket::Imported),
            [FileId::new("/p/src/c.css"), FileId::new("/p/src/b.css")]
        );
        assert_eq!(
            output.dependencies,
            [FileId::new("/p/src/b.css"), FileId::new("/p/src/c.css")]
        );

        let intro = plugin.intro();
        let c = position(&intro, "._src_c__c");
        let b = position(&intro, "._src_b__b");
        let a = position(&intro, "._src_a__a");
        assert!(c < b && b < a);
    }

    #[tokio::test]
    async fn test_diamond_stores_shared_import_once() {
        let files = Arc::new(
            MemoryLoader::new()
                .with_file("/p/b.css", "@import \"./d.css\";\n.b { color: blue; }")
                .with_file("/p/c.css", "@import \"./d.css\";\n.c { color: green; }")
                .with_file("/p/d.css", ".d { color: black; }"),
        );
        let plugin = plugin(ConfigBuilder::new(), &files);

        plugin
            .transform("@import \"./b.css\";\n@import \"./c.css\";", "/p/a.css")
            .await
            .unwrap();

        let imported = plugin.state().ids(Bucket::Imported);
        assert_eq!(imported.len(), 3);
        let d = FileId::new("/p/d.css");
        assert_eq!(imported.iter().filter(|id| **id == d).count(), 1);
        assert_eq!(files.read_count("/p/d.css"), 2);
        assert_eq!(plugin.intro().matches("._d__d").count(), 1);
    }

    #[tokio::test]
    async fn test_composes_links_tokens() {
        let files =
            Arc::new(MemoryLoader::new().with_file("/p/src/base.css", ".base { padding: 0; }"));
        let plugin = plugin(ConfigBuilder::new(), &files);

        let output = plugin
            .transform(
                ".button { composes: base from \"./base.css\"; color: red; }",
                "/p/src/button.css",
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            output.code,
            r#"export default {"button":"_src_button__button _src_base__base"};"#
        );
        assert_eq!(output.dependencies, [FileId::new("/p/src/base.css")]);
    }

    #[tokio::test]
    async fn test_value_alongside_import() {
        let files = Arc::new(MemoryLoader::new().with_file("/p/src/theme.css", ".t { top: 0; }"));
        let plugin = plugin(ConfigBuilder::new(), &files);

        let output = plugin
            .transform(
                "@value theme: #fff;\n@import \"./theme.css\";\n.a { color: theme; }",
                "/p/src/a.css",
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(output.code, r##"export default {"theme":"#fff","a":"_src_a__a"};"##);
        assert_eq!(output.dependencies, [FileId::new("/p/src/theme.css")]);
        assert_eq!(plugin.state().ids(Bucket::Imported), [FileId::new("/p/src/theme.css")]);
        let intro = plugin.intro();
        assert!(intro.contains("color: #fff;"));
        assert!(!intro.contains("@import"));
    }

    #[tokio::test]
    async fn test_value_alongside_composes_from() {
        let files = Arc::new(MemoryLoader::new().with_file(
            "/p/src/base.css",
            "@value brand: red;\n.base { color: brand; }",
        ));
        let plugin = plugin(ConfigBuilder::new(), &files);

        let output = plugin
            .transform(
                "@value brand from \"./base.css\";\n\
                 .button { composes: base from \"./base.css\"; border-color: brand; }",
                "/p/src/button.css",
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            output.code,
            r#"export default {"brand":"red","button":"_src_button__button _src_base__base"};"#
        );
        assert_eq!(output.dependencies, [FileId::new("/p/src/base.css")]);
        assert_eq!(files.read_count("/p/src/base.css"), 1);
        let intro = plugin.intro();
        assert!(intro.contains("._src_base__base {\n  color: red;\n}"));
        assert!(intro.contains("border-color: red;"));
    }

    #[tokio::test]
    async fn test_transitive_forward_composes() {
        let files = Arc::new(MemoryLoader::new());
        let plugin = plugin(ConfigBuilder::new(), &files);

        let output = plugin
            .transform(
                ".a { composes: b; }\n.b { composes: c; }\n.c { color: red; }",
                "/p/src/a.css",
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            output.code,
            r#"export default {"a":"_src_a__a _src_a__b _src_a__c","b":"_src_a__b _src_a__c","c":"_src_a__c"};"#
        );
    }

    #[tokio::test]
    async fn test_composition_cycle_fails() {
        let files = Arc::new(MemoryLoader::new());
        let plugin = plugin(ConfigBuilder::new(), &files);

        let err = plugin
            .transform(".a { composes: b; }\n.b { composes: a; }", "/p/src/a.css")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CssParse(ref e) if e.message.contains("circular")));
        assert_eq!(plugin.state().len(Bucket::Local), 0);
    }

    #[tokio::test]
    async fn test_filtered_ids_are_skipped() {
        let files = Arc::new(MemoryLoader::new().with_file("/p/lib/b.css", ".b {}"));
        let plugin = plugin(ConfigBuilder::new().include("src/**"), &files);

        let code = "@import \"./b.css\";";
        assert_eq!(plugin.transform(code, "/p/lib/a.css").await.unwrap(), None);
        assert_eq!(plugin.transform(code, "/p/src/a.js").await.unwrap(), None);
        assert_eq!(plugin.transform(code, "\0/p/src/a.css").await.unwrap(), None);

        assert_eq!(files.read_count("/p/lib/b.css"), 0);
        assert!(plugin.state().is_empty());
    }

    #[tokio::test]
    async fn test_intro_is_idempotent() {
        let files = Arc::new(MemoryLoader::new());
        let plugin = plugin(ConfigBuilder::new(), &files);
        plugin.transform(".a { color: red; }", "/p/a.css").await.unwrap();

        let first = plugin.intro();
        assert_eq!(first, plugin.intro());
        assert!(first.contains("._a__a {"));
    }

    #[tokio::test]
    async fn test_intro_bucket_order() {
        let files = Arc::new(MemoryLoader::new().with_file("/p/shared.css", ".shared { top: 0; }"));
        let plugin = plugin(ConfigBuilder::new().global("global.css"), &files);

        plugin.transform(".local { top: 0; }", "/p/local.css").await.unwrap();
        plugin
            .transform("@import \"./shared.css\";\n.global { top: 0; }", "/p/global.css")
            .await
            .unwrap();

        let intro = plugin.intro();
        let global = position(&intro, "._global__global");
        let shared = position(&intro, "._shared__shared");
        let local = position(&intro, "._local__local");
        assert!(global < shared && shared < local);
    }

    #[tokio::test]
    async fn test_missing_import_fails_without_entries() {
        let files = Arc::new(MemoryLoader::new());
        let plugin = plugin(ConfigBuilder::new(), &files);

        let err = plugin
            .transform("@import \"./missing.css\";\n.a { color: red; }", "/p/a.css")
            .await
            .unwrap_err();

        assert!(err.is_file_error());
        assert!(!plugin.state().contains(&FileId::new("/p/a.css")));
        assert!(!plugin.state().contains(&FileId::new("/p/missing.css")));
    }

    #[tokio::test]
    async fn test_cyclic_import() {
        let files = Arc::new(
            MemoryLoader::new()
                .with_file("/p/a.css", "@import \"./b.css\";")
                .with_file("/p/b.css", "@import \"./a.css\";"),
        );
        let plugin = plugin(ConfigBuilder::new(), &files);

        let err = plugin
            .transform("@import \"./b.css\";", "/p/a.css")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::CyclicImport { .. }));
        assert!(plugin.state().is_empty());
    }

    #[tokio::test]
    async fn test_parse_error() {
        let files = Arc::new(MemoryLoader::new());
        let plugin = plugin(ConfigBuilder::new(), &files);

        let err = plugin
            .transform(".a { color: red;", "/p/a.css")
            .await
            .unwrap_err();

        assert!(err.css_parse().is_some());
        assert!(plugin.state().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_transforms() {
        let files = Arc::new(MemoryLoader::new().with_file("/p/base.css", ".base { top: 0; }"));
        let plugin = plugin(ConfigBuilder::new(), &files);

        let (a, b) = future::join(
            plugin.transform(".a { composes: base from \"./base.css\"; }", "/p/a.css"),
            plugin.transform(".b { composes: base from \"./base.css\"; }", "/p/b.css"),
        )
        .await;
        a.unwrap();
        b.unwrap();

        assert_eq!(plugin.state().len(Bucket::Local), 2);
        assert_eq!(plugin.state().ids(Bucket::Imported), [FileId::new("/p/base.css")]);
    }

    #[tokio::test]
    async fn test_disk_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("base.css"), ".base { color: red; }").unwrap();
        let config = ConfigBuilder::new().root(dir.path()).build().unwrap();
        let plugin = CssModulesPlugin::new(config);

        let id = dir.path().join("a.css");
        let output = plugin
            .transform(
                ".a { composes: base from \"./base.css\"; }",
                &id.to_string_lossy(),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(output.code, r#"export default {"a":"_a__a _base__base"};"#);
    }

    #[tokio::test]
    async fn test_custom_engine() {
        struct Fixed;

        impl ScopingEngine for Fixed {
            fn load<'a>(
                &'a self,
                _code: &'a str,
                _trace: &'a ImportTrace,
                _resolver: &'a dyn ImportResolver,
            ) -> BoxFuture<'a, Result<LoadResult>> {
                let mut export_tokens = ExportTokens::new();
                export_tokens.insert("x".into(), "fixed-x".into());
                Box::pin(future::ready(Ok(LoadResult {
                    injectable_source: ".fixed-x{}".into(),
                    export_tokens,
                })))
            }
        }

        let files = Arc::new(MemoryLoader::new());
        let plugin = plugin(ConfigBuilder::new(), &files).with_engine(Fixed);

        let output = plugin.transform("", "/p/a.css").await.unwrap().unwrap();
        assert_eq!(output.code, r#"export default {"x":"fixed-x"};"#);
        assert!(plugin.intro().contains(".fixed-x{}"));
        assert_eq!(plugin.name(), "css-module-inject");
    }
}
