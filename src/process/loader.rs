//! Recursive stylesheet loading with import resolution.

use futures_util::future::BoxFuture;
use indexmap::IndexSet;
use parking_lot::Mutex;
use tracing::debug;

use super::state::{Bucket, BuildState};
use crate::engine::{ExportTokens, ImportResolver, ImportTrace, LoadResult, ScopingEngine};
use crate::error::Result;
use crate::resource::file::{read_source, FileId, FileLoader};

/// Loads one transformed module and everything it imports.
///
/// Created per transform. Acts as the engine's [`ImportResolver`]: each
/// imported file is read, loaded recursively and stored in the imported
/// bucket. Every file read along the way is recorded as a dependency.
///
/// ```text
/// load_css(a) ──► engine ──► resolve("./b.css") ──► read b ──► load_css(b) ──► …
///                                                        │
///                                         imported[b] ◄──┘
/// ```
pub struct ModuleLoader<'a> {
    engine: &'a dyn ScopingEngine,
    files: &'a dyn FileLoader,
    state: &'a BuildState,
    accessed: Mutex<IndexSet<FileId>>,
}

impl<'a> ModuleLoader<'a> {
    /// Create a loader writing imported CSS into `state`.
    pub fn new(
        engine: &'a dyn ScopingEngine,
        files: &'a dyn FileLoader,
        state: &'a BuildState,
    ) -> Self {
        Self {
            engine,
            files,
            state,
            accessed: Mutex::new(IndexSet::new()),
        }
    }

    /// Load `code`, the source of `trace.current()`, through the engine.
    pub async fn load_css(&self, code: &str, trace: &ImportTrace) -> Result<LoadResult> {
        self.engine.load(code, trace, self).await
    }

    /// Files read so far, in first-read order.
    pub fn dependencies(&self) -> Vec<FileId> {
        self.accessed.lock().iter().cloned().collect()
    }

    /// Consume the loader and return the files it read.
    pub fn into_dependencies(self) -> Vec<FileId> {
        self.accessed.into_inner().into_iter().collect()
    }
}

impl ImportResolver for ModuleLoader<'_> {
    fn resolve<'b>(
        &'b self,
        reference: &'b str,
        from: &'b ImportTrace,
    ) -> BoxFuture<'b, Result<ExportTokens>> {
        Box::pin(async move {
            let reference = reference.trim_matches(|c| c == '"' || c == '\'');
            let id = from.current().join(reference);
            let trace = from.enter(id.clone())?;
            debug!(
                importer = %from.current(),
                file = %id,
                depth = trace.depth(),
                "resolving import"
            );

            let code = read_source(self.files, &id).await?;
            self.accessed.lock().insert(id.clone());

            let result = self.load_css(&code, &trace).await?;
            self.state.insert(Bucket::Imported, id, result.injectable_source);
            Ok(result.export_tokens)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::{Core, LongNameGenerator};
    use crate::error::Error;
    use crate::resource::file::MemoryLoader;

    fn core() -> Core {
        Core::with_defaults(Arc::new(LongNameGenerator::new("/p")), vec![], vec![])
    }

    #[tokio::test]
    async fn test_resolve_loads_and_stores() {
        let files = MemoryLoader::new().with_file("/p/base.css", ".base { color: red; }");
        let state = BuildState::new();
        let core = core();
        let loader = ModuleLoader::new(&core, &files, &state);

        let trace = ImportTrace::new(FileId::new("/p/a.css"));
        let tokens = loader.resolve("\"./base.css\"", &trace).await.unwrap();

        assert_eq!(tokens["base"], "_base__base");
        let stored = state.get(Bucket::Imported, &FileId::new("/p/base.css")).unwrap();
        assert!(stored.contains("._base__base {"));
        assert_eq!(loader.dependencies(), [FileId::new("/p/base.css")]);
    }

    #[tokio::test]
    async fn test_nested_imports_resolve_relative_to_importer() {
        let files = MemoryLoader::new()
            .with_file("/p/ui/b.css", "@import \"../shared/c.css\";\n.b { color: blue; }")
            .with_file("/p/shared/c.css", ".c { color: green; }");
        let state = BuildState::new();
        let core = core();
        let loader = ModuleLoader::new(&core, &files, &state);

        let trace = ImportTrace::new(FileId::new("/p/a.css"));
        loader.resolve("./ui/b.css", &trace).await.unwrap();

        assert_eq!(
            state.ids(Bucket::Imported),
            [FileId::new("/p/shared/c.css"), FileId::new("/p/ui/b.css")]
        );
        assert_eq!(
            loader.into_dependencies(),
            [FileId::new("/p/ui/b.css"), FileId::new("/p/shared/c.css")]
        );
    }

    #[tokio::test]
    async fn test_missing_file() {
        let files = MemoryLoader::new();
        let state = BuildState::new();
        let core = core();
        let loader = ModuleLoader::new(&core, &files, &state);

        let trace = ImportTrace::new(FileId::new("/p/a.css"));
        let err = loader.resolve("./nope.css", &trace).await.unwrap_err();

        assert!(matches!(err, Error::FileRead { .. }));
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_fails_fast() {
        let files = MemoryLoader::new()
            .with_file("/p/a.css", "@import \"./b.css\";")
            .with_file("/p/b.css", "@import \"./a.css\";");
        let state = BuildState::new();
        let core = core();
        let loader = ModuleLoader::new(&core, &files, &state);

        let trace = ImportTrace::new(FileId::new("/p/a.css"));
        let err = loader.resolve("./b.css", &trace).await.unwrap_err();

        let Error::CyclicImport { chain } = err else {
            panic!("expected cyclic import, got {err}");
        };
        assert_eq!(
            chain,
            [FileId::new("/p/a.css"), FileId::new("/p/b.css"), FileId::new("/p/a.css")]
        );
        assert_eq!(files.read_count("/p/a.css"), 0);
    }
}
