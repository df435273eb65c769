//! Dependency resolution boundary between the engine and the host.

use futures_util::future::{self, BoxFuture};
use rustc_hash::FxHashMap;

use super::ExportTokens;
use crate::error::{Error, Result};
use crate::resource::file::FileId;

/// Resolves an `@import` / `composes … from` reference to the export
/// tokens of the referenced stylesheet.
///
/// The engine calls this once per distinct reference in a file and
/// suspends until every result is available.
pub trait ImportResolver: Send + Sync {
    /// Resolve `reference` as written inside `from.current()`.
    fn resolve<'a>(
        &'a self,
        reference: &'a str,
        from: &'a ImportTrace,
    ) -> BoxFuture<'a, Result<ExportTokens>>;
}

/// Chain of files currently being loaded, outermost first.
///
/// The last entry is the file whose references are being resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTrace {
    chain: Vec<FileId>,
}

impl ImportTrace {
    /// Start a trace at the module being transformed.
    pub fn new(id: FileId) -> Self {
        Self { chain: vec![id] }
    }

    /// The file currently being loaded.
    pub fn current(&self) -> &FileId {
        // The chain is never empty: it starts with one entry and only grows.
        &self.chain[self.chain.len() - 1]
    }

    /// Descend into an imported file.
    ///
    /// Fails with [`Error::CyclicImport`] if `id` is already being loaded
    /// further up the chain.
    pub fn enter(&self, id: FileId) -> Result<Self> {
        let mut chain = self.chain.clone();
        let cyclic = chain.contains(&id);
        chain.push(id);
        if cyclic {
            return Err(Error::CyclicImport { chain });
        }
        Ok(Self { chain })
    }

    /// Number of files on the chain.
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// All files on the chain, outermost first.
    pub fn chain(&self) -> &[FileId] {
        &self.chain
    }
}

/// Resolver answering from a fixed table of references.
///
/// Useful when imported stylesheets were processed ahead of time, and for
/// driving the engine without touching storage.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    tokens: FxHashMap<String, ExportTokens>,
}

impl StaticResolver {
    /// Create an empty resolver; every lookup fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the tokens returned for `reference` (unquoted).
    pub fn with(mut self, reference: impl Into<String>, tokens: ExportTokens) -> Self {
        self.tokens.insert(reference.into(), tokens);
        self
    }
}

impl ImportResolver for StaticResolver {
    fn resolve<'a>(
        &'a self,
        reference: &'a str,
        from: &'a ImportTrace,
    ) -> BoxFuture<'a, Result<ExportTokens>> {
        let key = reference.trim_matches(|c| c == '"' || c == '\'');
        let result = self.tokens.get(key).cloned().ok_or_else(|| {
            Error::file_read(
                from.current().join(key).as_path(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "unknown reference"),
            )
        });
        Box::pin(future::ready(result))
    }
}
