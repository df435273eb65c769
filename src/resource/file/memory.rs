//! In-memory file loader.

use std::io;
use std::path::{Path, PathBuf};

use futures_util::future::{self, BoxFuture};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::path::normalize_path;
use super::read::FileLoader;

/// A simple map-based file loader.
///
/// Serves hosts that keep stylesheets in memory (generated or virtual
/// files) and tests. Paths are normalized on insert and lookup. Every
/// read is counted, which lets callers observe how often a file was
/// loaded.
///
/// # Example
///
/// ```ignore
/// use css_module_inject::MemoryLoader;
///
/// let mut files = MemoryLoader::new();
/// files.insert("/src/theme.css", ".primary { color: red; }");
/// ```
#[derive(Default)]
pub struct MemoryLoader {
    files: FxHashMap<PathBuf, Vec<u8>>,
    reads: Mutex<FxHashMap<PathBuf, usize>>,
}

impl MemoryLoader {
    /// Create a new empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file with string content.
    pub fn insert(&mut self, path: impl AsRef<Path>, content: impl AsRef<str>) {
        self.insert_bytes(path, content.as_ref().as_bytes().to_vec());
    }

    /// Insert a file with binary content.
    pub fn insert_bytes(&mut self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.files
            .insert(normalize_path(path.as_ref()), content.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl AsRef<str>) -> Self {
        self.insert(path, content);
        self
    }

    /// Check if a path exists.
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files.contains_key(&normalize_path(path.as_ref()))
    }

    /// Number of times `path` has been read, including failed reads.
    pub fn read_count(&self, path: impl AsRef<Path>) -> usize {
        self.reads
            .lock()
            .get(&normalize_path(path.as_ref()))
            .copied()
            .unwrap_or(0)
    }

    /// Get the number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileLoader for MemoryLoader {
    fn read<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, io::Result<Vec<u8>>> {
        let path = normalize_path(path);
        *self.reads.lock().entry(path.clone()).or_default() += 1;

        let result = self.files.get(&path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        });
        Box::pin(future::ready(result))
    }
}
