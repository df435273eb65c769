//! Scoped class name generation.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::resource::file::FileId;

static EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.[^./\\]+$").expect("extension pattern is valid"));

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("non-word pattern is valid"));

/// Policy turning a local class name into a globally unique one.
///
/// Implemented for any `Fn(&str, &FileId, &str) -> String`, receiving the
/// local name, the file it was declared in and that file's source.
///
/// # Example
///
/// ```ignore
/// let config = ConfigBuilder::new()
///     .generate_scoped_name(|name: &str, _file: &FileId, _css: &str| format!("x-{name}"))
///     .build()?;
/// ```
pub trait ScopedNameGenerator: Send + Sync {
    /// Generate the scoped name for `name` declared in `file`.
    fn generate(&self, name: &str, file: &FileId, css: &str) -> String;
}

impl<F> ScopedNameGenerator for F
where
    F: Fn(&str, &FileId, &str) -> String + Send + Sync,
{
    fn generate(&self, name: &str, file: &FileId, css: &str) -> String {
        self(name, file, css)
    }
}

/// Default generator: `_<sanitized path>__<name>`.
///
/// The path is taken relative to the build root.
#[derive(Debug, Clone)]
pub struct LongNameGenerator {
    root: PathBuf,
}

impl LongNameGenerator {
    /// Create a generator for files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ScopedNameGenerator for LongNameGenerator {
    fn generate(&self, name: &str, file: &FileId, _css: &str) -> String {
        generate_long_name(name, file.as_path(), &self.root)
    }
}

/// Build `_<path>__<name>` from a file path relative to `root`.
///
/// The extension is dropped, runs of anything but ASCII letters and digits
/// collapse into a single `_`, and leading/trailing underscores are trimmed.
pub fn generate_long_name(name: &str, file: &Path, root: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file).to_string_lossy();
    let stem = EXTENSION.replace(&relative, "");
    let sanitized = NON_WORD.replace_all(&stem, "_");
    format!("_{}__{name}", sanitized.trim_matches('_'))
}
