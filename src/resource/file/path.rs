//! File identifiers and path normalization.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Absolute, normalized path identifying one stylesheet.
///
/// Two references to the same file (relative or absolute, with or without
/// `.`/`..` segments) produce equal identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(PathBuf);

impl FileId {
    /// Create an identifier, normalizing `.` and `..` segments.
    ///
    /// Relative paths are kept relative; use [`FileId::within`] to anchor
    /// them to a root.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self(normalize_path(path.as_ref()))
    }

    /// Create an identifier for `path`, joined onto `root` if relative.
    pub fn within(root: &Path, path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.is_absolute() {
            Self::new(path)
        } else {
            Self::new(root.join(path))
        }
    }

    /// Resolve a reference written inside this file.
    ///
    /// Relative references are resolved against this file's directory.
    pub fn join(&self, reference: &str) -> Self {
        let dir = self.0.parent().unwrap_or(Path::new(""));
        Self::within(dir, reference)
    }

    /// Get the underlying path.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// File extension including the leading dot (e.g. `".css"`).
    pub fn extension(&self) -> Option<String> {
        self.0
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
    }
}

impl AsRef<Path> for FileId {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for FileId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Normalize a path lexically.
///
/// Removes `.` segments and folds `..` into the preceding segment. Does not
/// touch the file system, so it works for files that are only known to a
/// virtual loader.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
