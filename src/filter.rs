//! Include/exclude filtering of module ids.

use std::path::Path;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::Result;
use crate::resource::file::FileId;

/// Decides which module ids the plugin handles.
///
/// - ids containing a NUL byte (virtual modules of other plugins) never match
/// - an id matching any `exclude` pattern never matches
/// - with no `include` patterns every other id matches; otherwise the id
///   must match one of them
///
/// Relative patterns are resolved against the root, except patterns that
/// start with `*`, which match anywhere.
#[derive(Debug, Clone)]
pub struct Filter {
    root: std::path::PathBuf,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl Filter {
    /// Build a filter from glob patterns.
    pub fn new<S: AsRef<str>>(root: &Path, include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
            include: build_set(root, include)?,
            exclude: build_set(root, exclude)?,
        })
    }

    /// A filter accepting every id.
    pub fn allow_all(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            include: None,
            exclude: None,
        }
    }

    /// Whether the plugin should handle `id`.
    pub fn matches(&self, id: &str) -> bool {
        if id.contains('\0') {
            return false;
        }
        let path = to_slash(FileId::within(&self.root, id).as_path());
        if self.exclude.as_ref().is_some_and(|set| set.is_match(&path)) {
            return false;
        }
        self.include.as_ref().is_none_or(|set| set.is_match(&path))
    }
}

fn build_set<S: AsRef<str>>(root: &Path, patterns: &[S]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let pattern = resolve_pattern(root, pattern.as_ref());
        builder.add(GlobBuilder::new(&pattern).literal_separator(true).build()?);
    }
    Ok(Some(builder.build()?))
}

fn resolve_pattern(root: &Path, pattern: &str) -> String {
    if pattern.starts_with('*') || Path::new(pattern).is_absolute() {
        pattern.replace('\\', "/")
    } else {
        to_slash(FileId::within(root, pattern).as_path())
    }
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
