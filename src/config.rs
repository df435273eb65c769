//! Plugin configuration.
//!
//! Data-valued options come from [`PluginOptions`] (deserializable, e.g. from
//! the host's JSON config). Code-valued options (extra stages, a custom
//! scoped-name generator) are set on [`ConfigBuilder`] directly.
//!
//! ```ignore
//! let options: PluginOptions = serde_json::from_str(r#"{ "include": "src/**" }"#)?;
//! let config = ConfigBuilder::from_options(options)
//!     .generate_scoped_name(|name: &str, _: &FileId, _: &str| format!("x-{name}"))
//!     .build()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Deserializer};

use crate::engine::{LongNameGenerator, ScopedNameGenerator, Stage};
use crate::error::Result;
use crate::filter::Filter;
use crate::resource::file::{normalize_path, FileId};

/// Extensions handled when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".css"];

/// Serializable plugin options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginOptions {
    /// Glob patterns of ids to handle. Empty means all.
    #[serde(deserialize_with = "one_or_many")]
    pub include: Vec<String>,
    /// Glob patterns of ids to skip.
    #[serde(deserialize_with = "one_or_many")]
    pub exclude: Vec<String>,
    /// Handled file extensions, with the leading dot.
    pub extensions: Option<Vec<String>>,
    /// Files whose CSS goes into the global bucket.
    #[serde(deserialize_with = "one_or_many")]
    pub globals: Vec<String>,
    /// Project root. Defaults to the current directory.
    pub root: Option<PathBuf>,
}

/// Accept `"pattern"` as well as `["a", "b"]`.
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

/// Immutable configuration, built once per plugin instance.
#[derive(Clone)]
pub struct Config {
    root: PathBuf,
    filter: Filter,
    extensions: Vec<String>,
    globals: FxHashSet<FileId>,
    before: Vec<Arc<dyn Stage>>,
    after: Vec<Arc<dyn Stage>>,
    generator: Arc<dyn ScopedNameGenerator>,
}

impl Config {
    /// Project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Include/exclude filter.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Handled extensions, with the leading dot.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether `id` passes the filter and has a handled extension.
    pub fn handles(&self, id: &str) -> bool {
        if !self.filter.matches(id) {
            return false;
        }
        FileId::within(&self.root, id)
            .extension()
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }

    /// Whether `id` was configured as a global stylesheet.
    pub fn is_global(&self, id: &FileId) -> bool {
        self.globals.contains(id)
    }

    /// Stages run before the defaults.
    pub fn before(&self) -> &[Arc<dyn Stage>] {
        &self.before
    }

    /// Stages run after the defaults.
    pub fn after(&self) -> &[Arc<dyn Stage>] {
        &self.after
    }

    /// Scoped-name generator.
    pub fn generator(&self) -> &Arc<dyn ScopedNameGenerator> {
        &self.generator
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = |stages: &[Arc<dyn Stage>]| {
            stages.iter().map(|s| s.name().to_string()).collect::<Vec<_>>()
        };
        f.debug_struct("Config")
            .field("root", &self.root)
            .field("filter", &self.filter)
            .field("extensions", &self.extensions)
            .field("globals", &self.globals)
            .field("before", &names(&self.before))
            .field("after", &names(&self.after))
            .finish_non_exhaustive()
    }
}

/// Configuration builder for fluent API.
#[derive(Default)]
pub struct ConfigBuilder {
    options: PluginOptions,
    before: Vec<Arc<dyn Stage>>,
    after: Vec<Arc<dyn Stage>>,
    generator: Option<Arc<dyn ScopedNameGenerator>>,
}

impl ConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from deserialized options.
    pub fn from_options(options: PluginOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Set the project root.
    ///
    /// Default: the current directory
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.options.root = Some(root.into());
        self
    }

    /// Add an include pattern.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.options.include.push(pattern.into());
        self
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.options.exclude.push(pattern.into());
        self
    }

    /// Replace the handled extensions.
    ///
    /// Default: `[".css"]`
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Mark a file as global. Relative paths are resolved against the root.
    pub fn global(mut self, path: impl Into<String>) -> Self {
        self.options.globals.push(path.into());
        self
    }

    /// Run `stage` before the default stages.
    pub fn before(mut self, stage: impl Stage + 'static) -> Self {
        self.before.push(Arc::new(stage));
        self
    }

    /// Run `stage` after the default stages.
    pub fn after(mut self, stage: impl Stage + 'static) -> Self {
        self.after.push(Arc::new(stage));
        self
    }

    /// Replace the scoped-name generator.
    ///
    /// Default: [`LongNameGenerator`] over the root.
    pub fn generate_scoped_name(mut self, generator: impl ScopedNameGenerator + 'static) -> Self {
        self.generator = Some(Arc::new(generator));
        self
    }

    /// Validate patterns and build the configuration.
    pub fn build(self) -> Result<Config> {
        let root = resolve_root(self.options.root);
        let filter = Filter::new(&root, &self.options.include, &self.options.exclude)?;
        let extensions = self.options.extensions.unwrap_or_else(|| {
            DEFAULT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()
        });
        let globals = self
            .options
            .globals
            .iter()
            .map(|path| FileId::within(&root, path))
            .collect();
        let generator = self
            .generator
            .unwrap_or_else(|| Arc::new(LongNameGenerator::new(root.clone())));

        Ok(Config {
            root,
            filter,
            extensions,
            globals,
            before: self.before,
            after: self.after,
            generator,
        })
    }
}

/// Anchor the configured root (or the current directory) to an absolute path.
fn resolve_root(root: Option<PathBuf>) -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_default();
    match root {
        Some(root) if root.is_absolute() => normalize_path(&root),
        Some(root) => normalize_path(&cwd.join(root)),
        None => normalize_path(&cwd),
    }
}
