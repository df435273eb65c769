//! Prelude module for convenient imports.
//!
//! ```ignore
//! use css_module_inject::prelude::*;
//! ```

// Plugin
pub use crate::process::{CssModulesPlugin, TransformOutput};

// Configuration
pub use crate::config::{Config, ConfigBuilder, PluginOptions};

// Engine extension points
pub use crate::engine::{
    CssModule, ExportTokens, ImportResolver, ImportTrace, ScopedNameGenerator, ScopingEngine,
    Stage,
};

// Diagnostics
pub use crate::diagnostic::DiagnosticOptions;
pub use crate::error::{CssParseError, Error};

// Files
pub use crate::resource::file::{DiskLoader, FileId, FileLoader, MemoryLoader};
