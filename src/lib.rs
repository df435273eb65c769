//! # css-module-inject
//!
//! A CSS modules plugin for JavaScript bundlers that injects the scoped CSS
//! at runtime instead of emitting a stylesheet.
//!
//! Every handled stylesheet becomes a JavaScript module exporting its class
//! names; the CSS itself is collected and injected by a single snippet in
//! the bundle intro:
//!
//! - **Scoping**: `.button` becomes `._src_button__button`, `:global(...)`
//!   opts out
//! - **Composition**: `composes: base from "./base.css"` across files
//! - **Imports**: `@import` pulls a stylesheet into the imported bucket
//! - **Values**: `@value primary: #0c77f8;` constants, importable too
//!
//! ## Quick Start
//!
//! ```ignore
//! use css_module_inject::{ConfigBuilder, CssModulesPlugin};
//!
//! let config = ConfigBuilder::new()
//!     .root("/project")
//!     .include("src/**/*.css")
//!     .global("src/global.css")
//!     .build()?;
//! let plugin = CssModulesPlugin::new(config);
//!
//! // For every module the host loads:
//! if let Some(output) = plugin.transform(code, id).await? {
//!     // output.code == r#"export default {"button":"_src_button__button"};"#
//! }
//!
//! // Once, when the bundle is rendered:
//! let intro = plugin.intro();
//! ```
//!
//! ## Injection Order
//!
//! The intro concatenates global CSS, then imported CSS, then local CSS,
//! each in the order it was first stored.
//!
//! ## Modules
//!
//! - [`config`]: Options and the configuration builder
//! - [`engine`]: Scoping engine (parser, stages, linking)
//! - [`process`]: Transform pipeline and accumulated state
//! - [`resource`]: File identifiers and loaders
//! - [`diagnostic`]: Error formatting

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod filter;
pub mod prelude;
pub mod process;
pub mod resource;

// =============================================================================
// Plugin
// =============================================================================

pub use process::{Bucket, BuildState, CssModulesPlugin, ModuleLoader, TransformOutput};

// =============================================================================
// Configuration
// =============================================================================

pub use config::{Config, ConfigBuilder, PluginOptions};
pub use filter::Filter;

// =============================================================================
// Engine
// =============================================================================

pub use engine::{
    Core, ExportTokens, ImportResolver, ImportTrace, LoadResult, LongNameGenerator,
    ScopedNameGenerator, ScopingEngine, Stage,
};

// =============================================================================
// Errors & Diagnostics
// =============================================================================

pub use diagnostic::{DiagnosticOptions, DisplayStyle};
pub use error::{CssParseError, Error, Result};

// =============================================================================
// Files
// =============================================================================

pub use resource::file::{DiskLoader, FileId, FileLoader, MemoryLoader};
