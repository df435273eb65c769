//! Transform pipeline.
//!
//! - [`CssModulesPlugin`] - host-facing `transform` / `intro` hooks
//! - [`ModuleLoader`] - per-transform import resolution
//! - [`BuildState`] - global / imported / local CSS buckets

mod intro;
mod loader;
mod plugin;
mod state;

pub use intro::{export_tokens, inject_css, INSERT_CSS};
pub use loader::ModuleLoader;
pub use plugin::{CssModulesPlugin, TransformOutput};
pub use state::{Bucket, BuildState};
