//! Processing stages of the scoping engine.
//!
//! The default pipeline runs, in this fixed relative order:
//!
//! - [`Values`] - `@value` constants
//! - [`LocalByDefault`] - mark class/id selectors and keyframes `:local`
//! - [`ExtractImports`] - `composes … from` and `@import` references
//! - [`Scope`] - rename `:local` names and build the exports
//!
//! Caller-supplied stages run before or after this set.

mod extract_imports;
mod local_by_default;
mod scope;
mod selector;
mod values;

pub use extract_imports::ExtractImports;
pub use local_by_default::LocalByDefault;
pub use scope::Scope;
pub use values::Values;

use super::CssModule;
use crate::error::CssParseError;

/// One transformation over a [`CssModule`].
///
/// Implemented for closures `Fn(&mut CssModule) -> Result<(), CssParseError>`.
pub trait Stage: Send + Sync {
    /// Short name, used in logs.
    fn name(&self) -> &str;

    /// Rewrite the module in place.
    fn process(&self, module: &mut CssModule) -> Result<(), CssParseError>;
}

impl<F> Stage for F
where
    F: Fn(&mut CssModule) -> Result<(), CssParseError> + Send + Sync,
{
    fn name(&self) -> &str {
        "custom"
    }

    fn process(&self, module: &mut CssModule) -> Result<(), CssParseError> {
        self(module)
    }
}

/// Whether an at-rule name is `keyframes`, possibly vendor-prefixed.
fn is_keyframes(name: &str) -> bool {
    name.eq_ignore_ascii_case("keyframes") || name.to_ascii_lowercase().ends_with("-keyframes")
}

/// Whether a property names animations (`animation`, `animation-name`,
/// possibly vendor-prefixed).
fn is_animation_prop(prop: &str) -> bool {
    let prop = prop.to_ascii_lowercase();
    let unprefixed = match prop.strip_prefix('-') {
        Some(rest) => rest.split_once('-').map_or(rest, |(_, p)| p),
        None => &prop,
    };
    unprefixed == "animation" || unprefixed == "animation-name"
}

/// Strip one level of matching quotes.
fn unquote(text: &str) -> Option<&str> {
    let text = text.trim();
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    text.strip_prefix(quote)?.strip_suffix(quote)
}
