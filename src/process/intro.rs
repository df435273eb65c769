//! JavaScript emitted into the bundle.

use serde_json::{Map, Value};

use crate::engine::ExportTokens;

/// Runtime helper appending a `<style>` element to `document.head`.
///
/// A no-op outside a DOM (server-side rendering, workers).
pub const INSERT_CSS: &str = "function insertCss(css) {
  if (typeof document === 'undefined') {
    return;
  }
  var style = document.createElement('style');
  style.setAttribute('type', 'text/css');
  style.appendChild(document.createTextNode(css));
  document.head.appendChild(style);
  return style;
}";

/// Wrap `css` in an immediately-invoked [`INSERT_CSS`] call.
///
/// The CSS is embedded as a JSON string literal, which is also a valid
/// JavaScript string literal.
pub fn inject_css(css: &str) -> String {
    format!("({INSERT_CSS})({});", Value::String(css.to_string()))
}

/// Module body exporting `tokens` as the default export.
pub fn export_tokens(tokens: &ExportTokens) -> String {
    let object: Map<String, Value> = tokens
        .iter()
        .map(|(name, scoped)| (name.clone(), Value::String(scoped.clone())))
        .collect();
    format!("export default {};", Value::Object(object))
}
