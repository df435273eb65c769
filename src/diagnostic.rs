//! Human-readable rendering of stylesheet errors.
//!
//! ```text
//! error: unknown word 'color'
//!   ┌─ /project/src/button.css:3:3
//!   │
//! 3 │   color blue;
//!   │   ^^^^^
//! ```
//!
//! ANSI colouring is only available with the `colored-diagnostics` feature;
//! without it [`DiagnosticOptions::colored`] is ignored.

use std::fmt::Write;

use crate::error::{CssParseError, Error};

// ============================================================================
// Options
// ============================================================================

/// Display style for diagnostic output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayStyle {
    /// Source snippet with a marker under the offending text.
    #[default]
    Rich,
    /// Single `file:line:col: error: message` line.
    Short,
}

/// Options for controlling diagnostic formatting.
///
/// # Example
///
/// ```ignore
/// // Plain text (no ANSI colors) for logging
/// let opts = DiagnosticOptions::plain();
///
/// // Short format for CI/IDE integration
/// let opts = DiagnosticOptions::short();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticOptions {
    /// Whether to use ANSI colors in output.
    pub colored: bool,
    /// Display style (rich with snippets or short).
    pub style: DisplayStyle,
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        Self {
            colored: true,
            style: DisplayStyle::Rich,
        }
    }
}

impl DiagnosticOptions {
    /// Create options for colored terminal output.
    pub fn colored() -> Self {
        Self::default()
    }

    /// Create options for plain text output (no ANSI colors).
    pub fn plain() -> Self {
        Self {
            colored: false,
            ..Self::default()
        }
    }

    /// Create options for short format (file:line:col: message).
    pub fn short() -> Self {
        Self {
            colored: false,
            style: DisplayStyle::Short,
        }
    }

    /// Set whether to use colors.
    pub fn with_colored(mut self, colored: bool) -> Self {
        self.colored = colored;
        self
    }

    /// Set display style.
    pub fn with_style(mut self, style: DisplayStyle) -> Self {
        self.style = style;
        self
    }
}

// ============================================================================
// Gutter Characters
// ============================================================================

mod gutter {
    pub const HEADER: &str = "┌─";
    pub const BAR: &str = "│";
    pub const MARKER: &str = "^";
}

// ============================================================================
// Coloring
// ============================================================================

#[cfg(feature = "colored-diagnostics")]
fn colorize(text: &str) -> String {
    use owo_colors::OwoColorize;
    text.red().to_string()
}

#[cfg(feature = "colored-diagnostics")]
fn colorize_gutter(text: &str) -> String {
    use owo_colors::OwoColorize;
    text.cyan().to_string()
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize(text: &str) -> String {
    text.to_owned()
}

#[cfg(not(feature = "colored-diagnostics"))]
fn colorize_gutter(text: &str) -> String {
    text.to_owned()
}

struct Paint {
    colored: bool,
}

impl Paint {
    fn error(&self, text: &str) -> String {
        if self.colored { colorize(text) } else { text.to_owned() }
    }

    fn gutter(&self, text: &str) -> String {
        if self.colored { colorize_gutter(text) } else { text.to_owned() }
    }
}

// ============================================================================
// Formatting
// ============================================================================

impl CssParseError {
    /// Render the error for a terminal or log.
    pub fn display(&self, options: &DiagnosticOptions) -> String {
        let mut output = String::new();
        format_parse_error(&mut output, self, options);
        output
    }
}

impl Error {
    /// Render the error, with a source snippet when it points into a
    /// stylesheet.
    pub fn display(&self, options: &DiagnosticOptions) -> String {
        match self {
            Self::CssParse(err) => err.display(options),
            other => {
                let paint = Paint {
                    colored: options.colored,
                };
                format!("{}: {other}\n", paint.error("error"))
            }
        }
    }
}

fn format_parse_error(output: &mut String, err: &CssParseError, options: &DiagnosticOptions) {
    let paint = Paint {
        colored: options.colored,
    };

    if options.style == DisplayStyle::Short {
        _ = writeln!(output, "{err}");
        return;
    }

    _ = writeln!(output, "{}: {}", paint.error("error"), err.message);

    let line_num = err.line.to_string();
    let width = line_num.len();
    if err.line == 0 {
        _ = writeln!(output, "{:>width$} {} {}", "", paint.gutter(gutter::HEADER), err.file);
        return;
    }
    _ = writeln!(
        output,
        "{:>width$} {} {}:{}:{}",
        "",
        paint.gutter(gutter::HEADER),
        err.file,
        err.line,
        err.column
    );

    let Some(text) = &err.source_line else {
        return;
    };
    let bar = paint.gutter(gutter::BAR);
    _ = writeln!(output, "{:>width$} {bar}", "");
    _ = writeln!(output, "{} {bar} {text}", paint.gutter(&line_num));

    let start = err.column.saturating_sub(1);
    let markers = gutter::MARKER.repeat(marker_len(text, start));
    _ = writeln!(
        output,
        "{:>width$} {bar} {}{}",
        "",
        " ".repeat(start),
        paint.error(&markers)
    );
}

/// Length of the word starting at `start` (in chars), at least one.
fn marker_len(line: &str, start: usize) -> usize {
    line.chars()
        .skip(start)
        .take_while(|c| !c.is_whitespace() && !matches!(c, ';' | '{' | '}' | ':'))
        .count()
        .max(1)
}
