//! Error type for the CSS modules pipeline.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::resource::file::FileId;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for transform and import-resolution failures.
///
/// None of these are recovered locally: a failure anywhere in a file's
/// import chain fails the whole transform of that file.
///
/// # Example
///
/// ```ignore
/// match plugin.transform(code, id).await {
///     Ok(Some(output)) => { /* module body */ }
///     Ok(None) => { /* not ours */ }
///     Err(Error::CssParse(err)) => eprintln!("{}", err.display(&DiagnosticOptions::plain())),
///     Err(e) => eprintln!("{e}"),
/// }
/// ```
#[derive(Debug, Error)]
pub enum Error {
    /// Reading a stylesheet from storage failed.
    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file was read but is not valid UTF-8.
    #[error("{} is not valid UTF-8", path.display())]
    InvalidUtf8 {
        /// Path that was read.
        path: PathBuf,
    },

    /// The scoping engine rejected a stylesheet.
    #[error("{0}")]
    CssParse(#[from] CssParseError),

    /// An import chain leads back to a file that is still being loaded.
    #[error("cyclic import: {}", ImportChain(.chain))]
    CyclicImport {
        /// Files from the transformed module to the repeated one.
        chain: Vec<FileId>,
    },

    /// Invalid plugin configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] globset::Error),
}

impl Error {
    /// Create a file read error.
    pub fn file_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Whether the error originates from storage rather than the stylesheet.
    pub fn is_file_error(&self) -> bool {
        matches!(self, Self::FileRead { .. } | Self::InvalidUtf8 { .. })
    }

    /// Get the parse error if the engine rejected the source.
    pub fn css_parse(&self) -> Option<&CssParseError> {
        match self {
            Self::CssParse(err) => Some(err),
            _ => None,
        }
    }
}

/// A stylesheet rejected by the scoping engine.
///
/// Position is 1-based; `line == 0` means the error is not tied to a
/// location (for example an unresolved composition target).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssParseError {
    /// File the error was found in.
    pub file: FileId,
    /// Line number, 1-based.
    pub line: usize,
    /// Column number, 1-based.
    pub column: usize,
    /// Human-readable message.
    pub message: String,
    /// The offending source line, when known.
    pub source_line: Option<String>,
}

impl CssParseError {
    /// Create an error without position information.
    pub fn new(file: FileId, message: impl Into<String>) -> Self {
        Self {
            file,
            line: 0,
            column: 0,
            message: message.into(),
            source_line: None,
        }
    }

    /// Create an error at a byte offset in `source`.
    pub fn at(file: FileId, source: &str, offset: usize, message: impl Into<String>) -> Self {
        let mut offset = offset.min(source.len());
        while !source.is_char_boundary(offset) {
            offset -= 1;
        }
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        let column = before[line_start..].chars().count() + 1;
        let source_line = source[line_start..]
            .lines()
            .next()
            .map(str::to_string);

        Self {
            file,
            line,
            column,
            message: message.into(),
            source_line,
        }
    }
}

impl fmt::Display for CssParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}: {}", self.file, self.message)
        } else {
            write!(f, "{}:{}:{}: {}", self.file, self.line, self.column, self.message)
        }
    }
}

impl std::error::Error for CssParseError {}

struct ImportChain<'a>(&'a [FileId]);

impl fmt::Display for ImportChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}
