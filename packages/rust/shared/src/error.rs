//! Error types for kbexport.
//!
//! Library crates use [`KbExportError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all kbexport operations.
///
/// Fatal conditions only: resolution misses, conversion fallbacks, and a
/// missing images directory are recovered locally and surfaced through
/// statistics and log lines instead.
#[derive(Debug, thiserror::Error)]
pub enum KbExportError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Database open or query error, carrying the driver message.
    #[error("database error: {0}")]
    Database(String),

    /// A joined row carries a locale id that is not in the fixed locale table.
    #[error("unknown locale id {locale_id} on answer {answer_id}")]
    UnknownLocale { answer_id: i64, locale_id: i64 },

    /// Filesystem I/O error (intermediate artifacts, rendered documents).
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Intermediate artifact does not decode to the expected shape.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// HTML-to-Markdown conversion error.
    ///
    /// The renderer recovers from this by falling back to the raw body;
    /// it only propagates out of the markdown crate itself.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, KbExportError>;

impl KbExportError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
