//! Error types for docsync.
//!
//! Library crates use [`DocSyncError`] via `thiserror`.
//! App crates (cli/validate) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all docsync operations.
#[derive(Debug, thiserror::Error)]
pub enum DocSyncError {
    /// Configuration loading or validation error (missing credentials, bad file).
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to the documentation service.
    #[error("network error: {0}")]
    Network(String),

    /// Response or document parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (schema mismatch, invalid input, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Storage-format to Markdown conversion error.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Page lookup matched nothing in the configured space.
    #[error("no relevant pages found in space '{space}' for {titles:?}")]
    NoPages { space: String, titles: Vec<String> },

    /// Every matched page failed to export.
    #[error("failed to export any of {attempted} page(s)")]
    NothingExported { attempted: usize },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocSyncError>;

impl DocSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DocSyncError::config("missing CONFLUENCE_EMAIL");
        assert_eq!(err.to_string(), "config error: missing CONFLUENCE_EMAIL");

        let err = DocSyncError::validation("max_size_kb must be positive");
        assert!(err.to_string().contains("max_size_kb"));
    }

    #[test]
    fn no_pages_lists_titles() {
        let err = DocSyncError::NoPages {
            space: "pilot".into(),
            titles: vec!["Backend Developer Documentation".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'pilot'"));
        assert!(msg.contains("Backend Developer Documentation"));
    }

    #[test]
    fn io_error_carries_path() {
        let err = DocSyncError::io(
            "/tmp/out.md",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/out.md"));
    }
}
