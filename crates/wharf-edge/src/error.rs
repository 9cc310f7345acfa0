//! Error types for the edge crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur during edge publication.
#[derive(Error, Diagnostic, Debug)]
pub enum EdgeError {
    #[error("Error while {action}: {source}")]
    #[diagnostic(code(wharf_edge::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("Failed to build push thread pool: {0}")]
    #[diagnostic(code(wharf_edge::pool))]
    PoolBuild(String),
}

/// A specialized Result type for edge operations.
pub type Result<T> = std::result::Result<T, EdgeError>;

/// Extension trait for adding context to I/O errors.
pub trait ErrorContext<T> {
    /// Adds context to an error, describing what action was being performed.
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String;
}

impl<T> ErrorContext<T> for std::io::Result<T> {
    fn with_context<C>(self, context: C) -> Result<T>
    where
        C: FnOnce() -> String,
    {
        self.map_err(|err| {
            EdgeError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
