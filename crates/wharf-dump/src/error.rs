//! Error types for the dump crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur during dump generation or garbage collection.
#[derive(Error, Diagnostic, Debug)]
pub enum DumpError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    StoreError(#[from] wharf_store::StoreError),

    #[error(transparent)]
    #[diagnostic(code(wharf_dump::query))]
    QueryError(#[from] diesel::result::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    FeedError(#[from] wharf_feed::FeedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    MetadataError(#[from] wharf_metadata::MetadataError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    EdgeError(#[from] wharf_edge::EdgeError),

    #[error(transparent)]
    #[diagnostic(code(wharf_dump::filesystem), help("Check permissions on the metadata directory"))]
    FileSystemError(#[from] wharf_utils::error::FileSystemError),

    #[error(transparent)]
    #[diagnostic(code(wharf_dump::lock), help("Check permissions on the lock directory"))]
    LockError(#[from] wharf_utils::error::LockError),

    #[error(transparent)]
    #[diagnostic(code(wharf_dump::hash))]
    HashError(#[from] wharf_utils::error::HashError),

    #[error("Error while {action}: {source}")]
    #[diagnostic(code(wharf_dump::io))]
    IoError {
        action: String,
        source: std::io::Error,
    },

    #[error("Package '{0}' not found")]
    #[diagnostic(
        code(wharf_dump::package_not_found),
        help("Check the package name, format is vendor/package")
    )]
    PackageNotFound(String),
}

/// A specialized Result type for dump operations.
pub type Result<T> = std::result::Result<T, DumpError>;

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
            DumpError::IoError {
                action: context(),
                source: err,
            }
        })
    }
}
