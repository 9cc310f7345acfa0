//! Error types for the store crate.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Error, Diagnostic, Debug)]
pub enum StoreError {
    #[error(transparent)]
    #[diagnostic(
        code(wharf_store::connection),
        help("Check the database path and file permissions")
    )]
    ConnectionError(#[from] diesel::ConnectionError),

    #[error(transparent)]
    #[diagnostic(code(wharf_store::query))]
    QueryError(#[from] diesel::result::Error),

    #[error("Migration failed: {0}")]
    #[diagnostic(
        code(wharf_store::migration),
        help("The database schema may be newer than this binary")
    )]
    MigrationError(String),
}

/// A specialized Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
