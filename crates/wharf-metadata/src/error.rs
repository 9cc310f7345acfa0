use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while building metadata documents.
#[derive(Error, Diagnostic, Debug)]
pub enum MetadataError {
    #[error(transparent)]
    #[diagnostic(code(wharf_metadata::json))]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for metadata operations.
pub type Result<T> = std::result::Result<T, MetadataError>;
