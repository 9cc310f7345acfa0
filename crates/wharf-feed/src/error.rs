use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur during change-feed operations.
///
/// A resync is not an error: it is a normal reply variant carried in
/// [`crate::FeedResponse`].
#[derive(Error, Diagnostic, Debug)]
pub enum FeedError {
    #[error("Invalid since parameter: {0}")]
    #[diagnostic(
        code(wharf_feed::invalid_since),
        help("The cursor must be a score previously returned by this feed")
    )]
    InvalidSince(i64),

    #[error(transparent)]
    #[diagnostic(code(wharf_feed::query))]
    QueryError(#[from] diesel::result::Error),
}

/// A specialized Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
