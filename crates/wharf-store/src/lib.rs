//! SQLite persistence for the wharf metadata pipeline.
//!
//! Holds the read side of the package/version catalog, the writable dump
//! timestamps, and the change-feed indexes.

pub mod connection;
pub mod error;
pub mod migration;
pub mod models;
pub mod repository;
pub mod schema;

pub use connection::Database;
pub use error::{Result, StoreError};
