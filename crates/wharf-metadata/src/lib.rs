//! Metadata document formats: version arrays, the diff-compacted wire
//! format and its expansion, per-package documents and the root index.

pub mod document;
pub mod error;
pub mod minify;
pub mod version_array;

pub use document::{
    document_bytes, legacy_documents, legacy_path, modern_document, modern_path, root_index,
    ROOT_INDEX,
};
pub use error::{MetadataError, Result};
pub use minify::{expand, minify, MINIFY_FORMAT};
pub use version_array::version_array;
