use std::path::Path;

use crate::error::{HashError, HashResult};

/// Hex-encoded blake3 checksum of an in-memory document.
///
/// Used to decide whether a freshly generated metadata document differs from
/// what is already on disk before touching the file.
pub fn content_checksum(contents: &[u8]) -> String {
    blake3::hash(contents).to_hex().to_string()
}

/// Calculates the blake3 checksum of a file.
///
/// # Errors
///
/// * [`HashError::ReadFailed`] if the file cannot be read.
pub fn file_checksum<P: AsRef<Path>>(file_path: P) -> HashResult<String> {
    let file_path = file_path.as_ref();
    let mut hasher = blake3::Hasher::new();
    hasher.update_mmap(file_path).map_err(|err| {
        HashError::ReadFailed {
            path: file_path.to_path_buf(),
            source: err,
        }
    })?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_content_checksum_matches_file_checksum() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{\"packages\":{}}").unwrap();

        let from_file = file_checksum(file.path()).unwrap();
        let from_bytes = content_checksum(b"{\"packages\":{}}");
        assert_eq!(from_file, from_bytes);
    }

    #[test]
    fn test_content_checksum_differs_on_change() {
        assert_ne!(content_checksum(b"a"), content_checksum(b"b"));
    }

    #[test]
    fn test_file_checksum_file_not_found() {
        assert!(file_checksum("/path/to/nonexistent/file").is_err());
    }
}
