//! Receiving side of the internal push channel.
//!
//! The (external) web layer parses the HTTP request into a [`PushRequest`]
//! and calls [`receive_push`]; the returned status maps to 202/403.

use std::{
    fs,
    io::Write,
    path::{Component, Path},
};

use nix::sys::{stat::utimes, time::TimeVal};
use tracing::{debug, warn};
use wharf_utils::fs::ensure_dir_exists;

use crate::{
    error::{ErrorContext, Result},
    payload::{gunzip, PushRequest},
    signature::verify,
};

/// Outcome of one push request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    /// Payload verified and committed.
    Accepted,
    /// Bad signature or unacceptable path; nothing was written.
    Forbidden,
}

/// Verifies and commits one pushed document.
///
/// The signature is checked over the wire payload before decompression.
/// The document is written to a temporary sibling, its modification time
/// restored to the pushed value, then atomically renamed into place, so
/// local readers on the edge node never observe partial files.
///
/// # Errors
///
/// Returns an error only for local I/O failures; authentication and path
/// problems are reported as [`PushStatus::Forbidden`].
pub fn receive_push(request: &PushRequest, secret: &[u8], base_dir: &Path) -> Result<PushStatus> {
    if !is_safe_relative_path(&request.path) {
        warn!("Rejected push with unacceptable path {:?}", request.path);
        return Ok(PushStatus::Forbidden);
    }

    if !verify(
        &request.signature,
        &request.path,
        &request.contents,
        request.mtime,
        secret,
    ) {
        warn!("Rejected push for {} with bad signature", request.path);
        return Ok(PushStatus::Forbidden);
    }

    let document = gunzip(&request.contents)?;
    let target = base_dir.join(&request.path);

    if let Some(parent) = target.parent() {
        ensure_dir_exists(parent).map_err(|err| {
            crate::error::EdgeError::IoError {
                action: format!("creating directory {}", parent.display()),
                source: std::io::Error::other(err.to_string()),
            }
        })?;
    }

    let tmp_path = target.with_extension("json.tmp");
    let mut file = fs::File::create(&tmp_path)
        .with_context(|| format!("creating temporary file {}", tmp_path.display()))?;
    file.write_all(&document)
        .and_then(|()| file.sync_all())
        .with_context(|| format!("writing temporary file {}", tmp_path.display()))?;
    drop(file);

    // Keep the origin's mtime so downstream staleness checks agree across
    // tiers.
    let time = TimeVal::new(request.mtime, 0);
    utimes(&tmp_path, &time, &time).map_err(|errno| {
        crate::error::EdgeError::IoError {
            action: format!("setting mtime on {}", tmp_path.display()),
            source: std::io::Error::from(errno),
        }
    })?;

    fs::rename(&tmp_path, &target)
        .with_context(|| format!("renaming {} into place", tmp_path.display()))?;

    debug!("Committed pushed document {}", request.path);
    Ok(PushStatus::Accepted)
}

fn is_safe_relative_path(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::{payload::gzip, signature::sign};

    const SECRET: &[u8] = b"edge-secret";

    fn request(path: &str, document: &[u8], mtime: i64) -> PushRequest {
        let contents = gzip(document).unwrap();
        let signature = sign(path, &contents, mtime, SECRET);
        PushRequest {
            path: path.to_string(),
            contents,
            mtime,
            signature,
        }
    }

    #[test]
    fn test_valid_push_is_committed_with_mtime() {
        let dir = tempdir().unwrap();
        let req = request("p2/acme/widget.json", b"{\"packages\":{}}", 1_700_000_000);

        let status = receive_push(&req, SECRET, dir.path()).unwrap();
        assert_eq!(status, PushStatus::Accepted);

        let target = dir.path().join("p2/acme/widget.json");
        assert_eq!(fs::read(&target).unwrap(), b"{\"packages\":{}}");

        let mtime = fs::metadata(&target)
            .unwrap()
            .modified()
            .unwrap()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        assert_eq!(mtime, 1_700_000_000);
    }

    #[test]
    fn test_bad_signature_is_forbidden_and_writes_nothing() {
        let dir = tempdir().unwrap();
        let mut req = request("p2/acme/widget.json", b"{}", 1_700_000_000);
        req.signature = sign("p2/acme/widget.json", b"other", 1_700_000_000, SECRET);

        let status = receive_push(&req, SECRET, dir.path()).unwrap();
        assert_eq!(status, PushStatus::Forbidden);
        assert!(!dir.path().join("p2/acme/widget.json").exists());
    }

    #[test]
    fn test_wrong_secret_is_forbidden() {
        let dir = tempdir().unwrap();
        let req = request("p2/acme/widget.json", b"{}", 1_700_000_000);

        let status = receive_push(&req, b"not-the-secret", dir.path()).unwrap();
        assert_eq!(status, PushStatus::Forbidden);
    }

    #[test]
    fn test_path_traversal_is_forbidden() {
        let dir = tempdir().unwrap();
        for path in ["../etc/passwd", "/etc/passwd", ""] {
            let req = request(path, b"{}", 0);
            let status = receive_push(&req, SECRET, dir.path()).unwrap();
            assert_eq!(status, PushStatus::Forbidden, "path {path:?}");
        }
    }

    #[test]
    fn test_push_replaces_previous_document() {
        let dir = tempdir().unwrap();

        let first = request("p2/acme/widget.json", b"old", 100);
        receive_push(&first, SECRET, dir.path()).unwrap();

        let second = request("p2/acme/widget.json", b"new", 200);
        receive_push(&second, SECRET, dir.path()).unwrap();

        assert_eq!(
            fs::read(dir.path().join("p2/acme/widget.json")).unwrap(),
            b"new"
        );
    }
}
