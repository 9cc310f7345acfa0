//! TTL-backed lease files for coordinating single-writer jobs across a
//! fleet of worker processes.
//!
//! A lease either succeeds immediately or fails immediately; callers are
//! periodically-scheduled maintenance jobs and must not queue up behind one
//! another. Expired leases can be stolen, so a crashed holder never blocks
//! the job family for longer than the TTL.

use std::{
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
    process,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{LockError, LockResult},
    time::epoch_millis,
};

/// File name of the out-of-band sentinel that suppresses all dumping while a
/// deployment is in progress, regardless of individual leases.
pub const DEPLOY_SENTINEL: &str = "deploy-in-progress";

#[derive(Debug, Serialize, Deserialize)]
struct LeaseFile {
    holder: String,
    expires_at: i64,
}

/// A named, non-blocking, TTL-bound mutual-exclusion token.
///
/// Dropping the lease releases it if this process still holds it.
pub struct Lease {
    name: String,
    path: PathBuf,
    holder: String,
    released: bool,
}

impl Lease {
    /// Try to acquire the named lease without blocking.
    ///
    /// Returns `None` if another holder owns an unexpired lease. An expired
    /// lease file is stolen: it is removed and re-created, and whichever
    /// contender wins the re-create owns the lease; the loser observes the
    /// fresh metadata and backs off.
    pub fn try_acquire<P: AsRef<Path>>(dir: P, name: &str, ttl_millis: i64) -> LockResult<Option<Self>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| LockError::AcquireFailed {
            name: name.to_string(),
            source,
        })?;

        let path = lease_path(dir, name);
        let holder = format!("{}:{}", hostname(), process::id());

        // One steal attempt at most; a second AlreadyExists means a
        // concurrent contender won the re-create.
        for attempt in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let lease = LeaseFile {
                        holder: holder.clone(),
                        expires_at: epoch_millis() + ttl_millis,
                    };
                    let body = serde_json::to_vec(&lease).map_err(|err| {
                        LockError::CorruptLease {
                            path: path.clone(),
                            reason: err.to_string(),
                        }
                    })?;
                    file.write_all(&body)
                        .and_then(|()| file.sync_all())
                        .map_err(|source| LockError::AcquireFailed {
                            name: name.to_string(),
                            source,
                        })?;

                    return Ok(Some(Lease {
                        name: name.to_string(),
                        path,
                        holder,
                        released: false,
                    }));
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    if attempt > 0 || !Self::is_expired(&path)? {
                        return Ok(None);
                    }
                    // Stale holder: remove and contend for the re-create.
                    match fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(err) if err.kind() == ErrorKind::NotFound => {}
                        Err(source) => {
                            return Err(LockError::AcquireFailed {
                                name: name.to_string(),
                                source,
                            })
                        }
                    }
                }
                Err(source) => {
                    return Err(LockError::AcquireFailed {
                        name: name.to_string(),
                        source,
                    })
                }
            }
        }

        Ok(None)
    }

    fn is_expired(path: &Path) -> LockResult<bool> {
        let body = match fs::read(path) {
            Ok(body) => body,
            // Holder released between our open and read attempts.
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(true),
            Err(source) => {
                return Err(LockError::AcquireFailed {
                    name: path.display().to_string(),
                    source,
                })
            }
        };

        let lease: LeaseFile =
            serde_json::from_slice(&body).map_err(|err| LockError::CorruptLease {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;

        Ok(lease.expires_at <= epoch_millis())
    }

    /// Extends the lease expiry by `ttl_millis` from now.
    ///
    /// Long-running holders call this between work passes so the lease
    /// outlives the TTL only while the holder is demonstrably alive.
    pub fn refresh(&self, ttl_millis: i64) -> LockResult<()> {
        let lease = LeaseFile {
            holder: self.holder.clone(),
            expires_at: epoch_millis() + ttl_millis,
        };
        let body = serde_json::to_vec(&lease).map_err(|err| LockError::CorruptLease {
            path: self.path.clone(),
            reason: err.to_string(),
        })?;
        fs::write(&self.path, body).map_err(|source| LockError::ReleaseFailed {
            name: self.name.clone(),
            source,
        })
    }

    /// Releases the lease, removing its file if this holder still owns it.
    pub fn release(mut self) -> LockResult<()> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> LockResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        // Only remove the file if it is still ours; a stolen (expired) lease
        // now belongs to someone else.
        match fs::read(&self.path) {
            Ok(body) => {
                if let Ok(lease) = serde_json::from_slice::<LeaseFile>(&body) {
                    if lease.holder != self.holder {
                        return Ok(());
                    }
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(LockError::ReleaseFailed {
                    name: self.name.clone(),
                    source,
                })
            }
        }

        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LockError::ReleaseFailed {
                name: self.name.clone(),
                source,
            }),
        }
    }

    /// The lease name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the lease file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        let _ = self.release_inner();
    }
}

fn lease_path(dir: &Path, name: &str) -> PathBuf {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    dir.join(format!("{sanitized}.lease"))
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

/// Lease name for maintenance jobs touching a single package.
pub fn package_lock_name(package_id: i64) -> String {
    format!("package-update-{package_id}")
}

/// Lease name for jobs consuming one external category source, e.g. an
/// advisory database or a filter list.
pub fn category_lock_name(category: &str) -> String {
    format!("category-{category}")
}

/// Checks the out-of-band deployment sentinel.
///
/// While the sentinel file exists under the lock directory, every dump job
/// must exit without doing any work.
pub fn deployment_in_progress<P: AsRef<Path>>(dir: P) -> bool {
    dir.as_ref().join(DEPLOY_SENTINEL).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TTL: i64 = 60_000;

    #[test]
    fn test_lease_path_sanitization() {
        let dir = tempdir().unwrap();
        let path = lease_path(dir.path(), "dump/gc");
        assert!(path.to_string_lossy().ends_with("dump_gc.lease"));
    }

    #[test]
    fn test_exclusive_acquisition() {
        let dir = tempdir().unwrap();

        let first = Lease::try_acquire(dir.path(), "dump", TTL).unwrap();
        assert!(first.is_some());

        let second = Lease::try_acquire(dir.path(), "dump", TTL).unwrap();
        assert!(second.is_none(), "held lease must not be re-acquired");

        drop(first);

        let third = Lease::try_acquire(dir.path(), "dump", TTL).unwrap();
        assert!(third.is_some(), "released lease must be acquirable");
    }

    #[test]
    fn test_distinct_names_do_not_conflict() {
        let dir = tempdir().unwrap();
        let dump = Lease::try_acquire(dir.path(), "dump", TTL).unwrap().unwrap();
        let gc = Lease::try_acquire(dir.path(), "dump-gc", TTL).unwrap().unwrap();
        assert_ne!(dump.path(), gc.path());
    }

    #[test]
    fn test_expired_lease_is_stolen() {
        let dir = tempdir().unwrap();

        let stale = Lease::try_acquire(dir.path(), "dump", -1).unwrap().unwrap();
        // Simulate a crashed holder: the file stays behind.
        std::mem::forget(stale);

        let stolen = Lease::try_acquire(dir.path(), "dump", TTL).unwrap();
        assert!(stolen.is_some(), "expired lease must be stolen");
    }

    #[test]
    fn test_release_leaves_stolen_lease_alone() {
        let dir = tempdir().unwrap();

        let mut stale = Lease::try_acquire(dir.path(), "dump", -1).unwrap().unwrap();
        let thief = Lease::try_acquire(dir.path(), "dump", TTL).unwrap().unwrap();

        // The original holder's cleanup must not remove the thief's lease.
        stale.release_inner().unwrap();
        assert!(thief.path().exists());

        let contender = Lease::try_acquire(dir.path(), "dump", TTL).unwrap();
        assert!(contender.is_none());
    }

    #[test]
    fn test_refresh_extends_expiry() {
        let dir = tempdir().unwrap();
        let lease = Lease::try_acquire(dir.path(), "dump", 50).unwrap().unwrap();
        lease.refresh(TTL).unwrap();

        let body = fs::read(lease.path()).unwrap();
        let on_disk: LeaseFile = serde_json::from_slice(&body).unwrap();
        assert!(on_disk.expires_at > epoch_millis() + TTL / 2);
    }

    #[test]
    fn test_deployment_sentinel() {
        let dir = tempdir().unwrap();
        assert!(!deployment_in_progress(dir.path()));
        fs::write(dir.path().join(DEPLOY_SENTINEL), b"").unwrap();
        assert!(deployment_in_progress(dir.path()));
    }

    #[test]
    fn test_lock_name_helpers() {
        assert_eq!(package_lock_name(42), "package-update-42");
        assert_eq!(category_lock_name("advisories"), "category-advisories");
    }
}
