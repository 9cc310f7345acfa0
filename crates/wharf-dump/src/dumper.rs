//! The dump generator: turns stale catalog rows into published metadata
//! documents.

use std::collections::HashSet;

use tracing::{debug, info, warn};
use wharf_edge::PushFile;
use wharf_events::WharfEvent;
use wharf_metadata::{
    document_bytes, legacy_documents, legacy_path, modern_document, modern_path, root_index,
    ROOT_INDEX,
};
use wharf_store::{
    models::PackageRecord,
    repository::PackageRepository,
};
use wharf_utils::{
    fs::{atomic_write, safe_remove},
    hash::{content_checksum, file_checksum},
    lock::{deployment_in_progress, Lease},
    time::epoch_millis,
};

use crate::{
    context::DumpContext,
    error::{DumpError, ErrorContext, Result},
};

/// Lease name guarding dump generation.
pub const DUMP_LEASE: &str = "dump";

/// Lease name guarding garbage collection. Distinct from [`DUMP_LEASE`] but
/// in the same job family: the two never write the same files while both
/// leases are honored.
pub const GC_LEASE: &str = "dump-gc";

/// What to dump.
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// Ignore staleness and regenerate the whole catalog.
    pub force: bool,
    /// Restrict the run to these packages instead of the stale set.
    pub packages: Option<Vec<String>>,
}

/// Aggregated result of one or more dump passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpSummary {
    pub dumped: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl DumpSummary {
    pub fn merge(&mut self, other: DumpSummary) {
        self.dumped += other.dumped;
        self.unchanged += other.unchanged;
        self.failed += other.failed;
    }
}

/// Runs one lease-guarded dump pass.
///
/// Returns `None` without doing any work when another process holds the
/// dump lease or a deployment is in progress; both are "nothing to do"
/// outcomes, not errors.
///
/// # Errors
///
/// Infrastructure-level failures (store unreachable, root index write
/// failing) abort the run; the lease is released regardless. Per-package
/// failures are contained inside the summary.
pub fn run_dump(ctx: &mut DumpContext, options: &DumpOptions) -> Result<Option<DumpSummary>> {
    let lock_dir = ctx.config.lock_dir();

    if deployment_in_progress(&lock_dir) {
        info!("Deployment in progress, not dumping");
        return Ok(None);
    }

    let Some(lease) = Lease::try_acquire(&lock_dir, DUMP_LEASE, ctx.config.lease_ttl_millis())?
    else {
        info!("Aborting, dump is already in progress elsewhere");
        return Ok(None);
    };

    let result = dump_pass(ctx, options);
    let released = lease.release();

    let summary = result?;
    released?;
    Ok(Some(summary))
}

/// One pass over the requested package set. The caller holds the dump
/// lease.
pub(crate) fn dump_pass(ctx: &mut DumpContext, options: &DumpOptions) -> Result<DumpSummary> {
    let now = epoch_millis();

    let ids = match &options.packages {
        Some(names) => {
            let mut ids = Vec::with_capacity(names.len());
            for name in names {
                let package = ctx
                    .db
                    .with_conn(|conn| PackageRepository::by_name(conn, name))?
                    .ok_or_else(|| DumpError::PackageNotFound(name.clone()))?;
                ids.push(package.id);
            }
            ids
        }
        None if options.force => ctx.db.with_conn(PackageRepository::all_ids)?,
        None => ctx
            .db
            .with_conn(|conn| PackageRepository::stale_ids(conn, now))?,
    };

    if ids.is_empty() {
        debug!("No stale packages, nothing to do");
        return Ok(DumpSummary::default());
    }

    info!("Dumping {} packages", ids.len());
    ctx.events.emit(WharfEvent::DumpStarting {
        package_count: ids.len(),
    });

    let packages = ctx
        .db
        .with_conn(|conn| PackageRepository::by_ids(conn, &ids))?;

    let mut summary = DumpSummary::default();
    let mut push_files: Vec<PushFile> = Vec::new();

    for package in &packages {
        match dump_package(ctx, package) {
            Ok(files) => {
                let changed = !files.is_empty();
                if changed {
                    summary.dumped += 1;
                } else {
                    summary.unchanged += 1;
                }
                push_files.extend(files);
                ctx.events.emit(WharfEvent::PackageDumped {
                    package: package.name.clone(),
                    changed,
                });
            }
            Err(err) => {
                // The package stays stale and gets retried next pass.
                warn!("Failed to dump {}: {}", package.name, err);
                summary.failed += 1;
                ctx.events.emit(WharfEvent::PackageFailed {
                    package: package.name.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    if let Some(file) = rebuild_root_index(ctx)? {
        push_files.push(file);
    }

    publish_to_edge(ctx, &push_files)?;

    info!(
        "Dump pass done: {} dumped, {} unchanged, {} failed",
        summary.dumped, summary.unchanged, summary.failed
    );
    ctx.events.emit(WharfEvent::DumpComplete {
        dumped: summary.dumped,
        unchanged: summary.unchanged,
        failed: summary.failed,
    });

    Ok(summary)
}

/// Regenerates one package's documents.
///
/// Returns the files that actually changed on disk, ready for edge
/// publication; an empty list means the regenerated documents were
/// byte-identical. Dump timestamps advance in either case, but only after
/// every changed file has been durably renamed into place, so a failed
/// write leaves the package stale.
fn dump_package(ctx: &mut DumpContext, package: &PackageRecord) -> Result<Vec<PushFile>> {
    let versions = ctx
        .db
        .with_conn(|conn| PackageRepository::versions_of(conn, package.id))?;

    let modern = document_bytes(&modern_document(package, &versions))?;
    let (stable, dev) = legacy_documents(package, &versions);
    let documents = [
        (modern_path(&package.name), modern),
        (legacy_path(&package.name, false), document_bytes(&stable)?),
        (legacy_path(&package.name, true), document_bytes(&dev)?),
    ];

    let base = ctx.config.metadata_dir();
    let mut changed = Vec::new();

    for (relative_path, contents) in documents {
        let target = base.join(&relative_path);
        if target.exists() && file_checksum(&target)? == content_checksum(&contents) {
            continue;
        }

        atomic_write(&target, &contents)?;
        let mtime = file_mtime_secs(&target)?;
        changed.push(PushFile {
            relative_path,
            contents,
            mtime,
            package: Some(package.name.clone()),
        });
    }

    let now = epoch_millis();
    ctx.db.with_conn(|conn| -> diesel::QueryResult<()> {
        PackageRepository::mark_dumped(conn, package.id, now)?;
        PackageRepository::mark_dumped_v2(conn, package.id, now)?;
        Ok(())
    })?;

    if !changed.is_empty() {
        ctx.db
            .with_conn(|conn| ctx.recorder.record_update(conn, &package.name))?;
    }

    Ok(changed)
}

/// Deletes every document belonging to `package` from the local tier and
/// records the deletion in the change feed. Edge nodes converge through
/// the feed rather than through an explicit push.
pub fn remove_package_artifacts(ctx: &mut DumpContext, package: &str) -> Result<()> {
    let base = ctx.config.metadata_dir();
    safe_remove(base.join(modern_path(package)))?;
    safe_remove(base.join(legacy_path(package, false)))?;
    safe_remove(base.join(legacy_path(package, true)))?;

    ctx.db
        .with_conn(|conn| ctx.recorder.record_delete(conn, package))?;

    info!("Removed metadata documents of {}", package);
    ctx.events.emit(WharfEvent::PackageRemoved {
        package: package.to_string(),
    });
    Ok(())
}

/// Rebuilds the root index from the live catalog.
///
/// The index references per-package documents by name convention only, so
/// it can be rebuilt at any time, including while package documents are
/// mid-flight.
pub(crate) fn rebuild_root_index(ctx: &mut DumpContext) -> Result<Option<PushFile>> {
    let names = ctx.db.with_conn(PackageRepository::live_names)?;
    let contents = document_bytes(&root_index(&names))?;

    let target = ctx.config.metadata_dir().join(ROOT_INDEX);
    if target.exists() && file_checksum(&target)? == content_checksum(&contents) {
        return Ok(None);
    }

    atomic_write(&target, &contents)?;
    debug!("Root index rebuilt with {} packages", names.len());
    ctx.events.emit(WharfEvent::IndexRebuilt {
        package_count: names.len(),
    });

    let mtime = file_mtime_secs(&target)?;
    Ok(Some(PushFile {
        relative_path: ROOT_INDEX.to_string(),
        contents,
        mtime,
        package: None,
    }))
}

fn publish_to_edge(ctx: &mut DumpContext, files: &[PushFile]) -> Result<()> {
    if !ctx.publisher.is_active() || files.is_empty() {
        return Ok(());
    }

    // Re-check liveness at push time so a package deleted since its local
    // write cannot resurrect on the edge.
    let live: HashSet<String> = ctx
        .db
        .with_conn(PackageRepository::live_names)?
        .into_iter()
        .collect();

    ctx.publisher
        .push_batch(files, |package| live.contains(package))?;
    Ok(())
}

fn file_mtime_secs(path: &std::path::Path) -> Result<i64> {
    let modified = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .with_context(|| format!("reading mtime of {}", path.display()))?;
    let secs = modified
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use std::{fs, sync::Arc};

    use diesel::prelude::*;
    use wharf_config::Config;
    use wharf_events::NullSink;
    use wharf_metadata::expand;
    use wharf_store::{
        models::{NewPackage, NewVersion},
        repository::FeedRepository,
        schema::{packages, versions},
    };
    use wharf_utils::lock::DEPLOY_SENTINEL;

    use super::*;

    fn test_context(dir: &std::path::Path) -> DumpContext {
        let config = Config {
            metadata_dir: Some(dir.join("metadata").to_string_lossy().into_owned()),
            db_path: Some(dir.join("wharf.db").to_string_lossy().into_owned()),
            lock_dir: Some(dir.join("locks").to_string_lossy().into_owned()),
            ..Config::default()
        };
        DumpContext::new(config, Arc::new(NullSink)).unwrap()
    }

    fn seed_package(ctx: &mut DumpContext, name: &str) -> i64 {
        let conn = ctx.db.conn();
        diesel::insert_into(packages::table)
            .values(NewPackage {
                name: name.to_string(),
                crawled_at: Some(100),
                frozen: None,
                abandoned: false,
                replacement_package: None,
            })
            .execute(conn)
            .unwrap();
        let id: i64 = packages::table
            .filter(packages::name.eq(name))
            .select(packages::id)
            .first(conn)
            .unwrap();

        for (version, dev) in [("1.0.0", false), ("dev-main", true)] {
            diesel::insert_into(versions::table)
                .values(NewVersion {
                    package_id: id,
                    version: version.to_string(),
                    normalized_version: format!("{version}.0"),
                    dev,
                    require: Some(r#"{"php":">=8.1"}"#.to_string()),
                    ..Default::default()
                })
                .execute(conn)
                .unwrap();
        }
        id
    }

    #[test]
    fn test_dump_writes_all_documents() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        seed_package(&mut ctx, "acme/widget");

        let summary = run_dump(&mut ctx, &DumpOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(summary.dumped, 1);
        assert_eq!(summary.failed, 0);

        let base = ctx.config.metadata_dir();
        let modern: serde_json::Value =
            serde_json::from_slice(&fs::read(base.join("p2/acme/widget.json")).unwrap()).unwrap();
        assert_eq!(modern["minified"], "composer/2.0");
        let expanded = expand(modern["packages"]["acme/widget"].as_array().unwrap());
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0]["require"]["php"], ">=8.1");

        assert!(base.join("p/acme/widget.json").exists());
        assert!(base.join("p/acme/widget~dev.json").exists());

        let index: serde_json::Value =
            serde_json::from_slice(&fs::read(base.join("packages.json")).unwrap()).unwrap();
        assert_eq!(index["available-packages"], serde_json::json!(["acme/widget"]));
    }

    #[test]
    fn test_dump_advances_timestamps_and_clears_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        seed_package(&mut ctx, "acme/widget");

        run_dump(&mut ctx, &DumpOptions::default()).unwrap().unwrap();

        let stale = ctx
            .db
            .with_conn(|conn| PackageRepository::stale_ids(conn, epoch_millis()))
            .unwrap();
        assert!(stale.is_empty());
    }

    #[test]
    fn test_redump_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        seed_package(&mut ctx, "acme/widget");

        run_dump(&mut ctx, &DumpOptions::default()).unwrap().unwrap();
        let base = ctx.config.metadata_dir();
        let first = fs::read(base.join("p2/acme/widget.json")).unwrap();

        let summary = run_dump(
            &mut ctx,
            &DumpOptions {
                force: true,
                ..DumpOptions::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(summary.dumped, 0);
        assert_eq!(summary.unchanged, 1);

        assert_eq!(fs::read(base.join("p2/acme/widget.json")).unwrap(), first);

        // No redundant feed entry for the unchanged re-dump.
        let updates = ctx
            .db
            .with_conn(|conn| FeedRepository::updates_in(conn, 0, i64::MAX))
            .unwrap();
        assert_eq!(updates.len(), 1);
    }

    #[test]
    fn test_changed_package_appends_feed_entry() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        let id = seed_package(&mut ctx, "acme/widget");

        run_dump(&mut ctx, &DumpOptions::default()).unwrap().unwrap();

        diesel::insert_into(versions::table)
            .values(NewVersion {
                package_id: id,
                version: "1.1.0".to_string(),
                normalized_version: "1.1.0.0".to_string(),
                ..Default::default()
            })
            .execute(ctx.db.conn())
            .unwrap();

        let summary = run_dump(
            &mut ctx,
            &DumpOptions {
                force: true,
                ..DumpOptions::default()
            },
        )
        .unwrap()
        .unwrap();
        assert_eq!(summary.dumped, 1);

        let updates = ctx
            .db
            .with_conn(|conn| FeedRepository::updates_in(conn, 0, i64::MAX))
            .unwrap();
        assert_eq!(updates.len(), 2);
    }

    #[test]
    fn test_concurrent_dump_exits_without_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        seed_package(&mut ctx, "acme/widget");

        let lease = Lease::try_acquire(ctx.config.lock_dir(), DUMP_LEASE, 60_000)
            .unwrap()
            .unwrap();

        let result = run_dump(&mut ctx, &DumpOptions::default()).unwrap();
        assert!(result.is_none());
        assert!(!ctx.config.metadata_dir().join("p2/acme/widget.json").exists());

        let stale = ctx
            .db
            .with_conn(|conn| PackageRepository::stale_ids(conn, epoch_millis()))
            .unwrap();
        assert_eq!(stale.len(), 1, "timestamps must not advance");

        drop(lease);
        assert!(run_dump(&mut ctx, &DumpOptions::default()).unwrap().is_some());
    }

    #[test]
    fn test_deploy_sentinel_suppresses_dumping() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        seed_package(&mut ctx, "acme/widget");

        let lock_dir = ctx.config.lock_dir();
        fs::create_dir_all(&lock_dir).unwrap();
        fs::write(lock_dir.join(DEPLOY_SENTINEL), b"").unwrap();

        assert!(run_dump(&mut ctx, &DumpOptions::default()).unwrap().is_none());
    }

    #[test]
    fn test_unknown_package_filter_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());

        let result = run_dump(
            &mut ctx,
            &DumpOptions {
                packages: Some(vec!["no/such".to_string()]),
                ..DumpOptions::default()
            },
        );
        assert!(matches!(result, Err(DumpError::PackageNotFound(_))));

        // The lease must have been released on the error path.
        assert!(
            Lease::try_acquire(ctx.config.lock_dir(), DUMP_LEASE, 60_000)
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_single_package_failure_does_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        seed_package(&mut ctx, "acme/widget");
        let broken_id = seed_package(&mut ctx, "broken/pkg");

        // Malformed structured data: this package fails to materialize.
        diesel::update(versions::table.filter(versions::package_id.eq(broken_id)))
            .set(versions::require.eq("{not json"))
            .execute(ctx.db.conn())
            .unwrap();

        let summary = run_dump(&mut ctx, &DumpOptions::default())
            .unwrap()
            .unwrap();
        assert_eq!(summary.dumped, 1);
        assert_eq!(summary.failed, 1);

        // The failed package stays stale for the next pass.
        let stale = ctx
            .db
            .with_conn(|conn| PackageRepository::stale_ids(conn, epoch_millis()))
            .unwrap();
        assert_eq!(stale, vec![broken_id]);
    }

    #[test]
    fn test_remove_package_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        seed_package(&mut ctx, "acme/widget");
        run_dump(&mut ctx, &DumpOptions::default()).unwrap().unwrap();

        remove_package_artifacts(&mut ctx, "acme/widget").unwrap();

        let base = ctx.config.metadata_dir();
        assert!(!base.join("p2/acme/widget.json").exists());
        assert!(!base.join("p/acme/widget.json").exists());
        assert!(!base.join("p/acme/widget~dev.json").exists());

        let deletes = ctx
            .db
            .with_conn(|conn| FeedRepository::deletes_in(conn, 0, i64::MAX))
            .unwrap();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0].package, "acme/widget");
    }
}
