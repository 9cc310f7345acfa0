//! Garbage collection: reconciles the on-disk namespace with the live
//! catalog and bounds the change feed.

use std::{
    collections::BTreeSet,
    fs,
    path::Path,
};

use tracing::{debug, info};
use wharf_events::{GcStage, WharfEvent};
use wharf_store::repository::PackageRepository;
use wharf_utils::lock::Lease;

use crate::{
    context::DumpContext,
    dumper::{remove_package_artifacts, GC_LEASE},
    error::{ErrorContext, Result},
};

/// Runs one lease-guarded garbage collection pass.
///
/// Deletes documents of packages that are absent from the live catalog or
/// spam-frozen, then trims change-feed entries past the retention window.
/// Returns `None` without doing any work when another GC pass holds the
/// lease.
///
/// # Errors
///
/// Aborts on store or filesystem failures; the lease is released
/// regardless.
pub fn gc_run(ctx: &mut DumpContext) -> Result<Option<usize>> {
    let lock_dir = ctx.config.lock_dir();
    let Some(lease) = Lease::try_acquire(&lock_dir, GC_LEASE, ctx.config.lease_ttl_millis())?
    else {
        info!("Aborting, garbage collection is already in progress elsewhere");
        return Ok(None);
    };

    let result = gc_pass(ctx);
    let released = lease.release();

    let removed = result?;
    released?;
    Ok(Some(removed))
}

fn gc_pass(ctx: &mut DumpContext) -> Result<usize> {
    ctx.events.emit(WharfEvent::Gc {
        stage: GcStage::Scanning,
    });

    let base = ctx.config.metadata_dir();
    let on_disk = scan_package_names(&base)?;
    let live: BTreeSet<String> = ctx
        .db
        .with_conn(PackageRepository::live_names)?
        .into_iter()
        .collect();

    let orphans: Vec<String> = on_disk.difference(&live).cloned().collect();
    debug!(
        "GC scan: {} on disk, {} live, {} orphaned",
        on_disk.len(),
        live.len(),
        orphans.len()
    );

    let mut removed = 0;
    for orphan in &orphans {
        ctx.events.emit(WharfEvent::Gc {
            stage: GcStage::RemovingOrphan {
                package: orphan.clone(),
            },
        });
        remove_package_artifacts(ctx, orphan)?;
        removed += 1;
    }

    removed += remove_stale_provider_shards(&base)?;

    let retention = ctx.config.feed_retention_millis();
    let trimmed = ctx
        .db
        .with_conn(|conn| ctx.recorder.trim(conn, retention))?;
    if trimmed > 0 {
        ctx.events.emit(WharfEvent::FeedTrimmed { removed: trimmed });
    }

    info!("GC removed {} orphaned packages", removed);
    ctx.events.emit(WharfEvent::Gc {
        stage: GcStage::Complete { removed },
    });
    Ok(removed)
}

/// Removes provider-shard documents from earlier catalog generations.
///
/// Shards are no longer generated; any still on disk are stale by
/// definition.
fn remove_stale_provider_shards(base: &Path) -> Result<usize> {
    let root = base.join("p");
    if !root.is_dir() {
        return Ok(0);
    }

    let mut removed = 0;
    let entries =
        fs::read_dir(&root).with_context(|| format!("scanning namespace {}", root.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("scanning namespace {}", root.display()))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with("provider-") && file_name.ends_with(".json") {
            wharf_utils::fs::safe_remove(entry.path())?;
            debug!("Removed stale provider shard {}", file_name);
            removed += 1;
        }
    }

    Ok(removed)
}

/// Collects the package names present in the `p/` and `p2/` namespaces.
///
/// A dev-branch variant counts toward the same package name.
fn scan_package_names(base: &Path) -> Result<BTreeSet<String>> {
    let mut names = BTreeSet::new();

    for namespace in ["p", "p2"] {
        let root = base.join(namespace);
        if !root.is_dir() {
            continue;
        }

        let vendors = fs::read_dir(&root)
            .with_context(|| format!("scanning namespace {}", root.display()))?;
        for vendor in vendors {
            let vendor = vendor
                .with_context(|| format!("scanning namespace {}", root.display()))?;
            if !vendor.path().is_dir() {
                continue;
            }
            let vendor_name = vendor.file_name().to_string_lossy().into_owned();

            let entries = fs::read_dir(vendor.path())
                .with_context(|| format!("scanning vendor {}", vendor.path().display()))?;
            for entry in entries {
                let entry = entry
                    .with_context(|| format!("scanning vendor {}", vendor.path().display()))?;
                let file_name = entry.file_name().to_string_lossy().into_owned();
                let Some(stem) = file_name.strip_suffix(".json") else {
                    continue;
                };
                let package = stem.strip_suffix("~dev").unwrap_or(stem);
                names.insert(format!("{vendor_name}/{package}"));
            }
        }
    }

    Ok(names)
}
