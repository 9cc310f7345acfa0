//! The bounded long-running dump loop.
//!
//! Large catalogs are processed as repeated short passes rather than one
//! shot: each pass re-queries the stale set, and the loop exits on
//! cooperative cancellation, when a deployment starts, or ahead of the
//! next scheduling boundary so external supervision restarts it
//! predictably.

use std::time::{Duration, Instant};

use tracing::{debug, info};
use wharf_utils::lock::{deployment_in_progress, Lease};

use crate::{
    context::DumpContext,
    dumper::{dump_pass, DumpOptions, DumpSummary, DUMP_LEASE},
    error::Result,
    shutdown::Shutdown,
};

/// Aggregated result of one loop invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopOutcome {
    pub passes: u32,
    pub summary: DumpSummary,
}

/// Runs the dump loop under a single lease.
///
/// Returns `None` without doing any work when the lease is held elsewhere
/// or a deployment is in progress.
///
/// # Errors
///
/// Infrastructure-level failures abort the loop; the lease is released
/// regardless.
pub async fn dump_loop(
    ctx: &mut DumpContext,
    shutdown: &Shutdown,
    options: &DumpOptions,
) -> Result<Option<LoopOutcome>> {
    let lock_dir = ctx.config.lock_dir();

    if deployment_in_progress(&lock_dir) {
        info!("Deployment in progress, not dumping");
        return Ok(None);
    }

    let ttl = ctx.config.lease_ttl_millis();
    let Some(lease) = Lease::try_acquire(&lock_dir, DUMP_LEASE, ttl)? else {
        info!("Aborting, dump is already in progress elsewhere");
        return Ok(None);
    };

    let iterations = ctx.config.dump_iterations().max(1);
    let interval = Duration::from_secs(ctx.config.dump_interval_secs());
    // The loop's own runtime budget doubles as the scheduling boundary.
    let deadline = Instant::now() + interval * iterations;

    let mut outcome = LoopOutcome::default();
    let result = run_passes(
        ctx,
        shutdown,
        options,
        &lease,
        iterations,
        interval,
        deadline,
        ttl,
        &mut outcome,
    )
    .await;
    let released = lease.release();

    result?;
    released?;
    Ok(Some(outcome))
}

#[allow(clippy::too_many_arguments)]
async fn run_passes(
    ctx: &mut DumpContext,
    shutdown: &Shutdown,
    options: &DumpOptions,
    lease: &Lease,
    iterations: u32,
    interval: Duration,
    deadline: Instant,
    ttl: i64,
    outcome: &mut LoopOutcome,
) -> Result<()> {
    let lock_dir = ctx.config.lock_dir();

    for pass in 0..iterations {
        if shutdown.is_cancelled() {
            debug!("Shutdown requested, exiting dump loop");
            break;
        }
        if deployment_in_progress(&lock_dir) {
            info!("Deployment started, exiting dump loop");
            break;
        }

        outcome.summary.merge(dump_pass(ctx, options)?);
        outcome.passes += 1;

        if pass + 1 == iterations {
            break;
        }
        if !interval.is_zero() && Instant::now() + interval >= deadline {
            debug!("Approaching the scheduling boundary, exiting dump loop early");
            break;
        }

        lease.refresh(ttl)?;
        tokio::time::sleep(interval).await;
    }

    Ok(())
}
