/// All event types emitted by wharf pipeline jobs.
#[derive(Debug, Clone)]
pub enum WharfEvent {
    /// A dump pass is starting over a set of stale packages.
    DumpStarting { package_count: usize },
    /// One package's documents were regenerated.
    PackageDumped {
        package: String,
        /// False when the regenerated documents were byte-identical and no
        /// file was touched.
        changed: bool,
    },
    /// One package failed to dump; it stays stale and is retried next pass.
    PackageFailed { package: String, error: String },
    /// A package's documents were removed from the local tier.
    PackageRemoved { package: String },
    /// The root index document was rebuilt.
    IndexRebuilt { package_count: usize },
    /// A dump pass finished.
    DumpComplete {
        dumped: usize,
        unchanged: usize,
        failed: usize,
    },
    /// Edge push progress for one file.
    EdgePush { path: String, stage: EdgePushStage },
    /// Garbage collection progress.
    Gc { stage: GcStage },
    /// Change-feed retention trimming removed old entries.
    FeedTrimmed { removed: usize },
}

/// Edge push stages for a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgePushStage {
    /// Push request is being sent to an edge node.
    Pushing { node: String },
    /// The node accepted the file.
    Accepted { node: String },
    /// The node rejected or failed the push. Local serving is unaffected,
    /// but sustained failures mean silent edge staleness.
    Failed { node: String, error: String },
    /// The package vanished from the live catalog before the push; the file
    /// was skipped so deleted content cannot resurrect on the edge.
    Skipped,
}

/// Garbage collection stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GcStage {
    /// Scanning the on-disk namespace.
    Scanning,
    /// Removing one orphaned package's artifacts.
    RemovingOrphan { package: String },
    /// GC finished.
    Complete { removed: usize },
}
