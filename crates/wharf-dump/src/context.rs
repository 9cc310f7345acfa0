//! Shared handles for one pipeline process.

use wharf_config::Config;
use wharf_edge::EdgePublisher;
use wharf_events::EventSinkHandle;
use wharf_feed::FeedRecorder;
use wharf_store::Database;

use crate::error::Result;

/// Explicitly threaded context for dump and GC jobs.
///
/// Every job receives this instead of reaching for ambient globals: the
/// store connection, the event sink, the feed recorder and the edge
/// publisher all travel together.
pub struct DumpContext {
    pub config: Config,
    pub db: Database,
    pub events: EventSinkHandle,
    pub recorder: FeedRecorder,
    pub publisher: EdgePublisher,
}

impl DumpContext {
    /// Opens the store and wires up the edge publisher from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub fn new(config: Config, events: EventSinkHandle) -> Result<Self> {
        let db = Database::open(config.db_path())?;
        let publisher = EdgePublisher::new(
            config.edge.nodes.clone(),
            config.edge_concurrency(),
            events.clone(),
        );

        Ok(Self {
            config,
            db,
            events,
            recorder: FeedRecorder::new(),
            publisher,
        })
    }
}
