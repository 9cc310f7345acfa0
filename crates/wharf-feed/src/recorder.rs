//! Appends publish/delete events to the feed indexes.

use diesel::SqliteConnection;
use tracing::debug;
use wharf_store::repository::FeedRepository;
use wharf_utils::time::epoch_millis;

use crate::{
    error::Result,
    score::{ScoreClock, SCORE_RESOLUTION},
};

/// Records every successful document publish or delete.
///
/// Safe to share across threads; scores from one recorder are strictly
/// ordered even under concurrent appends.
#[derive(Default)]
pub struct FeedRecorder {
    clock: ScoreClock,
}

impl FeedRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an update entry for `package`, returning its score.
    pub fn record_update(&self, conn: &mut SqliteConnection, package: &str) -> Result<i64> {
        let score = self.clock.next();
        FeedRepository::record_update(conn, package, score)?;
        debug!("Recorded feed update for {} at {}", package, score);
        Ok(score)
    }

    /// Appends a delete entry for `package`, returning its score.
    pub fn record_delete(&self, conn: &mut SqliteConnection, package: &str) -> Result<i64> {
        let score = self.clock.next();
        FeedRepository::record_delete(conn, package, score)?;
        debug!("Recorded feed delete for {} at {}", package, score);
        Ok(score)
    }

    /// Discards entries older than the retention window and advances the
    /// oldest-retained boundary, bounding the otherwise unbounded log.
    pub fn trim(&self, conn: &mut SqliteConnection, retention_millis: i64) -> Result<usize> {
        let cutoff = (epoch_millis() - retention_millis) * SCORE_RESOLUTION;
        let removed = FeedRepository::trim(conn, cutoff)?;
        if removed > 0 {
            debug!("Trimmed {} feed entries below {}", removed, cutoff);
        }
        Ok(removed)
    }
}
