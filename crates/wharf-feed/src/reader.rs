//! Serves incremental replication queries with a resync fallback.

use std::collections::HashMap;

use diesel::SqliteConnection;
use tracing::debug;
use wharf_store::repository::FeedRepository;

use crate::{
    error::{FeedError, Result},
    score::{head_score, PROTOCOL_EPOCH},
    types::{ActionType, FeedAction, FeedResponse},
};

/// Deletes arriving within this many score units of the newest related
/// update still win the merge; the update is considered part of the same
/// racing publish. The constant is part of the replication contract with
/// downstream mirrors.
pub const DELETE_RACE_WINDOW: i64 = 10;

/// Ceiling on merged actions per reply. Anything larger degrades to a
/// single resync instead of an unbounded list.
pub const MAX_ACTIONS: usize = 100_000;

/// Read side of the change feed.
pub struct FeedReader;

impl FeedReader {
    /// Answers a cursor-based incremental query.
    ///
    /// A resync reply (retention gap or oversized window) is a normal
    /// outcome, not an error; the only rejected input is a cursor that
    /// predates the protocol epoch and therefore cannot have come from
    /// this feed.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidSince`] for a pre-epoch cursor, or a
    /// query error if the store is unreachable.
    pub fn changes(conn: &mut SqliteConnection, since: i64) -> Result<FeedResponse> {
        if since < PROTOCOL_EPOCH {
            return Err(FeedError::InvalidSince(since));
        }
        Self::changes_between(conn, since, head_score(), MAX_ACTIONS)
    }

    fn changes_between(
        conn: &mut SqliteConnection,
        since: i64,
        head: i64,
        ceiling: usize,
    ) -> Result<FeedResponse> {
        if since < FeedRepository::oldest_retained(conn)? {
            debug!("Cursor {} is below the retained floor, serving resync", since);
            return Ok(Self::resync_response(head));
        }

        let mut latest_updates: HashMap<String, i64> = HashMap::new();
        for entry in FeedRepository::updates_in(conn, since, head)? {
            latest_updates.insert(entry.package, entry.score);
        }

        let mut latest_deletes: HashMap<String, i64> = HashMap::new();
        for entry in FeedRepository::deletes_in(conn, since, head)? {
            latest_deletes.insert(entry.package, entry.score);
        }

        let mut merged: Vec<FeedAction> = Vec::new();
        for (package, delete_score) in latest_deletes {
            match latest_updates.get(&package) {
                // The package was re-published clearly after the delete:
                // the client converges on the update alone.
                Some(&update_score) if update_score > delete_score + DELETE_RACE_WINDOW => {}
                _ => {
                    latest_updates.remove(&package);
                    merged.push(FeedAction::from_score(
                        ActionType::Delete,
                        package,
                        delete_score,
                    ));
                }
            }
        }
        for (package, score) in latest_updates {
            merged.push(FeedAction::from_score(ActionType::Update, package, score));
        }

        if merged.len() > ceiling {
            debug!(
                "Merged action count {} exceeds ceiling {}, serving resync",
                merged.len(),
                ceiling
            );
            return Ok(Self::resync_response(head));
        }

        merged.sort_by(|a, b| a.time.cmp(&b.time).then(a.package.cmp(&b.package)));

        Ok(FeedResponse {
            actions: merged,
            timestamp: head,
        })
    }

    fn resync_response(head: i64) -> FeedResponse {
        FeedResponse {
            actions: vec![FeedAction::resync(head)],
            timestamp: head,
        }
    }
}
