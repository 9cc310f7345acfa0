//! Change-feed index storage.
//!
//! Updates and deletes live in two score-ordered tables. Appends and range
//! scans may run concurrently from independent worker processes; the schema
//! relies on monotonically increasing scores rather than locking.

use diesel::prelude::*;

use crate::{
    models::{FeedDeleteEntry, FeedEntry},
    schema::{feed_deletes, feed_meta, feed_updates},
};

/// Repository for change-feed operations.
pub struct FeedRepository;

impl FeedRepository {
    /// Appends an update entry. A replayed (package, score) pair is ignored.
    pub fn record_update(
        conn: &mut SqliteConnection,
        package: &str,
        score: i64,
    ) -> QueryResult<()> {
        diesel::insert_into(feed_updates::table)
            .values(FeedEntry {
                package: package.to_string(),
                score,
            })
            .on_conflict_do_nothing()
            .execute(conn)?;
        Ok(())
    }

    /// Appends a delete entry. A replayed (package, score) pair is ignored.
    pub fn record_delete(
        conn: &mut SqliteConnection,
        package: &str,
        score: i64,
    ) -> QueryResult<()> {
        diesel::insert_into(feed_deletes::table)
            .values(FeedDeleteEntry {
                package: package.to_string(),
                score,
            })
            .on_conflict_do_nothing()
            .execute(conn)?;
        Ok(())
    }

    /// Update entries with scores in `(since, head]`, ascending.
    pub fn updates_in(
        conn: &mut SqliteConnection,
        since: i64,
        head: i64,
    ) -> QueryResult<Vec<FeedEntry>> {
        feed_updates::table
            .filter(feed_updates::score.gt(since))
            .filter(feed_updates::score.le(head))
            .order(feed_updates::score.asc())
            .load(conn)
    }

    /// Delete entries with scores in `(since, head]`, ascending.
    pub fn deletes_in(
        conn: &mut SqliteConnection,
        since: i64,
        head: i64,
    ) -> QueryResult<Vec<FeedEntry>> {
        feed_deletes::table
            .filter(feed_deletes::score.gt(since))
            .filter(feed_deletes::score.le(head))
            .order(feed_deletes::score.asc())
            .select((feed_deletes::package, feed_deletes::score))
            .load(conn)
    }

    /// The oldest score still guaranteed to be present in the indexes.
    ///
    /// Zero means nothing has ever been trimmed: the (possibly empty)
    /// history is complete.
    pub fn oldest_retained(conn: &mut SqliteConnection) -> QueryResult<i64> {
        feed_meta::table
            .filter(feed_meta::id.eq(1_i64))
            .select(feed_meta::oldest_retained)
            .first(conn)
    }

    /// Discards entries with scores below `cutoff` and advances the
    /// retained boundary. Returns the number of discarded entries.
    ///
    /// The boundary never moves backwards, so a trim with an older cutoff
    /// cannot un-promise a resync already owed to lagging clients.
    pub fn trim(conn: &mut SqliteConnection, cutoff: i64) -> QueryResult<usize> {
        let removed_updates =
            diesel::delete(feed_updates::table.filter(feed_updates::score.lt(cutoff)))
                .execute(conn)?;
        let removed_deletes =
            diesel::delete(feed_deletes::table.filter(feed_deletes::score.lt(cutoff)))
                .execute(conn)?;

        diesel::update(
            feed_meta::table
                .filter(feed_meta::id.eq(1_i64))
                .filter(feed_meta::oldest_retained.lt(cutoff)),
        )
        .set(feed_meta::oldest_retained.eq(cutoff))
        .execute(conn)?;

        Ok(removed_updates + removed_deletes)
    }
}
