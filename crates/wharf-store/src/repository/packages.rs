//! Catalog queries used by the dump generator.

use diesel::prelude::*;

use crate::{
    models::{PackageRecord, VersionRecord, FROZEN_SPAM},
    schema::{packages, versions},
};

/// Repository for package catalog operations.
///
/// The pipeline only ever reads the catalog and writes back the two dumped
/// timestamps; everything else belongs to the external persistence layer.
pub struct PackageRepository;

impl PackageRepository {
    /// Ids of packages whose metadata is stale: crawled since the last dump
    /// (or never dumped in one of the two formats), with a crawl timestamp
    /// in the past.
    ///
    /// Frozen packages are excluded; the garbage collector owns their
    /// cleanup.
    pub fn stale_ids(conn: &mut SqliteConnection, now: i64) -> QueryResult<Vec<i64>> {
        packages::table
            .filter(packages::frozen.is_null())
            .filter(packages::crawled_at.is_not_null())
            .filter(packages::crawled_at.lt(now))
            .filter(
                packages::dumped_at
                    .is_null()
                    .or(packages::dumped_at.le(packages::crawled_at))
                    .or(packages::dumped_at_v2.is_null())
                    .or(packages::dumped_at_v2.le(packages::crawled_at)),
            )
            .order(packages::id.asc())
            .select(packages::id)
            .load(conn)
    }

    /// Ids of every non-frozen package, for forced full dumps.
    pub fn all_ids(conn: &mut SqliteConnection) -> QueryResult<Vec<i64>> {
        packages::table
            .filter(packages::frozen.is_null())
            .order(packages::id.asc())
            .select(packages::id)
            .load(conn)
    }

    /// Loads packages by id, preserving no particular order.
    pub fn by_ids(conn: &mut SqliteConnection, ids: &[i64]) -> QueryResult<Vec<PackageRecord>> {
        packages::table
            .filter(packages::id.eq_any(ids))
            .select(PackageRecord::as_select())
            .load(conn)
    }

    /// Finds one package by its `vendor/package` name.
    pub fn by_name(
        conn: &mut SqliteConnection,
        name: &str,
    ) -> QueryResult<Option<PackageRecord>> {
        packages::table
            .filter(packages::name.eq(name))
            .select(PackageRecord::as_select())
            .first(conn)
            .optional()
    }

    /// Names of all packages in the live catalog: present and not
    /// spam-frozen. This is the reference set for garbage collection and
    /// for the root index.
    pub fn live_names(conn: &mut SqliteConnection) -> QueryResult<Vec<String>> {
        packages::table
            .filter(
                packages::frozen
                    .is_null()
                    .or(packages::frozen.ne(FROZEN_SPAM)),
            )
            .order(packages::name.asc())
            .select(packages::name)
            .load(conn)
    }

    /// All versions of one package as flat records, releases before dev
    /// branches.
    pub fn versions_of(
        conn: &mut SqliteConnection,
        package_id: i64,
    ) -> QueryResult<Vec<VersionRecord>> {
        versions::table
            .filter(versions::package_id.eq(package_id))
            .order((versions::dev.asc(), versions::id.asc()))
            .load(conn)
    }

    /// Advances the legacy dump timestamp, monotonically.
    ///
    /// The update is a no-op when `at` does not move the timestamp forward,
    /// so a replayed or out-of-order commit can never regress it.
    pub fn mark_dumped(conn: &mut SqliteConnection, id: i64, at: i64) -> QueryResult<bool> {
        let updated = diesel::update(
            packages::table.filter(packages::id.eq(id)).filter(
                packages::dumped_at
                    .is_null()
                    .or(packages::dumped_at.lt(at)),
            ),
        )
        .set(packages::dumped_at.eq(at))
        .execute(conn)?;
        Ok(updated > 0)
    }

    /// Advances the v2 dump timestamp, monotonically.
    pub fn mark_dumped_v2(conn: &mut SqliteConnection, id: i64, at: i64) -> QueryResult<bool> {
        let updated = diesel::update(
            packages::table.filter(packages::id.eq(id)).filter(
                packages::dumped_at_v2
                    .is_null()
                    .or(packages::dumped_at_v2.lt(at)),
            ),
        )
        .set(packages::dumped_at_v2.eq(at))
        .execute(conn)?;
        Ok(updated > 0)
    }
}
