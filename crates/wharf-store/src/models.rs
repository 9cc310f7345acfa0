//! Flat value objects materialized from the authoritative store.
//!
//! The pipeline reads these as plain data; there is no lazy loading and no
//! object graph between packages and versions.

use diesel::{prelude::*, sqlite::Sqlite};
use serde_json::Value;

use crate::schema::{feed_deletes, feed_updates, packages, versions};

/// Frozen reason that excludes a package from the live catalog.
pub const FROZEN_SPAM: &str = "spam";

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = packages)]
#[diesel(check_for_backend(Sqlite))]
pub struct PackageRecord {
    pub id: i64,
    pub name: String,
    pub crawled_at: Option<i64>,
    pub dumped_at: Option<i64>,
    pub dumped_at_v2: Option<i64>,
    pub frozen: Option<String>,
    pub abandoned: bool,
    pub replacement_package: Option<String>,
}

impl PackageRecord {
    /// Whether the package belongs to the live catalog served to clients.
    pub fn is_live(&self) -> bool {
        self.frozen.as_deref() != Some(FROZEN_SPAM)
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = packages)]
pub struct NewPackage {
    pub name: String,
    pub crawled_at: Option<i64>,
    pub frozen: Option<String>,
    pub abandoned: bool,
    pub replacement_package: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VersionRecord {
    pub id: i64,
    pub package_id: i64,
    pub version: String,
    pub normalized_version: String,
    pub dev: bool,
    pub released_at: Option<i64>,
    pub default_branch: bool,
    pub description: Option<String>,
    pub keywords: Option<Value>,
    pub homepage: Option<String>,
    pub license: Option<Value>,
    pub authors: Option<Value>,
    pub source: Option<Value>,
    pub dist: Option<Value>,
    pub pkg_type: Option<String>,
    pub support: Option<Value>,
    pub funding: Option<Value>,
    pub autoload: Option<Value>,
    pub extra: Option<Value>,
    pub target_dir: Option<String>,
    pub include_path: Option<Value>,
    pub bin: Option<Value>,
    pub require: Option<Value>,
    pub require_dev: Option<Value>,
    pub suggest: Option<Value>,
    pub conflict: Option<Value>,
    pub provide: Option<Value>,
    pub replace: Option<Value>,
}

fn json_col(raw: Option<String>) -> diesel::deserialize::Result<Option<Value>> {
    match raw {
        None => Ok(None),
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
    }
}

impl Queryable<versions::SqlType, Sqlite> for VersionRecord {
    type Row = (
        i64,
        i64,
        String,
        String,
        bool,
        Option<i64>,
        bool,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
    );

    fn build(row: Self::Row) -> diesel::deserialize::Result<Self> {
        Ok(Self {
            id: row.0,
            package_id: row.1,
            version: row.2,
            normalized_version: row.3,
            dev: row.4,
            released_at: row.5,
            default_branch: row.6,
            description: row.7,
            keywords: json_col(row.8)?,
            homepage: row.9,
            license: json_col(row.10)?,
            authors: json_col(row.11)?,
            source: json_col(row.12)?,
            dist: json_col(row.13)?,
            pkg_type: row.14,
            support: json_col(row.15)?,
            funding: json_col(row.16)?,
            autoload: json_col(row.17)?,
            extra: json_col(row.18)?,
            target_dir: row.19,
            include_path: json_col(row.20)?,
            bin: json_col(row.21)?,
            require: json_col(row.22)?,
            require_dev: json_col(row.23)?,
            suggest: json_col(row.24)?,
            conflict: json_col(row.25)?,
            provide: json_col(row.26)?,
            replace: json_col(row.27)?,
        })
    }
}

/// Insertable version row; JSON fields are pre-serialized text.
#[derive(Debug, Clone, Default, Insertable)]
#[diesel(table_name = versions)]
pub struct NewVersion {
    pub package_id: i64,
    pub version: String,
    pub normalized_version: String,
    pub dev: bool,
    pub released_at: Option<i64>,
    pub default_branch: bool,
    pub description: Option<String>,
    pub keywords: Option<String>,
    pub homepage: Option<String>,
    pub license: Option<String>,
    pub authors: Option<String>,
    pub source: Option<String>,
    pub dist: Option<String>,
    pub pkg_type: Option<String>,
    pub support: Option<String>,
    pub funding: Option<String>,
    pub autoload: Option<String>,
    pub extra: Option<String>,
    pub target_dir: Option<String>,
    pub include_path: Option<String>,
    pub bin: Option<String>,
    pub require: Option<String>,
    pub require_dev: Option<String>,
    pub suggest: Option<String>,
    pub conflict: Option<String>,
    pub provide: Option<String>,
    pub replace: Option<String>,
}

/// One change-feed index entry.
#[derive(Debug, Clone, PartialEq, Eq, Queryable, Insertable)]
#[diesel(table_name = feed_updates)]
pub struct FeedEntry {
    pub package: String,
    pub score: i64,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = feed_deletes)]
pub struct FeedDeleteEntry {
    pub package: String,
    pub score: i64,
}
