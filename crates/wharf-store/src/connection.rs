//! Database connection management.
//!
//! One SQLite file holds the package/version catalog read by the dump
//! generator and the change-feed indexes. WAL mode keeps concurrent feed
//! writers and readers from blocking each other; feed correctness rests on
//! monotonically increasing scores, not on exclusion.

use std::path::Path;

use diesel::{sql_query, Connection, RunQueryDsl, SqliteConnection};
use tracing::debug;

use crate::{error::Result, migration::apply_migrations};

/// Database connection wrapper with migration support.
pub struct Database {
    conn: SqliteConnection,
}

impl Database {
    /// Opens the database, enables WAL mode and runs pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let mut conn = SqliteConnection::establish(&path_str)?;

        sql_query("PRAGMA journal_mode = WAL;").execute(&mut conn)?;
        sql_query("PRAGMA busy_timeout = 5000;").execute(&mut conn)?;

        apply_migrations(&mut conn)?;
        debug!("Opened store at {}", path_str);

        Ok(Self { conn })
    }

    /// Runs a closure with the underlying connection.
    pub fn with_conn<T>(&mut self, f: impl FnOnce(&mut SqliteConnection) -> T) -> T {
        f(&mut self.conn)
    }

    /// Gets a mutable reference to the underlying connection.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(dir.path().join("wharf.db")).unwrap();

        // Fresh schema starts with a full (empty) feed history.
        let oldest = db
            .with_conn(crate::repository::FeedRepository::oldest_retained)
            .unwrap();
        assert_eq!(oldest, 0);
    }

    #[test]
    fn test_reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wharf.db");
        drop(Database::open(&path).unwrap());
        Database::open(&path).unwrap();
    }
}
