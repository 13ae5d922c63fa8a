//! SQLite connection management

use std::cell::Cell;
use std::path::{Path, PathBuf};
use rusqlite::Connection;
use crate::{Error, Result};

/// Owned handle to the content database.
///
/// Every open switches the journal to WAL and turns foreign keys on, then
/// reads both pragmas back; an open that cannot confirm them fails.
pub struct Database {
    conn: Option<Connection>,
    path: PathBuf,
    tx_depth: Cell<u32>,
}

impl Database {
    /// Open a database file (creates the file, never its parent directory)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::StorageUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let db = Self {
            conn: Some(conn),
            path: path.to_path_buf(),
            tx_depth: Cell::new(0),
        };
        db.configure(&["wal"])?;
        tracing::debug!("Opened database {}", path.display());
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    ///
    /// SQLite keeps memory databases in `memory` journal mode no matter what is
    /// requested, so that is the only mode accepted on read-back here.
    pub fn open_in_memory() -> Result<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|e| Error::StorageUnavailable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let db = Self {
            conn: Some(conn),
            path,
            tx_depth: Cell::new(0),
        };
        db.configure(&["memory"])?;
        Ok(db)
    }

    fn configure(&self, accepted_journal_modes: &[&str]) -> Result<()> {
        let conn = self.conn()?;
        let unavailable = |reason: String| Error::StorageUnavailable {
            path: self.path.clone(),
            reason,
        };

        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| unavailable(e.to_string()))?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| unavailable(e.to_string()))?;

        let mode = mode.to_lowercase();
        if !accepted_journal_modes.contains(&mode.as_str()) {
            return Err(unavailable(format!("journal_mode is {mode}, expected wal")));
        }

        let foreign_keys: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .map_err(|e| unavailable(e.to_string()))?;
        if foreign_keys != 1 {
            return Err(unavailable("foreign_keys could not be enabled".to_string()));
        }
        Ok(())
    }

    /// Borrow the live connection
    pub fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(Error::ConnectionClosed)
    }

    /// Path the database was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Release the handle. Later calls fail with `ConnectionClosed`.
    pub fn close(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, e)| Error::Storage(e)),
            None => Err(Error::ConnectionClosed),
        }
    }

    /// Current journal mode as reported by SQLite
    pub fn journal_mode(&self) -> Result<String> {
        let mode: String = self
            .conn()?
            .pragma_query_value(None, "journal_mode", |row| row.get(0))?;
        Ok(mode)
    }

    /// Whether foreign key enforcement is on
    pub fn foreign_keys_enabled(&self) -> Result<bool> {
        let on: i64 = self
            .conn()?
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))?;
        Ok(on == 1)
    }

    /// Whether a transaction opened through [`Database::transaction`] is active
    pub fn in_transaction(&self) -> bool {
        self.tx_depth.get() > 0
    }

    /// Run `f` inside a transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back and hands the error back
    /// otherwise. A call made while a transaction is already open joins it
    /// instead of starting another one; the outermost call decides the outcome.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T>,
    {
        if self.in_transaction() {
            return f(self);
        }

        self.conn()?.execute_batch("BEGIN IMMEDIATE")?;
        self.tx_depth.set(1);
        let result = f(self);
        self.tx_depth.set(0);

        match result {
            Ok(value) => {
                if let Err(e) = self.conn()?.execute_batch("COMMIT") {
                    self.rollback_quietly();
                    return Err(e.into());
                }
                Ok(value)
            }
            Err(e) => {
                self.rollback_quietly();
                Err(e)
            }
        }
    }

    fn rollback_quietly(&self) {
        if let Ok(conn) = self.conn() {
            if !conn.is_autocommit() {
                if let Err(e) = conn.execute_batch("ROLLBACK") {
                    tracing::error!("Rollback failed: {}", e);
                }
            }
        }
    }

    /// Row counts of the content tables
    pub fn stats(&self) -> Result<DbStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n as usize)
        };
        Ok(DbStats {
            content: count("content")?,
            tags: count("tags")?,
            content_tags: count("content_tags")?,
            migrations: count(crate::migrations::LEDGER_TABLE)?,
        })
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    pub content: usize,
    pub tags: usize,
    pub content_tags: usize,
    pub migrations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_table(db: &Database) {
        db.conn()
            .unwrap()
            .execute_batch("CREATE TABLE t (v INTEGER NOT NULL)")
            .unwrap();
    }

    fn count(db: &Database) -> i64 {
        db.conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_open_enables_wal_and_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("content.db")).unwrap();

        assert_eq!(db.journal_mode().unwrap().to_lowercase(), "wal");
        assert!(db.foreign_keys_enabled().unwrap());
    }

    #[test]
    fn test_open_missing_parent_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = Database::open(&dir.path().join("nope").join("content.db")).unwrap_err();
        assert!(matches!(err, Error::StorageUnavailable { .. }));
    }

    #[test]
    fn test_operations_after_close_fail() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::open(&dir.path().join("content.db")).unwrap();
        db.close().unwrap();

        assert!(!db.is_open());
        assert!(matches!(db.conn(), Err(Error::ConnectionClosed)));
        assert!(matches!(db.journal_mode(), Err(Error::ConnectionClosed)));
        assert!(matches!(db.transaction(|_| Ok(())), Err(Error::ConnectionClosed)));
        assert!(matches!(db.close(), Err(Error::ConnectionClosed)));
    }

    #[test]
    fn test_transaction_commits() {
        let db = Database::open_in_memory().unwrap();
        scratch_table(&db);

        db.transaction(|db| {
            db.conn()?.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Ok(())
        })
        .unwrap();

        assert_eq!(count(&db), 1);
        assert!(!db.in_transaction());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();
        scratch_table(&db);

        let result: Result<()> = db.transaction(|db| {
            db.conn()?.execute("INSERT INTO t (v) VALUES (1)", [])?;
            Err(Error::DuplicateSlug("x".into()))
        });

        assert!(matches!(result, Err(Error::DuplicateSlug(_))));
        assert_eq!(count(&db), 0);
        assert!(db.conn().unwrap().is_autocommit());
    }

    #[test]
    fn test_nested_transaction_reuses_outer_scope() {
        let db = Database::open_in_memory().unwrap();
        scratch_table(&db);

        let result: Result<()> = db.transaction(|db| {
            db.conn()?.execute("INSERT INTO t (v) VALUES (1)", [])?;
            db.transaction(|db| {
                assert!(db.in_transaction());
                db.conn()?.execute("INSERT INTO t (v) VALUES (2)", [])?;
                Ok(())
            })?;
            Err(Error::DuplicateSlug("late".into()))
        });

        assert!(result.is_err());
        // The inner scope did not commit on its own
        assert_eq!(count(&db), 0);
    }
}
