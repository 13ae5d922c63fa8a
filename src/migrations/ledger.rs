//! Migration ledger table
//!
//! A hash in the ledger means "this migration's effects are in the schema",
//! whether this crate ran it or someone else did.

use std::collections::HashSet;
use rusqlite::params;
use crate::storage::Database;
use crate::Result;
use super::LEDGER_TABLE;

/// A ledger row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationLedgerEntry {
    pub hash: String,
    /// Application timestamp (the migration's folder millis)
    pub created_at: i64,
}

/// Create the ledger table if it is missing
pub fn ensure_ledger(db: &Database) -> Result<()> {
    db.conn()?.execute_batch(&format!(
        r#"CREATE TABLE IF NOT EXISTS "{LEDGER_TABLE}" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            hash TEXT NOT NULL UNIQUE,
            created_at NUMERIC
        )"#
    ))?;
    Ok(())
}

/// Hashes already recorded
pub fn applied_hashes(db: &Database) -> Result<HashSet<String>> {
    let conn = db.conn()?;
    let mut stmt = conn.prepare(&format!(r#"SELECT hash FROM "{LEDGER_TABLE}""#))?;
    let hashes = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<HashSet<String>>>()?;
    Ok(hashes)
}

/// Record a migration as applied. Recording a hash twice keeps one row.
pub fn record(db: &Database, hash: &str, created_at: i64) -> Result<bool> {
    let inserted = db.conn()?.execute(
        &format!(r#"INSERT OR IGNORE INTO "{LEDGER_TABLE}" (hash, created_at) VALUES (?1, ?2)"#),
        params![hash, created_at],
    )?;
    Ok(inserted > 0)
}

/// Every ledger row in insertion order
pub fn entries(db: &Database) -> Result<Vec<MigrationLedgerEntry>> {
    let conn = db.conn()?;
    let mut stmt = conn.prepare(&format!(r#"SELECT hash, created_at FROM "{LEDGER_TABLE}" ORDER BY id"#))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MigrationLedgerEntry {
                hash: row.get(0)?,
                created_at: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}
