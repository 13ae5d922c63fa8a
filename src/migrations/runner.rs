//! Standard migration runner
//!
//! Executes, in journal order, every migration whose hash is not in the
//! ledger. Each migration runs in its own transaction together with its
//! ledger row, so the ledger only ever lists migrations that committed.

use crate::storage::Database;
use crate::{Error, Result};
use super::journal::Journal;
use super::ledger;

/// What one runner pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Tags of the migrations executed, in order
    pub executed: Vec<String>,
    /// Statements issued across all executed migrations
    pub statements: usize,
}

/// Execute every unrecorded migration
pub fn run_pending(db: &Database, journal: &Journal) -> Result<RunReport> {
    ledger::ensure_ledger(db)?;
    let mut applied = ledger::applied_hashes(db)?;
    let mut report = RunReport::default();

    for migration in journal.migrations() {
        if applied.contains(&migration.hash) {
            tracing::debug!("Skipping {}: already applied", migration.tag);
            continue;
        }

        tracing::info!("Applying migration {}", migration.tag);
        let issued = db.transaction(|db| {
            let conn = db.conn()?;
            for statement in &migration.statements {
                tracing::debug!("{}: {}", migration.tag, statement);
                conn.execute_batch(statement)
                    .map_err(|source| Error::MigrationExecutionFailure {
                        tag: migration.tag.clone(),
                        hash: migration.hash.clone(),
                        source,
                    })?;
            }
            ledger::record(db, &migration.hash, migration.folder_millis)?;
            Ok(migration.statements.len())
        })?;

        applied.insert(migration.hash.clone());
        report.statements += issued;
        report.executed.push(migration.tag.clone());
    }

    Ok(report)
}
