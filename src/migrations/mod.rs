//! Schema migrations
//!
//! `migrate` is the only entry point most callers need: it reconciles the
//! ledger against the live schema, then runs whatever is still pending.
//! Reconciliation always finishes before the runner starts.

pub mod journal;
pub mod ledger;
pub mod reconcile;
pub mod runner;

pub use journal::{Journal, MigrationDescriptor};
pub use ledger::MigrationLedgerEntry;
pub use reconcile::{classify, reconcile, ColumnAddition, MigrationShape};
pub use runner::{run_pending, RunReport};

use crate::storage::Database;
use crate::Result;

/// Ledger table name
pub const LEDGER_TABLE: &str = "__migrations";

/// Separator between statements of one migration file
pub const STATEMENT_BREAKPOINT: &str = "--> statement-breakpoint";

/// Outcome of a full migration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// Hashes recorded without execution because their columns existed
    pub marked: Vec<String>,
    /// Tags executed by the runner
    pub executed: Vec<String>,
    /// Statements the runner issued
    pub statements: usize,
}

impl MigrationOutcome {
    pub fn is_noop(&self) -> bool {
        self.marked.is_empty() && self.executed.is_empty()
    }
}

/// Bring the database to the schema described by `journal`
pub fn migrate(db: &Database, journal: &Journal) -> Result<MigrationOutcome> {
    tracing::info!("Reconciling schema against {} migrations", journal.len());
    let marked = reconcile(db, journal)?;
    let report = run_pending(db, journal)?;

    tracing::info!(
        "Schema up to date: {} marked, {} executed",
        marked.len(),
        report.executed.len()
    );
    Ok(MigrationOutcome {
        marked,
        executed: report.executed,
        statements: report.statements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A database whose base table got its detail columns by hand
    fn drifted_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        let journal = Journal::builtin();
        let base = Journal::new(journal.migrations()[..1].to_vec());
        run_pending(&db, &base).unwrap();

        let conn = db.conn().unwrap();
        for statement in &journal.migrations()[1].statements {
            conn.execute_batch(statement).unwrap();
        }
        db
    }

    #[test]
    fn test_drifted_columns_are_marked_not_replayed() {
        let db = drifted_db();
        let journal = Journal::builtin();

        // Replaying 0001 on this database would fail with a duplicate column
        let outcome = migrate(&db, &journal).unwrap();

        assert_eq!(outcome.marked, vec![journal.migrations()[1].hash.clone()]);
        assert_eq!(outcome.executed, vec!["0002_create_tags".to_string()]);
        assert_eq!(ledger::entries(&db).unwrap().len(), 3);
    }

    #[test]
    fn test_runner_alone_fails_on_drift() {
        let db = drifted_db();
        let err = run_pending(&db, &Journal::builtin()).unwrap_err();
        assert!(matches!(err, crate::Error::MigrationExecutionFailure { ref tag, .. } if tag == "0001_content_details"));
    }

    #[test]
    fn test_migrate_twice_does_nothing_the_second_time() {
        let db = Database::open_in_memory().unwrap();
        let journal = Journal::builtin();

        let first = migrate(&db, &journal).unwrap();
        assert_eq!(first.executed.len(), 3);
        assert!(first.marked.is_empty());
        let ledger_after_first = ledger::entries(&db).unwrap();

        let second = migrate(&db, &journal).unwrap();
        assert!(second.is_noop());
        assert_eq!(second.statements, 0);
        assert_eq!(ledger::entries(&db).unwrap(), ledger_after_first);
    }
}
