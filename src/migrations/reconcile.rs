//! Schema reconciliation
//!
//! Databases that received columns by hand (or from an interrupted run)
//! would fail the standard runner with "duplicate column". Before the runner
//! starts, every unrecorded migration made only of `ALTER TABLE .. ADD`
//! statements is checked against the live table structure; when all of its
//! columns already exist, the migration is recorded in the ledger without
//! executing it.
//!
//! Anything else (a mixed migration, a statement that cannot be classified)
//! is left for the runner, all or nothing.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use regex::Regex;
use crate::storage::Database;
use crate::Result;
use super::journal::{Journal, MigrationDescriptor};
use super::ledger;

/// A column a statement would add
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnAddition {
    pub table: String,
    pub column: String,
}

/// How a migration may be treated by the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationShape {
    /// Every statement adds a column
    ColumnAdditive(Vec<ColumnAddition>),
    /// Must go through the runner
    Opaque,
}

fn add_column_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Each identifier is "quoted", `quoted`, [bracketed] or a bare word,
        // and must be followed by whitespace or the end of the statement.
        Regex::new(
            r#"(?is)^\s*ALTER\s+TABLE\s+(?:"([^"]+)"|`([^`]+)`|\[([^\]]+)\]|(\w+))\s+ADD\s+(?:COLUMN\s+)?(?:"([^"]+)"|`([^`]+)`|\[([^\]]+)\]|(\w+))(?:\s|$)"#,
        )
        .expect("add-column pattern is valid")
    })
}

/// Keywords that can follow `ADD` without naming a column
const NON_COLUMN_KEYWORDS: &[&str] = &["constraint", "primary", "unique", "foreign", "check"];

/// Parse a single `ALTER TABLE <t> ADD [COLUMN] <c> ...` statement.
///
/// Returns `None` for anything it cannot read in full, including
/// schema-qualified tables and identifiers with escaped quotes.
pub fn parse_add_column(statement: &str) -> Option<ColumnAddition> {
    let body = statement.trim().trim_end_matches(';');
    // One statement per chunk, or the rest could be anything
    if body.contains(';') {
        return None;
    }

    let caps = add_column_pattern().captures(body)?;
    let table = (1..=4).find_map(|i| caps.get(i))?.as_str();
    let column = match (5..=7).find_map(|i| caps.get(i)) {
        Some(quoted) => quoted.as_str(),
        None => {
            let bare = caps.get(8)?.as_str();
            if NON_COLUMN_KEYWORDS.contains(&bare.to_ascii_lowercase().as_str()) {
                return None;
            }
            bare
        }
    };

    Some(ColumnAddition {
        table: table.to_string(),
        column: column.to_string(),
    })
}

/// Classify a migration by its statements
pub fn classify(migration: &MigrationDescriptor) -> MigrationShape {
    let mut additions = Vec::with_capacity(migration.statements.len());
    for statement in &migration.statements {
        match parse_add_column(statement) {
            Some(addition) => additions.push(addition),
            None => return MigrationShape::Opaque,
        }
    }

    if additions.is_empty() {
        MigrationShape::Opaque
    } else {
        MigrationShape::ColumnAdditive(additions)
    }
}

/// Column names of `table`, ASCII-lowercased since SQLite compares them
/// case-insensitively
fn table_columns<'c>(
    db: &Database,
    cache: &'c mut HashMap<String, HashSet<String>>,
    table: &str,
) -> Result<&'c HashSet<String>> {
    let key = table.to_ascii_lowercase();
    if !cache.contains_key(&key) {
        let conn = db.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .map(|name| name.map(|n| n.to_ascii_lowercase()))
            .collect::<rusqlite::Result<HashSet<String>>>()?;
        tracing::debug!("Introspected {} ({} columns)", table, columns.len());
        cache.insert(key.clone(), columns);
    }
    Ok(&cache[&key])
}

/// Mark column-additive migrations whose columns already exist.
///
/// Returns the hashes recorded by this pass. Runs in one transaction; a
/// failure leaves the ledger as it was.
pub fn reconcile(db: &Database, journal: &Journal) -> Result<Vec<String>> {
    db.transaction(|db| {
        ledger::ensure_ledger(db)?;
        let applied = ledger::applied_hashes(db)?;

        // Lives for this pass only
        let mut columns_by_table: HashMap<String, HashSet<String>> = HashMap::new();
        let mut marked = Vec::new();

        for migration in journal.migrations() {
            if applied.contains(&migration.hash) {
                continue;
            }

            let additions = match classify(migration) {
                MigrationShape::ColumnAdditive(additions) => additions,
                MigrationShape::Opaque => continue,
            };

            let mut all_present = true;
            for addition in &additions {
                let columns = table_columns(db, &mut columns_by_table, &addition.table)?;
                if !columns.contains(&addition.column.to_ascii_lowercase()) {
                    all_present = false;
                    break;
                }
            }

            if all_present {
                ledger::record(db, &migration.hash, migration.folder_millis)?;
                tracing::info!(
                    "Marked {} as applied: {} column(s) already present",
                    migration.tag,
                    additions.len()
                );
                marked.push(migration.hash.clone());
            }
        }

        Ok(marked)
    })
}
