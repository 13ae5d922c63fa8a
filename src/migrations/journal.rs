//! Migration journal
//!
//! On disk a journal is a folder holding `meta/_journal.json` plus one
//! `<tag>.sql` file per entry:
//!
//! ```text
//! migrations/
//!   meta/_journal.json     {"entries": [{"idx": 0, "when": 1735689600000, "tag": "0000_init"}]}
//!   0000_init.sql          statements separated by `--> statement-breakpoint`
//! ```

use std::path::Path;
use serde::Deserialize;
use crate::storage::schema::BUILTIN_MIGRATIONS;
use crate::{Error, Result};
use super::STATEMENT_BREAKPOINT;

/// One migration: its identity, ordering timestamp and statements
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationDescriptor {
    /// Journal tag, also the SQL file stem
    pub tag: String,
    /// BLAKE3 hex digest of the SQL file contents
    pub hash: String,
    /// Creation time of the migration, in milliseconds since the epoch
    pub folder_millis: i64,
    /// Non-empty statements in file order
    pub statements: Vec<String>,
}

impl MigrationDescriptor {
    /// Build a descriptor from raw SQL
    pub fn from_sql(tag: impl Into<String>, folder_millis: i64, sql: &str) -> Self {
        Self {
            tag: tag.into(),
            hash: blake3::hash(sql.as_bytes()).to_hex().to_string(),
            folder_millis,
            statements: split_statements(sql),
        }
    }
}

#[derive(Debug, Deserialize)]
struct JournalFile {
    #[serde(default)]
    entries: Vec<JournalEntry>,
}

#[derive(Debug, Deserialize)]
struct JournalEntry {
    #[serde(default)]
    idx: usize,
    when: i64,
    tag: String,
}

/// Ordered set of migrations
#[derive(Debug, Clone, Default)]
pub struct Journal {
    migrations: Vec<MigrationDescriptor>,
}

impl Journal {
    pub fn new(migrations: Vec<MigrationDescriptor>) -> Self {
        Self { migrations }
    }

    /// The schema compiled into the binary
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_MIGRATIONS
                .iter()
                .map(|(tag, millis, sql)| MigrationDescriptor::from_sql(*tag, *millis, sql))
                .collect(),
        )
    }

    /// Read a migrations folder
    pub fn load(dir: &Path) -> Result<Self> {
        let journal_path = dir.join("meta").join("_journal.json");
        let raw = std::fs::read_to_string(&journal_path).map_err(|e| Error::Journal {
            path: journal_path.clone(),
            reason: e.to_string(),
        })?;
        let file: JournalFile = serde_json::from_str(&raw).map_err(|e| Error::Journal {
            path: journal_path.clone(),
            reason: e.to_string(),
        })?;

        let mut entries = file.entries;
        entries.sort_by_key(|e| e.idx);

        let mut migrations = Vec::with_capacity(entries.len());
        for entry in entries {
            let sql_path = dir.join(format!("{}.sql", entry.tag));
            let sql = std::fs::read_to_string(&sql_path).map_err(|e| Error::Journal {
                path: sql_path.clone(),
                reason: e.to_string(),
            })?;
            migrations.push(MigrationDescriptor::from_sql(entry.tag, entry.when, &sql));
        }

        tracing::debug!("Loaded {} migrations from {}", migrations.len(), dir.display());
        Ok(Self { migrations })
    }

    pub fn migrations(&self) -> &[MigrationDescriptor] {
        &self.migrations
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

fn split_statements(sql: &str) -> Vec<String> {
    sql.split(STATEMENT_BREAKPOINT)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
