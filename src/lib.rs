//! # mdx-loader - Content ingestion for frontmatter-annotated markdown
//!
//! Loads a tree of `.md`/`.mdx` documents into SQLite.
//!
//! mdx-loader provides:
//! - A connection manager that enforces WAL and foreign keys on every open
//! - A schema reconciler that detects columns added outside the migration
//!   ledger and marks those migrations as satisfied instead of replaying them
//! - A scan → parse → extract → persist pipeline where each document commits
//!   or rolls back on its own, so one bad file never sinks the batch
//! - Typed stores over the `content`, `tags` and `content_tags` tables

pub mod clock;
pub mod config;
pub mod extract;
pub mod migrations;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod scanner;
pub mod storage;
pub mod ui;

use std::path::PathBuf;

// Re-exports for convenient access
pub use clock::{Clock, FixedClock, SystemClock};
pub use extract::{sanitize_tag, FieldExtractor};
pub use migrations::{Journal, MigrationOutcome};
pub use models::{ContentRecord, NewContent, TagRecord};
pub use parser::{DocumentParser, HtmlCompiler, MarkdownCompiler, ParsedDocument};
pub use pipeline::{ConflictPolicy, ContentMigrator, MigrationSummary};
pub use scanner::{DirectoryScanner, ScanConfig, ScannedDocument};
pub use storage::{ContentStore, Database, TagStore};

/// Result type alias for mdx-loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for mdx-loader operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage unavailable at {}: {reason}", .path.display())]
    StorageUnavailable { path: PathBuf, reason: String },

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Failed to parse {}: {cause}", .path.display())]
    ParseFailure { path: PathBuf, cause: String },

    #[error("Invalid frontmatter field `{field}`: {reason}")]
    InvalidFrontmatter { field: String, reason: String },

    #[error("Duplicate slug: {0}")]
    DuplicateSlug(String),

    #[error("Migration journal error at {}: {reason}", .path.display())]
    Journal { path: PathBuf, reason: String },

    #[error("Migration {tag} ({hash}) failed: {source}")]
    MigrationExecutionFailure {
        tag: String,
        hash: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error belongs to a single document and should be counted
    /// rather than abort the batch.
    pub fn is_document_error(&self) -> bool {
        match self {
            Error::ParseFailure { .. }
            | Error::InvalidFrontmatter { .. }
            | Error::DuplicateSlug(_) => true,
            Error::Storage(rusqlite::Error::SqliteFailure(e, _)) => {
                e.code == rusqlite::ErrorCode::ConstraintViolation
            }
            _ => false,
        }
    }

    pub(crate) fn parse_failure(path: impl Into<PathBuf>, cause: impl ToString) -> Self {
        Error::ParseFailure {
            path: path.into(),
            cause: cause.to_string(),
        }
    }
}
