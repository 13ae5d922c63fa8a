//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - content(slug, type, title, ..., markdown_content, compiled_content)
//! - tags(name, slug)
//! - content_tags(content_id, tag_id), cascading from both sides
//! - __migrations(hash, created_at), the migration ledger

pub mod connection;
pub mod content;
pub mod schema;
pub mod tags;

pub use connection::{Database, DbStats};
pub use content::ContentStore;
pub use tags::TagStore;
