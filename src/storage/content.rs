//! Content table access

use std::sync::Arc;
use rusqlite::{named_params, OptionalExtension};
use crate::clock::Clock;
use crate::models::{ContentRecord, NewContent};
use crate::{Error, Result};
use super::Database;

const CONTENT_COLUMNS: &str = "id, slug, type, title, subheading, excerpt, author, date, status, pinned, \
     repo_url, demo_url, markdown_content, compiled_content, full_path, created_at, updated_at";

/// Typed access to the `content` table
pub struct ContentStore<'db> {
    db: &'db Database,
    clock: Arc<dyn Clock>,
}

impl<'db> ContentStore<'db> {
    pub fn new(db: &'db Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Insert a content row, returning its id.
    ///
    /// Fails with [`Error::DuplicateSlug`] when the slug is taken.
    pub fn insert_content(&self, content: &NewContent) -> Result<i64> {
        let conn = self.db.conn()?;
        let now = self.clock.timestamp();
        conn.execute(
            r#"
            INSERT INTO content (
                slug, type, title, subheading, excerpt, author, date,
                status, pinned, repo_url, demo_url, markdown_content,
                compiled_content, full_path, created_at, updated_at
            ) VALUES (
                :slug, :type, :title, :subheading, :excerpt, :author, :date,
                :status, :pinned, :repo_url, :demo_url, :markdown_content,
                :compiled_content, :full_path, :now, :now
            )
            "#,
            named_params! {
                ":slug": content.slug,
                ":type": content.content_type,
                ":title": content.title,
                ":subheading": content.subheading,
                ":excerpt": content.excerpt,
                ":author": content.author,
                ":date": content.date,
                ":status": content.status,
                ":pinned": content.pinned as i64,
                ":repo_url": content.repo_url,
                ":demo_url": content.demo_url,
                ":markdown_content": content.markdown_content,
                ":compiled_content": content.compiled_content,
                ":full_path": content.full_path,
                ":now": now,
            },
        )
        .map_err(|e| map_unique_violation(e, &content.slug))?;
        Ok(conn.last_insert_rowid())
    }

    /// Overwrite every mutable field of the row with the same slug.
    ///
    /// Refreshes `updated_at`; `created_at` is left alone. Returns the row id,
    /// or `None` when no row has that slug.
    pub fn update_content(&self, content: &NewContent) -> Result<Option<i64>> {
        let conn = self.db.conn()?;
        let id: Option<i64> = conn
            .query_row(
                r#"
                UPDATE content SET
                    type = :type, title = :title, subheading = :subheading,
                    excerpt = :excerpt, author = :author, date = :date,
                    status = :status, pinned = :pinned, repo_url = :repo_url,
                    demo_url = :demo_url, markdown_content = :markdown_content,
                    compiled_content = :compiled_content, full_path = :full_path,
                    updated_at = :now
                WHERE slug = :slug
                RETURNING id
                "#,
                named_params! {
                    ":slug": content.slug,
                    ":type": content.content_type,
                    ":title": content.title,
                    ":subheading": content.subheading,
                    ":excerpt": content.excerpt,
                    ":author": content.author,
                    ":date": content.date,
                    ":status": content.status,
                    ":pinned": content.pinned as i64,
                    ":repo_url": content.repo_url,
                    ":demo_url": content.demo_url,
                    ":markdown_content": content.markdown_content,
                    ":compiled_content": content.compiled_content,
                    ":full_path": content.full_path,
                    ":now": self.clock.timestamp(),
                },
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Get a content row by slug
    pub fn find_by_slug(&self, slug: &str) -> Result<Option<ContentRecord>> {
        self.db
            .conn()?
            .query_row(
                &format!("SELECT {CONTENT_COLUMNS} FROM content WHERE slug = ?1"),
                [slug],
                row_to_content,
            )
            .optional()
            .map_err(Into::into)
    }

    /// All content rows, oldest id first
    pub fn find_all(&self) -> Result<Vec<ContentRecord>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {CONTENT_COLUMNS} FROM content ORDER BY id"))?;
        let rows = stmt
            .query_map([], row_to_content)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Delete one row by slug. Its tag links go with it.
    pub fn delete_by_slug(&self, slug: &str) -> Result<bool> {
        let deleted = self.db.conn()?.execute("DELETE FROM content WHERE slug = ?1", [slug])?;
        Ok(deleted > 0)
    }

    /// Delete every content row
    pub fn delete_all(&self) -> Result<usize> {
        Ok(self.db.conn()?.execute("DELETE FROM content", [])?)
    }

    /// Count content rows
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.db.conn()?.query_row("SELECT COUNT(*) FROM content", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn map_unique_violation(e: rusqlite::Error, slug: &str) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::DuplicateSlug(slug.to_string())
        }
        _ => Error::Storage(e),
    }
}

/// Helper to convert a row to a ContentRecord
fn row_to_content(row: &rusqlite::Row) -> rusqlite::Result<ContentRecord> {
    let pinned: Option<i64> = row.get(9)?;
    Ok(ContentRecord {
        id: row.get(0)?,
        content: NewContent {
            slug: row.get(1)?,
            content_type: row.get(2)?,
            title: row.get(3)?,
            subheading: row.get(4)?,
            excerpt: row.get(5)?,
            author: row.get(6)?,
            date: row.get(7)?,
            status: row
                .get::<_, Option<String>>(8)?
                .unwrap_or_else(|| crate::models::DEFAULT_STATUS.to_string()),
            pinned: pinned.unwrap_or(0) != 0,
            repo_url: row.get(10)?,
            demo_url: row.get(11)?,
            markdown_content: row.get(12)?,
            compiled_content: row.get(13)?,
            full_path: row.get::<_, Option<String>>(14)?.unwrap_or_default(),
        },
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}
