//! Tag and content/tag association access

use std::sync::Arc;
use rusqlite::{params, OptionalExtension};
use crate::clock::Clock;
use crate::models::TagRecord;
use crate::Result;
use super::Database;

/// Typed access to the `tags` and `content_tags` tables
pub struct TagStore<'db> {
    db: &'db Database,
    clock: Arc<dyn Clock>,
}

impl<'db> TagStore<'db> {
    pub fn new(db: &'db Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    /// Insert a tag unless one with the same name or slug exists.
    ///
    /// Returns whether a row was written.
    pub fn insert_tag(&self, name: &str, slug: &str) -> Result<bool> {
        let inserted = self.db.conn()?.execute(
            "INSERT OR IGNORE INTO tags (name, slug, created_at) VALUES (?1, ?2, ?3)",
            params![name, slug, self.clock.timestamp()],
        )?;
        Ok(inserted > 0)
    }

    /// Get a tag by slug
    pub fn find_by_slug(&self, slug: &str) -> Result<Option<TagRecord>> {
        self.db
            .conn()?
            .query_row(
                "SELECT id, name, slug, created_at FROM tags WHERE slug = ?1",
                [slug],
                row_to_tag,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Link a tag to a content row; linking twice is a no-op
    pub fn link_tag_to_content(&self, content_id: i64, tag_id: i64) -> Result<()> {
        self.db.conn()?.execute(
            "INSERT OR IGNORE INTO content_tags (content_id, tag_id) VALUES (?1, ?2)",
            params![content_id, tag_id],
        )?;
        Ok(())
    }

    /// Drop every tag link of a content row
    pub fn unlink_all(&self, content_id: i64) -> Result<usize> {
        Ok(self
            .db
            .conn()?
            .execute("DELETE FROM content_tags WHERE content_id = ?1", [content_id])?)
    }

    /// Tags linked to a content row, by slug
    pub fn get_tags_for_content(&self, content_id: i64) -> Result<Vec<TagRecord>> {
        let conn = self.db.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT t.id, t.name, t.slug, t.created_at FROM tags t
            INNER JOIN content_tags ct ON t.id = ct.tag_id
            WHERE ct.content_id = ?1
            ORDER BY t.slug
            "#,
        )?;
        let tags = stmt
            .query_map([content_id], row_to_tag)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    /// Count tag rows
    pub fn count(&self) -> Result<usize> {
        let count: i64 = self.db.conn()?.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Helper to convert a row to a TagRecord
fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<TagRecord> {
    Ok(TagRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        slug: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::extract::sanitize_tag;
    use crate::migrations::{self, Journal};
    use crate::models::NewContent;
    use crate::storage::ContentStore;

    fn migrated_db(dir: &tempfile::TempDir) -> Database {
        let db = Database::open(&dir.path().join("content.db")).unwrap();
        migrations::migrate(&db, &Journal::builtin()).unwrap();
        db
    }

    fn link_count(db: &Database) -> i64 {
        db.conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM content_tags", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_tag_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db = migrated_db(&dir);
        let tags = TagStore::new(&db, Arc::new(SystemClock));

        let slug = sanitize_tag("Java Script");
        assert_eq!(slug, "java-script");

        assert!(tags.insert_tag("Java Script", &slug).unwrap());
        assert!(!tags.insert_tag("Java Script", &slug).unwrap());
        assert_eq!(tags.count().unwrap(), 1);

        let tag = tags.find_by_slug("java-script").unwrap().unwrap();
        assert_eq!(tag.name, "Java Script");
    }

    #[test]
    fn test_link_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let db = migrated_db(&dir);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let content = ContentStore::new(&db, clock.clone());
        let tags = TagStore::new(&db, clock);

        let content_id = content
            .insert_content(&NewContent::new("a", "posts", "body", "posts/a.mdx"))
            .unwrap();
        tags.insert_tag("Rust", "rust").unwrap();
        tags.insert_tag("SQL", "sql").unwrap();
        let rust = tags.find_by_slug("rust").unwrap().unwrap();
        let sql = tags.find_by_slug("sql").unwrap().unwrap();

        tags.link_tag_to_content(content_id, rust.id).unwrap();
        tags.link_tag_to_content(content_id, sql.id).unwrap();
        tags.link_tag_to_content(content_id, sql.id).unwrap();

        let linked: Vec<_> = tags
            .get_tags_for_content(content_id)
            .unwrap()
            .into_iter()
            .map(|t| t.slug)
            .collect();
        assert_eq!(linked, vec!["rust", "sql"]);
        assert_eq!(link_count(&db), 2);
    }

    #[test]
    fn test_link_to_missing_content_violates_foreign_key() {
        let dir = tempfile::tempdir().unwrap();
        let db = migrated_db(&dir);
        let tags = TagStore::new(&db, Arc::new(SystemClock));

        tags.insert_tag("Rust", "rust").unwrap();
        let rust = tags.find_by_slug("rust").unwrap().unwrap();

        let err = tags.link_tag_to_content(999, rust.id).unwrap_err();
        assert!(err.is_document_error());
    }

    #[test]
    fn test_deleting_content_cascades_links_only() {
        let dir = tempfile::tempdir().unwrap();
        let db = migrated_db(&dir);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let content = ContentStore::new(&db, clock.clone());
        let tags = TagStore::new(&db, clock);

        let content_id = content
            .insert_content(&NewContent::new("a", "posts", "body", "posts/a.mdx"))
            .unwrap();
        for (name, slug) in [("Rust", "rust"), ("SQL", "sql")] {
            tags.insert_tag(name, slug).unwrap();
            let tag = tags.find_by_slug(slug).unwrap().unwrap();
            tags.link_tag_to_content(content_id, tag.id).unwrap();
        }
        assert_eq!(link_count(&db), 2);

        assert!(content.delete_by_slug("a").unwrap());

        assert_eq!(link_count(&db), 0);
        assert_eq!(tags.count().unwrap(), 2);
    }
}
