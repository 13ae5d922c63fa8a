//! Content migration pipeline
//!
//! ```text
//! scan ──▶ parse ──▶ extract ──▶ persist ──▶ ok | failed
//!            ▲                                  │
//!            └──────────── next document ◀──────┘
//! ```
//!
//! Each document is persisted in its own transaction: the content row, its
//! tags and its links commit together or not at all. Per-document failures
//! are counted and logged; only store-level failures stop the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::clock::{Clock, SystemClock};
use crate::extract::{sanitize_tag, ExtractedContent, FieldExtractor};
use crate::migrations::{self, Journal, MigrationOutcome};
use crate::parser::DocumentParser;
use crate::scanner::{DirectoryScanner, ScanConfig};
use crate::storage::{ContentStore, Database, TagStore};
use crate::{Error, Result};

/// What to do when a document's slug is already stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Count the document as an error and leave the stored row alone
    #[default]
    Fail,
    /// Overwrite the stored row and rebuild its tag links
    Update,
}

/// Pipeline stage a document was in when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStage {
    Parsing,
    Extracting,
    Persisting,
}

impl DocumentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStage::Parsing => "parsing",
            DocumentStage::Extracting => "extracting",
            DocumentStage::Persisting => "persisting",
        }
    }
}

impl std::fmt::Display for DocumentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A document that did not make it into the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFailure {
    pub path: PathBuf,
    pub stage: DocumentStage,
    pub reason: String,
}

/// How a stored document landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persisted {
    Inserted,
    Updated,
}

/// Counts for one migration run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationSummary {
    /// Documents stored successfully
    pub processed: usize,
    /// Documents that failed
    pub errors: usize,
    pub inserted: usize,
    pub updated: usize,
    pub groups: usize,
    pub failures: Vec<DocumentFailure>,
}

impl MigrationSummary {
    pub fn total(&self) -> usize {
        self.processed + self.errors
    }

    fn record_success(&mut self, persisted: Persisted) {
        self.processed += 1;
        match persisted {
            Persisted::Inserted => self.inserted += 1,
            Persisted::Updated => self.updated += 1,
        }
    }

    fn record_failure(&mut self, path: &Path, stage: DocumentStage, error: &Error) {
        self.errors += 1;
        self.failures.push(DocumentFailure {
            path: path.to_path_buf(),
            stage,
            reason: error.to_string(),
        });
    }
}

/// Drives scan → parse → extract → persist over a content tree
pub struct ContentMigrator<'db> {
    db: &'db Database,
    parser: DocumentParser,
    extractor: FieldExtractor,
    clock: Arc<dyn Clock>,
    policy: ConflictPolicy,
}

impl<'db> ContentMigrator<'db> {
    pub fn new(db: &'db Database) -> Self {
        Self {
            db,
            parser: DocumentParser::default(),
            extractor: FieldExtractor::new(),
            clock: Arc::new(SystemClock),
            policy: ConflictPolicy::default(),
        }
    }

    pub fn with_parser(mut self, parser: DocumentParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Reconcile and migrate the schema, then load the content tree.
    ///
    /// Ingestion does not start unless the schema pass committed.
    pub fn run(&self, journal: &Journal, config: &ScanConfig) -> Result<(MigrationOutcome, MigrationSummary)> {
        let outcome = migrations::migrate(self.db, journal)?;
        let summary = self.migrate(config)?;
        Ok((outcome, summary))
    }

    /// Load every document under `config` into the store
    pub fn migrate(&self, config: &ScanConfig) -> Result<MigrationSummary> {
        tracing::info!(
            "Starting migration of {} (compiler: {})",
            config.base_dir.display(),
            self.parser.compiler_name()
        );
        let mut summary = MigrationSummary::default();

        for group in DirectoryScanner::scan(config)? {
            let group = group?;
            summary.groups += 1;
            tracing::info!("Processing {}: {} files", group.type_name, group.files.len());

            for path in group.file_paths() {
                match self.process_document(&group.type_name, &path) {
                    Ok(persisted) => {
                        summary.record_success(persisted);
                        tracing::debug!("Processed {}/{}", group.type_name, slug_for(&path));
                    }
                    Err((stage, e)) if e.is_document_error() => {
                        tracing::warn!(
                            path = %path.display(),
                            stage = stage.as_str(),
                            "Failed to process document: {}",
                            e
                        );
                        summary.record_failure(&path, stage, &e);
                    }
                    Err((_, e)) => return Err(e),
                }
            }
        }

        tracing::info!(
            "Migration complete: {} processed, {} errors",
            summary.processed,
            summary.errors
        );
        Ok(summary)
    }

    /// Run one document through every stage
    fn process_document(
        &self,
        type_name: &str,
        path: &Path,
    ) -> std::result::Result<Persisted, (DocumentStage, Error)> {
        let parsed = self
            .parser
            .parse_file(path)
            .map_err(|e| (DocumentStage::Parsing, e))?;

        let extracted = self
            .extractor
            .extract_document(&parsed, &slug_for(path), type_name)
            .map_err(|e| (DocumentStage::Extracting, e))?;

        self.persist(&extracted)
            .map_err(|e| (DocumentStage::Persisting, e))
    }

    /// Store one record with its tags, atomically
    fn persist(&self, extracted: &ExtractedContent) -> Result<Persisted> {
        self.db.transaction(|db| {
            let contents = ContentStore::new(db, self.clock.clone());
            let tags = TagStore::new(db, self.clock.clone());

            let (content_id, persisted) = match contents.insert_content(&extracted.content) {
                Ok(id) => (id, Persisted::Inserted),
                Err(Error::DuplicateSlug(slug)) if self.policy == ConflictPolicy::Update => {
                    let id = contents
                        .update_content(&extracted.content)?
                        .ok_or(Error::DuplicateSlug(slug))?;
                    tags.unlink_all(id)?;
                    (id, Persisted::Updated)
                }
                Err(e) => return Err(e),
            };

            for name in &extracted.tags {
                let slug = sanitize_tag(name);
                if slug.is_empty() {
                    tracing::warn!("Skipping tag {:?} on {}: empty slug", name, extracted.content.slug);
                    continue;
                }
                tags.insert_tag(name, &slug)?;
                if let Some(tag) = tags.find_by_slug(&slug)? {
                    tags.link_tag_to_content(content_id, tag.id)?;
                }
            }

            Ok(persisted)
        })
    }
}

/// Slug of a document: its file name without extension
pub fn slug_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::parser::MarkdownCompiler;
    use std::fs;

    struct Fixture {
        dir: tempfile::TempDir,
        db: Database,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir_all(dir.path().join("content/backlog")).unwrap();
            fs::create_dir_all(dir.path().join("content/publish")).unwrap();
            let db = Database::open(&dir.path().join("content.db")).unwrap();
            migrations::migrate(&db, &Journal::builtin()).unwrap();
            Self { dir, db }
        }

        fn write(&self, relative: &str, text: &str) {
            let path = self.dir.path().join("content").join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }

        fn config(&self) -> ScanConfig {
            ScanConfig::new(self.dir.path().join("content"))
        }

        fn contents(&self) -> ContentStore<'_> {
            ContentStore::new(&self.db, Arc::new(SystemClock))
        }

        fn tags(&self) -> TagStore<'_> {
            TagStore::new(&self.db, Arc::new(SystemClock))
        }
    }

    #[test]
    fn test_malformed_document_is_isolated() {
        let fx = Fixture::new();
        fx.write("publish/posts/a.mdx", "---\ntitle: A\n---\nHello");
        fx.write("publish/posts/b.mdx", "---\ntitle: B\n\nno closing fence");

        let summary = ContentMigrator::new(&fx.db).migrate(&fx.config()).unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.failures[0].stage, DocumentStage::Parsing);
        assert!(summary.failures[0].path.ends_with("b.mdx"));

        let rows = fx.contents().find_all().unwrap();
        assert_eq!(rows.len(), 1);
        let a = &rows[0];
        assert_eq!(a.slug(), "a");
        assert_eq!(a.content.status, "draft");
        assert!(!a.content.pinned);

        let pinned: i64 = fx
            .db
            .conn()
            .unwrap()
            .query_row("SELECT pinned FROM content WHERE slug = 'a'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(pinned, 0);
    }

    #[test]
    fn test_one_bad_document_among_many() {
        let fx = Fixture::new();
        for i in 0..5 {
            fx.write(&format!("publish/posts/ok-{i}.mdx"), &format!("---\ntitle: Post {i}\n---\nBody {i}"));
        }
        fx.write("backlog/snippets/broken.md", "---\ntitle: [oops\n---\n");

        let summary = ContentMigrator::new(&fx.db).migrate(&fx.config()).unwrap();

        assert_eq!(summary.processed, 5);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.groups, 2);
        for i in 0..5 {
            assert!(fx.contents().find_by_slug(&format!("ok-{i}")).unwrap().is_some());
        }
    }

    #[test]
    fn test_second_run_reports_duplicates_without_duplicating_rows() {
        let fx = Fixture::new();
        fx.write("publish/posts/a.mdx", "---\ntitle: A\ntags: [Rust]\n---\nHello");
        fx.write("publish/projects/b.mdx", "---\ntitle: B\n---\nWorld");

        let migrator = ContentMigrator::new(&fx.db);
        let first = migrator.migrate(&fx.config()).unwrap();
        assert_eq!((first.processed, first.errors), (2, 0));

        let second = migrator.migrate(&fx.config()).unwrap();
        assert_eq!((second.processed, second.errors), (0, 2));
        assert!(second.failures.iter().all(|f| f.stage == DocumentStage::Persisting));

        assert_eq!(fx.contents().count().unwrap(), 2);
        assert_eq!(fx.tags().count().unwrap(), 1);
    }

    #[test]
    fn test_update_policy_rewrites_rows() {
        let fx = Fixture::new();
        let clock = Arc::new(FixedClock::at("2024-01-01T00:00:00Z"));
        fx.write("publish/posts/a.mdx", "---\ntitle: First\ntags: [Old]\n---\nv1");

        let migrator = ContentMigrator::new(&fx.db)
            .with_clock(clock.clone())
            .with_conflict_policy(ConflictPolicy::Update);
        migrator.migrate(&fx.config()).unwrap();

        clock.advance(chrono::Duration::days(1));
        fx.write("publish/posts/a.mdx", "---\ntitle: Second\ntags: [New]\n---\nv2");
        let summary = migrator.migrate(&fx.config()).unwrap();
        assert_eq!((summary.processed, summary.updated, summary.errors), (1, 1, 0));

        let row = fx.contents().find_by_slug("a").unwrap().unwrap();
        assert_eq!(row.content.title, "Second");
        assert_eq!(row.content.markdown_content, "v2");
        assert_eq!(row.created_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(row.updated_at.as_deref(), Some("2024-01-02T00:00:00Z"));

        let linked: Vec<_> = fx
            .tags()
            .get_tags_for_content(row.id)
            .unwrap()
            .into_iter()
            .map(|t| t.slug)
            .collect();
        assert_eq!(linked, vec!["new"]);
    }

    #[test]
    fn test_tags_are_normalized_and_linked() {
        let fx = Fixture::new();
        fx.write(
            "publish/posts/a.mdx",
            "---\ntitle: A\ntags: [Java Script, java   script, Rust, '!!!']\n---\nbody",
        );

        let summary = ContentMigrator::new(&fx.db).migrate(&fx.config()).unwrap();
        assert_eq!(summary.processed, 1);

        let row = fx.contents().find_by_slug("a").unwrap().unwrap();
        let linked: Vec<_> = fx
            .tags()
            .get_tags_for_content(row.id)
            .unwrap()
            .into_iter()
            .map(|t| t.slug)
            .collect();
        assert_eq!(linked, vec!["java-script", "rust"]);
        assert_eq!(fx.tags().count().unwrap(), 2);
    }

    #[test]
    fn test_compiled_artifact_is_stored() {
        let fx = Fixture::new();
        fx.write("publish/posts/a.mdx", "---\ntitle: A\n---\n# Heading");

        ContentMigrator::new(&fx.db).migrate(&fx.config()).unwrap();

        let row = fx.contents().find_by_slug("a").unwrap().unwrap();
        let compiled = row.content.compiled_content.unwrap();
        assert!(compiled.contains("<h1>Heading</h1>"));
        assert!(row.content.full_path.ends_with("a.mdx"));
        assert_eq!(row.content.content_type, "posts");
    }

    struct ExplodingCompiler;

    impl MarkdownCompiler for ExplodingCompiler {
        fn name(&self) -> &str {
            "exploding"
        }

        fn compile(&self, body: &str) -> std::result::Result<serde_json::Value, String> {
            if body.contains("boom") {
                Err("cannot compile".to_string())
            } else {
                Ok(serde_json::json!({ "len": body.len() }))
            }
        }
    }

    #[test]
    fn test_compiler_failure_counts_as_error() {
        let fx = Fixture::new();
        fx.write("publish/posts/a.mdx", "fine");
        fx.write("publish/posts/b.mdx", "boom");

        let summary = ContentMigrator::new(&fx.db)
            .with_parser(DocumentParser::new(ExplodingCompiler))
            .migrate(&fx.config())
            .unwrap();

        assert_eq!((summary.processed, summary.errors), (1, 1));
        assert!(summary.failures[0].reason.contains("cannot compile"));
    }

    #[test]
    fn test_failed_tag_link_rolls_back_content_row() {
        let fx = Fixture::new();
        // Break the association table so linking fails after the content insert
        fx.db
            .conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_links BEFORE INSERT ON content_tags \
                 BEGIN SELECT RAISE(ABORT, 'links disabled'); END;",
            )
            .unwrap();
        fx.write("publish/posts/tagged.mdx", "---\ntags: [Rust]\n---\nbody");
        fx.write("publish/posts/untagged.mdx", "---\ntitle: Plain\n---\nbody");

        let summary = ContentMigrator::new(&fx.db).migrate(&fx.config()).unwrap();

        assert_eq!((summary.processed, summary.errors), (1, 1));
        assert!(fx.contents().find_by_slug("tagged").unwrap().is_none());
        assert!(fx.contents().find_by_slug("untagged").unwrap().is_some());
        assert_eq!(fx.tags().count().unwrap(), 0);
    }

    #[test]
    fn test_missing_source_folder_aborts_before_processing() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("content.db")).unwrap();
        migrations::migrate(&db, &Journal::builtin()).unwrap();

        let err = ContentMigrator::new(&db)
            .migrate(&ScanConfig::new(dir.path().join("missing")))
            .unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound(_)));
    }

    #[test]
    fn test_closed_connection_aborts_the_run() {
        let fx = Fixture::new();
        fx.write("publish/posts/a.mdx", "body");
        let Fixture { dir, mut db } = fx;
        db.close().unwrap();

        let err = ContentMigrator::new(&db)
            .migrate(&ScanConfig::new(dir.path().join("content")))
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[test]
    fn test_run_migrates_schema_before_ingesting() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("content/backlog")).unwrap();
        fs::create_dir_all(dir.path().join("content/publish/posts")).unwrap();
        fs::write(dir.path().join("content/publish/posts/a.mdx"), "---\ntitle: A\n---\nbody").unwrap();
        let db = Database::open(&dir.path().join("content.db")).unwrap();

        let (outcome, summary) = ContentMigrator::new(&db)
            .run(&Journal::builtin(), &ScanConfig::new(dir.path().join("content")))
            .unwrap();

        assert_eq!(outcome.executed.len(), 3);
        assert_eq!(summary.processed, 1);
    }

    #[test]
    fn test_slug_for() {
        assert_eq!(slug_for(Path::new("/x/posts/a.mdx")), "a");
        assert_eq!(slug_for(Path::new("b.md")), "b");
        assert_eq!(slug_for(Path::new("dotted.name.mdx")), "dotted.name");
    }
}
