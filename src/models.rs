//! Content and tag records
//!
//! `NewContent` is what the extractor produces and the store inserts;
//! `ContentRecord` is a row read back, with its id and timestamps.

use serde::{Deserialize, Serialize};

/// Status given to content whose frontmatter does not name one
pub const DEFAULT_STATUS: &str = "draft";

/// Title given to content whose frontmatter does not name one
pub const DEFAULT_TITLE: &str = "Untitled";

/// A content row ready for insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContent {
    /// Unique, immutable identity (the file stem)
    pub slug: String,
    /// Category, taken from the source folder name
    #[serde(rename = "type")]
    pub content_type: String,
    pub title: String,
    pub subheading: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub status: String,
    pub pinned: bool,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    /// Raw markdown body
    pub markdown_content: String,
    /// Serialized output of the markdown compiler
    pub compiled_content: Option<String>,
    /// Source file the row was loaded from
    pub full_path: String,
}

impl NewContent {
    /// Minimal record with every optional field empty and defaults applied
    pub fn new(
        slug: impl Into<String>,
        content_type: impl Into<String>,
        markdown_content: impl Into<String>,
        full_path: impl Into<String>,
    ) -> Self {
        Self {
            slug: slug.into(),
            content_type: content_type.into(),
            title: DEFAULT_TITLE.to_string(),
            subheading: None,
            excerpt: None,
            author: None,
            date: None,
            status: DEFAULT_STATUS.to_string(),
            pinned: false,
            repo_url: None,
            demo_url: None,
            markdown_content: markdown_content.into(),
            compiled_content: None,
            full_path: full_path.into(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

/// A content row as stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub id: i64,
    #[serde(flatten)]
    pub content: NewContent,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl ContentRecord {
    pub fn slug(&self) -> &str {
        &self.content.slug
    }
}

/// A tag row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: Option<String>,
}
