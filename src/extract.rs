//! Frontmatter field extraction
//!
//! Turns the loosely typed frontmatter mapping into a [`NewContent`] with
//! defaults applied. Missing or empty fields fall back to their default;
//! a value of the wrong shape (a list where a title belongs) is rejected
//! here, so nothing untyped travels further.

use std::path::Path;
use std::sync::OnceLock;
use regex::Regex;
use serde_yaml::{Mapping, Value};
use crate::models::{NewContent, DEFAULT_STATUS, DEFAULT_TITLE};
use crate::parser::ParsedDocument;
use crate::{Error, Result};

/// A content row plus the tag names that go with it
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedContent {
    pub content: NewContent,
    /// Tag names as written, in frontmatter order
    pub tags: Vec<String>,
}

/// Stateless frontmatter → record mapper
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldExtractor;

impl FieldExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Map frontmatter and body to a content record
    pub fn extract(
        &self,
        frontmatter: &Mapping,
        body: &str,
        slug: &str,
        content_type: &str,
        source_path: &Path,
    ) -> Result<ExtractedContent> {
        let content = NewContent {
            slug: slug.to_string(),
            content_type: content_type.to_string(),
            title: text_field(frontmatter, "title")?.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            subheading: text_field(frontmatter, "subheading")?,
            excerpt: text_field(frontmatter, "excerpt")?,
            author: text_field(frontmatter, "author")?,
            date: text_field(frontmatter, "date")?,
            status: text_field(frontmatter, "status")?.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            pinned: flag_field(frontmatter, "pinned")?,
            repo_url: text_field(frontmatter, "repo_url")?,
            demo_url: text_field(frontmatter, "demo_url")?,
            markdown_content: body.to_string(),
            compiled_content: None,
            full_path: source_path.to_string_lossy().to_string(),
        };

        Ok(ExtractedContent {
            content,
            tags: list_field(frontmatter, "tags")?,
        })
    }

    /// Extract from a parsed document, carrying its compiled artifact along
    pub fn extract_document(
        &self,
        doc: &ParsedDocument,
        slug: &str,
        content_type: &str,
    ) -> Result<ExtractedContent> {
        let mut extracted = self.extract(&doc.frontmatter, &doc.body, slug, content_type, &doc.source_path)?;
        extracted.content.compiled_content = Some(doc.compiled.clone());
        Ok(extracted)
    }
}

/// Normalize a tag name into its URL-safe slug.
///
/// Lowercases, turns each whitespace run into one hyphen and drops anything
/// that is not `a-z`, `0-9` or `-`. Applying it twice changes nothing.
pub fn sanitize_tag(tag: &str) -> String {
    static WHITESPACE: OnceLock<Regex> = OnceLock::new();
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();
    let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
    let disallowed = DISALLOWED.get_or_init(|| Regex::new(r"[^a-z0-9-]").expect("slug pattern is valid"));

    let lowered = tag.to_lowercase();
    let hyphenated = whitespace.replace_all(&lowered, "-");
    disallowed.replace_all(&hyphenated, "").into_owned()
}

fn invalid(field: &str, reason: impl Into<String>) -> Error {
    Error::InvalidFrontmatter {
        field: field.to_string(),
        reason: reason.into(),
    }
}

fn untagged(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untagged(&tagged.value),
        other => other,
    }
}

fn scalar_text(value: &Value) -> Option<Option<String>> {
    match untagged(value) {
        Value::Null => Some(None),
        Value::String(s) if s.trim().is_empty() => Some(None),
        Value::String(s) => Some(Some(s.clone())),
        Value::Bool(b) => Some(Some(b.to_string())),
        Value::Number(n) => Some(Some(n.to_string())),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

/// Optional text field; numbers and booleans keep their textual form
fn text_field(fm: &Mapping, key: &str) -> Result<Option<String>> {
    match fm.get(key) {
        None => Ok(None),
        Some(value) => scalar_text(value).ok_or_else(|| invalid(key, "expected a single value, found a list or mapping")),
    }
}

/// Boolean field, false when absent
fn flag_field(fm: &Mapping, key: &str) -> Result<bool> {
    let Some(value) = fm.get(key) else {
        return Ok(false);
    };
    match untagged(value) {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) => Ok(matches!(s.trim().to_lowercase().as_str(), "true" | "yes" | "1")),
        _ => Err(invalid(key, "expected a boolean")),
    }
}

/// List field; a single string is split on commas
fn list_field(fm: &Mapping, key: &str) -> Result<Vec<String>> {
    let Some(value) = fm.get(key) else {
        return Ok(Vec::new());
    };
    match untagged(value) {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()),
        Value::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match scalar_text(item) {
                    Some(Some(text)) => out.push(text.trim().to_string()),
                    Some(None) => {}
                    None => return Err(invalid(key, "list items must be single values")),
                }
            }
            Ok(out)
        }
        Value::Mapping(_) => Err(invalid(key, "expected a list, found a mapping")),
        other => Ok(scalar_text(other).flatten().into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn extract(yaml: &str) -> Result<ExtractedContent> {
        FieldExtractor::new().extract(&mapping(yaml), "body", "a", "posts", Path::new("/c/posts/a.mdx"))
    }

    #[test]
    fn test_defaults_on_empty_frontmatter() {
        let out = FieldExtractor::new()
            .extract(&Mapping::new(), "body", "a", "posts", Path::new("/c/posts/a.mdx"))
            .unwrap();
        let c = out.content;

        assert_eq!(c.slug, "a");
        assert_eq!(c.content_type, "posts");
        assert_eq!(c.title, "Untitled");
        assert_eq!(c.status, "draft");
        assert!(!c.pinned);
        assert!(c.subheading.is_none() && c.excerpt.is_none() && c.author.is_none());
        assert!(c.date.is_none() && c.repo_url.is_none() && c.demo_url.is_none());
        assert_eq!(c.markdown_content, "body");
        assert_eq!(c.full_path, "/c/posts/a.mdx");
        assert!(out.tags.is_empty());
    }

    #[test]
    fn test_full_frontmatter() {
        let out = extract(
            r#"
title: Building a Loader
subheading: Notes
excerpt: Short
author: Sam
date: 2024-01-15
status: published
pinned: true
repo_url: https://example.com/repo
demo_url: https://example.com/demo
tags: [Rust, "Java Script"]
unknown_key: ignored
"#,
        )
        .unwrap();
        let c = out.content;

        assert_eq!(c.title, "Building a Loader");
        assert_eq!(c.date.as_deref(), Some("2024-01-15"));
        assert_eq!(c.status, "published");
        assert!(c.pinned);
        assert_eq!(c.repo_url.as_deref(), Some("https://example.com/repo"));
        assert_eq!(out.tags, vec!["Rust", "Java Script"]);
    }

    #[test]
    fn test_empty_strings_fall_back_to_defaults() {
        let c = extract("title: ''\nstatus: ''\nauthor: ' '").unwrap().content;
        assert_eq!(c.title, "Untitled");
        assert_eq!(c.status, "draft");
        assert!(c.author.is_none());
    }

    #[test]
    fn test_lenient_scalars() {
        let out = extract("title: 2024\npinned: 1\ntags: 'a, b ,,c'").unwrap();
        assert_eq!(out.content.title, "2024");
        assert!(out.content.pinned);
        assert_eq!(out.tags, vec!["a", "b", "c"]);

        assert!(!extract("pinned: 'no'").unwrap().content.pinned);
        assert!(extract("pinned: 'yes'").unwrap().content.pinned);
    }

    #[test]
    fn test_wrong_shapes_are_rejected() {
        let err = extract("title: [a, b]").unwrap_err();
        assert!(matches!(err, Error::InvalidFrontmatter { ref field, .. } if field == "title"));

        let err = extract("pinned: [true]").unwrap_err();
        assert!(matches!(err, Error::InvalidFrontmatter { ref field, .. } if field == "pinned"));

        let err = extract("tags: {a: 1}").unwrap_err();
        assert!(matches!(err, Error::InvalidFrontmatter { ref field, .. } if field == "tags"));
    }

    #[test]
    fn test_sanitize_tag_examples() {
        assert_eq!(sanitize_tag("Java Script"), "java-script");
        assert_eq!(sanitize_tag("  C++  Tips "), "-c-tips-");
        assert_eq!(sanitize_tag("Node.js"), "nodejs");
        assert_eq!(sanitize_tag("Ünïcode Tag"), "ncode-tag");
        assert_eq!(sanitize_tag(""), "");
    }

    proptest! {
        #[test]
        fn sanitize_tag_is_idempotent_and_url_safe(tag in any::<String>()) {
            let once = sanitize_tag(&tag);
            prop_assert_eq!(sanitize_tag(&once), once.clone());
            prop_assert_eq!(sanitize_tag(&tag), once.clone());
            prop_assert!(once.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }

        #[test]
        fn sanitize_tag_keeps_words_of_plain_ascii(words in proptest::collection::vec("[a-zA-Z0-9]{1,8}", 1..5)) {
            let slug = sanitize_tag(&words.join(" "));
            prop_assert_eq!(slug, words.join("-").to_lowercase());
        }
    }
}
