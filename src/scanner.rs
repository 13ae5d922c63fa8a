//! Content directory scanning
//!
//! Layout consumed:
//!
//! ```text
//! <base>/<source folder>/<type>/<slug>.mdx
//! ```
//!
//! Source folders are fixed by configuration (`backlog` and `publish` by
//! default); type folders are any subdirectory whose name matches the type
//! pattern. Each matching type folder becomes one [`ScannedDocument`] group.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use regex::Regex;
use crate::{Error, Result};

/// Source folders scanned when none are configured
pub const DEFAULT_SOURCE_FOLDERS: &[&str] = &["backlog", "publish"];

/// Type folders picked up when no pattern is configured
pub const DEFAULT_TYPE_PATTERN: &str = "projects|coursework|posts|booknotes|snippets";

/// Extensions recognised as documents
pub const DEFAULT_EXTENSIONS: &[&str] = &["md", "mdx"];

/// Where and what to scan
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub base_dir: PathBuf,
    pub source_folders: Vec<String>,
    pub type_pattern: Regex,
    pub extensions: Vec<String>,
}

impl ScanConfig {
    /// Scan `base_dir` with the default folders, pattern and extensions
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            source_folders: DEFAULT_SOURCE_FOLDERS.iter().map(|s| s.to_string()).collect(),
            type_pattern: default_type_pattern().clone(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_source_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_folders = folders.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the type pattern; an invalid expression is a config error
    pub fn with_type_pattern(mut self, pattern: &str) -> Result<Self> {
        self.type_pattern = Regex::new(pattern)
            .map_err(|e| Error::Config(format!("invalid type pattern {pattern:?}: {e}")))?;
        Ok(self)
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| {
                let e: String = e.into();
                e.trim_start_matches('.').to_string()
            })
            .collect();
        self
    }

    fn is_document(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|known| known == ext))
    }
}

fn default_type_pattern() -> &'static Regex {
    static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(DEFAULT_TYPE_PATTERN).expect("default type pattern is valid"))
}

/// One type folder and the documents in it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedDocument {
    /// Type folder name, used as the content type
    pub type_name: String,
    /// Type folder path
    pub path: PathBuf,
    /// Document file names, sorted
    pub files: Vec<String>,
}

impl ScannedDocument {
    /// Full path of every listed file
    pub fn file_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.files.iter().map(|f| self.path.join(f))
    }
}

/// Directory scanner entry point
pub struct DirectoryScanner;

impl DirectoryScanner {
    /// Start a scan.
    ///
    /// Every configured source folder is checked up front, so a missing one
    /// fails here with [`Error::DirectoryNotFound`] before anything is read.
    /// Groups are produced lazily as the returned iterator is driven.
    pub fn scan(config: &ScanConfig) -> Result<ScanIter> {
        let mut sources = VecDeque::with_capacity(config.source_folders.len());
        for folder in &config.source_folders {
            let path = config.base_dir.join(folder);
            if !path.is_dir() {
                return Err(Error::DirectoryNotFound(path));
            }
            sources.push_back(path);
        }

        Ok(ScanIter {
            config: config.clone(),
            sources,
            pending: VecDeque::new(),
        })
    }
}

/// Lazy sequence of [`ScannedDocument`] groups; consumed once
#[derive(Debug)]
pub struct ScanIter {
    config: ScanConfig,
    sources: VecDeque<PathBuf>,
    pending: VecDeque<(String, PathBuf)>,
}

impl ScanIter {
    fn queue_type_dirs(&mut self, source: &Path) -> Result<()> {
        let mut type_dirs = Vec::new();
        for entry in std::fs::read_dir(source)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let Some(name) = utf8_name(&entry) else {
                continue;
            };
            if self.config.type_pattern.is_match(&name) {
                type_dirs.push((name, entry.path()));
            }
        }
        type_dirs.sort();
        self.pending.extend(type_dirs);
        Ok(())
    }

    fn read_group(&self, type_name: String, path: PathBuf) -> Result<ScannedDocument> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&path)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = utf8_name(&entry) else {
                continue;
            };
            if self.config.is_document(&name) {
                files.push(name);
            }
        }
        files.sort();

        Ok(ScannedDocument { type_name, path, files })
    }
}

/// Entry name as UTF-8; other names cannot become slugs or types and are skipped
fn utf8_name(entry: &std::fs::DirEntry) -> Option<String> {
    match entry.file_name().into_string() {
        Ok(name) => Some(name),
        Err(raw) => {
            tracing::warn!("Skipping {}: name is not valid UTF-8 ({:?})", entry.path().display(), raw);
            None
        }
    }
}

impl Iterator for ScanIter {
    type Item = Result<ScannedDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pending.is_empty() {
            let source = self.sources.pop_front()?;
            if let Err(e) = self.queue_type_dirs(&source) {
                return Some(Err(e));
            }
        }

        let (type_name, path) = self.pending.pop_front()?;
        Some(self.read_group(type_name, path))
    }
}
