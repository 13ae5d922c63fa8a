use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::migrations::Journal;
use crate::scanner::{ScanConfig, DEFAULT_EXTENSIONS, DEFAULT_SOURCE_FOLDERS, DEFAULT_TYPE_PATTERN};
use crate::{Error, Result};

/// Environment variable that overrides the configured database path
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LoaderConfig {
    pub database: Option<String>,
    pub content_dir: Option<String>,
    pub source_folders: Option<Vec<String>>,
    pub type_pattern: Option<String>,
    /// Directory holding `meta/_journal.json`; the built-in journal is used when unset
    pub migrations_dir: Option<String>,
    pub extensions: Option<Vec<String>>,
}

impl LoaderConfig {
    /// Starter config written by `init`
    pub fn starter() -> Self {
        Self {
            database: Some(default_database_path().to_string_lossy().to_string()),
            content_dir: Some("./content".to_string()),
            source_folders: Some(DEFAULT_SOURCE_FOLDERS.iter().map(|s| s.to_string()).collect()),
            type_pattern: Some(DEFAULT_TYPE_PATTERN.to_string()),
            migrations_dir: None,
            extensions: Some(DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect()),
        }
    }

    /// Database path: flag, then `DATABASE_PATH`, then file, then default
    pub fn database_path(&self, flag: Option<&Path>, env: Option<String>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| env.filter(|v| !v.trim().is_empty()).map(PathBuf::from))
            .or_else(|| self.database.as_ref().map(PathBuf::from))
            .unwrap_or_else(default_database_path)
    }

    pub fn content_dir(&self, flag: Option<&Path>) -> Option<PathBuf> {
        flag.map(Path::to_path_buf)
            .or_else(|| self.content_dir.as_ref().map(PathBuf::from))
    }

    /// Scan settings for `base_dir` with this file's overrides applied
    pub fn scan_config(&self, base_dir: impl Into<PathBuf>) -> Result<ScanConfig> {
        let mut scan = ScanConfig::new(base_dir);
        if let Some(folders) = &self.source_folders {
            scan = scan.with_source_folders(folders.iter().cloned());
        }
        if let Some(pattern) = &self.type_pattern {
            scan = scan.with_type_pattern(pattern)?;
        }
        if let Some(extensions) = &self.extensions {
            scan = scan.with_extensions(extensions.iter().cloned());
        }
        Ok(scan)
    }

    /// Journal from `migrations_dir` (or the override), else the built-in one
    pub fn journal(&self, flag: Option<&Path>) -> Result<Journal> {
        let dir = flag
            .map(Path::to_path_buf)
            .or_else(|| self.migrations_dir.as_ref().map(PathBuf::from));
        match dir {
            Some(dir) => Journal::load(&dir),
            None => Ok(Journal::builtin()),
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("mdx-loader.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("./database/content.db")
}

pub fn load_config(path: Option<&Path>) -> Result<Option<LoaderConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: LoaderConfig = toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &LoaderConfig, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::Config(format!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        )));
    }

    let contents = toml::to_string_pretty(config).map_err(|e| Error::Config(e.to_string()))?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
