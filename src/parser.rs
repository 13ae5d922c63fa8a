//! Document parsing
//!
//! Splits a document into its YAML frontmatter and markdown body, then runs
//! the body through a [`MarkdownCompiler`]. The compiled artifact is stored as
//! JSON and is opaque to the rest of the crate.

use std::path::{Path, PathBuf};
use pulldown_cmark::{html, Options, Parser as CmarkParser};
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use crate::{Error, Result};

/// Frontmatter fence
pub const FRONTMATTER_DELIMITER: &str = "---";

/// Turns a markdown body into a serializable artifact
pub trait MarkdownCompiler: Send + Sync {
    /// Compiler name (recorded in logs)
    fn name(&self) -> &str;

    /// Compile a markdown body. Errors surface as a parse failure of the
    /// document being processed.
    fn compile(&self, body: &str) -> std::result::Result<serde_json::Value, String>;
}

/// Output of [`HtmlCompiler`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledArtifact {
    pub compiler: String,
    pub html: String,
}

/// CommonMark + GFM extensions rendered to HTML with pulldown-cmark
#[derive(Debug, Clone, Default)]
pub struct HtmlCompiler;

impl HtmlCompiler {
    pub fn new() -> Self {
        Self
    }

    fn options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES
    }

    /// Render to an HTML string
    pub fn render(&self, body: &str) -> String {
        let mut out = String::with_capacity(body.len() * 3 / 2);
        html::push_html(&mut out, CmarkParser::new_ext(body, Self::options()));
        out
    }
}

impl MarkdownCompiler for HtmlCompiler {
    fn name(&self) -> &str {
        "pulldown-cmark"
    }

    fn compile(&self, body: &str) -> std::result::Result<serde_json::Value, String> {
        let artifact = CompiledArtifact {
            compiler: self.name().to_string(),
            html: self.render(body),
        };
        serde_json::to_value(artifact).map_err(|e| e.to_string())
    }
}

/// A document split and compiled, ready for field extraction
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDocument {
    /// Frontmatter keys as written (empty when the document has none)
    pub frontmatter: Mapping,
    /// Markdown after the frontmatter block
    pub body: String,
    /// Compiler output, serialized as JSON
    pub compiled: String,
    pub source_path: PathBuf,
}

/// Reads documents and hands back [`ParsedDocument`]s
pub struct DocumentParser {
    compiler: Box<dyn MarkdownCompiler>,
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new(HtmlCompiler::new())
    }
}

impl DocumentParser {
    pub fn new(compiler: impl MarkdownCompiler + 'static) -> Self {
        Self {
            compiler: Box::new(compiler),
        }
    }

    pub fn compiler_name(&self) -> &str {
        self.compiler.name()
    }

    /// Read and parse a file. Every failure is a [`Error::ParseFailure`].
    pub fn parse_file(&self, path: &Path) -> Result<ParsedDocument> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::parse_failure(path, e))?;
        self.parse_str(&content, path)
    }

    /// Parse document text that came from `path`
    pub fn parse_str(&self, content: &str, path: &Path) -> Result<ParsedDocument> {
        let (block, body) = split_frontmatter(content).map_err(|cause| Error::parse_failure(path, cause))?;
        let frontmatter = match block {
            Some(block) => parse_frontmatter(block).map_err(|cause| Error::parse_failure(path, cause))?,
            None => Mapping::new(),
        };

        let compiled = self
            .compiler
            .compile(body)
            .and_then(|artifact| serde_json::to_string(&artifact).map_err(|e| e.to_string()))
            .map_err(|cause| Error::parse_failure(path, format!("{} failed: {}", self.compiler.name(), cause)))?;

        Ok(ParsedDocument {
            frontmatter,
            body: body.to_string(),
            compiled,
            source_path: path.to_path_buf(),
        })
    }
}

/// Split `content` into its frontmatter block (without fences) and body.
///
/// A document that does not open with `---` has no frontmatter. One that does
/// must close it with a `---` line of its own.
pub fn split_frontmatter(content: &str) -> std::result::Result<(Option<&str>, &str), String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let first_line_end = content.find('\n').map(|i| i + 1).unwrap_or(content.len());
    if content[..first_line_end].trim_end() != FRONTMATTER_DELIMITER {
        return Ok((None, content));
    }

    let mut offset = first_line_end;
    while offset < content.len() {
        let line_end = content[offset..]
            .find('\n')
            .map(|i| offset + i + 1)
            .unwrap_or(content.len());
        if content[offset..line_end].trim_end() == FRONTMATTER_DELIMITER {
            return Ok((Some(&content[first_line_end..offset]), &content[line_end..]));
        }
        offset = line_end;
    }

    Err(format!("missing closing {FRONTMATTER_DELIMITER} for frontmatter"))
}

fn parse_frontmatter(block: &str) -> std::result::Result<Mapping, String> {
    match serde_yaml::from_str::<Value>(block).map_err(|e| format!("invalid frontmatter: {e}"))? {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(map) => Ok(map),
        other => Err(format!("frontmatter must be a mapping, found {}", yaml_kind(&other))),
    }
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
