//! Naming template engine
//!
//! Templates pair a URL glob pattern with directory / file name / description
//! strings that may embed `{...}` parameters ({host}, {title}, {now-...},
//! {path-1}, {query-id}, ...). At save time the first template whose pattern
//! matches the page URL is resolved against the page context; when nothing
//! matches, a default directory and timestamp file name are produced instead.

pub mod matcher;
pub mod resolver;
pub mod tokenizer;
pub mod validate;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use matcher::{ext_from_mime, is_url_match, match_templates, DEFAULT_DIRECTORY_ROOT};
pub use resolver::{format_timestamp, resolve_template, ResolveContext, NOW_FORMAT, TODAY_FORMAT};
pub use tokenizer::extract_tokens;
pub use validate::{is_file_system_safe, validate_template_field};

/// Which template field a string is resolved or validated as.
///
/// `{url}` is only meaningful for descriptions, and file system character
/// rules only apply to directories and file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateField {
    Directory,
    FileName,
    Description,
}

/// A user-defined naming template.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// URL glob pattern, `*` matches any run of characters.
    #[serde(default)]
    pub url: String,
    /// Target directory template, must start with `/` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
    /// File name template, without extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Description template, stored as object metadata where supported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Encrypt the payload before upload.
    #[serde(default)]
    pub encryption: bool,
}

/// The resolved destination for one save operation.
///
/// `directory` and `file_name` are always populated, falling back to
/// `/WebImageCategorizer/<host>` and a `YYYYMMDDHHmmss` timestamp when no
/// template supplies them. `extension` always carries a leading dot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub is_matched: bool,
    pub directory: String,
    pub file_name: String,
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub encryption: bool,
}

/// Errors raised while tokenizing, validating or resolving a template field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Template is not well formed: {0}")]
    MalformedBraces(String),

    #[error("Unsupported parameter: {0}")]
    UnsupportedToken(String),

    #[error("Directory must start with '/'")]
    DirectoryNotAbsolute,

    #[error("Invalid character(s) in parameter: {0}")]
    UnsafeTokenCharacter(String),

    #[error("Invalid character(s) found in directory path: {0}")]
    UnsafeDirectorySegment(String),

    #[error("Invalid character(s) found.")]
    UnsafeName,

    #[error("Too short pathname")]
    PathTooShort,

    #[error("Invalid path#: {0}")]
    BadPathIndex(String),

    #[error("Invalid path# or out of boundary: {0}")]
    PathOutOfRange(usize),

    #[error("Query string parameter is not found: {0}")]
    QueryParamNotFound(String),
}
