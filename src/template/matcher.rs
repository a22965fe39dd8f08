//! Template matching
//!
//! Picks the first template whose URL pattern matches the page URL, resolves
//! its fields and fills in defaults for anything left blank. Patterns are
//! simple globs: `*` matches any run of characters, everything else is
//! compared literally and case-sensitively.

use chrono::Local;
use regex::Regex;
use url::Url;

use super::resolver::{self, format_timestamp, ResolveContext, NOW_FORMAT};
use super::{MatchResult, Template, TemplateError, TemplateField};

/// Directory used when no template supplies one. The page host is appended.
pub const DEFAULT_DIRECTORY_ROOT: &str = "/WebImageCategorizer";

/// Glob match of `target` against `pattern`. An empty or unparsable pattern
/// matches nothing.
pub fn is_url_match(target: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    let escaped: Vec<String> = pattern.split('*').map(|part| regex::escape(part)).collect();
    let full = format!("^{}$", escaped.join(".*"));
    match Regex::new(&full) {
        Ok(re) => re.is_match(target),
        Err(_) => false,
    }
}

/// File extension (without the dot) for a MIME type. JPEG images always map
/// to `jpg`, and anything unknown falls back to `jpg` as well.
pub fn ext_from_mime(mime_type: Option<&str>) -> String {
    match mime_type {
        None | Some("") | Some("image/jpeg") => "jpg".to_string(),
        Some("image/png") => "png".to_string(),
        Some("image/webp") => "webp".to_string(),
        Some("image/gif") => "gif".to_string(),
        Some("image/svg+xml") => "svg".to_string(),
        Some("image/bmp") => "bmp".to_string(),
        Some("image/avif") => "avif".to_string(),
        Some(other) => mime_guess::get_mime_extensions_str(other)
            .and_then(|exts| exts.first())
            .map(|ext| ext.to_string())
            .unwrap_or_else(|| "jpg".to_string()),
    }
}

/// Match a page against the template list, first match wins.
///
/// Resolver failures in a matched template propagate to the caller; defaults
/// only cover fields the matched template left empty, or the case where no
/// template matched at all.
pub fn match_templates(
    templates: &[Template],
    page_url: &Url,
    page_title: &str,
    mime_type: Option<&str>,
) -> Result<MatchResult, TemplateError> {
    let ctx = ResolveContext {
        page_url,
        page_title,
        now: Local::now(),
    };
    let ext_name = ext_from_mime(mime_type);

    let mut result = MatchResult::default();
    for template in templates {
        if !is_url_match(page_url.as_str(), &template.url) {
            continue;
        }
        if let Some(directory) = template.directory.as_deref().filter(|s| !s.is_empty()) {
            result.directory = resolver::resolve_template(directory, TemplateField::Directory, &ctx)?;
        }
        if let Some(file_name) = template.file_name.as_deref().filter(|s| !s.is_empty()) {
            result.file_name = resolver::resolve_template(file_name, TemplateField::FileName, &ctx)?;
        }
        if let Some(description) = template.description.as_deref().filter(|s| !s.is_empty()) {
            result.description =
                Some(resolver::resolve_template(description, TemplateField::Description, &ctx)?);
        }
        result.extension = format!(".{}", ext_name);
        result.encryption = template.encryption;
        result.is_matched = true;
        tracing::debug!(pattern = %template.url, url = %page_url, "template matched");
        break;
    }

    if result.directory.is_empty() {
        result.directory = format!(
            "{}/{}",
            DEFAULT_DIRECTORY_ROOT,
            resolver::host_with_port(page_url)
        );
    }
    if result.file_name.is_empty() {
        result.file_name = format_timestamp(&ctx.now, NOW_FORMAT);
    }
    if result.extension.is_empty() {
        result.extension = format!(".{}", ext_name);
    }
    Ok(result)
}
