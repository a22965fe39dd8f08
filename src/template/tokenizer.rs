//! `{...}` parameter extraction
//!
//! A template string is well formed when every brace group is balanced,
//! non-empty and non-nested. Extraction returns each group (braces included)
//! in left-to-right order, duplicates preserved.

use std::sync::LazyLock;

use regex::Regex;

use super::TemplateError;

/// A `{` appears inside another brace group.
static NESTED_BRACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]*\{[^{}]*\}[^{}]*\}").expect("pattern is valid"));

/// Whole string decomposes into plain text and non-empty brace groups.
static WELL_FORMED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[^{}]*\{[^{}]+\})*[^{}]*$").expect("pattern is valid"));

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[^{}]+\}").expect("pattern is valid"));

/// Check that every brace in `input` opens and closes a flat, non-empty group.
pub fn has_matched_braces(input: &str) -> bool {
    !NESTED_BRACES.is_match(input) && WELL_FORMED.is_match(input)
}

/// Extract every `{...}` parameter from `input`.
///
/// Returns the tokens with their braces, in order of appearance. Fails when
/// the brace structure is unbalanced, nested or empty.
pub fn extract_tokens(input: &str) -> Result<Vec<String>, TemplateError> {
    if !has_matched_braces(input) {
        return Err(TemplateError::MalformedBraces(input.to_string()));
    }
    Ok(TOKEN
        .find_iter(input)
        .map(|m| m.as_str().to_string())
        .collect())
}

/// Iterate token matches with their byte offsets. Callers must check
/// `has_matched_braces` first.
pub(crate) fn token_matches(input: &str) -> impl Iterator<Item = (usize, &str)> {
    TOKEN.find_iter(input).map(|m| (m.start(), m.as_str()))
}
