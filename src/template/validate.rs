//! Static template validation
//!
//! Checks a template field as entered by the user, before any page context
//! exists. Rules run in order and the first failure wins: directory must be
//! absolute, braces must be balanced, every token must be supported for the
//! field, and literal text must stay clear of characters that are unsafe in
//! file and folder names.

use std::sync::LazyLock;

use regex::Regex;

use super::resolver::is_supported_token;
use super::tokenizer::extract_tokens;
use super::{TemplateError, TemplateField};

// Windows-style reserved set plus ASCII control characters. The most
// restrictive target decides what a portable name may contain.
static SAFE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[^<>:"/\\|?*\x00-\x1F]*$"#).expect("pattern is valid")
});

/// True when `input` is non-empty and free of file-system-unsafe characters.
pub fn is_file_system_safe(input: &str) -> bool {
    !input.is_empty() && SAFE_NAME.is_match(input)
}

/// Validate one template field value.
pub fn validate_template_field(input: &str, field: TemplateField) -> Result<(), TemplateError> {
    if field == TemplateField::Directory && !input.starts_with('/') {
        return Err(TemplateError::DirectoryNotAbsolute);
    }

    let tokens = extract_tokens(input)?;
    for token in &tokens {
        if !is_supported_token(token, field) {
            return Err(TemplateError::UnsupportedToken(token.clone()));
        }
        // Tokens are spliced into names verbatim when they resolve, so their
        // literal text has to be safe too.
        if !is_file_system_safe(token) {
            return Err(TemplateError::UnsafeTokenCharacter(token.clone()));
        }
    }

    match field {
        TemplateField::Directory => {
            if input.len() > 1 {
                for segment in input[1..].split('/') {
                    if !is_file_system_safe(segment) {
                        return Err(TemplateError::UnsafeDirectorySegment(segment.to_string()));
                    }
                }
            }
            Ok(())
        }
        TemplateField::FileName => {
            if is_file_system_safe(input) {
                Ok(())
            } else {
                Err(TemplateError::UnsafeName)
            }
        }
        TemplateField::Description => Ok(()),
    }
}
