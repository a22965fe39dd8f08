//! Template parameter resolution
//!
//! Maps one extracted `{...}` token to its replacement using the source page
//! URL, the page title and the current time. Timestamp parameters take a
//! day.js style format pattern (`YYYY`, `MM`, `DD`, `HH`, `mm`, `ss`, ...).

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use url::Url;

use super::tokenizer;
use super::{TemplateError, TemplateField};

/// Timestamp format used for `{now}` and default file names.
pub const NOW_FORMAT: &str = "YYYYMMDDHHmmss";
/// Date format used for `{today}`.
pub const TODAY_FORMAT: &str = "YYYYMMDD";

/// Page context a template is resolved against.
pub struct ResolveContext<'a> {
    pub page_url: &'a Url,
    pub page_title: &'a str,
    pub now: DateTime<Local>,
}

/// Resolve a single `{...}` token, braces included.
pub fn resolve_token(
    token: &str,
    field: TemplateField,
    ctx: &ResolveContext,
) -> Result<String, TemplateError> {
    match token {
        "{host}" => Ok(host_with_port(ctx.page_url)),
        "{title}" => Ok(ctx.page_title.to_string()),
        "{url}" if field == TemplateField::Description => Ok(ctx.page_url.as_str().to_string()),
        "{now}" => Ok(format_timestamp(&ctx.now, NOW_FORMAT)),
        "{today}" => Ok(format_timestamp(&ctx.now, TODAY_FORMAT)),
        _ => {
            if let Some(fmt) = token_arg(token, "{now-") {
                if fmt.is_empty() {
                    return Err(TemplateError::UnsupportedToken(token.to_string()));
                }
                Ok(format_timestamp(&ctx.now, fmt))
            } else if let Some(raw) = token_arg(token, "{path-") {
                path_segment(ctx.page_url, raw)
            } else if let Some(key) = token_arg(token, "{query-") {
                query_value(ctx.page_url, key)
            } else {
                Err(TemplateError::UnsupportedToken(token.to_string()))
            }
        }
    }
}

/// Replace every `{...}` token in `text`.
///
/// Replacement values are not rescanned, so a page title containing literal
/// brace text cannot inject further parameters. The first failing token
/// aborts the whole substitution.
pub fn resolve_template(
    text: &str,
    field: TemplateField,
    ctx: &ResolveContext,
) -> Result<String, TemplateError> {
    if !tokenizer::has_matched_braces(text) {
        return Err(TemplateError::MalformedBraces(text.to_string()));
    }
    let mut out = String::new();
    let mut tail_start = 0;
    for (start, token) in tokenizer::token_matches(text) {
        out.push_str(&text[tail_start..start]);
        out.push_str(&resolve_token(token, field, ctx)?);
        tail_start = start + token.len();
    }
    out.push_str(&text[tail_start..]);
    Ok(out)
}

/// Check whether a token is one of the recognized parameter forms for the
/// given field. Used by static validation, which must accept exactly the
/// tokens `resolve_token` can handle.
pub(crate) fn is_supported_token(token: &str, field: TemplateField) -> bool {
    match token {
        "{host}" | "{title}" | "{now}" | "{today}" => true,
        "{url}" => field == TemplateField::Description,
        _ => {
            if let Some(fmt) = token_arg(token, "{now-") {
                !fmt.is_empty()
            } else if let Some(raw) = token_arg(token, "{path-") {
                raw.parse::<usize>().is_ok_and(|n| n > 0)
            } else if let Some(key) = token_arg(token, "{query-") {
                !key.is_empty()
            } else {
                false
            }
        }
    }
}

/// URL host including a non-default port, e.g. `example.com:8443`.
pub(crate) fn host_with_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

fn token_arg<'a>(token: &'a str, prefix: &str) -> Option<&'a str> {
    token.strip_prefix(prefix)?.strip_suffix('}')
}

fn path_segment(url: &Url, raw: &str) -> Result<String, TemplateError> {
    let path = url.path();
    if path.len() <= 1 {
        return Err(TemplateError::PathTooShort);
    }
    let index: usize = raw
        .parse()
        .map_err(|_| TemplateError::BadPathIndex(raw.to_string()))?;
    // Segment 0 is the empty run before the leading slash, so user-facing
    // indexes are 1-based.
    let segments: Vec<&str> = path.split('/').collect();
    if index == 0 || index >= segments.len() {
        return Err(TemplateError::PathOutOfRange(index));
    }
    Ok(segments[index].to_string())
}

fn query_value(url: &Url, key: &str) -> Result<String, TemplateError> {
    url.query_pairs()
        .find(|(k, _)| k.as_ref() == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TemplateError::QueryParamNotFound(key.to_string()))
}

// Ordered longest-first within each letter family, so "MMM" matches ahead
// of "MM" + "M".
const FORMAT_TOKENS: &[&str] = &[
    "YYYY", "MMMM", "MMM", "SSS", "YY", "MM", "DD", "HH", "hh", "mm", "ss", "M", "D", "H", "h",
    "m", "s", "A", "a",
];

const MONTH_NAMES: &[&str] = &[
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Format a timestamp with a day.js style pattern.
///
/// Supported tokens: `YYYY` `YY` `MMMM` `MMM` `MM` `M` `DD` `D` `HH` `H`
/// `hh` `h` `mm` `m` `ss` `s` `SSS` `A` `a`. The longest token wins at each
/// position; any other character passes through unchanged.
pub fn format_timestamp<Tz: TimeZone>(dt: &DateTime<Tz>, pattern: &str) -> String {
    let mut out = String::new();
    let mut rest = pattern;
    'scan: while !rest.is_empty() {
        for token in FORMAT_TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                push_format_value(&mut out, dt, token);
                rest = tail;
                continue 'scan;
            }
        }
        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            out.push(ch);
        }
        rest = chars.as_str();
    }
    out
}

fn push_format_value<Tz: TimeZone>(out: &mut String, dt: &DateTime<Tz>, token: &str) {
    use std::fmt::Write;
    let _ = match token {
        "YYYY" => write!(out, "{:04}", dt.year()),
        "YY" => write!(out, "{:02}", dt.year().rem_euclid(100)),
        "MMMM" => write!(out, "{}", MONTH_NAMES[dt.month0() as usize]),
        "MMM" => write!(out, "{}", &MONTH_NAMES[dt.month0() as usize][..3]),
        "MM" => write!(out, "{:02}", dt.month()),
        "M" => write!(out, "{}", dt.month()),
        "DD" => write!(out, "{:02}", dt.day()),
        "D" => write!(out, "{}", dt.day()),
        "HH" => write!(out, "{:02}", dt.hour()),
        "H" => write!(out, "{}", dt.hour()),
        "hh" => write!(out, "{:02}", dt.hour12().1),
        "h" => write!(out, "{}", dt.hour12().1),
        "mm" => write!(out, "{:02}", dt.minute()),
        "m" => write!(out, "{}", dt.minute()),
        "ss" => write!(out, "{:02}", dt.second()),
        "s" => write!(out, "{}", dt.second()),
        "SSS" => write!(out, "{:03}", dt.timestamp_subsec_millis()),
        "A" => write!(out, "{}", if dt.hour12().0 { "PM" } else { "AM" }),
        "a" => write!(out, "{}", if dt.hour12().0 { "pm" } else { "am" }),
        _ => Ok(()),
    };
}
