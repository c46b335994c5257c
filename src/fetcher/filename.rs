//! Filename inference for downloads

use std::sync::LazyLock;

use regex::Regex;
use url::{Url, form_urlencoded};

/// Name used when neither the headers nor the URL offer one
pub const FALLBACK_NAME: &str = "download";

/// Extension appended to extensionless non-HTML downloads
pub const GENERIC_EXTENSION: &str = "bin";

static EXTENDED_FILENAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)filename\*\s*=\s*(?:[a-z0-9_-]+)?'[^']*'([^;]+)"#).ok());

static PLAIN_FILENAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*(?:"([^"]*)"|([^;]+))"#).ok());

/// Replace everything outside `[A-Za-z0-9._-]` with `_`
///
/// Leading dots are dropped so the result can never be `.`, `..` or hidden.
/// Returns `None` when nothing usable remains.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let sanitized: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = sanitized.trim_start_matches('.');

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '_') {
        None
    } else {
        Some(sanitized.to_string())
    }
}

fn percent_decode(value: &str) -> String {
    // Protect '+' so form decoding keeps it literal.
    let protected = value.replace('+', "%2B");
    form_urlencoded::parse(format!("v={}", protected).as_bytes())
        .next()
        .map(|(_, decoded)| decoded.into_owned())
        .unwrap_or_else(|| value.to_string())
}

/// Filename from a `Content-Disposition` header, preferring `filename*`
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let extended = EXTENDED_FILENAME
        .as_ref()
        .and_then(|re| re.captures(header))
        .and_then(|caps| caps.get(1))
        .map(|m| percent_decode(m.as_str().trim().trim_matches('"')));

    let plain = || {
        PLAIN_FILENAME
            .as_ref()
            .and_then(|re| re.captures(header))
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().trim().to_string())
    };

    extended
        .or_else(plain)
        .and_then(|name| sanitize_filename(basename(&name)))
}

/// Filename from the last non-empty path segment of a URL
pub fn url_filename(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .and_then(|segment| sanitize_filename(&percent_decode(segment)))
}

/// Append `.html` or the generic extension when the name has none
pub fn ensure_extension(name: String, content_type: Option<&str>) -> String {
    if extension(&name).is_some() {
        return name;
    }
    let is_html = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false);
    if is_html {
        format!("{}.html", name)
    } else {
        format!("{}.{}", name, GENERIC_EXTENSION)
    }
}

/// Lower-cased extension of a filename, without the dot
pub fn extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}

fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}
