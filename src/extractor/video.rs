//! YouTube video identifier detection

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// URL shapes that carry a video identifier, tried in order; the first match wins.
static VIDEO_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // https://www.youtube.com/watch?v=ID&t=10
        r"(?i)^(?:https?:)?//(?:[a-z0-9-]+\.)*youtube(?:-nocookie)?\.com/watch/?\?(?:[^#]*&)?v=([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        // https://youtu.be/ID
        r"(?i)^(?:https?:)?//(?:www\.)?youtu\.be/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
        // https://www.youtube.com/embed/ID, /v/ID, /shorts/ID, /live/ID
        r"(?i)^(?:https?:)?//(?:[a-z0-9-]+\.)*youtube(?:-nocookie)?\.com/(?:embed|v|shorts|live)/([A-Za-z0-9_-]{11})(?:[^A-Za-z0-9_-]|$)",
    ]
    .into_iter()
    .filter_map(|pattern| match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!("Invalid video pattern {}: {}", pattern, e);
            None
        }
    })
    .collect()
});

/// Check that a string is exactly 11 characters of `[A-Za-z0-9_-]`
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == 11
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Extract a YouTube video identifier from a URL
///
/// Recognises the watch-query form, the short-link form, embed paths, and
/// redirect/proxy URLs whose query string carries one of those URLs
/// (percent-encoded), such as LMS external-tool launch links.
pub fn extract_video_id(url: &str) -> Option<String> {
    let url = url.trim();
    if let Some(id) = match_direct(url) {
        return Some(id);
    }

    // Proxy form: look one level into the query string.
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find_map(|(_, value)| match_direct(value.trim()))
}

fn match_direct(url: &str) -> Option<String> {
    VIDEO_PATTERNS.iter().find_map(|re| {
        re.captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    })
}
