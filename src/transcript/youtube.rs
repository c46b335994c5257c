//! YouTube caption provider
//!
//! Scrapes the watch page for the player's caption track list, picks a track
//! by language preference and downloads its timed-text XML. Runs on the
//! blocking pool, so it uses the blocking HTTP client.

use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::Event;
use regex::Regex;
use reqwest::blocking::Client as BlockingClient;
use reqwest::header::ACCEPT_LANGUAGE;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{TranscriptError, TranscriptFragment, TranscriptProvider};

const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
const CAPTIONS_MARKER: &str = "\"captions\":";
const CAPTIONS_END_MARKER: &str = ",\"videoDetails";

static TAGS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]*>").ok());

#[derive(Debug, Deserialize)]
struct Captions {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    track_list: Option<TrackList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackList {
    caption_tracks: Option<Vec<CaptionTrack>>,
}

/// One caption track advertised by the player
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `asr` for auto-generated tracks
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

/// Fetches captions from YouTube
#[derive(Debug, Clone)]
pub struct YouTubeTranscriptProvider {
    base_url: String,
    languages: Vec<String>,
}

impl YouTubeTranscriptProvider {
    /// Create a provider preferring `languages` in order; empty means `en`
    pub fn new(languages: Vec<String>) -> Self {
        let languages = if languages.is_empty() {
            vec!["en".to_string()]
        } else {
            languages
        };
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            languages,
        }
    }

    /// Point the provider at a different host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn watch_url(&self, video_id: &str) -> String {
        format!("{}/watch?v={}", self.base_url, video_id)
    }

    fn absolute(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

impl TranscriptProvider for YouTubeTranscriptProvider {
    #[instrument(skip(self))]
    fn fetch(&self, video_id: &str) -> Result<Vec<TranscriptFragment>, TranscriptError> {
        // Built per call: the blocking client must not be created or dropped on an async worker.
        let client = BlockingClient::builder().build()?;

        let page = client
            .get(self.watch_url(video_id))
            .header(ACCEPT_LANGUAGE, "en-US")
            .send()?
            .error_for_status()?
            .text()?;

        let tracks = caption_tracks(&page, video_id)?;
        let track = select_track(&tracks, &self.languages)
            .ok_or_else(|| TranscriptError::NoTranscriptFound(video_id.to_string()))?;
        debug!(
            "Using {} caption track {} for {}",
            if track.is_generated() { "generated" } else { "manual" },
            track.language_code,
            video_id
        );

        let xml = client
            .get(self.absolute(&track.base_url))
            .send()?
            .error_for_status()?
            .text()?;

        parse_timed_text(&xml)
    }
}

/// Caption tracks advertised in a watch page
pub fn caption_tracks(page: &str, video_id: &str) -> Result<Vec<CaptionTrack>, TranscriptError> {
    let Some(start) = page.find(CAPTIONS_MARKER) else {
        if page.contains("class=\"g-recaptcha\"") {
            return Err(TranscriptError::Other(
                "too many requests; YouTube is asking for a captcha".to_string(),
            ));
        }
        if !page.contains("\"playabilityStatus\":") {
            return Err(TranscriptError::VideoUnavailable(video_id.to_string()));
        }
        return Err(TranscriptError::TranscriptsDisabled(video_id.to_string()));
    };

    let json = &page[start + CAPTIONS_MARKER.len()..];
    let json = match json.find(CAPTIONS_END_MARKER) {
        Some(end) => &json[..end],
        None => return Err(TranscriptError::Parse("unterminated captions block".to_string())),
    };

    let captions: Captions = serde_json::from_str(json.replace("\n", "").as_str())?;
    let track_list = captions
        .track_list
        .ok_or_else(|| TranscriptError::TranscriptsDisabled(video_id.to_string()))?;
    track_list
        .caption_tracks
        .filter(|tracks| !tracks.is_empty())
        .ok_or_else(|| TranscriptError::NoTranscriptFound(video_id.to_string()))
}

/// First track matching the preferred languages, manual tracks before generated ones
pub fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    languages: &[String],
) -> Option<&'a CaptionTrack> {
    languages.iter().find_map(|language| {
        let matching = || tracks.iter().filter(move |t| &t.language_code == language);
        matching()
            .find(|t| !t.is_generated())
            .or_else(|| matching().find(|t| t.is_generated()))
    })
}

/// Parse YouTube timed-text XML into fragments
///
/// Fragment text is entity-escaped twice by YouTube and may carry inline
/// formatting tags; both are removed.
pub fn parse_timed_text(xml: &str) -> Result<Vec<TranscriptFragment>, TranscriptError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fragments = Vec::new();
    let mut current: Option<TranscriptFragment> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"text" => {
                let mut fragment = TranscriptFragment::default();
                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value()?;
                    match attr.key.as_ref() {
                        b"start" => fragment.start = value.parse().unwrap_or_default(),
                        b"dur" => fragment.duration = value.parse().unwrap_or_default(),
                        _ => {}
                    }
                }
                current = Some(fragment);
            }
            Event::Text(t) => {
                if let Some(fragment) = current.as_mut() {
                    if !fragment.text.is_empty() {
                        fragment.text.push(' ');
                    }
                    fragment.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(fragment) = current.as_mut() {
                    fragment.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) if e.name().as_ref() == b"text" => {
                if let Some(mut fragment) = current.take() {
                    fragment.text = clean_fragment(&fragment.text);
                    if !fragment.text.is_empty() {
                        fragments.push(fragment);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(fragments)
}

fn clean_fragment(text: &str) -> String {
    let unescaped = unescape(text).unwrap_or(Cow::Borrowed(text));
    let stripped = match TAGS.as_ref() {
        Some(re) => re.replace_all(&unescaped, "").into_owned(),
        None => unescaped.into_owned(),
    };
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
