//! # Settings Module
//!
//! Process-wide configuration loaded once at startup from the environment
//! (a `.env` file in the working directory is honoured). Settings are
//! read-only after loading.
//!
//! | Variable | Default |
//! |---|---|
//! | `OPENAI_API_KEY` | required |
//! | `OPENAI_API_BASE` | `https://api.openai.com/v1` |
//! | `OPENAI_API_MODEL_NAME` | `gpt-4o` |
//! | `CANVAS_API_KEY` | required |
//! | `CANVAS_API_URL` | required |
//! | `COURSE_ID` | required, integer |
//! | `MAX_FILE_SIZE` | `52428800` (50 MiB) |
//! | `DOWNLOAD_TIMEOUT` | `30` seconds |
//! | `DOWNLOADS_DIR` | `downloads` |
//! | `OUTPUT_DIR` | `output` |
//! | `MAX_CONCURRENT_DOWNLOADS` | `8` |
//! | `TRANSCRIPT_LANGUAGES` | `en` |

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::fetcher::FetcherConfig;

pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL_NAME: &str = "gpt-4o";
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 8;

/// Error type for loading settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set or is empty
    #[error("missing required setting {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be used
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Process-wide settings
#[derive(Clone)]
pub struct Settings {
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub model_name: String,
    pub canvas_api_key: String,
    pub canvas_api_url: String,
    pub course_id: u64,
    /// Largest download accepted, in bytes
    pub max_file_size: u64,
    pub download_timeout_secs: u64,
    /// Scratch directory for downloads; may be cleared at any time
    pub downloads_dir: PathBuf,
    /// Where prompt and answer files are written
    pub output_dir: PathBuf,
    pub max_concurrent_downloads: usize,
    /// Caption languages in order of preference
    pub transcript_languages: Vec<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("openai_api_key", &"<redacted>")
            .field("openai_api_base", &self.openai_api_base)
            .field("model_name", &self.model_name)
            .field("canvas_api_key", &"<redacted>")
            .field("canvas_api_url", &self.canvas_api_url)
            .field("course_id", &self.course_id)
            .field("max_file_size", &self.max_file_size)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("downloads_dir", &self.downloads_dir)
            .field("output_dir", &self.output_dir)
            .field("max_concurrent_downloads", &self.max_concurrent_downloads)
            .field("transcript_languages", &self.transcript_languages)
            .finish()
    }
}

impl Settings {
    /// Load settings from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; variables may come from the real environment.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let canvas_api_url = required("CANVAS_API_URL")?;
        url::Url::parse(&canvas_api_url).map_err(|e| ConfigError::Invalid {
            key: "CANVAS_API_URL",
            value: canvas_api_url.clone(),
            reason: e.to_string(),
        })?;

        let transcript_languages = get("TRANSCRIPT_LANGUAGES")
            .map(|v| {
                v.split(',')
                    .map(|lang| lang.trim().to_string())
                    .filter(|lang| !lang.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|langs| !langs.is_empty())
            .unwrap_or_else(|| vec!["en".to_string()]);

        let max_concurrent_downloads = parse_or(
            "MAX_CONCURRENT_DOWNLOADS",
            get("MAX_CONCURRENT_DOWNLOADS"),
            DEFAULT_MAX_CONCURRENT_DOWNLOADS,
        )?;
        if max_concurrent_downloads == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_CONCURRENT_DOWNLOADS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            openai_api_key: required("OPENAI_API_KEY")?,
            openai_api_base: get("OPENAI_API_BASE")
                .unwrap_or_else(|| DEFAULT_OPENAI_API_BASE.to_string()),
            model_name: get("OPENAI_API_MODEL_NAME")
                .unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
            canvas_api_key: required("CANVAS_API_KEY")?,
            canvas_api_url,
            course_id: parse_required("COURSE_ID", required("COURSE_ID")?)?,
            max_file_size: parse_or("MAX_FILE_SIZE", get("MAX_FILE_SIZE"), DEFAULT_MAX_FILE_SIZE)?,
            download_timeout_secs: parse_or(
                "DOWNLOAD_TIMEOUT",
                get("DOWNLOAD_TIMEOUT"),
                DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            )?,
            downloads_dir: get("DOWNLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("downloads")),
            output_dir: get("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("output")),
            max_concurrent_downloads,
            transcript_languages,
        })
    }

    /// Fetcher configuration derived from these settings
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig::builder()
            .max_file_size(self.max_file_size)
            .download_timeout_secs(self.download_timeout_secs)
            .downloads_dir(self.downloads_dir.clone())
            .build()
    }
}

fn parse_required<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value,
        reason: e.to_string(),
    })
}

fn parse_or<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match value {
        Some(value) => parse_required(key, value),
        None => Ok(default),
    }
}
