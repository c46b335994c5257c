//! # LMS Client
//!
//! A thin Canvas REST client: enough to check the token, list the user's
//! courses and list a course's assignments. List endpoints are paginated with
//! `Link: <...>; rel="next"` headers, which are followed up to a fixed page cap.

mod error;
pub mod types;

pub use error::LmsError;
pub use types::{CanvasAssignment, CanvasAttachment, Course, UserProfile};

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, LINK};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Default timeout for API requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Page size requested from list endpoints
const PER_PAGE: u32 = 100;

/// Pages followed before a listing is cut short
const MAX_PAGES: usize = 50;

/// Canvas REST API client
#[derive(Clone)]
pub struct LmsClient {
    client: ReqwestClient,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for LmsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmsClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl LmsClient {
    /// Create a client for the Canvas instance at `base_url`
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, LmsError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = ReqwestClient::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// The instance root, with a trailing slash
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check the token by fetching the current user's profile
    #[instrument(skip(self))]
    pub async fn test_connection(&self) -> Result<UserProfile, LmsError> {
        let url = self.base_url.join("api/v1/users/self")?;
        let (profile, _) = self.get_page(url).await?;
        Ok(profile)
    }

    /// Courses with an active enrollment
    #[instrument(skip(self))]
    pub async fn list_courses(&self) -> Result<Vec<Course>, LmsError> {
        let url = self
            .base_url
            .join(&format!("api/v1/courses?enrollment_state=active&per_page={}", PER_PAGE))?;
        self.get_all(url).await
    }

    /// Every assignment of a course, across all pages
    #[instrument(skip(self))]
    pub async fn list_assignments(
        &self,
        course_id: u64,
    ) -> Result<Vec<CanvasAssignment>, LmsError> {
        let url = self.base_url.join(&format!(
            "api/v1/courses/{}/assignments?per_page={}",
            course_id, PER_PAGE
        ))?;
        self.get_all(url).await
    }

    async fn get_all<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>, LmsError> {
        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next {
            if pages == MAX_PAGES {
                warn!("Stopping after {} pages; listing may be incomplete", MAX_PAGES);
                break;
            }
            let (page, next_url): (Vec<T>, _) = self.get_page(url).await?;
            items.extend(page);
            next = next_url;
            pages += 1;
        }

        debug!("Fetched {} items over {} pages", items.len(), pages);
        Ok(items)
    }

    /// GET one page and return it with the next page's URL, if any
    async fn get_page<T: DeserializeOwned>(&self, url: Url) -> Result<(T, Option<Url>), LmsError> {
        debug!("Sending GET request to {}", url);
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        let next = next_link(response.headers());
        let response_text = response.text().await?;

        if status.is_success() {
            let body = serde_json::from_str(&response_text).map_err(|e| {
                error!("Failed to parse response: {}", e);
                LmsError::UnexpectedResponse(format!("Failed to parse response: {}", e))
            })?;
            Ok((body, next))
        } else {
            error!("API error: {} - {}", status, response_text);

            if status == StatusCode::UNAUTHORIZED {
                Err(LmsError::Auth("Invalid API token".to_string()))
            } else {
                Err(LmsError::Api {
                    status_code: status.as_u16(),
                    message: response_text,
                })
            }
        }
    }
}

/// The `rel="next"` target of a `Link` header
fn next_link(headers: &HeaderMap) -> Option<Url> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|entry| {
            let mut parts = entry.split(';');
            let target = parts.next()?.trim();
            let is_next = parts.any(|param| {
                let param = param.trim().replace(' ', "");
                param == "rel=\"next\"" || param == "rel=next"
            });
            if !is_next {
                return None;
            }
            let target = target.strip_prefix('<')?.strip_suffix('>')?;
            Url::parse(target).ok()
        })
}
