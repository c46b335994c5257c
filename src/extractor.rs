//! # HTML Content Extractor
//!
//! Turns an assignment description (or any downloaded HTML page) into three
//! things: the visible text, the absolute URLs of its hyperlinks, and the
//! identifiers of embedded or linked YouTube videos.
//!
//! Extraction is best effort. Malformed or empty HTML never produces an
//! error, only an empty result.
//!
//! ## Usage
//!
//! ```rust
//! use auto_student::extractor::extract;
//!
//! let html = r#"<p>Read <a href="files/1">this</a> and watch
//!     <a href="https://youtu.be/dQw4w9WgXcQ">that</a>.</p>"#;
//! let extracted = extract(html, "https://example.test/course/");
//!
//! assert_eq!(extracted.links, vec!["https://example.test/course/files/1"]);
//! assert_eq!(extracted.video_ids, vec!["dQw4w9WgXcQ"]);
//! ```

mod content_extraction;
mod video;

pub use content_extraction::{MAIN_CONTENT_SELECTORS, extract};
pub use video::{extract_video_id, is_valid_video_id};

use serde::{Deserialize, Serialize};

/// Result of extracting an HTML document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extracted {
    /// Visible text, one line per text-bearing element
    pub text: String,

    /// Absolute hyperlink URLs in document order, not deduplicated
    pub links: Vec<String>,

    /// Video identifiers in first-seen order, deduplicated
    pub video_ids: Vec<String>,
}
