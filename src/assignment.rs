//! The assignment record the rest of the pipeline works on

use serde::{Deserialize, Serialize};

use crate::extractor;
use crate::lms::{CanvasAssignment, CanvasAttachment};

/// An assignment with its description already extracted
///
/// Built once from the API record and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: u64,
    pub name: String,

    /// RFC 3339 due date, if any
    pub due_at: Option<String>,

    /// Visible text of the HTML description
    pub description: String,

    /// The HTML description as returned by the API
    #[serde(skip_serializing)]
    #[serde(default)]
    pub raw_description: String,

    pub attachments: Vec<CanvasAttachment>,

    /// Description links in document order, then attachment URLs
    #[serde(skip_serializing)]
    #[serde(default)]
    pub links: Vec<String>,

    /// Video identifiers, deduplicated, first-seen order
    #[serde(skip_serializing)]
    #[serde(default)]
    pub video_ids: Vec<String>,
}

impl Assignment {
    /// Build from the API record, resolving description links against `base_url`
    pub fn from_canvas(raw: CanvasAssignment, base_url: &str) -> Self {
        let raw_description = raw.description.unwrap_or_default();
        let extracted = extractor::extract(&raw_description, base_url);

        let mut links = extracted.links;
        links.extend(raw.attachments.iter().map(|attachment| attachment.url.clone()));

        Self {
            id: raw.id,
            name: raw.name,
            due_at: raw.due_at,
            description: extracted.text,
            raw_description,
            attachments: raw.attachments,
            links,
            video_ids: extracted.video_ids,
        }
    }

    /// True when there is at least one link or video to gather
    pub fn has_supplementary_sources(&self) -> bool {
        !self.links.is_empty() || !self.video_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas(description: Option<&str>, attachments: Vec<CanvasAttachment>) -> CanvasAssignment {
        CanvasAssignment {
            id: 12,
            name: "Lab 3".to_string(),
            description: description.map(str::to_string),
            due_at: Some("2024-10-01T06:59:59Z".to_string()),
            html_url: None,
            attachments,
        }
    }

    #[test]
    fn test_from_canvas_extracts_description() {
        let raw = canvas(
            Some(r#"<div class="user_content"><p>Read <a href="/files/5">the notes</a>.</p><iframe src="https://www.youtube.com/embed/dQw4w9WgXcQ"></iframe></div>"#),
            vec![CanvasAttachment {
                filename: "rubric.pdf".to_string(),
                display_name: Some("Rubric.pdf".to_string()),
                url: "https://lms.test/files/6/download".to_string(),
            }],
        );

        let assignment = Assignment::from_canvas(raw, "https://lms.test/");
        assert_eq!(assignment.description, "Read the notes.");
        assert_eq!(
            assignment.links,
            vec!["https://lms.test/files/5", "https://lms.test/files/6/download"]
        );
        assert_eq!(assignment.video_ids, vec!["dQw4w9WgXcQ"]);
        assert!(assignment.has_supplementary_sources());
    }

    #[test]
    fn test_missing_description() {
        let assignment = Assignment::from_canvas(canvas(None, Vec::new()), "https://lms.test/");
        assert_eq!(assignment.description, "");
        assert!(assignment.links.is_empty());
        assert!(!assignment.has_supplementary_sources());
    }

    #[test]
    fn test_serialized_record_shape() {
        let raw = canvas(Some("<p>Hi</p>"), Vec::new());
        let assignment = Assignment::from_canvas(raw, "https://lms.test/");
        let json = serde_json::to_value(&assignment).unwrap();
        assert_eq!(json["id"], 12);
        assert_eq!(json["name"], "Lab 3");
        assert_eq!(json["description"], "Hi");
        assert_eq!(json["due_at"], "2024-10-01T06:59:59Z");
        assert!(json.get("links").is_none());
    }
}
