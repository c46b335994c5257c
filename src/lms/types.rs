//! Wire types of the Canvas REST API
//!
//! Only the fields this crate reads are modelled; unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// A course the user is enrolled in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: u64,

    /// Absent for courses the user can no longer access
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub course_code: Option<String>,
}

/// A file attached to an assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasAttachment {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub url: String,
}

/// An assignment as returned by `/courses/:id/assignments`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasAssignment {
    pub id: u64,
    pub name: String,

    /// HTML; `null` when the instructor left it empty
    #[serde(default)]
    pub description: Option<String>,

    /// RFC 3339 timestamp
    #[serde(default)]
    pub due_at: Option<String>,

    #[serde(default)]
    pub html_url: Option<String>,

    #[serde(default)]
    pub attachments: Vec<CanvasAttachment>,
}

/// The authenticated user, used to check connectivity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}
