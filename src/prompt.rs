//! # Prompt Assembler
//!
//! Builds the text sent to the completion model from an assignment and the
//! supplementary content gathered for it. Output is a pure function of the
//! inputs.

use crate::assignment::Assignment;

/// Notice used in place of the supplementary section when nothing was gathered
pub const NO_SUPPLEMENTARY_CONTENT: &str =
    "No supplementary content was found for this assignment.";

const BEGIN_SUPPLEMENTARY: &str = "--- BEGIN SUPPLEMENTARY CONTENT ---";
const END_SUPPLEMENTARY: &str = "--- END SUPPLEMENTARY CONTENT ---";

/// System preamble for solution requests; the assembled prompt carries no role of its own
pub const SOLUTION_PREAMBLE: &str = "You are a helpful assistant completing a course assignment. \
     Use the supplementary content where it helps.";

/// System preamble for reflective-question requests
pub const REFLECTION_PREAMBLE: &str = "You are a thoughtful teaching assistant.";

/// Most reflective questions kept from a model answer
pub const MAX_REFLECTIVE_QUESTIONS: usize = 5;

/// Where a part came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Link,
    Video,
}

/// Text gathered from one link or video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplementaryPart {
    /// Source identifier shown to the model
    pub label: String,
    pub text: String,
    pub kind: PartKind,
}

impl SupplementaryPart {
    pub fn link(url: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: url.into(),
            text: text.into(),
            kind: PartKind::Link,
        }
    }

    pub fn video(video_id: &str, text: impl Into<String>) -> Self {
        Self {
            label: format!("YouTube video {}", video_id),
            text: text.into(),
            kind: PartKind::Video,
        }
    }

    fn render(&self) -> String {
        format!("[Content from {}]\n{}", self.label, self.text)
    }
}

/// Assemble the solution prompt
///
/// Link parts come before video parts; within each group the given order is kept.
pub fn assemble(assignment: &Assignment, parts: &[SupplementaryPart]) -> String {
    let mut prompt = format!(
        "Assignment: {}\n\n\
         [Assignment Description]\n{}\n\n",
        assignment.name,
        description_or_none(assignment)
    );

    if parts.is_empty() {
        prompt.push_str(NO_SUPPLEMENTARY_CONTENT);
    } else {
        let rendered = parts
            .iter()
            .filter(|part| part.kind == PartKind::Link)
            .chain(parts.iter().filter(|part| part.kind == PartKind::Video))
            .map(SupplementaryPart::render)
            .collect::<Vec<_>>()
            .join("\n\n");
        prompt.push_str(BEGIN_SUPPLEMENTARY);
        prompt.push('\n');
        prompt.push_str(&rendered);
        prompt.push('\n');
        prompt.push_str(END_SUPPLEMENTARY);
    }

    prompt.push_str("\n\nPlease provide the best possible answer to this assignment.");
    prompt
}

/// Prompt asking for short questions that make the student reflect before solving
pub fn reflection_prompt(course_name: &str, assignment: &Assignment) -> String {
    format!(
        "Course: {}\n\
         A student is about to work on the assignment \"{}\".\n\n\
         [Assignment Description]\n{}\n\n\
         Write {} short reflective questions that help the student think about \
         what the assignment asks, what they already know and how they will approach it. \
         Put each question on its own line with no other text.",
        course_name,
        assignment.name,
        description_or_none(assignment),
        MAX_REFLECTIVE_QUESTIONS
    )
}

/// Questions from a model answer: non-empty lines without list markers, at most five
pub fn parse_questions(answer: &str) -> Vec<String> {
    answer
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty())
        .take(MAX_REFLECTIVE_QUESTIONS)
        .map(str::to_string)
        .collect()
}

fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return rest.trim_start();
        }
    }
    line
}

fn description_or_none(assignment: &Assignment) -> &str {
    if assignment.description.trim().is_empty() {
        "(no description provided)"
    } else {
        &assignment.description
    }
}
