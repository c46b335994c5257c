//! # Session State
//!
//! What an interactive front-end shows and what the user has picked so far,
//! as one value. Handlers never mutate it in place: every input is a
//! [`SessionEvent`] and [`transition`] returns the next state.
//!
//! ```text
//! Loading ──CoursesLoaded──▶ Selection ──CourseSelected──▶ LoadingAssignments
//!    ▲                          ▲  │                              │
//!    └──────── Refresh ─────────┤  └─ProcessRequested─▶ Reflection ◀─┘ AssignmentsLoaded
//!                               │                          │
//!                     Failed / BackToSelection      ReflectionDone
//!                               │                          ▼
//!                            Results ◀──Completed──── Processing
//! ```
//!
//! `Cancel` is accepted everywhere and changes nothing; in-flight work is
//! never interrupted.

use crate::assignment::Assignment;
use crate::lms::Course;
use crate::progress::{ProgressEvent, ProgressTracker};
use crate::solver::SolutionResult;

/// The screen being shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Connecting and fetching courses
    Loading,
    /// Picking a course and an assignment
    Selection,
    LoadingAssignments,
    /// Answering reflective questions before processing
    Reflection,
    Processing,
    Results,
}

/// Everything a front-end needs to render
#[derive(Debug, Clone)]
pub struct SessionState {
    pub view: View,
    /// One-line description of what is happening
    pub activity: String,
    pub courses: Vec<Course>,
    pub selected_course: Option<Course>,
    pub assignments: Vec<Assignment>,
    pub selected_assignment: Option<Assignment>,
    pub reflection_questions: Vec<String>,
    pub current_question: usize,
    pub progress: ProgressTracker,
    pub result: Option<SolutionResult>,
    /// Last error shown to the user
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            view: View::Loading,
            activity: "Initializing...".to_string(),
            courses: Vec::new(),
            selected_course: None,
            assignments: Vec::new(),
            selected_assignment: None,
            reflection_questions: Vec::new(),
            current_question: 0,
            progress: ProgressTracker::new(),
            result: None,
            error: None,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reflective question currently on screen
    pub fn current_question(&self) -> Option<&str> {
        self.reflection_questions
            .get(self.current_question)
            .map(String::as_str)
    }
}

/// Inputs to the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    CoursesLoaded(Vec<Course>),
    ConnectionFailed(String),
    CourseSelected(Course),
    AssignmentsLoaded {
        course_id: u64,
        assignments: Vec<Assignment>,
    },
    AssignmentSelected(Assignment),
    /// The user asked to solve the selected assignment
    ProcessRequested,
    ReflectionReady(Vec<String>),
    ReflectionFailed(String),
    NextQuestion,
    /// Skip the remaining questions
    ReflectionDone,
    Progress(ProgressEvent),
    Completed(SolutionResult),
    Failed(String),
    BackToSelection,
    Refresh,
    Cancel,
}

/// Next state for `event`; events that make no sense in the current view are ignored
pub fn transition(state: SessionState, event: SessionEvent) -> SessionState {
    use SessionEvent as E;
    use View as V;

    match (state.view, event) {
        (_, E::Cancel) => state,

        (_, E::Refresh) => SessionState {
            activity: "Refreshing courses...".to_string(),
            ..SessionState::default()
        },

        (V::Loading, E::CoursesLoaded(courses)) => {
            let activity = if courses.is_empty() {
                "No courses found".to_string()
            } else {
                format!("Fetched {} courses", courses.len())
            };
            SessionState {
                view: V::Selection,
                activity,
                courses,
                error: None,
                ..state
            }
        }

        (V::Loading, E::ConnectionFailed(error)) => SessionState {
            activity: "Connection failed".to_string(),
            error: Some(error),
            ..state
        },

        (V::Selection, E::CourseSelected(course)) => SessionState {
            view: V::LoadingAssignments,
            activity: format!(
                "Loading assignments for {}...",
                course.name.as_deref().unwrap_or("course")
            ),
            selected_course: Some(course),
            assignments: Vec::new(),
            selected_assignment: None,
            ..state
        },

        (V::LoadingAssignments, E::AssignmentsLoaded { course_id, assignments })
            if state.selected_course.as_ref().map(|c| c.id) == Some(course_id) =>
        {
            SessionState {
                view: V::Selection,
                activity: format!("Loaded {} assignments", assignments.len()),
                assignments,
                ..state
            }
        }

        (V::Selection, E::AssignmentSelected(assignment)) => SessionState {
            selected_assignment: Some(assignment),
            ..state
        },

        (V::Selection, E::ProcessRequested) if state.selected_assignment.is_some() => SessionState {
            view: V::Reflection,
            activity: "Generating reflective questions...".to_string(),
            reflection_questions: Vec::new(),
            current_question: 0,
            progress: ProgressTracker::new(),
            result: None,
            error: None,
            ..state
        },

        (V::Reflection, E::ReflectionReady(questions)) if questions.is_empty() => {
            start_processing(state)
        }
        (V::Reflection, E::ReflectionReady(questions)) => SessionState {
            activity: "Reflect before generating".to_string(),
            reflection_questions: questions,
            current_question: 0,
            ..state
        },

        (V::Reflection, E::ReflectionFailed(error)) => SessionState {
            error: Some(error),
            ..start_processing(state)
        },

        (V::Reflection, E::NextQuestion) => {
            let next = state.current_question + 1;
            if next >= state.reflection_questions.len() {
                start_processing(state)
            } else {
                SessionState {
                    current_question: next,
                    ..state
                }
            }
        }

        (V::Reflection, E::ReflectionDone) => start_processing(state),

        (V::Processing, E::Progress(event)) => {
            let mut progress = state.progress;
            progress.apply(&event);
            SessionState {
                activity: event.message,
                progress,
                ..state
            }
        }

        (V::Processing, E::Completed(result)) => SessionState {
            view: V::Results,
            activity: "Done".to_string(),
            result: Some(result),
            ..state
        },

        (V::Processing, E::Failed(error)) => SessionState {
            view: V::Selection,
            activity: "Processing failed".to_string(),
            error: Some(error),
            ..state
        },

        (V::Results, E::BackToSelection) => SessionState {
            view: V::Selection,
            activity: "Select an assignment".to_string(),
            result: None,
            reflection_questions: Vec::new(),
            current_question: 0,
            ..state
        },

        (_, _) => state,
    }
}

fn start_processing(state: SessionState) -> SessionState {
    SessionState {
        view: View::Processing,
        activity: "Processing assignment...".to_string(),
        progress: ProgressTracker::new(),
        ..state
    }
}
