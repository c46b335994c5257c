//! # auto_student - Assignment Context Gathering for LLMs
//!
//! This crate pulls assignments from a Canvas learning-management system,
//! gathers everything an assignment points at (linked files, embedded
//! YouTube videos) and turns it into one prompt for a completion model.
//!
//! ## Pipeline
//!
//! - [`lms`]: list courses and assignments
//! - [`extractor`]: description HTML to text, links and video ids
//! - [`fetcher`]: bounded downloads into a scratch directory
//! - [`reader`]: downloaded files to text or placeholders
//! - [`transcript`]: video ids to caption text
//! - [`prompt`]: assignment plus gathered content to prompt text
//! - [`solver`]: runs the above concurrently and calls the model
//!
//! Front-ends track progress with [`progress`] and drive their screens
//! with the pure state machine in [`session`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use auto_student::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let settings = Settings::from_env()?;
//!     let solver = AssignmentSolver::from_settings(settings)?;
//!
//!     let assignments = solver.fetch_all_assignments().await;
//!     if let Some(assignment) = assignments.first() {
//!         let result = solver.generate_solution(assignment).await?;
//!         println!("{}", result.answer);
//!     }
//!     Ok(())
//! }
//! ```

mod error;

pub mod assignment;
pub mod extractor;
pub mod fetcher;
pub mod lms;
pub mod model;
pub mod progress;
pub mod prompt;
pub mod reader;
pub mod session;
pub mod settings;
pub mod solver;
pub mod transcript;

pub use error::{Error, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::assignment::Assignment;
    pub use crate::error::Error;
    pub use crate::error::Result;
    pub use crate::progress::{Phase, ProgressEvent, ProgressTracker};
    pub use crate::session::{SessionEvent, SessionState, View, transition};
    pub use crate::settings::Settings;
    pub use crate::solver::{AssignmentSolver, SolutionResult};
}
