//! # Assignment Solver
//!
//! Drives the whole workflow for one course: list assignments, then for a
//! chosen assignment download every linked file and fetch every video
//! transcript concurrently, assemble the prompt and ask the completion model.
//!
//! ## Concurrency
//!
//! All link and video tasks of one assignment are spawned up front and
//! awaited together with `join_all`. A semaphore with
//! `max_concurrent_downloads` permits bounds how many run at once. A failed
//! task never fails the run; it contributes placeholder text instead.
//!
//! ## Errors
//!
//! Only connectivity failures (LMS or completion model) and failures to
//! write the output files surface as `Err`.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future;
use rig::agent::AgentBuilder;
use rig::completion::{CompletionModel, Prompt};
use rig::providers::openai;
use serde::Serialize;
use tokio::fs;
use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::assignment::Assignment;
use crate::error::{Error, Result};
use crate::fetcher::Fetcher;
use crate::fetcher::filename::sanitize_filename;
use crate::lms::{Course, LmsClient, UserProfile};
use crate::model::{self, ratelimited_completion::RateLimitedCompletionModel};
use crate::progress::{Phase, ProgressEvent};
use crate::prompt::{self, REFLECTION_PREAMBLE, SOLUTION_PREAMBLE, SupplementaryPart};
use crate::reader;
use crate::settings::Settings;
use crate::transcript::TranscriptFetcher;

/// Outcome of solving one assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolutionResult {
    pub assignment_id: u64,
    pub assignment_name: String,
    pub prompt: String,
    pub answer: String,
    pub prompt_file: PathBuf,
    pub answer_file: PathBuf,
}

/// The default solver: OpenAI-compatible model behind a rate limiter
pub type OpenAiSolver = AssignmentSolver<RateLimitedCompletionModel<openai::CompletionModel>>;

/// Orchestrates LMS access, downloads, transcripts and the completion model
///
/// Owns its HTTP clients; they are released when the solver is dropped.
pub struct AssignmentSolver<M>
where
    M: CompletionModel,
{
    settings: Settings,
    lms: LmsClient,
    fetcher: Fetcher,
    transcripts: TranscriptFetcher,
    model: M,
    progress: Option<mpsc::Sender<ProgressEvent>>,
}

impl OpenAiSolver {
    /// Build every client from settings, with YouTube transcripts
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let client = model::Client::from_settings(&settings);
        let transcripts = TranscriptFetcher::youtube(settings.transcript_languages.clone());
        Self::new(settings, client.completion().clone(), transcripts)
    }
}

impl<M> AssignmentSolver<M>
where
    M: CompletionModel + 'static,
{
    pub fn new(settings: Settings, model: M, transcripts: TranscriptFetcher) -> Result<Self> {
        let lms = LmsClient::new(&settings.canvas_api_url, settings.canvas_api_key.clone())?;
        let fetcher = Fetcher::new(settings.fetcher_config())?;
        Ok(Self {
            settings,
            lms,
            fetcher,
            transcripts,
            model,
            progress: None,
        })
    }

    /// Send progress events to `sender` during [`generate_solution`](Self::generate_solution)
    pub fn with_progress(mut self, sender: mpsc::Sender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Check the LMS token
    pub async fn test_connection(&self) -> Result<UserProfile> {
        Ok(self.lms.test_connection().await?)
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        Ok(self.lms.list_courses().await?)
    }

    /// Assignments of the configured course; an LMS failure is logged and gives an empty list
    #[instrument(skip(self))]
    pub async fn fetch_all_assignments(&self) -> Vec<Assignment> {
        match self.fetch_assignments(self.settings.course_id).await {
            Ok(assignments) => assignments,
            Err(e) => {
                error!("Failed to fetch assignments for course {}: {}", self.settings.course_id, e);
                Vec::new()
            }
        }
    }

    /// Assignments of any course, with descriptions extracted
    #[instrument(skip(self))]
    pub async fn fetch_assignments(&self, course_id: u64) -> Result<Vec<Assignment>> {
        let raw = self.lms.list_assignments(course_id).await?;
        let base_url = self.lms.base_url().as_str();
        let assignments: Vec<_> = raw
            .into_iter()
            .map(|raw| Assignment::from_canvas(raw, base_url))
            .collect();
        info!("Fetched {} assignments for course {}", assignments.len(), course_id);
        Ok(assignments)
    }

    /// Gather supplementary content, build the prompt and ask the model
    ///
    /// The prompt and answer are also written to the output directory.
    #[instrument(skip(self, assignment), fields(assignment_id = assignment.id))]
    pub async fn generate_solution(&self, assignment: &Assignment) -> Result<SolutionResult> {
        self.emit(ProgressEvent::new(
            Phase::Initialization,
            1,
            1,
            format!("Preparing {}", assignment.name),
        ))
        .await;

        let parts = self.gather_parts(assignment).await;

        self.emit(ProgressEvent::new(Phase::Processing, 0, 1, "Assembling prompt")).await;
        let prompt = prompt::assemble(assignment, &parts);
        debug!("Assembled prompt of {} bytes from {} parts", prompt.len(), parts.len());
        self.emit(ProgressEvent::new(Phase::Processing, 1, 1, "Prompt assembled")).await;

        self.emit(ProgressEvent::new(Phase::AiGeneration, 0, 1, "Waiting for the model")).await;
        let answer = self.complete(SOLUTION_PREAMBLE, &prompt).await?;
        self.emit(ProgressEvent::new(Phase::AiGeneration, 1, 1, "Answer received")).await;

        let (prompt_file, answer_file) = self.persist(assignment, &prompt, &answer).await?;
        info!("Wrote {} and {}", prompt_file.display(), answer_file.display());

        Ok(SolutionResult {
            assignment_id: assignment.id,
            assignment_name: assignment.name.clone(),
            prompt,
            answer,
            prompt_file,
            answer_file,
        })
    }

    /// Up to five short questions for the student to consider before solving
    #[instrument(skip(self, assignment), fields(assignment_id = assignment.id))]
    pub async fn generate_reflective_questions(
        &self,
        course_name: &str,
        assignment: &Assignment,
    ) -> Result<Vec<String>> {
        let prompt = prompt::reflection_prompt(course_name, assignment);
        let answer = self.complete(REFLECTION_PREAMBLE, &prompt).await?;
        Ok(prompt::parse_questions(&answer))
    }

    /// Content for every link and video of `assignment`, links first, each group in order
    pub async fn gather_parts(&self, assignment: &Assignment) -> Vec<SupplementaryPart> {
        let total = assignment.links.len() + assignment.video_ids.len();
        self.emit(ProgressEvent::new(
            Phase::Downloading,
            0,
            total,
            format!("Fetching {} linked resources", total),
        ))
        .await;

        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrent_downloads));
        let completed = Arc::new(AtomicUsize::new(0));

        let link_tasks = assignment.links.iter().map(|url| {
            let permit = semaphore.clone().acquire_owned();
            let fetcher = self.fetcher.clone();
            let url = url.clone();
            let tracker = self.task_tracker(&completed, total);
            tokio::spawn(async move {
                let _permit = permit.await;
                let part = read_link(&fetcher, &url).await;
                tracker.finished(&format!("Read {}", url)).await;
                part
            })
        });

        let video_tasks = assignment.video_ids.iter().map(|video_id| {
            let permit = semaphore.clone().acquire_owned();
            let transcripts = self.transcripts.clone();
            let video_id = video_id.clone();
            let tracker = self.task_tracker(&completed, total);
            tokio::spawn(async move {
                let _permit = permit.await;
                let text = transcripts.transcript(&video_id).await;
                tracker.finished(&format!("Transcribed video {}", video_id)).await;
                SupplementaryPart::video(&video_id, text)
            })
        });

        let labels: Vec<_> = assignment
            .links
            .iter()
            .map(|url| SupplementaryPart::link(url.clone(), String::new()))
            .chain(
                assignment
                    .video_ids
                    .iter()
                    .map(|id| SupplementaryPart::video(id, String::new())),
            )
            .collect();

        let tasks: Vec<_> = link_tasks.chain(video_tasks).collect();
        let results = future::join_all(tasks).await;

        results
            .into_iter()
            .zip(labels)
            .map(|(result, mut fallback)| match result {
                Ok(part) => part,
                Err(e) => {
                    warn!("Task for {} failed: {}", fallback.label, e);
                    fallback.text = format!("[Error processing {}: {}]", fallback.label, e);
                    fallback
                }
            })
            .collect()
    }

    async fn complete(&self, preamble: &str, prompt: &str) -> Result<String> {
        let agent = AgentBuilder::new(self.model.clone()).preamble(preamble).build();
        agent.prompt(prompt.to_string()).await.map_err(|e| {
            error!("Completion failed: {}", e);
            Error::Completion(e.to_string())
        })
    }

    async fn persist(
        &self,
        assignment: &Assignment,
        prompt: &str,
        answer: &str,
    ) -> Result<(PathBuf, PathBuf)> {
        let dir = &self.settings.output_dir;
        fs::create_dir_all(dir).await?;

        let stem = format!(
            "{}_{}",
            assignment.id,
            sanitize_filename(&assignment.name).unwrap_or_else(|| "assignment".to_string())
        );
        let prompt_file = dir.join(format!("{}_prompt.txt", stem));
        let answer_file = dir.join(format!("{}_answer.md", stem));

        fs::write(&prompt_file, prompt).await?;
        fs::write(&answer_file, answer).await?;
        Ok((prompt_file, answer_file))
    }

    async fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.progress {
            if sender.send(event).await.is_err() {
                debug!("Progress receiver dropped");
            }
        }
    }

    fn task_tracker(&self, completed: &Arc<AtomicUsize>, total: usize) -> TaskTracker {
        TaskTracker {
            sender: self.progress.clone(),
            completed: Arc::clone(completed),
            total,
        }
    }
}

/// Reports finished download/transcript tasks
struct TaskTracker {
    sender: Option<mpsc::Sender<ProgressEvent>>,
    completed: Arc<AtomicUsize>,
    total: usize,
}

impl TaskTracker {
    async fn finished(&self, message: &str) {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(sender) = &self.sender {
            let event = ProgressEvent::new(Phase::Downloading, done, self.total, message);
            if sender.send(event).await.is_err() {
                debug!("Progress receiver dropped");
            }
        }
    }
}

/// Download, read and delete one linked resource
async fn read_link(fetcher: &Fetcher, url: &str) -> SupplementaryPart {
    match fetcher.fetch(url).await {
        Some(artifact) => {
            let text = reader::read_file(&artifact.path, &artifact.source_url).await;
            artifact.remove().await;
            SupplementaryPart::link(url, text)
        }
        None => SupplementaryPart::link(url, format!("[Could not download {}]", url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::mock_model::MockCompletionModel;
    use crate::prompt::NO_SUPPLEMENTARY_CONTENT;
    use crate::transcript::{TranscriptError, TranscriptFragment, TranscriptProvider};
    use mockito::{Matcher, Server, ServerGuard};
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct StubTranscripts;

    impl TranscriptProvider for StubTranscripts {
        fn fetch(
            &self,
            video_id: &str,
        ) -> std::result::Result<Vec<TranscriptFragment>, TranscriptError> {
            Ok(vec![TranscriptFragment {
                text: format!("spoken words of {}", video_id),
                start: 0.0,
                duration: 1.0,
            }])
        }
    }

    fn settings(server: &ServerGuard, scratch: &TempDir) -> Settings {
        let vars: HashMap<&str, String> = HashMap::from([
            ("OPENAI_API_KEY", "sk-test".to_string()),
            ("CANVAS_API_KEY", "canvas-token".to_string()),
            ("CANVAS_API_URL", server.url()),
            ("COURSE_ID", "42".to_string()),
            ("MAX_FILE_SIZE", "4096".to_string()),
            ("DOWNLOAD_TIMEOUT", "5".to_string()),
            ("DOWNLOADS_DIR", scratch.path().join("downloads").display().to_string()),
            ("OUTPUT_DIR", scratch.path().join("output").display().to_string()),
            ("MAX_CONCURRENT_DOWNLOADS", "2".to_string()),
        ]);
        Settings::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    async fn solver(
        server: &ServerGuard,
        scratch: &TempDir,
        answer: &str,
    ) -> AssignmentSolver<MockCompletionModel> {
        let model = MockCompletionModel::new();
        model.set_text_response(answer).await;
        let transcripts = TranscriptFetcher::new(Arc::new(StubTranscripts));
        AssignmentSolver::new(settings(server, scratch), model, transcripts).unwrap()
    }

    async fn mock_assignments(server: &mut ServerGuard, body: &str) -> mockito::Mock {
        server
            .mock("GET", "/api/v1/courses/42/assignments")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_linked_pdf_becomes_placeholder_part() {
        let mut server = Server::new_async().await;
        let _assignments = mock_assignments(
            &mut server,
            r#"[{"id": 1, "name": "Reading response", "description": "<p>See <a href=\"a.pdf\">here</a></p>"}]"#,
        )
        .await;
        let pdf = server
            .mock("GET", "/a.pdf")
            .with_status(200)
            .with_header("content-type", "application/pdf")
            .with_body("%PDF-1.4 fake")
            .expect(1)
            .create_async()
            .await;

        let scratch = TempDir::new().unwrap();
        let solver = solver(&server, &scratch, "The answer.").await;

        let assignments = solver.fetch_all_assignments().await;
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].links, vec![format!("{}/a.pdf", server.url())]);

        let parts = solver.gather_parts(&assignments[0]).await;
        assert_eq!(parts.len(), 1);
        assert!(parts[0].label.ends_with("a.pdf"));
        assert_eq!(
            parts[0].text,
            "[PDF file 'a.pdf': content extraction for PDF files is not implemented]"
        );

        // Artifacts are deleted once read.
        let leftovers = std::fs::read_dir(scratch.path().join("downloads")).unwrap().count();
        assert_eq!(leftovers, 0);

        pdf.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_solution_persists_prompt_and_answer() {
        let mut server = Server::new_async().await;
        let _notes = server
            .mock("GET", "/notes.txt")
            .with_status(200)
            .with_body("chapter one notes")
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/gone.txt")
            .with_status(404)
            .create_async()
            .await;

        let scratch = TempDir::new().unwrap();
        let solver = solver(&server, &scratch, "Final essay text").await;
        let (sender, mut receiver) = mpsc::channel(64);
        let solver = solver.with_progress(sender);

        let assignment = Assignment {
            id: 9,
            name: "Essay #2".to_string(),
            due_at: None,
            description: "Discuss the notes.".to_string(),
            raw_description: String::new(),
            attachments: Vec::new(),
            links: vec![
                format!("{}/notes.txt", server.url()),
                format!("{}/gone.txt", server.url()),
            ],
            video_ids: vec!["dQw4w9WgXcQ".to_string()],
        };

        let result = solver.generate_solution(&assignment).await.unwrap();
        assert_eq!(result.answer, "Final essay text");

        let notes = result.prompt.find("chapter one notes").unwrap();
        let gone = result.prompt.find("[Could not download").unwrap();
        let video = result
            .prompt
            .find("[Content from YouTube video dQw4w9WgXcQ]\nspoken words of dQw4w9WgXcQ")
            .unwrap();
        assert!(notes < gone && gone < video);

        assert_eq!(result.prompt_file, scratch.path().join("output/9_Essay__2_prompt.txt"));
        assert_eq!(std::fs::read_to_string(&result.prompt_file).unwrap(), result.prompt);
        assert_eq!(std::fs::read_to_string(&result.answer_file).unwrap(), "Final essay text");

        drop(solver);
        let mut phases = Vec::new();
        while let Some(event) = receiver.recv().await {
            phases.push(event.phase);
        }
        assert_eq!(phases.first(), Some(&Phase::Initialization));
        assert_eq!(phases.last(), Some(&Phase::AiGeneration));
        assert_eq!(phases.iter().filter(|p| **p == Phase::Downloading).count(), 4);
    }

    #[tokio::test]
    async fn test_no_links_uses_notice() {
        let server = Server::new_async().await;
        let scratch = TempDir::new().unwrap();
        let solver = solver(&server, &scratch, "ok").await;

        let assignment = Assignment {
            id: 2,
            name: "Short answer".to_string(),
            due_at: None,
            description: "Answer briefly.".to_string(),
            raw_description: String::new(),
            attachments: Vec::new(),
            links: Vec::new(),
            video_ids: Vec::new(),
        };

        let result = solver.generate_solution(&assignment).await.unwrap();
        assert!(result.prompt.contains(NO_SUPPLEMENTARY_CONTENT));
    }

    #[tokio::test]
    async fn test_completion_failure_aborts() {
        let server = Server::new_async().await;
        let scratch = TempDir::new().unwrap();
        let model = MockCompletionModel::new();
        model.set_error("connection refused").await;
        let solver = AssignmentSolver::new(
            settings(&server, &scratch),
            model.clone(),
            TranscriptFetcher::new(Arc::new(StubTranscripts)),
        )
        .unwrap();

        let assignment = Assignment {
            id: 3,
            name: "Lab".to_string(),
            due_at: None,
            description: String::new(),
            raw_description: String::new(),
            attachments: Vec::new(),
            links: Vec::new(),
            video_ids: Vec::new(),
        };

        let result = solver.generate_solution(&assignment).await;
        assert!(matches!(result, Err(Error::Completion(_))));
        assert_eq!(model.calls().await, 1);
        assert!(!scratch.path().join("output/3_Lab_answer.md").exists());
    }

    #[tokio::test]
    async fn test_lms_failure_gives_empty_list() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/courses/42/assignments")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let scratch = TempDir::new().unwrap();
        let solver = solver(&server, &scratch, "").await;
        assert!(solver.fetch_all_assignments().await.is_empty());
    }

    /// Records how many lookups run at the same time
    #[derive(Default)]
    struct CountingTranscripts {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl TranscriptProvider for CountingTranscripts {
        fn fetch(
            &self,
            video_id: &str,
        ) -> std::result::Result<Vec<TranscriptFragment>, TranscriptError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(50));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![TranscriptFragment {
                text: format!("words of {}", video_id),
                ..TranscriptFragment::default()
            }])
        }
    }

    #[tokio::test]
    async fn test_gather_parts_respects_concurrency_limit() {
        let server = Server::new_async().await;
        let scratch = TempDir::new().unwrap();
        let provider = Arc::new(CountingTranscripts::default());
        let solver = AssignmentSolver::new(
            settings(&server, &scratch),
            MockCompletionModel::new(),
            TranscriptFetcher::new(provider.clone()),
        )
        .unwrap();
        assert_eq!(solver.settings().max_concurrent_downloads, 2);

        let video_ids: Vec<String> = (0..6).map(|i| format!("video{:06}", i)).collect();
        let assignment = Assignment {
            id: 5,
            name: "Lecture series".to_string(),
            due_at: None,
            description: String::new(),
            raw_description: String::new(),
            attachments: Vec::new(),
            links: Vec::new(),
            video_ids: video_ids.clone(),
        };

        let parts = solver.gather_parts(&assignment).await;
        let texts: Vec<_> = parts.iter().map(|part| part.text.clone()).collect();
        let expected: Vec<_> = video_ids.iter().map(|id| format!("words of {}", id)).collect();
        assert_eq!(texts, expected);

        let peak = provider.peak.load(Ordering::SeqCst);
        assert!(peak >= 1 && peak <= 2, "peak concurrency was {}", peak);
    }

    #[tokio::test]
    async fn test_reflective_questions_capped() {
        let server = Server::new_async().await;
        let scratch = TempDir::new().unwrap();
        let solver = solver(&server, &scratch, "1. A?\n2. B?\n3. C?\n4. D?\n5. E?\n6. F?").await;

        let assignment = Assignment {
            id: 4,
            name: "Reflection".to_string(),
            due_at: None,
            description: String::new(),
            raw_description: String::new(),
            attachments: Vec::new(),
            links: Vec::new(),
            video_ids: Vec::new(),
        };

        let questions = solver
            .generate_reflective_questions("Biology", &assignment)
            .await
            .unwrap();
        assert_eq!(questions, vec!["A?", "B?", "C?", "D?", "E?"]);
    }
}
