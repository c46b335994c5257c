//! # auto_student CLI
//!
//! Command-line front-end for the assignment pipeline.
//!
//! - `courses`: list courses with an active enrollment
//! - `assignments`: list a course's assignments with their extracted descriptions
//! - `solve`: gather an assignment's linked content, ask the model, write prompt and answer
//! - `clear-downloads`: empty the scratch directory
//!
//! Settings come from the environment (and `.env`). Logs go to stderr and,
//! with `--log-file`, to a file as well.

mod telemetry;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow};
use auto_student::fetcher::{Fetcher, FetcherConfig};
use auto_student::lms::Course;
use auto_student::progress::integrity_reminder;
use auto_student::prelude::*;
use auto_student::solver::OpenAiSolver;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::instrument;

/// Progress bar resolution
const PROGRESS_STEPS: u64 = 1000;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Gather an assignment's linked files and videos into an LLM prompt",
    long_about = None
)]
struct Cli {
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List courses with an active enrollment
    Courses(CoursesArgs),

    /// List the assignments of a course
    Assignments(AssignmentsArgs),

    /// Generate a solution for one assignment
    Solve(SolveArgs),

    /// Delete everything in the downloads directory
    ClearDownloads(ClearDownloadsArgs),
}

#[derive(Args, Debug)]
struct CoursesArgs {
    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct AssignmentsArgs {
    /// Course to list (default: COURSE_ID)
    #[arg(short, long)]
    course: Option<u64>,

    /// Output format (text|json)
    #[arg(short, long, default_value = "text", value_parser = ["text", "json"])]
    format: String,
}

#[derive(Args, Debug)]
struct SolveArgs {
    /// Assignment id
    #[arg(required = true)]
    assignment: u64,

    /// Course the assignment belongs to (default: COURSE_ID)
    #[arg(short, long)]
    course: Option<u64>,

    /// Answer a few reflective questions before the answer is generated
    #[arg(short, long)]
    reflect: bool,
}

#[derive(Args, Debug)]
struct ClearDownloadsArgs {
    /// Directory to clear (default: DOWNLOADS_DIR or `downloads`)
    #[arg(short, long)]
    dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing_subscriber(cli.log_file.as_deref())?;

    match cli.command {
        Some(Commands::Courses(args)) => courses_command(args).await?,
        Some(Commands::Assignments(args)) => assignments_command(args).await?,
        Some(Commands::Solve(args)) => solve_command(args).await?,
        Some(Commands::ClearDownloads(args)) => clear_downloads_command(args).await?,
        None => {
            // If no command is provided, show help
            let _ = Cli::parse_from(["auto_student", "--help"]);
        }
    }

    Ok(())
}

fn build_solver() -> anyhow::Result<OpenAiSolver> {
    let settings = Settings::from_env().context("Failed to load settings")?;
    AssignmentSolver::from_settings(settings).context("Failed to build clients")
}

#[instrument]
async fn courses_command(args: CoursesArgs) -> anyhow::Result<()> {
    let solver = build_solver()?;
    let courses = solver.list_courses().await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&courses)?),
        _ => {
            println!("Found {} courses", courses.len());
            for course in &courses {
                println!("{}\t{}", course.id, course_name(course));
            }
        }
    }
    Ok(())
}

#[instrument]
async fn assignments_command(args: AssignmentsArgs) -> anyhow::Result<()> {
    let solver = build_solver()?;
    let course_id = args.course.unwrap_or(solver.settings().course_id);
    let assignments = solver.fetch_assignments(course_id).await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&assignments)?),
        _ => {
            println!("Found {} assignments in course {}", assignments.len(), course_id);
            for assignment in &assignments {
                let sources = if assignment.has_supplementary_sources() {
                    format!(
                        "{} links, {} videos",
                        assignment.links.len(),
                        assignment.video_ids.len()
                    )
                } else {
                    "description only".to_string()
                };
                println!(
                    "{}\t{}\t{} ({})",
                    assignment.id,
                    assignment.due_at.as_deref().unwrap_or("no due date"),
                    assignment.name,
                    sources
                );
            }
        }
    }
    Ok(())
}

#[instrument]
async fn solve_command(args: SolveArgs) -> anyhow::Result<()> {
    let solver = build_solver()?;
    let course_id = args.course.unwrap_or(solver.settings().course_id);
    let mut state = SessionState::new();

    if let Err(e) = solver.test_connection().await {
        state = transition(state, SessionEvent::ConnectionFailed(e.to_string()));
        return Err(anyhow!(state.error.unwrap_or_default())).context("Canvas connection failed");
    }

    // The course list only supplies a display name; a failure is not fatal.
    let courses = solver.list_courses().await.unwrap_or_default();
    let course = courses
        .iter()
        .find(|course| course.id == course_id)
        .cloned()
        .unwrap_or(Course {
            id: course_id,
            name: None,
            course_code: None,
        });
    state = transition(state, SessionEvent::CoursesLoaded(courses));
    state = transition(state, SessionEvent::CourseSelected(course.clone()));

    let assignments = solver.fetch_assignments(course_id).await?;
    let assignment = assignments
        .iter()
        .find(|assignment| assignment.id == args.assignment)
        .cloned()
        .ok_or_else(|| {
            anyhow!("Assignment {} not found in course {}", args.assignment, course_id)
        })?;
    state = transition(state, SessionEvent::AssignmentsLoaded { course_id, assignments });
    state = transition(state, SessionEvent::AssignmentSelected(assignment.clone()));
    state = transition(state, SessionEvent::ProcessRequested);

    state = if args.reflect {
        reflect(&solver, state, course_name(&course), &assignment).await?
    } else {
        transition(state, SessionEvent::ReflectionDone)
    };

    println!("Solving: {}", assignment.name);
    println!("{}", integrity_reminder(&mut rand::thread_rng()));

    let (progress_sender, mut progress_receiver) = mpsc::channel(100);
    let solver = solver.with_progress(progress_sender);

    let progress_bar = ProgressBar::new(PROGRESS_STEPS);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {prefix:>17} {bar:40.cyan/blue} {percent}% {msg}")?
            .progress_chars("##-"),
    );
    progress_bar.enable_steady_tick(Duration::from_millis(200));

    // The progress task owns the session while processing runs
    let progress_handle = tokio::spawn({
        let progress_bar = progress_bar.clone();
        async move {
            let mut state = state;
            let mut phase = None;
            while let Some(event) = progress_receiver.recv().await {
                if phase != Some(event.phase) {
                    phase = Some(event.phase);
                    progress_bar.set_prefix(event.phase.label());
                    if event.phase == Phase::AiGeneration {
                        progress_bar.println(integrity_reminder(&mut rand::thread_rng()));
                    }
                }
                state = transition(state, SessionEvent::Progress(event));
                let position = state.progress.overall() * PROGRESS_STEPS as f64;
                progress_bar.set_position(position as u64);
                progress_bar.set_message(state.activity.clone());
            }
            state
        }
    });

    let outcome = solver.generate_solution(&assignment).await;
    // Dropping the solver closes the progress channel
    drop(solver);
    let state = progress_handle.await?;

    match outcome {
        Ok(result) => {
            progress_bar.finish_with_message("Done");
            let state = transition(state, SessionEvent::Completed(result));
            if let Some(result) = &state.result {
                println!("\n{}\n", result.answer);
                println!("Prompt written to {}", result.prompt_file.display());
                println!("Answer written to {}", result.answer_file.display());
            }
            Ok(())
        }
        Err(e) => {
            progress_bar.abandon_with_message("Failed");
            let state = transition(state, SessionEvent::Failed(e.to_string()));
            Err(anyhow!(state.error.unwrap_or_default())).context("Failed to generate a solution")
        }
    }
}

/// Show reflective questions one at a time, waiting for Enter between them
async fn reflect(
    solver: &OpenAiSolver,
    state: SessionState,
    course_name: &str,
    assignment: &Assignment,
) -> anyhow::Result<SessionState> {
    let mut state = match solver.generate_reflective_questions(course_name, assignment).await {
        Ok(questions) => transition(state, SessionEvent::ReflectionReady(questions)),
        Err(e) => {
            eprintln!("Could not generate reflective questions: {}", e);
            return Ok(transition(state, SessionEvent::ReflectionFailed(e.to_string())));
        }
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while state.view == View::Reflection {
        let Some(question) = state.current_question().map(str::to_string) else {
            break;
        };
        println!(
            "\nQuestion {} of {}: {}",
            state.current_question + 1,
            state.reflection_questions.len(),
            question
        );
        println!("(press Enter when you have thought about it)");
        if lines.next_line().await?.is_none() {
            return Ok(transition(state, SessionEvent::ReflectionDone));
        }
        state = transition(state, SessionEvent::NextQuestion);
    }
    Ok(state)
}

#[instrument]
async fn clear_downloads_command(args: ClearDownloadsArgs) -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    let dir = args
        .dir
        .or_else(|| std::env::var_os("DOWNLOADS_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("downloads"));

    let fetcher = Fetcher::new(FetcherConfig::builder().downloads_dir(dir.clone()).build())?;
    let removed = fetcher.clear_downloads().await?;
    println!("Removed {} files from {}", removed, dir.display());
    Ok(())
}

fn course_name(course: &Course) -> &str {
    course
        .name
        .as_deref()
        .or(course.course_code.as_deref())
        .unwrap_or("(unnamed course)")
}
