//! Progress events emitted while an assignment is solved.
//!
//! The solver sends a [`ProgressEvent`] at every phase boundary and after each
//! finished task. Front-ends feed them into a [`ProgressTracker`] to get one
//! overall fraction; phases carry fixed weights.
//!
//! While a run is in progress front-ends also show one of the
//! [`INTEGRITY_REMINDERS`], picked with [`integrity_reminder`].

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

/// Academic-integrity notes shown while an answer is being prepared
pub const INTEGRITY_REMINDERS: &[&str] = &[
    "Remember, originality is key to learning. Submitting others' work as your own is plagiarism.",
    "Plagiarism can lead to serious academic penalties, including failing grades or expulsion.",
    "Always cite your sources properly to avoid unintentional plagiarism.",
    "Understanding the material yourself is more valuable than any shortcut.",
    "Building a foundation of ethical academic habits will serve you well beyond this assignment.",
    "Think critically and express your own ideas. That's what education is about!",
    "Using AI to generate entire assignments without understanding is a form of academic dishonesty.",
    "Learning to research and write effectively are skills for life, don't cheat yourself out of them.",
    "Be proud of your own work and effort. It's more rewarding!",
    "When in doubt, ask your instructor about proper citation and academic integrity policies.",
];

/// A random entry of [`INTEGRITY_REMINDERS`]
pub fn integrity_reminder<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    INTEGRITY_REMINDERS
        .choose(rng)
        .copied()
        .unwrap_or(INTEGRITY_REMINDERS[0])
}

/// Stage of a solve run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Settings loaded, clients built, assignment extracted.
    Initialization,
    /// Links being downloaded and transcripts fetched.
    Downloading,
    /// Downloaded content being read and the prompt assembled.
    Processing,
    /// Waiting on the completion model.
    AiGeneration,
}

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::Initialization,
        Phase::Downloading,
        Phase::Processing,
        Phase::AiGeneration,
    ];

    /// Share of the whole run this phase accounts for.
    pub fn weight(self) -> f64 {
        match self {
            Phase::Initialization => 0.1,
            Phase::Downloading => 0.4,
            Phase::Processing => 0.3,
            Phase::AiGeneration => 0.2,
        }
    }

    fn index(self) -> usize {
        match self {
            Phase::Initialization => 0,
            Phase::Downloading => 1,
            Phase::Processing => 2,
            Phase::AiGeneration => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Initialization => "Initializing",
            Phase::Downloading => "Downloading",
            Phase::Processing => "Processing",
            Phase::AiGeneration => "Generating answer",
        }
    }
}

/// A progress update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    pub phase: Phase,
    /// Units of work finished in this phase.
    pub completed: usize,
    /// Units of work in this phase; zero means the phase has nothing to count.
    pub total: usize,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(phase: Phase, completed: usize, total: usize, message: impl Into<String>) -> Self {
        Self {
            phase,
            completed,
            total,
            message: message.into(),
        }
    }

    /// Fraction of this phase done, in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return if self.completed > 0 { 1.0 } else { 0.0 };
        }
        (self.completed.min(self.total) as f64) / (self.total as f64)
    }
}

/// Folds progress events into an overall fraction.
///
/// Reaching a phase marks every earlier phase as complete.
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    fractions: [f64; 4],
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &ProgressEvent) {
        let index = event.phase.index();
        for earlier in &mut self.fractions[..index] {
            *earlier = 1.0;
        }
        self.fractions[index] = self.fractions[index].max(event.fraction());
    }

    /// Weighted overall completion, in `0.0..=1.0`.
    pub fn overall(&self) -> f64 {
        Phase::ALL
            .iter()
            .map(|phase| phase.weight() * self.fractions[phase.index()])
            .sum::<f64>()
            .clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_integrity_reminder_comes_from_list() {
        use rand::SeedableRng;
        use rand::rngs::StdRng;

        let mut rng = StdRng::seed_from_u64(7);
        let picked: std::collections::HashSet<_> =
            (0..50).map(|_| integrity_reminder(&mut rng)).collect();
        assert!(picked.iter().all(|reminder| INTEGRITY_REMINDERS.contains(reminder)));
        assert!(picked.len() > 1);
    }

    #[test]
    fn test_labels_are_distinct() {
        let labels: std::collections::HashSet<_> = Phase::ALL.iter().map(|p| p.label()).collect();
        assert_eq!(labels.len(), Phase::ALL.len());
        assert_eq!(Phase::AiGeneration.label(), "Generating answer");
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum: f64 = Phase::ALL.iter().map(|p| p.weight()).sum();
        assert!(close(sum, 1.0));
    }

    #[test]
    fn test_event_fraction() {
        assert!(close(ProgressEvent::new(Phase::Downloading, 1, 4, "").fraction(), 0.25));
        assert!(close(ProgressEvent::new(Phase::Downloading, 9, 4, "").fraction(), 1.0));
        assert!(close(ProgressEvent::new(Phase::Processing, 0, 0, "").fraction(), 0.0));
        assert!(close(ProgressEvent::new(Phase::Processing, 1, 0, "").fraction(), 1.0));
    }

    #[test]
    fn test_tracker_weights_phases() {
        let mut tracker = ProgressTracker::new();
        tracker.apply(&ProgressEvent::new(Phase::Initialization, 1, 1, "ready"));
        assert!(close(tracker.overall(), 0.1));

        tracker.apply(&ProgressEvent::new(Phase::Downloading, 2, 4, "2 of 4"));
        assert!(close(tracker.overall(), 0.3));

        // Jumping ahead completes the skipped phases.
        tracker.apply(&ProgressEvent::new(Phase::AiGeneration, 0, 1, "asking"));
        assert!(close(tracker.overall(), 0.8));

        tracker.apply(&ProgressEvent::new(Phase::AiGeneration, 1, 1, "done"));
        assert!(close(tracker.overall(), 1.0));
    }

    #[test]
    fn test_tracker_never_goes_backwards_within_phase() {
        let mut tracker = ProgressTracker::new();
        tracker.apply(&ProgressEvent::new(Phase::Downloading, 3, 4, ""));
        let before = tracker.overall();
        tracker.apply(&ProgressEvent::new(Phase::Downloading, 1, 4, ""));
        assert!(close(tracker.overall(), before));
    }
}
