//! Adaptive exercise progression.
//!
//! Given an exercise's recent sessions, a progression rule and a profile,
//! decides whether to progress, hold or regress and computes the next
//! rounded target. Learned per-exercise state (acceptance, streaks,
//! confidence) is carried by the caller and returned updated.

pub mod engine;
pub mod error;
pub mod gate;
pub mod guardrails;
pub mod learned;
pub mod metric;
pub mod models;
pub mod policy;
pub mod profile;
pub mod program;
pub mod rule;
pub mod settings;

#[cfg(test)]
mod test_utils;

pub use engine::{
  ExerciseSelector, ProgressionEngine, ProgressionOutcome, ProgressionSuggestion, SkipReason,
};
pub use error::{ProgressionError, Result};
pub use gate::{ProgressionReadinessGate, Readiness};
pub use guardrails::ProgressionGuardrails;
pub use learned::{ExerciseProgressionState, LearnedPhase, OutcomeHistory, SuggestionOutcome};
pub use metric::ProgressionMetric;
pub use models::{ExerciseHistory, ExerciseId, SessionRecord};
pub use policy::{Decision, DecisionSignals, ProgressionDecisionPolicy, Verdict};
pub use profile::ProgressionProfile;
pub use program::{ExerciseFeed, ProgramProgression, ProgressionPolicy};
pub use rule::{ProgressionRule, ProgressionStrategy};
pub use settings::EngineSettings;
