//! Learned per-exercise state
//!
//! Running statistics updated after every suggestion/response cycle:
//! acceptance rate, streaks, smoothed confidence and a bounded window of
//! recent outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::gate::ProgressionReadinessGate;
use crate::models::ExerciseHistory;
use crate::settings::EngineSettings;

/// Share of the confidence target that comes from acceptance rate; the rest is streak
const ACCEPTANCE_SHARE: f64 = 0.7;

// ---------------------------------------------------------------------------
/// Outcome of a presented suggestion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionOutcome {
  Accepted,
  Rejected,
  /// User trained at a different target than suggested
  Adjusted,
}

impl std::fmt::Display for SuggestionOutcome {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Accepted => write!(f, "accepted"),
      Self::Rejected => write!(f, "rejected"),
      Self::Adjusted => write!(f, "adjusted"),
    }
  }
}

// ---------------------------------------------------------------------------
/// Lifecycle phase, derived lazily
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnedPhase {
  NoHistory,
  Active,
  Stale,
}

// ---------------------------------------------------------------------------
/// Outcome History: fixed-capacity FIFO
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeHistory {
  capacity: usize,
  outcomes: VecDeque<SuggestionOutcome>,
}

impl OutcomeHistory {
  pub fn with_capacity(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      capacity,
      outcomes: VecDeque::with_capacity(capacity),
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn len(&self) -> usize {
    self.outcomes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outcomes.is_empty()
  }

  /// Append, evicting the oldest entries once full
  pub fn push(&mut self, outcome: SuggestionOutcome) {
    while self.outcomes.len() >= self.capacity.max(1) {
      self.outcomes.pop_front();
    }
    self.outcomes.push_back(outcome);
  }

  /// Oldest first. Each call starts a fresh pass over the window.
  pub fn iter(&self) -> impl DoubleEndedIterator<Item = SuggestionOutcome> + '_ {
    self.outcomes.iter().copied()
  }

  pub fn latest(&self) -> Option<SuggestionOutcome> {
    self.outcomes.back().copied()
  }

  pub fn count(&self, outcome: SuggestionOutcome) -> usize {
    self.iter().filter(|o| *o == outcome).count()
  }

  pub fn clear(&mut self) {
    self.outcomes.clear();
  }
}

impl<'a> IntoIterator for &'a OutcomeHistory {
  type Item = SuggestionOutcome;
  type IntoIter = std::iter::Copied<std::collections::vec_deque::Iter<'a, SuggestionOutcome>>;

  fn into_iter(self) -> Self::IntoIter {
    self.outcomes.iter().copied()
  }
}

// ---------------------------------------------------------------------------
/// Exercise Progression State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProgressionState {
  pub suggestions_presented: u32,
  pub accepted_count: u32,
  pub success_streak: u32,
  pub fail_streak: u32,
  pub confidence: f64,
  pub recent_outcomes: OutcomeHistory,
  /// A suggestion was presented and has not been answered yet
  #[serde(default)]
  pub awaiting_response: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_suggested_at: Option<DateTime<Utc>>,
}

impl ExerciseProgressionState {
  pub fn new(settings: &EngineSettings) -> Self {
    Self {
      suggestions_presented: 0,
      accepted_count: 0,
      success_streak: 0,
      fail_streak: 0,
      confidence: settings.initial_confidence,
      recent_outcomes: OutcomeHistory::with_capacity(settings.recent_outcomes_capacity),
      awaiting_response: false,
      last_suggested_at: None,
    }
  }

  /// accepted / presented, None before anything was presented
  pub fn acceptance_rate(&self) -> Option<f64> {
    if self.suggestions_presented == 0 {
      None
    } else {
      Some(self.accepted_count as f64 / self.suggestions_presented as f64)
    }
  }

  pub fn phase(
    &self,
    history: &ExerciseHistory,
    gate: &ProgressionReadinessGate,
  ) -> LearnedPhase {
    if self.suggestions_presented == 0 {
      return LearnedPhase::NoHistory;
    }
    match history.days_since_last_session() {
      Some(days) if days <= i64::from(gate.stale_after_days) => LearnedPhase::Active,
      _ => LearnedPhase::Stale,
    }
  }

  /// Confidence as a decision signal
  pub fn confidence_signal(&self) -> f64 {
    self.confidence.clamp(0.0, 1.0)
  }

  /// 0.5 with no streak, rising toward 1 with successes and falling toward 0 with failures
  pub fn streak_signal(&self) -> f64 {
    if self.success_streak > 0 {
      1.0 - 0.5 * 0.5_f64.powi(streak_exponent(self.success_streak))
    } else {
      0.5 * 0.5_f64.powi(streak_exponent(self.fail_streak))
    }
  }

  pub(crate) fn mark_presented(&mut self, at: DateTime<Utc>) {
    self.suggestions_presented = self.suggestions_presented.saturating_add(1);
    self.awaiting_response = true;
    self.last_suggested_at = Some(at);
  }

  /// Fold one user response into the running statistics
  pub fn record(&mut self, outcome: SuggestionOutcome, settings: &EngineSettings) {
    if !self.awaiting_response {
      // Suggestion shown outside the engine; count it once here
      self.suggestions_presented = self.suggestions_presented.saturating_add(1);
    }
    self.awaiting_response = false;

    match outcome {
      SuggestionOutcome::Accepted => {
        self.accepted_count = self.accepted_count.saturating_add(1);
        self.success_streak = self.success_streak.saturating_add(1);
        self.fail_streak = 0;
      }
      SuggestionOutcome::Rejected => {
        self.fail_streak = self.fail_streak.saturating_add(1);
        self.success_streak = 0;
      }
      SuggestionOutcome::Adjusted => {
        self.success_streak = 0;
        self.fail_streak = 0;
      }
    }
    self.recent_outcomes.push(outcome);
    self.update_confidence(outcome, settings);
  }

  fn update_confidence(&mut self, outcome: SuggestionOutcome, settings: &EngineSettings) {
    let rate = self.acceptance_rate().unwrap_or(settings.initial_confidence);
    let target = ACCEPTANCE_SHARE * rate + (1.0 - ACCEPTANCE_SHARE) * self.streak_signal();
    let smoothed = self.confidence + settings.confidence_smoothing * (target - self.confidence);

    // Accepts never lower confidence, rejects never raise it
    let next = match outcome {
      SuggestionOutcome::Accepted => smoothed.max(self.confidence),
      SuggestionOutcome::Rejected => smoothed.min(self.confidence),
      SuggestionOutcome::Adjusted => smoothed,
    };
    self.confidence = next.clamp(0.0, 1.0);
  }

  /// Back to a fresh, no-history state
  pub fn reset(&mut self, settings: &EngineSettings) {
    *self = Self::new(settings);
  }
}

/// Past this many the signal is already saturated
const MAX_STREAK_EXPONENT: u32 = 64;

fn streak_exponent(streak: u32) -> i32 {
  streak.min(MAX_STREAK_EXPONENT) as i32
}
