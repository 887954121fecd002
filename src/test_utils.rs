//! Test utilities and helpers for unit testing
//!
//! This module provides common test infrastructure including:
//! - Session and history factories
//! - Signal fixtures
//! - A program fixture with a few enabled exercises

use crate::models::{ExerciseHistory, ExerciseId, SessionRecord};
use crate::policy::DecisionSignals;
use crate::program::{ExerciseFeed, ProgramProgression, ProgressionPolicy};
use crate::rule::ProgressionRule;
use chrono::{DateTime, Duration, Utc};

/// ---------------------------------------------------------------------------
/// History Factories
/// ---------------------------------------------------------------------------

/// A session `days_ago` days before `now`
pub fn session_days_ago(
  now: DateTime<Utc>,
  days_ago: i64,
  planned_sets: u32,
  completed_sets: u32,
  value: f64,
) -> SessionRecord {
  SessionRecord {
    performed_at: now - Duration::days(days_ago),
    planned_sets,
    completed_sets,
    value: Some(value),
  }
}

pub fn history_with(now: DateTime<Utc>, sessions: Vec<SessionRecord>) -> ExerciseHistory {
  ExerciseHistory {
    as_of: now,
    sessions,
  }
}

/// Yesterday, every planned set completed, at `value`
pub fn eligible_history(value: f64) -> ExerciseHistory {
  let now = Utc::now();
  history_with(
    now,
    vec![
      session_days_ago(now, 8, 5, 5, value),
      session_days_ago(now, 1, 5, 5, value),
    ],
  )
}

/// ---------------------------------------------------------------------------
/// Signal Fixtures
/// ---------------------------------------------------------------------------

pub fn signals(value: f64) -> DecisionSignals {
  DecisionSignals::uniform(value).expect("fixture signal in range")
}

pub fn feed(value: f64, signal: f64) -> ExerciseFeed {
  ExerciseFeed {
    history: eligible_history(value),
    signals: signals(signal),
  }
}

/// ---------------------------------------------------------------------------
/// Program Fixture
/// ---------------------------------------------------------------------------

/// Adaptive program with bench/squat/plank enabled and a weight default rule
pub fn adaptive_program() -> ProgramProgression {
  let mut program = ProgramProgression::new(ProgressionPolicy::Adaptive);
  program.default_progression_rule = Some(ProgressionRule::moderate());
  for id in ["bench_press", "squat", "plank"] {
    program.enable_exercise(ExerciseId::new(id));
  }
  program
}
