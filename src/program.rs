//! Program-level progression configuration
//!
//! A training program owns which exercises progress, their rule and profile
//! overrides, and their learned state. It is the single writer for all of
//! them; the engine only ever hands back updated copies.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

use crate::engine::{ExerciseSelector, ProgressionEngine, ProgressionOutcome, SkipReason};
use crate::error::{ProgressionError, Result};
use crate::learned::{ExerciseProgressionState, SuggestionOutcome};
use crate::models::{ExerciseHistory, ExerciseId};
use crate::policy::DecisionSignals;
use crate::profile::ProgressionProfile;
use crate::rule::ProgressionRule;

// ---------------------------------------------------------------------------
/// Progression Policy: top-level mode switch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionPolicy {
  /// Apply the rule every cycle, nothing learned
  #[default]
  Legacy,
  /// Gate, weighted decision, guardrails and learned state
  Adaptive,
}

/// Externally supplied inputs for one exercise's cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseFeed {
  pub history: ExerciseHistory,
  pub signals: DecisionSignals,
}

// ---------------------------------------------------------------------------
/// Program Progression
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgramProgression {
  #[serde(default)]
  pub progression_policy: ProgressionPolicy,
  #[serde(default)]
  pub progression_enabled_exercises: BTreeSet<ExerciseId>,
  #[serde(default)]
  pub exercise_progression_overrides: BTreeMap<ExerciseId, ProgressionRule>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub default_progression_rule: Option<ProgressionRule>,
  #[serde(default)]
  pub exercise_progression_profiles: BTreeMap<ExerciseId, ProgressionProfile>,
  #[serde(default)]
  pub default_progression_profile: ProgressionProfile,
  #[serde(default)]
  pub exercise_progression_states: BTreeMap<ExerciseId, ExerciseProgressionState>,
}

impl ProgramProgression {
  pub fn new(progression_policy: ProgressionPolicy) -> Self {
    Self {
      progression_policy,
      ..Default::default()
    }
  }

  pub fn from_json(json: &str) -> Result<Self> {
    let program: Self = serde_json::from_str(json)?;
    program.validate()?;
    Ok(program)
  }

  pub fn to_json(&self) -> Result<String> {
    Ok(serde_json::to_string(self)?)
  }

  /// Check every stored rule and profile, and that per-exercise entries only
  /// exist for enabled exercises
  pub fn validate(&self) -> Result<()> {
    if let Some(rule) = &self.default_progression_rule {
      rule.validate()?;
    }
    for rule in self.exercise_progression_overrides.values() {
      rule.validate()?;
    }
    self.default_progression_profile.validate()?;
    for profile in self.exercise_progression_profiles.values() {
      profile.validate()?;
    }
    let orphan = self
      .exercise_progression_profiles
      .keys()
      .chain(self.exercise_progression_states.keys())
      .find(|id| !self.progression_enabled_exercises.contains(*id));
    match orphan {
      Some(id) => Err(ProgressionError::UnknownExercise(id.clone())),
      None => Ok(()),
    }
  }

  pub fn is_enabled(&self, exercise_id: &ExerciseId) -> bool {
    self.progression_enabled_exercises.contains(exercise_id)
  }

  /// Returns false if it was already enabled
  pub fn enable_exercise(&mut self, exercise_id: ExerciseId) -> bool {
    let added = self.progression_enabled_exercises.insert(exercise_id.clone());
    if added {
      info!(exercise_id = %exercise_id, "Progression enabled");
    }
    added
  }

  /// Disable progression and prune the exercise's profile and learned state
  pub fn disable_exercise(&mut self, exercise_id: &ExerciseId) -> bool {
    let removed = self.progression_enabled_exercises.remove(exercise_id);
    self.exercise_progression_profiles.remove(exercise_id);
    self.exercise_progression_states.remove(exercise_id);
    if removed {
      info!(exercise_id = %exercise_id, "Progression disabled, learned state dropped");
    }
    removed
  }

  pub fn set_rule_override(&mut self, exercise_id: ExerciseId, rule: ProgressionRule) -> Result<()> {
    rule.validate()?;
    self.exercise_progression_overrides.insert(exercise_id, rule);
    Ok(())
  }

  pub fn clear_rule_override(&mut self, exercise_id: &ExerciseId) -> Option<ProgressionRule> {
    self.exercise_progression_overrides.remove(exercise_id)
  }

  pub fn set_profile_override(
    &mut self,
    exercise_id: ExerciseId,
    profile: ProgressionProfile,
  ) -> Result<()> {
    if !self.is_enabled(&exercise_id) {
      return Err(ProgressionError::UnknownExercise(exercise_id));
    }
    profile.validate()?;
    self.exercise_progression_profiles.insert(exercise_id, profile);
    Ok(())
  }

  pub fn clear_profile_override(&mut self, exercise_id: &ExerciseId) -> Option<ProgressionProfile> {
    self.exercise_progression_profiles.remove(exercise_id)
  }

  /// Override first, then the program default
  pub fn resolve_rule(&self, exercise_id: &ExerciseId) -> Option<&ProgressionRule> {
    self
      .exercise_progression_overrides
      .get(exercise_id)
      .or(self.default_progression_rule.as_ref())
  }

  pub fn resolve_profile(&self, exercise_id: &ExerciseId) -> &ProgressionProfile {
    self
      .exercise_progression_profiles
      .get(exercise_id)
      .unwrap_or(&self.default_progression_profile)
  }

  pub fn state(&self, exercise_id: &ExerciseId) -> Option<&ExerciseProgressionState> {
    self.exercise_progression_states.get(exercise_id)
  }

  /// Compute the outcome for one exercise without writing anything back
  pub fn preview(
    &self,
    engine: &ProgressionEngine,
    exercise_id: &ExerciseId,
    feed: &ExerciseFeed,
  ) -> Result<ProgressionOutcome> {
    if !self.is_enabled(exercise_id) {
      return Ok(ProgressionOutcome::NoSuggestion {
        reason: SkipReason::ProgressionDisabled,
      });
    }
    let Some(rule) = self.resolve_rule(exercise_id) else {
      debug!(exercise_id = %exercise_id, "No progression rule configured");
      return Ok(ProgressionOutcome::NoSuggestion {
        reason: SkipReason::NoRuleConfigured,
      });
    };
    let state = self.state(exercise_id);

    match self.progression_policy {
      ProgressionPolicy::Legacy => engine.evaluate_legacy(exercise_id, rule, state, &feed.history),
      ProgressionPolicy::Adaptive => engine.evaluate(
        exercise_id,
        rule,
        self.resolve_profile(exercise_id),
        state,
        &feed.history,
        &feed.signals,
      ),
    }
  }

  /// Evaluate one exercise and store its updated learned state on a suggestion
  pub fn evaluate(
    &mut self,
    engine: &ProgressionEngine,
    exercise_id: &ExerciseId,
    feed: &ExerciseFeed,
  ) -> Result<ProgressionOutcome> {
    let outcome = self.preview(engine, exercise_id, feed)?;
    self.apply_outcome(exercise_id, &outcome);
    Ok(outcome)
  }

  /// Evaluate many exercises at once, e.g. when a session is saved.
  /// Exercises are independent, so they are computed in parallel and the
  /// learned states written back afterwards.
  pub fn evaluate_all(
    &mut self,
    engine: &ProgressionEngine,
    feeds: &BTreeMap<ExerciseId, ExerciseFeed>,
  ) -> BTreeMap<ExerciseId, Result<ProgressionOutcome>> {
    let results: BTreeMap<ExerciseId, Result<ProgressionOutcome>> = feeds
      .par_iter()
      .map(|(id, feed)| (id.clone(), self.preview(engine, id, feed)))
      .collect();

    for (id, result) in &results {
      if let Ok(outcome) = result {
        self.apply_outcome(id, outcome);
      }
    }
    results
  }

  fn apply_outcome(&mut self, exercise_id: &ExerciseId, outcome: &ProgressionOutcome) {
    if self.progression_policy != ProgressionPolicy::Adaptive {
      return;
    }
    if let ProgressionOutcome::Suggestion(suggestion) = outcome {
      self
        .exercise_progression_states
        .insert(exercise_id.clone(), suggestion.state.clone());
    }
  }

  /// Record the user's answer to the latest suggestion.
  /// Legacy programs learn nothing, so the response is dropped and `None` returned.
  pub fn record_response(
    &mut self,
    engine: &ProgressionEngine,
    exercise_id: &ExerciseId,
    outcome: SuggestionOutcome,
  ) -> Result<Option<&ExerciseProgressionState>> {
    if !self.is_enabled(exercise_id) {
      return Err(ProgressionError::UnknownExercise(exercise_id.clone()));
    }
    if self.progression_policy != ProgressionPolicy::Adaptive {
      debug!(exercise_id = %exercise_id, outcome = %outcome, "Legacy policy, response not learned");
      return Ok(None);
    }
    let slot = self
      .exercise_progression_states
      .entry(exercise_id.clone())
      .or_insert_with(|| ExerciseProgressionState::new(engine.settings()));
    *slot = engine.record_response(exercise_id, Some(&*slot), outcome);
    Ok(Some(slot))
  }

  pub fn reset(&mut self, engine: &ProgressionEngine, selector: &ExerciseSelector) -> usize {
    engine.reset_state(&mut self.exercise_progression_states, selector)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::learned::LearnedPhase;
  use crate::metric::ProgressionMetric;
  use crate::policy::Verdict;
  use crate::test_utils::{adaptive_program, feed, history_with, session_days_ago};
  use chrono::Utc;

  fn bench() -> ExerciseId {
    ExerciseId::new("bench_press")
  }

  #[test]
  fn test_disabled_exercise_gets_no_suggestion() {
    let mut program = adaptive_program();
    let engine = ProgressionEngine::default();
    let outcome = program
      .evaluate(&engine, &ExerciseId::new("curl"), &feed(30.0, 0.9))
      .unwrap();
    assert_eq!(outcome.skip_reason(), Some(SkipReason::ProgressionDisabled));
    assert!(program.exercise_progression_states.is_empty());
  }

  #[test]
  fn test_missing_rule_reported() {
    let mut program = adaptive_program();
    program.default_progression_rule = None;
    let outcome = program
      .evaluate(&ProgressionEngine::default(), &bench(), &feed(100.0, 0.9))
      .unwrap();
    assert_eq!(outcome.skip_reason(), Some(SkipReason::NoRuleConfigured));
  }

  #[test]
  fn test_override_beats_default() {
    let mut program = adaptive_program();
    program
      .set_rule_override(ExerciseId::new("plank"), ProgressionRule::baseline(ProgressionMetric::Duration))
      .unwrap();

    let plank = program.resolve_rule(&ExerciseId::new("plank")).unwrap();
    assert_eq!(plank.rounding_increment, 15.0);
    assert_eq!(program.resolve_rule(&bench()), Some(&ProgressionRule::moderate()));

    let outcome = program
      .evaluate(&ProgressionEngine::default(), &ExerciseId::new("plank"), &feed(300.0, 0.9))
      .unwrap();
    assert_eq!(outcome.suggestion().map(|s| s.formatted_target()), Some("5:30".to_string()));
  }

  #[test]
  fn test_suggestion_writes_state_back() {
    // Arrange
    let mut program = adaptive_program();
    let engine = ProgressionEngine::default();

    // Act
    let outcome = program.evaluate(&engine, &bench(), &feed(100.0, 0.9)).unwrap();

    // Assert
    assert_eq!(outcome.suggestion().map(|s| s.verdict), Some(Verdict::Progress));
    let state = program.state(&bench()).expect("state stored");
    assert_eq!(state.suggestions_presented, 1);
    assert_eq!(
      state.phase(&feed(100.0, 0.9).history, &program.resolve_profile(&bench()).readiness_gate),
      LearnedPhase::Active
    );
  }

  #[test]
  fn test_no_suggestion_does_not_write_state() {
    let mut program = adaptive_program();
    let now = Utc::now();
    let stale = ExerciseFeed {
      history: history_with(now, vec![session_days_ago(now, 40, 5, 5, 100.0)]),
      signals: DecisionSignals::uniform(0.9).unwrap(),
    };
    let outcome = program
      .evaluate(&ProgressionEngine::default(), &bench(), &stale)
      .unwrap();
    assert_eq!(outcome.skip_reason(), Some(SkipReason::Stale));
    assert!(program.state(&bench()).is_none());
  }

  #[test]
  fn test_legacy_policy_skips_learning() {
    let mut program = adaptive_program();
    program.progression_policy = ProgressionPolicy::Legacy;

    // Low signals would regress under the adaptive policy
    let outcome = program
      .evaluate(&ProgressionEngine::default(), &bench(), &feed(100.0, 0.1))
      .unwrap();

    let suggestion = outcome.suggestion().unwrap();
    assert_eq!(suggestion.verdict, Verdict::Progress);
    assert_eq!(suggestion.target_value, 105.0);
    assert!(program.exercise_progression_states.is_empty());
  }

  #[test]
  fn test_disable_prunes_profile_and_state() {
    // Arrange
    let mut program = adaptive_program();
    let engine = ProgressionEngine::default();
    program
      .set_profile_override(bench(), ProgressionProfile::aggressive())
      .unwrap();
    program.set_rule_override(bench(), ProgressionRule::fine_grained()).unwrap();
    program.evaluate(&engine, &bench(), &feed(100.0, 0.9)).unwrap();
    assert!(program.state(&bench()).is_some());

    // Act
    assert!(program.disable_exercise(&bench()));

    // Assert
    assert!(!program.exercise_progression_profiles.contains_key(&bench()));
    assert!(program.state(&bench()).is_none());
    assert!(program.validate().is_ok());
  }

  #[test]
  fn test_profile_override_requires_enabled_exercise() {
    let mut program = adaptive_program();
    let result = program.set_profile_override(ExerciseId::new("curl"), ProgressionProfile::balanced());
    assert_eq!(result, Err(ProgressionError::UnknownExercise(ExerciseId::new("curl"))));
  }

  #[test]
  fn test_record_response_and_reset() {
    let mut program = adaptive_program();
    let engine = ProgressionEngine::default();
    program.evaluate(&engine, &bench(), &feed(100.0, 0.9)).unwrap();

    let state = program
      .record_response(&engine, &bench(), SuggestionOutcome::Accepted)
      .unwrap()
      .expect("adaptive programs learn");
    assert_eq!(state.suggestions_presented, 1);
    assert_eq!(state.success_streak, 1);

    program
      .record_response(&engine, &ExerciseId::new("squat"), SuggestionOutcome::Rejected)
      .unwrap();
    assert_eq!(program.exercise_progression_states.len(), 2);

    assert_eq!(program.reset(&engine, &ExerciseSelector::One(bench())), 1);
    assert_eq!(program.reset(&engine, &ExerciseSelector::All), 1);
    assert!(program.exercise_progression_states.is_empty());

    let result = program.record_response(&engine, &ExerciseId::new("curl"), SuggestionOutcome::Accepted);
    assert!(result.is_err());
  }

  #[test]
  fn test_legacy_policy_ignores_responses() {
    let mut program = adaptive_program();
    program.progression_policy = ProgressionPolicy::Legacy;
    let engine = ProgressionEngine::default();

    let state = program
      .record_response(&engine, &bench(), SuggestionOutcome::Accepted)
      .unwrap();

    assert!(state.is_none());
    assert!(program.exercise_progression_states.is_empty());
  }

  #[test]
  fn test_gate_failure_keeps_stored_state() {
    // Arrange: an exercise with learned state from an earlier cycle
    let mut program = adaptive_program();
    let engine = ProgressionEngine::default();
    program.evaluate(&engine, &bench(), &feed(100.0, 0.9)).unwrap();
    program
      .record_response(&engine, &bench(), SuggestionOutcome::Accepted)
      .unwrap();
    let before = program.state(&bench()).cloned();
    assert!(before.is_some());

    // Act: 3 of 5 sets against the 0.8 completion gate
    let now = Utc::now();
    let low_completion = ExerciseFeed {
      history: history_with(now, vec![session_days_ago(now, 1, 5, 3, 105.0)]),
      signals: DecisionSignals::uniform(0.9).unwrap(),
    };
    let outcome = program.evaluate(&engine, &bench(), &low_completion).unwrap();

    // Assert
    assert_eq!(outcome.skip_reason(), Some(SkipReason::InsufficientCompletion));
    assert_eq!(program.state(&bench()).cloned(), before);
  }

  #[test]
  fn test_rep_collapse_through_default_profile() {
    let mut program = adaptive_program();
    program
      .set_rule_override(bench(), ProgressionRule::new(ProgressionMetric::Reps, 5.0, 1.0, None).unwrap())
      .unwrap();

    let outcome = program
      .evaluate(&ProgressionEngine::default(), &bench(), &feed(8.0, 1.0))
      .unwrap();

    let suggestion = outcome.suggestion().unwrap();
    assert_eq!(suggestion.verdict, Verdict::Progress);
    assert_eq!(suggestion.target_value, 9.0);
  }

  #[test]
  fn test_evaluate_all_matches_one_by_one() {
    // Arrange
    let engine = ProgressionEngine::default();
    let mut feeds = BTreeMap::new();
    feeds.insert(bench(), feed(100.0, 0.9));
    feeds.insert(ExerciseId::new("squat"), feed(200.0, 0.2));
    feeds.insert(ExerciseId::new("curl"), feed(30.0, 0.9));

    let mut sequential = adaptive_program();
    let expected: Vec<_> = feeds
      .iter()
      .map(|(id, f)| sequential.evaluate(&engine, id, f).unwrap())
      .collect();

    // Act
    let mut batch = adaptive_program();
    let results = batch.evaluate_all(&engine, &feeds);

    // Assert
    let actual: Vec<_> = results.into_values().map(|r| r.unwrap()).collect();
    assert_eq!(actual, expected);
    assert_eq!(batch.exercise_progression_states, sequential.exercise_progression_states);
    assert_eq!(batch.exercise_progression_states.len(), 2);
  }

  #[test]
  fn test_json_roundtrip_keeps_learned_state() {
    let mut program = adaptive_program();
    let engine = ProgressionEngine::default();
    program.evaluate(&engine, &bench(), &feed(100.0, 0.9)).unwrap();
    program
      .record_response(&engine, &bench(), SuggestionOutcome::Accepted)
      .unwrap();

    let json = program.to_json().unwrap();
    let restored = ProgramProgression::from_json(&json).unwrap();
    assert_eq!(restored, program);
  }

  #[test]
  fn test_from_json_rejects_orphan_state() {
    let mut program = adaptive_program();
    let engine = ProgressionEngine::default();
    program.evaluate(&engine, &bench(), &feed(100.0, 0.9)).unwrap();
    program.progression_enabled_exercises.remove(&bench());

    let json = program.to_json().unwrap();
    assert_eq!(
      ProgramProgression::from_json(&json),
      Err(ProgressionError::UnknownExercise(bench()))
    );
  }
}
