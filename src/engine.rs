//! Progression orchestrator
//!
//! Per exercise, per cycle:
//! readiness gate -> decision policy -> guardrail-clamped delta ->
//! rule rounding -> guardrail re-check -> learned state marked presented.
//!
//! Everything here is deterministic over its inputs. The only mutation is
//! the returned copy of the exercise's learned state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::gate::Readiness;
use crate::guardrails::ProgressionGuardrails;
use crate::learned::{ExerciseProgressionState, SuggestionOutcome};
use crate::metric::{tidy, ProgressionMetric};
use crate::models::{ExerciseHistory, ExerciseId};
use crate::policy::{DecisionSignals, Verdict};
use crate::profile::ProgressionProfile;
use crate::rule::ProgressionRule;
use crate::settings::EngineSettings;

/// Slack for comparing rounded targets against guardrail bounds
const BOUND_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
/// Outcome types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
  InsufficientCompletion,
  InsufficientVolume,
  Stale,
  /// Latest session has no usable value for the rule's metric
  NoBaselineValue,
  ProgressionDisabled,
  NoRuleConfigured,
}

impl SkipReason {
  /// None when the gate passed
  pub fn from_readiness(readiness: Readiness) -> Option<Self> {
    match readiness {
      Readiness::Eligible => None,
      Readiness::InsufficientCompletion => Some(Self::InsufficientCompletion),
      Readiness::InsufficientVolume => Some(Self::InsufficientVolume),
      Readiness::Stale => Some(Self::Stale),
    }
  }
}

impl std::fmt::Display for SkipReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::InsufficientCompletion => write!(f, "insufficient_completion"),
      Self::InsufficientVolume => write!(f, "insufficient_volume"),
      Self::Stale => write!(f, "stale"),
      Self::NoBaselineValue => write!(f, "no_baseline_value"),
      Self::ProgressionDisabled => write!(f, "progression_disabled"),
      Self::NoRuleConfigured => write!(f, "no_rule_configured"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSuggestion {
  pub exercise_id: ExerciseId,
  pub metric: ProgressionMetric,
  pub base_value: f64,
  pub target_value: f64,
  pub verdict: Verdict,
  /// Weighted policy score; None for legacy rule-only suggestions
  pub score: Option<f64>,
  /// Guardrails changed the target the rule alone would have produced
  pub guardrail_limited: bool,
  /// Learned state after this suggestion was presented
  pub state: ExerciseProgressionState,
}

impl ProgressionSuggestion {
  pub fn formatted_target(&self) -> String {
    self.metric.format_value(self.target_value)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProgressionOutcome {
  NoSuggestion { reason: SkipReason },
  Suggestion(ProgressionSuggestion),
}

impl ProgressionOutcome {
  pub fn suggestion(&self) -> Option<&ProgressionSuggestion> {
    match self {
      Self::Suggestion(s) => Some(s),
      Self::NoSuggestion { .. } => None,
    }
  }

  pub fn skip_reason(&self) -> Option<SkipReason> {
    match self {
      Self::NoSuggestion { reason } => Some(*reason),
      Self::Suggestion(_) => None,
    }
  }
}

/// Which learned states a reset applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseSelector {
  One(ExerciseId),
  All,
}

// ---------------------------------------------------------------------------
/// Progression Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ProgressionEngine {
  settings: EngineSettings,
}

impl ProgressionEngine {
  pub fn new(settings: EngineSettings) -> Result<Self> {
    settings.validate()?;
    Ok(Self { settings })
  }

  pub fn settings(&self) -> &EngineSettings {
    &self.settings
  }

  /// Run one adaptive cycle for one exercise.
  ///
  /// Malformed configuration is returned as an error before the history is
  /// looked at. An ineligible exercise yields `NoSuggestion` and its state is
  /// not touched.
  pub fn evaluate(
    &self,
    exercise_id: &ExerciseId,
    rule: &ProgressionRule,
    profile: &ProgressionProfile,
    state: Option<&ExerciseProgressionState>,
    history: &ExerciseHistory,
    signals: &DecisionSignals,
  ) -> Result<ProgressionOutcome> {
    if let Err(e) = rule.validate().and_then(|_| profile.validate()) {
      warn!(exercise_id = %exercise_id, error = %e, "Rejected progression configuration");
      return Err(e);
    }
    signals.validate()?;

    let readiness = profile.readiness_gate.check(history);
    if let Some(reason) = SkipReason::from_readiness(readiness) {
      debug!(exercise_id = %exercise_id, reason = %reason, "Exercise not ready for progression");
      return Ok(ProgressionOutcome::NoSuggestion { reason });
    }

    let Some(base_value) = history.current_value() else {
      debug!(exercise_id = %exercise_id, "No baseline value in latest session");
      return Ok(ProgressionOutcome::NoSuggestion {
        reason: SkipReason::NoBaselineValue,
      });
    };

    let decision = profile.decision_policy.decide(signals)?;
    let target = guarded_target(rule, &profile.guardrails, base_value, decision.verdict);

    let mut updated = state
      .cloned()
      .unwrap_or_else(|| ExerciseProgressionState::new(&self.settings));
    updated.mark_presented(history.as_of);

    debug!(
      exercise_id = %exercise_id,
      score = decision.score,
      policy_verdict = %decision.verdict,
      verdict = %target.verdict,
      base_value,
      target_value = target.value,
      guardrail_limited = target.limited,
      "Progression suggestion"
    );

    Ok(ProgressionOutcome::Suggestion(ProgressionSuggestion {
      exercise_id: exercise_id.clone(),
      metric: rule.target_metric,
      base_value,
      target_value: target.value,
      verdict: target.verdict,
      score: Some(decision.score),
      guardrail_limited: target.limited,
      state: updated,
    }))
  }

  /// Rule-only suggestion used by programs on the legacy policy.
  /// No gate, no policy, no guardrails; the learned state is passed through as-is.
  pub fn evaluate_legacy(
    &self,
    exercise_id: &ExerciseId,
    rule: &ProgressionRule,
    state: Option<&ExerciseProgressionState>,
    history: &ExerciseHistory,
  ) -> Result<ProgressionOutcome> {
    rule.validate()?;
    if history.is_empty() {
      return Ok(ProgressionOutcome::NoSuggestion {
        reason: SkipReason::InsufficientVolume,
      });
    }
    let Some(base_value) = history.current_value() else {
      return Ok(ProgressionOutcome::NoSuggestion {
        reason: SkipReason::NoBaselineValue,
      });
    };

    let target_value = rule.suggest(base_value)?;
    debug!(exercise_id = %exercise_id, base_value, target_value, "Legacy progression suggestion");

    Ok(ProgressionOutcome::Suggestion(ProgressionSuggestion {
      exercise_id: exercise_id.clone(),
      metric: rule.target_metric,
      base_value,
      target_value,
      verdict: Verdict::Progress,
      score: None,
      guardrail_limited: false,
      state: state
        .cloned()
        .unwrap_or_else(|| ExerciseProgressionState::new(&self.settings)),
    }))
  }

  /// Feed a user response into the learned state, returning the updated copy
  pub fn record_response(
    &self,
    exercise_id: &ExerciseId,
    state: Option<&ExerciseProgressionState>,
    outcome: SuggestionOutcome,
  ) -> ExerciseProgressionState {
    let mut updated = state
      .cloned()
      .unwrap_or_else(|| ExerciseProgressionState::new(&self.settings));
    updated.record(outcome, &self.settings);
    debug!(
      exercise_id = %exercise_id,
      outcome = %outcome,
      confidence = updated.confidence,
      success_streak = updated.success_streak,
      fail_streak = updated.fail_streak,
      "Recorded suggestion response"
    );
    updated
  }

  /// Drop learned state for one exercise or all of them. Returns how many were cleared.
  pub fn reset_state(
    &self,
    states: &mut BTreeMap<ExerciseId, ExerciseProgressionState>,
    selector: &ExerciseSelector,
  ) -> usize {
    let cleared = match selector {
      ExerciseSelector::One(id) => usize::from(states.remove(id).is_some()),
      ExerciseSelector::All => {
        let count = states.len();
        states.clear();
        count
      }
    };
    info!(selector = ?selector, cleared, "Reset learned progression state");
    cleared
  }
}

// ---------------------------------------------------------------------------
/// Target computation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct GuardedTarget {
  value: f64,
  verdict: Verdict,
  limited: bool,
}

impl GuardedTarget {
  fn moved(value: f64, verdict: Verdict, limited: bool) -> Self {
    Self {
      value,
      verdict,
      limited,
    }
  }

  fn hold(base_value: f64, limited: bool) -> Self {
    Self {
      value: base_value,
      verdict: Verdict::Hold,
      limited,
    }
  }
}

/// Clamp the rule's delta with the guardrails, round with the rule, then
/// make sure rounding did not push the target back outside the guardrails.
///
/// A target outside the window snaps inward once. When the percent caps are
/// narrower than one rounding increment, exactly one increment is admitted as
/// long as the floor and ceiling allow it. If nothing legal fits, the verdict
/// falls back to hold.
fn guarded_target(
  rule: &ProgressionRule,
  guardrails: &ProgressionGuardrails,
  base_value: f64,
  verdict: Verdict,
) -> GuardedTarget {
  let increment = rule.rounding_increment;
  let change = rule.raw_change(base_value, rule.percentage_increase);
  let (low, high) = guardrails.bounds(base_value);
  let within = |value: f64| value >= low - BOUND_EPSILON && value <= high + BOUND_EPSILON;

  match verdict {
    Verdict::Hold => GuardedTarget::hold(base_value, false),
    Verdict::Progress => {
      let tentative = guardrails.apply(base_value, change / base_value * 100.0);
      let clamped = (tentative - (base_value + change)).abs() > BOUND_EPSILON;
      let rounded = rule.snap_forward(base_value, tentative);
      if within(rounded) {
        return GuardedTarget::moved(rounded, verdict, clamped);
      }
      let snapped = snap_inward(rounded, low, high, increment);
      if within(snapped) && snapped > base_value {
        return GuardedTarget::moved(snapped, verdict, true);
      }
      let one_step = tidy(base_value + increment);
      if guardrails.allows_value(one_step) && one_step >= low - BOUND_EPSILON {
        GuardedTarget::moved(one_step, verdict, true)
      } else {
        GuardedTarget::hold(base_value, true)
      }
    }
    Verdict::Regress => {
      let tentative = guardrails.apply(base_value, -change / base_value * 100.0);
      let clamped = (tentative - (base_value - change)).abs() > BOUND_EPSILON;
      let rounded = rule.snap_backward(base_value, tentative);
      if let Some(rounded) = rounded {
        if within(rounded) {
          return GuardedTarget::moved(rounded, verdict, clamped);
        }
        let snapped = snap_inward(rounded, low, high, increment);
        if within(snapped) && snapped < base_value && snapped > 0.0 {
          return GuardedTarget::moved(snapped, verdict, true);
        }
      }
      let one_step = tidy(base_value - increment);
      if one_step > 0.0 && guardrails.allows_value(one_step) && one_step <= high + BOUND_EPSILON {
        GuardedTarget::moved(one_step, verdict, true)
      } else {
        GuardedTarget::hold(base_value, clamped || rounded.is_some())
      }
    }
  }
}

/// Nearest multiple of `increment` inside [low, high] on the side `value` left from
fn snap_inward(value: f64, low: f64, high: f64, increment: f64) -> f64 {
  if value > high {
    tidy(((high / increment) + BOUND_EPSILON).floor() * increment)
  } else if value < low {
    tidy(((low / increment) - BOUND_EPSILON).ceil() * increment)
  } else {
    value
  }
}
