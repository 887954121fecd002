//! Progression profiles: named bundles of gate, policy and guardrails.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gate::ProgressionReadinessGate;
use crate::guardrails::ProgressionGuardrails;
use crate::metric::ProgressionMetric;
use crate::policy::ProgressionDecisionPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionProfile {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub preferred_metric: Option<ProgressionMetric>,
  pub readiness_gate: ProgressionReadinessGate,
  pub decision_policy: ProgressionDecisionPolicy,
  #[serde(default)]
  pub guardrails: ProgressionGuardrails,
}

impl ProgressionProfile {
  pub fn validate(&self) -> Result<()> {
    self.readiness_gate.validate()?;
    self.decision_policy.validate()?;
    self.guardrails.validate()
  }

  /// Strict gate, high bar to progress, small steps
  pub fn conservative() -> Self {
    Self {
      name: "conservative".to_string(),
      preferred_metric: None,
      readiness_gate: ProgressionReadinessGate {
        minimum_completed_set_ratio: 1.0,
        minimum_completed_sets: 3,
        stale_after_days: 10,
      },
      decision_policy: ProgressionDecisionPolicy {
        progress_threshold: 0.85,
        regress_threshold: 0.40,
        ..Default::default()
      },
      guardrails: ProgressionGuardrails {
        max_progress_percent: Some(5.0),
        max_regress_percent: Some(10.0),
        ..Default::default()
      },
    }
  }

  pub fn balanced() -> Self {
    Self {
      name: "balanced".to_string(),
      preferred_metric: None,
      readiness_gate: ProgressionReadinessGate::default(),
      decision_policy: ProgressionDecisionPolicy::default(),
      guardrails: ProgressionGuardrails {
        max_progress_percent: Some(10.0),
        max_regress_percent: Some(10.0),
        ..Default::default()
      },
    }
  }

  pub fn aggressive() -> Self {
    Self {
      name: "aggressive".to_string(),
      preferred_metric: None,
      readiness_gate: ProgressionReadinessGate {
        minimum_completed_set_ratio: 0.7,
        minimum_completed_sets: 1,
        stale_after_days: 21,
      },
      decision_policy: ProgressionDecisionPolicy {
        progress_threshold: 0.65,
        regress_threshold: 0.25,
        completion_weight: 0.30,
        performance_weight: 0.30,
        effort_weight: 0.10,
        confidence_weight: 0.10,
        streak_weight: 0.20,
      },
      guardrails: ProgressionGuardrails {
        max_progress_percent: Some(15.0),
        max_regress_percent: Some(15.0),
        ..Default::default()
      },
    }
  }

  /// Duration/distance work: effort matters more than raw completion
  pub fn cardio_default() -> Self {
    Self {
      name: "cardio_default".to_string(),
      preferred_metric: Some(ProgressionMetric::Duration),
      readiness_gate: ProgressionReadinessGate {
        minimum_completed_set_ratio: 0.8,
        minimum_completed_sets: 1,
        stale_after_days: 10,
      },
      decision_policy: ProgressionDecisionPolicy {
        progress_threshold: 0.70,
        regress_threshold: 0.35,
        completion_weight: 0.25,
        performance_weight: 0.20,
        effort_weight: 0.30,
        confidence_weight: 0.15,
        streak_weight: 0.10,
      },
      guardrails: ProgressionGuardrails {
        max_progress_percent: Some(10.0),
        max_regress_percent: Some(20.0),
        ..Default::default()
      },
    }
  }

  pub fn presets() -> Vec<Self> {
    vec![
      Self::conservative(),
      Self::balanced(),
      Self::aggressive(),
      Self::cardio_default(),
    ]
  }

  pub fn preset(name: &str) -> Option<Self> {
    Self::presets().into_iter().find(|p| p.name == name)
  }
}

impl Default for ProgressionProfile {
  fn default() -> Self {
    Self::balanced()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_presets_are_well_formed() {
    for profile in ProgressionProfile::presets() {
      assert!(profile.validate().is_ok(), "{} is malformed", profile.name);
      assert!(
        (profile.decision_policy.weight_total() - 1.0).abs() < 1e-9,
        "{} weights should sum to 1",
        profile.name
      );
    }
  }

  #[test]
  fn test_preset_lookup() {
    assert_eq!(
      ProgressionProfile::preset("cardio_default").and_then(|p| p.preferred_metric),
      Some(ProgressionMetric::Duration)
    );
    assert!(ProgressionProfile::preset("reckless").is_none());
  }

  #[test]
  fn test_profile_json_without_guardrails() {
    let json = r#"{
      "name": "custom",
      "readiness_gate": {"minimum_completed_set_ratio": 0.5, "minimum_completed_sets": 1, "stale_after_days": 7},
      "decision_policy": {
        "progress_threshold": 0.7, "regress_threshold": 0.3,
        "completion_weight": 1.0, "performance_weight": 0.0, "effort_weight": 0.0,
        "confidence_weight": 0.0, "streak_weight": 0.0
      }
    }"#;
    let profile: ProgressionProfile = serde_json::from_str(json).unwrap();
    assert_eq!(profile.guardrails, ProgressionGuardrails::default());
    assert!(profile.validate().is_ok());
  }
}
