//! Readiness gate
//!
//! Pure eligibility check run before any decision is made. Looks at the most
//! recent session only: was it recent enough, and were enough sets completed.

use serde::{Deserialize, Serialize};

use crate::error::{ProgressionError, Result};
use crate::models::ExerciseHistory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
  Eligible,
  /// Completed/planned ratio below the gate minimum
  InsufficientCompletion,
  /// Too few completed sets, or no history at all
  InsufficientVolume,
  /// Last session is older than the staleness window
  Stale,
}

impl Readiness {
  pub fn is_eligible(&self) -> bool {
    matches!(self, Self::Eligible)
  }
}

impl std::fmt::Display for Readiness {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Eligible => write!(f, "eligible"),
      Self::InsufficientCompletion => write!(f, "insufficient_completion"),
      Self::InsufficientVolume => write!(f, "insufficient_volume"),
      Self::Stale => write!(f, "stale"),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionReadinessGate {
  pub minimum_completed_set_ratio: f64,
  pub minimum_completed_sets: u32,
  pub stale_after_days: u32,
}

impl Default for ProgressionReadinessGate {
  fn default() -> Self {
    Self {
      minimum_completed_set_ratio: 0.8,
      minimum_completed_sets: 2,
      stale_after_days: 14,
    }
  }
}

impl ProgressionReadinessGate {
  pub fn validate(&self) -> Result<()> {
    if !self.minimum_completed_set_ratio.is_finite()
      || !(0.0..=1.0).contains(&self.minimum_completed_set_ratio)
    {
      return Err(ProgressionError::InvalidGate(format!(
        "minimum completed set ratio {} must be between 0 and 1",
        self.minimum_completed_set_ratio
      )));
    }
    if self.stale_after_days < 1 {
      return Err(ProgressionError::InvalidGate(
        "stale_after_days must be at least 1".to_string(),
      ));
    }
    Ok(())
  }

  /// Evaluate eligibility. Checks run in order: no history, staleness,
  /// completion ratio, completed volume.
  pub fn check(&self, history: &ExerciseHistory) -> Readiness {
    let Some(latest) = history.latest() else {
      return Readiness::InsufficientVolume;
    };

    let days_since = (history.as_of - latest.performed_at).num_days();
    if days_since > i64::from(self.stale_after_days) {
      return Readiness::Stale;
    }

    if latest.completion_ratio() < self.minimum_completed_set_ratio {
      return Readiness::InsufficientCompletion;
    }

    if latest.completed_sets < self.minimum_completed_sets {
      return Readiness::InsufficientVolume;
    }

    Readiness::Eligible
  }
}
