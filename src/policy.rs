//! Weighted decision policy
//!
//! Combines five normalized signals into a score and maps it onto a
//! progress / hold / regress verdict with two thresholds. Weights are used
//! as given: they are not normalized to sum to 1.

use serde::{Deserialize, Serialize};

use crate::error::{ProgressionError, Result};

// ---------------------------------------------------------------------------
/// Verdict
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
  Progress,
  Hold,
  Regress,
}

impl std::fmt::Display for Verdict {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Progress => write!(f, "progress"),
      Self::Hold => write!(f, "hold"),
      Self::Regress => write!(f, "regress"),
    }
  }
}

// ---------------------------------------------------------------------------
/// Decision Signals
// ---------------------------------------------------------------------------

/// Already-normalized inputs, each in [0, 1]. Higher always favors progressing,
/// so `effort` is 1.0 when the work felt easy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionSignals {
  pub completion: f64,
  pub performance: f64,
  pub effort: f64,
  pub confidence: f64,
  pub streak: f64,
}

impl DecisionSignals {
  pub fn new(
    completion: f64,
    performance: f64,
    effort: f64,
    confidence: f64,
    streak: f64,
  ) -> Result<Self> {
    let signals = Self {
      completion,
      performance,
      effort,
      confidence,
      streak,
    };
    signals.validate()?;
    Ok(signals)
  }

  /// Same value for every signal
  pub fn uniform(value: f64) -> Result<Self> {
    Self::new(value, value, value, value, value)
  }

  pub fn validate(&self) -> Result<()> {
    for (name, value) in self.named() {
      if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ProgressionError::InvalidSignal { name, value });
      }
    }
    Ok(())
  }

  fn named(&self) -> [(&'static str, f64); 5] {
    [
      ("completion", self.completion),
      ("performance", self.performance),
      ("effort", self.effort),
      ("confidence", self.confidence),
      ("streak", self.streak),
    ]
  }
}

// ---------------------------------------------------------------------------
/// Decision Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionDecisionPolicy {
  pub progress_threshold: f64,
  pub regress_threshold: f64,
  pub completion_weight: f64,
  pub performance_weight: f64,
  pub effort_weight: f64,
  pub confidence_weight: f64,
  pub streak_weight: f64,
}

impl Default for ProgressionDecisionPolicy {
  fn default() -> Self {
    Self {
      progress_threshold: 0.75,
      regress_threshold: 0.35,
      completion_weight: 0.35,
      performance_weight: 0.25,
      effort_weight: 0.15,
      confidence_weight: 0.15,
      streak_weight: 0.10,
    }
  }
}

/// Score and verdict for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Decision {
  pub score: f64,
  pub verdict: Verdict,
}

impl ProgressionDecisionPolicy {
  pub fn validate(&self) -> Result<()> {
    for (name, value) in [
      ("progress_threshold", self.progress_threshold),
      ("regress_threshold", self.regress_threshold),
    ] {
      if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ProgressionError::ThresholdOutOfRange { name, value });
      }
    }
    if self.progress_threshold <= self.regress_threshold {
      return Err(ProgressionError::ThresholdOrder {
        progress: self.progress_threshold,
        regress: self.regress_threshold,
      });
    }
    for (name, value) in [
      ("completion_weight", self.completion_weight),
      ("performance_weight", self.performance_weight),
      ("effort_weight", self.effort_weight),
      ("confidence_weight", self.confidence_weight),
      ("streak_weight", self.streak_weight),
    ] {
      if !value.is_finite() || value < 0.0 {
        return Err(ProgressionError::InvalidWeight { name, value });
      }
    }
    Ok(())
  }

  pub fn weight_total(&self) -> f64 {
    self.completion_weight
      + self.performance_weight
      + self.effort_weight
      + self.confidence_weight
      + self.streak_weight
  }

  pub fn score(&self, signals: &DecisionSignals) -> f64 {
    self.completion_weight * signals.completion
      + self.performance_weight * signals.performance
      + self.effort_weight * signals.effort
      + self.confidence_weight * signals.confidence
      + self.streak_weight * signals.streak
  }

  pub fn verdict_for_score(&self, score: f64) -> Verdict {
    if score >= self.progress_threshold {
      Verdict::Progress
    } else if score <= self.regress_threshold {
      Verdict::Regress
    } else {
      Verdict::Hold
    }
  }

  pub fn decide(&self, signals: &DecisionSignals) -> Result<Decision> {
    self.validate()?;
    signals.validate()?;
    let score = self.score(signals);
    Ok(Decision {
      score,
      verdict: self.verdict_for_score(score),
    })
  }
}
