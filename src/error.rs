//! Error taxonomy for the progression engine
//!
//! Configuration errors are fatal and surfaced to the caller as-is.
//! Ineligibility is not an error: it comes back as `ProgressionOutcome::NoSuggestion`.

use serde::Serialize;

use crate::metric::ProgressionMetric;
use crate::models::ExerciseId;
use crate::rule::ProgressionStrategy;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProgressionError {
  #[error("Rounding increment {increment} is not legal for {metric}")]
  IllegalRoundingIncrement {
    metric: ProgressionMetric,
    increment: f64,
  },

  #[error("Minimum increase {increment} is not legal for {metric}")]
  IllegalMinimumIncrease {
    metric: ProgressionMetric,
    increment: f64,
  },

  #[error("Strategy {strategy} requires the weight metric, got {metric}")]
  StrategyRequiresWeight {
    strategy: ProgressionStrategy,
    metric: ProgressionMetric,
  },

  #[error("Percentage increase {0} must be between 0 and 100")]
  PercentageOutOfRange(f64),

  #[error("Progress threshold {progress} must be greater than regress threshold {regress}")]
  ThresholdOrder { progress: f64, regress: f64 },

  #[error("Threshold {name} = {value} must be between 0 and 1")]
  ThresholdOutOfRange { name: &'static str, value: f64 },

  #[error("Weight {name} = {value} must be finite and non-negative")]
  InvalidWeight { name: &'static str, value: f64 },

  #[error("Invalid guardrails: {0}")]
  InvalidGuardrails(String),

  #[error("Invalid readiness gate: {0}")]
  InvalidGate(String),

  #[error("Base value {0} must be finite and greater than zero")]
  InvalidBaseValue(f64),

  #[error("Signal {name} = {value} must be between 0 and 1")]
  InvalidSignal { name: &'static str, value: f64 },

  #[error("Invalid setting {key}: {value}")]
  InvalidSetting { key: &'static str, value: String },

  #[error("Exercise not found: {0}")]
  UnknownExercise(ExerciseId),

  #[error("Serialization error: {0}")]
  Serialization(String),
}

impl ProgressionError {
  /// Configuration errors can only be fixed by editing the rule, profile or program
  pub fn is_configuration(&self) -> bool {
    !matches!(
      self,
      Self::InvalidBaseValue(_)
        | Self::InvalidSignal { .. }
        | Self::UnknownExercise(_)
        | Self::Serialization(_)
    )
  }
}

impl From<serde_json::Error> for ProgressionError {
  fn from(e: serde_json::Error) -> Self {
    Self::Serialization(e.to_string())
  }
}

impl Serialize for ProgressionError {
  fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
  where
    S: serde::Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

pub type Result<T> = std::result::Result<T, ProgressionError>;
