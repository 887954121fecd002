//! Guardrails: hard caps on how far one decision may move a value.
//!
//! Percent caps apply to the tentative delta, floor/ceiling to the absolute
//! target. `minimum_absolute_step` widens a too-small move but never past
//! the floor or ceiling.

use serde::{Deserialize, Serialize};

use crate::error::{ProgressionError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressionGuardrails {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_progress_percent: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_regress_percent: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub floor_value: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ceiling_value: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub minimum_absolute_step: Option<f64>,
}

impl ProgressionGuardrails {
  pub fn validate(&self) -> Result<()> {
    for (name, value) in [
      ("max_progress_percent", self.max_progress_percent),
      ("max_regress_percent", self.max_regress_percent),
      ("minimum_absolute_step", self.minimum_absolute_step),
    ] {
      if let Some(v) = value {
        if !v.is_finite() || v <= 0.0 {
          return Err(ProgressionError::InvalidGuardrails(format!(
            "{} must be greater than zero, got {}",
            name, v
          )));
        }
      }
    }
    for (name, value) in [
      ("floor_value", self.floor_value),
      ("ceiling_value", self.ceiling_value),
    ] {
      if let Some(v) = value {
        if !v.is_finite() {
          return Err(ProgressionError::InvalidGuardrails(format!(
            "{} must be finite, got {}",
            name, v
          )));
        }
      }
    }
    if let (Some(floor), Some(ceiling)) = (self.floor_value, self.ceiling_value) {
      if floor > ceiling {
        return Err(ProgressionError::InvalidGuardrails(format!(
          "floor {} is above ceiling {}",
          floor, ceiling
        )));
      }
    }
    Ok(())
  }

  /// Clamp a signed percentage delta to [-max_regress, max_progress]
  pub fn clamp_percent(&self, delta_percent: f64) -> f64 {
    let mut delta = delta_percent;
    if let Some(max) = self.max_progress_percent {
      delta = delta.min(max);
    }
    if let Some(max) = self.max_regress_percent {
      delta = delta.max(-max);
    }
    delta
  }

  pub fn clamp_value(&self, value: f64) -> f64 {
    let mut clamped = value;
    if let Some(ceiling) = self.ceiling_value {
      clamped = clamped.min(ceiling);
    }
    if let Some(floor) = self.floor_value {
      clamped = clamped.max(floor);
    }
    clamped
  }

  /// Tentative absolute target for a signed percentage delta from `base_value`
  pub fn apply(&self, base_value: f64, delta_percent: f64) -> f64 {
    let clamped = self.clamp_percent(delta_percent);
    let mut delta = base_value * clamped / 100.0;
    if let Some(step) = self.minimum_absolute_step {
      if delta != 0.0 && delta.abs() < step {
        delta = step.copysign(delta);
      }
    }
    self.clamp_value(base_value + delta)
  }

  /// True when `value` respects the floor and ceiling
  pub fn allows_value(&self, value: f64) -> bool {
    self.floor_value.map_or(true, |floor| value >= floor)
      && self.ceiling_value.map_or(true, |ceiling| value <= ceiling)
  }

  /// Absolute window [low, high] a finalized target must land in.
  ///
  /// Floor and ceiling beat the percent caps: a floor above the capped
  /// window collapses it onto the floor, a ceiling below it onto the ceiling.
  pub fn bounds(&self, base_value: f64) -> (f64, f64) {
    let step = self.minimum_absolute_step.unwrap_or(0.0);
    let capped_high = self
      .max_progress_percent
      .map(|max| base_value + (base_value * max / 100.0).max(step))
      .unwrap_or(f64::INFINITY);
    let capped_low = self
      .max_regress_percent
      .map(|max| base_value - (base_value * max / 100.0).max(step))
      .unwrap_or(f64::NEG_INFINITY);

    let low = self.floor_value.map_or(capped_low, |floor| capped_low.max(floor));
    let high = self
      .ceiling_value
      .map_or(capped_high, |ceiling| capped_high.min(ceiling));
    if low <= high {
      return (low, high);
    }
    match self.floor_value {
      Some(floor) if floor > capped_high => (floor, floor),
      _ => (high, high),
    }
  }
}
