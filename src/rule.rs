//! Progression rules
//!
//! A rule maps a current value to the next suggested value for one metric:
//! percentage increase, snapped to the metric's rounding increment, never
//! collapsing back onto the base value.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProgressionError, Result};
use crate::metric::{tidy, ProgressionMetric};

// ---------------------------------------------------------------------------
/// Progression Strategy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionStrategy {
  /// Increase by a percentage of the current value
  #[default]
  Linear,
  /// Increase by a fixed step (minimum increase, else one rounding increment). Weight only.
  Stepped,
}

impl std::fmt::Display for ProgressionStrategy {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Linear => write!(f, "linear"),
      Self::Stepped => write!(f, "stepped"),
    }
  }
}

// ---------------------------------------------------------------------------
/// Progression Rule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionRule {
  pub target_metric: ProgressionMetric,
  #[serde(default)]
  pub strategy: ProgressionStrategy,
  /// 0-100, typically one of 1, 2.5, 5, 7.5, 10
  pub percentage_increase: f64,
  pub rounding_increment: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub minimum_increase: Option<f64>,
}

impl ProgressionRule {
  /// Build a linear rule, rejecting anything illegal for the metric
  pub fn new(
    target_metric: ProgressionMetric,
    percentage_increase: f64,
    rounding_increment: f64,
    minimum_increase: Option<f64>,
  ) -> Result<Self> {
    let rule = Self {
      target_metric,
      strategy: ProgressionStrategy::Linear,
      percentage_increase,
      rounding_increment,
      minimum_increase,
    };
    rule.validate()?;
    Ok(rule)
  }

  pub fn validate(&self) -> Result<()> {
    if !self.percentage_increase.is_finite()
      || !(0.0..=100.0).contains(&self.percentage_increase)
    {
      return Err(ProgressionError::PercentageOutOfRange(
        self.percentage_increase,
      ));
    }
    self.target_metric.validate_rounding(self.rounding_increment)?;
    if let Some(minimum) = self.minimum_increase {
      self.target_metric.validate_minimum_increase(minimum)?;
    }
    if self.strategy != ProgressionStrategy::Linear
      && self.target_metric != ProgressionMetric::Weight
    {
      return Err(ProgressionError::StrategyRequiresWeight {
        strategy: self.strategy,
        metric: self.target_metric,
      });
    }
    Ok(())
  }

  /// Suggest the next value from `base_value`. Always strictly greater than the base.
  pub fn suggest(&self, base_value: f64) -> Result<f64> {
    self.validate()?;
    check_base(base_value)?;
    Ok(self.progress_with_percentage(base_value, self.percentage_increase))
  }

  /// Absolute change before rounding, minimum increase applied
  pub(crate) fn raw_change(&self, base_value: f64, percentage: f64) -> f64 {
    let change = match self.strategy {
      ProgressionStrategy::Linear => base_value * percentage / 100.0,
      ProgressionStrategy::Stepped => self.minimum_increase.unwrap_or(self.rounding_increment),
    };
    match self.minimum_increase {
      Some(minimum) => change.max(minimum),
      None => change,
    }
  }

  pub fn progress_with_percentage(&self, base_value: f64, percentage: f64) -> f64 {
    self.snap_forward(base_value, base_value + self.raw_change(base_value, percentage))
  }

  pub fn regress_with_percentage(&self, base_value: f64, percentage: f64) -> Option<f64> {
    self.snap_backward(base_value, base_value - self.raw_change(base_value, percentage))
  }

  /// Round a tentative target up from the base. Never lands on or below the base.
  pub(crate) fn snap_forward(&self, base_value: f64, target: f64) -> f64 {
    let rounded = ProgressionMetric::round_to_increment(target, self.rounding_increment);
    // Rounding may collapse onto the base; always move by at least one increment
    rounded.max(tidy(base_value + self.rounding_increment))
  }

  /// Round a tentative target down from the base, strictly below it. None if that reaches zero.
  pub(crate) fn snap_backward(&self, base_value: f64, target: f64) -> Option<f64> {
    let rounded = ProgressionMetric::round_to_increment(target, self.rounding_increment);
    let result = rounded.min(tidy(base_value - self.rounding_increment));
    (result > 0.0).then_some(result)
  }

  /// Switch the target metric, auto-correcting increments the new metric does not allow
  pub fn with_metric(mut self, metric: ProgressionMetric) -> Self {
    if self.target_metric == metric {
      return self;
    }
    self.target_metric = metric;
    if !metric.is_legal_rounding(self.rounding_increment) {
      debug!(
        metric = %metric,
        from = self.rounding_increment,
        to = metric.default_rounding(),
        "Rounding increment not legal for new metric, resetting"
      );
      self.rounding_increment = metric.default_rounding();
    }
    if let Some(minimum) = self.minimum_increase {
      if !metric.is_legal_minimum_increase(minimum) {
        self.minimum_increase = Some(metric.default_minimum_increase());
      }
    }
    if metric != ProgressionMetric::Weight {
      self.strategy = ProgressionStrategy::Linear;
    }
    self
  }

  pub fn with_strategy(mut self, strategy: ProgressionStrategy) -> Result<Self> {
    self.strategy = strategy;
    self.validate()?;
    Ok(self)
  }

  /// Short summary for pickers, e.g. "+5% weight, round to 5 lb"
  pub fn describe(&self) -> String {
    let step = match self.strategy {
      ProgressionStrategy::Linear => format!("+{}%", self.percentage_increase),
      ProgressionStrategy::Stepped => format!(
        "+{}",
        self
          .target_metric
          .format_value(self.minimum_increase.unwrap_or(self.rounding_increment))
      ),
    };
    let mut text = format!(
      "{} {}, round to {}",
      step,
      self.target_metric,
      self.target_metric.format_value(self.rounding_increment)
    );
    if let Some(minimum) = self.minimum_increase {
      text.push_str(&format!(
        ", at least {}",
        self.target_metric.format_value(minimum)
      ));
    }
    text
  }

  // -------------------------------------------------------------------------
  // Presets
  // -------------------------------------------------------------------------

  pub fn conservative() -> Self {
    Self {
      target_metric: ProgressionMetric::Weight,
      strategy: ProgressionStrategy::Linear,
      percentage_increase: 2.5,
      rounding_increment: 5.0,
      minimum_increase: Some(5.0),
    }
  }

  pub fn moderate() -> Self {
    Self {
      target_metric: ProgressionMetric::Weight,
      strategy: ProgressionStrategy::Linear,
      percentage_increase: 5.0,
      rounding_increment: 5.0,
      minimum_increase: None,
    }
  }

  pub fn fine_grained() -> Self {
    Self {
      target_metric: ProgressionMetric::Weight,
      strategy: ProgressionStrategy::Linear,
      percentage_increase: 2.5,
      rounding_increment: 2.5,
      minimum_increase: None,
    }
  }

  pub fn rep_progression() -> Self {
    Self {
      target_metric: ProgressionMetric::Reps,
      strategy: ProgressionStrategy::Linear,
      percentage_increase: 5.0,
      rounding_increment: 1.0,
      minimum_increase: Some(1.0),
    }
  }

  /// Named starting point for every metric
  pub fn baseline(metric: ProgressionMetric) -> Self {
    match metric {
      ProgressionMetric::Weight => Self::moderate(),
      ProgressionMetric::Reps => Self::rep_progression(),
      ProgressionMetric::Duration => Self {
        target_metric: metric,
        strategy: ProgressionStrategy::Linear,
        percentage_increase: 10.0,
        rounding_increment: 15.0,
        minimum_increase: None,
      },
      ProgressionMetric::Distance => Self {
        target_metric: metric,
        strategy: ProgressionStrategy::Linear,
        percentage_increase: 5.0,
        rounding_increment: 0.05,
        minimum_increase: None,
      },
    }
  }

  /// Preset name / rule pairs offered in the rule picker
  pub fn presets() -> Vec<(&'static str, Self)> {
    vec![
      ("conservative", Self::conservative()),
      ("moderate", Self::moderate()),
      ("fine_grained", Self::fine_grained()),
      ("rep_progression", Self::rep_progression()),
    ]
  }
}

impl Default for ProgressionRule {
  fn default() -> Self {
    Self::moderate()
  }
}

pub(crate) fn check_base(base_value: f64) -> Result<()> {
  if base_value.is_finite() && base_value > 0.0 {
    Ok(())
  } else {
    Err(ProgressionError::InvalidBaseValue(base_value))
  }
}
