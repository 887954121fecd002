//! Metric & rounding model
//!
//! Each metric owns a closed table of legal rounding increments and legal
//! minimum-step increments. Everything that checks increment legality goes
//! through `rounding_options` / `minimum_increase_options` so the tables
//! live in exactly one place.

use serde::{Deserialize, Serialize};

use crate::error::{ProgressionError, Result};

/// Tolerance used when comparing increments from stored (possibly float-mangled) config
const INCREMENT_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
/// Legal increment tables
// ---------------------------------------------------------------------------

const WEIGHT_ROUNDING: &[f64] = &[1.0, 2.5, 5.0, 10.0];
const REPS_ROUNDING: &[f64] = &[1.0];
const DURATION_ROUNDING: &[f64] = &[15.0, 30.0, 60.0, 120.0];
const DISTANCE_ROUNDING: &[f64] = &[0.05, 0.10, 0.25, 0.50];

const WEIGHT_MINIMUM: &[f64] = &[1.0, 2.5, 5.0, 10.0];
const REPS_MINIMUM: &[f64] = &[1.0, 2.0];
const DURATION_MINIMUM: &[f64] = &[15.0, 30.0, 60.0];
const DISTANCE_MINIMUM: &[f64] = &[0.05, 0.10, 0.25];

// ---------------------------------------------------------------------------
/// Progression Metric
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionMetric {
  /// Load in pounds
  Weight,
  /// Repetitions per set
  Reps,
  /// Seconds
  Duration,
  /// Miles
  Distance,
}

impl ProgressionMetric {
  pub const ALL: [ProgressionMetric; 4] = [
    ProgressionMetric::Weight,
    ProgressionMetric::Reps,
    ProgressionMetric::Duration,
    ProgressionMetric::Distance,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Weight => "weight",
      Self::Reps => "reps",
      Self::Duration => "duration",
      Self::Distance => "distance",
    }
  }

  pub fn unit_label(&self) -> &'static str {
    match self {
      Self::Weight => "lb",
      Self::Reps => "reps",
      Self::Duration => "sec",
      Self::Distance => "mi",
    }
  }

  /// Legal rounding increments, smallest first
  pub fn rounding_options(&self) -> &'static [f64] {
    match self {
      Self::Weight => WEIGHT_ROUNDING,
      Self::Reps => REPS_ROUNDING,
      Self::Duration => DURATION_ROUNDING,
      Self::Distance => DISTANCE_ROUNDING,
    }
  }

  /// Legal minimum-increase steps, smallest first
  pub fn minimum_increase_options(&self) -> &'static [f64] {
    match self {
      Self::Weight => WEIGHT_MINIMUM,
      Self::Reps => REPS_MINIMUM,
      Self::Duration => DURATION_MINIMUM,
      Self::Distance => DISTANCE_MINIMUM,
    }
  }

  pub fn default_rounding(&self) -> f64 {
    self.rounding_options()[0]
  }

  pub fn default_minimum_increase(&self) -> f64 {
    self.minimum_increase_options()[0]
  }

  pub fn is_legal_rounding(&self, increment: f64) -> bool {
    contains_increment(self.rounding_options(), increment)
  }

  pub fn is_legal_minimum_increase(&self, increment: f64) -> bool {
    contains_increment(self.minimum_increase_options(), increment)
  }

  pub fn validate_rounding(&self, increment: f64) -> Result<()> {
    if self.is_legal_rounding(increment) {
      Ok(())
    } else {
      Err(ProgressionError::IllegalRoundingIncrement {
        metric: *self,
        increment,
      })
    }
  }

  pub fn validate_minimum_increase(&self, increment: f64) -> Result<()> {
    if self.is_legal_minimum_increase(increment) {
      Ok(())
    } else {
      Err(ProgressionError::IllegalMinimumIncrease {
        metric: *self,
        increment,
      })
    }
  }

  /// Snap a raw value to the nearest multiple of `increment`.
  ///
  /// Halves round away from zero (`f64::round`), so 8.5 reps becomes 9.
  pub fn round_to_increment(value: f64, increment: f64) -> f64 {
    tidy((value / increment).round() * increment)
  }

  /// Render a value the way the workout screens show it
  pub fn format_value(&self, value: f64) -> String {
    match self {
      Self::Weight => format!("{} lb", format_number(value)),
      Self::Reps => {
        let reps = value.round() as i64;
        if reps == 1 {
          "1 rep".to_string()
        } else {
          format!("{} reps", reps)
        }
      }
      Self::Duration => format_duration(value),
      Self::Distance => format!("{:.2} mi", value),
    }
  }
}

impl std::fmt::Display for ProgressionMetric {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl std::str::FromStr for ProgressionMetric {
  type Err = String;
  fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
    match s {
      "weight" => Ok(Self::Weight),
      "reps" => Ok(Self::Reps),
      "duration" => Ok(Self::Duration),
      "distance" => Ok(Self::Distance),
      _ => Err(format!("Unknown progression metric: {}", s)),
    }
  }
}

fn contains_increment(options: &[f64], increment: f64) -> bool {
  options
    .iter()
    .any(|legal| (legal - increment).abs() < INCREMENT_EPSILON)
}

/// Strip float noise like 0.30000000000000004 left over from increment math
pub(crate) fn tidy(value: f64) -> f64 {
  (value * 1e6).round() / 1e6
}

fn format_number(value: f64) -> String {
  let tidied = tidy(value);
  if tidied.fract() == 0.0 {
    format!("{}", tidied as i64)
  } else {
    format!("{}", tidied)
  }
}

fn format_duration(seconds: f64) -> String {
  let total = seconds.round().max(0.0) as i64;
  let hours = total / 3600;
  let minutes = (total % 3600) / 60;
  let secs = total % 60;
  if hours > 0 {
    format!("{}:{:02}:{:02}", hours, minutes, secs)
  } else {
    format!("{}:{:02}", minutes, secs)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_every_metric_has_options() {
    for metric in ProgressionMetric::ALL {
      assert!(!metric.rounding_options().is_empty());
      assert!(!metric.minimum_increase_options().is_empty());
      assert!(metric.is_legal_rounding(metric.default_rounding()));
      assert!(metric.is_legal_minimum_increase(metric.default_minimum_increase()));
    }
  }

  #[test]
  fn test_rounding_legality() {
    assert!(ProgressionMetric::Weight.is_legal_rounding(2.5));
    assert!(!ProgressionMetric::Reps.is_legal_rounding(2.5));
    assert!(ProgressionMetric::Distance.is_legal_rounding(0.1));
    assert!(ProgressionMetric::Distance.is_legal_rounding(0.05 + 0.05));

    let err = ProgressionMetric::Duration.validate_rounding(10.0).unwrap_err();
    assert_eq!(
      err,
      ProgressionError::IllegalRoundingIncrement {
        metric: ProgressionMetric::Duration,
        increment: 10.0,
      }
    );
  }

  #[test]
  fn test_round_half_away_from_zero() {
    assert_eq!(ProgressionMetric::round_to_increment(8.4, 1.0), 8.0);
    assert_eq!(ProgressionMetric::round_to_increment(8.5, 1.0), 9.0);
    assert_eq!(ProgressionMetric::round_to_increment(102.5, 5.0), 105.0);
    assert_eq!(ProgressionMetric::round_to_increment(1.12, 0.05), 1.1);
  }

  #[test]
  fn test_format_values() {
    assert_eq!(ProgressionMetric::Weight.format_value(105.0), "105 lb");
    assert_eq!(ProgressionMetric::Weight.format_value(102.5), "102.5 lb");
    assert_eq!(ProgressionMetric::Reps.format_value(9.0), "9 reps");
    assert_eq!(ProgressionMetric::Reps.format_value(1.0), "1 rep");
    assert_eq!(ProgressionMetric::Duration.format_value(90.0), "1:30");
    assert_eq!(ProgressionMetric::Duration.format_value(3725.0), "1:02:05");
    assert_eq!(ProgressionMetric::Distance.format_value(0.25), "0.25 mi");
  }

  #[test]
  fn test_metric_string_roundtrip() {
    for metric in ProgressionMetric::ALL {
      assert_eq!(metric.as_str().parse::<ProgressionMetric>(), Ok(metric));
    }
    assert!("pace".parse::<ProgressionMetric>().is_err());
  }
}
