//! Engine settings
//!
//! Tuning knobs for the learned-state tracker. Read from the environment
//! (optionally seeded from a `.env` file); anything unset falls back to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use tracing::warn;

use crate::error::{ProgressionError, Result};

/// ---------------------------------------------------------------------------
/// Configuration Constants
/// ---------------------------------------------------------------------------

const ENV_RECENT_OUTCOMES: &str = "PROGRESSION_RECENT_OUTCOMES";
const ENV_CONFIDENCE_SMOOTHING: &str = "PROGRESSION_CONFIDENCE_SMOOTHING";
const ENV_INITIAL_CONFIDENCE: &str = "PROGRESSION_INITIAL_CONFIDENCE";

const DEFAULT_RECENT_OUTCOMES: usize = 10;
const DEFAULT_CONFIDENCE_SMOOTHING: f64 = 0.3;
const DEFAULT_INITIAL_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
  /// How many recent outcomes each exercise keeps
  pub recent_outcomes_capacity: usize,
  /// EMA factor for confidence updates, (0, 1]
  pub confidence_smoothing: f64,
  /// Confidence of an exercise with no history
  pub initial_confidence: f64,
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      recent_outcomes_capacity: DEFAULT_RECENT_OUTCOMES,
      confidence_smoothing: DEFAULT_CONFIDENCE_SMOOTHING,
      initial_confidence: DEFAULT_INITIAL_CONFIDENCE,
    }
  }
}

impl EngineSettings {
  /// Load `.env` if present, then read settings from the environment
  pub fn load() -> Result<Self> {
    dotenvy::dotenv().ok();
    Self::from_env()
  }

  pub fn from_env() -> Result<Self> {
    let defaults = Self::default();
    let settings = Self {
      recent_outcomes_capacity: read_var(ENV_RECENT_OUTCOMES)?
        .unwrap_or(defaults.recent_outcomes_capacity),
      confidence_smoothing: read_var(ENV_CONFIDENCE_SMOOTHING)?
        .unwrap_or(defaults.confidence_smoothing),
      initial_confidence: read_var(ENV_INITIAL_CONFIDENCE)?
        .unwrap_or(defaults.initial_confidence),
    };
    settings.validate()?;
    Ok(settings)
  }

  pub fn validate(&self) -> Result<()> {
    if self.recent_outcomes_capacity == 0 {
      return Err(ProgressionError::InvalidSetting {
        key: ENV_RECENT_OUTCOMES,
        value: "must be at least 1".to_string(),
      });
    }
    if !(self.confidence_smoothing > 0.0 && self.confidence_smoothing <= 1.0) {
      return Err(ProgressionError::InvalidSetting {
        key: ENV_CONFIDENCE_SMOOTHING,
        value: format!("{} is outside (0, 1]", self.confidence_smoothing),
      });
    }
    if !(0.0..=1.0).contains(&self.initial_confidence) {
      return Err(ProgressionError::InvalidSetting {
        key: ENV_INITIAL_CONFIDENCE,
        value: format!("{} is outside [0, 1]", self.initial_confidence),
      });
    }
    Ok(())
  }
}

fn read_var<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>> {
  match env::var(key) {
    Ok(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
      warn!(key, value = %raw, "Unparsable progression setting");
      ProgressionError::InvalidSetting { key, value: raw }
    }),
    Err(env::VarError::NotPresent) => Ok(None),
    Err(env::VarError::NotUnicode(_)) => Err(ProgressionError::InvalidSetting {
      key,
      value: "not valid unicode".to_string(),
    }),
  }
}
