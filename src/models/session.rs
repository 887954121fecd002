use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One logged session of an exercise, as supplied by the session repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
  pub performed_at: DateTime<Utc>,
  pub planned_sets: u32,
  pub completed_sets: u32,
  /// Best value reached for the rule's target metric (lb, reps, seconds or miles)
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<f64>,
}

impl SessionRecord {
  /// Completed / planned, 0 when nothing was planned
  pub fn completion_ratio(&self) -> f64 {
    if self.planned_sets == 0 {
      0.0
    } else {
      self.completed_sets as f64 / self.planned_sets as f64
    }
  }
}

/// Read-only history feed for a single exercise, evaluated as of `as_of`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseHistory {
  pub as_of: DateTime<Utc>,
  #[serde(default)]
  pub sessions: Vec<SessionRecord>,
}

impl ExerciseHistory {
  pub fn new(as_of: DateTime<Utc>) -> Self {
    Self {
      as_of,
      sessions: Vec::new(),
    }
  }

  pub fn with_session(mut self, session: SessionRecord) -> Self {
    self.sessions.push(session);
    self
  }

  pub fn is_empty(&self) -> bool {
    self.sessions.is_empty()
  }

  /// Most recent session, regardless of the order the feed delivered them in
  pub fn latest(&self) -> Option<&SessionRecord> {
    self.sessions.iter().max_by_key(|s| s.performed_at)
  }

  pub fn days_since_last_session(&self) -> Option<i64> {
    self
      .latest()
      .map(|s| (self.as_of - s.performed_at).num_days())
  }

  /// Current best-known value: the latest session's value, if positive
  pub fn current_value(&self) -> Option<f64> {
    self
      .latest()
      .and_then(|s| s.value)
      .filter(|v| v.is_finite() && *v > 0.0)
  }
}
