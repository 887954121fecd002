use serde::{Deserialize, Serialize};

/// Stable identifier of an exercise inside a training program
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseId(String);

impl ExerciseId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl std::fmt::Display for ExerciseId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<&str> for ExerciseId {
  fn from(id: &str) -> Self {
    Self(id.to_string())
  }
}

impl From<String> for ExerciseId {
  fn from(id: String) -> Self {
    Self(id)
  }
}
