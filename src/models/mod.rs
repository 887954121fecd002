pub mod exercise;
pub mod session;

pub use exercise::ExerciseId;
pub use session::{ExerciseHistory, SessionRecord};
