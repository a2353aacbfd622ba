use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Network or backend failure. Surfaced to the caller as a non-fatal
    /// notice; the core never auto-retries.
    #[error("transient store error: {0}")]
    Transient(String),
    /// Rejected before any store call; nothing was written.
    #[error("{0}")]
    Validation(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("credential error: {0}")]
    Credential(String),
}

impl CoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::Transient(_))
    }
}

/// A completion row and its habit's streak counters diverged after a partial
/// failure: the completion write succeeded but the counter update did not.
/// Not an error; it rides on an otherwise successful outcome so a
/// reconciliation pass can find and repair the habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyWarning {
    pub habit_id: String,
    /// Whether a completion row exists for the toggled date after the toggle.
    pub completion_present: bool,
    /// The counter value still stored on the habit row.
    pub recorded_streak: u32,
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "habit {} streak counter diverged: completion_present={}, recorded_streak={}",
            self.habit_id, self.completion_present, self.recorded_streak
        )
    }
}
