//! Error types for scheduling decisions.

use thiserror::Error;

/// A result type using `ScheduleError`.
pub type Result<T> = std::result::Result<T, ScheduleError>;

/// Errors that can occur while selecting an agent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// No registered agent passed the admission filter, even after the
    /// relaxed fallback pass. Retrying later is appropriate.
    #[error("no agents available")]
    NoAgentsAvailable,
}
