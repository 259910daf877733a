//! Errors raised by step handlers.

use thiserror::Error;

/// A step handler failed.
///
/// Handler failures are recorded in the step's result and stop the rest of
/// the scenario; they never abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    /// The handler reported a failure.
    #[error("{0}")]
    Failed(String),
    /// The handler panicked.
    #[error("step panicked: {message}")]
    Panicked {
        /// Rendered panic payload.
        message: String,
    },
    /// Step data could not be generated or decoded.
    #[error("invalid step data: {0}")]
    InvalidData(String),
    /// The runner was asked to run a step it has no definition for.
    #[error("no step definition matches `{0}`")]
    NotFound(String),
}

impl StepError {
    /// Build a [`StepError::Failed`] from any displayable message.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        Self::Failed(message.to_string())
    }
}

impl From<serde_json::Error> for StepError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}

impl From<String> for StepError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}

impl From<&str> for StepError {
    fn from(message: &str) -> Self {
        Self::Failed(message.to_owned())
    }
}
