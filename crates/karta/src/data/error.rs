//! Errors raised while generating data from rules.

use thiserror::Error;

/// A data rule or probability table cannot produce a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RandomizationError {
    /// A numeric range has reversed, infinite or overflowing bounds.
    #[error("invalid range: min {min}, max {max}")]
    InvalidRange {
        /// Lower bound as written.
        min: String,
        /// Upper bound as written.
        max: String,
    },
    /// A random string was requested with a non-positive length.
    #[error("random string length must be positive, got {0}")]
    InvalidLength(i64),
    /// A selection list or map has nothing to choose from.
    #[error("cannot select from an empty {0}")]
    EmptySelection(&'static str),
    /// A single probability falls outside `(0, 1]`.
    #[error("probability {0} must be greater than 0 and at most 1")]
    InvalidProbability(f64),
    /// Mutually exclusive probabilities do not add up to one.
    #[error("probability total for mutex combination needs to be 1.0, got {0:.2}")]
    ProbabilityTotal(f64),
}
