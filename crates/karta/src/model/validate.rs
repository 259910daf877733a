//! Invariant checks for compiled features.

use karta_patterns::StepType;
use thiserror::Error;

use super::{Feature, IterationPolicy, Scenario, Step};
use crate::data::round_total;

/// A feature tree violates a structural or probability invariant.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The feature declares no scenarios.
    #[error("feature `{feature}` must contain at least one scenario")]
    NoScenarios {
        /// Feature name.
        feature: String,
    },
    /// The iteration count is zero.
    #[error("feature `{feature}` must run at least one iteration")]
    NoIterations {
        /// Feature name.
        feature: String,
    },
    /// A scenario probability lies outside `(0, 1]`.
    #[error("scenario `{scenario}` probability {probability} must be greater than 0 and at most 1")]
    InvalidProbability {
        /// Scenario name.
        scenario: String,
        /// Offending probability.
        probability: f64,
    },
    /// One-per-iteration probabilities do not add up to one.
    #[error(
        "feature `{feature}` selects one scenario per iteration but scenario probabilities total {total:.2}, expected 1.00"
    )]
    ProbabilityTotal {
        /// Feature name.
        feature: String,
        /// Rounded probability total.
        total: f64,
    },
    /// A scenario has no steps.
    #[error("scenario `{scenario}` must contain at least one step")]
    EmptyScenario {
        /// Scenario name.
        scenario: String,
    },
    /// A condition or loop carries no nested steps.
    #[error("step `{step}` at line {line} must contain at least one nested step")]
    EmptyBlock {
        /// Step identifier.
        step: String,
        /// Line of the step.
        line: usize,
    },
    /// The conjunction does not introduce the step's type.
    #[error("step `{step}` at line {line} uses conjunction `{conjunction}` for a {found:?} step")]
    ConjunctionMismatch {
        /// Step identifier.
        step: String,
        /// Line of the step.
        line: usize,
        /// Conjunction used.
        conjunction: String,
        /// Actual step type.
        found: StepType,
    },
}

pub(super) fn feature(feature: &Feature) -> Result<(), ValidationError> {
    if feature.scenarios.is_empty() {
        return Err(ValidationError::NoScenarios {
            feature: feature.name.clone(),
        });
    }
    if feature.iterations == 0 {
        return Err(ValidationError::NoIterations {
            feature: feature.name.clone(),
        });
    }
    steps(&feature.background)?;
    for scenario in &feature.scenarios {
        self::scenario(scenario)?;
    }
    if feature.iteration_policy == IterationPolicy::OnePerIteration {
        let total = round_total(feature.scenarios.iter().map(|s| s.probability).sum());
        if (total - 1.0).abs() > f64::EPSILON {
            return Err(ValidationError::ProbabilityTotal {
                feature: feature.name.clone(),
                total,
            });
        }
    }
    Ok(())
}

pub(super) fn scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    let probability = scenario.probability;
    if !(probability > 0.0 && probability <= 1.0) {
        return Err(ValidationError::InvalidProbability {
            scenario: scenario.name.clone(),
            probability,
        });
    }
    if scenario.steps.is_empty() {
        return Err(ValidationError::EmptyScenario {
            scenario: scenario.name.clone(),
        });
    }
    steps(&scenario.setup_steps)?;
    steps(&scenario.steps)?;
    steps(&scenario.teardown_steps)
}

fn steps(steps: &[Step]) -> Result<(), ValidationError> {
    steps.iter().try_for_each(step)
}

fn step(step: &Step) -> Result<(), ValidationError> {
    let found = step.step_type();
    if step.conjunction.step_type() != found {
        return Err(ValidationError::ConjunctionMismatch {
            step: step.identifier.clone(),
            line: step.line_number,
            conjunction: step.conjunction.to_string(),
            found,
        });
    }
    if found != StepType::Step && step.nested().is_empty() {
        return Err(ValidationError::EmptyBlock {
            step: step.identifier.clone(),
            line: step.line_number,
        });
    }
    steps(step.nested())
}
