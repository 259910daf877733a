//! Step runners and the built-in step registry.
//!
//! The runtime consults its runners in registration order and hands each
//! step to the first runner reporting it available. [`StepRegistry`] is the
//! runner most callers use: an explicit, owned table of step identifiers and
//! handlers, constructed once and passed to the runtime.

mod error;
mod outcome;
mod steps;

pub use error::StepError;
pub use outcome::{IntoStepOutcome, StepReturn};
pub use steps::{StepDefinition, StepHandler, StepRegistry};

use crate::context::ScenarioContext;
use crate::model::Step;

/// A source of step implementations.
pub trait StepRunner: Send + Sync {
    /// Report whether this runner can execute a step with `identifier`.
    fn is_step_available(&self, identifier: &str) -> bool;

    /// Execute `step` against `context`.
    ///
    /// For conditions and loops this evaluates the guard; nested steps are
    /// run by the runtime.
    ///
    /// # Errors
    /// Returns [`StepError`] when the step fails.
    fn run_step(&self, step: &Step, context: &mut ScenarioContext)
    -> Result<StepReturn, StepError>;

    /// Patterns this runner implements, for diagnostics.
    fn steps(&self) -> Vec<String> {
        Vec::new()
    }
}
