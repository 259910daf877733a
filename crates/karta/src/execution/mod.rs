//! The execution runtime.
//!
//! [`Runtime`] walks compiled features strictly in order: every iteration of
//! a feature selects its scenarios through the feature's
//! [`IterationPolicy`](crate::model::IterationPolicy), and every selected
//! scenario runs its background, setup, body and teardown steps against a
//! fresh [`ScenarioContext`](crate::ScenarioContext).
//!
//! Step failures are recorded in the result tree and only stop the enclosing
//! scenario. Fatal errors (an unimplemented step, a failing hook, an invalid
//! feature) abort the run and are returned as [`RunAborted`] carrying the
//! partial [`RunResult`].

mod builder;
mod policy;
mod runtime;
mod step;

use thiserror::Error;

use crate::data::RandomizationError;
use crate::events::{HookError, Phase};
use crate::model::ValidationError;
use crate::results::RunResult;

pub use builder::RuntimeBuilder;
pub use policy::select_scenarios;
pub use runtime::Runtime;

/// An error that aborts the whole run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    /// No step runner implements a step.
    #[error("unimplemented step: {identifier} ({}:{line})", .file.as_deref().unwrap_or("<unknown>"))]
    UnresolvedStep {
        /// Step text.
        identifier: String,
        /// Source of the step.
        file: Option<String>,
        /// Line of the step.
        line: usize,
    },
    /// A lifecycle hook rejected a phase.
    #[error("{phase} hook failed: {error}")]
    Hook {
        /// Phase being announced.
        phase: Phase,
        /// The hook's error.
        #[source]
        error: HookError,
    },
    /// A feature failed validation before the run started.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The scenarios of an iteration could not be selected.
    #[error("scenario selection failed: {0}")]
    Selection(#[from] RandomizationError),
}

/// A run stopped on a fatal error.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("run `{}` aborted: {error}", .partial.name)]
pub struct RunAborted {
    /// The fatal error.
    #[source]
    pub error: ExecutionError,
    /// Everything computed before the abort, marked failed with the error.
    pub partial: Box<RunResult>,
}
