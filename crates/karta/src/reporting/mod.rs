//! Report writers for finished runs.
//!
//! A [`RunResult`] is already serializable as-is; the writers here render
//! condensed views of it for people and CI systems. [`json`] emits a
//! status-labelled tree and [`junit`] emits a `JUnit` XML document with one
//! test suite per feature.

pub mod json;
pub mod junit;

use crate::results::{Outcome, RunResult, StepResult};

/// Status label of a finished node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The node and all its children succeeded.
    Passed,
    /// The node or a child failed.
    Failed,
}

impl Status {
    /// Lowercase label used by every report format.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
        }
    }
}

impl From<&Outcome> for Status {
    fn from(outcome: &Outcome) -> Self {
        if outcome.successful {
            Self::Passed
        } else {
            Self::Failed
        }
    }
}

/// Counts over a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Features run.
    pub features: usize,
    /// Scenario executions across all iterations.
    pub scenarios: usize,
    /// Failed scenario executions.
    pub failed_scenarios: usize,
    /// Steps run, nested steps included.
    pub steps: usize,
    /// Failed steps, nested steps included.
    pub failed_steps: usize,
}

impl Summary {
    /// Tally `run`.
    ///
    /// # Examples
    /// ```
    /// use karta::reporting::Summary;
    /// use karta::results::RunResult;
    ///
    /// let summary = Summary::of(&RunResult::start("empty", 1));
    /// assert_eq!(summary, Summary::default());
    /// ```
    #[must_use]
    pub fn of(run: &RunResult) -> Self {
        let mut summary = Self {
            features: run.feature_results.len(),
            ..Self::default()
        };
        for scenario in run.scenario_results() {
            summary.scenarios += 1;
            if !scenario.is_successful() {
                summary.failed_scenarios += 1;
            }
            count_steps(&scenario.step_results, &mut summary);
        }
        summary
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} feature(s), {} scenario(s) ({} failed), {} step(s) ({} failed)",
            self.features, self.scenarios, self.failed_scenarios, self.steps, self.failed_steps
        )
    }
}

fn count_steps(steps: &[StepResult], summary: &mut Summary) {
    for step in steps {
        summary.steps += 1;
        if !step.is_successful() {
            summary.failed_steps += 1;
        }
        count_steps(&step.step_results, summary);
    }
}
