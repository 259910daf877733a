//! Execution of single steps, including condition and loop blocks.

use std::panic::{AssertUnwindSafe, catch_unwind};

use super::ExecutionError;
use super::runtime::{Runtime, Scope};
use crate::context::ScenarioContext;
use crate::events::{HookError, Phase, PhaseContext, PhaseResult};
use crate::model::{Step, StepKind};
use crate::panic::panic_message;
use crate::registry::{StepError, StepReturn, StepRunner};
use crate::results::{ScenarioResult, StepResult};

/// A result together with the fatal error, if any, that ended it.
pub(super) type Executed<T> = (T, Result<(), ExecutionError>);

/// A result node that nested step results are added to.
pub(super) trait StepParent {
    fn add(&mut self, child: StepResult);
}

impl StepParent for StepResult {
    fn add(&mut self, child: StepResult) {
        self.add_step_result(child);
    }
}

impl StepParent for ScenarioResult {
    fn add(&mut self, child: StepResult) {
        self.add_step_result(child);
    }
}

impl Runtime {
    /// Run `steps` in order, stopping after the first unsuccessful one.
    ///
    /// Returns whether every step succeeded.
    pub(super) fn run_sequence<'s, P: StepParent>(
        &self,
        scope: &Scope<'_>,
        steps: impl IntoIterator<Item = &'s Step>,
        state: &mut ScenarioContext,
        parent: &mut P,
    ) -> Result<bool, ExecutionError> {
        for step in steps {
            let (result, status) = self.run_step(scope, step, state);
            let passed = result.is_successful();
            parent.add(result);
            status?;
            if !passed {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub(super) fn run_step(
        &self,
        scope: &Scope<'_>,
        step: &Step,
        state: &mut ScenarioContext,
    ) -> Executed<StepResult> {
        let mut result = StepResult::start(step);
        let Some(runner) = self.find_step_runner(&step.identifier) else {
            let error = ExecutionError::UnresolvedStep {
                identifier: step.identifier.clone(),
                file: step.source.clone(),
                line: step.line_number,
            };
            return fail(result, error);
        };
        log::debug!("running step `{}`", step.identifier);
        state.enter_step(&step.identifier);
        let start = PhaseContext {
            step: Some(step),
            ..scope.phase(Phase::StepStart)
        };
        if let Err(error) = self.events.emit_scenario(&start, state) {
            return fail(result, hook_failure(Phase::StepStart, error));
        }

        let status = self.execute(scope, step, runner, state, &mut result);
        result.finish();
        if status.is_err() {
            return (result, status);
        }

        let complete = PhaseContext {
            step: Some(step),
            result: Some(PhaseResult::Step(&result)),
            ..scope.phase(Phase::StepComplete)
        };
        let status = self
            .events
            .emit_scenario(&complete, state)
            .map_err(|error| hook_failure(Phase::StepComplete, error));
        (result, status)
    }

    fn execute(
        &self,
        scope: &Scope<'_>,
        step: &Step,
        runner: &dyn StepRunner,
        state: &mut ScenarioContext,
        result: &mut StepResult,
    ) -> Result<(), ExecutionError> {
        if let Some(rules) = &step.data_rules {
            match rules.generate(&self.rng) {
                Ok(value) => state.set_step_data(value),
                Err(err) => {
                    result.fail(failure_text(step, &StepError::InvalidData(err.to_string())));
                    return Ok(());
                }
            }
        }
        let Some(outcome) = invoke(runner, step, state, result) else {
            return Ok(());
        };
        match &step.kind {
            StepKind::Step => {
                let (data, successful, error) = outcome.into_parts();
                state.merge(data.clone());
                result.results = data;
                if !successful {
                    result.fail(error.unwrap_or_else(|| {
                        format!("step `{}` reported failure", step.identifier)
                    }));
                }
            }
            StepKind::Condition { steps } => {
                if outcome.is_truthy() {
                    self.run_sequence(scope, steps, state, result)?;
                }
            }
            StepKind::Loop { steps } => {
                let mut guard = outcome;
                while guard.is_truthy() {
                    if !self.run_sequence(scope, steps, state, result)? {
                        break;
                    }
                    match invoke(runner, step, state, result) {
                        Some(next) => guard = next,
                        None => break,
                    }
                }
            }
        }
        Ok(())
    }
}

/// Call the runner, converting errors and panics into a failed result.
fn invoke(
    runner: &dyn StepRunner,
    step: &Step,
    state: &mut ScenarioContext,
    result: &mut StepResult,
) -> Option<StepReturn> {
    let error = match catch_unwind(AssertUnwindSafe(|| runner.run_step(step, state))) {
        Ok(Ok(outcome)) => return Some(outcome),
        Ok(Err(error)) => error,
        Err(payload) => StepError::Panicked {
            message: panic_message(payload.as_ref()),
        },
    };
    result.fail(failure_text(step, &error));
    None
}

/// Render a step error with the location of the failing step.
fn failure_text(step: &Step, error: &StepError) -> String {
    let file = step.source.as_deref().unwrap_or("<unknown>");
    let verb = if matches!(error, StepError::Panicked { .. }) {
        "panicked at"
    } else {
        "at"
    };
    format!(
        "StepExecutionError: {error}\n  {verb} {file}:{} in step `{}`",
        step.line_number, step.identifier
    )
}

pub(super) fn hook_failure(phase: Phase, error: HookError) -> ExecutionError {
    ExecutionError::Hook { phase, error }
}

fn fail(mut result: StepResult, error: ExecutionError) -> Executed<StepResult> {
    result.fail(error.to_string());
    result.finish();
    (result, Err(error))
}
