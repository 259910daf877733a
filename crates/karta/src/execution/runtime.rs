//! Feature, scenario and run orchestration.

use std::borrow::Borrow;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::step::{Executed, hook_failure};
use super::{ExecutionError, RunAborted, RuntimeBuilder, select_scenarios};
use crate::catalog::{ScenarioRef, TestCatalog};
use crate::context::ScenarioContext;
use crate::data::SeededRng;
use crate::events::{EventProcessor, Phase, PhaseContext, PhaseResult};
use crate::model::{Feature, Scenario};
use crate::registry::StepRunner;
use crate::results::{FeatureResult, RunResult, ScenarioResult};

/// Names shared by every phase of one run.
#[derive(Debug, Clone, Copy)]
pub(super) struct RunScope<'a> {
    pub(super) name: &'a str,
    pub(super) tags: &'a [String],
}

impl<'a> RunScope<'a> {
    fn phase(&self, phase: Phase) -> PhaseContext<'a> {
        PhaseContext {
            tags: self.tags,
            ..PhaseContext::new(phase, self.name)
        }
    }
}

/// Position of a running scenario.
#[derive(Debug, Clone, Copy)]
pub(super) struct Scope<'a> {
    pub(super) run: RunScope<'a>,
    pub(super) feature: &'a Feature,
    pub(super) iteration: u32,
    pub(super) scenario: &'a Scenario,
}

impl<'a> Scope<'a> {
    pub(super) fn phase(&self, phase: Phase) -> PhaseContext<'a> {
        PhaseContext {
            feature: Some(self.feature),
            iteration: Some(self.iteration),
            scenario: Some(self.scenario),
            ..self.run.phase(phase)
        }
    }
}

/// Executes features against the registered step runners.
///
/// # Examples
/// ```
/// use karta::execution::Runtime;
/// use karta::kriya::parse_feature;
/// use karta::StepRegistry;
///
/// let mut steps = StepRegistry::new();
/// steps.register("I have {int} apples", |ctx, args| {
///     ctx.insert("apples", args[0].as_i64());
/// }).unwrap();
///
/// let feature = parse_feature("Feature: Fruit\n  Scenario: Count\n    Given I have 3 apples\n").unwrap();
/// let runtime = Runtime::builder().with_step_runner(steps).with_seed(1).build();
/// let result = runtime.run_features("demo", [feature]).unwrap();
/// assert!(result.is_successful());
/// assert_eq!(result.seed, 1);
/// ```
pub struct Runtime {
    pub(super) runners: Vec<Arc<dyn StepRunner>>,
    pub(super) events: EventProcessor,
    pub(super) rng: SeededRng,
    pub(super) properties: Map<String, Value>,
}

impl Runtime {
    /// Start configuring a runtime.
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// Seed of the random source, recorded in every [`RunResult`].
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// The random source shared by data generation and scenario selection.
    #[must_use]
    pub fn rng(&self) -> &SeededRng {
        &self.rng
    }

    /// First runner, in registration order, implementing `identifier`.
    #[must_use]
    pub fn find_step_runner(&self, identifier: &str) -> Option<&dyn StepRunner> {
        let identifier = identifier.trim();
        self.runners
            .iter()
            .find(|runner| runner.is_step_available(identifier))
            .map(AsRef::as_ref)
    }

    /// Patterns implemented by every runner, in registration order.
    #[must_use]
    pub fn steps(&self) -> Vec<String> {
        self.runners.iter().flat_map(|runner| runner.steps()).collect()
    }

    /// Validate then run every feature in order.
    ///
    /// # Errors
    /// Returns [`RunAborted`] when a feature fails validation (before any
    /// phase is announced), a step has no runner, or a hook fails.
    pub fn run_features<I>(&self, run_name: &str, features: I) -> Result<RunResult, RunAborted>
    where
        I: IntoIterator,
        I::Item: Borrow<Feature>,
    {
        let owned: Vec<I::Item> = features.into_iter().collect();
        let features: Vec<&Feature> = owned.iter().map(Borrow::borrow).collect();
        let mut result = RunResult::start(run_name, self.seed());
        if let Err(error) = validate(features.iter().copied()) {
            return Err(abort(result, error));
        }
        let run = RunScope {
            name: run_name,
            tags: &[],
        };
        log::debug!("run `{run_name}` started with seed {}", self.seed());
        if let Err(error) = self.events.emit(&run.phase(Phase::RunStart)) {
            return Err(abort(result, hook_failure(Phase::RunStart, error)));
        }
        for feature in features {
            let (feature_result, status) = self.run_feature(run, feature);
            result.add_feature_result(feature_result);
            if let Err(error) = status {
                return Err(abort(result, error));
            }
        }
        self.complete(run, result)
    }

    /// Run every scenario of `catalog` matching any of `tags` once.
    ///
    /// See [`TestCatalog::filter_with_tags`] for the matching rules and
    /// [`Runtime::run_scenarios`] for how the selection runs.
    ///
    /// # Errors
    /// See [`Runtime::run_scenarios`].
    pub fn run_tags<I, S>(
        &self,
        run_name: &str,
        catalog: &TestCatalog,
        tags: I,
    ) -> Result<RunResult, RunAborted>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags: Vec<String> = tags.into_iter().map(|t| t.as_ref().to_owned()).collect();
        let selection = catalog.filter_with_tags(&tags);
        self.run_selection(
            RunScope {
                name: run_name,
                tags: &tags,
            },
            &selection,
        )
    }

    /// Run each selected scenario once, as iteration `0`, grouped per feature
    /// in first-appearance order. Iteration policies and iteration phases do
    /// not apply.
    ///
    /// # Errors
    /// Returns [`RunAborted`] when a feature fails validation, a step has no
    /// runner, or a hook fails.
    pub fn run_scenarios(
        &self,
        run_name: &str,
        selection: &[ScenarioRef<'_>],
    ) -> Result<RunResult, RunAborted> {
        self.run_selection(
            RunScope {
                name: run_name,
                tags: &[],
            },
            selection,
        )
    }

    /// Wait for pending listener events to be delivered.
    pub fn shutdown(&mut self) {
        self.events.shutdown();
    }

    fn run_selection(
        &self,
        run: RunScope<'_>,
        selection: &[ScenarioRef<'_>],
    ) -> Result<RunResult, RunAborted> {
        let groups = group_by_feature(selection);
        let mut result = RunResult::start(run.name, self.seed());
        if let Err(error) = validate(groups.iter().map(|&(feature, _)| Arc::as_ref(feature))) {
            return Err(abort(result, error));
        }
        if let Err(error) = self.events.emit(&run.phase(Phase::RunStart)) {
            return Err(abort(result, hook_failure(Phase::RunStart, error)));
        }
        for (feature, scenarios) in &groups {
            let (feature_result, status) = self.run_feature_once(run, feature, scenarios);
            result.add_feature_result(feature_result);
            if let Err(error) = status {
                return Err(abort(result, error));
            }
        }
        self.complete(run, result)
    }

    fn complete(&self, run: RunScope<'_>, mut result: RunResult) -> Result<RunResult, RunAborted> {
        result.finish();
        let ctx = PhaseContext {
            result: Some(PhaseResult::Run(&result)),
            ..run.phase(Phase::RunComplete)
        };
        if let Err(error) = self.events.emit(&ctx) {
            return Err(abort(result, hook_failure(Phase::RunComplete, error)));
        }
        log::debug!(
            "run `{}` finished: {}",
            run.name,
            if result.is_successful() { "passed" } else { "failed" }
        );
        Ok(result)
    }

    fn run_feature(&self, run: RunScope<'_>, feature: &Feature) -> Executed<FeatureResult> {
        let mut result = start_feature(feature);
        let base = PhaseContext {
            feature: Some(feature),
            ..run.phase(Phase::FeatureStart)
        };
        if let Err(error) = self.events.emit(&base) {
            return finish(result, Err(hook_failure(Phase::FeatureStart, error)));
        }
        for iteration in 0..feature.iterations {
            result.iterations_count = iteration + 1;
            let selected = match select_scenarios(feature, &self.rng) {
                Ok(selected) => selected,
                Err(error) => return finish(result, Err(error.into())),
            };
            log::info!(
                "running feature `{}` iteration {iteration} with {} scenario(s)",
                feature.name,
                selected.len()
            );
            let start = PhaseContext {
                phase: Phase::FeatureIterationStart,
                iteration: Some(iteration),
                selected: &selected,
                ..base
            };
            if let Err(error) = self.events.emit(&start) {
                return finish(result, Err(hook_failure(Phase::FeatureIterationStart, error)));
            }
            let first = result.scenario_results.len();
            for scenario in &selected {
                let scope = Scope {
                    run,
                    feature,
                    iteration,
                    scenario,
                };
                let (scenario_result, status) = self.run_scenario(scope);
                result.add_scenario_result(scenario_result);
                if status.is_err() {
                    return finish(result, status);
                }
            }
            let complete = PhaseContext {
                phase: Phase::FeatureIterationComplete,
                iteration: Some(iteration),
                result: Some(PhaseResult::Iteration(
                    result.scenario_results.get(first..).unwrap_or_default(),
                )),
                ..base
            };
            if let Err(error) = self.events.emit(&complete) {
                let error = hook_failure(Phase::FeatureIterationComplete, error);
                return finish(result, Err(error));
            }
        }
        self.complete_feature(run, feature, result)
    }

    fn run_feature_once(
        &self,
        run: RunScope<'_>,
        feature: &Feature,
        scenarios: &[&Scenario],
    ) -> Executed<FeatureResult> {
        let mut result = start_feature(feature);
        result.iterations_count = 1;
        let start = PhaseContext {
            feature: Some(feature),
            ..run.phase(Phase::FeatureStart)
        };
        if let Err(error) = self.events.emit(&start) {
            return finish(result, Err(hook_failure(Phase::FeatureStart, error)));
        }
        for scenario in scenarios {
            let (scenario_result, status) = self.run_scenario(Scope {
                run,
                feature,
                iteration: 0,
                scenario,
            });
            result.add_scenario_result(scenario_result);
            if status.is_err() {
                return finish(result, status);
            }
        }
        self.complete_feature(run, feature, result)
    }

    fn complete_feature(
        &self,
        run: RunScope<'_>,
        feature: &Feature,
        mut result: FeatureResult,
    ) -> Executed<FeatureResult> {
        result.finish();
        let ctx = PhaseContext {
            feature: Some(feature),
            result: Some(PhaseResult::Feature(&result)),
            ..run.phase(Phase::FeatureComplete)
        };
        let status = self
            .events
            .emit(&ctx)
            .map_err(|error| hook_failure(Phase::FeatureComplete, error));
        (result, status)
    }

    /// Run background, setup and body steps until one fails, then teardown
    /// steps under the same rule.
    fn run_scenario(&self, scope: Scope<'_>) -> Executed<ScenarioResult> {
        let Scope {
            feature,
            iteration,
            scenario,
            ..
        } = scope;
        let mut result = ScenarioResult::start(
            &scenario.name,
            scenario.source.as_deref(),
            scenario.line_number,
            iteration,
        );
        let mut state = ScenarioContext::new(&feature.name, &scenario.name, iteration)
            .with_properties(self.properties.clone());
        if let Err(error) = self
            .events
            .emit_scenario(&scope.phase(Phase::ScenarioStart), &mut state)
        {
            return finish(result, Err(hook_failure(Phase::ScenarioStart, error)));
        }

        let body = feature
            .background
            .iter()
            .chain(&scenario.setup_steps)
            .chain(&scenario.steps);
        if let Err(error) = self.run_sequence(&scope, body, &mut state, &mut result) {
            return finish(result, Err(error));
        }
        if let Err(error) =
            self.run_sequence(&scope, &scenario.teardown_steps, &mut state, &mut result)
        {
            return finish(result, Err(error));
        }

        result.finish();
        let complete = PhaseContext {
            result: Some(PhaseResult::Scenario(&result)),
            ..scope.phase(Phase::ScenarioComplete)
        };
        let status = self
            .events
            .emit_scenario(&complete, &mut state)
            .map_err(|error| hook_failure(Phase::ScenarioComplete, error));
        (result, status)
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("runners", &self.runners.len())
            .field("events", &self.events)
            .field("seed", &self.rng.seed())
            .finish_non_exhaustive()
    }
}

fn validate<'f>(features: impl IntoIterator<Item = &'f Feature>) -> Result<(), ExecutionError> {
    features
        .into_iter()
        .try_for_each(Feature::validate)
        .map_err(ExecutionError::from)
}

fn start_feature(feature: &Feature) -> FeatureResult {
    FeatureResult::start(
        &feature.name,
        feature.source.as_deref(),
        feature.line_number,
    )
}

/// Group a selection per feature in first-appearance order, dropping
/// duplicate scenarios.
fn group_by_feature<'a>(
    selection: &[ScenarioRef<'a>],
) -> Vec<(&'a Arc<Feature>, Vec<&'a Scenario>)> {
    let mut groups: Vec<(&Arc<Feature>, Vec<usize>)> = Vec::new();
    for item in selection {
        match groups
            .iter_mut()
            .find(|(feature, _)| Arc::ptr_eq(feature, item.feature))
        {
            Some((_, indices)) if indices.contains(&item.index) => {}
            Some((_, indices)) => indices.push(item.index),
            None => groups.push((item.feature, vec![item.index])),
        }
    }
    groups
        .into_iter()
        .map(|(feature, indices)| {
            let scenarios = indices
                .into_iter()
                .filter_map(|index| feature.scenarios.get(index))
                .collect();
            (feature, scenarios)
        })
        .collect()
}

fn finish<T: Finish>(mut result: T, status: Result<(), ExecutionError>) -> Executed<T> {
    if let Err(error) = &status {
        result.fail_with(error.to_string());
    }
    result.finish_now();
    (result, status)
}

fn abort(mut result: RunResult, error: ExecutionError) -> RunAborted {
    log::debug!("run `{}` aborted: {error}", result.name);
    result.fail(error.to_string());
    result.finish();
    RunAborted {
        error,
        partial: Box::new(result),
    }
}

/// Result levels an aborted frame closes before handing the error upward.
trait Finish {
    fn fail_with(&mut self, error: String);
    fn finish_now(&mut self);
}

impl Finish for FeatureResult {
    fn fail_with(&mut self, error: String) {
        self.fail(error);
    }

    fn finish_now(&mut self) {
        self.finish();
    }
}

impl Finish for ScenarioResult {
    fn fail_with(&mut self, error: String) {
        self.fail(error);
    }

    fn finish_now(&mut self) {
        self.finish();
    }
}
