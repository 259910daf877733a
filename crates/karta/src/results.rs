//! Result tree produced by a run.
//!
//! Results are created fresh for every execution pass and mutated only by
//! the frame that owns them. A node's `successful` flag starts true and can
//! only ever be cleared: by recording an error on the node or by adding an
//! unsuccessful child. The first error seen is kept.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::Step;

/// Shared bookkeeping for every result level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// When execution started.
    pub start_time: DateTime<Utc>,
    /// When execution finished; unset while running.
    pub end_time: Option<DateTime<Utc>>,
    /// Whether the node and all its children succeeded.
    pub successful: bool,
    /// First error recorded on the node or a child.
    pub error: Option<String>,
}

impl Outcome {
    fn started() -> Self {
        Self {
            start_time: Utc::now(),
            end_time: None,
            successful: true,
            error: None,
        }
    }

    /// Mark the node failed, keeping an earlier error.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.successful = false;
        if self.error.is_none() {
            self.error = Some(error.into());
        }
    }

    fn absorb(&mut self, child: &Self) {
        if child.successful {
            return;
        }
        self.successful = false;
        if self.error.is_none() {
            self.error.clone_from(&child.error);
        }
    }

    fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    /// Elapsed time once finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time.map(|end| end - self.start_time)
    }
}

/// Outcome of one step, including nested steps of conditions and loops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step identifier text.
    pub name: String,
    /// Source of the step.
    pub source: Option<String>,
    /// Line of the step.
    pub line_number: usize,
    /// Timing, success and error.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Data returned by the step handler.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub results: Map<String, Value>,
    /// Results of nested steps, in execution order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub step_results: Vec<StepResult>,
}

impl StepResult {
    /// Start a result for `step`.
    #[must_use]
    pub fn start(step: &Step) -> Self {
        Self {
            name: step.identifier.clone(),
            source: step.source.clone(),
            line_number: step.line_number,
            outcome: Outcome::started(),
            results: Map::new(),
            step_results: Vec::new(),
        }
    }

    /// Append a nested result, propagating failure.
    pub fn add_step_result(&mut self, child: Self) {
        self.outcome.absorb(&child.outcome);
        self.step_results.push(child);
    }

    /// Mark the step failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.outcome.fail(error);
    }

    /// Record the end time.
    pub fn finish(&mut self) {
        self.outcome.finish();
    }

    /// Whether the step and its nested steps succeeded.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.outcome.successful
    }

    /// First recorded error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.outcome.error.as_deref()
    }
}

/// Outcome of one scenario execution in one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    /// Scenario name.
    pub name: String,
    /// Source of the scenario.
    pub source: Option<String>,
    /// Line of the scenario.
    pub line_number: usize,
    /// Zero-based feature iteration the scenario ran in.
    pub iteration_index: u32,
    /// Timing, success and error.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Results of background, setup, body and teardown steps in order.
    #[serde(default)]
    pub step_results: Vec<StepResult>,
}

impl ScenarioResult {
    /// Start a result for a scenario.
    #[must_use]
    pub fn start(
        name: impl Into<String>,
        source: Option<&str>,
        line_number: usize,
        iteration_index: u32,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.map(str::to_owned),
            line_number,
            iteration_index,
            outcome: Outcome::started(),
            step_results: Vec::new(),
        }
    }

    /// Append a step result, propagating failure.
    pub fn add_step_result(&mut self, child: StepResult) {
        self.outcome.absorb(&child.outcome);
        self.step_results.push(child);
    }

    /// Mark the scenario failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.outcome.fail(error);
    }

    /// Record the end time.
    pub fn finish(&mut self) {
        self.outcome.finish();
    }

    /// Whether every step succeeded.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.outcome.successful
    }

    /// First recorded error.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.outcome.error.as_deref()
    }
}

/// Outcome of every iteration of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureResult {
    /// Feature name.
    pub name: String,
    /// Source of the feature.
    pub source: Option<String>,
    /// Line of the feature.
    pub line_number: usize,
    /// Timing, success and error.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Iterations started.
    pub iterations_count: u32,
    /// Iterations in which at least one scenario failed.
    #[serde(default)]
    pub failed_iterations: BTreeSet<u32>,
    /// Scenario results across all iterations, in execution order.
    #[serde(default)]
    pub scenario_results: Vec<ScenarioResult>,
}

impl FeatureResult {
    /// Start a result for a feature.
    #[must_use]
    pub fn start(name: impl Into<String>, source: Option<&str>, line_number: usize) -> Self {
        Self {
            name: name.into(),
            source: source.map(str::to_owned),
            line_number,
            outcome: Outcome::started(),
            iterations_count: 0,
            failed_iterations: BTreeSet::new(),
            scenario_results: Vec::new(),
        }
    }

    /// Append a scenario result, recording its iteration when it failed.
    pub fn add_scenario_result(&mut self, child: ScenarioResult) {
        if !child.is_successful() {
            self.failed_iterations.insert(child.iteration_index);
        }
        self.outcome.absorb(&child.outcome);
        self.scenario_results.push(child);
    }

    /// Mark the feature failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.outcome.fail(error);
    }

    /// Record the end time.
    pub fn finish(&mut self) {
        self.outcome.finish();
    }

    /// Whether every scenario in every iteration succeeded.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.outcome.successful
    }

    /// Results of the scenarios run in `iteration`.
    pub fn iteration(&self, iteration: u32) -> impl Iterator<Item = &ScenarioResult> {
        self.scenario_results
            .iter()
            .filter(move |s| s.iteration_index == iteration)
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Run name.
    pub name: String,
    /// Seed of the random source, for replaying the run.
    pub seed: u64,
    /// Timing, success and error.
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Feature results in execution order.
    #[serde(default)]
    pub feature_results: Vec<FeatureResult>,
}

impl RunResult {
    /// Start a run result.
    #[must_use]
    pub fn start(name: impl Into<String>, seed: u64) -> Self {
        Self {
            name: name.into(),
            seed,
            outcome: Outcome::started(),
            feature_results: Vec::new(),
        }
    }

    /// Append a feature result, propagating failure.
    pub fn add_feature_result(&mut self, child: FeatureResult) {
        self.outcome.absorb(&child.outcome);
        self.feature_results.push(child);
    }

    /// Mark the run failed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.outcome.fail(error);
    }

    /// Record the end time.
    pub fn finish(&mut self) {
        self.outcome.finish();
    }

    /// Whether every feature succeeded.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.outcome.successful
    }

    /// Every scenario result of every feature.
    pub fn scenario_results(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.feature_results
            .iter()
            .flat_map(|f| f.scenario_results.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use karta_patterns::Conjunction;

    fn step(name: &str) -> StepResult {
        StepResult::start(&Step::new(Conjunction::Given, name))
    }

    #[test]
    fn first_child_error_wins_and_success_never_returns() {
        let mut parent = step("parent");
        let mut first = step("first");
        first.fail("first failure");
        let mut second = step("second");
        second.fail("second failure");
        parent.add_step_result(first);
        parent.add_step_result(second);
        parent.add_step_result(step("passing"));
        assert!(!parent.is_successful());
        assert_eq!(parent.error(), Some("first failure"));
        assert_eq!(parent.step_results.len(), 3);
    }

    #[test]
    fn own_error_is_not_overwritten_by_children() {
        let mut parent = step("parent");
        parent.fail("own");
        let mut child = step("child");
        child.fail("child");
        parent.add_step_result(child);
        assert_eq!(parent.error(), Some("own"));
    }

    #[test]
    fn feature_records_failed_iterations() {
        let mut feature = FeatureResult::start("f", None, 1);
        feature.add_scenario_result(ScenarioResult::start("a", None, 2, 0));
        let mut failing = ScenarioResult::start("b", None, 5, 3);
        failing.fail("broken");
        feature.add_scenario_result(failing);
        assert!(!feature.is_successful());
        assert_eq!(feature.failed_iterations, BTreeSet::from([3]));
        assert_eq!(feature.iteration(3).count(), 1);

        let mut run = RunResult::start("run", 9);
        run.add_feature_result(feature);
        assert_eq!(run.outcome.error.as_deref(), Some("broken"));
        assert_eq!(run.scenario_results().count(), 2);
    }

    #[test]
    fn serializes_flattened_outcome() {
        let mut result = ScenarioResult::start("s", Some("a.feature"), 4, 1);
        result.finish();
        let json = serde_json::to_value(&result).unwrap_or_default();
        assert_eq!(json.get("successful"), Some(&Value::Bool(true)));
        assert_eq!(json.get("iteration_index"), Some(&Value::from(1)));
        assert!(json.get("end_time").is_some_and(|v| !v.is_null()));
        assert!(result.outcome.duration().is_some());
    }
}
