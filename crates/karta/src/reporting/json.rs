//! JSON writer for run results.
//!
//! The report keeps status labels in lowercase and durations in whole
//! milliseconds so downstream tools can rely on a stable shape. Step data is
//! left out; serialize the [`RunResult`] itself for the full tree.

use std::io::Write;

use serde::Serialize;

use super::Status;
use crate::results::{FeatureResult, Outcome, RunResult, ScenarioResult, StepResult};

#[derive(Serialize)]
struct JsonReport<'a> {
    run: &'a str,
    seed: u64,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    features: Vec<JsonFeature<'a>>,
}

#[derive(Serialize)]
struct JsonFeature<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    line: usize,
    status: &'static str,
    iterations: u32,
    failed_iterations: Vec<u32>,
    scenarios: Vec<JsonScenario<'a>>,
}

#[derive(Serialize)]
struct JsonScenario<'a> {
    name: &'a str,
    line: usize,
    iteration: u32,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    steps: Vec<JsonStep<'a>>,
}

#[derive(Serialize)]
struct JsonStep<'a> {
    name: &'a str,
    line: usize,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    steps: Vec<JsonStep<'a>>,
}

fn status(outcome: &Outcome) -> &'static str {
    Status::from(outcome).label()
}

fn millis(outcome: &Outcome) -> Option<i64> {
    outcome.duration().map(|d| d.num_milliseconds())
}

impl<'a> From<&'a RunResult> for JsonReport<'a> {
    fn from(run: &'a RunResult) -> Self {
        Self {
            run: &run.name,
            seed: run.seed,
            status: status(&run.outcome),
            duration_ms: millis(&run.outcome),
            error: run.outcome.error.as_deref(),
            features: run.feature_results.iter().map(JsonFeature::from).collect(),
        }
    }
}

impl<'a> From<&'a FeatureResult> for JsonFeature<'a> {
    fn from(feature: &'a FeatureResult) -> Self {
        Self {
            name: &feature.name,
            source: feature.source.as_deref(),
            line: feature.line_number,
            status: status(&feature.outcome),
            iterations: feature.iterations_count,
            failed_iterations: feature.failed_iterations.iter().copied().collect(),
            scenarios: feature.scenario_results.iter().map(JsonScenario::from).collect(),
        }
    }
}

impl<'a> From<&'a ScenarioResult> for JsonScenario<'a> {
    fn from(scenario: &'a ScenarioResult) -> Self {
        Self {
            name: &scenario.name,
            line: scenario.line_number,
            iteration: scenario.iteration_index,
            status: status(&scenario.outcome),
            duration_ms: millis(&scenario.outcome),
            error: scenario.error(),
            steps: scenario.step_results.iter().map(JsonStep::from).collect(),
        }
    }
}

impl<'a> From<&'a StepResult> for JsonStep<'a> {
    fn from(step: &'a StepResult) -> Self {
        Self {
            name: &step.name,
            line: step.line_number,
            status: status(&step.outcome),
            error: step.error(),
            steps: step.step_results.iter().map(JsonStep::from).collect(),
        }
    }
}

/// Serialize `run` into the supplied writer.
///
/// # Examples
/// ```rust
/// use karta::reporting::json;
/// use karta::results::RunResult;
///
/// let mut buffer = Vec::new();
/// json::write(&mut buffer, &RunResult::start("nightly", 7)).unwrap();
/// let output = String::from_utf8(buffer).unwrap();
/// assert!(output.contains("\"status\":\"passed\""));
/// ```
///
/// # Errors
/// Returns an error when writing to `writer` fails.
pub fn write<W: Write>(writer: &mut W, run: &RunResult) -> serde_json::Result<()> {
    serde_json::to_writer(writer, &JsonReport::from(run))
}

/// Produce the JSON report of `run` as a string.
///
/// # Errors
/// Returns an error when serialization fails.
pub fn to_string(run: &RunResult) -> serde_json::Result<String> {
    serde_json::to_string(&JsonReport::from(run))
}

/// Produce the JSON report of `run` as an indented string.
///
/// # Errors
/// Returns an error when serialization fails.
pub fn to_string_pretty(run: &RunResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonReport::from(run))
}
