//! Lifecycle hooks and asynchronous event listeners.
//!
//! The runtime announces ten phases. For each one it first hands an owned
//! [`Event`] snapshot to every [`EventListener`] on a bounded worker pool,
//! then calls every [`LifecycleHook`] synchronously on the running thread.
//! A hook returning [`HookError`] aborts the run; listener failures are only
//! logged.

mod hooks;
mod processor;
mod recorder;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::context::ScenarioContext;
use crate::model::{Feature, Scenario, Step};
use crate::results::{FeatureResult, RunResult, ScenarioResult, StepResult};

pub use hooks::{LoggingHook, TaggedHooks};
pub use processor::EventProcessor;
pub use recorder::JsonEventRecorder;

/// A transition in the life of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Before the first feature.
    RunStart,
    /// Before a feature's first iteration.
    FeatureStart,
    /// After the iteration's scenarios have been selected.
    FeatureIterationStart,
    /// Before a scenario's first step.
    ScenarioStart,
    /// Before a step's handler runs.
    StepStart,
    /// After a step and its nested steps finished.
    StepComplete,
    /// After a scenario's last step.
    ScenarioComplete,
    /// After every selected scenario of an iteration ran.
    FeatureIterationComplete,
    /// After a feature's last iteration.
    FeatureComplete,
    /// After the last feature.
    RunComplete,
}

impl Phase {
    /// Name of the phase as used in event payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RunStart => "runStart",
            Self::FeatureStart => "featureStart",
            Self::FeatureIterationStart => "featureIterationStart",
            Self::ScenarioStart => "scenarioStart",
            Self::StepStart => "stepStart",
            Self::StepComplete => "stepComplete",
            Self::ScenarioComplete => "scenarioComplete",
            Self::FeatureIterationComplete => "featureIterationComplete",
            Self::FeatureComplete => "featureComplete",
            Self::RunComplete => "runComplete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result attached to a completion phase.
#[derive(Debug, Clone, Copy)]
pub enum PhaseResult<'a> {
    /// [`Phase::StepComplete`].
    Step(&'a StepResult),
    /// [`Phase::ScenarioComplete`].
    Scenario(&'a ScenarioResult),
    /// [`Phase::FeatureIterationComplete`]: the iteration's scenario results.
    Iteration(&'a [ScenarioResult]),
    /// [`Phase::FeatureComplete`].
    Feature(&'a FeatureResult),
    /// [`Phase::RunComplete`].
    Run(&'a RunResult),
}

/// Read-only view of the run at a phase transition.
///
/// Fields not relevant to a phase are left empty.
#[derive(Debug, Clone, Copy)]
pub struct PhaseContext<'a> {
    /// The phase being announced.
    pub phase: Phase,
    /// When the phase was reached.
    pub time: DateTime<Utc>,
    /// Run name.
    pub run: &'a str,
    /// Tags the run was selected with.
    pub tags: &'a [String],
    /// Current feature.
    pub feature: Option<&'a Feature>,
    /// Current zero-based iteration.
    pub iteration: Option<u32>,
    /// Scenarios selected for the current iteration.
    pub selected: &'a [&'a Scenario],
    /// Current scenario.
    pub scenario: Option<&'a Scenario>,
    /// Current step.
    pub step: Option<&'a Step>,
    /// Result of a completion phase.
    pub result: Option<PhaseResult<'a>>,
}

impl<'a> PhaseContext<'a> {
    /// Context for `phase` of `run` with every optional field empty.
    #[must_use]
    pub fn new(phase: Phase, run: &'a str) -> Self {
        Self {
            phase,
            time: Utc::now(),
            run,
            tags: &[],
            feature: None,
            iteration: None,
            selected: &[],
            scenario: None,
            step: None,
            result: None,
        }
    }

    /// Tags of the current scenario and its feature, scenario tags first.
    pub fn tags_in_scope(&self) -> impl Iterator<Item = &'a str> {
        let scenario = self.scenario.into_iter().flat_map(|s| s.tags.iter());
        let feature = self.feature.into_iter().flat_map(|f| f.tags.iter());
        scenario.chain(feature).map(String::as_str)
    }
}

/// A hook rejected a phase transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HookError {
    message: String,
}

impl HookError {
    /// Create an error with `message`.
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Result type of every hook callback.
pub type HookResult = Result<(), HookError>;

/// Synchronous callbacks around every phase transition.
///
/// Every method defaults to doing nothing. Scenario and step phases also
/// receive the live [`ScenarioContext`] so hooks can prepare state for the
/// steps that follow.
#[expect(unused_variables, reason = "default callbacks ignore their arguments")]
pub trait LifecycleHook: Send + Sync {
    /// Called before the first feature.
    fn run_start(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Ok(())
    }

    /// Called before a feature's first iteration.
    fn feature_start(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Ok(())
    }

    /// Called once the iteration's scenarios are selected.
    fn feature_iteration_start(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Ok(())
    }

    /// Called before a scenario's first step.
    fn scenario_start(&self, ctx: &PhaseContext<'_>, state: &mut ScenarioContext) -> HookResult {
        Ok(())
    }

    /// Called before a step's handler runs.
    fn step_start(&self, ctx: &PhaseContext<'_>, state: &mut ScenarioContext) -> HookResult {
        Ok(())
    }

    /// Called after a step finished.
    fn step_complete(&self, ctx: &PhaseContext<'_>, state: &mut ScenarioContext) -> HookResult {
        Ok(())
    }

    /// Called after a scenario's last step.
    fn scenario_complete(&self, ctx: &PhaseContext<'_>, state: &mut ScenarioContext) -> HookResult {
        Ok(())
    }

    /// Called after an iteration's scenarios ran.
    fn feature_iteration_complete(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Ok(())
    }

    /// Called after a feature's last iteration.
    fn feature_complete(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Ok(())
    }

    /// Called after the last feature.
    fn run_complete(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Ok(())
    }
}

/// An owned copy of a phase result, safe to hand to another thread.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EventResult {
    /// Step result.
    Step(StepResult),
    /// Scenario result.
    Scenario(ScenarioResult),
    /// Scenario results of one iteration.
    Iteration(Vec<ScenarioResult>),
    /// Feature result.
    Feature(FeatureResult),
    /// Run result.
    Run(RunResult),
}

impl From<PhaseResult<'_>> for EventResult {
    fn from(result: PhaseResult<'_>) -> Self {
        match result {
            PhaseResult::Step(r) => Self::Step(r.clone()),
            PhaseResult::Scenario(r) => Self::Scenario(r.clone()),
            PhaseResult::Iteration(r) => Self::Iteration(r.to_vec()),
            PhaseResult::Feature(r) => Self::Feature(r.clone()),
            PhaseResult::Run(r) => Self::Run(r.clone()),
        }
    }
}

/// Immutable snapshot of a phase transition delivered to listeners.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// The phase.
    pub phase: Phase,
    /// When the phase was reached.
    pub time: DateTime<Utc>,
    /// Run name.
    pub run: String,
    /// Tags the run was selected with.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Feature name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    /// Zero-based iteration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_index: Option<u32>,
    /// Names of the scenarios selected for the iteration.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scenarios: Vec<String>,
    /// Scenario name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    /// Step identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    /// Result of a completion phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<EventResult>,
}

impl From<&PhaseContext<'_>> for Event {
    fn from(ctx: &PhaseContext<'_>) -> Self {
        Self {
            phase: ctx.phase,
            time: ctx.time,
            run: ctx.run.to_owned(),
            tags: ctx.tags.to_vec(),
            feature: ctx.feature.map(|f| f.name.clone()),
            iteration_index: ctx.iteration,
            scenarios: ctx.selected.iter().map(|s| s.name.clone()).collect(),
            scenario: ctx.scenario.map(|s| s.name.clone()),
            step: ctx.step.map(|s| s.identifier.clone()),
            result: ctx.result.map(EventResult::from),
        }
    }
}

/// Receiver of asynchronous event snapshots.
///
/// Listeners run on worker threads and must not assume any ordering with
/// respect to the running scenario. Panics are caught and logged.
pub trait EventListener: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &Event);
}

impl<F> EventListener for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn on_event(&self, event: &Event) {
        self(event);
    }
}

#[cfg(test)]
mod tests;
