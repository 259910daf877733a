//! Compiled feature tree.
//!
//! Features are produced once per source file by the Kriya parser or by
//! deserializing their structured form, validated, and then shared read-only
//! with the runtime. Source locations are assigned at parse time.

mod validate;

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use karta_patterns::{Conjunction, StepType};
use serde::{Deserialize, Serialize};

use crate::data::DataValue;

pub use validate::ValidationError;

/// Rule deciding which scenarios run in each feature iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IterationPolicy {
    /// Every scenario runs every iteration.
    #[default]
    AllPerIteration,
    /// Exactly one scenario, picked by weighted mutex draw.
    OnePerIteration,
    /// Each scenario runs on its own independent draw.
    SomePerIteration,
}

impl IterationPolicy {
    /// Phrase used for the policy in Kriya source.
    #[must_use]
    pub const fn as_phrase(&self) -> &'static str {
        match self {
            Self::AllPerIteration => "all scenario per iteration",
            Self::OnePerIteration => "one scenario per iteration",
            Self::SomePerIteration => "some scenario per iteration",
        }
    }
}

impl fmt::Display for IterationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_phrase())
    }
}

/// Error returned when an iteration policy phrase is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationPolicyParseError(pub String);

impl fmt::Display for IterationPolicyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown iteration policy: {}", self.0)
    }
}

impl std::error::Error for IterationPolicyParseError {}

impl FromStr for IterationPolicy {
    type Err = IterationPolicyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalised = value
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|word| !word.is_empty())
            .map(str::to_ascii_lowercase)
            .collect::<Vec<_>>()
            .join(" ");
        match normalised.as_str() {
            "all scenario per iteration" | "all per iteration" | "all" => {
                Ok(Self::AllPerIteration)
            }
            "one scenario per iteration" | "one per iteration" | "one" => {
                Ok(Self::OnePerIteration)
            }
            "some scenario per iteration" | "some per iteration" | "some" => {
                Ok(Self::SomePerIteration)
            }
            _ => Err(IterationPolicyParseError(value.trim().to_string())),
        }
    }
}

/// Structural body of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepKind {
    /// A plain step with no nested block.
    Step,
    /// Runs `steps` once when the guard handler is truthy.
    Condition {
        /// Nested block.
        steps: Vec<Step>,
    },
    /// Repeats `steps` while the guard handler stays truthy.
    Loop {
        /// Nested block.
        steps: Vec<Step>,
    },
}

impl StepKind {
    /// Step type tag for this body.
    #[must_use]
    pub fn step_type(&self) -> StepType {
        match self {
            Self::Step => StepType::Step,
            Self::Condition { .. } => StepType::Condition,
            Self::Loop { .. } => StepType::Loop,
        }
    }

    /// Nested steps; empty for plain steps.
    #[must_use]
    pub fn nested(&self) -> &[Step] {
        match self {
            Self::Step => &[],
            Self::Condition { steps } | Self::Loop { steps } => steps,
        }
    }

    fn nested_mut(&mut self) -> Option<&mut Vec<Step>> {
        match self {
            Self::Step => None,
            Self::Condition { steps } | Self::Loop { steps } => Some(steps),
        }
    }
}

/// One action, assertion or control-flow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Textual prefix of the step line.
    pub conjunction: Conjunction,
    /// Step text matched against registered identifiers.
    pub identifier: String,
    /// Data materialised into the scenario context before the handler runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_rules: Option<DataValue>,
    /// Doc string attached to the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_string: Option<String>,
    /// Plain step, condition or loop.
    #[serde(flatten)]
    pub kind: StepKind,
    /// Source the step was parsed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// One-based line of the step in its source.
    #[serde(default)]
    pub line_number: usize,
}

impl Step {
    /// Create a plain step.
    #[must_use]
    pub fn new(conjunction: Conjunction, identifier: impl Into<String>) -> Self {
        Self {
            conjunction,
            identifier: identifier.into(),
            data_rules: None,
            doc_string: None,
            kind: StepKind::Step,
            source: None,
            line_number: 0,
        }
    }

    /// Replace the body with a condition block.
    #[must_use]
    pub fn with_condition(mut self, steps: Vec<Self>) -> Self {
        self.kind = StepKind::Condition { steps };
        self
    }

    /// Replace the body with a loop block.
    #[must_use]
    pub fn with_loop(mut self, steps: Vec<Self>) -> Self {
        self.kind = StepKind::Loop { steps };
        self
    }

    /// Attach data rules.
    #[must_use]
    pub fn with_data(mut self, rules: DataValue) -> Self {
        self.data_rules = Some(rules);
        self
    }

    /// Set the source location.
    #[must_use]
    pub fn at(mut self, source: Option<&str>, line_number: usize) -> Self {
        self.source = source.map(str::to_owned);
        self.line_number = line_number;
        self
    }

    /// Step type of this step.
    #[must_use]
    pub fn step_type(&self) -> StepType {
        self.kind.step_type()
    }

    /// Nested steps of a condition or loop.
    #[must_use]
    pub fn nested(&self) -> &[Self] {
        self.kind.nested()
    }

    /// Apply `f` to this step and every nested step, depth first.
    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut Self)) {
        f(self);
        if let Some(children) = self.kind.nested_mut() {
            for child in children {
                child.visit_mut(f);
            }
        }
    }

    /// Call `f` on this step and every nested step, depth first.
    pub fn visit(&self, f: &mut dyn FnMut(&Self)) {
        f(self);
        for child in self.nested() {
            child.visit(f);
        }
    }
}

fn default_probability() -> f64 {
    1.0
}

fn is_certain(probability: &f64) -> bool {
    probability.total_cmp(&1.0).is_eq()
}

/// One executable test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags without the leading `@`.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Steps run after the background and before [`Self::steps`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub setup_steps: Vec<Step>,
    /// Ordered scenario body.
    pub steps: Vec<Step>,
    /// Steps always run after the body.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teardown_steps: Vec<Step>,
    /// Selection probability in `(0, 1]`.
    #[serde(default = "default_probability", skip_serializing_if = "is_certain")]
    pub probability: f64,
    /// Source the scenario was parsed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// One-based line of the scenario keyword.
    #[serde(default)]
    pub line_number: usize,
}

impl Scenario {
    /// Create a scenario with the given steps and default probability.
    #[must_use]
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            description: None,
            tags: BTreeSet::new(),
            setup_steps: Vec::new(),
            steps,
            teardown_steps: Vec::new(),
            probability: default_probability(),
            source: None,
            line_number: 0,
        }
    }

    /// Set the selection probability.
    #[must_use]
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    /// Add tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Check the scenario's own invariants.
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the probability is outside `(0, 1]`,
    /// the body is empty, or a step is malformed.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::scenario(self)
    }
}

fn default_iterations() -> u32 {
    1
}

fn is_single(iterations: &u32) -> bool {
    *iterations == 1
}

/// Top-level test unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Feature name.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags without the leading `@`.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
    /// Steps prepended to every scenario.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub background: Vec<Step>,
    /// Scenarios in declaration order.
    pub scenarios: Vec<Scenario>,
    /// Number of iterations, at least one.
    #[serde(default = "default_iterations", skip_serializing_if = "is_single")]
    pub iterations: u32,
    /// Scenario selection rule applied every iteration.
    #[serde(default)]
    pub iteration_policy: IterationPolicy,
    /// Source the feature was parsed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// One-based line of the `Feature:` keyword.
    #[serde(default)]
    pub line_number: usize,
}

impl Feature {
    /// Create a feature with default iteration settings.
    #[must_use]
    pub fn new(name: impl Into<String>, scenarios: Vec<Scenario>) -> Self {
        Self {
            name: name.into(),
            description: None,
            tags: BTreeSet::new(),
            background: Vec::new(),
            scenarios,
            iterations: default_iterations(),
            iteration_policy: IterationPolicy::default(),
            source: None,
            line_number: 0,
        }
    }

    /// Set the iteration count and policy.
    #[must_use]
    pub fn with_iterations(mut self, iterations: u32, policy: IterationPolicy) -> Self {
        self.iterations = iterations;
        self.iteration_policy = policy;
        self
    }

    /// Set the background steps.
    #[must_use]
    pub fn with_background(mut self, background: Vec<Step>) -> Self {
        self.background = background;
        self
    }

    /// Check every feature-level invariant, including those of each scenario.
    ///
    /// # Errors
    /// Returns [`ValidationError`] for the first violated invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate::feature(self)
    }

    /// Look up a scenario by name.
    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Record `source` on the feature and everything beneath it that has
    /// no source yet.
    pub fn assign_source(&mut self, source: &str) {
        fn fill(slot: &mut Option<String>, source: &str) {
            if slot.is_none() {
                *slot = Some(source.to_owned());
            }
        }
        fn fill_steps(steps: &mut [Step], source: &str) {
            for step in steps {
                step.visit_mut(&mut |s| fill(&mut s.source, source));
            }
        }
        fill(&mut self.source, source);
        fill_steps(&mut self.background, source);
        for scenario in &mut self.scenarios {
            fill(&mut scenario.source, source);
            fill_steps(&mut scenario.setup_steps, source);
            fill_steps(&mut scenario.steps, source);
            fill_steps(&mut scenario.teardown_steps, source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("all scenario per iteration", IterationPolicy::AllPerIteration)]
    #[case("One Scenario Per Iteration", IterationPolicy::OnePerIteration)]
    #[case("SOME_PER_ITERATION", IterationPolicy::SomePerIteration)]
    #[case("  some  ", IterationPolicy::SomePerIteration)]
    fn parses_policy_phrases(#[case] input: &str, #[case] expected: IterationPolicy) {
        assert_eq!(input.parse::<IterationPolicy>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_policy() {
        assert_eq!(
            "every scenario".parse::<IterationPolicy>(),
            Err(IterationPolicyParseError("every scenario".into()))
        );
    }

    #[test]
    fn assign_source_reaches_nested_steps() {
        let nested = Step::new(Conjunction::Then, "inner");
        let guard = Step::new(Conjunction::If, "guard").with_condition(vec![nested]);
        let mut feature = Feature::new("f", vec![Scenario::new("s", vec![guard])]);
        feature.assign_source("demo.kriya");
        let Some(scenario) = feature.scenarios.first() else {
            panic!("scenario expected");
        };
        let mut sources = Vec::new();
        for step in &scenario.steps {
            step.visit(&mut |s| sources.push(s.source.clone()));
        }
        assert_eq!(
            sources,
            vec![Some("demo.kriya".to_string()), Some("demo.kriya".to_string())]
        );
    }

    #[test]
    fn assign_source_keeps_existing_sources() {
        let step = Step::new(Conjunction::Given, "x").at(Some("other.kriya"), 4);
        let mut feature = Feature::new("f", vec![Scenario::new("s", vec![step])]);
        feature.assign_source("demo.kriya");
        let kept = feature
            .scenarios
            .first()
            .and_then(|s| s.steps.first())
            .and_then(|s| s.source.as_deref());
        assert_eq!(kept, Some("other.kriya"));
    }

    #[test]
    fn serializes_step_type_tags() {
        let step = Step::new(Conjunction::While, "more").with_loop(vec![Step::new(
            Conjunction::Then,
            "again",
        )]);
        let Ok(value) = serde_json::to_value(&step) else {
            panic!("step should serialize");
        };
        assert_eq!(value.get("type"), Some(&serde_json::json!("LOOP")));
        assert_eq!(value.get("conjunction"), Some(&serde_json::json!("While")));
    }
}
