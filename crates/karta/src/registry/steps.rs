//! Explicit registry of step identifiers and handlers.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use hashbrown::HashSet;
use karta_patterns::{Parameter, PatternError, StepIdentifier};
use parking_lot::Mutex;

use super::{IntoStepOutcome, StepError, StepReturn, StepRunner};
use crate::context::ScenarioContext;
use crate::model::Step;

/// Type-erased step handler.
pub type StepHandler =
    Arc<dyn Fn(&mut ScenarioContext, &[Parameter]) -> Result<StepReturn, StepError> + Send + Sync>;

/// A registered step.
#[derive(Clone)]
pub struct StepDefinition {
    identifier: StepIdentifier,
    handler: StepHandler,
    location: &'static Location<'static>,
}

impl StepDefinition {
    /// Pattern the step was registered with.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.identifier.source()
    }

    /// Compiled identifier.
    #[must_use]
    pub fn identifier(&self) -> &StepIdentifier {
        &self.identifier
    }

    /// Source file of the registration call.
    #[must_use]
    pub fn file(&self) -> &'static str {
        self.location.file()
    }

    /// Line of the registration call.
    #[must_use]
    pub fn line(&self) -> u32 {
        self.location.line()
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("pattern", &self.pattern())
            .field("file", &self.file())
            .field("line", &self.line())
            .finish_non_exhaustive()
    }
}

/// Ordered table of step definitions.
///
/// Lookups try definitions in registration order and the first match wins.
/// The registry remembers which definitions ran so unused ones can be
/// reported after a run.
///
/// # Examples
/// ```
/// use karta::{ScenarioContext, StepRegistry, StepRunner};
///
/// let mut registry = StepRegistry::new();
/// registry
///     .register("I have {int} apples", |ctx: &mut ScenarioContext, args: &[karta_patterns::Parameter]| {
///         ctx.insert("apples", args.first().and_then(|a| a.as_i64()));
///     })
///     .unwrap();
/// assert!(registry.is_step_available("I have 3 apples"));
/// assert!(!registry.is_step_available("I have many apples"));
/// ```
#[derive(Default)]
pub struct StepRegistry {
    definitions: Vec<StepDefinition>,
    used: Mutex<HashSet<usize>>,
}

impl StepRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for steps matching `pattern`.
    ///
    /// The call site is recorded for diagnostics.
    ///
    /// # Errors
    /// Returns [`PatternError`] when `pattern` does not compile.
    #[track_caller]
    pub fn register<F, R>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, PatternError>
    where
        F: Fn(&mut ScenarioContext, &[Parameter]) -> R + Send + Sync + 'static,
        R: IntoStepOutcome,
    {
        let location = Location::caller();
        let identifier = StepIdentifier::compile(pattern)?;
        log::debug!(
            "registered step `{pattern}` at {}:{}",
            location.file(),
            location.line()
        );
        self.definitions.push(StepDefinition {
            identifier,
            handler: Arc::new(move |ctx: &mut ScenarioContext, args: &[Parameter]| {
                handler(ctx, args).into_outcome()
            }),
            location,
        });
        Ok(self)
    }

    /// First definition matching `text`, with its extracted parameters.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<(&StepDefinition, Vec<Parameter>)> {
        self.lookup(text)
            .map(|(_, definition, params)| (definition, params))
    }

    /// Every definition in registration order.
    #[must_use]
    pub fn definitions(&self) -> &[StepDefinition] {
        &self.definitions
    }

    /// Definitions that have not run since the registry was created.
    #[must_use]
    pub fn unused_steps(&self) -> Vec<&StepDefinition> {
        let used = self.used.lock();
        self.definitions
            .iter()
            .enumerate()
            .filter(|(index, _)| !used.contains(index))
            .map(|(_, definition)| definition)
            .collect()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether no definitions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn lookup(&self, text: &str) -> Option<(usize, &StepDefinition, Vec<Parameter>)> {
        let text = text.trim();
        self.definitions
            .iter()
            .enumerate()
            .find_map(|(index, definition)| {
                definition
                    .identifier
                    .matches(text)
                    .map(|params| (index, definition, params))
            })
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("definitions", &self.definitions)
            .finish_non_exhaustive()
    }
}

impl StepRunner for StepRegistry {
    fn is_step_available(&self, identifier: &str) -> bool {
        self.lookup(identifier).is_some()
    }

    fn run_step(
        &self,
        step: &Step,
        context: &mut ScenarioContext,
    ) -> Result<StepReturn, StepError> {
        let Some((index, definition, params)) = self.lookup(&step.identifier) else {
            return Err(StepError::NotFound(step.identifier.clone()));
        };
        self.used.lock().insert(index);
        (definition.handler)(context, &params)
    }

    fn steps(&self) -> Vec<String> {
        self.definitions
            .iter()
            .map(|d| d.pattern().to_owned())
            .collect()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests register fixed patterns")]
mod tests {
    use super::*;
    use karta_patterns::Conjunction;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn registry() -> StepRegistry {
        let mut registry = StepRegistry::new();
        registry
            .register("I have {int} {word}", |ctx: &mut ScenarioContext, args: &[Parameter]| {
                let count = args.first().and_then(Parameter::as_i64);
                ctx.insert("count", count);
            })
            .unwrap()
            .register("I have {int} apples", |_: &mut ScenarioContext, _: &[Parameter]| false)
            .unwrap()
            .register("it fails", |_: &mut ScenarioContext, _: &[Parameter]| {
                Err::<(), _>("nope")
            })
            .unwrap();
        registry
    }

    #[rstest]
    fn first_registered_match_wins(registry: StepRegistry) {
        let mut ctx = ScenarioContext::new("f", "s", 0);
        let step = Step::new(Conjunction::Given, "I have 3 apples");
        let outcome = registry.run_step(&step, &mut ctx).unwrap();
        assert_eq!(outcome, StepReturn::Unit);
        assert_eq!(ctx.get("count"), Some(&json!(3)));
    }

    #[rstest]
    fn reports_unused_definitions(registry: StepRegistry) {
        let mut ctx = ScenarioContext::new("f", "s", 0);
        registry
            .run_step(&Step::new(Conjunction::Given, " I have 1 pear "), &mut ctx)
            .unwrap();
        let unused: Vec<_> = registry.unused_steps().iter().map(|d| d.pattern()).collect();
        assert_eq!(unused, ["I have {int} apples", "it fails"]);
    }

    #[rstest]
    fn handler_errors_are_returned(registry: StepRegistry) {
        let mut ctx = ScenarioContext::new("f", "s", 0);
        let err = registry
            .run_step(&Step::new(Conjunction::Then, "it fails"), &mut ctx)
            .unwrap_err();
        assert_eq!(err, StepError::Failed("nope".into()));
    }

    #[rstest]
    fn unknown_steps_are_not_found(registry: StepRegistry) {
        let mut ctx = ScenarioContext::new("f", "s", 0);
        assert!(!registry.is_step_available("something else"));
        let err = registry
            .run_step(&Step::new(Conjunction::Then, "something else"), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, StepError::NotFound(_)));
    }

    #[rstest]
    fn records_registration_site(registry: StepRegistry) {
        let first = registry.definitions().first().unwrap();
        assert!(first.file().ends_with("steps.rs"));
        assert!(first.line() > 0);
        assert_eq!(registry.steps().len(), 3);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn rejects_malformed_patterns() {
        let mut registry = StepRegistry::new();
        let result = registry.register("bad {nope}", |_: &mut ScenarioContext, _: &[Parameter]| ());
        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
