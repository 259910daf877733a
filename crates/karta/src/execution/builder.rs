//! Runtime construction.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::Runtime;
use crate::config::RuntimeConfig;
use crate::data::SeededRng;
use crate::events::{EventListener, EventProcessor, LifecycleHook};
use crate::registry::StepRunner;

/// Collects step runners, hooks, listeners and settings for a [`Runtime`].
///
/// The seed is resolved in this order: [`RuntimeBuilder::with_seed`], the
/// configuration's seed (see [`RuntimeConfig::from_env`]), then entropy.
#[derive(Default)]
pub struct RuntimeBuilder {
    runners: Vec<Arc<dyn StepRunner>>,
    hooks: Vec<Arc<dyn LifecycleHook>>,
    listeners: Vec<Arc<dyn EventListener>>,
    seed: Option<u64>,
    config: Option<RuntimeConfig>,
    properties: Map<String, Value>,
}

impl RuntimeBuilder {
    /// Add a step runner. Runners are consulted in the order added.
    #[must_use]
    pub fn with_step_runner(self, runner: impl StepRunner + 'static) -> Self {
        self.with_shared_step_runner(Arc::new(runner))
    }

    /// Add a step runner that is also used elsewhere, for example to inspect
    /// [`StepRegistry::unused_steps`](crate::StepRegistry::unused_steps)
    /// after a run.
    #[must_use]
    pub fn with_shared_step_runner(mut self, runner: Arc<dyn StepRunner>) -> Self {
        self.runners.push(runner);
        self
    }

    /// Add a lifecycle hook. Hooks are called in the order added.
    #[must_use]
    pub fn with_hook(self, hook: impl LifecycleHook + 'static) -> Self {
        self.with_shared_hook(Arc::new(hook))
    }

    /// Add a shared lifecycle hook.
    #[must_use]
    pub fn with_shared_hook(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Add an event listener.
    #[must_use]
    pub fn with_listener(self, listener: impl EventListener + 'static) -> Self {
        self.with_shared_listener(Arc::new(listener))
    }

    /// Add a shared event listener.
    #[must_use]
    pub fn with_shared_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Fix the seed of the random source.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Use `config` instead of [`RuntimeConfig::default`].
    #[must_use]
    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Run-wide read-only properties copied into every scenario context.
    #[must_use]
    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    /// Set one run-wide property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Create the runtime, starting listener workers when listeners exist.
    #[must_use]
    pub fn build(self) -> Runtime {
        let config = self.config.unwrap_or_default();
        let rng = match self.seed.or(config.seed) {
            Some(seed) => SeededRng::with_seed(seed),
            None => SeededRng::from_entropy(),
        };
        log::debug!(
            "building runtime with {} runner(s), {} hook(s), {} listener(s), seed {}",
            self.runners.len(),
            self.hooks.len(),
            self.listeners.len(),
            rng.seed()
        );
        Runtime {
            runners: self.runners,
            events: EventProcessor::new(self.hooks, self.listeners, &config),
            rng,
            properties: self.properties,
        }
    }
}

impl std::fmt::Debug for RuntimeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBuilder")
            .field("runners", &self.runners.len())
            .field("hooks", &self.hooks.len())
            .field("listeners", &self.listeners.len())
            .field("seed", &self.seed)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
