//! Built-in lifecycle hooks.

use std::sync::Arc;

use regex::Regex;

use super::{HookResult, LifecycleHook, PhaseContext};
use crate::context::ScenarioContext;

/// Logs every phase transition through the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHook;

impl LoggingHook {
    fn log(ctx: &PhaseContext<'_>) -> HookResult {
        let feature = ctx.feature.map_or("", |f| f.name.as_str());
        let scenario = ctx.scenario.map_or("", |s| s.name.as_str());
        let step = ctx.step.map_or("", |s| s.identifier.as_str());
        match ctx.iteration {
            Some(iteration) => log::info!(
                "[{}] {} feature=`{feature}` iteration={iteration} scenario=`{scenario}` step=`{step}`",
                ctx.run,
                ctx.phase
            ),
            None => log::info!("[{}] {} feature=`{feature}`", ctx.run, ctx.phase),
        }
        Ok(())
    }
}

impl LifecycleHook for LoggingHook {
    fn run_start(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Self::log(ctx)
    }

    fn feature_start(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Self::log(ctx)
    }

    fn feature_iteration_start(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Self::log(ctx)
    }

    fn scenario_start(&self, ctx: &PhaseContext<'_>, _: &mut ScenarioContext) -> HookResult {
        Self::log(ctx)
    }

    fn step_start(&self, ctx: &PhaseContext<'_>, _: &mut ScenarioContext) -> HookResult {
        Self::log(ctx)
    }

    fn step_complete(&self, ctx: &PhaseContext<'_>, _: &mut ScenarioContext) -> HookResult {
        Self::log(ctx)
    }

    fn scenario_complete(&self, ctx: &PhaseContext<'_>, _: &mut ScenarioContext) -> HookResult {
        Self::log(ctx)
    }

    fn feature_iteration_complete(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Self::log(ctx)
    }

    fn feature_complete(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Self::log(ctx)
    }

    fn run_complete(&self, ctx: &PhaseContext<'_>) -> HookResult {
        Self::log(ctx)
    }
}

/// Callback run around a run or feature.
pub type PhaseCallback = Arc<dyn Fn(&PhaseContext<'_>) -> HookResult + Send + Sync>;

/// Callback run around a scenario.
pub type ScenarioCallback =
    Arc<dyn Fn(&PhaseContext<'_>, &mut ScenarioContext) -> HookResult + Send + Sync>;

struct Tagged<F> {
    filter: Option<Regex>,
    callback: F,
}

impl<F> Tagged<F> {
    fn applies(&self, ctx: &PhaseContext<'_>) -> bool {
        self.filter
            .as_ref()
            .is_none_or(|filter| ctx.tags_in_scope().any(|tag| filter.is_match(tag)))
    }
}

fn compile(filter: Option<&str>) -> Result<Option<Regex>, regex::Error> {
    filter.map(Regex::new).transpose()
}

/// Before/after callbacks for runs, features and scenarios, optionally
/// restricted to scenarios or features carrying a tag matching a regex.
///
/// A feature callback sees the feature's tags; a scenario callback sees the
/// scenario's own tags followed by its feature's tags. Callbacks of one kind
/// run in registration order.
///
/// # Examples
/// ```
/// use karta::events::TaggedHooks;
///
/// let mut hooks = TaggedHooks::default();
/// hooks
///     .before_scenario(Some("^(chrome|firefox)$"), |_, state| {
///         state.insert("browser", "ready");
///         Ok(())
///     })
///     .unwrap();
/// ```
#[derive(Default)]
pub struct TaggedHooks {
    before_run: Vec<PhaseCallback>,
    after_run: Vec<PhaseCallback>,
    before_feature: Vec<Tagged<PhaseCallback>>,
    after_feature: Vec<Tagged<PhaseCallback>>,
    before_scenario: Vec<Tagged<ScenarioCallback>>,
    after_scenario: Vec<Tagged<ScenarioCallback>>,
}

impl TaggedHooks {
    /// Run `callback` when the run starts.
    pub fn before_run<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&PhaseContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.before_run.push(Arc::new(callback));
        self
    }

    /// Run `callback` when the run completes.
    pub fn after_run<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&PhaseContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.after_run.push(Arc::new(callback));
        self
    }

    /// Run `callback` when a feature whose tags match `filter` starts.
    ///
    /// # Errors
    /// Returns [`regex::Error`] when `filter` is not a valid regex.
    pub fn before_feature<F>(
        &mut self,
        filter: Option<&str>,
        callback: F,
    ) -> Result<&mut Self, regex::Error>
    where
        F: Fn(&PhaseContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.before_feature.push(Tagged {
            filter: compile(filter)?,
            callback: Arc::new(callback),
        });
        Ok(self)
    }

    /// Run `callback` when a feature whose tags match `filter` completes.
    ///
    /// # Errors
    /// Returns [`regex::Error`] when `filter` is not a valid regex.
    pub fn after_feature<F>(
        &mut self,
        filter: Option<&str>,
        callback: F,
    ) -> Result<&mut Self, regex::Error>
    where
        F: Fn(&PhaseContext<'_>) -> HookResult + Send + Sync + 'static,
    {
        self.after_feature.push(Tagged {
            filter: compile(filter)?,
            callback: Arc::new(callback),
        });
        Ok(self)
    }

    /// Run `callback` before a scenario whose tags match `filter`.
    ///
    /// # Errors
    /// Returns [`regex::Error`] when `filter` is not a valid regex.
    pub fn before_scenario<F>(
        &mut self,
        filter: Option<&str>,
        callback: F,
    ) -> Result<&mut Self, regex::Error>
    where
        F: Fn(&PhaseContext<'_>, &mut ScenarioContext) -> HookResult + Send + Sync + 'static,
    {
        self.before_scenario.push(Tagged {
            filter: compile(filter)?,
            callback: Arc::new(callback),
        });
        Ok(self)
    }

    /// Run `callback` after a scenario whose tags match `filter`.
    ///
    /// # Errors
    /// Returns [`regex::Error`] when `filter` is not a valid regex.
    pub fn after_scenario<F>(
        &mut self,
        filter: Option<&str>,
        callback: F,
    ) -> Result<&mut Self, regex::Error>
    where
        F: Fn(&PhaseContext<'_>, &mut ScenarioContext) -> HookResult + Send + Sync + 'static,
    {
        self.after_scenario.push(Tagged {
            filter: compile(filter)?,
            callback: Arc::new(callback),
        });
        Ok(self)
    }
}

fn run_all(callbacks: &[PhaseCallback], ctx: &PhaseContext<'_>) -> HookResult {
    callbacks.iter().try_for_each(|callback| callback(ctx))
}

fn run_tagged(callbacks: &[Tagged<PhaseCallback>], ctx: &PhaseContext<'_>) -> HookResult {
    callbacks
        .iter()
        .filter(|hook| hook.applies(ctx))
        .try_for_each(|hook| (hook.callback)(ctx))
}

fn run_tagged_scenario(
    callbacks: &[Tagged<ScenarioCallback>],
    ctx: &PhaseContext<'_>,
    state: &mut ScenarioContext,
) -> HookResult {
    callbacks
        .iter()
        .filter(|hook| hook.applies(ctx))
        .try_for_each(|hook| (hook.callback)(ctx, state))
}

impl LifecycleHook for TaggedHooks {
    fn run_start(&self, ctx: &PhaseContext<'_>) -> HookResult {
        run_all(&self.before_run, ctx)
    }

    fn feature_start(&self, ctx: &PhaseContext<'_>) -> HookResult {
        run_tagged(&self.before_feature, ctx)
    }

    fn scenario_start(&self, ctx: &PhaseContext<'_>, state: &mut ScenarioContext) -> HookResult {
        run_tagged_scenario(&self.before_scenario, ctx, state)
    }

    fn scenario_complete(&self, ctx: &PhaseContext<'_>, state: &mut ScenarioContext) -> HookResult {
        run_tagged_scenario(&self.after_scenario, ctx, state)
    }

    fn feature_complete(&self, ctx: &PhaseContext<'_>) -> HookResult {
        run_tagged(&self.after_feature, ctx)
    }

    fn run_complete(&self, ctx: &PhaseContext<'_>) -> HookResult {
        run_all(&self.after_run, ctx)
    }
}

impl std::fmt::Debug for TaggedHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedHooks")
            .field("before_run", &self.before_run.len())
            .field("after_run", &self.after_run.len())
            .field("before_feature", &self.before_feature.len())
            .field("after_feature", &self.after_feature.len())
            .field("before_scenario", &self.before_scenario.len())
            .field("after_scenario", &self.after_scenario.len())
            .finish()
    }
}
