//! Fan-out of phase transitions to hooks and the listener worker pool.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, SyncSender, sync_channel};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use super::{Event, EventListener, HookError, HookResult, LifecycleHook, Phase, PhaseContext};
use crate::config::RuntimeConfig;
use crate::context::ScenarioContext;
use crate::panic::panic_message;

type Job = (Arc<dyn EventListener>, Arc<Event>);

/// Bounded pool of threads delivering events to listeners.
struct ListenerPool {
    sender: Option<SyncSender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl ListenerPool {
    /// Spawn up to `workers` threads. Returns `None` when no thread could be
    /// started.
    fn start(workers: usize, capacity: usize) -> Option<Self> {
        let (sender, receiver) = sync_channel::<Job>(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let handles: Vec<_> = (0..workers.max(1))
            .filter_map(|index| {
                let receiver = Arc::clone(&receiver);
                thread::Builder::new()
                    .name(format!("karta-listener-{index}"))
                    .spawn(move || work(&receiver))
                    .map_err(|err| log::warn!("failed to start listener worker {index}: {err}"))
                    .ok()
            })
            .collect();
        if handles.is_empty() {
            return None;
        }
        Some(Self {
            sender: Some(sender),
            workers: handles,
        })
    }

    /// Queue a job, handing it back when the pool no longer accepts work.
    fn submit(&self, job: Job) -> Result<(), Job> {
        match &self.sender {
            Some(sender) => sender.send(job).map_err(|err| err.0),
            None => Err(job),
        }
    }

    /// Close the queue and wait for every queued job to finish.
    fn drain(mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::warn!("listener worker exited abnormally");
            }
        }
    }
}

fn work(receiver: &Mutex<Receiver<Job>>) {
    loop {
        let job = receiver.lock().recv();
        let Ok((listener, event)) = job else {
            return;
        };
        deliver(listener.as_ref(), &event);
    }
}

fn deliver(listener: &dyn EventListener, event: &Event) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener.on_event(event))) {
        log::warn!(
            "event listener panicked during {}: {}",
            event.phase,
            panic_message(payload.as_ref())
        );
    }
}

/// Delivers phase transitions to registered hooks and listeners.
///
/// Listener events are queued on a bounded channel; submission blocks only
/// while the queue is full. [`EventProcessor::shutdown`] (also run on drop)
/// waits for every queued event to be delivered.
pub struct EventProcessor {
    hooks: Vec<Arc<dyn LifecycleHook>>,
    listeners: Vec<Arc<dyn EventListener>>,
    pool: Option<ListenerPool>,
}

impl EventProcessor {
    /// Create a processor, starting the worker pool when listeners exist.
    #[must_use]
    pub fn new(
        hooks: Vec<Arc<dyn LifecycleHook>>,
        listeners: Vec<Arc<dyn EventListener>>,
        config: &RuntimeConfig,
    ) -> Self {
        let pool = if listeners.is_empty() {
            None
        } else {
            ListenerPool::start(config.listener_workers, config.listener_queue)
        };
        if pool.is_none() && !listeners.is_empty() {
            log::warn!("no listener worker could be started; events are delivered inline");
        }
        Self {
            hooks,
            listeners,
            pool,
        }
    }

    /// Announce a run, feature or iteration phase.
    ///
    /// # Errors
    /// Returns the first [`HookError`]; later hooks are not called.
    pub fn emit(&self, ctx: &PhaseContext<'_>) -> HookResult {
        self.notify(ctx);
        for hook in &self.hooks {
            guarded(ctx.phase, || match ctx.phase {
                Phase::RunStart => hook.run_start(ctx),
                Phase::FeatureStart => hook.feature_start(ctx),
                Phase::FeatureIterationStart => hook.feature_iteration_start(ctx),
                Phase::FeatureIterationComplete => hook.feature_iteration_complete(ctx),
                Phase::FeatureComplete => hook.feature_complete(ctx),
                Phase::RunComplete => hook.run_complete(ctx),
                Phase::ScenarioStart
                | Phase::StepStart
                | Phase::StepComplete
                | Phase::ScenarioComplete => Ok(()),
            })?;
        }
        Ok(())
    }

    /// Announce a scenario or step phase, giving hooks the live context.
    ///
    /// # Errors
    /// Returns the first [`HookError`]; later hooks are not called.
    pub fn emit_scenario(&self, ctx: &PhaseContext<'_>, state: &mut ScenarioContext) -> HookResult {
        self.notify(ctx);
        for hook in &self.hooks {
            guarded(ctx.phase, || match ctx.phase {
                Phase::ScenarioStart => hook.scenario_start(ctx, state),
                Phase::StepStart => hook.step_start(ctx, state),
                Phase::StepComplete => hook.step_complete(ctx, state),
                Phase::ScenarioComplete => hook.scenario_complete(ctx, state),
                Phase::RunStart
                | Phase::FeatureStart
                | Phase::FeatureIterationStart
                | Phase::FeatureIterationComplete
                | Phase::FeatureComplete
                | Phase::RunComplete => Ok(()),
            })?;
        }
        Ok(())
    }

    /// Wait for every queued listener event to be delivered and stop the
    /// workers. Later events are delivered inline.
    pub fn shutdown(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.drain();
            log::debug!("listener workers drained");
        }
    }

    fn notify(&self, ctx: &PhaseContext<'_>) {
        if self.listeners.is_empty() {
            return;
        }
        let event = Arc::new(Event::from(ctx));
        for listener in &self.listeners {
            let job = (Arc::clone(listener), Arc::clone(&event));
            let rejected = match &self.pool {
                Some(pool) => pool.submit(job).err(),
                None => Some(job),
            };
            if let Some((listener, event)) = rejected {
                deliver(listener.as_ref(), &event);
            }
        }
    }
}

fn guarded(phase: Phase, call: impl FnOnce() -> HookResult) -> HookResult {
    catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        Err(HookError::new(format!(
            "{phase} hook panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

impl Drop for EventProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for EventProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventProcessor")
            .field("hooks", &self.hooks.len())
            .field("listeners", &self.listeners.len())
            .field("pooled", &self.pool.is_some())
            .finish()
    }
}
