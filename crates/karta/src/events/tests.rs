//! Tests for hook dispatch and listener delivery.

use std::sync::Arc;

use karta_patterns::Conjunction;
use parking_lot::Mutex;
use rstest::{fixture, rstest};

use super::*;
use crate::config::RuntimeConfig;
use crate::model::{Feature, Scenario, Step};

#[fixture]
fn feature() -> Feature {
    let mut feature = Feature::new(
        "Browsers",
        vec![
            Scenario::new("Chrome", vec![Step::new(Conjunction::Given, "x")]).with_tags(["chrome"]),
            Scenario::new("Plain", vec![Step::new(Conjunction::Given, "x")]),
        ],
    );
    feature.tags.insert("web".into());
    feature
}

#[derive(Default)]
struct Recording {
    calls: Mutex<Vec<String>>,
}

impl LifecycleHook for Recording {
    fn run_start(&self, ctx: &PhaseContext<'_>) -> HookResult {
        self.calls.lock().push(format!("run_start {}", ctx.run));
        Ok(())
    }

    fn scenario_start(&self, ctx: &PhaseContext<'_>, state: &mut ScenarioContext) -> HookResult {
        let name = ctx.scenario.map_or("", |s| s.name.as_str());
        self.calls.lock().push(format!("scenario_start {name}"));
        state.insert("seen", true);
        Ok(())
    }
}

struct Failing;

impl LifecycleHook for Failing {
    fn run_start(&self, _: &PhaseContext<'_>) -> HookResult {
        Err(HookError::new("no browsers available"))
    }

    fn feature_start(&self, _: &PhaseContext<'_>) -> HookResult {
        panic!("feature hook exploded");
    }
}

#[test]
fn hooks_run_in_order_and_see_scenario_state() {
    let first = Arc::new(Recording::default());
    let second = Arc::new(Recording::default());
    let processor = EventProcessor::new(
        vec![first.clone(), second.clone()],
        Vec::new(),
        &RuntimeConfig::default(),
    );
    let feature = feature();
    let scenario = feature.scenarios.first();
    assert!(processor.emit(&PhaseContext::new(Phase::RunStart, "r1")).is_ok());
    let mut state = ScenarioContext::new("Browsers", "Chrome", 0);
    let ctx = PhaseContext {
        feature: Some(&feature),
        scenario,
        iteration: Some(0),
        ..PhaseContext::new(Phase::ScenarioStart, "r1")
    };
    assert!(processor.emit_scenario(&ctx, &mut state).is_ok());
    assert_eq!(
        *first.calls.lock(),
        ["run_start r1", "scenario_start Chrome"]
    );
    assert_eq!(first.calls.lock().len(), second.calls.lock().len());
    assert_eq!(state.get("seen"), Some(&serde_json::Value::Bool(true)));
}

#[test]
fn first_hook_error_stops_later_hooks() {
    let later = Arc::new(Recording::default());
    let processor = EventProcessor::new(
        vec![Arc::new(Failing), later.clone()],
        Vec::new(),
        &RuntimeConfig::default(),
    );
    let err = processor.emit(&PhaseContext::new(Phase::RunStart, "r"));
    assert_eq!(err, Err(HookError::new("no browsers available")));
    assert!(later.calls.lock().is_empty());
}

#[test]
fn hook_panics_become_errors() {
    let processor = EventProcessor::new(vec![Arc::new(Failing)], Vec::new(), &RuntimeConfig::default());
    let err = processor.emit(&PhaseContext::new(Phase::FeatureStart, "r"));
    let message = err.err().map(|e| e.message().to_owned()).unwrap_or_default();
    assert!(message.contains("featureStart hook panicked: feature hook exploded"), "{message}");
}

#[rstest]
#[case(1)]
#[case(4)]
fn shutdown_drains_every_listener_event(#[case] workers: usize) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let listener = move |event: &Event| sink.lock().push(event.phase);
    let config = RuntimeConfig::default()
        .with_listener_workers(workers)
        .with_listener_queue(2);
    let mut processor = EventProcessor::new(Vec::new(), vec![Arc::new(listener)], &config);
    for _ in 0..50 {
        assert!(processor.emit(&PhaseContext::new(Phase::FeatureStart, "r")).is_ok());
    }
    processor.shutdown();
    assert_eq!(seen.lock().len(), 50);
}

#[test]
fn listener_panics_do_not_stop_delivery() {
    let seen = Arc::new(Mutex::new(0_usize));
    let sink = Arc::clone(&seen);
    let flaky = |event: &Event| {
        if event.phase == Phase::RunStart {
            panic!("listener failure");
        }
    };
    let counter = move |_: &Event| *sink.lock() += 1;
    let config = RuntimeConfig::default().with_listener_workers(1);
    let mut processor = EventProcessor::new(
        Vec::new(),
        vec![Arc::new(flaky), Arc::new(counter)],
        &config,
    );
    assert!(processor.emit(&PhaseContext::new(Phase::RunStart, "r")).is_ok());
    assert!(processor.emit(&PhaseContext::new(Phase::RunComplete, "r")).is_ok());
    processor.shutdown();
    assert_eq!(*seen.lock(), 2);
}

#[rstest]
fn tagged_hooks_filter_on_scenario_and_feature_tags(feature: Feature) {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let mut hooks = TaggedHooks::default();
    for (filter, label) in [(Some("^chrome$"), "chrome"), (Some("^web$"), "web"), (None, "any")] {
        let hits = Arc::clone(&hits);
        let registered = hooks.before_scenario(filter, move |ctx, _| {
            let name = ctx.scenario.map_or("", |s| s.name.as_str());
            hits.lock().push(format!("{label}:{name}"));
            Ok(())
        });
        assert!(registered.is_ok());
    }
    assert!(hooks.before_feature(Some("("), |_| Ok(())).is_err());
    for scenario in &feature.scenarios {
        let ctx = PhaseContext {
            feature: Some(&feature),
            scenario: Some(scenario),
            ..PhaseContext::new(Phase::ScenarioStart, "r")
        };
        let mut state = ScenarioContext::default();
        assert!(hooks.scenario_start(&ctx, &mut state).is_ok());
    }
    assert_eq!(
        *hits.lock(),
        ["chrome:Chrome", "web:Chrome", "any:Chrome", "web:Plain", "any:Plain"]
    );
}

#[rstest]
fn events_snapshot_the_phase(feature: Feature) {
    let selected: Vec<&Scenario> = feature.scenarios.iter().collect();
    let tags = vec!["web".to_owned()];
    let ctx = PhaseContext {
        tags: &tags,
        feature: Some(&feature),
        iteration: Some(3),
        selected: &selected,
        ..PhaseContext::new(Phase::FeatureIterationStart, "nightly")
    };
    let event = Event::from(&ctx);
    let json = serde_json::to_value(&event).unwrap_or_default();
    assert_eq!(json.get("phase"), Some(&serde_json::json!("featureIterationStart")));
    assert_eq!(json.get("feature"), Some(&serde_json::json!("Browsers")));
    assert_eq!(json.get("iteration_index"), Some(&serde_json::json!(3)));
    assert_eq!(json.get("scenarios"), Some(&serde_json::json!(["Chrome", "Plain"])));
    assert!(json.get("scenario").is_none());
}

#[test]
#[expect(clippy::unwrap_used, reason = "temporary files are writable")]
fn recorder_writes_on_run_complete() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    let recorder = JsonEventRecorder::new(&path);
    recorder.on_event(&Event::from(&PhaseContext::new(Phase::RunStart, "r")));
    assert!(!path.exists());
    recorder.on_event(&Event::from(&PhaseContext::new(Phase::RunComplete, "r")));
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    let phases: Vec<_> = written
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e.get("phase").and_then(|p| p.as_str()))
        .collect();
    assert_eq!(phases, ["runStart", "runComplete"]);
    assert_eq!(recorder.events().len(), 2);
}
