//! End-to-end runs through the public runtime API.

use std::sync::Arc;

use karta::events::{JsonEventRecorder, Phase};
use karta::kriya::parse_feature;
use karta::model::Feature;
use karta::reporting::{Summary, json, junit};
use karta::{Runtime, RuntimeConfig, ScenarioContext, StepRegistry};
use karta_patterns::Parameter;
use rstest::{fixture, rstest};
use serde_json::Value;

#[fixture]
#[expect(clippy::unwrap_used, reason = "fixture patterns are valid")]
fn shop_steps() -> StepRegistry {
    let mut steps = StepRegistry::new();
    steps
        .register("a stock of {int} items", |ctx: &mut ScenarioContext, args: &[Parameter]| {
            ctx.insert("stock", args.first().and_then(Parameter::as_i64));
        })
        .unwrap()
        .register("items remain", |ctx: &mut ScenarioContext, _: &[Parameter]| {
            ctx.get("stock").and_then(Value::as_i64).unwrap_or(0) > 0
        })
        .unwrap()
        .register("I sell one", |ctx: &mut ScenarioContext, _: &[Parameter]| {
            let stock = ctx.get("stock").and_then(Value::as_i64).unwrap_or(0);
            ctx.insert("stock", stock - 1);
            let sold = ctx.get("sold").and_then(Value::as_i64).unwrap_or(0);
            ctx.insert("sold", sold + 1);
        })
        .unwrap()
        .register("{int} items were sold", |ctx: &mut ScenarioContext, args: &[Parameter]| {
            let sold = ctx.get("sold").and_then(Value::as_i64);
            if sold == args.first().and_then(Parameter::as_i64) {
                Ok(())
            } else {
                Err(format!("sold {sold:?}"))
            }
        })
        .unwrap()
        .register("a buyer", |ctx: &mut ScenarioContext, _: &[Parameter]| {
            ctx.step_data().get("budget").is_some_and(Value::is_i64)
        })
        .unwrap()
        .register("path {word}", |_: &mut ScenarioContext, _: &[Parameter]| ())
        .unwrap();
    steps
}

#[expect(clippy::unwrap_used, reason = "test sources are valid")]
fn feature(source: &str) -> Feature {
    parse_feature(source).unwrap()
}

const SELL_OUT: &str = "Feature: Sell out\n  Scenario: Drain stock\n    Given a stock of 3 items\n    And a buyer\n      { budget: $int_range(5, 50) }\n    While items remain\n      Steps: {\n        When I sell one\n      }\n    Then 3 items were sold\n";

#[rstest]
#[expect(clippy::unwrap_used, reason = "run completes")]
fn loops_and_step_data_run_end_to_end(shop_steps: StepRegistry) {
    let recorder = Arc::new(JsonEventRecorder::in_memory());
    let mut runtime = Runtime::builder()
        .with_step_runner(shop_steps)
        .with_shared_listener(recorder.clone())
        .with_config(RuntimeConfig::default().with_listener_workers(1))
        .with_seed(99)
        .build();
    let result = runtime.run_features("shop", [feature(SELL_OUT)]).unwrap();
    runtime.shutdown();

    assert!(result.is_successful(), "{:?}", result.outcome.error);
    assert_eq!(result.seed, 99);
    let summary = Summary::of(&result);
    assert_eq!(summary.steps, 7);
    assert_eq!(summary.failed_steps, 0);

    let phases: Vec<Phase> = recorder.events().iter().map(|e| e.phase).collect();
    assert_eq!(phases.first(), Some(&Phase::RunStart));
    assert_eq!(phases.last(), Some(&Phase::RunComplete));
    let step_starts = phases.iter().filter(|p| **p == Phase::StepStart).count();
    assert_eq!(step_starts, 7);
    assert_eq!(
        phases.iter().filter(|p| **p == Phase::FeatureIterationStart).count(),
        1
    );
}

#[rstest]
#[expect(clippy::unwrap_used, reason = "runs complete")]
fn same_seed_replays_the_same_run(shop_steps: StepRegistry) {
    let shared: Arc<dyn karta::StepRunner> = Arc::new(shop_steps);
    let source = "Feature: Paths\n  Iterations: 30\n  IterationPolicy: some scenario per iteration\n  Scenario: A\n    Probability: 50%\n    Given path a\n  Scenario: B\n    Probability: 30%\n    Given path b\n";
    let order = |seed| {
        let runtime = Runtime::builder()
            .with_shared_step_runner(Arc::clone(&shared))
            .with_seed(seed)
            .build();
        let result = runtime.run_features("replay", [feature(source)]).unwrap();
        result
            .scenario_results()
            .map(|s| (s.iteration_index, s.name.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(order(5), order(5));
    assert_ne!(order(5), order(6));
}

#[rstest]
#[expect(clippy::unwrap_used, reason = "run completes")]
fn one_per_iteration_follows_probabilities(shop_steps: StepRegistry) {
    let source = "Feature: Split\n  Iterations: 10000\n  IterationPolicy: one scenario per iteration\n  Scenario: Rare\n    Probability: 40%\n    Given path rare\n  Scenario: Common\n    Probability: 60%\n    Given path common\n";
    let runtime = Runtime::builder()
        .with_step_runner(shop_steps)
        .with_seed(2024)
        .build();
    let result = runtime.run_features("split", [feature(source)]).unwrap();
    let feature = result.feature_results.first().unwrap();
    assert_eq!(feature.iterations_count, 10_000);
    assert_eq!(feature.scenario_results.len(), 10_000);
    let rare = feature
        .scenario_results
        .iter()
        .filter(|s| s.name == "Rare")
        .count();
    assert!((3_900..=4_100).contains(&rare), "rare ran {rare} times");
}

#[rstest]
#[expect(clippy::unwrap_used, reason = "reports render")]
fn failed_runs_render_reports(shop_steps: StepRegistry) {
    let source = "Feature: Short\n  Scenario: Oversold\n    Given a stock of 1 items\n    While items remain\n      Steps: {\n        When I sell one\n      }\n    Then 2 items were sold\n";
    let runtime = Runtime::builder().with_step_runner(shop_steps).build();
    let result = runtime.run_features("short", [feature(source)]).unwrap();
    assert!(!result.is_successful());

    let report: Value = serde_json::from_str(&json::to_string(&result).unwrap()).unwrap();
    assert_eq!(report["status"], "failed");
    let error = report["features"][0]["scenarios"][0]["error"].as_str().unwrap();
    assert!(error.starts_with("StepExecutionError: sold Some(1)"), "{error}");

    let xml = junit::to_string(&result).unwrap();
    assert!(xml.contains("<testcase name=\"Oversold\" classname=\"Short\""));
    assert!(xml.contains("<failure message=\"StepExecutionError: sold Some(1)\">"));
}

#[rstest]
fn aborted_runs_keep_partial_results(shop_steps: StepRegistry) {
    let runtime = Runtime::builder().with_step_runner(shop_steps).build();
    let source = "Feature: Gap\n  Scenario: Missing\n    Given a stock of 2 items\n    When the warehouse burns\n";
    let Err(aborted) = runtime.run_features("gap", [feature(source)]) else {
        panic!("unimplemented steps abort the run");
    };
    assert_eq!(
        aborted.to_string(),
        "run `gap` aborted: unimplemented step: the warehouse burns (<unknown>:4)"
    );
    let steps: Vec<_> = aborted
        .partial
        .scenario_results()
        .flat_map(|s| s.step_results.iter().map(|r| (r.name.clone(), r.is_successful())))
        .collect();
    assert_eq!(
        steps,
        [
            ("a stock of 2 items".to_owned(), true),
            ("the warehouse burns".to_owned(), false),
        ]
    );
}
