//! Core library for `karta`, a behaviour-driven test engine.
//!
//! Features are written in Kriya, a Gherkin-like language with iteration
//! settings, scenario probabilities, condition and loop blocks and inline
//! data generation rules. The crate compiles Kriya (or its YAML and JSON
//! serializations) into a [`model::Feature`], and the [`Runtime`] executes
//! features against step implementations, producing a
//! [`results::RunResult`] tree.
//!
//! ```
//! use karta::kriya::parse_feature;
//! use karta::{Runtime, ScenarioContext, StepRegistry};
//! use karta_patterns::Parameter;
//!
//! let feature = parse_feature(
//!     "Feature: Basket\n  Scenario: Add\n    Given a basket with 2 items\n    Then it holds 2 items\n",
//! )
//! .unwrap();
//!
//! let mut steps = StepRegistry::new();
//! steps
//!     .register("a basket with {int} items", |ctx: &mut ScenarioContext, args: &[Parameter]| {
//!         ctx.insert("items", args.first().and_then(Parameter::as_i64));
//!     })
//!     .unwrap()
//!     .register("it holds {int} items", |ctx: &mut ScenarioContext, args: &[Parameter]| {
//!         ctx.get("items").and_then(|v| v.as_i64()) == args.first().and_then(Parameter::as_i64)
//!     })
//!     .unwrap();
//!
//! let runtime = Runtime::builder().with_step_runner(steps).with_seed(1).build();
//! let result = runtime.run_features("docs", [feature]).unwrap();
//! assert!(result.is_successful());
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod data;
pub mod events;
pub mod execution;
pub mod kriya;
pub mod loader;
pub mod model;
mod panic;
pub mod registry;
pub mod reporting;
pub mod results;
pub mod tags;

pub use catalog::{ScenarioRef, TestCatalog};
pub use config::{ConfigError, RuntimeConfig};
pub use context::{RunPosition, ScenarioContext};
pub use execution::{ExecutionError, RunAborted, Runtime, RuntimeBuilder};
pub use loader::{LoadError, load_feature_file};
pub use panic::panic_message;
pub use registry::{StepError, StepRegistry, StepReturn, StepRunner};
