//! Per-scenario state shared by the steps of one scenario run.
//!
//! A fresh [`ScenarioContext`] is created for every scenario execution. Steps
//! communicate through its keyed data map, which also receives the data maps
//! returned by plain steps. The data generated from the current step's rules
//! is available through [`ScenarioContext::step_data`] while that step runs.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Where in a run a context currently sits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPosition {
    /// Feature name.
    pub feature: String,
    /// Scenario name.
    pub scenario: String,
    /// Zero-based feature iteration.
    pub iteration: u32,
    /// Identifier of the step being executed.
    pub step: Option<String>,
}

/// Mutable state threaded through the steps of one scenario.
///
/// # Examples
/// ```
/// use karta::ScenarioContext;
/// use serde_json::json;
///
/// let mut ctx = ScenarioContext::new("Checkout", "Card payment", 0);
/// ctx.insert("total", json!(42));
/// assert_eq!(ctx.get("total"), Some(&json!(42)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScenarioContext {
    data: Map<String, Value>,
    step_data: Value,
    properties: Map<String, Value>,
    position: RunPosition,
}

impl ScenarioContext {
    /// Create an empty context for `scenario` of `feature`.
    #[must_use]
    pub fn new(feature: impl Into<String>, scenario: impl Into<String>, iteration: u32) -> Self {
        Self {
            position: RunPosition {
                feature: feature.into(),
                scenario: scenario.into(),
                iteration,
                step: None,
            },
            ..Self::default()
        }
    }

    /// Attach run-wide read-only properties.
    #[must_use]
    pub fn with_properties(mut self, properties: Map<String, Value>) -> Self {
        self.properties = properties;
        self
    }

    /// Look up a value stored by an earlier step or generated from data
    /// rules.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Deserialize a stored value.
    ///
    /// Returns `None` when the key is absent.
    ///
    /// # Errors
    /// Returns the deserialization error when the value has the wrong shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<Result<T, serde_json::Error>> {
        self.data.get(key).cloned().map(serde_json::from_value)
    }

    /// Store a value, returning the previous one.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    /// Remove a stored value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    /// Every stored value, in insertion order.
    #[must_use]
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Store every entry of `values`, replacing existing keys.
    pub fn merge(&mut self, values: Map<String, Value>) {
        self.data.extend(values);
    }

    /// Data generated for the step being executed, `null` when it has none.
    #[must_use]
    pub fn step_data(&self) -> &Value {
        &self.step_data
    }

    /// Deserialize the current step's generated data.
    ///
    /// # Errors
    /// Returns the deserialization error when the data has the wrong shape.
    pub fn step_data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.step_data.clone())
    }

    /// A run-wide property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Current run position.
    #[must_use]
    pub fn position(&self) -> &RunPosition {
        &self.position
    }

    pub(crate) fn set_step_data(&mut self, value: Value) {
        self.step_data = value;
    }

    pub(crate) fn enter_step(&mut self, identifier: &str) {
        self.position.step = Some(identifier.to_owned());
        self.step_data = Value::Null;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Customer {
        name: String,
        age: u8,
    }

    #[test]
    fn step_data_lasts_for_one_step() {
        let mut ctx = ScenarioContext::new("f", "s", 2);
        ctx.enter_step("a customer");
        ctx.set_step_data(json!({ "name": "ann", "age": 30 }));
        assert_eq!(
            ctx.step_data_as::<Customer>().ok(),
            Some(Customer {
                name: "ann".into(),
                age: 30
            })
        );
        assert!(ctx.data().is_empty());
        ctx.enter_step("next");
        assert_eq!(ctx.step_data(), &Value::Null);
        assert_eq!(ctx.position().iteration, 2);
        assert_eq!(ctx.position().step.as_deref(), Some("next"));
    }

    #[test]
    fn merged_values_replace_existing_keys() {
        let mut ctx = ScenarioContext::new("f", "s", 0);
        ctx.insert("a", 1);
        let mut update = Map::new();
        update.insert("a".into(), json!(2));
        update.insert("b".into(), json!(3));
        ctx.merge(update);
        assert_eq!(ctx.data().get("a"), Some(&json!(2)));
        assert_eq!(ctx.data().len(), 2);
    }

    #[test]
    fn typed_lookup_reports_missing_and_malformed_values() {
        let mut ctx = ScenarioContext::new("f", "s", 0);
        ctx.insert("count", "three");
        assert!(ctx.get_as::<u32>("missing").is_none());
        assert!(matches!(ctx.get_as::<u32>("count"), Some(Err(_))));
        assert_eq!(ctx.remove("count"), Some(json!("three")));
    }

    #[test]
    fn properties_are_read_only_lookups() {
        let mut props = Map::new();
        props.insert("env".into(), json!("staging"));
        let ctx = ScenarioContext::new("f", "s", 0).with_properties(props);
        assert_eq!(ctx.property("env"), Some(&json!("staging")));
        assert_eq!(ctx.property("other"), None);
    }
}
