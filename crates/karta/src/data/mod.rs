//! Data rules and their seeded generation.
//!
//! A [`DataValue`] describes either a literal or a procedure for producing a
//! randomised value. Rules are immutable; [`DataValue::generate`] draws a
//! fresh concrete [`serde_json::Value`] from a [`SeededRng`] each time it is
//! called.

mod error;
mod rng;
mod selection;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use error::RandomizationError;
pub use rng::SeededRng;
pub use selection::{
    check_mutex_total, check_probabilities, round_total, select_independent, select_one,
};

/// A value paired with the probability of it being drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedValue {
    /// Probability in `(0, 1]`.
    pub probability: f64,
    /// Rule producing the value when drawn.
    pub value: DataValue,
}

impl WeightedValue {
    /// Pair `value` with `probability`.
    #[must_use]
    pub fn new(probability: f64, value: DataValue) -> Self {
        Self { probability, value }
    }
}

/// Rule describing a literal or generated value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataValue {
    /// A fixed value returned as is.
    Literal {
        /// The value.
        value: Value,
    },
    /// An array whose elements are generated in order.
    List {
        /// Element rules.
        values: Vec<DataValue>,
    },
    /// An integer drawn uniformly from `min..=max`.
    IntegerRange {
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },
    /// A float drawn uniformly from `min..=max`.
    FloatRange {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// A string of ASCII letters.
    RandomString {
        /// Number of characters; must be positive.
        length: i64,
    },
    /// One element picked uniformly.
    OneFromList {
        /// Candidate rules.
        values: Vec<DataValue>,
    },
    /// A uniformly sized subset sampled without replacement.
    SomeFromList {
        /// Candidate rules.
        values: Vec<DataValue>,
    },
    /// Exactly one entry picked by weighted mutex draw.
    OneFromMap {
        /// Entries in declaration order; probabilities must total one.
        probability_map: Vec<WeightedValue>,
    },
    /// Every entry passing its own independent draw.
    SomeFromMap {
        /// Entries in declaration order.
        probability_map: Vec<WeightedValue>,
    },
    /// An object whose named fields are generated in declaration order.
    GeneratedObject {
        /// Field rules.
        fields: IndexMap<String, DataValue>,
    },
}

impl DataValue {
    /// Wrap a literal value.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    /// Report whether the rule is a literal whose output never varies.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal { .. })
    }

    /// Produce a concrete value.
    ///
    /// # Errors
    /// Returns [`RandomizationError`] for reversed ranges, non-positive string
    /// lengths, empty selections and invalid probability tables.
    ///
    /// # Examples
    ///
    /// ```
    /// use karta::data::{DataValue, SeededRng};
    ///
    /// let rule = DataValue::IntegerRange { min: 1, max: 6 };
    /// let rng = SeededRng::with_seed(3);
    /// let roll = rule.generate(&rng).unwrap().as_i64().unwrap();
    /// assert!((1..=6).contains(&roll));
    /// ```
    pub fn generate(&self, rng: &SeededRng) -> Result<Value, RandomizationError> {
        match self {
            Self::Literal { value } => Ok(value.clone()),
            Self::List { values } => generate_all(values.iter(), rng),
            Self::IntegerRange { min, max } => {
                if min > max {
                    return Err(RandomizationError::InvalidRange {
                        min: min.to_string(),
                        max: max.to_string(),
                    });
                }
                Ok(Value::from(rng.int_inclusive(*min, *max)))
            }
            Self::FloatRange { min, max } => {
                let spans = min.is_finite() && max.is_finite() && (max - min).is_finite();
                if min > max || !spans {
                    return Err(RandomizationError::InvalidRange {
                        min: min.to_string(),
                        max: max.to_string(),
                    });
                }
                Ok(Value::from(rng.float_inclusive(*min, *max)))
            }
            Self::RandomString { length } => match usize::try_from(*length) {
                Ok(len) if len > 0 => Ok(Value::String(rng.letters(len))),
                _ => Err(RandomizationError::InvalidLength(*length)),
            },
            Self::OneFromList { values } => {
                if values.is_empty() {
                    return Err(RandomizationError::EmptySelection("list"));
                }
                let picked = values
                    .get(rng.index(values.len()))
                    .ok_or(RandomizationError::EmptySelection("list"))?;
                picked.generate(rng)
            }
            Self::SomeFromList { values } => {
                if values.is_empty() {
                    return Err(RandomizationError::EmptySelection("list"));
                }
                let amount = rng.index(values.len()) + 1;
                let picked = rng
                    .sample_indices(values.len(), amount)
                    .into_iter()
                    .filter_map(|idx| values.get(idx));
                generate_all(picked, rng)
            }
            Self::OneFromMap { probability_map } => {
                select_one(probability_map, |entry| entry.probability, rng)?
                    .value
                    .generate(rng)
            }
            Self::SomeFromMap { probability_map } => {
                if probability_map.is_empty() {
                    return Err(RandomizationError::EmptySelection("probability map"));
                }
                let picked = select_independent(probability_map, |entry| entry.probability, rng)?;
                generate_all(picked.into_iter().map(|entry| &entry.value), rng)
            }
            Self::GeneratedObject { fields } => {
                let mut object = Map::with_capacity(fields.len());
                for (name, rule) in fields {
                    object.insert(name.clone(), rule.generate(rng)?);
                }
                Ok(Value::Object(object))
            }
        }
    }
}

fn generate_all<'a, I>(rules: I, rng: &SeededRng) -> Result<Value, RandomizationError>
where
    I: Iterator<Item = &'a DataValue>,
{
    rules
        .map(|rule| rule.generate(rng))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}

impl From<Value> for DataValue {
    fn from(value: Value) -> Self {
        Self::Literal { value }
    }
}

#[cfg(test)]
mod tests;
