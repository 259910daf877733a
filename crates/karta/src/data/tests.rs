//! Unit tests for data rule generation.

use indexmap::IndexMap;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use super::*;

#[fixture]
fn rng() -> SeededRng {
    SeededRng::with_seed(0x00c0_ffee)
}

fn literal(value: Value) -> DataValue {
    DataValue::literal(value)
}

#[rstest]
fn literal_returns_itself(rng: SeededRng) {
    let rule = literal(json!({"name": "karta", "count": 3}));
    assert_eq!(rule.generate(&rng), Ok(json!({"name": "karta", "count": 3})));
}

#[rstest]
fn integer_range_is_inclusive(rng: SeededRng) {
    let rule = DataValue::IntegerRange { min: 1, max: 3 };
    let mut seen = [false; 3];
    for _ in 0..300 {
        let Ok(Value::Number(n)) = rule.generate(&rng) else {
            panic!("integer expected");
        };
        let Some(value) = n.as_i64() else {
            panic!("integer expected");
        };
        assert!((1..=3).contains(&value));
        if let Some(slot) = usize::try_from(value - 1).ok().and_then(|i| seen.get_mut(i)) {
            *slot = true;
        }
    }
    assert_eq!(seen, [true; 3]);
}

#[rstest]
#[case(DataValue::IntegerRange { min: 5, max: 1 })]
#[case(DataValue::FloatRange { min: 2.5, max: 1.0 })]
#[case(DataValue::FloatRange { min: 0.0, max: f64::INFINITY })]
#[case(DataValue::FloatRange { min: f64::NEG_INFINITY, max: 0.0 })]
#[case(DataValue::FloatRange { min: f64::NAN, max: 1.0 })]
#[case(DataValue::FloatRange { min: -1e308, max: 1e308 })]
#[case(DataValue::RandomString { length: 0 })]
#[case(DataValue::RandomString { length: -4 })]
#[case(DataValue::OneFromList { values: Vec::new() })]
#[case(DataValue::SomeFromList { values: Vec::new() })]
#[case(DataValue::OneFromMap { probability_map: Vec::new() })]
#[case(DataValue::SomeFromMap { probability_map: Vec::new() })]
fn misconfigured_rules_fail(rng: SeededRng, #[case] rule: DataValue) {
    assert!(rule.generate(&rng).is_err());
}

#[rstest]
fn float_range_stays_in_bounds(rng: SeededRng) {
    let rule = DataValue::FloatRange { min: -1.5, max: 2.5 };
    for _ in 0..200 {
        let value = rule.generate(&rng).ok().and_then(|v| v.as_f64());
        assert!(value.is_some_and(|v| (-1.5..=2.5).contains(&v)));
    }
}

#[rstest]
fn random_string_has_requested_length(rng: SeededRng) {
    let rule = DataValue::RandomString { length: 12 };
    let value = rule.generate(&rng);
    let Ok(Value::String(text)) = value else {
        panic!("string expected, got {value:?}");
    };
    assert_eq!(text.len(), 12);
}

#[rstest]
fn one_from_list_recurses_into_rules(rng: SeededRng) {
    let rule = DataValue::OneFromList {
        values: vec![DataValue::IntegerRange { min: 10, max: 20 }],
    };
    let value = rule.generate(&rng).ok().and_then(|v| v.as_i64());
    assert!(value.is_some_and(|v| (10..=20).contains(&v)));
}

#[rstest]
fn some_from_list_draws_non_empty_distinct_subsets(rng: SeededRng) {
    let rule = DataValue::SomeFromList {
        values: (1..=5).map(|i| literal(json!(i))).collect(),
    };
    for _ in 0..100 {
        let Ok(Value::Array(items)) = rule.generate(&rng) else {
            panic!("array expected");
        };
        assert!((1..=5).contains(&items.len()));
        let mut numbers: Vec<_> = items.iter().filter_map(Value::as_i64).collect();
        numbers.sort_unstable();
        numbers.dedup();
        assert_eq!(numbers.len(), items.len());
    }
}

#[rstest]
fn one_from_map_requires_total_of_one(rng: SeededRng) {
    let rule = DataValue::OneFromMap {
        probability_map: vec![
            WeightedValue::new(0.5, literal(json!("a"))),
            WeightedValue::new(0.2, literal(json!("b"))),
        ],
    };
    assert_eq!(
        rule.generate(&rng),
        Err(RandomizationError::ProbabilityTotal(0.7))
    );
}

#[rstest]
fn some_from_map_keeps_declaration_order(rng: SeededRng) {
    let rule = DataValue::SomeFromMap {
        probability_map: vec![
            WeightedValue::new(1.0, literal(json!("first"))),
            WeightedValue::new(0.5, literal(json!("maybe"))),
            WeightedValue::new(1.0, literal(json!("last"))),
        ],
    };
    for _ in 0..50 {
        let Ok(Value::Array(items)) = rule.generate(&rng) else {
            panic!("array expected");
        };
        assert_eq!(items.first(), Some(&json!("first")));
        assert_eq!(items.last(), Some(&json!("last")));
    }
}

#[rstest]
fn generated_object_keeps_field_order(rng: SeededRng) {
    let mut fields = IndexMap::new();
    fields.insert("zeta".to_string(), literal(json!(1)));
    fields.insert("alpha".to_string(), DataValue::RandomString { length: 3 });
    fields.insert("mid".to_string(), literal(json!(null)));
    let rule = DataValue::GeneratedObject { fields };
    let Ok(Value::Object(object)) = rule.generate(&rng) else {
        panic!("object expected");
    };
    let keys: Vec<_> = object.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
}

#[rstest]
fn generation_never_mutates_the_rule(rng: SeededRng) {
    let rule = DataValue::List {
        values: vec![
            DataValue::IntegerRange { min: 0, max: 9 },
            literal(json!("fixed")),
        ],
    };
    let before = rule.clone();
    for _ in 0..10 {
        assert!(rule.generate(&rng).is_ok());
    }
    assert_eq!(rule, before);
}

#[test]
fn serializes_with_kind_tags() {
    let rule = DataValue::IntegerRange { min: 1, max: 2 };
    let Ok(text) = serde_json::to_string(&rule) else {
        panic!("rule should serialize");
    };
    assert_eq!(text, r#"{"kind":"integer_range","min":1,"max":2}"#);
}
