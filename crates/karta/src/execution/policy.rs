//! Per-iteration scenario selection.

use crate::data::{RandomizationError, SeededRng, select_independent, select_one};
use crate::model::{Feature, IterationPolicy, Scenario};

/// Scenarios to run in one iteration of `feature`, in declaration order.
///
/// - [`IterationPolicy::AllPerIteration`]: every scenario.
/// - [`IterationPolicy::OnePerIteration`]: one weighted mutex draw over the
///   scenario probabilities.
/// - [`IterationPolicy::SomePerIteration`]: one independent draw per
///   scenario; the selection may be empty.
///
/// # Errors
/// Returns [`RandomizationError`] when the probabilities are invalid for the
/// policy. Validated features never fail.
///
/// # Examples
/// ```
/// use karta::data::SeededRng;
/// use karta::execution::select_scenarios;
/// use karta::kriya::parse_feature;
///
/// let feature = parse_feature(
///     "Feature: F\n  IterationPolicy: one scenario per iteration\n  Scenario: A\n    Probability: 50%\n    Given x\n  Scenario: B\n    Probability: 50%\n    Given y\n",
/// )
/// .unwrap();
/// let picked = select_scenarios(&feature, &SeededRng::with_seed(1)).unwrap();
/// assert_eq!(picked.len(), 1);
/// ```
pub fn select_scenarios<'f>(
    feature: &'f Feature,
    rng: &SeededRng,
) -> Result<Vec<&'f Scenario>, RandomizationError> {
    let probability = |scenario: &Scenario| scenario.probability;
    match feature.iteration_policy {
        IterationPolicy::AllPerIteration => Ok(feature.scenarios.iter().collect()),
        IterationPolicy::OnePerIteration => {
            select_one(&feature.scenarios, probability, rng).map(|picked| vec![picked])
        }
        IterationPolicy::SomePerIteration => {
            select_independent(&feature.scenarios, probability, rng)
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests select from valid features")]
mod tests {
    use super::*;
    use karta_patterns::Conjunction;
    use rstest::rstest;

    use crate::model::Step;

    fn feature(policy: IterationPolicy, probabilities: &[f64]) -> Feature {
        let scenarios = probabilities
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Scenario::new(format!("s{i}"), vec![Step::new(Conjunction::Given, "x")])
                    .with_probability(*p)
            })
            .collect();
        Feature::new("f", scenarios).with_iterations(1, policy)
    }

    fn names(selected: &[&Scenario]) -> Vec<String> {
        selected.iter().map(|s| s.name.clone()).collect()
    }

    #[test]
    fn all_policy_returns_every_scenario() {
        let feature = feature(IterationPolicy::AllPerIteration, &[0.1, 0.2, 1.0]);
        let rng = SeededRng::with_seed(5);
        assert_eq!(names(&select_scenarios(&feature, &rng).unwrap()), ["s0", "s1", "s2"]);
    }

    #[rstest]
    #[case(&[1.0, 1.0], 2)]
    #[case(&[0.5, 1.0, 0.25], 1)]
    fn some_policy_keeps_certain_scenarios(#[case] probabilities: &[f64], #[case] certain: usize) {
        let feature = feature(IterationPolicy::SomePerIteration, probabilities);
        let rng = SeededRng::with_seed(11);
        for _ in 0..100 {
            let picked = select_scenarios(&feature, &rng).unwrap();
            let sure = picked.iter().filter(|s| s.probability >= 1.0).count();
            assert_eq!(sure, certain);
        }
    }

    #[test]
    fn one_policy_picks_exactly_one() {
        let feature = feature(IterationPolicy::OnePerIteration, &[0.2, 0.3, 0.5]);
        let rng = SeededRng::with_seed(2);
        for _ in 0..100 {
            assert_eq!(select_scenarios(&feature, &rng).unwrap().len(), 1);
        }
    }

    #[test]
    fn same_seed_same_selection() {
        let feature = feature(IterationPolicy::SomePerIteration, &[0.5, 0.5, 0.5]);
        let draw = |seed| {
            let rng = SeededRng::with_seed(seed);
            (0..20)
                .map(|_| names(&select_scenarios(&feature, &rng).unwrap()))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(9), draw(9));
    }

    #[test]
    fn one_policy_rejects_bad_totals() {
        let feature = feature(IterationPolicy::OnePerIteration, &[0.2, 0.3]);
        let rng = SeededRng::with_seed(2);
        assert_eq!(
            select_scenarios(&feature, &rng),
            Err(RandomizationError::ProbabilityTotal(0.5))
        );
    }
}
