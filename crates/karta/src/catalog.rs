//! Index of loaded features for scenario selection.

use std::collections::BTreeSet;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::model::{Feature, Scenario};
use crate::tags::{TagExpression, normalize_tag};

/// A scenario together with the feature that declares it.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioRef<'a> {
    /// Declaring feature.
    pub feature: &'a Arc<Feature>,
    /// Position of the scenario in [`Feature::scenarios`].
    pub index: usize,
    /// The scenario.
    pub scenario: &'a Scenario,
}

type Position = (usize, usize);

/// Loaded features indexed by tag and by name.
///
/// # Examples
/// ```
/// use karta::TestCatalog;
/// use karta::kriya::parse_feature;
///
/// let feature = parse_feature(
///     "@shop\nFeature: Shop\n  @fast\n  Scenario: Browse\n    Given a shop\n  Scenario: Buy\n    Given a shop\n",
/// )
/// .unwrap();
/// let catalog = TestCatalog::new([feature]);
/// let fast: Vec<_> = catalog.filter_with_tags(["fast"]).iter().map(|s| s.scenario.name.clone()).collect();
/// assert_eq!(fast, ["Browse"]);
/// assert_eq!(catalog.filter_with_tags(["@shop"]).len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TestCatalog {
    features: Vec<Arc<Feature>>,
    by_tag: HashMap<String, BTreeSet<Position>>,
    by_name: HashMap<String, BTreeSet<Position>>,
}

impl TestCatalog {
    /// Index `features` in the given order.
    #[must_use]
    pub fn new(features: impl IntoIterator<Item = Feature>) -> Self {
        Self::from_shared(features.into_iter().map(Arc::new))
    }

    /// Index already shared features.
    #[must_use]
    pub fn from_shared(features: impl IntoIterator<Item = Arc<Feature>>) -> Self {
        let mut catalog = Self::default();
        for feature in features {
            catalog.push(feature);
        }
        catalog
    }

    /// Add a feature to the index.
    pub fn push(&mut self, feature: Arc<Feature>) {
        let f = self.features.len();
        for (s, scenario) in feature.scenarios.iter().enumerate() {
            let tags = scenario.tags.iter().chain(&feature.tags);
            for tag in tags {
                self.by_tag.entry(tag.clone()).or_default().insert((f, s));
            }
            for name in [&scenario.name, &feature.name] {
                self.by_name.entry(name.clone()).or_default().insert((f, s));
            }
        }
        self.features.push(feature);
    }

    /// Indexed features in insertion order.
    #[must_use]
    pub fn features(&self) -> &[Arc<Feature>] {
        &self.features
    }

    /// Every scenario, feature by feature in declaration order.
    pub fn scenarios(&self) -> impl Iterator<Item = ScenarioRef<'_>> {
        self.features.iter().flat_map(|feature| {
            feature
                .scenarios
                .iter()
                .enumerate()
                .map(move |(index, scenario)| ScenarioRef {
                    feature,
                    index,
                    scenario,
                })
        })
    }

    /// Scenarios matching any of `tags`.
    ///
    /// A tag matches a scenario when it is one of the scenario's tags, one of
    /// its feature's tags, or equal to the scenario or feature name. Tags may
    /// be given with or without `@`. The result is the union over all tags,
    /// without duplicates, in declaration order.
    pub fn filter_with_tags<I, S>(&self, tags: I) -> Vec<ScenarioRef<'_>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut positions = BTreeSet::new();
        for tag in tags {
            let tag = normalize_tag(tag.as_ref());
            for index in [&self.by_tag, &self.by_name] {
                if let Some(found) = index.get(tag) {
                    positions.extend(found.iter().copied());
                }
            }
        }
        positions
            .into_iter()
            .filter_map(|position| self.resolve(position))
            .collect()
    }

    /// Scenarios whose own and feature tags satisfy `expression`.
    #[must_use]
    pub fn filter_with_expression(&self, expression: &TagExpression) -> Vec<ScenarioRef<'_>> {
        self.scenarios()
            .filter(|s| {
                let tags = s.scenario.tags.iter().chain(&s.feature.tags);
                expression.evaluate(tags.map(String::as_str))
            })
            .collect()
    }

    /// The feature declaring `scenario`, compared by identity.
    #[must_use]
    pub fn feature_for_scenario(&self, scenario: &Scenario) -> Option<&Arc<Feature>> {
        self.features
            .iter()
            .find(|f| f.scenarios.iter().any(|s| std::ptr::eq(s, scenario)))
    }

    /// Look up a scenario by feature and scenario name.
    #[must_use]
    pub fn scenario(&self, feature: &str, scenario: &str) -> Option<ScenarioRef<'_>> {
        self.scenarios()
            .find(|s| s.feature.name == feature && s.scenario.name == scenario)
    }

    fn resolve(&self, (f, s): Position) -> Option<ScenarioRef<'_>> {
        let feature = self.features.get(f)?;
        let scenario = feature.scenarios.get(s)?;
        Some(ScenarioRef {
            feature,
            index: s,
            scenario,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use karta_patterns::Conjunction;
    use rstest::{fixture, rstest};

    use crate::model::Step;

    fn scenario(name: &str, tags: &[&str]) -> Scenario {
        Scenario::new(name, vec![Step::new(Conjunction::Given, "x")]).with_tags(tags.iter().copied())
    }

    #[fixture]
    fn catalog() -> TestCatalog {
        let mut shop = Feature::new(
            "Shop",
            vec![
                scenario("Browse", &["fast"]),
                scenario("Buy", &["slow", "payments"]),
            ],
        );
        shop.tags.insert("web".into());
        let admin = Feature::new(
            "Admin",
            vec![scenario("Login", &["fast", "auth"]), scenario("Audit", &[])],
        );
        TestCatalog::new([shop, admin])
    }

    fn names(found: &[ScenarioRef<'_>]) -> Vec<String> {
        found.iter().map(|s| s.scenario.name.clone()).collect()
    }

    #[rstest]
    #[case(&["fast"], &["Browse", "Login"])]
    #[case(&["@web"], &["Browse", "Buy"])]
    #[case(&["auth", "slow"], &["Buy", "Login"])]
    #[case(&["Audit"], &["Audit"])]
    #[case(&["Admin", "fast"], &["Browse", "Login", "Audit"])]
    #[case(&["unknown"], &[])]
    fn filters_by_tag_union(
        catalog: TestCatalog,
        #[case] tags: &[&str],
        #[case] expected: &[&str],
    ) {
        assert_eq!(names(&catalog.filter_with_tags(tags)), expected);
    }

    #[rstest]
    fn filters_by_expression(catalog: TestCatalog) {
        let expr = TagExpression::parse("@fast and not @web").unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(names(&catalog.filter_with_expression(&expr)), ["Login"]);
    }

    #[rstest]
    fn finds_declaring_feature(catalog: TestCatalog) {
        let login = catalog.scenario("Admin", "Login").map(|s| s.scenario);
        let feature = login.and_then(|s| catalog.feature_for_scenario(s));
        assert_eq!(feature.map(|f| f.name.as_str()), Some("Admin"));
        let detached = scenario("Login", &[]);
        assert!(catalog.feature_for_scenario(&detached).is_none());
    }

    #[rstest]
    fn lists_every_scenario_in_order(catalog: TestCatalog) {
        let all: Vec<_> = catalog.scenarios().map(|s| (s.feature.name.clone(), s.index)).collect();
        assert_eq!(
            all,
            [
                ("Shop".to_owned(), 0),
                ("Shop".to_owned(), 1),
                ("Admin".to_owned(), 0),
                ("Admin".to_owned(), 1)
            ]
        );
    }
}
