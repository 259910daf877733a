//! Step conjunctions and the step types they introduce.
//!
//! Every step line in a feature starts with a conjunction. The conjunction
//! decides whether the line is a plain step, a condition guarding a nested
//! block, or a loop repeating one.

use std::fmt;
use std::str::FromStr;

/// Structural type of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum StepType {
    /// A plain action or assertion.
    Step,
    /// A guard running its nested steps once when truthy.
    Condition,
    /// A guard repeating its nested steps while truthy.
    Loop,
}

/// Textual prefix of a step line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Conjunction {
    /// Setup preconditions for a scenario.
    Given,
    /// Perform an action.
    When,
    /// Assert an outcome.
    Then,
    /// Continue the previous step kind.
    And,
    /// Contrasting continuation.
    But,
    /// `If` condition.
    If,
    /// `Condition:` condition.
    Condition,
    /// Loop while the guard holds.
    While,
    /// Loop guarded by an `Until` line; the guard handler decides when to stop.
    Until,
}

impl Conjunction {
    /// Every conjunction, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Given,
        Self::When,
        Self::Then,
        Self::And,
        Self::But,
        Self::If,
        Self::Condition,
        Self::While,
        Self::Until,
    ];

    /// Return the conjunction as written in feature text.
    ///
    /// # Examples
    ///
    /// ```
    /// use karta_patterns::Conjunction;
    ///
    /// assert_eq!(Conjunction::Given.as_str(), "Given");
    /// assert_eq!(Conjunction::Condition.as_str(), "Condition");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
            Self::If => "If",
            Self::Condition => "Condition",
            Self::While => "While",
            Self::Until => "Until",
        }
    }

    /// Step type introduced by this conjunction.
    ///
    /// # Examples
    ///
    /// ```
    /// use karta_patterns::{Conjunction, StepType};
    ///
    /// assert_eq!(Conjunction::But.step_type(), StepType::Step);
    /// assert_eq!(Conjunction::If.step_type(), StepType::Condition);
    /// assert_eq!(Conjunction::Until.step_type(), StepType::Loop);
    /// ```
    #[must_use]
    pub const fn step_type(&self) -> StepType {
        match self {
            Self::Given | Self::When | Self::Then | Self::And | Self::But => StepType::Step,
            Self::If | Self::Condition => StepType::Condition,
            Self::While | Self::Until => StepType::Loop,
        }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`Conjunction`] from a string fails.
///
/// Contains the unrecognised text for diagnostic purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConjunctionParseError(pub String);

impl fmt::Display for ConjunctionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid step conjunction: {}", self.0)
    }
}

impl std::error::Error for ConjunctionParseError {}

impl FromStr for Conjunction {
    type Err = ConjunctionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().trim_end_matches(':');
        Self::ALL
            .into_iter()
            .find(|c| trimmed.eq_ignore_ascii_case(c.as_str()))
            .ok_or_else(|| ConjunctionParseError(value.trim().to_string()))
    }
}

impl TryFrom<&str> for Conjunction {
    type Error = ConjunctionParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}
