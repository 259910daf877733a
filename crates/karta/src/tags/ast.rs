//! Parsed tag expressions and their evaluation.
//!
//! `not` binds tighter than `and`, which binds tighter than `or`; binary
//! operators group to the left. Evaluation short-circuits.

use hashbrown::HashSet;
use thiserror::Error;

use super::normalize_tag;
use super::parser::Parser;

/// A compiled tag expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagExpression {
    source: String,
    root: Expr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Expr {
    Tag(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// A tag expression could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid tag expression at byte {offset}: {reason}")]
pub struct TagExprError {
    /// Byte offset of the offending input.
    pub offset: usize,
    /// What went wrong.
    pub reason: String,
}

impl TagExprError {
    pub(super) fn new(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            offset,
            reason: reason.into(),
        }
    }
}

impl TagExpression {
    /// Parse `input`.
    ///
    /// # Errors
    /// Returns [`TagExprError`] with the byte offset of the first problem.
    ///
    /// # Examples
    /// ```
    /// use karta::tags::TagExpression;
    ///
    /// let expr = TagExpression::parse("@smoke and not @slow").unwrap();
    /// assert!(expr.evaluate(["smoke"]));
    /// assert!(!expr.evaluate(["smoke", "@slow"]));
    /// ```
    pub fn parse(input: &str) -> Result<Self, TagExprError> {
        let root = Parser::new(input)?.parse()?;
        Ok(Self {
            source: input.trim().to_owned(),
            root,
        })
    }

    /// Expression text as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate against `tags`, which may be written with or without `@`.
    pub fn evaluate<'a, I>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let set: HashSet<&str> = tags.into_iter().map(normalize_tag).collect();
        self.root.eval(&set)
    }
}

impl std::fmt::Display for TagExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for TagExpression {
    type Err = TagExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Expr {
    fn eval(&self, tags: &HashSet<&str>) -> bool {
        match self {
            Self::Tag(tag) => tags.contains(tag.as_str()),
            Self::Not(inner) => !inner.eval(tags),
            Self::And(lhs, rhs) => lhs.eval(tags) && rhs.eval(tags),
            Self::Or(lhs, rhs) => lhs.eval(tags) || rhs.eval(tags),
        }
    }
}
