//! Step identifier compilation and matching.
//!
//! An identifier is compiled once into segments. Matching walks the segments
//! left to right against the step text: literal segments must appear verbatim
//! at the cursor, pattern segments must match at the cursor, and the cursor
//! must land exactly on the end of the text. Segments never backtrack.

mod compiler;
mod lexer;

use std::fmt;

use regex::Regex;

use crate::capture::{Parameter, convert_captured};
use crate::errors::PatternError;
use crate::hint::ExpressionKind;

/// Kind of a compiled identifier segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Literal text matched byte for byte.
    Text,
    /// A quoted regular expression matching its quoted or bare form.
    Regex,
    /// A `{int}`-family expression.
    Int,
    /// A `{float}`-family expression.
    Float,
    /// A `{word}` expression.
    Word,
    /// A `{string}` expression.
    String,
}

impl From<ExpressionKind> for SegmentKind {
    fn from(kind: ExpressionKind) -> Self {
        match kind {
            ExpressionKind::Int => Self::Int,
            ExpressionKind::Float => Self::Float,
            ExpressionKind::Word => Self::Word,
            ExpressionKind::String => Self::String,
        }
    }
}

/// One compiled piece of a step identifier.
#[derive(Debug, Clone)]
pub struct Segment {
    kind: SegmentKind,
    source: String,
    matchers: Vec<Regex>,
}

impl Segment {
    /// Kind of this segment.
    #[must_use]
    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// Literal text, regex body or expression name the segment was built from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match this segment at the start of `rest`, returning the consumed byte
    /// count and the captured parameter for pattern segments.
    fn match_at(&self, rest: &str) -> Option<(usize, Option<Parameter>)> {
        if self.kind == SegmentKind::Text {
            return rest
                .starts_with(self.source.as_str())
                .then_some((self.source.len(), None));
        }
        self.matchers.iter().find_map(|matcher| {
            let found = matcher.find(rest)?;
            let parameter = convert_captured(self.kind, found.as_str())?;
            Some((found.end(), Some(parameter)))
        })
    }
}

/// A compiled step identifier.
///
/// # Examples
/// ```
/// use karta_patterns::{Parameter, StepIdentifier};
///
/// let id = StepIdentifier::compile(r#"I have "\d+" cucumbers"#).unwrap();
/// assert_eq!(id.matches("I have 10 cucumbers"), Some(vec![Parameter::Int(10)]));
/// assert_eq!(id.matches(r#"I have "10" cucumbers"#), Some(vec![Parameter::Int(10)]));
/// assert_eq!(id.matches(r#"I have "10" cucumbers in my basket"#), None);
/// ```
#[derive(Debug, Clone)]
pub struct StepIdentifier {
    source: String,
    segments: Vec<Segment>,
}

impl StepIdentifier {
    /// Compile an identifier into its segments.
    ///
    /// # Errors
    /// Returns [`PatternError`] when the identifier holds an unterminated
    /// quote or expression, an unknown expression, or an invalid regex.
    pub fn compile(source: &str) -> Result<Self, PatternError> {
        Ok(Self {
            source: source.to_owned(),
            segments: compiler::compile_segments(source)?,
        })
    }

    /// Identifier text as written at registration.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Compiled segments in declaration order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match `text` against the identifier, returning the typed parameters in
    /// declaration order, or `None` when the text does not match completely.
    #[must_use]
    pub fn matches(&self, text: &str) -> Option<Vec<Parameter>> {
        let mut cursor = 0usize;
        let mut parameters = Vec::new();
        for segment in &self.segments {
            let rest = text.get(cursor..)?;
            let (consumed, parameter) = segment.match_at(rest)?;
            cursor += consumed;
            parameters.extend(parameter);
        }
        (cursor == text.len()).then_some(parameters)
    }

    /// Report whether `text` matches the identifier.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.matches(text).is_some()
    }
}

impl PartialEq for StepIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for StepIdentifier {}

impl fmt::Display for StepIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests compile fixed identifiers")]
mod tests {
    use super::*;
    use rstest::rstest;

    fn identifier(source: &str) -> StepIdentifier {
        StepIdentifier::compile(source).unwrap()
    }

    #[rstest]
    #[case("I have 10 cucumbers")]
    #[case(r#"I have "10" cucumbers"#)]
    fn regex_segment_matches_quoted_and_bare(#[case] text: &str) {
        let id = identifier(r#"I have "\d+" cucumbers"#);
        assert_eq!(id.matches(text), Some(vec![Parameter::Int(10)]));
    }

    #[test]
    fn rejects_trailing_text() {
        let id = identifier(r#"I have "\d+" cucumbers"#);
        assert_eq!(id.matches(r#"I have "10" cucumbers in my basket"#), None);
    }

    #[test]
    fn extracts_cucumber_expressions_in_order() {
        let id = identifier("I have {int} {word} and my message is {string}");
        assert_eq!(
            id.matches(r#"I have 10 oranges and my message is "hi there""#),
            Some(vec![
                Parameter::Int(10),
                Parameter::Text("oranges".into()),
                Parameter::Text("hi there".into()),
            ])
        );
    }

    #[rstest]
    #[case("the price is 5", 5.0)]
    #[case("the price is 5.", 5.0)]
    #[case("the price is .5", 0.5)]
    #[case("the price is -5", -5.0)]
    #[case("the price is -.5", -0.5)]
    fn float_expression_accepts_decimal_forms(#[case] text: &str, #[case] expected: f64) {
        let id = identifier("the price is {double}");
        assert_eq!(id.matches(text), Some(vec![Parameter::Float(expected)]));
    }

    #[test]
    fn literal_only_identifier_requires_exact_text() {
        let id = identifier("the basket is empty");
        assert_eq!(id.matches("the basket is empty"), Some(Vec::new()));
        assert!(!id.is_match("the basket is empty!"));
        assert!(!id.is_match("the basket is"));
    }

    #[test]
    fn does_not_backtrack_across_segments() {
        // `\w+` consumes `ab` leaving nothing for the trailing `b`.
        let id = identifier("{word}b");
        assert!(!id.is_match("ab"));
    }

    #[test]
    fn handles_multibyte_text() {
        let id = identifier("café {int}");
        assert_eq!(id.matches("café 3"), Some(vec![Parameter::Int(3)]));
    }
}
