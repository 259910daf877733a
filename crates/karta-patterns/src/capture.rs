//! Typed values captured while matching step text.

use std::fmt;

use crate::identifier::SegmentKind;

/// A parameter extracted from step text, converted according to its segment.
///
/// # Examples
/// ```
/// use karta_patterns::Parameter;
/// let value = Parameter::Int(10);
/// assert_eq!(value.as_i64(), Some(10));
/// assert_eq!(value.to_string(), "10");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(untagged)
)]
pub enum Parameter {
    /// A signed integer.
    Int(i64),
    /// A decimal number.
    Float(f64),
    /// Any other text, with surrounding quotes removed.
    Text(String),
}

impl Parameter {
    /// Return the integer value, if this parameter holds one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Float(_) | Self::Text(_) => None,
        }
    }

    /// Return the numeric value as `f64`, widening integers.
    #[must_use]
    #[expect(
        clippy::cast_precision_loss,
        reason = "step parameters are human-written numbers well inside f64 precision"
    )]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    /// Return the text value, if this parameter holds one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Int(_) | Self::Float(_) => None,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

/// Convert the raw text matched by a segment into its typed form.
///
/// Returns `None` when the text cannot be represented, for example an integer
/// that overflows `i64`; the caller treats that as a failed match.
pub(crate) fn convert_captured(kind: SegmentKind, raw: &str) -> Option<Parameter> {
    match kind {
        SegmentKind::Int => raw.parse().ok().map(Parameter::Int),
        SegmentKind::Float => raw.parse().ok().map(Parameter::Float),
        SegmentKind::Word => Some(Parameter::Text(raw.to_owned())),
        SegmentKind::String => Some(Parameter::Text(unquote(raw).replace("\\\"", "\""))),
        SegmentKind::Regex => Some(coerce_numeric(unquote(raw))),
        SegmentKind::Text => None,
    }
}

fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(raw)
}

fn coerce_numeric(value: &str) -> Parameter {
    if let Ok(int) = value.parse::<i64>() {
        return Parameter::Int(int);
    }
    let looks_numeric = value.chars().any(|c| c.is_ascii_digit())
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-');
    match value.parse::<f64>() {
        Ok(float) if looks_numeric => Parameter::Float(float),
        _ => Parameter::Text(value.to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SegmentKind::Int, "-42", Parameter::Int(-42))]
    #[case(SegmentKind::Float, ".5", Parameter::Float(0.5))]
    #[case(SegmentKind::Word, "oranges", Parameter::Text("oranges".into()))]
    #[case(SegmentKind::String, "\"hi there\"", Parameter::Text("hi there".into()))]
    #[case(SegmentKind::String, r#""say \"hi\"""#, Parameter::Text("say \"hi\"".into()))]
    #[case(SegmentKind::Regex, "\"10\"", Parameter::Int(10))]
    #[case(SegmentKind::Regex, "2.5", Parameter::Float(2.5))]
    #[case(SegmentKind::Regex, "\"abc\"", Parameter::Text("abc".into()))]
    #[case(SegmentKind::Regex, "inf", Parameter::Text("inf".into()))]
    fn converts_by_segment_kind(
        #[case] kind: SegmentKind,
        #[case] raw: &str,
        #[case] expected: Parameter,
    ) {
        assert_eq!(convert_captured(kind, raw), Some(expected));
    }

    #[test]
    fn rejects_overflowing_integers() {
        assert_eq!(
            convert_captured(SegmentKind::Int, "99999999999999999999"),
            None
        );
    }

    #[test]
    fn widens_integers_to_floats() {
        assert_eq!(Parameter::Int(3).as_f64(), Some(3.0));
        assert_eq!(Parameter::Text("x".into()).as_f64(), None);
    }
}
