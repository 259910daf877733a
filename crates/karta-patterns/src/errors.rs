//! Error types shared by the identifier parsing modules.

use std::fmt;
use thiserror::Error;

/// Additional context for segment-related parsing errors.
///
/// # Examples
/// ```
/// use karta_patterns::SegmentErrorInfo;
/// let info = SegmentErrorInfo::new("unknown expression", 3, Some("colour".into()));
/// assert_eq!(info.segment.as_deref(), Some("colour"));
/// assert_eq!(info.position, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentErrorInfo {
    /// Human readable reason.
    pub message: &'static str,
    /// Byte offset of the offending segment in the identifier.
    pub position: usize,
    /// Offending segment text, when one could be isolated.
    pub segment: Option<String>,
}

impl SegmentErrorInfo {
    /// Create a new error description for a segment failure.
    #[must_use]
    pub fn new(message: &'static str, position: usize, segment: Option<String>) -> Self {
        Self {
            message,
            position,
            segment,
        }
    }
}

impl fmt::Display for SegmentErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.segment {
            Some(text) => write!(
                f,
                "{} for segment `{}` at byte {} (zero-based)",
                self.message, text, self.position
            ),
            None => write!(f, "{} at byte {} (zero-based)", self.message, self.position),
        }
    }
}

/// Errors surfaced while compiling step identifiers.
///
/// # Examples
/// ```
/// use karta_patterns::{PatternError, SegmentErrorInfo};
/// let info = SegmentErrorInfo::new("unterminated quoted segment", 2, None);
/// let err = PatternError::Segment(info.clone());
/// assert_eq!(err.to_string(), info.to_string());
/// ```
#[derive(Debug, Error)]
pub enum PatternError {
    /// The identifier contains a malformed segment.
    #[error("{0}")]
    Segment(SegmentErrorInfo),
    /// A quoted segment holds an invalid regular expression.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub(crate) fn segment_error(
    message: &'static str,
    position: usize,
    segment: Option<String>,
) -> PatternError {
    PatternError::Segment(SegmentErrorInfo::new(message, position, segment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_segment_with_text() {
        let info = SegmentErrorInfo::new("unknown expression", 4, Some("colour".into()));
        assert_eq!(
            info.to_string(),
            "unknown expression for segment `colour` at byte 4 (zero-based)"
        );
    }

    #[test]
    fn formats_segment_without_text() {
        let info = SegmentErrorInfo::new("oops", 1, None);
        assert_eq!(info.to_string(), "oops at byte 1 (zero-based)");
    }

    #[test]
    fn forwards_regex_error_display() {
        let err = PatternError::Regex(regex::Error::Syntax("bad".into()));
        assert_eq!(
            err.to_string(),
            regex::Error::Syntax("bad".into()).to_string()
        );
    }
}
