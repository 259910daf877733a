//! Errors raised while compiling Kriya source.

use thiserror::Error;

use crate::model::ValidationError;

/// Kriya source could not be compiled into a feature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A character that starts no token.
    #[error("line {line}: illegal character {character:?}")]
    IllegalCharacter {
        /// One-based line.
        line: usize,
        /// Offending character.
        character: char,
    },
    /// A string, comment or doc string runs to the end of input.
    #[error("line {line}: unterminated {what}")]
    Unterminated {
        /// One-based line where the construct starts.
        line: usize,
        /// Construct name.
        what: &'static str,
    },
    /// A literal cannot be converted to its value.
    #[error("line {line}: invalid {what} `{text}`")]
    InvalidLiteral {
        /// One-based line.
        line: usize,
        /// Literal kind.
        what: &'static str,
        /// Literal text.
        text: String,
    },
    /// The grammar expected something else.
    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        /// One-based line of the found token.
        line: usize,
        /// Description of what was expected.
        expected: String,
        /// Description of the token found.
        found: String,
    },
    /// Input ended early.
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEof {
        /// Description of what was expected.
        expected: String,
    },
    /// An `Examples:` table or step table is malformed.
    #[error("line {line}: {reason}")]
    InvalidTable {
        /// One-based line of the table.
        line: usize,
        /// Reason.
        reason: String,
    },
    /// The compiled feature breaks an invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ParseError {
    /// Line the error was raised at, when known.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::IllegalCharacter { line, .. }
            | Self::Unterminated { line, .. }
            | Self::InvalidLiteral { line, .. }
            | Self::UnexpectedToken { line, .. }
            | Self::InvalidTable { line, .. } => Some(*line),
            Self::UnexpectedEof { .. } | Self::Validation(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_line_prefixed_messages() {
        let err = ParseError::IllegalCharacter {
            line: 7,
            character: '&',
        };
        assert_eq!(err.to_string(), "line 7: illegal character '&'");
        assert_eq!(err.line(), Some(7));
    }

    #[test]
    fn forwards_validation_messages() {
        let err = ParseError::from(ValidationError::NoScenarios {
            feature: "f".into(),
        });
        assert_eq!(err.to_string(), "feature `f` must contain at least one scenario");
        assert_eq!(err.line(), None);
    }
}
