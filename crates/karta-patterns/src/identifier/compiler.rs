//! Convert lexed tokens into cursor-anchored segment matchers.

use regex::Regex;

use crate::errors::PatternError;
use crate::hint::{ExpressionKind, get_expression_pattern};

use super::lexer::{Token, lex_identifier};
use super::{Segment, SegmentKind};

/// Compile an identifier into its ordered segments.
///
/// Each regular expression is anchored with `^` so it only matches at the
/// current cursor when applied to the remaining step text.
pub(crate) fn compile_segments(identifier: &str) -> Result<Vec<Segment>, PatternError> {
    lex_identifier(identifier)?
        .into_iter()
        .map(compile_token)
        .collect()
}

fn compile_token(token: Token) -> Result<Segment, PatternError> {
    match token {
        Token::Literal(text) => Ok(Segment {
            kind: SegmentKind::Text,
            source: text,
            matchers: Vec::new(),
        }),
        Token::Quoted { body, .. } => {
            // The quoted form is tried first so bare patterns such as `.*`
            // cannot swallow the surrounding quotes.
            let matchers = vec![
                Regex::new(&format!("^\"(?:{body})\""))?,
                Regex::new(&format!("^(?:{body})"))?,
            ];
            Ok(Segment {
                kind: SegmentKind::Regex,
                source: body,
                matchers,
            })
        }
        Token::Expression { kind, .. } => Ok(Segment {
            kind: SegmentKind::from(kind),
            source: format!("{{{}}}", expression_name(kind)),
            matchers: vec![Regex::new(&format!(
                "^(?:{})",
                get_expression_pattern(kind)
            ))?],
        }),
    }
}

const fn expression_name(kind: ExpressionKind) -> &'static str {
    match kind {
        ExpressionKind::Int => "int",
        ExpressionKind::Float => "float",
        ExpressionKind::Word => "word",
        ExpressionKind::String => "string",
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests compile fixed identifiers")]
mod tests {
    use super::*;

    #[test]
    fn builds_text_and_expression_segments() {
        let segments = compile_segments("I have {int} {word}").unwrap();
        let kinds: Vec<_> = segments.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SegmentKind::Text,
                SegmentKind::Int,
                SegmentKind::Text,
                SegmentKind::Word,
            ]
        );
    }

    #[test]
    fn quoted_segments_try_quoted_form_first() {
        let segments = compile_segments(r#""\d+""#).unwrap();
        let sources: Vec<_> = segments
            .first()
            .unwrap()
            .matchers
            .iter()
            .map(Regex::as_str)
            .collect();
        assert_eq!(sources, vec![r#"^"(?:\d+)""#, r"^(?:\d+)"]);
    }

    #[test]
    fn surfaces_regex_compilation_errors() {
        let err = compile_segments(r#"bad "(unclosed""#).unwrap_err();
        assert!(matches!(err, PatternError::Regex(_)));
    }
}
