//! Identifier lexer converting step identifiers into semantic tokens.

use crate::errors::{PatternError, segment_error};
use crate::hint::ExpressionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Literal(String),
    Quoted { start: usize, body: String },
    Expression { start: usize, kind: ExpressionKind },
}

pub(crate) fn lex_identifier(identifier: &str) -> Result<Vec<Token>, PatternError> {
    let mut chars = identifier.char_indices().peekable();
    let mut tokens = Vec::new();
    let mut literal = String::new();

    let flush_literal = |literal: &mut String, tokens: &mut Vec<Token>| {
        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(literal)));
        }
    };

    while let Some((pos, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, next)) => literal.push(next),
                None => literal.push('\\'),
            },
            '"' => {
                flush_literal(&mut literal, &mut tokens);
                let mut body = String::new();
                let mut closed = false;
                while let Some((_, inner)) = chars.next() {
                    match inner {
                        '\\' if chars.peek().is_some_and(|&(_, n)| n == '"') => {
                            body.push('"');
                            chars.next();
                        }
                        '"' => {
                            closed = true;
                            break;
                        }
                        other => body.push(other),
                    }
                }
                if !closed {
                    return Err(segment_error("unterminated quoted segment", pos, Some(body)));
                }
                tokens.push(Token::Quoted { start: pos, body });
            }
            '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                chars.next();
                literal.push('{');
            }
            '{' if chars.peek().is_some_and(|&(_, n)| n.is_ascii_alphabetic()) => {
                flush_literal(&mut literal, &mut tokens);
                let mut name = String::new();
                let mut closed = false;
                for (_, inner) in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    name.push(inner);
                }
                if !closed {
                    return Err(segment_error("unterminated expression", pos, Some(name)));
                }
                let Some(kind) = ExpressionKind::from_name(&name) else {
                    return Err(segment_error("unknown expression", pos, Some(name)));
                };
                tokens.push(Token::Expression { start: pos, kind });
            }
            '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                chars.next();
                literal.push('}');
            }
            other => literal.push(other),
        }
    }

    flush_literal(&mut literal, &mut tokens);
    Ok(tokens)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests exercise lexing fallibility")]
mod tests {
    use super::*;

    #[test]
    fn tokenises_literals_and_expressions() {
        let tokens = lex_identifier("I have {int} apples").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal("I have ".into()),
                Token::Expression {
                    start: 7,
                    kind: ExpressionKind::Int,
                },
                Token::Literal(" apples".into()),
            ]
        );
    }

    #[test]
    fn keeps_regex_escapes_inside_quotes() {
        let tokens = lex_identifier(r#"I have "\d+" cucumbers"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Literal("I have ".into()),
                Token::Quoted {
                    start: 7,
                    body: r"\d+".into(),
                },
                Token::Literal(" cucumbers".into()),
            ]
        );
    }

    #[test]
    fn unescapes_literal_quotes_and_braces() {
        let tokens = lex_identifier(r#"say \"hi\" {{ok}}"#).unwrap();
        assert_eq!(tokens, vec![Token::Literal("say \"hi\" {ok}".into())]);
    }

    #[test]
    fn leaves_non_expression_braces_literal() {
        let tokens = lex_identifier("a { b }").unwrap();
        assert_eq!(tokens, vec![Token::Literal("a { b }".into())]);
    }

    #[test]
    fn errors_on_unterminated_quote() {
        let err = lex_identifier(r#"I have "\d+ cucumbers"#).unwrap_err();
        assert!(err.to_string().contains("unterminated quoted segment"));
    }

    #[test]
    fn errors_on_unknown_expression() {
        let err = lex_identifier("a {colour} b").unwrap_err();
        assert!(err.to_string().contains("unknown expression for segment `colour`"));
    }

    #[test]
    fn errors_on_unterminated_expression() {
        let err = lex_identifier("a {int").unwrap_err();
        assert!(err.to_string().contains("unterminated expression"));
    }
}
