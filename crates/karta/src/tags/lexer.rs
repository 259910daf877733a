//! Splits tag expressions into tags, keywords and parentheses.
//!
//! Keywords are case insensitive. Tags keep alphanumerics and `_ - . :`
//! after the `@`, which is dropped from the token.

use super::ast::TagExprError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum TokenKind {
    Tag(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

#[derive(Clone, Debug)]
pub(super) struct Token {
    pub(super) kind: TokenKind,
    pub(super) offset: usize,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tag(tag) => write!(f, "@{tag}"),
            Self::And => f.write_str("'and'"),
            Self::Or => f.write_str("'or'"),
            Self::Not => f.write_str("'not'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
        }
    }
}

/// Tokenise the whole expression up front.
pub(super) fn tokenize(input: &str) -> Result<Vec<Token>, TagExprError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some((offset, ch)) = chars.next() {
        let kind = match ch {
            c if c.is_whitespace() => continue,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '@' => {
                let mut tag = String::new();
                while let Some((_, c)) = chars.next_if(|(_, c)| is_tag_char(*c)) {
                    tag.push(c);
                }
                if tag.is_empty() {
                    return Err(TagExprError::new(offset + 1, "expected tag name after '@'"));
                }
                TokenKind::Tag(tag)
            }
            c if c.is_ascii_alphabetic() => {
                let mut word = String::from(c);
                while let Some((_, c)) = chars.next_if(|(_, c)| c.is_ascii_alphabetic()) {
                    word.push(c);
                }
                match word.to_ascii_lowercase().as_str() {
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "not" => TokenKind::Not,
                    _ => {
                        return Err(TagExprError::new(
                            offset,
                            format!("unexpected identifier '{word}', tags start with '@'"),
                        ));
                    }
                }
            }
            other => {
                return Err(TagExprError::new(
                    offset,
                    format!("unexpected character '{other}'"),
                ));
            }
        };
        tokens.push(Token { kind, offset });
    }
    Ok(tokens)
}

fn is_tag_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':')
}
