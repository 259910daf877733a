//! Tokenises Kriya source text.
//!
//! The lexer runs in two modes. In *block* mode it reads whole lines: tags,
//! keyword lines, step lines, doc strings, tables and free-text description
//! lines. In *data* mode, entered by an opening bracket of a data literal or
//! a generator directive, it reads JSON-like tokens until the brackets
//! balance again. A `{` directly after a `Steps:` marker opens a nested step
//! block and stays in block mode.
//!
//! Whitespace and comments (`#` to end of line, `/* … */`) are skipped in
//! both modes while still advancing the line counter. Any character that
//! starts no token in data mode is a fatal error.

use karta_patterns::Conjunction;

use super::error::ParseError;
use super::token::{Directive, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Block,
    Data(char),
}

#[derive(Debug, Clone, Copy)]
enum LineKeyword {
    Feature,
    Background,
    Outline,
    Examples,
    Scenario,
    Iterations,
    Policy,
    Probability,
    Condition,
}

// Most specific prefixes first so `Scenario Outline:` never lexes as text
// and `Examples:` never lexes as `Example:`.
const LINE_KEYWORDS: &[(&str, LineKeyword)] = &[
    ("Scenario Outline:", LineKeyword::Outline),
    ("Scenario Template:", LineKeyword::Outline),
    ("Feature:", LineKeyword::Feature),
    ("Background:", LineKeyword::Background),
    ("Examples:", LineKeyword::Examples),
    ("Scenarios:", LineKeyword::Examples),
    ("Scenario:", LineKeyword::Scenario),
    ("Example:", LineKeyword::Scenario),
    ("IterationPolicy:", LineKeyword::Policy),
    ("Iterations:", LineKeyword::Iterations),
    ("Probability:", LineKeyword::Probability),
    ("Condition:", LineKeyword::Condition),
];

const STEPS_MARKER: &str = "Steps:";

/// Split Kriya source into tokens.
///
/// # Errors
/// Returns [`ParseError`] for illegal characters, unterminated strings,
/// comments and doc strings, and malformed literals.
///
/// # Examples
/// ```
/// use karta::kriya::{TokenKind, tokenize};
///
/// let tokens = tokenize("Feature: Basket\n  Scenario: Empty\n    Given an empty basket").unwrap();
/// let kinds: Vec<_> = tokens.into_iter().map(|t| t.kind).collect();
/// assert!(matches!(kinds.first(), Some(TokenKind::Feature(name)) if name == "Basket"));
/// assert_eq!(kinds.len(), 3);
/// ```
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    frames: Vec<Frame>,
    directive_pending: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            frames: Vec::new(),
            directive_pending: false,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        loop {
            self.skip_trivia()?;
            if self.rest().is_empty() {
                break;
            }
            if self.in_data() {
                self.lex_data()?;
            } else {
                self.lex_block()?;
            }
        }
        Ok(self.tokens)
    }

    fn rest(&self) -> &'a str {
        self.input.get(self.pos..).unwrap_or_default()
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump_char(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    /// Consume `len` bytes already known to lie on character boundaries.
    fn advance(&mut self, len: usize) {
        let consumed = self.rest().get(..len).unwrap_or_default();
        self.line += consumed.matches('\n').count();
        self.pos += consumed.len();
    }

    fn push(&mut self, kind: TokenKind, line: usize) {
        self.tokens.push(Token::new(kind, line));
    }

    fn in_data(&self) -> bool {
        self.directive_pending || matches!(self.frames.last(), Some(Frame::Data(_)))
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            let rest = self.rest();
            if rest.starts_with(char::is_whitespace) {
                self.bump_char();
            } else if rest.starts_with('#') {
                self.advance(rest.find('\n').unwrap_or(rest.len()));
            } else if rest.starts_with("/*") {
                let Some(end) = rest.find("*/") else {
                    return Err(ParseError::Unterminated {
                        line: self.line,
                        what: "comment",
                    });
                };
                self.advance(end + 2);
            } else {
                return Ok(());
            }
        }
    }

    fn lex_block(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        let rest = self.rest();
        if rest.starts_with("\"\"\"") {
            return self.lex_doc_string("\"\"\"");
        }
        if rest.starts_with("```") {
            return self.lex_doc_string("```");
        }
        // Tables and data only follow the line they belong to; anywhere else
        // these characters start free text.
        let previous = self.tokens.last().map(|t| &t.kind);
        let after_step = matches!(
            previous,
            Some(TokenKind::Step(..) | TokenKind::Condition(..) | TokenKind::Loop(..))
        );
        let after_examples = previous == Some(&TokenKind::Examples);
        let after_marker = previous == Some(&TokenKind::Steps);
        match self.peek_char() {
            Some('@') => self.lex_tag(),
            Some('|') if after_step || after_examples => self.lex_table(),
            Some('$') if after_step => self.lex_directive(),
            Some('{') if after_step || after_marker => {
                self.bump_char();
                self.frames.push(if after_step {
                    Frame::Data('}')
                } else {
                    Frame::Block
                });
                self.push(TokenKind::LBrace, line);
                Ok(())
            }
            Some('[') if after_step => {
                self.bump_char();
                self.frames.push(Frame::Data(']'));
                self.push(TokenKind::LBracket, line);
                Ok(())
            }
            Some('}') => {
                self.bump_char();
                if self.frames.last() == Some(&Frame::Block) {
                    self.frames.pop();
                }
                self.push(TokenKind::RBrace, line);
                Ok(())
            }
            _ => self.lex_line(),
        }
    }

    fn lex_line(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        let rest = self.rest();
        if rest.starts_with(STEPS_MARKER) {
            self.advance(STEPS_MARKER.len());
            self.push(TokenKind::Steps, line);
            return Ok(());
        }
        let text = rest.split('\n').next().unwrap_or_default();
        let kind = classify_line(text.trim_end(), line)?;
        self.advance(text.len());
        self.push(kind, line);
        Ok(())
    }

    fn lex_tag(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        self.bump_char();
        let rest = self.rest();
        let len = rest.find(['\n', '@', '#']).unwrap_or(rest.len());
        let tag = rest.get(..len).unwrap_or_default().trim().to_owned();
        if tag.is_empty() {
            return Err(ParseError::InvalidLiteral {
                line,
                what: "tag",
                text: "@".into(),
            });
        }
        self.advance(len);
        self.push(TokenKind::Tag(tag), line);
        Ok(())
    }

    fn lex_doc_string(&mut self, fence: &'static str) -> Result<(), ParseError> {
        let line = self.line;
        let after_open = self.rest().get(fence.len()..).unwrap_or_default();
        let Some(end) = after_open.find(fence) else {
            return Err(ParseError::Unterminated {
                line,
                what: "doc string",
            });
        };
        let content = after_open
            .get(..end)
            .unwrap_or_default()
            .trim()
            .lines()
            .map(str::trim_start)
            .collect::<Vec<_>>()
            .join("\n");
        self.advance(fence.len() + end + fence.len());
        self.push(TokenKind::DocString(content), line);
        Ok(())
    }

    fn lex_table(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        let mut rows = Vec::new();
        loop {
            let text = self.rest().split('\n').next().unwrap_or_default();
            rows.push(parse_row(text.trim(), self.line)?);
            self.advance(text.len());
            let Some(next_line) = self.rest().strip_prefix('\n') else {
                break;
            };
            let body = next_line.trim_start_matches([' ', '\t']);
            if !body.starts_with('|') {
                break;
            }
            self.advance(1 + next_line.len() - body.len());
        }
        self.push(TokenKind::Table(rows), line);
        Ok(())
    }

    fn lex_directive(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        let name_part = self.rest().get(1..).unwrap_or_default();
        let len = name_part
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(name_part.len());
        let name = name_part.get(..len).unwrap_or_default();
        let Some(directive) = Directive::from_name(name) else {
            return Err(ParseError::InvalidLiteral {
                line,
                what: "data directive",
                text: format!("${name}"),
            });
        };
        self.advance(1 + len);
        self.push(TokenKind::Directive(directive), line);
        self.directive_pending = true;
        Ok(())
    }

    fn lex_data(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        self.directive_pending = false;
        let Some(ch) = self.peek_char() else {
            return Ok(());
        };
        let kind = match ch {
            '{' | '[' | '(' => {
                self.bump_char();
                let (closer, kind) = match ch {
                    '{' => ('}', TokenKind::LBrace),
                    '[' => (']', TokenKind::LBracket),
                    _ => (')', TokenKind::LParen),
                };
                self.frames.push(Frame::Data(closer));
                kind
            }
            '}' | ']' | ')' => {
                if self.frames.last() != Some(&Frame::Data(ch)) {
                    return Err(ParseError::UnexpectedToken {
                        line,
                        expected: "a matching bracket".into(),
                        found: format!("'{ch}'"),
                    });
                }
                self.bump_char();
                self.frames.pop();
                match ch {
                    '}' => TokenKind::RBrace,
                    ']' => TokenKind::RBracket,
                    _ => TokenKind::RParen,
                }
            }
            ',' => {
                self.bump_char();
                TokenKind::Comma
            }
            ':' => {
                self.bump_char();
                TokenKind::Colon
            }
            '"' => return self.lex_string(),
            '%' => return self.lex_percent(),
            '$' => return self.lex_directive(),
            '-' | '0'..='9' => return self.lex_number(),
            c if c == '_' || c.is_ascii_alphabetic() => return self.lex_word(),
            other => {
                return Err(ParseError::IllegalCharacter {
                    line,
                    character: other,
                });
            }
        };
        self.push(kind, line);
        Ok(())
    }

    fn lex_string(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        let unterminated = ParseError::Unterminated {
            line,
            what: "string",
        };
        self.bump_char();
        let mut value = String::new();
        loop {
            match self.bump_char() {
                None | Some('\n') => return Err(unterminated),
                Some('"') => break,
                Some('\\') => {
                    let escaped = match self.bump_char() {
                        None => return Err(unterminated),
                        Some('u') => self.lex_unicode_escape(line)?,
                        Some(other) => unescape(other).ok_or_else(|| {
                            ParseError::InvalidLiteral {
                                line,
                                what: "escape sequence",
                                text: format!("\\{other}"),
                            }
                        })?,
                    };
                    value.push(escaped);
                }
                Some(other) => value.push(other),
            }
        }
        self.push(TokenKind::String(value), line);
        Ok(())
    }

    fn lex_unicode_escape(&mut self, line: usize) -> Result<char, ParseError> {
        let hex = self.rest().get(..4).unwrap_or_default();
        let decoded = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
        let Some(ch) = decoded.filter(|_| hex.len() == 4) else {
            return Err(ParseError::InvalidLiteral {
                line,
                what: "escape sequence",
                text: format!("\\u{hex}"),
            });
        };
        self.advance(4);
        Ok(ch)
    }

    fn lex_number(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        let rest = self.rest();
        let text = rest.get(..number_len(rest)).unwrap_or_default();
        let invalid = || ParseError::InvalidLiteral {
            line,
            what: "number",
            text: text.to_owned(),
        };
        if !text.bytes().any(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let kind = if text.contains(['.', 'e', 'E']) {
            TokenKind::Float(text.parse().map_err(|_| invalid())?)
        } else {
            TokenKind::Integer(text.parse().map_err(|_| invalid())?)
        };
        self.advance(text.len());
        self.push(kind, line);
        Ok(())
    }

    fn lex_percent(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        let body = self.rest().get(1..).unwrap_or_default();
        let len = body
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(body.len());
        let text = body.get(..len).unwrap_or_default();
        let Some(value) = parse_percent(text) else {
            return Err(ParseError::InvalidLiteral {
                line,
                what: "percentage",
                text: format!("%{text}"),
            });
        };
        self.advance(1 + len);
        self.push(TokenKind::Percent(value), line);
        Ok(())
    }

    fn lex_word(&mut self) -> Result<(), ParseError> {
        let line = self.line;
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let word = rest.get(..len).unwrap_or_default();
        let kind = match word {
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            "null" => TokenKind::Null,
            other => TokenKind::Identifier(other.to_owned()),
        };
        self.advance(len);
        self.push(kind, line);
        Ok(())
    }
}

fn classify_line(text: &str, line: usize) -> Result<TokenKind, ParseError> {
    let keyword = LINE_KEYWORDS
        .iter()
        .find_map(|(prefix, keyword)| text.strip_prefix(prefix).map(|rest| (*keyword, rest.trim())));
    let Some((keyword, value)) = keyword else {
        return Ok(step_line(text).unwrap_or_else(|| TokenKind::Text(text.trim().to_owned())));
    };
    let invalid = |what: &'static str| ParseError::InvalidLiteral {
        line,
        what,
        text: value.to_owned(),
    };
    Ok(match keyword {
        LineKeyword::Feature => TokenKind::Feature(value.to_owned()),
        LineKeyword::Background => TokenKind::Background,
        LineKeyword::Outline => TokenKind::ScenarioOutline(value.to_owned()),
        LineKeyword::Examples => TokenKind::Examples,
        LineKeyword::Scenario => TokenKind::Scenario(value.to_owned()),
        LineKeyword::Iterations => {
            TokenKind::Iterations(value.parse().map_err(|_| invalid("iteration count"))?)
        }
        LineKeyword::Policy => {
            TokenKind::IterationPolicy(value.parse().map_err(|_| invalid("iteration policy"))?)
        }
        LineKeyword::Probability => {
            let percent = value
                .strip_suffix('%')
                .map(str::trim_end)
                .and_then(parse_percent)
                .ok_or_else(|| invalid("probability"))?;
            TokenKind::Probability(percent)
        }
        LineKeyword::Condition => {
            if value.is_empty() {
                return Err(invalid("condition"));
            }
            TokenKind::Condition(Conjunction::Condition, value.to_owned())
        }
    })
}

fn step_line(text: &str) -> Option<TokenKind> {
    let word_len = text
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (word, remainder) = text.split_at_checked(word_len)?;
    if !remainder.starts_with([' ', '\t']) {
        return None;
    }
    let body = remainder.trim().to_owned();
    if body.is_empty() {
        return None;
    }
    let conjunction = match word {
        "Given" => Conjunction::Given,
        "When" => Conjunction::When,
        "Then" => Conjunction::Then,
        "And" => Conjunction::And,
        "But" => Conjunction::But,
        "If" => Conjunction::If,
        "While" => Conjunction::While,
        "Until" => Conjunction::Until,
        _ => return None,
    };
    Some(match conjunction.step_type() {
        karta_patterns::StepType::Step => TokenKind::Step(conjunction, body),
        karta_patterns::StepType::Condition => TokenKind::Condition(conjunction, body),
        karta_patterns::StepType::Loop => TokenKind::Loop(conjunction, body),
    })
}

fn parse_row(text: &str, line: usize) -> Result<Vec<String>, ParseError> {
    let malformed = |reason: &str| ParseError::InvalidTable {
        line,
        reason: reason.to_owned(),
    };
    let body = text
        .strip_prefix('|')
        .ok_or_else(|| malformed("table row must start with '|'"))?;
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('|') => cell.push('|'),
                Some('n') => cell.push('\n'),
                Some('t') => cell.push('\t'),
                Some('"') => cell.push('"'),
                Some('\\') => cell.push('\\'),
                Some(other) => {
                    cell.push('\\');
                    cell.push(other);
                }
                None => cell.push('\\'),
            },
            '|' => cells.push(std::mem::take(&mut cell).trim().to_owned()),
            other => cell.push(other),
        }
    }
    if !cell.trim().is_empty() {
        return Err(malformed("table row must end with '|'"));
    }
    Ok(cells)
}

fn unescape(ch: char) -> Option<char> {
    Some(match ch {
        '"' => '"',
        '\\' => '\\',
        '/' => '/',
        '\'' => '\'',
        '|' => '|',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        _ => return None,
    })
}

/// Length of the JSON-style number at the start of `text`.
fn number_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let digits_from = |start: usize| {
        start
            + bytes
                .iter()
                .skip(start)
                .take_while(|b| b.is_ascii_digit())
                .count()
    };
    let mut end = digits_from(usize::from(bytes.first() == Some(&b'-')));
    if bytes.get(end) == Some(&b'.') {
        end = digits_from(end + 1);
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let after = digits_from(exponent);
        if after > exponent {
            end = after;
        }
    }
    end
}

/// Parse `ddd[.dd]` as a percentage, returning the fraction.
fn parse_percent(text: &str) -> Option<f64> {
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    let whole_ok = (1..=3).contains(&whole.len()) && all_digits(whole);
    let fraction_ok = !text.contains('.') || ((1..=2).contains(&fraction.len()) && all_digits(fraction));
    if !(whole_ok && fraction_ok) {
        return None;
    }
    text.parse::<f64>().ok().map(|value| value / 100.0)
}
