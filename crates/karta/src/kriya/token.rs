//! Tokens produced by the Kriya lexer.

use std::fmt;

use karta_patterns::Conjunction;

use crate::model::IterationPolicy;

/// Generator directive introducing a randomised data rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// `$int_range(min, max)`.
    IntRange,
    /// `$float_range(min, max)`.
    FloatRange,
    /// `$random_string(length)`.
    RandomString,
    /// `$one_from_list[...]`.
    OneFromList,
    /// `$some_from_list[...]`.
    SomeFromList,
    /// `$one_from_map{%p: value, ...}`.
    OneFromMap,
    /// `$some_from_map{%p: value, ...}`.
    SomeFromMap,
}

impl Directive {
    /// Look up a directive by its name without the `$` sigil.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int_range" => Some(Self::IntRange),
            "float_range" => Some(Self::FloatRange),
            "random_string" => Some(Self::RandomString),
            "one_from_list" => Some(Self::OneFromList),
            "some_from_list" => Some(Self::SomeFromList),
            "one_from_map" => Some(Self::OneFromMap),
            "some_from_map" => Some(Self::SomeFromMap),
            _ => None,
        }
    }

    /// Directive as written in source, including the sigil.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IntRange => "$int_range",
            Self::FloatRange => "$float_range",
            Self::RandomString => "$random_string",
            Self::OneFromList => "$one_from_list",
            Self::SomeFromList => "$some_from_list",
            Self::OneFromMap => "$one_from_map",
            Self::SomeFromMap => "$some_from_map",
        }
    }
}

/// Kind and value of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `Feature:` with the feature name.
    Feature(String),
    /// `Background:`.
    Background,
    /// `Scenario:` or `Example:` with the scenario name.
    Scenario(String),
    /// `Scenario Outline:` with the template name.
    ScenarioOutline(String),
    /// `Examples:`.
    Examples,
    /// `Iterations:` with the iteration count.
    Iterations(u32),
    /// `IterationPolicy:` with the parsed policy.
    IterationPolicy(IterationPolicy),
    /// `Probability:` with the probability as a fraction.
    Probability(f64),
    /// A tag without its leading `@`.
    Tag(String),
    /// A plain step line.
    Step(Conjunction, String),
    /// A condition line.
    Condition(Conjunction, String),
    /// A loop line.
    Loop(Conjunction, String),
    /// Doc string content.
    DocString(String),
    /// Table rows of unescaped cells.
    Table(Vec<Vec<String>>),
    /// `Steps:` block marker.
    Steps,
    /// A free-text line.
    Text(String),
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// Unescaped string literal.
    String(String),
    /// Integer literal.
    Integer(i64),
    /// Floating-point literal.
    Float(f64),
    /// `true` or `false`.
    Boolean(bool),
    /// `null`.
    Null,
    /// Bare identifier used as an object key.
    Identifier(String),
    /// Generator directive.
    Directive(Directive),
    /// Percent literal as a fraction, `%12.5` is `0.125`.
    Percent(f64),
}

/// A token and the one-based line it starts on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Token kind and value.
    pub kind: TokenKind,
    /// One-based source line.
    pub line: usize,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, line: usize) -> Self {
        Self { kind, line }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feature(_) => f.write_str("'Feature:'"),
            Self::Background => f.write_str("'Background:'"),
            Self::Scenario(_) => f.write_str("'Scenario:'"),
            Self::ScenarioOutline(_) => f.write_str("'Scenario Outline:'"),
            Self::Examples => f.write_str("'Examples:'"),
            Self::Iterations(_) => f.write_str("'Iterations:'"),
            Self::IterationPolicy(_) => f.write_str("'IterationPolicy:'"),
            Self::Probability(_) => f.write_str("'Probability:'"),
            Self::Tag(tag) => write!(f, "tag '@{tag}'"),
            Self::Step(c, text) | Self::Condition(c, text) | Self::Loop(c, text) => {
                write!(f, "step '{c} {text}'")
            }
            Self::DocString(_) => f.write_str("doc string"),
            Self::Table(_) => f.write_str("table"),
            Self::Steps => f.write_str("'Steps:'"),
            Self::Text(text) => write!(f, "text '{text}'"),
            Self::LBrace => f.write_str("'{'"),
            Self::RBrace => f.write_str("'}'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::Comma => f.write_str("','"),
            Self::Colon => f.write_str("':'"),
            Self::String(value) => write!(f, "string {value:?}"),
            Self::Integer(value) => write!(f, "number {value}"),
            Self::Float(value) => write!(f, "number {value}"),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Null => f.write_str("null"),
            Self::Identifier(name) => write!(f, "identifier '{name}'"),
            Self::Directive(directive) => write!(f, "'{}'", directive.as_str()),
            Self::Percent(value) => write!(f, "percent {value}"),
        }
    }
}
