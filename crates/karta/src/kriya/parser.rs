//! Recursive-descent parser building a [`Feature`] from Kriya tokens.

use std::collections::{BTreeSet, VecDeque};

use indexmap::IndexMap;
use karta_patterns::StepType;
use serde_json::{Map, Value};

use super::error::ParseError;
use super::outline;
use super::token::{Directive, Token, TokenKind};
use crate::data::{DataValue, WeightedValue};
use crate::model::{Feature, Scenario, Step};

/// Parse a token stream into an unvalidated feature.
pub(crate) fn parse(tokens: Vec<Token>, source: Option<&str>) -> Result<Feature, ParseError> {
    Parser {
        tokens: tokens.into(),
        source: source.map(str::to_owned),
    }
    .feature()
}

struct Parser {
    tokens: VecDeque<Token>,
    source: Option<String>,
}

/// Header shared by plain scenarios and outlines.
struct ScenarioHead {
    name: String,
    line: usize,
    tags: BTreeSet<String>,
    description: Option<String>,
    probability: Option<f64>,
}

impl Parser {
    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.front().map(|t| &t.kind)
    }

    fn next(&mut self) -> Option<Token> {
        self.tokens.pop_front()
    }

    fn next_or_eof(&mut self, expected: &str) -> Result<Token, ParseError> {
        self.next().ok_or_else(|| ParseError::UnexpectedEof {
            expected: expected.to_owned(),
        })
    }

    /// Consume the next token when it equals `kind`.
    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.tokens.pop_front();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        let expected = kind.to_string();
        let token = self.next_or_eof(&expected)?;
        if &token.kind == kind {
            Ok(())
        } else {
            Err(unexpected(&token, &expected))
        }
    }

    fn feature(&mut self) -> Result<Feature, ParseError> {
        let tags = self.tags();
        let token = self.next_or_eof("'Feature:'")?;
        let TokenKind::Feature(name) = token.kind else {
            return Err(unexpected(&token, "'Feature:'"));
        };
        let mut feature = Feature::new(name, Vec::new());
        feature.tags = tags;
        feature.line_number = token.line;
        feature.source.clone_from(&self.source);
        feature.description = self.description();
        loop {
            match self.peek() {
                Some(TokenKind::Iterations(count)) => feature.iterations = *count,
                Some(TokenKind::IterationPolicy(policy)) => feature.iteration_policy = *policy,
                _ => break,
            }
            self.tokens.pop_front();
        }
        if self.eat(&TokenKind::Background) {
            feature.background = self.steps()?;
        }
        while self.peek().is_some() {
            feature.scenarios.extend(self.scenario()?);
        }
        Ok(feature)
    }

    fn tags(&mut self) -> BTreeSet<String> {
        let mut tags = BTreeSet::new();
        while let Some(TokenKind::Tag(tag)) = self.peek() {
            tags.insert(tag.clone());
            self.tokens.pop_front();
        }
        tags
    }

    /// A doc string, or consecutive free-text lines joined by newlines.
    fn description(&mut self) -> Option<String> {
        if let Some(TokenKind::DocString(text)) = self.peek() {
            let text = text.clone();
            self.tokens.pop_front();
            return Some(text);
        }
        let mut lines = Vec::new();
        while let Some(TokenKind::Text(text)) = self.peek() {
            lines.push(text.clone());
            self.tokens.pop_front();
        }
        (!lines.is_empty()).then(|| lines.join("\n"))
    }

    fn scenario(&mut self) -> Result<Vec<Scenario>, ParseError> {
        let tags = self.tags();
        let expected = "'Scenario:' or 'Scenario Outline:'";
        let token = self.next_or_eof(expected)?;
        let (name, is_outline) = match token.kind {
            TokenKind::Scenario(name) => (name, false),
            TokenKind::ScenarioOutline(name) => (name, true),
            _ => return Err(unexpected(&token, expected)),
        };
        let description = self.description();
        let probability = match self.peek() {
            Some(TokenKind::Probability(p)) => {
                let p = *p;
                self.tokens.pop_front();
                Some(p)
            }
            _ => None,
        };
        let head = ScenarioHead {
            name,
            line: token.line,
            tags,
            description,
            probability,
        };
        let scenario = self.build_scenario(head)?;
        if !is_outline {
            return Ok(vec![scenario]);
        }
        self.expect(&TokenKind::Examples)?;
        let token = self.next_or_eof("an examples table")?;
        let TokenKind::Table(rows) = token.kind else {
            return Err(unexpected(&token, "an examples table"));
        };
        outline::expand(&scenario, rows, token.line)
    }

    fn build_scenario(&mut self, head: ScenarioHead) -> Result<Scenario, ParseError> {
        let mut scenario = Scenario::new(head.name, self.steps()?);
        scenario.tags = head.tags;
        scenario.description = head.description;
        scenario.line_number = head.line;
        scenario.source.clone_from(&self.source);
        if let Some(probability) = head.probability {
            scenario.probability = probability;
        }
        Ok(scenario)
    }

    /// One or more steps.
    fn steps(&mut self) -> Result<Vec<Step>, ParseError> {
        let mut steps = Vec::new();
        while matches!(
            self.peek(),
            Some(TokenKind::Step(..) | TokenKind::Condition(..) | TokenKind::Loop(..))
        ) {
            steps.push(self.step()?);
        }
        if steps.is_empty() {
            return Err(match self.next() {
                Some(token) => unexpected(&token, "a step"),
                None => ParseError::UnexpectedEof {
                    expected: "a step".into(),
                },
            });
        }
        Ok(steps)
    }

    fn step(&mut self) -> Result<Step, ParseError> {
        let token = self.next_or_eof("a step")?;
        let line = token.line;
        match token.kind {
            TokenKind::Step(conjunction, text) => {
                let mut step = Step::new(conjunction, text).at(self.source.as_deref(), line);
                if let Some(TokenKind::DocString(doc)) = self.peek() {
                    step.doc_string = Some(doc.clone());
                    self.tokens.pop_front();
                }
                step.data_rules = self.step_data()?;
                Ok(step)
            }
            TokenKind::Condition(conjunction, text) | TokenKind::Loop(conjunction, text) => {
                let is_loop = conjunction.step_type() == StepType::Loop;
                let mut step = Step::new(conjunction, text).at(self.source.as_deref(), line);
                step.data_rules = self.step_data()?;
                self.expect(&TokenKind::Steps)?;
                self.expect(&TokenKind::LBrace)?;
                let children = self.steps()?;
                self.expect(&TokenKind::RBrace)?;
                Ok(if is_loop {
                    step.with_loop(children)
                } else {
                    step.with_condition(children)
                })
            }
            _ => Err(unexpected(&token, "a step")),
        }
    }

    /// A step's attached table or data value, when present.
    fn step_data(&mut self) -> Result<Option<DataValue>, ParseError> {
        match self.peek() {
            Some(TokenKind::Table(_)) => {
                let token = self.next_or_eof("a table")?;
                let TokenKind::Table(rows) = token.kind else {
                    return Err(unexpected(&token, "a table"));
                };
                table_rules(rows, token.line).map(Some)
            }
            Some(kind) if starts_value(kind) => self.value().map(Some),
            _ => Ok(None),
        }
    }

    fn value(&mut self) -> Result<DataValue, ParseError> {
        let token = self.next_or_eof("a data value")?;
        Ok(match token.kind {
            TokenKind::String(text) => DataValue::literal(text),
            TokenKind::Integer(number) => DataValue::literal(number),
            TokenKind::Float(number) => DataValue::literal(number),
            TokenKind::Boolean(flag) => DataValue::literal(flag),
            TokenKind::Null => DataValue::literal(Value::Null),
            TokenKind::LBrace => self.object()?,
            TokenKind::LBracket => {
                let values = self.elements()?;
                if values.iter().all(DataValue::is_literal) {
                    DataValue::literal(Value::Array(values.into_iter().map(into_literal).collect()))
                } else {
                    DataValue::List { values }
                }
            }
            TokenKind::Directive(directive) => self.directive(directive)?,
            _ => return Err(unexpected(&token, "a data value")),
        })
    }

    /// Object fields after the opening brace. A repeated key replaces the
    /// earlier value.
    fn object(&mut self) -> Result<DataValue, ParseError> {
        let mut fields = IndexMap::new();
        while !self.eat(&TokenKind::RBrace) {
            let token = self.next_or_eof("an object key")?;
            let key = match token.kind {
                TokenKind::String(key) | TokenKind::Identifier(key) => key,
                _ => return Err(unexpected(&token, "an object key")),
            };
            self.expect(&TokenKind::Colon)?;
            fields.insert(key, self.value()?);
            self.separator(&TokenKind::RBrace)?;
        }
        Ok(DataValue::GeneratedObject { fields })
    }

    /// Array elements after the opening bracket.
    fn elements(&mut self) -> Result<Vec<DataValue>, ParseError> {
        let mut values = Vec::new();
        while !self.eat(&TokenKind::RBracket) {
            values.push(self.value()?);
            self.separator(&TokenKind::RBracket)?;
        }
        Ok(values)
    }

    /// Consume a comma, or leave `closer` in place for the caller's loop.
    fn separator(&mut self, closer: &TokenKind) -> Result<(), ParseError> {
        if self.eat(&TokenKind::Comma) || self.peek() == Some(closer) {
            return Ok(());
        }
        let expected = format!("',' or {closer}");
        Err(match self.next() {
            Some(token) => unexpected(&token, &expected),
            None => ParseError::UnexpectedEof { expected },
        })
    }

    fn directive(&mut self, directive: Directive) -> Result<DataValue, ParseError> {
        Ok(match directive {
            Directive::IntRange => {
                self.expect(&TokenKind::LParen)?;
                let min = self.integer()?;
                self.expect(&TokenKind::Comma)?;
                let max = self.integer()?;
                self.expect(&TokenKind::RParen)?;
                DataValue::IntegerRange { min, max }
            }
            Directive::FloatRange => {
                self.expect(&TokenKind::LParen)?;
                let min = self.number()?;
                self.expect(&TokenKind::Comma)?;
                let max = self.number()?;
                self.expect(&TokenKind::RParen)?;
                DataValue::FloatRange { min, max }
            }
            Directive::RandomString => {
                self.expect(&TokenKind::LParen)?;
                let length = self.integer()?;
                self.expect(&TokenKind::RParen)?;
                DataValue::RandomString { length }
            }
            Directive::OneFromList | Directive::SomeFromList => {
                self.expect(&TokenKind::LBracket)?;
                let values = self.elements()?;
                if directive == Directive::OneFromList {
                    DataValue::OneFromList { values }
                } else {
                    DataValue::SomeFromList { values }
                }
            }
            Directive::OneFromMap | Directive::SomeFromMap => {
                self.expect(&TokenKind::LBrace)?;
                let probability_map = self.weighted_entries()?;
                if directive == Directive::OneFromMap {
                    DataValue::OneFromMap { probability_map }
                } else {
                    DataValue::SomeFromMap { probability_map }
                }
            }
        })
    }

    fn weighted_entries(&mut self) -> Result<Vec<WeightedValue>, ParseError> {
        let mut entries = Vec::new();
        while !self.eat(&TokenKind::RBrace) {
            let token = self.next_or_eof("a percent key")?;
            let TokenKind::Percent(probability) = token.kind else {
                return Err(unexpected(&token, "a percent key"));
            };
            self.expect(&TokenKind::Colon)?;
            entries.push(WeightedValue::new(probability, self.value()?));
            self.separator(&TokenKind::RBrace)?;
        }
        Ok(entries)
    }

    fn integer(&mut self) -> Result<i64, ParseError> {
        let token = self.next_or_eof("an integer")?;
        match token.kind {
            TokenKind::Integer(value) => Ok(value),
            _ => Err(unexpected(&token, "an integer")),
        }
    }

    #[expect(clippy::cast_precision_loss, reason = "range bounds are written as small literals")]
    fn number(&mut self) -> Result<f64, ParseError> {
        let token = self.next_or_eof("a number")?;
        match token.kind {
            TokenKind::Integer(value) => Ok(value as f64),
            TokenKind::Float(value) => Ok(value),
            _ => Err(unexpected(&token, "a number")),
        }
    }
}

fn unexpected(token: &Token, expected: &str) -> ParseError {
    ParseError::UnexpectedToken {
        line: token.line,
        expected: expected.to_owned(),
        found: token.kind.to_string(),
    }
}

fn starts_value(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::LBrace
            | TokenKind::LBracket
            | TokenKind::Directive(_)
            | TokenKind::String(_)
            | TokenKind::Integer(_)
            | TokenKind::Float(_)
            | TokenKind::Boolean(_)
            | TokenKind::Null
    )
}

fn into_literal(rule: DataValue) -> Value {
    match rule {
        DataValue::Literal { value } => value,
        _ => Value::Null,
    }
}

/// Convert a step table into `{"table_data": [{header: cell, ...}, ...]}`.
fn table_rules(rows: Vec<Vec<String>>, line: usize) -> Result<DataValue, ParseError> {
    let mut rows = rows.into_iter();
    let header = rows.next().unwrap_or_default();
    let mut records = Vec::new();
    for (offset, row) in rows.enumerate() {
        if row.len() != header.len() {
            return Err(ParseError::InvalidTable {
                line: line + offset + 1,
                reason: format!(
                    "table row has {} cells but the header has {}",
                    row.len(),
                    header.len()
                ),
            });
        }
        let record: Map<String, Value> = header
            .iter()
            .cloned()
            .zip(row.into_iter().map(Value::String))
            .collect();
        records.push(Value::Object(record));
    }
    let mut table = Map::new();
    table.insert("table_data".into(), Value::Array(records));
    Ok(DataValue::literal(table))
}
