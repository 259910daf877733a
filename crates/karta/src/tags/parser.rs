//! Recursive-descent parser for tag expressions.
//!
//! ```text
//! or  := and ('or' and)*
//! and := not ('and' not)*
//! not := 'not' not | primary
//! primary := TAG | '(' or ')'
//! ```

use std::iter::Peekable;
use std::vec::IntoIter;

use super::ast::{Expr, TagExprError};
use super::lexer::{Token, TokenKind, tokenize};

pub(super) struct Parser {
    tokens: Peekable<IntoIter<Token>>,
    end: usize,
}

impl Parser {
    pub(super) fn new(input: &str) -> Result<Self, TagExprError> {
        Ok(Self {
            tokens: tokenize(input)?.into_iter().peekable(),
            end: input.len(),
        })
    }

    /// Parse a complete expression, rejecting trailing tokens.
    pub(super) fn parse(mut self) -> Result<Expr, TagExprError> {
        let expr = self.disjunction()?;
        match self.tokens.next() {
            None => Ok(expr),
            Some(token) => Err(TagExprError::new(
                token.offset,
                format!("unexpected token {}", token.kind),
            )),
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        self.tokens.next_if(|t| &t.kind == kind).is_some()
    }

    fn disjunction(&mut self) -> Result<Expr, TagExprError> {
        let mut node = self.conjunction()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.operand_after("or", Self::conjunction)?;
            node = Expr::Or(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn conjunction(&mut self) -> Result<Expr, TagExprError> {
        let mut node = self.negation()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.operand_after("and", Self::negation)?;
            node = Expr::And(Box::new(node), Box::new(rhs));
        }
        Ok(node)
    }

    fn operand_after(
        &mut self,
        operator: &str,
        parse: fn(&mut Self) -> Result<Expr, TagExprError>,
    ) -> Result<Expr, TagExprError> {
        let blocked = match self.tokens.peek() {
            None => Some(self.end),
            Some(token) if matches!(token.kind, TokenKind::And | TokenKind::Or | TokenKind::RParen) => {
                Some(token.offset)
            }
            Some(_) => None,
        };
        if let Some(offset) = blocked {
            return Err(TagExprError::new(
                offset,
                format!("expected tag or '(' after '{operator}'"),
            ));
        }
        parse(self)
    }

    fn negation(&mut self) -> Result<Expr, TagExprError> {
        if self.eat(&TokenKind::Not) {
            return Ok(Expr::Not(Box::new(self.negation()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, TagExprError> {
        let Some(token) = self.tokens.next() else {
            return Err(TagExprError::new(self.end, "expected tag or '('"));
        };
        match token.kind {
            TokenKind::Tag(tag) => Ok(Expr::Tag(tag)),
            TokenKind::LParen => {
                let inner = self.disjunction()?;
                if self.eat(&TokenKind::RParen) {
                    Ok(inner)
                } else {
                    Err(TagExprError::new(token.offset, "missing ')'"))
                }
            }
            other => Err(TagExprError::new(
                token.offset,
                format!("expected tag or '(' but found {other}"),
            )),
        }
    }
}
