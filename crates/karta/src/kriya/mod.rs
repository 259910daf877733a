//! The Kriya feature language.
//!
//! Kriya is a Gherkin-like language extended with iteration settings,
//! scenario probabilities, nested condition and loop blocks, and inline data
//! rules with generator directives:
//!
//! ```text
//! @checkout
//! Feature: Checkout
//!   Iterations: 10
//!   IterationPolicy: one scenario per iteration
//!
//!   Scenario: Card payment
//!     Probability: 40%
//!     Given a customer
//!       { "name": $random_string(8), "age": $int_range(18, 90) }
//!     If the basket is empty
//!       Steps: {
//!         Then the checkout button is disabled
//!       }
//! ```
//!
//! Parsing runs the lexer, the recursive-descent parser, scenario outline
//! expansion and finally [`Feature::validate`].

mod error;
mod lexer;
mod outline;
mod parser;
mod token;

pub use error::ParseError;
pub use lexer::tokenize;
pub use token::{Directive, Token, TokenKind};

use crate::model::Feature;

/// Parse and validate Kriya source text.
///
/// # Errors
/// Returns [`ParseError`] for lexical or grammatical errors, malformed
/// example tables, and validation failures of the resulting feature.
pub fn parse_feature(text: &str) -> Result<Feature, ParseError> {
    compile(text, None)
}

/// Parse and validate Kriya source text, recording `source` on the feature
/// and every scenario and step.
///
/// # Errors
/// See [`parse_feature`].
pub fn parse_feature_with_source(text: &str, source: &str) -> Result<Feature, ParseError> {
    compile(text, Some(source))
}

fn compile(text: &str, source: Option<&str>) -> Result<Feature, ParseError> {
    let tokens = tokenize(text)?;
    let feature = parser::parse(tokens, source)?;
    feature.validate()?;
    log::debug!(
        "compiled feature `{}` with {} scenario(s)",
        feature.name,
        feature.scenarios.len()
    );
    Ok(feature)
}
