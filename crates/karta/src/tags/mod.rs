//! Tag expressions and tag normalisation.
//!
//! Tags are stored without their leading `@`. Expressions such as
//! `@smoke and not (@slow or @wip)` are parsed once into a
//! [`TagExpression`] and evaluated against any set of tags.

mod ast;
mod lexer;
mod parser;

pub use ast::{TagExprError, TagExpression};

/// Strip surrounding whitespace and a leading `@` from a tag.
///
/// # Examples
/// ```
/// assert_eq!(karta::tags::normalize_tag(" @smoke "), "smoke");
/// assert_eq!(karta::tags::normalize_tag("slow"), "slow");
/// ```
#[must_use]
pub fn normalize_tag(tag: &str) -> &str {
    let trimmed = tag.trim();
    trimmed.strip_prefix('@').unwrap_or(trimmed)
}
