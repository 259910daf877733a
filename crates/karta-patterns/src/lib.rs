//! Step identifier parsing and matching for the karta test engine.
//!
//! The crate compiles step-definition identifiers into ordered segments and
//! matches free-text step lines against them. It is shared by the runtime and
//! the command-line tooling so both resolve steps identically.

mod capture;
mod errors;
mod hint;
mod identifier;
mod keyword;

pub use capture::Parameter;
pub use errors::{PatternError, SegmentErrorInfo};
pub use hint::{ExpressionKind, get_expression_pattern};
pub use identifier::{Segment, SegmentKind, StepIdentifier};
pub use keyword::{Conjunction, ConjunctionParseError, StepType};
