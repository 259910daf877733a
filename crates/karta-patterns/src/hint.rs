//! Cucumber expression helpers used during identifier compilation.

/// Typed placeholder recognised inside `{…}` in a step identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    /// `{int}`, `{byte}`, `{short}` or `{long}`.
    Int,
    /// `{float}`, `{double}` or `{bigdecimal}`.
    Float,
    /// `{word}`.
    Word,
    /// `{string}`.
    String,
}

impl ExpressionKind {
    /// Look up the expression kind for a placeholder name.
    ///
    /// # Examples
    /// ```
    /// use karta_patterns::ExpressionKind;
    /// assert_eq!(ExpressionKind::from_name("long"), Some(ExpressionKind::Int));
    /// assert_eq!(ExpressionKind::from_name("colour"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" | "byte" | "short" | "long" => Some(Self::Int),
            "float" | "double" | "bigdecimal" => Some(Self::Float),
            "word" => Some(Self::Word),
            "string" => Some(Self::String),
            _ => None,
        }
    }
}

/// Translate an expression kind into a regular-expression fragment.
///
/// The fragment is unanchored; the compiler anchors it at the match cursor.
///
/// # Examples
/// ```
/// use karta_patterns::{ExpressionKind, get_expression_pattern};
/// assert_eq!(get_expression_pattern(ExpressionKind::Int), r"-?\d+");
/// assert_eq!(get_expression_pattern(ExpressionKind::Word), r"\w+");
/// ```
#[must_use]
pub fn get_expression_pattern(kind: ExpressionKind) -> &'static str {
    match kind {
        ExpressionKind::Int => r"-?\d+",
        ExpressionKind::Float => r"-?(?:\d+\.?\d*|\.\d+)",
        ExpressionKind::Word => r"\w+",
        ExpressionKind::String => r#""(?:[^"\\]|\\.)*""#,
    }
}
