//! The token definition for the text filter language.

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords
    And,   // "AND"
    Or,    // "OR"
    Not,   // "NOT"
    In,    // "IN"
    State, // "STATE"

    // Literals
    Identifier(&'a str),
    String(&'a str), // Content between the quotes
    Number(&'a str), // Kept as text, values are compared as strings

    // Punctuation
    LParen, // (
    RParen, // )
    Comma,  // ,

    // Operators
    Eq,       // =
    NotEq,    // !=
    Tilde,    // ~
    NotTilde, // !~
    Gt,       // >  (also closes a mapping object name)
    Lt,       // <  (also opens a mapping object name)
    Gte,      // >=
    Lte,      // <=

    // Special
    Illegal, // An illegal/unknown character or unterminated string
}

impl TokenKind<'_> {
    /// Operator text as the query API expects it, for comparison tokens.
    pub fn comparison_symbol(&self) -> Option<&'static str> {
        let symbol = match self {
            TokenKind::Eq => "=",
            TokenKind::NotEq => "!=",
            TokenKind::Tilde => "~",
            TokenKind::NotTilde => "!~",
            TokenKind::Gt => ">",
            TokenKind::Lt => "<",
            TokenKind::Gte => ">=",
            TokenKind::Lte => "<=",
            _ => return None,
        };
        Some(symbol)
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
