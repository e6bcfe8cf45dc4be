//! The frontend boundary. Scanning and parsing happen outside of this crate;
//! the parser hands the core owned [`Token`] values and the handles it got
//! back from earlier construction calls.

/// A lexical value as produced by the scanner. Tokens are plain owned values
/// so anything that outlives a grammar action (symbol table entries, AST
/// labels) keeps its own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub lexeme: String,
    pub kind: TokenKind,
    pub line: u32,
}

impl Token {
    pub fn new(lexeme: impl Into<String>, kind: TokenKind, line: u32) -> Self {
        Self {
            lexeme: lexeme.into(),
            kind,
            line,
        }
    }

    pub fn identifier(lexeme: impl Into<String>, line: u32) -> Self {
        Self::new(lexeme, TokenKind::Identifier, line)
    }

    pub fn integer(value: i32, line: u32) -> Self {
        Self::new(value.to_string(), TokenKind::IntegerLiteral, line)
    }

    pub fn decimal(lexeme: impl Into<String>, line: u32) -> Self {
        Self::new(lexeme, TokenKind::DecimalLiteral, line)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TokenKind {
    Identifier,     // main
    IntegerLiteral, // 1
    DecimalLiteral, // 1.5
}
