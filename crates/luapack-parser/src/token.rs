//! Token definitions for Lua source.
//!
//! Only the shape of the token stream matters to the `require` scanner, so
//! numbers keep their source text and operators are not evaluated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A token in Lua source code.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    And,
    Break,
    Do,
    Else,
    Elseif,
    End,
    False,
    For,
    Function,
    Goto,
    If,
    In,
    Local,
    Nil,
    Not,
    Or,
    Repeat,
    Return,
    Then,
    True,
    Until,
    While,

    // Literals
    Name(String),
    Number(String),
    /// Short or long string, escapes already decoded.
    String(String),

    // Multi-character punctuation
    Ellipsis,
    DotDot,
    DoubleColon,
    EqualEqual,
    TildeEqual,
    LessEqual,
    GreaterEqual,
    LessLess,
    GreaterGreater,
    SlashSlash,

    // Single-character punctuation
    Dot,
    Colon,
    Equal,
    Less,
    Greater,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Hash,
    Amp,
    Tilde,
    Pipe,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,

    /// Text the lexer could not make sense of. Kept so scanning can go on.
    Unknown(String),

    Eof,
}

impl Token {
    /// Returns true if this token is the given identifier.
    pub fn is_name(&self, name: &str) -> bool {
        matches!(self, Token::Name(n) if n == name)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "{}", name),
            Token::Number(text) => write!(f, "{}", text),
            Token::String(value) => write!(f, "{:?}", value),
            Token::Unknown(text) => write!(f, "{}", text),
            Token::Eof => write!(f, "<eof>"),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Source location of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the first character
    pub start: usize,
    /// Byte offset one past the last character
    pub end: usize,
    /// 1-based line
    pub line: u32,
    /// 1-based column, counted in characters
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
