//! Lexer for Lua source.
//!
//! Built on the logos library. The lexer is total: input it cannot classify
//! comes out as [`Token::Unknown`] so that callers scanning for `require`
//! calls never reject a file just because it is not valid Lua.

use crate::token::{Span, Token};
use logos::Logos;

/// Logos-based token enum for lexing.
///
/// Converted to the public [`Token`] enum after lexing.
#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    // Whitespace (skip)
    #[regex(r"[ \t\r\n\f\v]+", logos::skip)]
    Whitespace,

    // Line and long comments (skip)
    #[token("--", lex_comment)]
    Comment,

    // Keywords (must come before names)
    #[token("and")]
    And,

    #[token("break")]
    Break,

    #[token("do")]
    Do,

    #[token("else")]
    Else,

    #[token("elseif")]
    Elseif,

    #[token("end")]
    End,

    #[token("false")]
    False,

    #[token("for")]
    For,

    #[token("function")]
    Function,

    #[token("goto")]
    Goto,

    #[token("if")]
    If,

    #[token("in")]
    In,

    #[token("local")]
    Local,

    #[token("nil")]
    Nil,

    #[token("not")]
    Not,

    #[token("or")]
    Or,

    #[token("repeat")]
    Repeat,

    #[token("return")]
    Return,

    #[token("then")]
    Then,

    #[token("true")]
    True,

    #[token("until")]
    Until,

    #[token("while")]
    While,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Name(String),

    #[regex(r"0[xX][0-9a-fA-F]*(\.[0-9a-fA-F]*)?([pP][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),

    #[regex(r#""([^"\\\n]|\\(.|\n)|\\z[ \t\r\n\f\v]*)*""#, parse_short_string)]
    #[regex(r"'([^'\\\n]|\\(.|\n)|\\z[ \t\r\n\f\v]*)*'", parse_short_string)]
    #[regex(r"\[=*\[", lex_long_string)]
    String(String),

    // Multi-character punctuation
    #[token("...")]
    Ellipsis,

    #[token("..")]
    DotDot,

    #[token("::")]
    DoubleColon,

    #[token("==")]
    EqualEqual,

    #[token("~=")]
    TildeEqual,

    #[token("<=")]
    LessEqual,

    #[token(">=")]
    GreaterEqual,

    #[token("<<")]
    LessLess,

    #[token(">>")]
    GreaterGreater,

    #[token("//")]
    SlashSlash,

    // Single-character punctuation
    #[token(".")]
    Dot,

    #[token(":")]
    Colon,

    #[token("=")]
    Equal,

    #[token("<")]
    Less,

    #[token(">")]
    Greater,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Star,

    #[token("/")]
    Slash,

    #[token("%")]
    Percent,

    #[token("^")]
    Caret,

    #[token("#")]
    Hash,

    #[token("&")]
    Amp,

    #[token("~")]
    Tilde,

    #[token("|")]
    Pipe,

    #[token("(")]
    LeftParen,

    #[token(")")]
    RightParen,

    #[token("{")]
    LeftBrace,

    #[token("}")]
    RightBrace,

    #[token("[")]
    LeftBracket,

    #[token("]")]
    RightBracket,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,
}

/// Level of a long bracket opening at the start of `s` (`[[` is 0, `[==[` is 2).
fn long_bracket_level(s: &str) -> Option<usize> {
    let rest = s.strip_prefix('[')?;
    let level = rest.bytes().take_while(|&b| b == b'=').count();
    (rest.as_bytes().get(level) == Some(&b'[')).then_some(level)
}

fn closing_bracket(level: usize) -> String {
    format!("]{}]", "=".repeat(level))
}

fn lex_comment(lex: &mut logos::Lexer<LogosToken>) -> logos::Skip {
    // "--" is consumed; a long bracket right after it makes a block comment
    let remainder = lex.remainder();

    match long_bracket_level(remainder) {
        Some(level) => {
            let open_len = level + 2;
            let close = closing_bracket(level);
            match remainder[open_len..].find(&close) {
                Some(end) => lex.bump(open_len + end + close.len()),
                None => lex.bump(remainder.len()),
            }
        }
        None => {
            let end = remainder.find('\n').unwrap_or(remainder.len());
            lex.bump(end);
        }
    }

    logos::Skip
}

fn lex_long_string(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let level = lex.slice().len() - 2;
    let close = closing_bracket(level);
    let remainder = lex.remainder();

    let Some(end) = remainder.find(&close) else {
        // Unterminated: swallow the rest so it is not lexed as code
        lex.bump(remainder.len());
        return None;
    };

    let content = strip_leading_newline(&remainder[..end]).to_string();
    lex.bump(end + close.len());
    Some(content)
}

/// Lua drops a newline that immediately follows the opening long bracket.
fn strip_leading_newline(s: &str) -> &str {
    for prefix in ["\r\n", "\n\r", "\n", "\r"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            return rest;
        }
    }
    s
}

fn parse_short_string(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];
    Some(unescape_string(inner))
}

/// Decode Lua escape sequences.
///
/// Works on bytes since `\ddd` and `\xXX` may produce any byte value; the
/// result is converted back lossily.
fn unescape_string(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }

        i += 1;
        let Some(&esc) = bytes.get(i) else {
            break;
        };
        i += 1;

        match esc {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'\\' => out.push(b'\\'),
            b'"' => out.push(b'"'),
            b'\'' => out.push(b'\''),
            b'\n' => {
                out.push(b'\n');
                if bytes.get(i) == Some(&b'\r') {
                    i += 1;
                }
            }
            b'\r' => {
                out.push(b'\n');
                if bytes.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'z' => {
                while bytes.get(i).is_some_and(|c| c.is_ascii_whitespace()) {
                    i += 1;
                }
            }
            b'x' => match bytes.get(i..i + 2) {
                Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => {
                    out.push(hex_value(hex[0]) << 4 | hex_value(hex[1]));
                    i += 2;
                }
                _ => out.extend_from_slice(b"\\x"),
            },
            b'u' if bytes.get(i) == Some(&b'{') => {
                let digits: &[u8] = &bytes[i + 1..];
                let len = digits.iter().take_while(|b| b.is_ascii_hexdigit()).count();
                let decoded = (len > 0 && digits.get(len) == Some(&b'}'))
                    .then(|| {
                        digits[..len]
                            .iter()
                            .try_fold(0u32, |acc, &b| {
                                acc.checked_mul(16)?.checked_add(u32::from(hex_value(b)))
                            })
                    })
                    .flatten()
                    .and_then(char::from_u32);
                match decoded {
                    Some(c) => {
                        let mut buf = [0u8; 4];
                        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                        i += 1 + len + 1;
                    }
                    None => out.extend_from_slice(b"\\u"),
                }
            }
            d if d.is_ascii_digit() => {
                let mut value = u32::from(d - b'0');
                let mut taken = 1;
                while taken < 3 && bytes.get(i).is_some_and(u8::is_ascii_digit) {
                    value = value * 10 + u32::from(bytes[i] - b'0');
                    i += 1;
                    taken += 1;
                }
                out.push(u8::try_from(value).unwrap_or(u8::MAX));
            }
            other => {
                // Invalid escape, keep it as written
                out.push(b'\\');
                out.push(other);
            }
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Maps byte offsets to 1-based line and column numbers.
struct LineIndex<'a> {
    source: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    fn locate(&self, offset: usize) -> (u32, u32) {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        let column = self.source[line_start..offset].chars().count() + 1;
        (
            u32::try_from(line).unwrap_or(u32::MAX),
            u32::try_from(column).unwrap_or(u32::MAX),
        )
    }
}

/// Main lexer structure.
pub struct Lexer<'a> {
    source: &'a str,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source }
    }

    /// Tokenize the whole source. The last token is always [`Token::Eof`].
    pub fn tokenize(self) -> Vec<(Token, Span)> {
        let lines = LineIndex::new(self.source);

        // A first line starting with '#' (shebang) is ignored by Lua
        let body_start = if self.source.starts_with('#') {
            self.source.find('\n').unwrap_or(self.source.len())
        } else {
            0
        };

        let mut logos_lexer = LogosToken::lexer(&self.source[body_start..]);
        let mut tokens = Vec::new();

        while let Some(result) = logos_lexer.next() {
            let range = logos_lexer.span();
            let start = body_start + range.start;
            let end = body_start + range.end;
            let (line, column) = lines.locate(start);

            let token = match result {
                Ok(token) => Self::convert_token(token),
                Err(()) => Token::Unknown(logos_lexer.slice().to_string()),
            };
            tokens.push((token, Span::new(start, end, line, column)));
        }

        let end = self.source.len();
        let (line, column) = lines.locate(end);
        tokens.push((Token::Eof, Span::new(end, end, line, column)));

        tokens
    }

    fn convert_token(token: LogosToken) -> Token {
        match token {
            LogosToken::And => Token::And,
            LogosToken::Break => Token::Break,
            LogosToken::Do => Token::Do,
            LogosToken::Else => Token::Else,
            LogosToken::Elseif => Token::Elseif,
            LogosToken::End => Token::End,
            LogosToken::False => Token::False,
            LogosToken::For => Token::For,
            LogosToken::Function => Token::Function,
            LogosToken::Goto => Token::Goto,
            LogosToken::If => Token::If,
            LogosToken::In => Token::In,
            LogosToken::Local => Token::Local,
            LogosToken::Nil => Token::Nil,
            LogosToken::Not => Token::Not,
            LogosToken::Or => Token::Or,
            LogosToken::Repeat => Token::Repeat,
            LogosToken::Return => Token::Return,
            LogosToken::Then => Token::Then,
            LogosToken::True => Token::True,
            LogosToken::Until => Token::Until,
            LogosToken::While => Token::While,
            LogosToken::Name(s) => Token::Name(s),
            LogosToken::Number(s) => Token::Number(s),
            LogosToken::String(s) => Token::String(s),
            LogosToken::Ellipsis => Token::Ellipsis,
            LogosToken::DotDot => Token::DotDot,
            LogosToken::DoubleColon => Token::DoubleColon,
            LogosToken::EqualEqual => Token::EqualEqual,
            LogosToken::TildeEqual => Token::TildeEqual,
            LogosToken::LessEqual => Token::LessEqual,
            LogosToken::GreaterEqual => Token::GreaterEqual,
            LogosToken::LessLess => Token::LessLess,
            LogosToken::GreaterGreater => Token::GreaterGreater,
            LogosToken::SlashSlash => Token::SlashSlash,
            LogosToken::Dot => Token::Dot,
            LogosToken::Colon => Token::Colon,
            LogosToken::Equal => Token::Equal,
            LogosToken::Less => Token::Less,
            LogosToken::Greater => Token::Greater,
            LogosToken::Plus => Token::Plus,
            LogosToken::Minus => Token::Minus,
            LogosToken::Star => Token::Star,
            LogosToken::Slash => Token::Slash,
            LogosToken::Percent => Token::Percent,
            LogosToken::Caret => Token::Caret,
            LogosToken::Hash => Token::Hash,
            LogosToken::Amp => Token::Amp,
            LogosToken::Tilde => Token::Tilde,
            LogosToken::Pipe => Token::Pipe,
            LogosToken::LeftParen => Token::LeftParen,
            LogosToken::RightParen => Token::RightParen,
            LogosToken::LeftBrace => Token::LeftBrace,
            LogosToken::RightBrace => Token::RightBrace,
            LogosToken::LeftBracket => Token::LeftBracket,
            LogosToken::RightBracket => Token::RightBracket,
            LogosToken::Semicolon => Token::Semicolon,
            LogosToken::Comma => Token::Comma,
            LogosToken::Whitespace | LogosToken::Comment => {
                unreachable!("Whitespace and comments should be skipped")
            }
        }
    }
}
