//! Lua tokenizer and `require` scanner for luapack.
//!
//! The lexer turns Lua source into a token stream; the scanner walks that
//! stream and reports every `require` call together with whether its
//! argument is a literal module name or something computed at run time.

pub mod lexer;
pub mod scanner;
pub mod token;

pub use lexer::Lexer;
pub use scanner::{scan_requires, scan_tokens, ModuleSpec, RequireCall};
pub use token::{Span, Token};
