//! `require` call scanner
//!
//! Finds module-loading statements in a token stream and classifies their
//! argument as a literal module name or a dynamic expression.

use crate::lexer::Lexer;
use crate::token::{Span, Token};
use serde::{Deserialize, Serialize};

/// The argument of a `require` call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleSpec {
    /// A single string literal, e.g. `require "lib.util"`
    Literal(String),
    /// Anything computed at run time, e.g. `require(prefix .. "util")`
    Dynamic,
}

impl ModuleSpec {
    /// The literal module name, if there is one
    pub fn literal(&self) -> Option<&str> {
        match self {
            ModuleSpec::Literal(name) => Some(name),
            ModuleSpec::Dynamic => None,
        }
    }
}

/// One `require` call found in source code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequireCall {
    pub spec: ModuleSpec,
    /// Location of the `require` name
    pub span: Span,
}

/// Scan Lua source for `require` calls, in source order.
pub fn scan_requires(source: &str) -> Vec<RequireCall> {
    let tokens = Lexer::new(source).tokenize();
    scan_tokens(&tokens)
}

/// Scan an already tokenized source.
///
/// Recognised call forms:
/// - `require "m"`, `require 'm'`, `require [[m]]`
/// - `require("m")` and `require("m", ...)`
///
/// Any other call argument is [`ModuleSpec::Dynamic`]. `require` that is not
/// called, is a field (`t.require`, `t:require`) or is being defined
/// (`function require`) is ignored.
pub fn scan_tokens(tokens: &[(Token, Span)]) -> Vec<RequireCall> {
    let mut calls = Vec::new();

    for (i, (token, span)) in tokens.iter().enumerate() {
        if !token.is_name("require") {
            continue;
        }

        let previous = i.checked_sub(1).map(|p| &tokens[p].0);
        if matches!(
            previous,
            Some(Token::Dot | Token::Colon | Token::Function)
        ) {
            continue;
        }

        let at = |offset: usize| tokens.get(i + offset).map(|(t, _)| t);

        let spec = match at(1) {
            Some(Token::String(name)) => ModuleSpec::Literal(name.clone()),
            Some(Token::LeftParen) => match (at(2), at(3)) {
                (Some(Token::String(name)), Some(Token::RightParen | Token::Comma)) => {
                    ModuleSpec::Literal(name.clone())
                }
                _ => ModuleSpec::Dynamic,
            },
            Some(Token::LeftBrace) => ModuleSpec::Dynamic,
            _ => continue,
        };

        calls.push(RequireCall { spec, span: *span });
    }

    calls
}
