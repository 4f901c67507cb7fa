//! Lexer and parser errors

use crate::token::TokenKind;
use thiserror::Error;

/// Errors raised while tokenizing or parsing a source file.
///
/// Parsing is fail-fast: the first error aborts the file.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}: unrecognized input '{text}'")]
    Lex { line: usize, text: String },

    #[error(
        "line {line}: expected {expected} but found {found} '{value}'{}",
        scope_note(.expected_scope, .found_scope)
    )]
    Syntax {
        line: usize,
        expected: String,
        found: TokenKind,
        value: String,
        expected_scope: usize,
        found_scope: usize,
    },

    #[error("line {line}: bad indentation, expected a scope {relation} {expected} but found {found}")]
    Scope {
        line: usize,
        relation: &'static str,
        expected: usize,
        found: usize,
    },
}

impl ParseError {
    /// Source line the error was raised on
    pub fn line(&self) -> usize {
        match self {
            ParseError::Lex { line, .. }
            | ParseError::Syntax { line, .. }
            | ParseError::Scope { line, .. } => *line,
        }
    }
}

fn scope_note(expected: &usize, found: &usize) -> String {
    if expected == found {
        String::new()
    } else {
        format!(" (expected scope {expected}, found scope {found})")
    }
}

pub type ParseResult<T> = std::result::Result<T, ParseError>;
