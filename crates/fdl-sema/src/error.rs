//! Semantic analysis errors

use crate::const_eval::EvalError;
use crate::module_resolver::ResolveError;
use fdl_frontend::ParseError;
use fdl_resolve::SymbolError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification every compilation failure maps onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Lex,
    Syntax,
    Scope,
    Import,
    Name,
    Type,
    Arity,
    ArrayBound,
    DriverConflict,
    Cycle,
    Internal,
}

/// Errors raised by the analyzer. The first one aborts the compilation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemaError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("line {line}: {error}")]
    Symbol {
        line: usize,
        #[source]
        error: SymbolError,
    },

    #[error("line {line}: {error}")]
    Import {
        line: usize,
        #[source]
        error: ResolveError,
    },

    #[error("line {line}: import cycle through '{key}'")]
    Cycle { line: usize, key: String },

    #[error("line {line}: {kind} '{name}' not found")]
    NotFound {
        line: usize,
        kind: String,
        name: String,
    },

    #[error("line {line}: '{name}' is already declared in this scope")]
    Duplicate { line: usize, name: String },

    #[error("line {line}: {context}: expected {expected} but found {found}")]
    Type {
        line: usize,
        context: String,
        expected: String,
        found: String,
    },

    #[error("line {line}: {context}: expected {expected} but found {found}")]
    Arity {
        line: usize,
        context: String,
        expected: String,
        found: usize,
    },

    #[error("line {line}: {context} must be a constant")]
    NotConstant { line: usize, context: String },

    #[error("line {line}: {error}")]
    Eval {
        line: usize,
        #[source]
        error: EvalError,
    },

    #[error("line {line}: {what} is not allowed here")]
    Misplaced { line: usize, what: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl SemaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SemaError::Parse(ParseError::Lex { .. }) => ErrorKind::Lex,
            SemaError::Parse(ParseError::Syntax { .. }) => ErrorKind::Syntax,
            SemaError::Parse(ParseError::Scope { .. }) => ErrorKind::Scope,
            SemaError::Symbol { error, .. } => match error {
                SymbolError::InvalidParams { .. }
                | SymbolError::TooManyArgs { .. }
                | SymbolError::MissingArg { .. } => ErrorKind::Arity,
                SymbolError::ArgType { .. } | SymbolError::WidthMismatch { .. } => ErrorKind::Type,
                SymbolError::OutOfBounds { .. }
                | SymbolError::TooManyIndices { .. }
                | SymbolError::ArrayTooLarge { .. } => {
                    ErrorKind::ArrayBound
                }
                SymbolError::AlreadyAssigned { .. } => ErrorKind::DriverConflict,
            },
            SemaError::Import { .. } => ErrorKind::Import,
            SemaError::Cycle { .. } => ErrorKind::Cycle,
            SemaError::NotFound { .. } | SemaError::Duplicate { .. } => ErrorKind::Name,
            SemaError::Type { .. } => ErrorKind::Type,
            SemaError::Arity { .. } => ErrorKind::Arity,
            SemaError::NotConstant { .. } => ErrorKind::ArrayBound,
            SemaError::Eval { error, .. } => match error {
                EvalError::InvalidArgCount { .. } => ErrorKind::Arity,
                _ => ErrorKind::Type,
            },
            SemaError::Misplaced { .. } => ErrorKind::Syntax,
            SemaError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn symbol(line: usize, error: SymbolError) -> Self {
        SemaError::Symbol { line, error }
    }

    pub(crate) fn not_found(line: usize, kind: impl Into<String>, name: impl Into<String>) -> Self {
        SemaError::NotFound {
            line,
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub(crate) fn mismatch(
        line: usize,
        context: impl Into<String>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        SemaError::Type {
            line,
            context: context.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

pub type SemaResult<T> = std::result::Result<T, SemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_errors_classify() {
        let conflict = SemaError::symbol(
            4,
            SymbolError::AlreadyAssigned {
                signal: "y".to_string(),
                what: "value",
            },
        );
        assert_eq!(conflict.kind(), ErrorKind::DriverConflict);
        assert_eq!(conflict.to_string(), "line 4: y: value already assigned");

        let defaults = SemaError::symbol(
            1,
            SymbolError::InvalidParams {
                owner: "f".to_string(),
                param: "b".to_string(),
            },
        );
        assert_eq!(defaults.kind(), ErrorKind::Arity);
    }

    #[test]
    fn test_parse_errors_classify() {
        let err = SemaError::from(ParseError::Scope {
            line: 2,
            relation: "deeper than",
            expected: 2,
            found: 2,
        });
        assert_eq!(err.kind(), ErrorKind::Scope);
    }
}
