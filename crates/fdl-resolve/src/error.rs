//! Errors raised by symbol validation

use thiserror::Error;

/// Failures detected by parameter lists and signal array stores
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SymbolError {
    #[error("{owner}: param input invalid, '{param}' has no default but follows a defaulted parameter")]
    InvalidParams { owner: String, param: String },

    #[error("{owner}: expected at most {expected} arguments but got {found}")]
    TooManyArgs {
        owner: String,
        expected: usize,
        found: usize,
    },

    #[error("{owner}: missing value for parameter '{param}'")]
    MissingArg { owner: String, param: String },

    #[error("{owner}: parameter '{param}' expects {expected} but got {found}")]
    ArgType {
        owner: String,
        param: String,
        expected: String,
        found: String,
    },

    #[error("{signal}: index [{index}] outside declared bounds [{bounds}]")]
    OutOfBounds {
        signal: String,
        index: String,
        bounds: String,
    },

    #[error("{signal}: array {bounds} exceeds {limit} cells")]
    ArrayTooLarge {
        signal: String,
        bounds: String,
        limit: usize,
    },

    #[error("{signal}: {found} indices given for {expected} dimensions")]
    TooManyIndices {
        signal: String,
        expected: usize,
        found: usize,
    },

    #[error("{signal}: {what} already assigned")]
    AlreadyAssigned { signal: String, what: &'static str },

    #[error("{signal}: value of width {found} does not fit {expected} cells")]
    WidthMismatch {
        signal: String,
        expected: usize,
        found: usize,
    },
}

pub type SymbolResult<T> = std::result::Result<T, SymbolError>;
