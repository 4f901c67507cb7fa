//! FDL Frontend - Lexing and parsing
//!
//! This crate turns FDL source text into an AST:
//! - Line-oriented lexing with indentation-derived scope depths
//! - Recursive-descent parsing with scope validation
//! - Literal decoding (integer widths, bit strings)

pub mod ast;
pub mod config;
pub mod error;
pub mod lexer;
pub mod literal;
pub mod parser;
pub mod scope;
pub mod token;

pub use ast::{Item, NodeKind, SourceFile};
pub use config::GrammarConfig;
pub use error::{ParseError, ParseResult};
pub use lexer::{tokenize, Lexer};
pub use literal::{determine_bits, ConstValue, Literal};
pub use parser::{parse, parse_tokens, Parser};
pub use scope::ScopeStack;
pub use token::{Token, TokenKind};
