//! Token definitions for FDL
//!
//! A token carries its kind, the matched text and the scope depth of the
//! physical line it was found on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token kinds produced by the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals and names
    Ident,
    Integer,
    Float,
    String,
    BinBits,
    HexBits,
    Boolean,

    // Layout
    Comment,
    Eol,
    Eof,

    // Punctuation
    Colon,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Lt,
    Gt,
    Arrow,
    FatArrow,
    Bar,

    // Assignment operators
    Assign,
    ArithAssign,
    LogicalAssign,
    PostOp,

    // Expression operators
    Relation,
    Add,
    Sub,
    Concat,
    Star,
    Div,
    Exp,
    LogicalOp,
    ModRem,
    Not,

    // Item keywords
    Import,
    As,
    Library,
    Module,
    Arch,
    For,
    Struct,
    Interface,
    Trait,
    Impl,
    Func,
    Task,
    Enum,
    Const,
    Attr,

    // Block keywords
    Declare,
    Logic,
    Generics,
    Ports,
    Blackbox,

    // Statement keywords
    Spro,
    Apro,
    Pro,
    If,
    Elif,
    Else,
    Case,
    Others,
    Assert,
    Return,
    Rename,
    Print,
    Warning,
    Error,
    In,

    // Special names and port directions
    SelfValue,
    SelfType,
    BaseInterface,
    ExtInterface,
}

impl TokenKind {
    /// Assignment-like operators that introduce an assignment statement
    pub fn is_assign_op(self) -> bool {
        matches!(
            self,
            TokenKind::Assign | TokenKind::ArithAssign | TokenKind::LogicalAssign | TokenKind::PostOp
        )
    }

    /// Tokens that can name a port direction in a declaration
    pub fn is_port_direction(self) -> bool {
        matches!(
            self,
            TokenKind::In | TokenKind::BaseInterface | TokenKind::ExtInterface
        )
    }

    /// Layout tokens skipped between statements
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Comment | TokenKind::Eol)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenKind::Ident => "identifier",
            TokenKind::Integer => "integer",
            TokenKind::Float => "float",
            TokenKind::String => "string",
            TokenKind::BinBits => "binary literal",
            TokenKind::HexBits => "hex literal",
            TokenKind::Boolean => "boolean",
            TokenKind::Comment => "comment",
            TokenKind::Eol => "end of line",
            TokenKind::Eof => "end of file",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::Arrow => "'->'",
            TokenKind::FatArrow => "'=>'",
            TokenKind::Bar => "'|'",
            TokenKind::Assign => "'='",
            TokenKind::ArithAssign => "arithmetic assignment",
            TokenKind::LogicalAssign => "logical assignment",
            TokenKind::PostOp => "'++' or '--'",
            TokenKind::Relation => "relational operator",
            TokenKind::Add => "'+'",
            TokenKind::Sub => "'-'",
            TokenKind::Concat => "'&'",
            TokenKind::Star => "'*'",
            TokenKind::Div => "'/'",
            TokenKind::Exp => "'**'",
            TokenKind::LogicalOp => "logical operator",
            TokenKind::ModRem => "'mod' or 'rem'",
            TokenKind::Not => "'not'",
            TokenKind::Import => "'import'",
            TokenKind::As => "'as'",
            TokenKind::Library => "'library'",
            TokenKind::Module => "'module'",
            TokenKind::Arch => "'arch'",
            TokenKind::For => "'for'",
            TokenKind::Struct => "'struct'",
            TokenKind::Interface => "'interface'",
            TokenKind::Trait => "'trait'",
            TokenKind::Impl => "'impl'",
            TokenKind::Func => "'func'",
            TokenKind::Task => "'task'",
            TokenKind::Enum => "'enum'",
            TokenKind::Const => "'const'",
            TokenKind::Attr => "'attr'",
            TokenKind::Declare => "'declare'",
            TokenKind::Logic => "'logic'",
            TokenKind::Generics => "'generics'",
            TokenKind::Ports => "'ports'",
            TokenKind::Blackbox => "'blackbox'",
            TokenKind::Spro => "'spro'",
            TokenKind::Apro => "'apro'",
            TokenKind::Pro => "'pro'",
            TokenKind::If => "'if'",
            TokenKind::Elif => "'elif'",
            TokenKind::Else => "'else'",
            TokenKind::Case => "'case'",
            TokenKind::Others => "'others'",
            TokenKind::Assert => "'assert'",
            TokenKind::Return => "'return'",
            TokenKind::Rename => "'rename'",
            TokenKind::Print => "'print'",
            TokenKind::Warning => "'warning'",
            TokenKind::Error => "'error'",
            TokenKind::In => "'in'",
            TokenKind::SelfValue => "'self'",
            TokenKind::SelfType => "'Self'",
            TokenKind::BaseInterface => "port direction",
            TokenKind::ExtInterface => "interface direction",
        };
        f.write_str(text)
    }
}

/// A lexical unit with its position and indentation-derived scope depth
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Matched source text
    pub value: String,
    /// Indentation depth of the physical line the token sits on
    pub scope: usize,
    /// 1-based source line
    pub line: usize,
    /// 1-based column, counted after tab expansion
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>, scope: usize, line: usize, col: usize) -> Self {
        Self {
            kind,
            value: value.into(),
            scope,
            line,
            col,
        }
    }
}
