//! FDL Lexer using Logos
//!
//! Source is tokenized one physical line at a time. The indentation of each
//! line is measured before the line body is handed to Logos, and that scope
//! depth is stamped on every token of the line, including its `Eol`.

use crate::config::GrammarConfig;
use crate::error::{ParseError, ParseResult};
use crate::token::{Token, TokenKind};
use logos::Logos;

/// Raw token shapes recognized inside a line
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+")]
enum RawToken {
    #[regex(r"#[^\n]*")]
    Comment,

    #[regex("[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex("[0-9][0-9_]*")]
    Integer,

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*")]
    Float,

    #[regex(r#""([^"\\]|\\.)*""#)]
    String,

    #[regex("b?'[01]+'")]
    BinBits,

    #[regex("x'[0-9a-fA-F]+'")]
    HexBits,

    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("->")]
    Arrow,
    #[token("=>")]
    FatArrow,
    #[token("|")]
    Bar,

    #[token("=")]
    Assign,
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    ArithAssign,
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    LogicalAssign,
    #[token("++")]
    #[token("--")]
    PostOp,

    #[token("==")]
    #[token("!=")]
    #[token("<=")]
    #[token(">=")]
    Relation,
    #[token("+")]
    Add,
    #[token("-")]
    Sub,
    #[token("&")]
    Concat,
    #[token("*")]
    Star,
    #[token("/")]
    Div,
    #[token("**")]
    Exp,
}

impl RawToken {
    fn kind(self) -> TokenKind {
        match self {
            RawToken::Comment => TokenKind::Comment,
            RawToken::Ident => TokenKind::Ident,
            RawToken::Integer => TokenKind::Integer,
            RawToken::Float => TokenKind::Float,
            RawToken::String => TokenKind::String,
            RawToken::BinBits => TokenKind::BinBits,
            RawToken::HexBits => TokenKind::HexBits,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Dot => TokenKind::Dot,
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,
            RawToken::Lt => TokenKind::Lt,
            RawToken::Gt => TokenKind::Gt,
            RawToken::Arrow => TokenKind::Arrow,
            RawToken::FatArrow => TokenKind::FatArrow,
            RawToken::Bar => TokenKind::Bar,
            RawToken::Assign => TokenKind::Assign,
            RawToken::ArithAssign => TokenKind::ArithAssign,
            RawToken::LogicalAssign => TokenKind::LogicalAssign,
            RawToken::PostOp => TokenKind::PostOp,
            RawToken::Relation => TokenKind::Relation,
            RawToken::Add => TokenKind::Add,
            RawToken::Sub => TokenKind::Sub,
            RawToken::Concat => TokenKind::Concat,
            RawToken::Star => TokenKind::Star,
            RawToken::Div => TokenKind::Div,
            RawToken::Exp => TokenKind::Exp,
        }
    }
}

/// Line-oriented lexer over a whole source buffer
pub struct Lexer<'a> {
    source: &'a str,
    config: &'a GrammarConfig,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, config: &'a GrammarConfig) -> Self {
        Self { source, config }
    }

    /// Produce the full token stream, terminated by a single `Eof`
    pub fn tokenize(&self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut last_line = 0;

        for (index, text) in self.source.lines().enumerate() {
            let line = index + 1;
            last_line = line;

            let (scope, body_start) = self.measure_indent(text);
            let body = &text[body_start..];
            if body.trim().is_empty() {
                continue;
            }

            self.tokenize_line(body, scope, line, &mut tokens)?;
            tokens.push(Token::new(TokenKind::Eol, "", scope, line, scope + body.len() + 1));
        }

        tokens.push(Token::new(TokenKind::Eof, "", 0, last_line + 1, 1));
        log::trace!("lexed {} tokens over {} lines", tokens.len(), last_line);
        Ok(tokens)
    }

    /// Indentation columns of a line after tab expansion, and the byte
    /// offset of its first non-blank character
    fn measure_indent(&self, text: &str) -> (usize, usize) {
        let tab_width = self.config.tab_width.max(1);
        let mut columns = 0;
        for (offset, c) in text.char_indices() {
            match c {
                ' ' => columns += 1,
                '\t' => columns = (columns / tab_width + 1) * tab_width,
                _ => return (columns, offset),
            }
        }
        (columns, text.len())
    }

    fn tokenize_line(
        &self,
        body: &str,
        scope: usize,
        line: usize,
        tokens: &mut Vec<Token>,
    ) -> ParseResult<()> {
        let mut lexer = RawToken::lexer(body);

        while let Some(result) = lexer.next() {
            let span = lexer.span();
            let raw = result.map_err(|_| ParseError::Lex {
                line,
                text: body[span.start..].to_string(),
            })?;

            let slice = lexer.slice();
            let kind = match raw {
                RawToken::Ident => self.config.classify(slice),
                other => other.kind(),
            };
            tokens.push(Token::new(kind, slice, scope, line, scope + span.start + 1));
        }

        Ok(())
    }
}

/// Tokenize `source` with the given grammar configuration
pub fn tokenize(source: &str, config: &GrammarConfig) -> ParseResult<Vec<Token>> {
    Lexer::new(source, config).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, &GrammarConfig::default())
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("module counter:"),
            vec![
                TokenKind::Module,
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Eol,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_scope_depth_per_line() {
        let tokens = tokenize("module M:\n  ports:\n    int x\n", &GrammarConfig::default()).unwrap();
        let scopes: Vec<(TokenKind, usize)> = tokens.iter().map(|t| (t.kind, t.scope)).collect();
        assert_eq!(
            scopes,
            vec![
                (TokenKind::Module, 0),
                (TokenKind::Ident, 0),
                (TokenKind::Colon, 0),
                (TokenKind::Eol, 0),
                (TokenKind::Ports, 2),
                (TokenKind::Colon, 2),
                (TokenKind::Eol, 2),
                (TokenKind::Ident, 4),
                (TokenKind::Ident, 4),
                (TokenKind::Eol, 4),
                (TokenKind::Eof, 0),
            ]
        );
    }

    #[test]
    fn test_tabs_expand_to_configured_width() {
        let config = GrammarConfig {
            tab_width: 8,
            ..GrammarConfig::default()
        };
        let tokens = tokenize("\tx = 1\n  \ty = 2\n", &config).unwrap();
        assert_eq!(tokens[0].scope, 8);
        assert_eq!(tokens[4].value, "y");
        assert_eq!(tokens[4].scope, 8);
    }

    #[test]
    fn test_comments_are_tokens() {
        let tokens = tokenize("# counter\nx = 1 # trailing\n", &GrammarConfig::default()).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Comment);
        assert_eq!(tokens[0].value, "# counter");
        assert_eq!(tokens[5].kind, TokenKind::Comment);
        assert_eq!(tokens[5].value, "# trailing");
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a += b ** 2 <= c -> d => e ++"),
            vec![
                TokenKind::Ident,
                TokenKind::ArithAssign,
                TokenKind::Ident,
                TokenKind::Exp,
                TokenKind::Integer,
                TokenKind::Relation,
                TokenKind::Ident,
                TokenKind::Arrow,
                TokenKind::Ident,
                TokenKind::FatArrow,
                TokenKind::Ident,
                TokenKind::PostOp,
                TokenKind::Eol,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_bit_literals() {
        assert_eq!(
            kinds("b'1010' x'A' '1' 3.5 \"s\""),
            vec![
                TokenKind::BinBits,
                TokenKind::HexBits,
                TokenKind::BinBits,
                TokenKind::Float,
                TokenKind::String,
                TokenKind::Eol,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_blank_lines_emit_nothing() {
        let tokens = tokenize("\n   \nx\n", &GrammarConfig::default()).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn test_lex_error_reports_line_and_prefix() {
        let err = tokenize("x = 1\ny = $z + 1\n", &GrammarConfig::default()).unwrap_err();
        assert_eq!(
            err,
            ParseError::Lex {
                line: 2,
                text: "$z + 1".to_string()
            }
        );
    }
}
