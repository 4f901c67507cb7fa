//! Grammar configuration consumed by the lexer

use crate::token::TokenKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Default number of columns a tab expands to
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Lexer settings: tab expansion and the keyword table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    /// Tabs advance to the next multiple of this width
    pub tab_width: usize,

    /// Identifier text that lexes as a keyword
    pub keywords: IndexMap<String, TokenKind>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            keywords: default_keywords(),
        }
    }
}

impl GrammarConfig {
    /// Classify an identifier against the keyword table
    pub fn classify(&self, ident: &str) -> TokenKind {
        self.keywords
            .get(ident)
            .copied()
            .unwrap_or(TokenKind::Ident)
    }
}

fn default_keywords() -> IndexMap<String, TokenKind> {
    use TokenKind::*;

    let table: &[(&str, TokenKind)] = &[
        ("import", Import),
        ("as", As),
        ("library", Library),
        ("module", Module),
        ("arch", Arch),
        ("for", For),
        ("struct", Struct),
        ("interface", Interface),
        ("trait", Trait),
        ("impl", Impl),
        ("func", Func),
        ("task", Task),
        ("enum", Enum),
        ("const", Const),
        ("attr", Attr),
        ("declare", Declare),
        ("logic", Logic),
        ("generics", Generics),
        ("ports", Ports),
        ("blackbox", Blackbox),
        ("spro", Spro),
        ("apro", Apro),
        ("pro", Pro),
        ("if", If),
        ("elif", Elif),
        ("else", Else),
        ("case", Case),
        ("others", Others),
        ("assert", Assert),
        ("return", Return),
        ("rename", Rename),
        ("print", Print),
        ("warning", Warning),
        ("error", Error),
        ("in", In),
        ("self", SelfValue),
        ("Self", SelfType),
        ("out", BaseInterface),
        ("inout", BaseInterface),
        ("buffer", BaseInterface),
        ("master", ExtInterface),
        ("slave", ExtInterface),
        ("and", LogicalOp),
        ("or", LogicalOp),
        ("xor", LogicalOp),
        ("nand", LogicalOp),
        ("nor", LogicalOp),
        ("xnor", LogicalOp),
        ("not", Not),
        ("mod", ModRem),
        ("rem", ModRem),
        ("true", Boolean),
        ("false", Boolean),
    ];

    table
        .iter()
        .map(|(text, kind)| (text.to_string(), *kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_classification() {
        let config = GrammarConfig::default();
        assert_eq!(config.classify("module"), TokenKind::Module);
        assert_eq!(config.classify("out"), TokenKind::BaseInterface);
        assert_eq!(config.classify("xnor"), TokenKind::LogicalOp);
        assert_eq!(config.classify("counter"), TokenKind::Ident);
    }

    #[test]
    fn test_custom_keyword_table() {
        let mut config = GrammarConfig::default();
        config.keywords.insert("entity".to_string(), TokenKind::Module);
        assert_eq!(config.classify("entity"), TokenKind::Module);
    }
}
