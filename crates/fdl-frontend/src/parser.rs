//! Recursive-descent parser for FDL
//!
//! Blocks are delimited by indentation. Every block header ends in `:`; the
//! first line after it opens a new scope on the [`ScopeStack`] which must be
//! strictly deeper than the enclosing one, and the block's body runs for as
//! long as lines stay at exactly that depth.
//!
//! Expressions use precedence climbing, lowest to highest:
//!
//! ```text
//! logical (and/or/xor/...) -> relation -> term (+ - &) -> factor (* / mod rem)
//!     -> exponent (**) -> unary (+ - not) -> primary
//! ```

use crate::ast::*;
use crate::config::GrammarConfig;
use crate::error::{ParseError, ParseResult};
use crate::lexer::tokenize;
use crate::literal::{self, Literal};
use crate::scope::ScopeStack;
use crate::token::{Token, TokenKind};

/// Which body a statement list belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyContext {
    Arch,
    Func,
    Task,
    Process,
}

impl BodyContext {
    fn allows_instances(self) -> bool {
        matches!(self, BodyContext::Arch)
    }

    fn allows_processes(self) -> bool {
        matches!(self, BodyContext::Arch | BodyContext::Task)
    }

    fn allows_decls(self) -> bool {
        !matches!(self, BodyContext::Process)
    }

    fn allows_return(self) -> bool {
        matches!(self, BodyContext::Func | BodyContext::Task)
    }

    fn describe(self) -> &'static str {
        match self {
            BodyContext::Arch => "architecture logic",
            BodyContext::Func => "function body",
            BodyContext::Task => "task body",
            BodyContext::Process => "process body",
        }
    }
}

/// Statement shape decided by lookahead before anything is consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatementForm {
    Instance,
    Declaration,
    Assignment,
    Call,
}

pub struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    scope: ScopeStack,
    /// Comments collected since the last node was built
    comments: Vec<String>,
    eof: Token,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        let last_line = tokens.last().map(|t| t.line).unwrap_or(1);
        Self {
            tokens,
            pos: 0,
            scope: ScopeStack::new(0),
            comments: Vec::new(),
            eof: Token::new(TokenKind::Eof, "", 0, last_line, 1),
        }
    }

    /// Parse a whole file
    pub fn parse_file(mut self, name: &str) -> ParseResult<SourceFile> {
        self.skip();
        self.scope = ScopeStack::new(self.current().scope);

        let mut items = Vec::new();
        loop {
            self.skip();
            let token = self.current();
            if token.kind == TokenKind::Eof {
                break;
            }
            if token.scope != self.scope.current() {
                return Err(self.scope_error("equal to"));
            }
            items.push(self.parse_top_item()?);
        }

        log::debug!("parsed {} top-level items from {}", items.len(), name);
        Ok(SourceFile {
            name: name.to_string(),
            comments: self.take_comments(),
            items,
        })
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    fn current(&self) -> &Token {
        self.peek(0)
    }

    fn peek(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&self.eof)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    /// Kind matches and the token sits at the scope of the innermost block
    fn check_in_scope(&self, kind: TokenKind) -> bool {
        self.check(kind) && self.current().scope == self.scope.current()
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(kind.to_string()))
        }
    }

    fn ident(&mut self) -> ParseResult<String> {
        Ok(self.expect(TokenKind::Ident)?.value)
    }

    fn line(&self) -> usize {
        self.current().line
    }

    /// Skip comments and line ends, keeping comment text for the next node
    fn skip(&mut self) {
        while self.current().kind.is_trivia() {
            let token = self.advance();
            if token.kind == TokenKind::Comment {
                self.comments.push(token.value);
            }
        }
    }

    fn take_comments(&mut self) -> Vec<String> {
        std::mem::take(&mut self.comments)
    }

    /// Finish a one-line construct: optional trailing comment, then end of line
    fn end_line(&mut self) -> ParseResult<()> {
        if self.check(TokenKind::Comment) {
            let token = self.advance();
            self.comments.push(token.value);
        }
        if self.eat(TokenKind::Eol) || self.check(TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("end of line"))
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        self.error_at(self.current(), expected)
    }

    fn error_at(&self, token: &Token, expected: impl Into<String>) -> ParseError {
        ParseError::Syntax {
            line: token.line,
            expected: expected.into(),
            found: token.kind,
            value: token.value.clone(),
            expected_scope: self.scope.current(),
            found_scope: token.scope,
        }
    }

    fn scope_error(&self, relation: &'static str) -> ParseError {
        let token = self.current();
        ParseError::Scope {
            line: token.line,
            relation,
            expected: self.scope.current(),
            found: token.scope,
        }
    }

    // ------------------------------------------------------------------
    // Blocks
    // ------------------------------------------------------------------

    /// `:` then an indented body, one `parse` call per line at the body's scope
    fn block<T>(
        &mut self,
        mut parse: impl FnMut(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<Vec<T>> {
        self.expect(TokenKind::Colon)?;
        self.skip();
        if !self.scope.push(self.current().scope) {
            return Err(self.scope_error("greater than"));
        }

        let mut nodes = Vec::new();
        loop {
            self.skip();
            let token = self.current();
            if token.kind == TokenKind::Eof || token.scope < self.scope.current() {
                break;
            }
            if token.scope > self.scope.current() {
                return Err(self.scope_error("equal to"));
            }
            nodes.push(parse(self)?);
        }

        self.scope.pop();
        Ok(nodes)
    }

    fn statements(&mut self, ctx: BodyContext) -> ParseResult<Vec<Statement>> {
        self.block(|p| p.parse_statement(ctx))
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    fn parse_top_item(&mut self) -> ParseResult<Item> {
        match self.current().kind {
            TokenKind::Import => Ok(Item::Import(self.parse_import()?)),
            TokenKind::Library => Ok(Item::Library(self.parse_library()?)),
            TokenKind::Module => Ok(Item::Module(self.parse_module()?)),
            TokenKind::Arch => Ok(Item::Arch(self.parse_arch()?)),
            _ => self.parse_base_item(),
        }
    }

    /// Items allowed inside a library as well as at the top level
    fn parse_base_item(&mut self) -> ParseResult<Item> {
        match self.current().kind {
            TokenKind::Struct => Ok(Item::Struct(self.parse_struct()?)),
            TokenKind::Interface => Ok(Item::Interface(self.parse_struct()?)),
            TokenKind::Trait => Ok(Item::Trait(self.parse_trait()?)),
            TokenKind::Impl => Ok(Item::Impl(self.parse_impl()?)),
            TokenKind::Func => Ok(Item::Func(self.parse_func()?)),
            TokenKind::Task => Ok(Item::Task(self.parse_func()?)),
            TokenKind::Enum => Ok(Item::Enum(self.parse_enum()?)),
            TokenKind::Attr => Ok(Item::Attr(self.parse_attr()?)),
            TokenKind::Const | TokenKind::Ident | TokenKind::SelfType => {
                Ok(Item::Decl(self.parse_var_decl(DeclKind::Signal)?))
            }
            _ => Err(self.unexpected("declaration")),
        }
    }

    fn parse_import(&mut self) -> ParseResult<ImportDecl> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Import)?;

        let mut path = vec![self.ident()?];
        while self.eat(TokenKind::Dot) {
            path.push(self.ident()?);
        }
        let alias = if self.eat(TokenKind::As) {
            Some(self.ident()?)
        } else {
            None
        };
        self.end_line()?;

        Ok(ImportDecl {
            comments,
            path,
            alias,
            line,
        })
    }

    fn parse_library(&mut self) -> ParseResult<LibraryDecl> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Library)?;
        let name = self.ident()?;
        let items = self.block(|p| p.parse_base_item())?;

        Ok(LibraryDecl {
            comments,
            name,
            items,
            line,
        })
    }

    fn parse_module(&mut self) -> ParseResult<ModuleDecl> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Module)?;
        let name = self.ident()?;
        let generics = self.generic_params()?;
        let blackbox = self.eat(TokenKind::Blackbox);

        let mut generic_decls = Vec::new();
        let mut ports = Vec::new();
        let mut arch = None;
        self.block(|p| {
            match p.current().kind {
                TokenKind::Generics => {
                    p.advance();
                    generic_decls.extend(p.block(|p| p.parse_var_decl(DeclKind::Generic))?);
                }
                TokenKind::Ports => {
                    p.advance();
                    ports.extend(p.block(|p| p.parse_var_decl(DeclKind::Port))?);
                }
                TokenKind::Arch if arch.is_none() => arch = Some(p.parse_arch()?),
                _ => return Err(p.unexpected("'generics', 'ports' or 'arch'")),
            }
            Ok(())
        })?;

        Ok(ModuleDecl {
            comments,
            name,
            generics,
            blackbox,
            generic_decls,
            ports,
            arch,
            line,
        })
    }

    /// `arch NAME(MODULE):` nested in a module, or `arch NAME for MODULE:`
    fn parse_arch(&mut self) -> ParseResult<ArchDecl> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Arch)?;
        let name = self.ident()?;
        let generics = self.generic_params()?;

        let mut module = None;
        let mut module_generics = Vec::new();
        if self.eat(TokenKind::LParen) {
            module = Some(self.ident()?);
            self.expect(TokenKind::RParen)?;
        } else if self.eat(TokenKind::For) {
            module = Some(self.ident()?);
            module_generics = self.generic_args()?;
        }

        let mut declare_block = Vec::new();
        let mut logic_block = None;
        self.block(|p| {
            match p.current().kind {
                TokenKind::Declare => {
                    p.advance();
                    declare_block.extend(p.block(|p| p.parse_var_decl(DeclKind::Signal))?);
                }
                TokenKind::Logic if logic_block.is_none() => {
                    p.advance();
                    let comments = p.take_comments();
                    let statements = p.statements(BodyContext::Arch)?;
                    logic_block = Some(LogicBlock {
                        comments,
                        statements,
                    });
                }
                _ => return Err(p.unexpected("'declare' or 'logic'")),
            }
            Ok(())
        })?;

        let logic_block = logic_block.ok_or_else(|| self.unexpected("'logic' block"))?;
        Ok(ArchDecl {
            comments,
            name,
            generics,
            module,
            module_generics,
            declare_block,
            logic_block,
            line,
        })
    }

    fn parse_struct(&mut self) -> ParseResult<StructDecl> {
        let comments = self.take_comments();
        let line = self.line();
        let is_interface = self.advance().kind == TokenKind::Interface;
        let name = self.ident()?;
        let generics = self.generic_params()?;
        let params = if self.check(TokenKind::LParen) {
            self.decl_args()?
        } else {
            Vec::new()
        };
        let fields = self.block(|p| p.parse_var_decl(DeclKind::Field))?;

        if is_interface {
            if let Some(field) = fields.iter().find(|f| f.direction.is_none()) {
                return Err(ParseError::Syntax {
                    line: field.line,
                    expected: "interface field direction".to_string(),
                    found: TokenKind::Ident,
                    value: field.name.clone(),
                    expected_scope: self.scope.current(),
                    found_scope: self.scope.current(),
                });
            }
        }

        Ok(StructDecl {
            comments,
            name,
            generics,
            params,
            fields,
            line,
        })
    }

    fn parse_trait(&mut self) -> ParseResult<TraitDecl> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Trait)?;
        let name = self.ident()?;
        let generics = self.generic_params()?;
        let items = self.block(|p| p.parse_member_item())?;

        Ok(TraitDecl {
            comments,
            name,
            generics,
            items,
            line,
        })
    }

    /// Items allowed in trait and impl bodies
    fn parse_member_item(&mut self) -> ParseResult<Item> {
        match self.current().kind {
            TokenKind::Func => Ok(Item::Func(self.parse_func()?)),
            TokenKind::Task => Ok(Item::Task(self.parse_func()?)),
            TokenKind::Attr => Ok(Item::Attr(self.parse_attr()?)),
            TokenKind::Const => Ok(Item::Decl(self.parse_var_decl(DeclKind::Const)?)),
            _ => Err(self.unexpected("'func', 'task', 'attr' or 'const'")),
        }
    }

    /// `impl<G> Type<A>:` or `impl<G> Trait<A> for Type<B>:`
    fn parse_impl(&mut self) -> ParseResult<ImplDecl> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Impl)?;
        let generics = self.generic_params()?;

        let first = self.type_name()?;
        let first_generics = self.generic_args()?;
        let (target, target_generics, trait_name, trait_generics) = if self.eat(TokenKind::For) {
            let target = self.type_name()?;
            let target_generics = self.generic_args()?;
            (target, target_generics, Some(first), first_generics)
        } else {
            (first, first_generics, None, Vec::new())
        };

        // A trait binding needs no body when the trait supplies every function
        let items = if trait_name.is_some() && !self.check(TokenKind::Colon) {
            self.end_line()?;
            Vec::new()
        } else {
            self.block(|p| p.parse_member_item())?
        };

        Ok(ImplDecl {
            comments,
            generics,
            target,
            target_generics,
            trait_name,
            trait_generics,
            items,
            line,
        })
    }

    fn parse_func(&mut self) -> ParseResult<FuncDecl> {
        let comments = self.take_comments();
        let line = self.line();
        let kind = match self.advance().kind {
            TokenKind::Task => FuncKind::Task,
            _ => FuncKind::Func,
        };

        let name = match self.current().kind {
            TokenKind::Ident
            | TokenKind::Relation
            | TokenKind::Lt
            | TokenKind::Gt
            | TokenKind::LogicalOp
            | TokenKind::ModRem
            | TokenKind::Not
            | TokenKind::Add
            | TokenKind::Sub
            | TokenKind::Star
            | TokenKind::Div
            | TokenKind::Exp
            | TokenKind::Concat => self.advance().value,
            _ => return Err(self.unexpected("function name or operator")),
        };
        let generics = self.generic_params()?;
        let params = self.decl_args()?;

        let mut returns = Vec::new();
        if self.eat(TokenKind::Arrow) {
            if self.eat(TokenKind::LParen) {
                returns.push(self.type_ref()?);
                while self.eat(TokenKind::Comma) {
                    returns.push(self.type_ref()?);
                }
                self.expect(TokenKind::RParen)?;
            } else {
                returns.push(self.type_ref()?);
            }
        }

        let body = if self.check(TokenKind::Colon) {
            let ctx = match kind {
                FuncKind::Func => BodyContext::Func,
                FuncKind::Task => BodyContext::Task,
            };
            Some(self.func_body(ctx)?)
        } else {
            self.end_line()?;
            None
        };

        Ok(FuncDecl {
            comments,
            kind,
            name,
            generics,
            params,
            returns,
            body,
            line,
        })
    }

    fn func_body(&mut self, ctx: BodyContext) -> ParseResult<FuncBody> {
        let mut declare_block = Vec::new();
        let mut logic_block = None;
        self.block(|p| {
            match p.current().kind {
                TokenKind::Declare => {
                    p.advance();
                    declare_block.extend(p.block(|p| p.parse_var_decl(DeclKind::Signal))?);
                }
                TokenKind::Logic if logic_block.is_none() => {
                    p.advance();
                    let comments = p.take_comments();
                    let statements = p.statements(ctx)?;
                    logic_block = Some(LogicBlock {
                        comments,
                        statements,
                    });
                }
                _ => return Err(p.unexpected("'declare' or 'logic'")),
            }
            Ok(())
        })?;

        let logic_block = logic_block.ok_or_else(|| self.unexpected("'logic' block"))?;
        Ok(FuncBody {
            declare_block,
            logic_block,
        })
    }

    /// `(TYPE<...>** name = default, ...)`
    fn decl_args(&mut self) -> ParseResult<Vec<ParamDecl>> {
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if self.eat(TokenKind::RParen) {
            return Ok(params);
        }

        loop {
            params.push(self.decl_arg()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(params)
    }

    fn decl_arg(&mut self) -> ParseResult<ParamDecl> {
        let line = self.line();
        let name = self.type_name()?;
        let generics = self.generic_args()?;
        let mut dim = 0;
        while self.eat(TokenKind::Star) {
            dim += 1;
        }

        let (param_name, is_self) = match self.current().kind {
            TokenKind::Ident => (self.advance().value, false),
            TokenKind::SelfValue => (self.advance().value, true),
            _ => return Err(self.unexpected("parameter name")),
        };
        let default = if self.eat(TokenKind::Assign) {
            Some(self.complex_expr()?)
        } else {
            None
        };

        Ok(ParamDecl {
            ty: TypeRef {
                name,
                generics,
                dim,
            },
            name: param_name,
            is_self,
            default,
            line,
        })
    }

    fn parse_enum(&mut self) -> ParseResult<EnumDecl> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Enum)?;
        let name = self.ident()?;
        self.expect(TokenKind::Assign)?;
        self.expect(TokenKind::LParen)?;
        let mut states = vec![self.ident()?];
        while self.eat(TokenKind::Comma) {
            states.push(self.ident()?);
        }
        self.expect(TokenKind::RParen)?;
        self.end_line()?;

        Ok(EnumDecl {
            comments,
            name,
            states,
            line,
        })
    }

    fn parse_attr(&mut self) -> ParseResult<AttrDecl> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Attr)?;
        self.expect(TokenKind::LParen)?;

        let mut specs = Vec::new();
        loop {
            let name = self.ident()?;
            self.expect(TokenKind::Assign)?;
            let value = self.simple_expr()?;
            specs.push(AttrSpec { name, value });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::For)?;
        let target = self.type_name()?;
        self.end_line()?;

        Ok(AttrDecl {
            comments,
            specs,
            target,
            line,
        })
    }

    /// `const? TYPE<...>(args)? [index]* DIRECTION? NAME (= value)?`
    fn parse_var_decl(&mut self, kind: DeclKind) -> ParseResult<VarDecl> {
        let comments = self.take_comments();
        let line = self.line();
        let explicit_const = self.eat(TokenKind::Const);
        let kind = match kind {
            DeclKind::Signal if explicit_const => DeclKind::Const,
            other => other,
        };
        let is_const = explicit_const || matches!(kind, DeclKind::Const | DeclKind::Generic);

        let ty = self.type_name()?;
        let generics = self.generic_args()?;
        let args = if self.check(TokenKind::LParen) {
            self.call_args()?
        } else {
            Vec::new()
        };

        let mut array = Vec::new();
        while self.eat(TokenKind::LBracket) {
            array.push(self.index()?);
            self.expect(TokenKind::RBracket)?;
        }

        let direction = if self.current().kind.is_port_direction() {
            PortDirection::from_keyword(&self.advance().value)
        } else {
            None
        };
        let name = self.ident()?;
        let value = if self.eat(TokenKind::Assign) {
            Some(self.complex_expr()?)
        } else {
            None
        };
        self.end_line()?;

        Ok(VarDecl {
            comments,
            kind,
            is_const,
            ty,
            generics,
            args,
            array,
            direction,
            name,
            value,
            line,
        })
    }

    // ------------------------------------------------------------------
    // Names and generics
    // ------------------------------------------------------------------

    /// `ID (. ID)*` or `Self`
    fn type_name(&mut self) -> ParseResult<TypeName> {
        if self.eat(TokenKind::SelfType) {
            return Ok(TypeName::SelfType);
        }
        let mut segments = vec![self.ident()?];
        while self.check(TokenKind::Dot) && self.peek(1).kind == TokenKind::Ident {
            self.advance();
            segments.push(self.ident()?);
        }
        Ok(TypeName::Path(segments))
    }

    fn type_ref(&mut self) -> ParseResult<TypeRef> {
        let name = self.type_name()?;
        let generics = self.generic_args()?;
        let mut dim = 0;
        while self.eat(TokenKind::Star) {
            dim += 1;
        }
        Ok(TypeRef {
            name,
            generics,
            dim,
        })
    }

    /// `<T(Bound + Bound) = Default, ...>` on a declaration
    fn generic_params(&mut self) -> ParseResult<Vec<GenericParam>> {
        let mut params = Vec::new();
        if !self.eat(TokenKind::Lt) {
            return Ok(params);
        }

        loop {
            let line = self.line();
            let name = self.ident()?;
            let mut bounds = Vec::new();
            if self.eat(TokenKind::LParen) {
                bounds.push(self.type_name()?);
                while self.eat(TokenKind::Add) {
                    bounds.push(self.type_name()?);
                }
                self.expect(TokenKind::RParen)?;
            }
            let default = if self.eat(TokenKind::Assign) {
                Some(self.type_ref()?)
            } else {
                None
            };
            params.push(GenericParam {
                name,
                bounds,
                default,
                line,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Gt)?;
        Ok(params)
    }

    /// `<Type, Type>` on a use site
    fn generic_args(&mut self) -> ParseResult<Vec<TypeRef>> {
        let mut args = Vec::new();
        if !self.eat(TokenKind::Lt) {
            return Ok(args);
        }
        loop {
            args.push(self.type_ref()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Gt)?;
        Ok(args)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self, ctx: BodyContext) -> ParseResult<Statement> {
        match self.current().kind {
            TokenKind::Ident | TokenKind::SelfValue | TokenKind::LParen => {
                self.parse_leading_name(ctx)
            }
            TokenKind::Const if ctx.allows_decls() => {
                Ok(Statement::Decl(self.parse_var_decl(DeclKind::Signal)?))
            }
            TokenKind::Spro | TokenKind::Apro | TokenKind::Pro if ctx.allows_processes() => {
                Ok(Statement::Process(self.parse_process()?))
            }
            TokenKind::For => Ok(Statement::For(self.parse_for(ctx)?)),
            TokenKind::If => Ok(Statement::If(self.parse_if(ctx)?)),
            TokenKind::Case => Ok(Statement::Case(self.parse_case(ctx)?)),
            TokenKind::Rename => Ok(Statement::Rename(self.parse_rename()?)),
            TokenKind::Assert => Ok(Statement::Assert(self.parse_assert()?)),
            TokenKind::Print | TokenKind::Warning | TokenKind::Error => {
                let report = self.parse_report()?;
                self.end_line()?;
                Ok(Statement::Report(report))
            }
            TokenKind::Return if ctx.allows_return() => Ok(Statement::Return(self.parse_return()?)),
            _ => Err(self.unexpected(format!("statement allowed in {}", ctx.describe()))),
        }
    }

    fn parse_leading_name(&mut self, ctx: BodyContext) -> ParseResult<Statement> {
        match self.classify_statement()? {
            StatementForm::Instance if ctx.allows_instances() => {
                Ok(Statement::ModuleInst(self.parse_module_inst()?))
            }
            StatementForm::Declaration if ctx.allows_decls() => {
                Ok(Statement::Decl(self.parse_var_decl(DeclKind::Signal)?))
            }
            StatementForm::Assignment => Ok(Statement::Assign(self.parse_assignment()?)),
            StatementForm::Call => Ok(Statement::Call(self.parse_call_stmt()?)),
            _ => Err(self.unexpected(format!("statement allowed in {}", ctx.describe()))),
        }
    }

    /// Decide the statement form without consuming tokens.
    ///
    /// `ID ID ... :` is an instance and `ID ID ...` a declaration. Otherwise
    /// the line is scanned, skipping balanced groups, until a declared name
    /// (declaration), an assignment operator (assignment) or anything else
    /// (call) shows up.
    fn classify_statement(&self) -> ParseResult<StatementForm> {
        if self.check(TokenKind::LParen) {
            return Ok(StatementForm::Assignment);
        }
        if self.peek(0).kind == TokenKind::Ident && self.peek(1).kind == TokenKind::Ident {
            return Ok(if self.line_ends_with_colon() {
                StatementForm::Instance
            } else {
                StatementForm::Declaration
            });
        }

        let mut offset = 1;
        let mut after_dot = false;
        loop {
            let kind = self.peek(offset).kind;
            match kind {
                TokenKind::LBracket | TokenKind::LParen => {
                    offset = self.skip_group(offset)?;
                    after_dot = false;
                    continue;
                }
                TokenKind::Lt if offset == 1 => {
                    offset = self.skip_group(offset)?;
                    continue;
                }
                TokenKind::Dot => {
                    after_dot = true;
                    offset += 1;
                    continue;
                }
                TokenKind::Ident if after_dot => {
                    after_dot = false;
                    offset += 1;
                    continue;
                }
                TokenKind::Ident => return Ok(StatementForm::Declaration),
                k if k.is_port_direction() => return Ok(StatementForm::Declaration),
                k if k.is_assign_op() => return Ok(StatementForm::Assignment),
                _ => return Ok(StatementForm::Call),
            }
        }
    }

    /// Offset just past the group opened at `offset`
    fn skip_group(&self, offset: usize) -> ParseResult<usize> {
        let open = self.peek(offset).kind;
        let close = match open {
            TokenKind::LBracket => TokenKind::RBracket,
            TokenKind::LParen => TokenKind::RParen,
            _ => TokenKind::Gt,
        };

        let mut depth = 0usize;
        let mut at = offset;
        loop {
            let token = self.peek(at);
            match token.kind {
                k if k == open => depth += 1,
                k if k == close => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(at + 1);
                    }
                }
                TokenKind::Eol | TokenKind::Eof => {
                    return Err(self.error_at(token, close.to_string()));
                }
                _ => {}
            }
            at += 1;
        }
    }

    fn line_ends_with_colon(&self) -> bool {
        let mut offset = 0;
        let mut last = TokenKind::Eol;
        loop {
            match self.peek(offset).kind {
                TokenKind::Eol | TokenKind::Eof => return last == TokenKind::Colon,
                TokenKind::Comment => {}
                kind => last = kind,
            }
            offset += 1;
        }
    }

    /// `( expr , ...` at the current `(`
    fn tuple_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut offset = 0;
        loop {
            match self.peek(offset).kind {
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return false;
                    }
                }
                TokenKind::Comma if depth == 1 => return true,
                TokenKind::Eol | TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
        }
    }

    fn parse_module_inst(&mut self) -> ParseResult<ModuleInst> {
        let comments = self.take_comments();
        let line = self.line();
        let name = self.ident()?;
        let module = self.type_name()?;
        let generics = self.generic_args()?;

        let mut arch = None;
        let mut blackbox = false;
        if self.eat(TokenKind::LParen) {
            if self.eat(TokenKind::Blackbox) {
                blackbox = true;
            } else {
                arch = Some(self.ident()?);
            }
            self.expect(TokenKind::RParen)?;
        }

        let mut generic_assigns = Vec::new();
        let mut port_assigns = Vec::new();
        self.block(|p| {
            match p.current().kind {
                TokenKind::Generics => {
                    p.advance();
                    generic_assigns.extend(p.block(|p| p.parse_connection())?);
                }
                TokenKind::Ports => {
                    p.advance();
                    port_assigns.extend(p.block(|p| p.parse_connection())?);
                }
                _ => return Err(p.unexpected("'generics' or 'ports'")),
            }
            Ok(())
        })?;

        Ok(ModuleInst {
            comments,
            name,
            module,
            generics,
            arch,
            blackbox,
            generic_assigns,
            port_assigns,
            line,
        })
    }

    fn parse_connection(&mut self) -> ParseResult<Connection> {
        let line = self.line();
        let target = self.ident()?;
        self.expect(TokenKind::Assign)?;
        let value = self.complex_expr()?;
        self.end_line()?;
        Ok(Connection {
            target,
            value,
            line,
        })
    }

    fn parse_assignment(&mut self) -> ParseResult<Assignment> {
        let comments = self.take_comments();
        let line = self.line();

        let target = if self.eat(TokenKind::LParen) {
            let mut vars = vec![self.var_ref()?];
            while self.eat(TokenKind::Comma) {
                vars.push(self.var_ref()?);
            }
            self.expect(TokenKind::RParen)?;
            AssignTarget::Tuple(vars)
        } else {
            AssignTarget::Var(self.var_ref()?)
        };

        let op = match AssignOp::from_token(&self.current().value) {
            Some(op) if self.current().kind.is_assign_op() => op,
            _ => return Err(self.unexpected("assignment operator")),
        };
        self.advance();

        let value = match op {
            AssignOp::Increment | AssignOp::Decrement => Expr::int(1),
            _ => self.complex_expr()?,
        };
        self.end_line()?;

        Ok(Assignment {
            comments,
            target,
            op,
            value,
            line,
        })
    }

    fn parse_call_stmt(&mut self) -> ParseResult<CallStmt> {
        let comments = self.take_comments();
        let line = self.line();
        let call = self.primary()?;
        let is_call = match &call {
            Expr::Call(_) => true,
            Expr::Var(var) => ends_in_method(var),
            _ => false,
        };
        if !is_call {
            return Err(self.unexpected("assignment or call"));
        }
        self.end_line()?;
        Ok(CallStmt {
            comments,
            call,
            line,
        })
    }

    fn parse_process(&mut self) -> ParseResult<Process> {
        let comments = self.take_comments();
        let line = self.line();
        let kind = match self.advance().kind {
            TokenKind::Spro => ProcessKind::Spro,
            TokenKind::Apro => ProcessKind::Apro,
            _ => ProcessKind::Pro,
        };

        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.simple_expr()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let statements = self.statements(BodyContext::Process)?;

        Ok(Process {
            comments,
            kind,
            args,
            statements,
            line,
        })
    }

    fn parse_for(&mut self, ctx: BodyContext) -> ParseResult<ForLoop> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::For)?;
        let var = self.ident()?;
        self.expect(TokenKind::In)?;
        self.expect(TokenKind::LBracket)?;
        let range = self.index()?;
        self.expect(TokenKind::RBracket)?;
        let statements = self.statements(ctx)?;

        Ok(ForLoop {
            comments,
            var,
            range,
            statements,
            line,
        })
    }

    fn parse_if(&mut self, ctx: BodyContext) -> ParseResult<IfStmt> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::If)?;
        let cond = self.simple_expr()?;
        let statements = self.statements(ctx)?;
        let mut branches = vec![CondBranch {
            cond,
            statements,
            line,
        }];

        let mut else_branch = None;
        loop {
            self.skip();
            if self.check_in_scope(TokenKind::Elif) {
                let line = self.line();
                self.advance();
                let cond = self.simple_expr()?;
                let statements = self.statements(ctx)?;
                branches.push(CondBranch {
                    cond,
                    statements,
                    line,
                });
            } else if self.check_in_scope(TokenKind::Else) {
                self.advance();
                else_branch = Some(self.statements(ctx)?);
                break;
            } else {
                break;
            }
        }

        Ok(IfStmt {
            comments,
            branches,
            else_branch,
            line,
        })
    }

    fn parse_case(&mut self, ctx: BodyContext) -> ParseResult<CaseStmt> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Case)?;
        let selector = self.simple_expr()?;
        let arms = self.block(|p| {
            let line = p.line();
            let mut choices = vec![p.choice(false)?];
            while p.eat(TokenKind::Bar) {
                choices.push(p.choice(false)?);
            }
            let statements = p.statements(ctx)?;
            Ok(CaseArm {
                choices,
                statements,
                line,
            })
        })?;

        Ok(CaseStmt {
            comments,
            selector,
            arms,
            line,
        })
    }

    fn parse_rename(&mut self) -> ParseResult<Rename> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Rename)?;
        let target = self.var_ref()?;
        self.expect(TokenKind::Assign)?;
        let value = self.simple_expr()?;
        self.end_line()?;

        Ok(Rename {
            comments,
            target,
            value,
            line,
        })
    }

    fn parse_assert(&mut self) -> ParseResult<Assert> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Assert)?;
        let cond = self.simple_expr()?;
        let mut reports = self.block(|p| {
            let report = p.parse_report()?;
            p.end_line()?;
            Ok(report)
        })?;

        if reports.len() != 1 {
            return Err(ParseError::Syntax {
                line,
                expected: "a single report".to_string(),
                found: TokenKind::Print,
                value: format!("{} reports", reports.len()),
                expected_scope: self.scope.current(),
                found_scope: self.scope.current(),
            });
        }
        let report = reports.remove(0);

        Ok(Assert {
            comments,
            cond,
            report,
            line,
        })
    }

    fn parse_report(&mut self) -> ParseResult<Report> {
        let comments = self.take_comments();
        let line = self.line();
        let severity = match self.current().kind {
            TokenKind::Print => Severity::Print,
            TokenKind::Warning => Severity::Warning,
            TokenKind::Error => Severity::Error,
            _ => return Err(self.unexpected("'print', 'warning' or 'error'")),
        };
        self.advance();
        self.expect(TokenKind::LParen)?;
        let message = self.simple_expr()?;
        self.expect(TokenKind::RParen)?;

        Ok(Report {
            comments,
            severity,
            message,
            line,
        })
    }

    fn parse_return(&mut self) -> ParseResult<Return> {
        let comments = self.take_comments();
        let line = self.line();
        self.expect(TokenKind::Return)?;

        let values = if self.check(TokenKind::LParen) && self.tuple_ahead() {
            self.advance();
            let mut values = vec![self.complex_expr()?];
            while self.eat(TokenKind::Comma) {
                values.push(self.complex_expr()?);
            }
            self.expect(TokenKind::RParen)?;
            values
        } else {
            vec![self.complex_expr()?]
        };
        self.end_line()?;

        Ok(Return {
            comments,
            values,
            line,
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Aggregate or simple expression
    fn complex_expr(&mut self) -> ParseResult<Expr> {
        if self.check(TokenKind::LBracket) {
            self.aggregate()
        } else {
            self.simple_expr()
        }
    }

    /// `[choice | choice => value, value, ...]`, possibly across lines
    fn aggregate(&mut self) -> ParseResult<Expr> {
        self.expect(TokenKind::LBracket)?;
        let mut elements = Vec::new();
        loop {
            self.skip();
            let element = if self.fat_arrow_ahead() {
                let mut choices = vec![self.choice(true)?];
                while self.eat(TokenKind::Bar) {
                    choices.push(self.choice(true)?);
                }
                self.expect(TokenKind::FatArrow)?;
                Element {
                    choices,
                    value: self.complex_expr()?,
                }
            } else {
                Element {
                    choices: Vec::new(),
                    value: self.complex_expr()?,
                }
            };
            elements.push(element);
            self.skip();
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.skip();
        self.expect(TokenKind::RBracket)?;
        Ok(Expr::Aggregate(elements))
    }

    fn fat_arrow_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut offset = 0;
        loop {
            match self.peek(offset).kind {
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket if depth == 0 => return false,
                TokenKind::RParen | TokenKind::RBracket => depth -= 1,
                TokenKind::Comma if depth == 0 => return false,
                TokenKind::FatArrow if depth == 0 => return true,
                TokenKind::Eof => return false,
                _ => {}
            }
            offset += 1;
        }
    }

    fn choice(&mut self, allow_slice: bool) -> ParseResult<Choice> {
        if self.eat(TokenKind::Others) {
            return Ok(Choice::Others);
        }
        if allow_slice {
            Ok(Choice::Index(self.index()?))
        } else {
            Ok(Choice::Index(Index::Single(self.simple_expr()?)))
        }
    }

    /// Lowest precedence level: logical operators, then an optional unit
    fn simple_expr(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.relation()?;
        while self.check(TokenKind::LogicalOp) {
            lhs = self.binary_tail(lhs, Self::relation)?;
        }

        if matches!(lhs, Expr::Const(_)) && self.check(TokenKind::Ident) {
            let unit = self.advance().value;
            return Ok(Expr::Units(Box::new(lhs), unit));
        }
        Ok(lhs)
    }

    fn relation(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.term()?;
        while matches!(
            self.current().kind,
            TokenKind::Relation | TokenKind::Lt | TokenKind::Gt
        ) {
            lhs = self.binary_tail(lhs, Self::term)?;
        }
        Ok(lhs)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.factor()?;
        while matches!(
            self.current().kind,
            TokenKind::Add | TokenKind::Sub | TokenKind::Concat
        ) {
            lhs = self.binary_tail(lhs, Self::factor)?;
        }
        Ok(lhs)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.exponent()?;
        while matches!(
            self.current().kind,
            TokenKind::Star | TokenKind::Div | TokenKind::ModRem
        ) {
            lhs = self.binary_tail(lhs, Self::exponent)?;
        }
        Ok(lhs)
    }

    fn exponent(&mut self) -> ParseResult<Expr> {
        let mut lhs = self.unary()?;
        while self.check(TokenKind::Exp) {
            lhs = self.binary_tail(lhs, Self::unary)?;
        }
        Ok(lhs)
    }

    /// Consume the operator at the cursor and the right operand
    fn binary_tail(
        &mut self,
        lhs: Expr,
        operand: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let token = self.current().clone();
        let op = BinaryOp::from_token(&token.value).ok_or_else(|| self.unexpected("operator"))?;
        self.advance();
        let rhs = operand(self)?;
        Ok(Expr::Binary(BinaryExpr {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
            line: token.line,
        }))
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        let op = match self.current().kind {
            TokenKind::Add => UnaryOp::Plus,
            TokenKind::Sub => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            _ => return self.primary(),
        };
        let line = self.advance().line;
        let operand = self.unary()?;
        Ok(Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
            line,
        }))
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Integer => {
                self.advance();
                let value = literal::parse_decimal(&token.value)
                    .ok_or_else(|| self.error_at(&token, "integer within 64 bits"))?;
                Ok(Expr::Const(Literal::int(value)))
            }
            TokenKind::Float => {
                self.advance();
                let value = literal::parse_float(&token.value)
                    .ok_or_else(|| self.error_at(&token, "float"))?;
                Ok(Expr::Const(Literal::float(value)))
            }
            TokenKind::String => {
                self.advance();
                Ok(Expr::Const(Literal::string(literal::parse_string(&token.value))))
            }
            TokenKind::Boolean => {
                self.advance();
                Ok(Expr::Const(Literal::boolean(token.value == "true")))
            }
            TokenKind::BinBits | TokenKind::HexBits => {
                self.advance();
                let bits = if token.kind == TokenKind::HexBits {
                    literal::parse_hex_bits(&token.value)
                } else {
                    literal::parse_binary_bits(&token.value)
                };
                let bits = bits.ok_or_else(|| self.error_at(&token, "bit string"))?;
                Ok(bits_expr(bits))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.simple_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.aggregate(),
            TokenKind::Ident
                if self.peek(1).kind == TokenKind::LParen
                    || (self.peek(1).kind == TokenKind::Lt && self.generic_call_ahead()) =>
            {
                Ok(Expr::Call(self.func_call()?))
            }
            TokenKind::Ident | TokenKind::SelfValue => Ok(Expr::Var(self.var_ref()?)),
            _ => Err(self.unexpected("expression")),
        }
    }

    /// `name<T, U>(` ahead, as opposed to a `<` comparison
    fn generic_call_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut offset = 1;
        loop {
            match self.peek(offset).kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => {
                    depth -= 1;
                    if depth == 0 {
                        return self.peek(offset + 1).kind == TokenKind::LParen;
                    }
                }
                TokenKind::Ident
                | TokenKind::Dot
                | TokenKind::Comma
                | TokenKind::Star
                | TokenKind::SelfType => {}
                _ => return false,
            }
            offset += 1;
        }
    }

    fn func_call(&mut self) -> ParseResult<FuncCall> {
        let token = self.advance();
        let generics = self.generic_args()?;
        let args = self.call_args()?;
        Ok(FuncCall {
            name: token.value,
            generics,
            args,
            line: token.line,
        })
    }

    fn call_args(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.eat(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.complex_expr()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    /// `name [index]* (.field | .method(args))?`
    fn var_ref(&mut self) -> ParseResult<VarRef> {
        let token = self.current().clone();
        let is_self = match token.kind {
            TokenKind::SelfValue => true,
            TokenKind::Ident => false,
            _ => return Err(self.unexpected("variable")),
        };
        self.advance();

        let mut index = Vec::new();
        while self.eat(TokenKind::LBracket) {
            index.push(self.index()?);
            self.expect(TokenKind::RBracket)?;
        }

        let member = if self.eat(TokenKind::Dot) {
            if self.check(TokenKind::Ident) && self.peek(1).kind == TokenKind::LParen {
                Some(Member::Method(self.func_call()?))
            } else {
                Some(Member::Field(Box::new(self.var_ref()?)))
            }
        } else {
            None
        };

        Ok(VarRef {
            name: token.value,
            is_self,
            index,
            member,
            line: token.line,
        })
    }

    /// `expr` or `expr : expr`
    fn index(&mut self) -> ParseResult<Index> {
        let left = self.simple_expr()?;
        if self.eat(TokenKind::Colon) {
            let right = self.simple_expr()?;
            Ok(Index::Slice(left, right))
        } else {
            Ok(Index::Single(left))
        }
    }
}

fn bits_expr(bits: Vec<bool>) -> Expr {
    if bits.len() == 1 {
        Expr::Const(Literal::bit(bits[0]))
    } else {
        Expr::Array(bits.into_iter().map(Literal::bit).collect())
    }
}

fn ends_in_method(var: &VarRef) -> bool {
    match &var.member {
        Some(Member::Method(_)) => true,
        Some(Member::Field(inner)) => ends_in_method(inner),
        None => false,
    }
}

/// Parse an already tokenized file
pub fn parse_tokens(tokens: &[Token], name: &str) -> ParseResult<SourceFile> {
    Parser::new(tokens).parse_file(name)
}

/// Tokenize and parse `source`
pub fn parse(source: &str, config: &GrammarConfig, name: &str) -> ParseResult<SourceFile> {
    let tokens = tokenize(source, config)?;
    parse_tokens(&tokens, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> SourceFile {
        parse(source, &GrammarConfig::default(), "test.fdl").unwrap()
    }

    fn arch_statements(file: &SourceFile) -> &[Statement] {
        match &file.items[0] {
            Item::Module(module) => &module.arch.as_ref().unwrap().logic_block.statements,
            other => panic!("expected module, got {:?}", other.kind()),
        }
    }

    fn module_with_logic(logic: &str) -> String {
        let mut source = String::from("module M:\n  ports:\n    int x\n  arch A(M):\n    logic:\n");
        for line in logic.lines() {
            source.push_str("      ");
            source.push_str(line);
            source.push('\n');
        }
        source
    }

    #[test]
    fn test_module_with_nested_arch() {
        let file = parse_ok("module M:\n  ports:\n    int x\n  arch A(M):\n    logic:\n      x = 1\n");
        assert_eq!(file.items.len(), 1);
        let Item::Module(module) = &file.items[0] else {
            panic!("expected module");
        };
        assert_eq!(module.name, "M");
        assert_eq!(module.ports.len(), 1);
        assert_eq!(module.ports[0].kind, DeclKind::Port);

        let arch = module.arch.as_ref().unwrap();
        assert_eq!(arch.module.as_deref(), Some("M"));
        let Statement::Assign(assign) = &arch.logic_block.statements[0] else {
            panic!("expected assignment");
        };
        let AssignTarget::Var(var) = &assign.target else {
            panic!("expected single target");
        };
        assert_eq!(var.name, "x");
        assert_eq!(assign.value.const_int(), Some(1));
    }

    #[test]
    fn test_statement_classification() {
        let file = parse_ok(&module_with_logic(
            "bit[7:0] data\nint y = 3\ndata[3:0] = b'1010'\nlib.word w\nx++\nreset(x)\nu1 Counter(rtl):\n  ports:\n    clk = x\n",
        ));
        let kinds: Vec<NodeKind> = arch_statements(&file).iter().map(Statement::kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Decl,
                NodeKind::Decl,
                NodeKind::Assign,
                NodeKind::Decl,
                NodeKind::PostOp,
                NodeKind::Call,
                NodeKind::ModuleInst
            ]
        );
    }

    #[test]
    fn test_unclosed_bracket_is_error() {
        let source = module_with_logic("data[3:0 = 1\n");
        let err = parse(&source, &GrammarConfig::default(), "t").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 6, found: TokenKind::Eol, .. }));
    }

    #[test]
    fn test_block_must_be_indented() {
        let err = parse("module M:\nports:\n  int x\n", &GrammarConfig::default(), "t").unwrap_err();
        assert!(matches!(err, ParseError::Scope { line: 2, .. }));
    }

    #[test]
    fn test_precedence_and_concat() {
        let file = parse_ok(&module_with_logic("x = a + b * c & d\n"));
        let Statement::Assign(assign) = &arch_statements(&file)[0] else {
            panic!("expected assignment");
        };
        let Expr::Binary(top) = &assign.value else {
            panic!("expected binary");
        };
        // term level is left associative: (a + (b * c)) & d
        assert_eq!(top.op, BinaryOp::Concat);
        assert_eq!(assign.value.kind(), NodeKind::Cat);
        let Expr::Binary(sum) = top.lhs.as_ref() else {
            panic!("expected sum");
        };
        assert_eq!(sum.op, BinaryOp::Add);
        assert!(matches!(sum.rhs.as_ref(), Expr::Binary(b) if b.op == BinaryOp::Mul));
    }

    #[test]
    fn test_bit_strings_expand_per_bit() {
        let file = parse_ok(&module_with_logic("x = x'A'\nx = b'1010'\nx = '1'\n"));
        let values: Vec<&Expr> = arch_statements(&file)
            .iter()
            .map(|s| match s {
                Statement::Assign(a) => &a.value,
                _ => panic!("expected assignment"),
            })
            .collect();
        assert_eq!(values[0], values[1]);
        assert_eq!(values[0].kind(), NodeKind::Array);
        assert_eq!(values[2].kind(), NodeKind::Const);
    }

    #[test]
    fn test_function_declaration() {
        let file = parse_ok("func add(int a, int b = 0) -> int:\n  logic:\n    return a + b\nfunc neg(int a) -> int\n");
        let Item::Func(add) = &file.items[0] else {
            panic!("expected func");
        };
        assert_eq!(add.params.len(), 2);
        assert!(add.params[1].default.is_some());
        assert!(add.body.is_some());
        let Item::Func(neg) = &file.items[1] else {
            panic!("expected func");
        };
        assert!(neg.body.is_none());
    }

    #[test]
    fn test_trait_impl_without_body() {
        let file = parse_ok("impl Printable for Word\nimpl Word:\n  func get(Self self) -> int:\n    logic:\n      return 1\n");
        let Item::Impl(bind) = &file.items[0] else {
            panic!("expected impl");
        };
        assert!(bind.is_trait_impl());
        assert_eq!(bind.target, TypeName::simple("Word"));
        assert!(bind.items.is_empty());
        let Item::Impl(inherent) = &file.items[1] else {
            panic!("expected impl");
        };
        assert!(!inherent.is_trait_impl());
        assert_eq!(inherent.items.len(), 1);
    }

    #[test]
    fn test_if_elif_else_and_case() {
        let file = parse_ok(&module_with_logic(
            "spro(clk, rst):\n  if (a == 1):\n    x = 1\n  elif (a == 2):\n    x = 2\n  else:\n    x = 3\n  case (a):\n    0:\n      x = 0\n    others:\n      x = 1\n",
        ));
        let Statement::Process(process) = &arch_statements(&file)[0] else {
            panic!("expected process");
        };
        assert_eq!(process.args.len(), 2);
        let Statement::If(stmt) = &process.statements[0] else {
            panic!("expected if");
        };
        assert_eq!(stmt.branches.len(), 2);
        assert!(stmt.else_branch.is_some());
        let Statement::Case(case) = &process.statements[1] else {
            panic!("expected case");
        };
        assert_eq!(case.arms.len(), 2);
        assert_eq!(case.arms[1].choices, vec![Choice::Others]);
    }

    #[test]
    fn test_process_rejects_instances() {
        let source = module_with_logic("spro(clk, rst):\n  u1 Counter:\n    ports:\n      clk = clk\n");
        assert!(parse(&source, &GrammarConfig::default(), "t").is_err());
    }

    #[test]
    fn test_aggregate_with_choices() {
        let file = parse_ok(&module_with_logic("x = [0 => '1', 2|3 => '0', others => '1']\n"));
        let Statement::Assign(assign) = &arch_statements(&file)[0] else {
            panic!("expected assignment");
        };
        let Expr::Aggregate(elements) = &assign.value else {
            panic!("expected aggregate");
        };
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[1].choices.len(), 2);
        assert_eq!(elements[2].choices, vec![Choice::Others]);
    }

    #[test]
    fn test_comments_attach_to_next_node() {
        let file = parse_ok("# the counter\nmodule M:\n  ports:\n    int x\n");
        let Item::Module(module) = &file.items[0] else {
            panic!("expected module");
        };
        assert_eq!(module.comments, vec!["# the counter".to_string()]);
    }

    #[test]
    fn test_generic_call_versus_comparison() {
        let file = parse_ok(&module_with_logic("x = a < b\nx = cast<int>(y)\n"));
        let kinds: Vec<NodeKind> = arch_statements(&file)
            .iter()
            .map(|s| match s {
                Statement::Assign(a) => a.value.kind(),
                _ => panic!("expected assignment"),
            })
            .collect();
        assert_eq!(kinds, vec![NodeKind::Expr, NodeKind::FuncCall]);
    }
}
