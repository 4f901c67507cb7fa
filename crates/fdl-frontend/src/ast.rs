//! Abstract Syntax Tree for FDL
//!
//! Every construct is a closed enum or struct. `kind()` on the node enums
//! returns the node's tag for diagnostics and visitors.

use crate::literal::{ConstValue, Literal};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Node kind tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    File,
    Import,
    Library,
    Module,
    Arch,
    Struct,
    Interface,
    Trait,
    Impl,
    Func,
    Task,
    Enum,
    Attr,
    Decl,
    Assign,
    ArithAssign,
    LogicalAssign,
    PostOp,
    ModuleInst,
    Spro,
    Apro,
    Pro,
    For,
    If,
    Case,
    Rename,
    Assert,
    Report,
    Return,
    Call,
    Expr,
    Cat,
    Const,
    Array,
    Aggregate,
    Var,
    FuncCall,
    Units,
}

/// A parsed source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    /// File name the source was read from
    pub name: String,
    /// Comments with no following node
    pub comments: Vec<String>,
    pub items: Vec<Item>,
}

impl SourceFile {
    pub fn kind(&self) -> NodeKind {
        NodeKind::File
    }

    /// Top-level import statements
    pub fn imports(&self) -> impl Iterator<Item = &ImportDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Import(import) => Some(import),
            _ => None,
        })
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Module(module) => Some(module),
            _ => None,
        })
    }
}

/// Top-level and library-level declarations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Import(ImportDecl),
    Library(LibraryDecl),
    Module(ModuleDecl),
    Arch(ArchDecl),
    Struct(StructDecl),
    Interface(StructDecl),
    Trait(TraitDecl),
    Impl(ImplDecl),
    Func(FuncDecl),
    Task(FuncDecl),
    Enum(EnumDecl),
    Attr(AttrDecl),
    Decl(VarDecl),
}

impl Item {
    pub fn kind(&self) -> NodeKind {
        match self {
            Item::Import(_) => NodeKind::Import,
            Item::Library(_) => NodeKind::Library,
            Item::Module(_) => NodeKind::Module,
            Item::Arch(_) => NodeKind::Arch,
            Item::Struct(_) => NodeKind::Struct,
            Item::Interface(_) => NodeKind::Interface,
            Item::Trait(_) => NodeKind::Trait,
            Item::Impl(_) => NodeKind::Impl,
            Item::Func(_) => NodeKind::Func,
            Item::Task(_) => NodeKind::Task,
            Item::Enum(_) => NodeKind::Enum,
            Item::Attr(_) => NodeKind::Attr,
            Item::Decl(_) => NodeKind::Decl,
        }
    }
}

/// Dotted type or library path, or the `Self` placeholder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeName {
    Path(Vec<String>),
    SelfType,
}

impl TypeName {
    pub fn simple(name: impl Into<String>) -> Self {
        TypeName::Path(vec![name.into()])
    }

    pub fn is_self(&self) -> bool {
        matches!(self, TypeName::SelfType)
    }

    /// Last path segment, or `Self`
    pub fn last(&self) -> &str {
        match self {
            TypeName::Path(segments) => segments.last().map(String::as_str).unwrap_or(""),
            TypeName::SelfType => "Self",
        }
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeName::Path(segments) => f.write_str(&segments.join(".")),
            TypeName::SelfType => f.write_str("Self"),
        }
    }
}

/// A type use: name, generic arguments and pointer-style dimension count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: TypeName,
    pub generics: Vec<TypeRef>,
    /// Number of unsized dimensions (`int*` is one)
    pub dim: usize,
}

impl TypeRef {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: TypeName::simple(name),
            generics: Vec::new(),
            dim: 0,
        }
    }
}

/// Generic parameter declaration: `T(Bound + Other) = Default`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericParam {
    pub name: String,
    /// Traits the argument must implement
    pub bounds: Vec<TypeName>,
    pub default: Option<TypeRef>,
    pub line: usize,
}

/// `import a.b.c as name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub comments: Vec<String>,
    pub path: Vec<String>,
    pub alias: Option<String>,
    pub line: usize,
}

impl ImportDecl {
    /// Name the import binds in the importing scope
    pub fn name(&self) -> &str {
        match &self.alias {
            Some(alias) => alias,
            None => self.path.last().map(String::as_str).unwrap_or(""),
        }
    }

    /// Dotted import key
    pub fn key(&self) -> String {
        self.path.join(".")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryDecl {
    pub comments: Vec<String>,
    pub name: String,
    pub items: Vec<Item>,
    pub line: usize,
}

/// Module with its generics, ports and an optional nested architecture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDecl {
    pub comments: Vec<String>,
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub blackbox: bool,
    /// Declarations in the `generics:` block
    pub generic_decls: Vec<VarDecl>,
    /// Declarations in the `ports:` block
    pub ports: Vec<VarDecl>,
    /// Architecture declared inside the module body
    pub arch: Option<ArchDecl>,
    pub line: usize,
}

/// Architecture body: optional declarations followed by logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchDecl {
    pub comments: Vec<String>,
    pub name: String,
    pub generics: Vec<GenericParam>,
    /// Module the architecture implements, when named
    pub module: Option<String>,
    pub module_generics: Vec<TypeRef>,
    pub declare_block: Vec<VarDecl>,
    pub logic_block: LogicBlock,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LogicBlock {
    pub comments: Vec<String>,
    pub statements: Vec<Statement>,
}

/// Struct or interface: config parameters plus fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub comments: Vec<String>,
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub params: Vec<ParamDecl>,
    pub fields: Vec<VarDecl>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraitDecl {
    pub comments: Vec<String>,
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub items: Vec<Item>,
    pub line: usize,
}

/// Inherent (`impl T:`) or trait (`impl Tr for T:`) implementation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplDecl {
    pub comments: Vec<String>,
    pub generics: Vec<GenericParam>,
    pub target: TypeName,
    pub target_generics: Vec<TypeRef>,
    pub trait_name: Option<TypeName>,
    pub trait_generics: Vec<TypeRef>,
    pub items: Vec<Item>,
    pub line: usize,
}

impl ImplDecl {
    pub fn is_trait_impl(&self) -> bool {
        self.trait_name.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuncKind {
    Func,
    Task,
}

/// Function or task. `body` is `None` for a signature-only declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub comments: Vec<String>,
    pub kind: FuncKind,
    /// Identifier or operator the function is named by
    pub name: String,
    pub generics: Vec<GenericParam>,
    pub params: Vec<ParamDecl>,
    pub returns: Vec<TypeRef>,
    pub body: Option<FuncBody>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncBody {
    pub declare_block: Vec<VarDecl>,
    pub logic_block: LogicBlock,
}

/// Function, task or struct parameter: `TYPE<...>** name = default`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub ty: TypeRef,
    pub name: String,
    pub is_self: bool,
    pub default: Option<Expr>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub comments: Vec<String>,
    pub name: String,
    pub states: Vec<String>,
    pub line: usize,
}

/// `attr(name = value, ...) for Target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrDecl {
    pub comments: Vec<String>,
    pub specs: Vec<AttrSpec>,
    pub target: TypeName,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttrSpec {
    pub name: String,
    pub value: Expr,
}

/// Where a declaration appears, which decides its defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclKind {
    Signal,
    Const,
    Generic,
    Port,
    Field,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortDirection {
    In,
    Out,
    Inout,
    Buffer,
    Master,
    Slave,
}

impl PortDirection {
    pub fn from_keyword(text: &str) -> Option<Self> {
        match text {
            "in" => Some(PortDirection::In),
            "out" => Some(PortDirection::Out),
            "inout" => Some(PortDirection::Inout),
            "buffer" => Some(PortDirection::Buffer),
            "master" => Some(PortDirection::Master),
            "slave" => Some(PortDirection::Slave),
            _ => None,
        }
    }

    /// Whether the owning module drives this port
    pub fn is_output(self) -> bool {
        !matches!(self, PortDirection::In)
    }
}

/// Signal, constant, generic, port or field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub comments: Vec<String>,
    pub kind: DeclKind,
    pub is_const: bool,
    pub ty: TypeName,
    pub generics: Vec<TypeRef>,
    /// Type configuration arguments, e.g. `uint(8)`
    pub args: Vec<Expr>,
    /// Declared dimensions, outermost first. Empty for a scalar.
    pub array: Vec<Index>,
    pub direction: Option<PortDirection>,
    pub name: String,
    pub value: Option<Expr>,
    pub line: usize,
}

/// One dimension of an index or range.
///
/// A single index `[i]` addresses the range `i..=i` and removes one dimension
/// from the value it selects; a slice keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Index {
    Single(Expr),
    Slice(Expr, Expr),
}

impl Index {
    /// Literal bounds once both ends have been folded to integers
    pub fn bounds(&self) -> Option<(i64, i64)> {
        match self {
            Index::Single(expr) => expr.const_int().map(|v| (v, v)),
            Index::Slice(left, right) => Some((left.const_int()?, right.const_int()?)),
        }
    }

    pub fn is_single(&self) -> bool {
        matches!(self, Index::Single(_))
    }
}

/// Statements of logic, process and function bodies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    Assign(Assignment),
    Decl(VarDecl),
    ModuleInst(ModuleInst),
    Process(Process),
    For(ForLoop),
    If(IfStmt),
    Case(CaseStmt),
    Rename(Rename),
    Assert(Assert),
    Report(Report),
    Return(Return),
    Call(CallStmt),
}

impl Statement {
    pub fn kind(&self) -> NodeKind {
        match self {
            Statement::Assign(assign) => assign.op.kind(),
            Statement::Decl(_) => NodeKind::Decl,
            Statement::ModuleInst(_) => NodeKind::ModuleInst,
            Statement::Process(process) => match process.kind {
                ProcessKind::Spro => NodeKind::Spro,
                ProcessKind::Apro => NodeKind::Apro,
                ProcessKind::Pro => NodeKind::Pro,
            },
            Statement::For(_) => NodeKind::For,
            Statement::If(_) => NodeKind::If,
            Statement::Case(_) => NodeKind::Case,
            Statement::Rename(_) => NodeKind::Rename,
            Statement::Assert(_) => NodeKind::Assert,
            Statement::Report(_) => NodeKind::Report,
            Statement::Return(_) => NodeKind::Return,
            Statement::Call(_) => NodeKind::Call,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    Increment,
    Decrement,
}

impl AssignOp {
    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "=" => Some(AssignOp::Assign),
            "+=" => Some(AssignOp::AddAssign),
            "-=" => Some(AssignOp::SubAssign),
            "*=" => Some(AssignOp::MulAssign),
            "/=" => Some(AssignOp::DivAssign),
            "&=" => Some(AssignOp::AndAssign),
            "|=" => Some(AssignOp::OrAssign),
            "^=" => Some(AssignOp::XorAssign),
            "++" => Some(AssignOp::Increment),
            "--" => Some(AssignOp::Decrement),
            _ => None,
        }
    }

    pub fn kind(self) -> NodeKind {
        match self {
            AssignOp::Assign => NodeKind::Assign,
            AssignOp::AddAssign | AssignOp::SubAssign | AssignOp::MulAssign | AssignOp::DivAssign => {
                NodeKind::ArithAssign
            }
            AssignOp::AndAssign | AssignOp::OrAssign | AssignOp::XorAssign => NodeKind::LogicalAssign,
            AssignOp::Increment | AssignOp::Decrement => NodeKind::PostOp,
        }
    }

    /// Binary operator a compound assignment applies
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign | AssignOp::Increment => Some(BinaryOp::Add),
            AssignOp::SubAssign | AssignOp::Decrement => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
            AssignOp::AndAssign => Some(BinaryOp::And),
            AssignOp::OrAssign => Some(BinaryOp::Or),
            AssignOp::XorAssign => Some(BinaryOp::Xor),
        }
    }
}

/// `target op value`. Post-increment carries an implicit value of 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub comments: Vec<String>,
    pub target: AssignTarget,
    pub op: AssignOp,
    pub value: Expr,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AssignTarget {
    Var(VarRef),
    Tuple(Vec<VarRef>),
}

impl AssignTarget {
    pub fn vars(&self) -> Vec<&VarRef> {
        match self {
            AssignTarget::Var(var) => vec![var],
            AssignTarget::Tuple(vars) => vars.iter().collect(),
        }
    }
}

/// `inst Module<...>(arch):` with generic and port connections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleInst {
    pub comments: Vec<String>,
    pub name: String,
    pub module: TypeName,
    pub generics: Vec<TypeRef>,
    pub arch: Option<String>,
    pub blackbox: bool,
    pub generic_assigns: Vec<Connection>,
    pub port_assigns: Vec<Connection>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub target: String,
    pub value: Expr,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessKind {
    /// Synchronous process on a clock and reset
    Spro,
    /// Asynchronous-reset process
    Apro,
    /// Process with a free sensitivity list
    Pro,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    pub comments: Vec<String>,
    pub kind: ProcessKind,
    pub args: Vec<Expr>,
    pub statements: Vec<Statement>,
    pub line: usize,
}

/// `for var in [lo:hi]:`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForLoop {
    pub comments: Vec<String>,
    pub var: String,
    pub range: Index,
    pub statements: Vec<Statement>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub comments: Vec<String>,
    /// `if` followed by each `elif`
    pub branches: Vec<CondBranch>,
    pub else_branch: Option<Vec<Statement>>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CondBranch {
    pub cond: Expr,
    pub statements: Vec<Statement>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStmt {
    pub comments: Vec<String>,
    pub selector: Expr,
    pub arms: Vec<CaseArm>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseArm {
    pub choices: Vec<Choice>,
    pub statements: Vec<Statement>,
    pub line: usize,
}

/// Case arm or aggregate element selector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Choice {
    Others,
    Index(Index),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rename {
    pub comments: Vec<String>,
    pub target: VarRef,
    pub value: Expr,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assert {
    pub comments: Vec<String>,
    pub cond: Expr,
    pub report: Report,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Print,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub comments: Vec<String>,
    pub severity: Severity,
    pub message: Expr,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Return {
    pub comments: Vec<String>,
    pub values: Vec<Expr>,
    pub line: usize,
}

/// Function, task or method call used as a statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStmt {
    pub comments: Vec<String>,
    pub call: Expr,
    pub line: usize,
}

/// Expressions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Const(Literal),
    /// Bit string, one constant per bit
    Array(Vec<Literal>),
    Aggregate(Vec<Element>),
    Var(VarRef),
    Call(FuncCall),
    Binary(BinaryExpr),
    Unary(UnaryExpr),
    /// Value with a trailing unit name, e.g. `10 ns`
    Units(Box<Expr>, String),
}

impl Expr {
    pub fn kind(&self) -> NodeKind {
        match self {
            Expr::Const(_) => NodeKind::Const,
            Expr::Array(_) => NodeKind::Array,
            Expr::Aggregate(_) => NodeKind::Aggregate,
            Expr::Var(_) => NodeKind::Var,
            Expr::Call(_) => NodeKind::FuncCall,
            Expr::Binary(binary) if binary.op == BinaryOp::Concat => NodeKind::Cat,
            Expr::Binary(_) | Expr::Unary(_) => NodeKind::Expr,
            Expr::Units(..) => NodeKind::Units,
        }
    }

    pub fn int(value: i64) -> Self {
        Expr::Const(Literal::int(value))
    }

    /// Value of a constant node, bit strings merged into one vector
    pub fn const_value(&self) -> Option<ConstValue> {
        match self {
            Expr::Const(literal) => Some(literal.value.clone()),
            Expr::Array(bits) => {
                let mut merged = Vec::with_capacity(bits.len());
                for bit in bits {
                    match &bit.value {
                        ConstValue::Bit(b) => merged.extend_from_slice(b),
                        _ => return None,
                    }
                }
                Some(ConstValue::Bit(merged))
            }
            _ => None,
        }
    }

    pub fn const_int(&self) -> Option<i64> {
        match self {
            Expr::Const(literal) => literal.value.as_int(),
            _ => None,
        }
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            Expr::Var(var) => Some(var.line),
            Expr::Call(call) => Some(call.line),
            Expr::Binary(binary) => Some(binary.line),
            Expr::Unary(unary) => Some(unary.line),
            Expr::Units(inner, _) => inner.line(),
            Expr::Const(_) | Expr::Array(_) | Expr::Aggregate(_) => None,
        }
    }
}

/// `choice | choice => value`, or a positional value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub choices: Vec<Choice>,
    pub value: Expr,
}

/// Reference to a signal, parameter, state or library member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarRef {
    pub name: String,
    pub is_self: bool,
    pub index: Vec<Index>,
    pub member: Option<Member>,
    pub line: usize,
}

impl VarRef {
    pub fn named(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            is_self: false,
            index: Vec::new(),
            member: None,
            line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Member {
    Field(Box<VarRef>),
    Method(FuncCall),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncCall {
    pub name: String,
    pub generics: Vec<TypeRef>,
    pub args: Vec<Expr>,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Xor,
    Nand,
    Nor,
    Xnor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Concat,
    Mul,
    Div,
    Mod,
    Rem,
    Pow,
}

impl BinaryOp {
    pub fn from_token(text: &str) -> Option<Self> {
        match text {
            "or" => Some(BinaryOp::Or),
            "and" => Some(BinaryOp::And),
            "xor" => Some(BinaryOp::Xor),
            "nand" => Some(BinaryOp::Nand),
            "nor" => Some(BinaryOp::Nor),
            "xnor" => Some(BinaryOp::Xnor),
            "==" => Some(BinaryOp::Eq),
            "!=" => Some(BinaryOp::Ne),
            "<" => Some(BinaryOp::Lt),
            "<=" => Some(BinaryOp::Le),
            ">" => Some(BinaryOp::Gt),
            ">=" => Some(BinaryOp::Ge),
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Sub),
            "&" => Some(BinaryOp::Concat),
            "*" => Some(BinaryOp::Mul),
            "/" => Some(BinaryOp::Div),
            "mod" => Some(BinaryOp::Mod),
            "rem" => Some(BinaryOp::Rem),
            "**" => Some(BinaryOp::Pow),
            _ => None,
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(
            self,
            BinaryOp::Or | BinaryOp::And | BinaryOp::Xor | BinaryOp::Nand | BinaryOp::Nor | BinaryOp::Xnor
        )
    }

    pub fn is_relation(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Xor => "xor",
            BinaryOp::Nand => "nand",
            BinaryOp::Nor => "nor",
            BinaryOp::Xnor => "xnor",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Concat => "&",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "mod",
            BinaryOp::Rem => "rem",
            BinaryOp::Pow => "**",
        }
    }
}

/// Binary `EXPR`/`CAT` node with its two operands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Box<Expr>,
    pub rhs: Box<Expr>,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub line: usize,
}
