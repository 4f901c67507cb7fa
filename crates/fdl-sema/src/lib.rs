//! FDL Semantic Analysis
//!
//! This crate checks parsed FDL sources and fills the symbol table:
//! - Import resolution against project search paths
//! - Name, type and arity checking with overload resolution
//! - Constant folding of bounds, generics and builtin calls
//! - Driver conflict detection on signal arrays

pub mod analyzer;
pub mod builtins;
pub mod const_eval;
pub mod error;
pub mod module_resolver;

pub use analyzer::{Analyzer, Dependency, ExprInfo};
pub use builtins::{BuiltinAttr, BuiltinCatalog, BuiltinFunction, BuiltinParam, BuiltinType};
pub use const_eval::{eval_binary, eval_builtin, eval_unary, EvalError};
pub use error::{ErrorKind, SemaError, SemaResult};
pub use module_resolver::{ModuleResolver, ProjectManifest, ResolveError};
