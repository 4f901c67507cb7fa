//! FDL symbol resolution model
//!
//! This crate provides the data the semantic analyzer populates:
//! - A nested, chained-scope symbol table with kind-filtered lookup
//! - Symbols for types, traits, functions, modules and signals
//! - Parameter binding and overload key generation
//! - Bit-exact signal array tracking (bounds, init and driver coverage)

pub mod error;
pub mod params;
pub mod signal;
pub mod symbols;
pub mod table;

pub use error::{SymbolError, SymbolResult};
pub use params::{
    is_integer_type, mangle, overload_key, types_compatible, ArgSig, ParamList, ParamSymbol,
    TypeSig,
};
pub use signal::{Dimension, SignalSymbol, MAX_CELLS};
pub use symbols::{
    Field, FuncInfo, GenericInfo, ModuleInfo, Symbol, SymbolDetail, SymbolFlags, SymbolId,
    SymbolKind, TypeInfo,
};
pub use table::{KindFilter, Scope, ScopeFlags, ScopeId, SymbolTable};
