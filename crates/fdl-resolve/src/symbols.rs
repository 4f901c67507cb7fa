//! Symbols stored in the symbol table
//!
//! A [`Symbol`] is a plain record. Kinds that own members (types, traits,
//! functions, modules, libraries) point at a nested scope in the
//! [`SymbolTable`](crate::SymbolTable); parameter and field lists are owned
//! directly.

use crate::params::{ParamList, ParamSymbol, TypeSig};
use crate::signal::SignalSymbol;
use crate::table::ScopeId;
use fdl_frontend::ConstValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Library,
    /// Builtin, struct or interface type
    Type,
    /// Generic type parameter
    Generic,
    Trait,
    Function,
    Task,
    Attr,
    Module,
    Arch,
    /// Port, signal, constant or generic value
    Signal,
    /// Function or task parameter
    Param,
    /// Enum state
    State,
    /// Module instance
    Instance,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Library => "library",
            SymbolKind::Type => "type",
            SymbolKind::Generic => "generic",
            SymbolKind::Trait => "trait",
            SymbolKind::Function => "function",
            SymbolKind::Task => "task",
            SymbolKind::Attr => "attribute",
            SymbolKind::Module => "module",
            SymbolKind::Arch => "architecture",
            SymbolKind::Signal => "signal",
            SymbolKind::Param => "parameter",
            SymbolKind::State => "enum state",
            SymbolKind::Instance => "instance",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolFlags {
    pub is_parameter: bool,
    pub is_imported: bool,
    pub is_referenced: bool,
    /// Declared with generics; instantiated per use
    pub is_template: bool,
}

/// One field of a struct or interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub type_name: String,
    pub dim: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeInfo {
    pub builtin: bool,
    pub is_interface: bool,
    /// Traits implemented for this type
    pub traits: Vec<String>,
    /// States when the type is an enum
    pub enum_states: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenericInfo {
    /// Traits the argument must implement
    pub bounds: Vec<String>,
    pub default: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuncInfo {
    /// Declared name before overload mangling
    pub base_name: String,
    pub returns: Vec<TypeSig>,
    pub has_body: bool,
    pub builtin: bool,
    /// Names this function is bound under in its enclosing scope
    pub overload_keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleInfo {
    pub blackbox: bool,
    pub archs: Vec<String>,
}

/// Kind-specific state of a symbol
#[derive(Debug, Clone, Default, PartialEq)]
pub enum SymbolDetail {
    #[default]
    None,
    Type(TypeInfo),
    Generic(GenericInfo),
    Function(FuncInfo),
    Module(ModuleInfo),
    Arch { module: String },
    Signal(Box<SignalSymbol>),
    Param(ParamSymbol),
    /// Value type of a builtin attribute
    Attr { type_name: String },
    State { enum_type: String },
    Instance { module: String, arch: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub line: usize,
    pub flags: SymbolFlags,
    /// Nested scope holding this symbol's members
    pub scope: Option<ScopeId>,
    pub params: Option<ParamList>,
    pub fields: Option<Vec<Field>>,
    /// Attribute values attached by `attr(...) for` items
    pub attrs: IndexMap<String, ConstValue>,
    pub detail: SymbolDetail,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, line: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            line,
            flags: SymbolFlags::default(),
            scope: None,
            params: None,
            fields: None,
            attrs: IndexMap::new(),
            detail: SymbolDetail::None,
        }
    }

    pub fn signal(signal: SignalSymbol, line: usize) -> Self {
        let mut symbol = Self::new(signal.name.clone(), SymbolKind::Signal, line);
        symbol.detail = SymbolDetail::Signal(Box::new(signal));
        symbol
    }

    pub fn with_scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_params(mut self, params: ParamList) -> Self {
        self.params = Some(params);
        self
    }

    pub fn with_detail(mut self, detail: SymbolDetail) -> Self {
        self.detail = detail;
        self
    }

    pub fn as_signal(&self) -> Option<&SignalSymbol> {
        match &self.detail {
            SymbolDetail::Signal(signal) => Some(signal),
            _ => None,
        }
    }

    pub fn as_signal_mut(&mut self) -> Option<&mut SignalSymbol> {
        match &mut self.detail {
            SymbolDetail::Signal(signal) => Some(signal),
            _ => None,
        }
    }

    pub fn as_param(&self) -> Option<&ParamSymbol> {
        match &self.detail {
            SymbolDetail::Param(param) => Some(param),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeInfo> {
        match &self.detail {
            SymbolDetail::Type(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_type_mut(&mut self) -> Option<&mut TypeInfo> {
        match &mut self.detail {
            SymbolDetail::Type(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FuncInfo> {
        match &self.detail {
            SymbolDetail::Function(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_function_mut(&mut self) -> Option<&mut FuncInfo> {
        match &mut self.detail {
            SymbolDetail::Function(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleInfo> {
        match &self.detail {
            SymbolDetail::Module(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_module_mut(&mut self) -> Option<&mut ModuleInfo> {
        match &mut self.detail {
            SymbolDetail::Module(info) => Some(info),
            _ => None,
        }
    }

    pub fn as_generic(&self) -> Option<&GenericInfo> {
        match &self.detail {
            SymbolDetail::Generic(info) => Some(info),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self.kind, SymbolKind::Function | SymbolKind::Task)
    }

    /// Field by name, for structs and interfaces
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.as_ref()?.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_symbol_accessors() {
        let symbol = Symbol::signal(SignalSymbol::new("x", "int"), 3);
        assert_eq!(symbol.name, "x");
        assert_eq!(symbol.kind, SymbolKind::Signal);
        assert_eq!(symbol.as_signal().map(|s| s.type_dim()), Some(0));
        assert!(symbol.as_function().is_none());
    }

    #[test]
    fn test_struct_fields() {
        let mut symbol = Symbol::new("Word", SymbolKind::Type, 1);
        symbol.fields = Some(vec![Field {
            name: "data".to_string(),
            type_name: "bit".to_string(),
            dim: 1,
        }]);
        assert_eq!(symbol.field("data").map(|f| f.dim), Some(1));
        assert!(symbol.field("valid").is_none());
    }
}
