//! Nested symbol table
//!
//! Scopes live in an arena keyed by [`ScopeId`] and chain to their parent;
//! symbols live in a flat arena keyed by [`SymbolId`]. A scope maps names to
//! symbol ids, so one symbol may be bound under several names (overload keys,
//! trait default methods).

use crate::symbols::{Symbol, SymbolId, SymbolKind};
use indexmap::IndexMap;
use log::trace;
use std::collections::HashMap;

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ScopeId(pub u32);

/// Context flags inherited by child scopes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeFlags {
    pub inside_impl: bool,
    pub inside_trait: bool,
    pub inside_module: bool,
}

/// A single scope containing names and their bindings
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub name: String,
    /// Parent level plus one; used for diagnostics only
    pub level: usize,
    pub parent: Option<ScopeId>,
    pub flags: ScopeFlags,
    /// Type that `Self` stands for inside this scope
    pub self_type: Option<SymbolId>,
    entries: IndexMap<String, SymbolId>,
}

impl Scope {
    fn new(id: ScopeId, name: String, parent: Option<&Scope>) -> Self {
        Self {
            id,
            name,
            level: parent.map_or(0, |p| p.level + 1),
            parent: parent.map(|p| p.id),
            flags: parent.map(|p| p.flags).unwrap_or_default(),
            self_type: parent.and_then(|p| p.self_type),
            entries: IndexMap::new(),
        }
    }

    /// Lookup a name in this scope (not parent)
    pub fn lookup_local(&self, name: &str) -> Option<SymbolId> {
        self.entries.get(name).copied()
    }

    /// Bindings in insertion order
    pub fn entries(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which symbol kinds a lookup accepts
#[derive(Debug, Clone, Copy)]
pub enum KindFilter<'a> {
    Any,
    One(SymbolKind),
    Set(&'a [SymbolKind]),
}

impl KindFilter<'_> {
    pub fn accepts(&self, kind: SymbolKind) -> bool {
        match self {
            KindFilter::Any => true,
            KindFilter::One(k) => *k == kind,
            KindFilter::Set(kinds) => kinds.contains(&kind),
        }
    }
}

impl From<SymbolKind> for KindFilter<'static> {
    fn from(kind: SymbolKind) -> Self {
        KindFilter::One(kind)
    }
}

/// Tree of scopes plus the symbols they bind
#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: HashMap<ScopeId, Scope>,
    symbols: Vec<Symbol>,
    root: ScopeId,
    next_id: u32,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let root = ScopeId(0);
        let mut scopes = HashMap::new();
        scopes.insert(root, Scope::new(root, "global".to_string(), None));

        Self {
            scopes,
            symbols: Vec::new(),
            root,
            next_id: 1,
        }
    }

    /// Get root scope
    pub fn root(&self) -> ScopeId {
        self.root
    }

    /// Create a child scope inheriting the parent's flags and `Self` binding
    pub fn create_scope(&mut self, parent: ScopeId, name: impl Into<String>) -> ScopeId {
        let id = ScopeId(self.next_id);
        self.next_id += 1;

        let scope = Scope::new(id, name.into(), self.scopes.get(&parent));
        trace!("scope {} '{}' at level {}", id.0, scope.name, scope.level);
        self.scopes.insert(id, scope);
        id
    }

    pub fn get(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(&id)
    }

    pub fn get_mut(&mut self, id: ScopeId) -> Option<&mut Scope> {
        self.scopes.get_mut(&id)
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Store a symbol and bind it under its own name.
    ///
    /// Returns `None` when the name is already bound in `scope`; shadowing
    /// names of enclosing scopes is allowed.
    pub fn insert(&mut self, scope: ScopeId, symbol: Symbol) -> Option<SymbolId> {
        if self.lookup_local(scope, &symbol.name).is_some() {
            return None;
        }
        let name = symbol.name.clone();
        let id = self.add(symbol);
        self.bind(scope, &name, id).then_some(id)
    }

    /// Store a symbol without binding it to any name
    pub fn add(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(symbol);
        id
    }

    /// Bind an existing symbol under `name`; false on a duplicate
    pub fn bind(&mut self, scope: ScopeId, name: &str, id: SymbolId) -> bool {
        let Some(target) = self.scopes.get_mut(&scope) else {
            return false;
        };
        if target.entries.contains_key(name) {
            return false;
        }
        trace!("bind '{}' in scope {} ({})", name, scope.0, self.symbols[id.0 as usize].kind);
        target.entries.insert(name.to_string(), id);
        true
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes.get(&scope)?.lookup_local(name)
    }

    /// Lookup `name` starting at `scope`.
    ///
    /// A binding whose kind the filter rejects is skipped; the search then
    /// continues in the parent only when `recursive` is set.
    pub fn lookup(
        &self,
        scope: ScopeId,
        name: &str,
        filter: KindFilter<'_>,
        recursive: bool,
    ) -> Option<SymbolId> {
        let mut current = Some(scope);

        while let Some(scope_id) = current {
            let scope = self.scopes.get(&scope_id)?;
            if let Some(id) = scope.lookup_local(name) {
                if filter.accepts(self.symbol(id).kind) {
                    return Some(id);
                }
            }
            if !recursive {
                break;
            }
            current = scope.parent;
        }

        None
    }

    /// Every binding visible from `scope` whose name satisfies `pred`,
    /// nearest scope first
    pub fn find<F>(&self, scope: ScopeId, mut pred: F) -> Vec<(String, SymbolId)>
    where
        F: FnMut(&str, &Symbol) -> bool,
    {
        let mut found = Vec::new();
        let mut current = Some(scope);
        while let Some(scope_id) = current {
            let Some(scope) = self.scopes.get(&scope_id) else {
                break;
            };
            for (name, id) in scope.entries() {
                if pred(name, self.symbol(id)) {
                    found.push((name.to_string(), id));
                }
            }
            current = scope.parent;
        }
        found
    }

    /// Re-parent `scope`, returning the previous parent
    pub fn replace_parent(&mut self, scope: ScopeId, parent: Option<ScopeId>) -> Option<ScopeId> {
        let target = self.scopes.get_mut(&scope)?;
        std::mem::replace(&mut target.parent, parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalSymbol;

    fn signal(name: &str) -> Symbol {
        Symbol::signal(SignalSymbol::new(name, "bit"), 1)
    }

    #[test]
    fn test_symbol_table_creation() {
        let table = SymbolTable::new();
        assert_eq!(table.root(), ScopeId(0));
        assert_eq!(table.get(table.root()).map(|s| s.name.as_str()), Some("global"));
    }

    #[test]
    fn test_create_child_scope() {
        let mut table = SymbolTable::new();
        let child = table.create_scope(table.root(), "M");

        assert_eq!(child, ScopeId(1));
        let scope = table.get(child).unwrap();
        assert_eq!(scope.parent, Some(table.root()));
        assert_eq!(scope.level, 1);
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut table = SymbolTable::new();
        let root = table.root();

        assert!(table.insert(root, signal("x")).is_some());
        assert!(table.insert(root, signal("x")).is_none());

        let child = table.create_scope(root, "inner");
        assert!(table.insert(child, signal("x")).is_some());
    }

    #[test]
    fn test_lookup_in_parent_scope() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let child = table.create_scope(root, "inner");
        let id = table.insert(root, signal("x")).unwrap();

        assert_eq!(table.lookup(child, "x", KindFilter::Any, true), Some(id));
        assert_eq!(table.lookup(child, "x", KindFilter::Any, false), None);
        assert_eq!(table.lookup(child, "y", KindFilter::Any, true), None);
    }

    #[test]
    fn test_kind_mismatch_continues_outward() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let ty = table
            .insert(root, Symbol::new("T", SymbolKind::Type, 1))
            .unwrap();
        let child = table.create_scope(root, "inner");
        table.insert(child, signal("T")).unwrap();

        assert_eq!(table.lookup(child, "T", SymbolKind::Type.into(), true), Some(ty));
        assert_eq!(table.lookup(child, "T", SymbolKind::Type.into(), false), None);
        assert_eq!(
            table.lookup(
                child,
                "T",
                KindFilter::Set(&[SymbolKind::Generic, SymbolKind::Type]),
                true
            ),
            Some(ty)
        );
    }

    #[test]
    fn test_aliases_share_one_symbol() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let id = table.add(Symbol::new("f", SymbolKind::Function, 1));

        assert!(table.bind(root, "f_int0", id));
        assert!(table.bind(root, "f_int0_int0", id));
        assert!(!table.bind(root, "f_int0", id));
        assert_eq!(table.lookup_local(root, "f_int0"), table.lookup_local(root, "f_int0_int0"));
        assert_eq!(table.find(root, |name, _| name.starts_with("f_")).len(), 2);
    }

    #[test]
    fn test_flags_inherited_and_parent_replaced() {
        let mut table = SymbolTable::new();
        let root = table.root();
        let impl_scope = table.create_scope(root, "impl");
        table.get_mut(impl_scope).unwrap().flags.inside_impl = true;

        let body = table.create_scope(impl_scope, "body");
        assert!(table.get(body).unwrap().flags.inside_impl);

        let other = table.create_scope(root, "other");
        let previous = table.replace_parent(body, Some(other));
        assert_eq!(previous, Some(impl_scope));
        assert_eq!(table.get(body).unwrap().parent, Some(other));
    }
}
