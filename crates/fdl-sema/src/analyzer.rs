//! Semantic analyzer
//!
//! Walks each [`SourceFile`] and populates a [`SymbolTable`]:
//! - name resolution through chained scopes, including dotted library paths
//! - type checking of declarations, assignments, calls and returns
//! - overload key synthesis and call resolution
//! - generic bound and trait implementation checks
//! - signal array shaping and per-cell init/driver coverage
//!
//! Imports are handled in two passes. [`Analyzer::pre_process`] resolves a
//! file's imports to paths so the caller can read and parse them; the main
//! pass analyzes an imported library the first time an `import` names it.

use crate::builtins::{param_list, BuiltinCatalog};
use crate::const_eval::{eval_binary, eval_builtin, eval_unary, EvalError};
use crate::error::{SemaError, SemaResult};
use crate::module_resolver::{ModuleResolver, ResolveError};
use fdl_frontend::ast::*;
use fdl_frontend::ConstValue;
use fdl_resolve::{
    is_integer_type, overload_key, types_compatible, ArgSig, Field, FuncInfo, GenericInfo,
    KindFilter, ModuleInfo, ParamList, ParamSymbol, ScopeFlags, ScopeId, SignalSymbol, Symbol,
    SymbolDetail, SymbolError, SymbolId, SymbolKind, SymbolTable, TypeInfo, TypeSig,
};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const TYPE_KINDS: &[SymbolKind] = &[SymbolKind::Type, SymbolKind::Generic];
const CALLABLE_KINDS: &[SymbolKind] = &[SymbolKind::Function, SymbolKind::Task];
const VALUE_KINDS: &[SymbolKind] = &[
    SymbolKind::Signal,
    SymbolKind::Param,
    SymbolKind::State,
    SymbolKind::Library,
    SymbolKind::Instance,
];
const TARGET_KINDS: &[SymbolKind] = &[SymbolKind::Signal, SymbolKind::Param, SymbolKind::Library];
const CONTAINER_KINDS: &[SymbolKind] = &[
    SymbolKind::Library,
    SymbolKind::Module,
    SymbolKind::Type,
    SymbolKind::Trait,
];

/// An import resolved to a file that still has to be read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub key: String,
    pub path: PathBuf,
    pub line: usize,
}

/// Type and value facts about an analyzed expression
#[derive(Debug, Clone, PartialEq)]
pub struct ExprInfo {
    pub sig: TypeSig,
    /// Folded value, when known at compile time
    pub value: Option<ConstValue>,
    pub is_const: bool,
    /// Symbol read when the expression is a plain variable
    pub symbol: Option<SymbolId>,
    /// Types of a multi-value call result
    pub parts: Vec<TypeSig>,
}

impl ExprInfo {
    fn new(sig: TypeSig) -> Self {
        Self {
            sig,
            value: None,
            is_const: false,
            symbol: None,
            parts: Vec::new(),
        }
    }

    fn constant(sig: TypeSig, value: ConstValue) -> Self {
        Self {
            value: Some(value),
            is_const: true,
            ..Self::new(sig)
        }
    }

    fn arg(&self) -> ArgSig {
        ArgSig {
            sig: self.sig.clone(),
            value: self.value.clone(),
        }
    }
}

#[derive(Debug)]
struct LibraryUnit {
    path: PathBuf,
    ast: Option<SourceFile>,
    scope: Option<ScopeId>,
    resolving: bool,
}

#[derive(Debug)]
struct FuncContext {
    owner: String,
    returns: Vec<TypeSig>,
}

/// Cells one statement drives
#[derive(Debug)]
struct DriveTarget {
    symbol: SymbolId,
    cells: Vec<usize>,
    line: usize,
}

#[derive(Debug, Clone, Copy)]
enum Selection {
    Fixed(i64, i64),
    /// Indexed by a loop variable over this range
    Loop(i64, i64),
    Dynamic,
}

#[derive(Debug, Clone, Copy)]
struct IndexSel {
    selection: Selection,
    single: bool,
}

enum Bound {
    Const(i64),
    Loop(i64, i64),
    Dynamic,
}

struct Access {
    info: ExprInfo,
    /// Selected range per declared dimension
    bounds: Vec<(i64, i64)>,
}

#[derive(Debug)]
pub struct Analyzer {
    table: SymbolTable,
    resolver: ModuleResolver,
    current: ScopeId,
    libraries: IndexMap<String, LibraryUnit>,
    function: Option<FuncContext>,
    drivers: Option<Vec<DriveTarget>>,
    /// Line of the statement being analyzed
    line: usize,
}

impl Analyzer {
    /// Create an analyzer whose root scope holds the `catalog` builtins
    pub fn new(catalog: &BuiltinCatalog, resolver: ModuleResolver) -> SemaResult<Self> {
        let table = SymbolTable::new();
        let current = table.root();
        let mut analyzer = Self {
            table,
            resolver,
            current,
            libraries: IndexMap::new(),
            function: None,
            drivers: None,
            line: 0,
        };
        analyzer.seed_builtins(catalog)?;
        Ok(analyzer)
    }

    /// Analyzer over the standard builtin catalog
    pub fn standard(resolver: ModuleResolver) -> SemaResult<Self> {
        Self::new(&BuiltinCatalog::standard(), resolver)
    }

    fn seed_builtins(&mut self, catalog: &BuiltinCatalog) -> SemaResult<()> {
        let root = self.table.root();

        for ty in &catalog.types {
            let mut symbol = Symbol::new(&ty.name, SymbolKind::Type, 0).with_detail(
                SymbolDetail::Type(TypeInfo {
                    builtin: true,
                    ..TypeInfo::default()
                }),
            );
            if !ty.params.is_empty() {
                symbol.params = Some(param_list(&ty.name, &ty.params));
            }
            self.insert(symbol)?;
        }

        for func in &catalog.functions {
            let params = param_list(&func.name, &func.params);
            let keys = params
                .overload_keys(&func.name)
                .map_err(|error| SemaError::symbol(0, error))?;
            let symbol = Symbol::new(&func.name, SymbolKind::Function, 0)
                .with_params(params)
                .with_detail(SymbolDetail::Function(FuncInfo {
                    base_name: func.name.clone(),
                    returns: func.returns.clone(),
                    has_body: true,
                    builtin: true,
                    overload_keys: keys.clone(),
                }));
            let id = self.table.add(symbol);
            for key in &keys {
                if !self.table.bind(root, key, id) {
                    return Err(SemaError::Duplicate {
                        line: 0,
                        name: key.clone(),
                    });
                }
            }
        }

        for attr in &catalog.attrs {
            self.insert(
                Symbol::new(&attr.name, SymbolKind::Attr, 0).with_detail(SymbolDetail::Attr {
                    type_name: attr.type_name.clone(),
                }),
            )?;
        }

        debug!(
            "seeded {} builtin types, {} functions, {} attributes",
            catalog.types.len(),
            catalog.functions.len(),
            catalog.attrs.len()
        );
        Ok(())
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub fn into_table(self) -> SymbolTable {
        self.table
    }

    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    /// Scope an imported library was analyzed into
    pub fn library_scope(&self, key: &str) -> Option<ScopeId> {
        self.libraries.get(key)?.scope
    }

    /// Registered libraries with their source paths
    pub fn libraries(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.libraries
            .iter()
            .map(|(key, unit)| (key.as_str(), unit.path.as_path()))
    }

    /// Parsed source of a registered library
    pub fn library_ast(&self, key: &str) -> Option<&SourceFile> {
        self.libraries.get(key)?.ast.as_ref()
    }

    /// Resolve a dotted path (`M.A.s`) from the root scope without walking
    /// parents
    pub fn lookup(&self, path: &str) -> Option<SymbolId> {
        let mut scope = self.table.root();
        let mut found = None;
        for segment in path.split('.') {
            if let Some(id) = found {
                let symbol: &Symbol = self.table.symbol(id);
                scope = symbol.scope?;
            }
            found = Some(self.table.lookup_local(scope, segment)?);
        }
        found
    }

    /// Resolve the imports of `ast` that are not yet registered.
    ///
    /// Each returned dependency must be read, parsed and handed back with
    /// [`Analyzer::add_library`] before [`Analyzer::process`] runs.
    pub fn pre_process(&self, ast: &SourceFile) -> SemaResult<Vec<Dependency>> {
        let mut dependencies: Vec<Dependency> = Vec::new();
        for import in ast.imports() {
            let key = import.key();
            if self.libraries.contains_key(&key) || dependencies.iter().any(|d| d.key == key) {
                continue;
            }
            let path = self
                .resolver
                .resolve(&import.path)
                .map_err(|error| SemaError::Import {
                    line: import.line,
                    error,
                })?;
            debug!("{}: import '{}' -> {}", ast.name, key, path.display());
            dependencies.push(Dependency {
                key,
                path,
                line: import.line,
            });
        }
        Ok(dependencies)
    }

    /// Register the parsed source of an imported library
    pub fn add_library(&mut self, key: impl Into<String>, path: PathBuf, ast: SourceFile) {
        let key = key.into();
        debug!("registered library '{}' from {}", key, path.display());
        self.libraries.entry(key).or_insert(LibraryUnit {
            path,
            ast: Some(ast),
            scope: None,
            resolving: false,
        });
    }

    /// Analyze a root file into the global scope
    pub fn process(&mut self, ast: &mut SourceFile) -> SemaResult<()> {
        debug!("analyzing {}", ast.name);
        let root = self.table.root();
        self.with_scope(root, |this| this.visit_items(&mut ast.items))
    }

    /// Analyze several root files in order
    pub fn process_all(&mut self, files: &mut [SourceFile]) -> SemaResult<()> {
        for file in files.iter_mut() {
            self.process(file)?;
        }
        Ok(())
    }

    // Scope handling

    /// Run `f` with `scope` as the current scope, restoring the previous one
    /// on every exit path
    fn with_scope<T>(
        &mut self,
        scope: ScopeId,
        f: impl FnOnce(&mut Self) -> SemaResult<T>,
    ) -> SemaResult<T> {
        let saved = std::mem::replace(&mut self.current, scope);
        trace!("enter scope {}", scope.0);
        let result = f(self);
        trace!("leave scope {}", scope.0);
        self.current = saved;
        result
    }

    /// Run `f` inside `scope` while its parent is `parent` and it resolves
    /// `Self` to `self_type`; the original parent and flags are restored
    /// afterwards.
    fn with_impl_scope<T>(
        &mut self,
        scope: ScopeId,
        parent: ScopeId,
        self_type: SymbolId,
        f: impl FnOnce(&mut Self) -> SemaResult<T>,
    ) -> SemaResult<T> {
        let saved_parent = self.table.replace_parent(scope, Some(parent));
        let saved = self.table.get(scope).map(|s| (s.flags, s.self_type));
        if let Some(target) = self.table.get_mut(scope) {
            target.flags.inside_impl = true;
            target.self_type = Some(self_type);
        }

        let result = self.with_scope(scope, f);

        self.table.replace_parent(scope, saved_parent);
        if let (Some(target), Some((flags, self_type))) = (self.table.get_mut(scope), saved) {
            target.flags = flags;
            target.self_type = self_type;
        }
        result
    }

    fn flags(&self) -> ScopeFlags {
        self.table
            .get(self.current)
            .map(|s| s.flags)
            .unwrap_or_default()
    }

    fn insert(&mut self, symbol: Symbol) -> SemaResult<SymbolId> {
        let line = symbol.line;
        let name = symbol.name.clone();
        self.table
            .insert(self.current, symbol)
            .ok_or(SemaError::Duplicate { line, name })
    }

    fn scope_of(&self, id: SymbolId) -> SemaResult<ScopeId> {
        let symbol = self.table.symbol(id);
        symbol
            .scope
            .ok_or_else(|| SemaError::Internal(format!("{} '{}' has no scope", symbol.kind, symbol.name)))
    }

    /// Member scope of a type, created on first use for builtins
    fn type_scope(&mut self, id: SymbolId) -> ScopeId {
        if let Some(scope) = self.table.symbol(id).scope {
            return scope;
        }
        let name = self.table.symbol(id).name.clone();
        let root = self.table.root();
        let scope = self.table.create_scope(root, name);
        self.table.symbol_mut(id).scope = Some(scope);
        scope
    }

    // Name resolution

    fn resolve_path(
        &self,
        name: &TypeName,
        filter: KindFilter<'_>,
        what: &str,
        line: usize,
    ) -> SemaResult<SymbolId> {
        match name {
            TypeName::SelfType => {
                let scope = self.table.get(self.current);
                match scope {
                    Some(scope) if scope.flags.inside_impl || scope.flags.inside_trait => scope
                        .self_type
                        .ok_or_else(|| SemaError::not_found(line, what, "Self")),
                    _ => Err(SemaError::not_found(line, what, "Self")),
                }
            }
            TypeName::Path(segments) => self.resolve_segments(segments, filter, what, line),
        }
    }

    fn resolve_segments(
        &self,
        segments: &[String],
        filter: KindFilter<'_>,
        what: &str,
        line: usize,
    ) -> SemaResult<SymbolId> {
        let Some((last, prefix)) = segments.split_last() else {
            return Err(SemaError::Internal("empty name".to_string()));
        };

        let mut scope = self.current;
        let mut recursive = true;
        for segment in prefix {
            let id = self
                .table
                .lookup(scope, segment, KindFilter::Set(CONTAINER_KINDS), recursive)
                .ok_or_else(|| SemaError::not_found(line, "library", segment))?;
            scope = self.scope_of(id)?;
            recursive = false;
        }

        self.table
            .lookup(scope, last, filter, recursive)
            .ok_or_else(|| SemaError::not_found(line, what, segments.join(".")))
    }

    fn resolve_type(&self, name: &TypeName, line: usize) -> SemaResult<SymbolId> {
        self.resolve_path(name, KindFilter::Set(TYPE_KINDS), "type", line)
    }

    fn resolve_type_ref(&self, ty: &TypeRef, line: usize) -> SemaResult<TypeSig> {
        let id = self.resolve_type(&ty.name, line)?;
        self.check_generic_args(id, &ty.generics, line)?;
        Ok(TypeSig::new(self.table.symbol(id).name.clone(), ty.dim))
    }

    fn is_generic_name(&self, name: &str) -> bool {
        self.table
            .lookup(self.current, name, SymbolKind::Generic.into(), true)
            .is_some()
    }

    /// Generic type parameters declared by `id`, in declaration order
    fn generic_params(&self, id: SymbolId) -> Vec<SymbolId> {
        let Some(scope) = self.table.symbol(id).scope.and_then(|s| self.table.get(s)) else {
            return Vec::new();
        };
        scope
            .entries()
            .map(|(_, id)| id)
            .filter(|id| self.table.symbol(*id).kind == SymbolKind::Generic)
            .collect()
    }

    fn implements(&self, type_id: SymbolId, trait_name: &str) -> bool {
        let symbol = self.table.symbol(type_id);
        match &symbol.detail {
            SymbolDetail::Type(info) => info.traits.iter().any(|t| t == trait_name),
            SymbolDetail::Generic(info) => info.bounds.iter().any(|b| b == trait_name),
            _ => false,
        }
    }

    /// Check supplied generic arguments against the generics `id` declares
    fn check_generic_args(&self, id: SymbolId, args: &[TypeRef], line: usize) -> SemaResult<()> {
        if args.is_empty() {
            return Ok(());
        }
        let declared = self.generic_params(id);
        if args.len() > declared.len() {
            return Err(SemaError::Arity {
                line,
                context: format!("generic arguments of '{}'", self.table.symbol(id).name),
                expected: declared.len().to_string(),
                found: args.len(),
            });
        }

        for (arg, param) in args.iter().zip(declared) {
            let arg_id = self.resolve_type(&arg.name, line)?;
            self.check_generic_args(arg_id, &arg.generics, line)?;
            let param = self.table.symbol(param);
            let bounds = param.as_generic().map(|g| g.bounds.as_slice()).unwrap_or(&[]);
            for bound in bounds {
                if !self.implements(arg_id, bound) {
                    return Err(SemaError::mismatch(
                        line,
                        format!("generic '{}'", param.name),
                        format!("a type implementing {bound}"),
                        &self.table.symbol(arg_id).name,
                    ));
                }
            }
        }
        Ok(())
    }

    fn declare_generics(&mut self, generics: &[GenericParam]) -> SemaResult<()> {
        for generic in generics {
            let line = generic.line;
            let mut bounds = Vec::with_capacity(generic.bounds.len());
            for bound in &generic.bounds {
                let id = self.resolve_path(bound, SymbolKind::Trait.into(), "trait", line)?;
                bounds.push(self.table.symbol(id).name.clone());
            }
            let default = match &generic.default {
                Some(ty) => Some(self.resolve_type_ref(ty, line)?.type_name),
                None => None,
            };
            self.insert(
                Symbol::new(&generic.name, SymbolKind::Generic, line)
                    .with_detail(SymbolDetail::Generic(GenericInfo { bounds, default })),
            )?;
        }
        Ok(())
    }

    // Items

    fn visit_items(&mut self, items: &mut [Item]) -> SemaResult<()> {
        for item in items.iter_mut() {
            self.visit_item(item)?;
        }
        Ok(())
    }

    fn visit_item(&mut self, item: &mut Item) -> SemaResult<()> {
        match item {
            Item::Import(import) => self.visit_import(import),
            Item::Library(library) => self.visit_library(library),
            Item::Module(module) => self.visit_module(module),
            Item::Arch(arch) => self.visit_arch_item(arch),
            Item::Struct(decl) => self.visit_struct(decl, false).map(drop),
            Item::Interface(decl) => self.visit_struct(decl, true).map(drop),
            Item::Trait(decl) => self.visit_trait(decl),
            Item::Impl(decl) => self.visit_impl(decl),
            Item::Func(decl) | Item::Task(decl) => self.visit_func(decl).map(drop),
            Item::Enum(decl) => self.visit_enum(decl),
            Item::Attr(decl) => self.visit_attr(decl),
            Item::Decl(decl) => self.visit_decl(decl).map(drop),
        }
    }

    fn visit_import(&mut self, import: &ImportDecl) -> SemaResult<()> {
        self.line = import.line;
        let scope = self.resolve_library(&import.key(), import.line)?;

        if let Some(existing) = self.table.lookup_local(self.current, import.name()) {
            let existing = self.table.symbol(existing);
            if existing.kind == SymbolKind::Library && existing.scope == Some(scope) {
                return Ok(());
            }
            return Err(SemaError::Duplicate {
                line: import.line,
                name: import.name().to_string(),
            });
        }

        let mut symbol =
            Symbol::new(import.name(), SymbolKind::Library, import.line).with_scope(scope);
        symbol.flags.is_imported = true;
        self.insert(symbol).map(drop)
    }

    /// Scope of an imported library, analyzing it on first use
    fn resolve_library(&mut self, key: &str, line: usize) -> SemaResult<ScopeId> {
        let unit = self.libraries.get_mut(key).ok_or_else(|| SemaError::Import {
            line,
            error: ResolveError::NotLoaded {
                key: key.to_string(),
            },
        })?;
        if let Some(scope) = unit.scope {
            return Ok(scope);
        }
        if unit.resolving {
            return Err(SemaError::Cycle {
                line,
                key: key.to_string(),
            });
        }
        let Some(mut ast) = unit.ast.take() else {
            return Err(SemaError::Internal(format!("library '{key}' has no source")));
        };
        unit.resolving = true;
        debug!("analyzing library '{}' from {}", key, unit.path.display());

        let root = self.table.root();
        let scope = self.table.create_scope(root, key);
        let function = self.function.take();
        let drivers = self.drivers.take();
        let saved_line = self.line;

        let result = self.with_scope(scope, |this| this.visit_items(&mut ast.items));

        self.function = function;
        self.drivers = drivers;
        self.line = saved_line;
        if let Some(unit) = self.libraries.get_mut(key) {
            unit.ast = Some(ast);
            unit.resolving = false;
            if result.is_ok() {
                unit.scope = Some(scope);
            }
        }
        result.map(|_| scope)
    }

    fn visit_library(&mut self, library: &mut LibraryDecl) -> SemaResult<()> {
        self.line = library.line;
        let scope = self.table.create_scope(self.current, &library.name);
        self.insert(
            Symbol::new(&library.name, SymbolKind::Library, library.line).with_scope(scope),
        )?;
        debug!("library '{}'", library.name);
        self.with_scope(scope, |this| this.visit_items(&mut library.items))
    }

    fn visit_module(&mut self, module: &mut ModuleDecl) -> SemaResult<()> {
        self.line = module.line;
        let scope = self.table.create_scope(self.current, &module.name);
        if let Some(target) = self.table.get_mut(scope) {
            target.flags.inside_module = true;
        }

        let mut symbol = Symbol::new(&module.name, SymbolKind::Module, module.line)
            .with_scope(scope)
            .with_detail(SymbolDetail::Module(ModuleInfo {
                blackbox: module.blackbox,
                archs: Vec::new(),
            }));
        symbol.flags.is_template = !module.generics.is_empty();
        let id = self.insert(symbol)?;

        self.with_scope(scope, |this| {
            this.declare_generics(&module.generics)?;
            for decl in &mut module.generic_decls {
                this.visit_decl(decl)?;
            }
            for port in &mut module.ports {
                this.visit_decl(port)?;
            }
            Ok(())
        })?;

        if let Some(arch) = &mut module.arch {
            if let Some(owner) = &arch.module {
                if owner != &module.name {
                    return Err(SemaError::not_found(arch.line, "module", owner));
                }
            }
            self.visit_arch(arch, id)?;
        }
        Ok(())
    }

    /// Top-level `arch NAME for MODULE:`
    fn visit_arch_item(&mut self, arch: &mut ArchDecl) -> SemaResult<()> {
        self.line = arch.line;
        let Some(module) = &arch.module else {
            return Err(SemaError::Misplaced {
                line: arch.line,
                what: "architecture without a module".to_string(),
            });
        };
        let module_id = self
            .table
            .lookup(self.current, module, SymbolKind::Module.into(), true)
            .ok_or_else(|| SemaError::not_found(arch.line, "module", module))?;
        self.check_generic_args(module_id, &arch.module_generics, arch.line)?;
        self.visit_arch(arch, module_id)
    }

    fn visit_arch(&mut self, arch: &mut ArchDecl, module_id: SymbolId) -> SemaResult<()> {
        let module_scope = self.scope_of(module_id)?;
        let module_name = self.table.symbol(module_id).name.clone();
        let scope = self.table.create_scope(module_scope, &arch.name);

        let symbol = Symbol::new(&arch.name, SymbolKind::Arch, arch.line)
            .with_scope(scope)
            .with_detail(SymbolDetail::Arch {
                module: module_name.clone(),
            });
        if self.table.insert(module_scope, symbol).is_none() {
            return Err(SemaError::Duplicate {
                line: arch.line,
                name: arch.name.clone(),
            });
        }
        if let Some(info) = self.table.symbol_mut(module_id).as_module_mut() {
            info.archs.push(arch.name.clone());
        }
        debug!("architecture '{}' of '{}'", arch.name, module_name);

        self.with_scope(scope, |this| {
            this.declare_generics(&arch.generics)?;
            for decl in &mut arch.declare_block {
                this.visit_decl(decl)?;
            }
            for statement in &mut arch.logic_block.statements {
                this.visit_concurrent(statement)?;
            }
            Ok(())
        })
    }

    fn visit_struct(&mut self, decl: &mut StructDecl, is_interface: bool) -> SemaResult<SymbolId> {
        self.line = decl.line;
        let scope = self.table.create_scope(self.current, &decl.name);
        let mut symbol = Symbol::new(&decl.name, SymbolKind::Type, decl.line)
            .with_scope(scope)
            .with_detail(SymbolDetail::Type(TypeInfo {
                is_interface,
                ..TypeInfo::default()
            }));
        symbol.flags.is_template = !decl.generics.is_empty();
        let id = self.insert(symbol)?;

        let (params, fields) = self.with_scope(scope, |this| {
            this.declare_generics(&decl.generics)?;

            let mut params = ParamList::new(&decl.name);
            for param in &mut decl.params {
                params.push(this.declare_param(param, true)?);
            }
            params
                .verify_defaults()
                .map_err(|error| SemaError::symbol(decl.line, error))?;

            let mut fields = Vec::with_capacity(decl.fields.len());
            for field in &mut decl.fields {
                let field_id = this.visit_decl(field)?;
                if let Some(signal) = this.table.symbol(field_id).as_signal() {
                    fields.push(Field {
                        name: signal.name.clone(),
                        type_name: signal.type_name.clone(),
                        dim: signal.type_dim(),
                    });
                }
            }
            Ok((params, fields))
        })?;

        let symbol = self.table.symbol_mut(id);
        if !params.is_empty() {
            symbol.params = Some(params);
        }
        symbol.fields = Some(fields);
        Ok(id)
    }

    fn visit_trait(&mut self, decl: &mut TraitDecl) -> SemaResult<()> {
        self.line = decl.line;
        let scope = self.table.create_scope(self.current, &decl.name);
        let id = self.insert(Symbol::new(&decl.name, SymbolKind::Trait, decl.line).with_scope(scope))?;
        if let Some(target) = self.table.get_mut(scope) {
            target.flags.inside_trait = true;
            target.self_type = Some(id);
        }
        self.with_scope(scope, |this| {
            this.declare_generics(&decl.generics)?;
            this.visit_items(&mut decl.items)
        })
    }

    fn visit_impl(&mut self, decl: &mut ImplDecl) -> SemaResult<()> {
        let line = decl.line;
        self.line = line;
        let type_id = self.resolve_type(&decl.target, line)?;
        self.check_generic_args(type_id, &decl.target_generics, line)?;

        let trait_id = match &decl.trait_name {
            Some(name) => {
                let id = self.resolve_path(name, SymbolKind::Trait.into(), "trait", line)?;
                self.check_generic_args(id, &decl.trait_generics, line)?;
                Some(id)
            }
            None => None,
        };

        if let Some(trait_id) = trait_id {
            let trait_name = self.table.symbol(trait_id).name.clone();
            if let Some(info) = self.table.symbol_mut(type_id).as_type_mut() {
                if !info.traits.contains(&trait_name) {
                    info.traits.push(trait_name);
                }
            }
        }

        let type_scope = self.type_scope(type_id);
        let impl_scope = self.table.create_scope(self.current, "impl");
        self.with_scope(impl_scope, |this| this.declare_generics(&decl.generics))?;

        self.with_impl_scope(type_scope, impl_scope, type_id, |this| {
            this.visit_items(&mut decl.items)?;
            match trait_id {
                Some(trait_id) => this.bind_trait_functions(trait_id, type_scope, line),
                None => Ok(()),
            }
        })
    }

    /// Every body-less trait function must be implemented; default bodies
    /// are bound into the type's scope when not overridden
    fn bind_trait_functions(
        &mut self,
        trait_id: SymbolId,
        type_scope: ScopeId,
        line: usize,
    ) -> SemaResult<()> {
        let trait_scope = self.scope_of(trait_id)?;
        let trait_name = self.table.symbol(trait_id).name.clone();
        let functions: IndexSet<SymbolId> = self
            .table
            .get(trait_scope)
            .map(|scope| {
                scope
                    .entries()
                    .map(|(_, id)| id)
                    .filter(|id| self.table.symbol(*id).is_callable())
                    .collect()
            })
            .unwrap_or_default();

        for function in functions {
            let Some(info) = self.table.symbol(function).as_function().cloned() else {
                continue;
            };
            if !self.overload_family(type_scope, false, &info.base_name).is_empty() {
                continue;
            }
            if !info.has_body {
                return Err(SemaError::not_found(
                    line,
                    format!("implementation of {trait_name} function"),
                    info.base_name,
                ));
            }
            for key in &info.overload_keys {
                self.table.bind(type_scope, key, function);
            }
        }
        Ok(())
    }

    fn visit_func(&mut self, decl: &mut FuncDecl) -> SemaResult<SymbolId> {
        let line = decl.line;
        self.line = line;
        let inside_trait = self.flags().inside_trait;
        let scope = self.table.create_scope(self.current, &decl.name);

        let (params, returns) = self.with_scope(scope, |this| {
            this.declare_generics(&decl.generics)?;
            let mut params = ParamList::new(&decl.name);
            for param in &mut decl.params {
                params.push(this.declare_param(param, false)?);
            }
            let returns = decl
                .returns
                .iter()
                .map(|ty| this.resolve_type_ref(ty, line))
                .collect::<SemaResult<Vec<_>>>()?;
            Ok((params, returns))
        })?;

        let keys = params
            .overload_keys(&decl.name)
            .map_err(|error| SemaError::symbol(line, error))?;
        let kind = match decl.kind {
            FuncKind::Func => SymbolKind::Function,
            FuncKind::Task => SymbolKind::Task,
        };
        let mut symbol = Symbol::new(&decl.name, kind, line)
            .with_scope(scope)
            .with_params(params)
            .with_detail(SymbolDetail::Function(FuncInfo {
                base_name: decl.name.clone(),
                returns: returns.clone(),
                has_body: decl.body.is_some(),
                builtin: false,
                overload_keys: keys.clone(),
            }));
        symbol.flags.is_template = !decl.generics.is_empty();

        let id = self.table.add(symbol);
        for key in &keys {
            if !self.table.bind(self.current, key, id) {
                return Err(SemaError::Duplicate {
                    line,
                    name: key.clone(),
                });
            }
        }
        trace!("{} '{}' bound as {:?}", kind, decl.name, keys);

        if let Some(body) = &mut decl.body {
            if !inside_trait {
                self.visit_func_body(scope, &decl.name, returns, body)?;
            }
        }
        Ok(id)
    }

    fn visit_func_body(
        &mut self,
        scope: ScopeId,
        owner: &str,
        returns: Vec<TypeSig>,
        body: &mut FuncBody,
    ) -> SemaResult<()> {
        let context = FuncContext {
            owner: owner.to_string(),
            returns,
        };
        let saved_function = self.function.replace(context);
        let saved_drivers = self.drivers.take();

        let result = self.with_scope(scope, |this| {
            for decl in &mut body.declare_block {
                this.visit_decl(decl)?;
            }
            this.visit_block(&mut body.logic_block.statements)
        });

        self.function = saved_function;
        self.drivers = saved_drivers;
        result
    }

    /// Declare a function parameter, or a struct configuration parameter
    /// when `as_constant` is set
    fn declare_param(&mut self, param: &mut ParamDecl, as_constant: bool) -> SemaResult<ParamSymbol> {
        let line = param.line;
        let type_id = self.resolve_type(&param.ty.name, line)?;
        self.check_generic_args(type_id, &param.ty.generics, line)?;

        let type_symbol = self.table.symbol(type_id);
        let mut symbol = ParamSymbol::new(&param.name, type_symbol.name.clone(), param.ty.dim);
        symbol.generic = type_symbol.kind == SymbolKind::Generic
            || (param.ty.name.is_self() && self.flags().inside_trait);

        if let Some(default) = &mut param.default {
            let info = self.visit_expr(default)?;
            if !info.is_const || info.value.is_none() {
                return Err(SemaError::NotConstant {
                    line,
                    context: format!("default of parameter '{}'", param.name),
                });
            }
            if !symbol.generic {
                self.check_assignable(
                    &symbol.signature(),
                    &info,
                    line,
                    &format!("default of parameter '{}'", param.name),
                )?;
            }
            symbol.default = info.value;
        }

        let mut entry = if as_constant {
            let mut signal = SignalSymbol::new(&param.name, symbol.type_name.clone());
            signal.is_const = true;
            signal.is_generic = true;
            if let Some(value) = &symbol.default {
                signal
                    .assign_init_value(Some(value), None)
                    .map_err(|error| SemaError::symbol(line, error))?;
            }
            Symbol::signal(signal, line)
        } else {
            Symbol::new(&param.name, SymbolKind::Param, line)
                .with_detail(SymbolDetail::Param(symbol.clone()))
        };
        entry.flags.is_parameter = true;
        self.insert(entry)?;
        Ok(symbol)
    }

    fn visit_enum(&mut self, decl: &EnumDecl) -> SemaResult<()> {
        self.line = decl.line;
        self.insert(
            Symbol::new(&decl.name, SymbolKind::Type, decl.line).with_detail(SymbolDetail::Type(
                TypeInfo {
                    enum_states: decl.states.clone(),
                    ..TypeInfo::default()
                },
            )),
        )?;
        for state in &decl.states {
            self.insert(
                Symbol::new(state, SymbolKind::State, decl.line).with_detail(SymbolDetail::State {
                    enum_type: decl.name.clone(),
                }),
            )?;
        }
        Ok(())
    }

    fn visit_attr(&mut self, decl: &mut AttrDecl) -> SemaResult<()> {
        let line = decl.line;
        self.line = line;
        let target = self.resolve_path(&decl.target, KindFilter::Any, "attribute target", line)?;

        for spec in &mut decl.specs {
            let attr = self
                .table
                .lookup(self.current, &spec.name, SymbolKind::Attr.into(), true)
                .ok_or_else(|| SemaError::not_found(line, "attribute", &spec.name))?;
            let SymbolDetail::Attr { type_name } = &self.table.symbol(attr).detail else {
                return Err(SemaError::Internal(format!("attribute '{}' has no type", spec.name)));
            };
            let type_name = type_name.clone();

            let info = self.visit_expr(&mut spec.value)?;
            let context = format!("attribute '{}'", spec.name);
            let value = match (&info.value, info.is_const) {
                (Some(value), true) => value.clone(),
                _ => return Err(SemaError::NotConstant { line, context }),
            };
            if !types_compatible(&type_name, &info.sig.type_name) || info.sig.dim != 0 {
                return Err(SemaError::mismatch(line, context, type_name, &info.sig));
            }
            self.table
                .symbol_mut(target)
                .attrs
                .insert(spec.name.clone(), value);
        }
        Ok(())
    }

    // Declarations

    fn visit_decl(&mut self, decl: &mut VarDecl) -> SemaResult<SymbolId> {
        let line = decl.line;
        self.line = line;

        let type_id = self.resolve_type(&decl.ty, line)?;
        self.check_generic_args(type_id, &decl.generics, line)?;
        let type_params = self.bind_type_args(type_id, &mut decl.args, line)?;
        let bounds = self.check_array(&mut decl.array, line)?;

        let mut signal = SignalSymbol::new(&decl.name, self.table.symbol(type_id).name.clone());
        signal.type_params = type_params;
        signal.is_const = decl.is_const;
        signal.is_generic = decl.kind == DeclKind::Generic;
        signal.direction = decl.direction;
        signal
            .set_array(&bounds)
            .map_err(|error| SemaError::symbol(line, error))?;

        match &mut decl.value {
            Some(value) => {
                let context = format!("initial value of '{}'", decl.name);
                if decl.direction.is_some() {
                    return Err(SemaError::mismatch(line, context, "no value on a port", "a value"));
                }
                let info = self.visit_expr(value)?;
                let sig = TypeSig::new(signal.type_name.clone(), signal.type_dim());
                self.check_assignable(&sig, &info, line, &context)?;
                if signal.is_const && !info.is_const {
                    return Err(SemaError::NotConstant { line, context });
                }
                signal
                    .assign_init_value(info.value.as_ref(), None)
                    .map_err(|error| SemaError::symbol(line, error))?;
            }
            None if decl.kind == DeclKind::Const => {
                return Err(SemaError::mismatch(
                    line,
                    format!("constant '{}'", decl.name),
                    "a value",
                    "none",
                ));
            }
            None => {}
        }

        self.insert(Symbol::signal(signal, line))
    }

    /// Bind a declaration's type configuration arguments, which must be
    /// constant
    fn bind_type_args(
        &mut self,
        type_id: SymbolId,
        args: &mut [Expr],
        line: usize,
    ) -> SemaResult<Vec<(String, Option<ConstValue>)>> {
        let mut sigs = Vec::with_capacity(args.len());
        for arg in args.iter_mut() {
            let info = self.visit_expr(arg)?;
            if !info.is_const {
                return Err(SemaError::NotConstant {
                    line,
                    context: "type argument".to_string(),
                });
            }
            sigs.push(info.arg());
        }

        let symbol = self.table.symbol(type_id);
        let Some(params) = &symbol.params else {
            if sigs.is_empty() {
                return Ok(Vec::new());
            }
            return Err(SemaError::Arity {
                line,
                context: format!("arguments of type '{}'", symbol.name),
                expected: "0".to_string(),
                found: sigs.len(),
            });
        };
        let values = params
            .bind(&sigs)
            .map_err(|error| SemaError::symbol(line, error))?;
        Ok(params
            .params
            .iter()
            .map(|p| p.name.clone())
            .zip(values)
            .collect())
    }

    /// Fold every declared bound to an integer constant, rewriting the index
    /// expressions in place
    fn check_array(&mut self, array: &mut [Index], line: usize) -> SemaResult<Vec<(i64, i64)>> {
        let mut bounds = Vec::with_capacity(array.len());
        for index in array.iter_mut() {
            let bound = match index {
                Index::Single(expr) => {
                    let value = self.fold_bound(expr, line)?;
                    (value, value)
                }
                Index::Slice(left, right) => {
                    (self.fold_bound(left, line)?, self.fold_bound(right, line)?)
                }
            };
            bounds.push(bound);
        }
        Ok(bounds)
    }

    fn fold_bound(&mut self, expr: &mut Expr, line: usize) -> SemaResult<i64> {
        let info = self.visit_expr(expr)?;
        if !is_integer_type(&info.sig.type_name) || info.sig.dim != 0 {
            return Err(SemaError::mismatch(line, "array bound", "an integer", &info.sig));
        }
        let value = info
            .value
            .as_ref()
            .and_then(ConstValue::as_int)
            .filter(|_| info.is_const)
            .ok_or_else(|| SemaError::NotConstant {
                line,
                context: "array bound".to_string(),
            })?;
        *expr = Expr::int(value);
        Ok(value)
    }

    fn check_assignable(
        &self,
        expected: &TypeSig,
        info: &ExprInfo,
        line: usize,
        context: &str,
    ) -> SemaResult<()> {
        if !info.parts.is_empty() {
            return Err(SemaError::Arity {
                line,
                context: context.to_string(),
                expected: "1 value".to_string(),
                found: info.parts.len(),
            });
        }
        if expected.accepts(&info.sig)
            || self.is_generic_name(&expected.type_name)
            || self.is_generic_name(&info.sig.type_name)
        {
            return Ok(());
        }
        Err(SemaError::mismatch(line, context, expected, &info.sig))
    }

    // Statements

    /// A top-level logic statement is one driver group: its targets are
    /// committed together once the statement has been analyzed
    fn visit_concurrent(&mut self, statement: &mut Statement) -> SemaResult<()> {
        let saved = self.drivers.replace(Vec::new());
        let result = self.visit_statement(statement);
        let targets = std::mem::replace(&mut self.drivers, saved).unwrap_or_default();
        result?;
        self.commit_drivers(targets)
    }

    fn commit_drivers(&mut self, targets: Vec<DriveTarget>) -> SemaResult<()> {
        let mut grouped: IndexMap<SymbolId, (BTreeSet<usize>, usize)> = IndexMap::new();
        for target in targets {
            let entry = grouped
                .entry(target.symbol)
                .or_insert_with(|| (BTreeSet::new(), target.line));
            entry.0.extend(target.cells);
        }

        for (id, (cells, line)) in grouped {
            let cells: Vec<usize> = cells.into_iter().collect();
            let symbol = self.table.symbol_mut(id);
            trace!("'{}' driven at {} cells", symbol.name, cells.len());
            if let Some(signal) = symbol.as_signal_mut() {
                signal
                    .drive_cells(&cells)
                    .map_err(|error| SemaError::symbol(line, error))?;
            }
        }
        Ok(())
    }

    fn visit_block(&mut self, statements: &mut [Statement]) -> SemaResult<()> {
        for statement in statements.iter_mut() {
            self.visit_statement(statement)?;
        }
        Ok(())
    }

    fn visit_statement(&mut self, statement: &mut Statement) -> SemaResult<()> {
        self.line = statement_line(statement);
        match statement {
            Statement::Assign(assign) => self.visit_assignment(assign),
            Statement::Decl(decl) => self.visit_decl(decl).map(drop),
            Statement::ModuleInst(inst) => self.visit_instance(inst),
            Statement::Process(process) => self.visit_process(process),
            Statement::For(lp) => self.visit_for(lp),
            Statement::If(stmt) => self.visit_if(stmt),
            Statement::Case(stmt) => self.visit_case(stmt),
            Statement::Rename(rename) => self.visit_rename(rename),
            Statement::Assert(assert) => self.visit_assert(assert),
            Statement::Report(report) => self.visit_report(report),
            Statement::Return(ret) => self.visit_return(ret),
            Statement::Call(call) => self.visit_expr(&mut call.call).map(drop),
        }
    }

    fn visit_assignment(&mut self, assign: &mut Assignment) -> SemaResult<()> {
        let line = assign.line;
        let value = self.visit_expr(&mut assign.value)?;

        match &mut assign.target {
            AssignTarget::Var(var) => {
                let context = format!("assignment to '{}'", var.name);
                let target = self.visit_target(var)?;
                let value = match assign.op.binary_op() {
                    Some(op) => {
                        let sig = self.binary_sig(op, &target, &value, line)?;
                        ExprInfo::new(sig)
                    }
                    None => value,
                };
                self.check_assignable(&target.sig, &value, line, &context)
            }
            AssignTarget::Tuple(vars) => {
                if value.parts.len() != vars.len() {
                    return Err(SemaError::Arity {
                        line,
                        context: "tuple assignment".to_string(),
                        expected: format!("{} values", vars.len()),
                        found: value.parts.len(),
                    });
                }
                for (var, part) in vars.iter_mut().zip(value.parts) {
                    let context = format!("assignment to '{}'", var.name);
                    let target = self.visit_target(var)?;
                    self.check_assignable(&target.sig, &ExprInfo::new(part), line, &context)?;
                }
                Ok(())
            }
        }
    }

    fn visit_process(&mut self, process: &mut Process) -> SemaResult<()> {
        let line = process.line;
        let name = match process.kind {
            ProcessKind::Spro => "spro",
            ProcessKind::Apro => "apro",
            ProcessKind::Pro => "pro",
        };

        if process.kind != ProcessKind::Pro && process.args.len() != 2 {
            return Err(SemaError::Arity {
                line,
                context: format!("{name} arguments"),
                expected: "2".to_string(),
                found: process.args.len(),
            });
        }

        for arg in &mut process.args {
            let info = self.visit_expr(arg)?;
            let is_signal = info
                .symbol
                .is_some_and(|id| self.table.symbol(id).kind == SymbolKind::Signal);
            let valid = match process.kind {
                ProcessKind::Pro => is_signal,
                _ => is_signal && !info.is_const && info.sig == TypeSig::new("bit", 0),
            };
            if !valid {
                let expected = match process.kind {
                    ProcessKind::Pro => "a signal",
                    _ => "a non-constant scalar bit signal",
                };
                return Err(SemaError::mismatch(
                    line,
                    format!("{name} argument"),
                    expected,
                    &info.sig,
                ));
            }
        }

        self.visit_block(&mut process.statements)
    }

    fn visit_for(&mut self, lp: &mut ForLoop) -> SemaResult<()> {
        let line = lp.line;
        let (left, right) = match &mut lp.range {
            Index::Single(expr) => {
                let value = self.fold_bound(expr, line)?;
                (value, value)
            }
            Index::Slice(left, right) => (self.fold_bound(left, line)?, self.fold_bound(right, line)?),
        };

        let scope = self.table.create_scope(self.current, format!("for {}", lp.var));
        self.with_scope(scope, |this| {
            let mut var = SignalSymbol::new(&lp.var, "int");
            var.loop_range = Some((left.min(right), left.max(right)));
            this.insert(Symbol::signal(var, line))?;
            this.visit_block(&mut lp.statements)
        })
    }

    fn check_condition(&self, info: &ExprInfo, line: usize, context: &str) -> SemaResult<()> {
        let valid = info.sig.dim == 0 && matches!(info.sig.type_name.as_str(), "bool" | "bit");
        if valid {
            Ok(())
        } else {
            Err(SemaError::mismatch(line, context, "bool or bit", &info.sig))
        }
    }

    fn visit_if(&mut self, stmt: &mut IfStmt) -> SemaResult<()> {
        for branch in &mut stmt.branches {
            let info = self.visit_expr(&mut branch.cond)?;
            self.check_condition(&info, branch.line, "condition")?;
            self.visit_block(&mut branch.statements)?;
        }
        if let Some(statements) = &mut stmt.else_branch {
            self.visit_block(statements)?;
        }
        Ok(())
    }

    fn visit_case(&mut self, stmt: &mut CaseStmt) -> SemaResult<()> {
        let selector = self.visit_expr(&mut stmt.selector)?;
        for arm in &mut stmt.arms {
            for choice in &mut arm.choices {
                let Choice::Index(index) = choice else {
                    continue;
                };
                let exprs: Vec<&mut Expr> = match index {
                    Index::Single(expr) => vec![expr],
                    Index::Slice(left, right) => vec![left, right],
                };
                for expr in exprs {
                    let info = self.visit_expr(expr)?;
                    if !comparable(&selector.sig, &info.sig) {
                        return Err(SemaError::mismatch(
                            arm.line,
                            "case choice",
                            &selector.sig,
                            &info.sig,
                        ));
                    }
                }
            }
            self.visit_block(&mut arm.statements)?;
        }
        Ok(())
    }

    fn visit_rename(&mut self, rename: &mut Rename) -> SemaResult<()> {
        let line = rename.line;
        let target = self.visit_var(&mut rename.target)?;
        let info = self.visit_expr(&mut rename.value)?;
        let name = match &info.value {
            Some(ConstValue::Str(name)) => name.clone(),
            _ => return Err(SemaError::mismatch(line, "rename", "a constant string", &info.sig)),
        };
        let Some(id) = target.symbol else {
            return Err(SemaError::not_found(line, "signal", &rename.target.name));
        };
        match self.table.symbol_mut(id).as_signal_mut() {
            Some(signal) => {
                signal.rename = Some(name);
                Ok(())
            }
            None => Err(SemaError::not_found(line, "signal", &rename.target.name)),
        }
    }

    fn visit_assert(&mut self, assert: &mut Assert) -> SemaResult<()> {
        let info = self.visit_expr(&mut assert.cond)?;
        self.check_condition(&info, assert.line, "assertion")?;
        self.visit_report(&mut assert.report)
    }

    fn visit_report(&mut self, report: &mut Report) -> SemaResult<()> {
        let info = self.visit_expr(&mut report.message)?;
        if info.sig != TypeSig::new("str", 0) {
            return Err(SemaError::mismatch(report.line, "report message", "str", &info.sig));
        }
        Ok(())
    }

    fn visit_return(&mut self, ret: &mut Return) -> SemaResult<()> {
        let line = ret.line;
        let Some(context) = &self.function else {
            return Err(SemaError::Misplaced {
                line,
                what: "return".to_string(),
            });
        };
        let owner = context.owner.clone();
        let expected = context.returns.clone();

        if ret.values.len() != expected.len() {
            return Err(SemaError::Arity {
                line,
                context: format!("return values of '{owner}'"),
                expected: expected.len().to_string(),
                found: ret.values.len(),
            });
        }
        for (value, sig) in ret.values.iter_mut().zip(&expected) {
            let info = self.visit_expr(value)?;
            self.check_assignable(sig, &info, line, &format!("return value of '{owner}'"))?;
        }
        Ok(())
    }

    fn visit_instance(&mut self, inst: &mut ModuleInst) -> SemaResult<()> {
        let line = inst.line;
        let module_id = self.resolve_path(&inst.module, SymbolKind::Module.into(), "module", line)?;
        let module_scope = self.scope_of(module_id)?;
        let module = self.table.symbol(module_id);
        let module_name = module.name.clone();
        let info = module.as_module().cloned().unwrap_or_default();

        if let Some(arch) = &inst.arch {
            if !info.archs.contains(arch) {
                return Err(SemaError::not_found(
                    line,
                    format!("architecture of '{module_name}'"),
                    arch,
                ));
            }
        }
        if inst.blackbox && !info.blackbox {
            return Err(SemaError::mismatch(
                line,
                format!("instance '{}'", inst.name),
                "a blackbox module",
                format!("module '{module_name}'"),
            ));
        }
        self.check_generic_args(module_id, &inst.generics, line)?;

        for assign in &mut inst.generic_assigns {
            let context = format!("generic '{}' of '{}'", assign.target, module_name);
            let generic = self
                .table
                .lookup(module_scope, &assign.target, SymbolKind::Signal.into(), false)
                .and_then(|id| self.table.symbol(id).as_signal())
                .filter(|signal| signal.is_generic)
                .map(|signal| TypeSig::new(signal.type_name.clone(), signal.type_dim()))
                .ok_or_else(|| {
                    SemaError::not_found(assign.line, format!("generic of '{module_name}'"), &assign.target)
                })?;
            let value = self.visit_expr(&mut assign.value)?;
            if !value.is_const {
                return Err(SemaError::NotConstant {
                    line: assign.line,
                    context,
                });
            }
            self.check_assignable(&generic, &value, assign.line, &context)?;
        }

        for assign in &mut inst.port_assigns {
            let context = format!("port '{}' of '{}'", assign.target, module_name);
            let (port, direction) = self
                .table
                .lookup(module_scope, &assign.target, SymbolKind::Signal.into(), false)
                .and_then(|id| self.table.symbol(id).as_signal())
                .and_then(|signal| {
                    let direction = signal.direction?;
                    Some((TypeSig::new(signal.type_name.clone(), signal.type_dim()), direction))
                })
                .ok_or_else(|| {
                    SemaError::not_found(assign.line, format!("port of '{module_name}'"), &assign.target)
                })?;

            if direction.is_output() {
                let Expr::Var(var) = &mut assign.value else {
                    return Err(SemaError::mismatch(assign.line, context, "a signal", "an expression"));
                };
                let target = self.visit_target(var)?;
                self.check_assignable(&target.sig, &ExprInfo::new(port), assign.line, &context)?;
            } else {
                let value = self.visit_expr(&mut assign.value)?;
                self.check_assignable(&port, &value, assign.line, &context)?;
            }
        }

        self.insert(
            Symbol::new(&inst.name, SymbolKind::Instance, line)
                .with_scope(module_scope)
                .with_detail(SymbolDetail::Instance {
                    module: module_name,
                    arch: inst.arch.clone(),
                }),
        )
        .map(drop)
    }

    // Variables

    /// Resolve the target of an assignment and record the cells it drives
    fn visit_target(&mut self, var: &mut VarRef) -> SemaResult<ExprInfo> {
        let line = var.line;
        let id = self
            .table
            .lookup(self.current, &var.name, KindFilter::Set(TARGET_KINDS), true)
            .ok_or_else(|| SemaError::not_found(line, "signal", &var.name))?;
        let context = format!("assignment to '{}'", var.name);

        let symbol = self.table.symbol(id);
        let rejected = match &symbol.detail {
            SymbolDetail::Signal(signal) if signal.is_const || signal.is_generic => Some("a constant"),
            SymbolDetail::Signal(signal) if signal.loop_range.is_some() => Some("a loop variable"),
            SymbolDetail::Signal(signal) if signal.direction == Some(PortDirection::In) => {
                Some("an input port")
            }
            SymbolDetail::Signal(_) | SymbolDetail::Param(_) => None,
            _ if symbol.kind == SymbolKind::Library => Some("a library"),
            _ => {
                return Err(SemaError::Internal(format!(
                    "'{}' has no value store",
                    symbol.name
                )))
            }
        };
        let is_library = symbol.kind == SymbolKind::Library;

        if is_library {
            let scope = self.scope_of(id)?;
            return match &mut var.member {
                Some(Member::Field(inner)) => self.with_scope(scope, |this| this.visit_target(inner)),
                _ => Err(SemaError::mismatch(line, context, "a signal", "a library")),
            };
        }
        if let Some(found) = rejected {
            return Err(SemaError::mismatch(line, context, "a writable signal", found));
        }

        self.table.symbol_mut(id).flags.is_referenced = true;
        let access = self.access_signal(id, var)?;
        match &mut var.member {
            None => {
                if self.drivers.is_some() {
                    if let Some(signal) = self.table.symbol(id).as_signal() {
                        let cells = signal
                            .resolve_cells(Some(&access.bounds))
                            .map_err(|error| SemaError::symbol(line, error))?;
                        if let Some(drivers) = &mut self.drivers {
                            drivers.push(DriveTarget {
                                symbol: id,
                                cells,
                                line,
                            });
                        }
                    }
                }
                Ok(access.info)
            }
            Some(Member::Field(field)) => self.visit_field(&access.info, field, line),
            Some(Member::Method(_)) => {
                Err(SemaError::mismatch(line, context, "a signal", "a method call"))
            }
        }
    }

    fn visit_var(&mut self, var: &mut VarRef) -> SemaResult<ExprInfo> {
        let line = var.line;
        let id = self
            .table
            .lookup(self.current, &var.name, KindFilter::Set(VALUE_KINDS), true)
            .ok_or_else(|| SemaError::not_found(line, "signal", &var.name))?;
        self.table.symbol_mut(id).flags.is_referenced = true;

        let symbol = self.table.symbol(id);
        let kind = symbol.kind;
        let enum_type = match &symbol.detail {
            SymbolDetail::State { enum_type } => Some(enum_type.clone()),
            _ => None,
        };

        match kind {
            SymbolKind::Library => {
                let scope = self.scope_of(id)?;
                match &mut var.member {
                    Some(Member::Field(inner)) => self.with_scope(scope, |this| this.visit_var(inner)),
                    Some(Member::Method(call)) => {
                        self.resolve_call(scope, false, call, None)
                    }
                    None => Err(SemaError::mismatch(
                        line,
                        format!("library '{}'", var.name),
                        "a member access",
                        "a bare name",
                    )),
                }
            }
            SymbolKind::State => {
                let enum_type = enum_type
                    .ok_or_else(|| SemaError::Internal(format!("state '{}' has no type", var.name)))?;
                let mut info = ExprInfo::new(TypeSig::new(enum_type, 0));
                info.is_const = true;
                Ok(info)
            }
            SymbolKind::Instance => {
                let scope = self.scope_of(id)?;
                let Some(Member::Field(port)) = &var.member else {
                    return Err(SemaError::mismatch(
                        line,
                        format!("instance '{}'", var.name),
                        "a port access",
                        "a bare name",
                    ));
                };
                self.table
                    .lookup(scope, &port.name, SymbolKind::Signal.into(), false)
                    .and_then(|port| self.table.symbol(port).as_signal())
                    .filter(|signal| signal.direction.is_some())
                    .map(|signal| ExprInfo::new(TypeSig::new(signal.type_name.clone(), signal.type_dim())))
                    .ok_or_else(|| SemaError::not_found(line, format!("port of '{}'", var.name), &port.name))
            }
            _ => {
                let access = self.access_signal(id, var)?;
                match &mut var.member {
                    None => Ok(access.info),
                    Some(Member::Field(field)) => self.visit_field(&access.info, field, line),
                    Some(Member::Method(call)) => {
                        let receiver = access.info.arg();
                        self.visit_method(receiver, call)
                    }
                }
            }
        }
    }

    /// Fold the indices of a signal or parameter access and bounds-check them
    fn access_signal(&mut self, id: SymbolId, var: &mut VarRef) -> SemaResult<Access> {
        let line = var.line;
        let mut selections = Vec::with_capacity(var.index.len());
        for index in &mut var.index {
            selections.push(self.select_index(index)?);
        }
        let singles = selections.iter().filter(|s| s.single).count();

        let symbol = self.table.symbol(id);
        match &symbol.detail {
            SymbolDetail::Signal(signal) => {
                if selections.len() > signal.dims().len() {
                    return Err(SemaError::symbol(
                        line,
                        SymbolError::TooManyIndices {
                            signal: signal.name.clone(),
                            expected: signal.dims().len(),
                            found: selections.len(),
                        },
                    ));
                }
                let bounds: Vec<(i64, i64)> = signal
                    .dims()
                    .iter()
                    .enumerate()
                    .map(|(position, dim)| match selections.get(position).map(|s| s.selection) {
                        Some(Selection::Fixed(l, r)) | Some(Selection::Loop(l, r)) => (l, r),
                        _ => (dim.low, dim.high),
                    })
                    .collect();
                signal
                    .resolve_cells(Some(&bounds))
                    .map_err(|error| SemaError::symbol(line, error))?;

                let fixed = selections
                    .iter()
                    .all(|s| matches!(s.selection, Selection::Fixed(..)));
                let value = match (signal.is_const, fixed, selections.is_empty()) {
                    (true, _, true) => signal.const_value(),
                    (true, true, false) => signal.read_value(Some(&bounds)),
                    _ => None,
                };

                let mut info = ExprInfo::new(TypeSig::new(
                    signal.type_name.clone(),
                    signal.type_dim().saturating_sub(singles),
                ));
                info.value = value;
                info.is_const = signal.is_const;
                info.symbol = Some(id);
                Ok(Access { info, bounds })
            }
            SymbolDetail::Param(param) => {
                let mut info = ExprInfo::new(TypeSig::new(
                    param.type_name.clone(),
                    param.type_dim.saturating_sub(singles),
                ));
                info.symbol = Some(id);
                Ok(Access {
                    info,
                    bounds: Vec::new(),
                })
            }
            _ => Err(SemaError::Internal(format!(
                "'{}' has no value store",
                symbol.name
            ))),
        }
    }

    fn select_index(&mut self, index: &mut Index) -> SemaResult<IndexSel> {
        match index {
            Index::Single(expr) => {
                let selection = match self.index_bound(expr)? {
                    Bound::Const(v) => Selection::Fixed(v, v),
                    Bound::Loop(low, high) => Selection::Loop(low, high),
                    Bound::Dynamic => Selection::Dynamic,
                };
                Ok(IndexSel {
                    selection,
                    single: true,
                })
            }
            Index::Slice(left, right) => {
                let selection = match (self.index_bound(left)?, self.index_bound(right)?) {
                    (Bound::Const(l), Bound::Const(r)) => Selection::Fixed(l, r),
                    _ => Selection::Dynamic,
                };
                Ok(IndexSel {
                    selection,
                    single: false,
                })
            }
        }
    }

    /// Analyze one index bound, folding constants in place
    fn index_bound(&mut self, expr: &mut Expr) -> SemaResult<Bound> {
        let line = expr.line().unwrap_or(self.line);
        let info = self.visit_expr(expr)?;
        if !is_integer_type(&info.sig.type_name) || info.sig.dim != 0 {
            return Err(SemaError::mismatch(line, "index", "an integer", &info.sig));
        }
        if let Some(value) = info.value.as_ref().and_then(ConstValue::as_int) {
            *expr = Expr::int(value);
            return Ok(Bound::Const(value));
        }
        let range = info
            .symbol
            .and_then(|id| self.table.symbol(id).as_signal())
            .and_then(|signal| signal.loop_range);
        Ok(range.map_or(Bound::Dynamic, |(low, high)| Bound::Loop(low, high)))
    }

    fn visit_field(&mut self, owner: &ExprInfo, field: &mut VarRef, line: usize) -> SemaResult<ExprInfo> {
        let type_id = self
            .table
            .lookup(self.current, &owner.sig.type_name, KindFilter::Set(TYPE_KINDS), true)
            .ok_or_else(|| SemaError::not_found(line, "type", &owner.sig.type_name))?;
        let declared = self
            .table
            .symbol(type_id)
            .field(&field.name)
            .cloned()
            .ok_or_else(|| {
                SemaError::not_found(line, format!("field of '{}'", owner.sig.type_name), &field.name)
            })?;

        let mut singles = 0;
        for index in &mut field.index {
            if self.select_index(index)?.single {
                singles += 1;
            }
        }
        let mut info = ExprInfo::new(TypeSig::new(
            declared.type_name,
            declared.dim.saturating_sub(singles),
        ));
        info.is_const = owner.is_const;

        match &mut field.member {
            None => Ok(info),
            Some(Member::Field(next)) => self.visit_field(&info, next, line),
            Some(Member::Method(call)) => self.visit_method(info.arg(), call),
        }
    }

    fn visit_method(&mut self, receiver: ArgSig, call: &mut FuncCall) -> SemaResult<ExprInfo> {
        let line = call.line;
        let type_id = self
            .table
            .lookup(self.current, &receiver.sig.type_name, KindFilter::Set(TYPE_KINDS), true)
            .ok_or_else(|| SemaError::not_found(line, "type", &receiver.sig.type_name))?;
        let scope = self.table.symbol(type_id).scope.ok_or_else(|| {
            SemaError::not_found(line, format!("method of '{}'", receiver.sig.type_name), &call.name)
        })?;
        self.resolve_call(scope, false, call, Some(receiver))
    }

    // Expressions

    fn visit_expr(&mut self, expr: &mut Expr) -> SemaResult<ExprInfo> {
        match expr {
            Expr::Const(literal) => Ok(ExprInfo::constant(
                TypeSig::new(literal.type_name.clone(), 0),
                literal.value.clone(),
            )),
            Expr::Array(bits) => {
                let mut merged = Vec::with_capacity(bits.len());
                for bit in bits.iter() {
                    match &bit.value {
                        ConstValue::Bit(b) => merged.extend_from_slice(b),
                        other => {
                            return Err(SemaError::mismatch(self.line, "bit string", "bit", other.type_name()))
                        }
                    }
                }
                Ok(ExprInfo::constant(TypeSig::new("bit", 1), ConstValue::Bit(merged)))
            }
            Expr::Aggregate(elements) => self.visit_aggregate(elements),
            Expr::Var(var) => self.visit_var(var),
            Expr::Call(call) => {
                let scope = self.current;
                self.resolve_call(scope, true, call, None)
            }
            Expr::Binary(binary) => self.visit_binary(binary),
            Expr::Unary(unary) => self.visit_unary(unary),
            Expr::Units(inner, unit) => {
                let line = inner.line().unwrap_or(self.line);
                let info = self.visit_expr(inner)?;
                if !is_numeric(&info.sig) {
                    return Err(SemaError::mismatch(line, format!("'{unit}' quantity"), "a number", &info.sig));
                }
                let mut result = ExprInfo::new(TypeSig::new("time", 0));
                result.is_const = info.is_const;
                Ok(result)
            }
        }
    }

    fn visit_aggregate(&mut self, elements: &mut [Element]) -> SemaResult<ExprInfo> {
        let line = self.line;
        let mut element_sig: Option<TypeSig> = None;
        let mut bits = Some(Vec::with_capacity(elements.len()));
        let mut is_const = true;

        for element in elements.iter_mut() {
            for choice in &mut element.choices {
                if let Choice::Index(index) = choice {
                    self.select_index(index)?;
                }
            }
            let info = self.visit_expr(&mut element.value)?;
            match &element_sig {
                Some(sig) if !sig.accepts(&info.sig) => {
                    return Err(SemaError::mismatch(line, "aggregate element", sig, &info.sig));
                }
                Some(_) => {}
                None => element_sig = Some(info.sig.clone()),
            }
            is_const &= info.is_const;
            bits = match (bits, &info.value, element.choices.is_empty()) {
                (Some(mut acc), Some(ConstValue::Bit(b)), true) if b.len() == 1 => {
                    acc.push(b[0]);
                    Some(acc)
                }
                _ => None,
            };
        }

        let Some(sig) = element_sig else {
            return Err(SemaError::Internal("empty aggregate".to_string()));
        };
        let mut info = ExprInfo::new(TypeSig::new(sig.type_name, sig.dim + 1));
        info.is_const = is_const;
        info.value = bits.map(ConstValue::Bit);
        Ok(info)
    }

    fn visit_binary(&mut self, binary: &mut BinaryExpr) -> SemaResult<ExprInfo> {
        let line = binary.line;
        let lhs = self.visit_expr(&mut binary.lhs)?;
        let rhs = self.visit_expr(&mut binary.rhs)?;
        let sig = self.binary_sig(binary.op, &lhs, &rhs, line)?;

        let value = match (&lhs.value, &rhs.value) {
            (Some(a), Some(b)) => match eval_binary(binary.op, a, b) {
                Ok(value) => Some(value),
                // Mixed kinds the type check accepted stay unfolded
                Err(EvalError::TypeMismatch { .. } | EvalError::TooWide(_)) => None,
                Err(error) => return Err(SemaError::Eval { line, error }),
            },
            _ => None,
        };
        let mut info = ExprInfo::new(sig);
        info.value = value;
        info.is_const = lhs.is_const && rhs.is_const;
        Ok(info)
    }

    /// Result type of `lhs op rhs`
    fn binary_sig(&self, op: BinaryOp, lhs: &ExprInfo, rhs: &ExprInfo, line: usize) -> SemaResult<TypeSig> {
        let generic = self.is_generic_name(&lhs.sig.type_name) || self.is_generic_name(&rhs.sig.type_name);
        let result = if generic {
            Some(lhs.sig.clone())
        } else if op.is_relation() {
            comparable(&lhs.sig, &rhs.sig).then(|| TypeSig::new("bool", 0))
        } else if op.is_logical() {
            (lhs.sig.accepts(&rhs.sig) && matches!(lhs.sig.type_name.as_str(), "bool" | "bit"))
                .then(|| lhs.sig.clone())
        } else if op == BinaryOp::Concat {
            match (lhs.sig.type_name.as_str(), rhs.sig.type_name.as_str()) {
                ("bit", "bit") => Some(TypeSig::new("bit", 1)),
                ("str", "str") => Some(TypeSig::new("str", 0)),
                _ => None,
            }
        } else {
            arithmetic_sig(lhs, rhs)
        };

        result.ok_or_else(|| {
            SemaError::mismatch(
                line,
                format!("operator '{}'", op.symbol()),
                format!("operands compatible with {}", lhs.sig),
                &rhs.sig,
            )
        })
    }

    fn visit_unary(&mut self, unary: &mut UnaryExpr) -> SemaResult<ExprInfo> {
        let line = unary.line;
        let operand = self.visit_expr(&mut unary.operand)?;
        let valid = match unary.op {
            UnaryOp::Not => matches!(operand.sig.type_name.as_str(), "bool" | "bit"),
            UnaryOp::Plus | UnaryOp::Neg => {
                is_numeric(&operand.sig) || operand.sig.type_name == "bit"
            }
        };
        if !valid && !self.is_generic_name(&operand.sig.type_name) {
            return Err(SemaError::mismatch(line, "unary operator", "a matching operand", &operand.sig));
        }

        let mut info = ExprInfo::new(operand.sig.clone());
        if let Some(value) = &operand.value {
            info.value =
                Some(eval_unary(unary.op, value).map_err(|error| SemaError::Eval { line, error })?);
        }
        info.is_const = operand.is_const;
        Ok(info)
    }

    // Calls

    /// Resolve a call by its overload key, falling back to the overload
    /// family of the base name
    fn resolve_call(
        &mut self,
        scope: ScopeId,
        recursive: bool,
        call: &mut FuncCall,
        receiver: Option<ArgSig>,
    ) -> SemaResult<ExprInfo> {
        let line = call.line;
        for generic in &call.generics {
            self.resolve_type_ref(generic, line)?;
        }

        let mut args: Vec<ArgSig> = receiver.into_iter().collect();
        for arg in &mut call.args {
            args.push(self.visit_expr(arg)?.arg());
        }

        let key = overload_key(
            &call.name,
            args.iter().map(|a| (a.sig.type_name.as_str(), a.sig.dim)),
        );
        let candidates = match self
            .table
            .lookup(scope, &key, KindFilter::Set(CALLABLE_KINDS), recursive)
        {
            Some(id) => vec![id],
            None => self.overload_family(scope, recursive, &call.name),
        };
        if candidates.is_empty() {
            return Err(SemaError::not_found(line, "function", &call.name));
        }

        let mut type_error = None;
        let mut arities = Vec::new();
        for id in &candidates {
            let symbol = self.table.symbol(*id);
            let empty = ParamList::new(&symbol.name);
            let params = symbol.params.as_ref().unwrap_or(&empty);
            match params.bind(&args) {
                Ok(values) => {
                    trace!("call '{}' resolved to {:?}", key, symbol.as_function().map(|f| &f.overload_keys));
                    return self.call_result(*id, &args, values, line);
                }
                Err(error @ SymbolError::ArgType { .. }) if type_error.is_none() => {
                    type_error = Some(error)
                }
                Err(_) => {}
            }
            arities.push(if params.required() == params.len() {
                params.len().to_string()
            } else {
                format!("{} to {}", params.required(), params.len())
            });
        }

        match type_error {
            Some(error) => Err(SemaError::symbol(line, error)),
            None => Err(SemaError::Arity {
                line,
                context: format!("call to '{}'", call.name),
                expected: arities.join(" or "),
                found: args.len(),
            }),
        }
    }

    /// Callables whose base name is `base`, nearest scope first
    fn overload_family(&self, scope: ScopeId, recursive: bool, base: &str) -> Vec<SymbolId> {
        let matches = |symbol: &Symbol| symbol.as_function().is_some_and(|f| f.base_name == base);
        let ids: IndexSet<SymbolId> = if recursive {
            self.table
                .find(scope, |_, symbol| matches(symbol))
                .into_iter()
                .map(|(_, id)| id)
                .collect()
        } else {
            self.table
                .get(scope)
                .map(|s| {
                    s.entries()
                        .map(|(_, id)| id)
                        .filter(|id| matches(self.table.symbol(*id)))
                        .collect()
                })
                .unwrap_or_default()
        };
        ids.into_iter().collect()
    }

    fn call_result(
        &self,
        id: SymbolId,
        args: &[ArgSig],
        values: Vec<Option<ConstValue>>,
        line: usize,
    ) -> SemaResult<ExprInfo> {
        let symbol = self.table.symbol(id);
        let Some(func) = symbol.as_function() else {
            return Err(SemaError::Internal(format!("'{}' is not callable", symbol.name)));
        };

        // A generic return type takes the type of the argument bound to it
        let generic_scope = symbol.scope;
        let returns: Vec<TypeSig> = func
            .returns
            .iter()
            .map(|ret| {
                let is_generic = generic_scope
                    .and_then(|s| self.table.lookup(s, &ret.type_name, SymbolKind::Generic.into(), false))
                    .is_some();
                let bound = symbol
                    .params
                    .as_ref()
                    .and_then(|p| p.params.iter().position(|p| p.type_name == ret.type_name))
                    .and_then(|position| args.get(position));
                match (is_generic, bound) {
                    (true, Some(arg)) => TypeSig::new(arg.sig.type_name.clone(), ret.dim),
                    _ => ret.clone(),
                }
            })
            .collect();

        let mut info = match returns.as_slice() {
            [] => ExprInfo::new(TypeSig::new("void", 0)),
            [single] => ExprInfo::new(single.clone()),
            many => {
                let mut info = ExprInfo::new(TypeSig::new("tuple", 0));
                info.parts = many.to_vec();
                info
            }
        };

        if func.builtin && values.iter().all(Option::is_some) {
            let args: Vec<ConstValue> = values.into_iter().flatten().collect();
            if let Some(folded) = eval_builtin(&func.base_name, &args) {
                info.value = Some(folded.map_err(|error| SemaError::Eval { line, error })?);
                info.is_const = true;
            }
        }
        Ok(info)
    }
}

fn is_numeric(sig: &TypeSig) -> bool {
    sig.dim == 0 && (is_integer_type(&sig.type_name) || sig.type_name == "float")
}

/// Whether two operands may be compared
fn comparable(lhs: &TypeSig, rhs: &TypeSig) -> bool {
    let vector_and_int = |a: &TypeSig, b: &TypeSig| a.type_name == "bit" && a.dim == 1 && is_numeric(b);
    lhs.accepts(rhs)
        || (is_numeric(lhs) && is_numeric(rhs))
        || vector_and_int(lhs, rhs)
        || vector_and_int(rhs, lhs)
}

/// Result type of an arithmetic operator, `None` when undefined
fn arithmetic_sig(lhs: &ExprInfo, rhs: &ExprInfo) -> Option<TypeSig> {
    let (a, b) = (&lhs.sig, &rhs.sig);
    let integer = |s: &TypeSig| s.dim == 0 && is_integer_type(&s.type_name);
    let vector = |s: &TypeSig| s.dim >= 1 && s.type_name == "bit";

    if integer(a) && integer(b) {
        // A literal operand adopts the other side's type
        Some(if lhs.is_const && !rhs.is_const { b.clone() } else { a.clone() })
    } else if is_numeric(a) && is_numeric(b) {
        Some(TypeSig::new("float", 0))
    } else if vector(a) && (integer(b) || a == b) {
        Some(a.clone())
    } else if vector(b) && integer(a) {
        Some(b.clone())
    } else if a.type_name == "time" && is_numeric(b) {
        Some(a.clone())
    } else if a == &TypeSig::new("time", 0) && b == a {
        Some(a.clone())
    } else {
        None
    }
}

fn statement_line(statement: &Statement) -> usize {
    match statement {
        Statement::Assign(s) => s.line,
        Statement::Decl(s) => s.line,
        Statement::ModuleInst(s) => s.line,
        Statement::Process(s) => s.line,
        Statement::For(s) => s.line,
        Statement::If(s) => s.line,
        Statement::Case(s) => s.line,
        Statement::Rename(s) => s.line,
        Statement::Assert(s) => s.line,
        Statement::Report(s) => s.line,
        Statement::Return(s) => s.line,
        Statement::Call(s) => s.line,
    }
}
