//! FDL compiler front end
//!
//! Drives source text through the lexer, parser and semantic analyzer:
//!
//! ```no_run
//! use fdl::Compilation;
//!
//! let mut compilation = Compilation::from_project(std::path::Path::new("."))?;
//! compilation.add_file("top.fdl")?;
//! let analysis = compilation.run()?;
//! println!("{} symbols", analysis.table().symbol_count());
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use fdl_frontend::{parse, GrammarConfig, SourceFile};
use fdl_resolve::{SymbolId, SymbolTable};
use fdl_sema::{Analyzer, BuiltinCatalog, ModuleResolver};
use log::{debug, info};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

pub use fdl_frontend as frontend;
pub use fdl_resolve as resolve;
pub use fdl_sema as sema;
pub use fdl_sema::{ErrorKind, SemaError};

/// A source handed to the compilation before [`Compilation::run`]
#[derive(Debug, Clone)]
struct Source {
    name: String,
    text: String,
}

/// One run of the front end over a set of root sources
#[derive(Debug, Clone)]
pub struct Compilation {
    grammar: GrammarConfig,
    catalog: BuiltinCatalog,
    resolver: ModuleResolver,
    sources: Vec<Source>,
}

impl Compilation {
    pub fn new(resolver: ModuleResolver) -> Self {
        Self {
            grammar: GrammarConfig::default(),
            catalog: BuiltinCatalog::standard(),
            resolver,
            sources: Vec::new(),
        }
    }

    /// Compilation whose imports resolve against the project at `root_dir`
    pub fn from_project(root_dir: &Path) -> Result<Self> {
        let resolver = ModuleResolver::from_project(root_dir)
            .with_context(|| format!("failed to set up project {}", root_dir.display()))?;
        Ok(Self::new(resolver))
    }

    pub fn with_grammar(mut self, grammar: GrammarConfig) -> Self {
        self.grammar = grammar;
        self
    }

    pub fn with_catalog(mut self, catalog: BuiltinCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    /// Add an in-memory root source
    pub fn add_source(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.sources.push(Source {
            name: name.into(),
            text: text.into(),
        });
    }

    /// Read a root source from disk
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.add_source(path.display().to_string(), text);
        Ok(())
    }

    /// Parse every root source, load the libraries they import and analyze
    /// the roots in the order they were added
    pub fn run(self) -> Result<Analysis> {
        info!("compiling {} source(s)", self.sources.len());

        let mut files = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            files.push(self.parse_source(&source.name, &source.text)?);
        }

        let mut analyzer = Analyzer::new(&self.catalog, self.resolver.clone())
            .context("failed to seed builtin symbols")?;

        let mut pending = VecDeque::new();
        for file in &files {
            pending.extend(
                analyzer
                    .pre_process(file)
                    .with_context(|| format!("failed to resolve imports of {}", file.name))?,
            );
        }

        let mut loaded = HashSet::new();
        while let Some(dependency) = pending.pop_front() {
            if !loaded.insert(dependency.key.clone()) {
                continue;
            }
            let ast = self.load_library(&dependency.path).with_context(|| {
                format!(
                    "while loading '{}' imported at line {}",
                    dependency.key, dependency.line
                )
            })?;
            pending.extend(
                analyzer
                    .pre_process(&ast)
                    .with_context(|| format!("failed to resolve imports of {}", ast.name))?,
            );
            analyzer.add_library(dependency.key, dependency.path, ast);
        }
        debug!("loaded {} librar(y/ies)", loaded.len());

        for file in files.iter_mut() {
            analyzer
                .process(file)
                .with_context(|| format!("analysis of {} failed", file.name))?;
        }

        info!("analysis finished");
        Ok(Analysis { analyzer, files })
    }

    fn parse_source(&self, name: &str, text: &str) -> Result<SourceFile> {
        debug!("parsing {}", name);
        parse(text, &self.grammar, name)
            .map_err(SemaError::from)
            .with_context(|| format!("failed to parse {}", name))
    }

    fn load_library(&self, path: &PathBuf) -> Result<SourceFile> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.parse_source(&path.display().to_string(), &text)
    }
}

/// Result of a successful [`Compilation::run`]
#[derive(Debug)]
pub struct Analysis {
    analyzer: Analyzer,
    files: Vec<SourceFile>,
}

impl Analysis {
    pub fn table(&self) -> &SymbolTable {
        self.analyzer.table()
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Root sources after analysis, with bounds and generics folded in place
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Look up a dotted name such as `Counter.count` from the global scope
    pub fn lookup(&self, path: &str) -> Option<SymbolId> {
        self.analyzer.lookup(path)
    }

    pub fn into_table(self) -> SymbolTable {
        self.analyzer.into_table()
    }
}

/// Classification of a compilation failure, if it came from the front end
pub fn error_kind(error: &anyhow::Error) -> Option<ErrorKind> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<SemaError>())
        .map(SemaError::kind)
}
