//! Import path resolution
//!
//! Maps a dotted import (`lib.bus`) to `<root>/lib/bus.fdl` across an ordered
//! list of search roots. The import must match in exactly one root.

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Source file extension
pub const FDL_EXTENSION: &str = "fdl";

/// Project manifest file read from the project root
pub const MANIFEST_FILE: &str = "fdl.toml";

/// Environment variable holding extra search roots
pub const PATH_VAR: &str = "FDL_PATH";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("empty import path")]
    Empty,

    #[error("'{key}' not found in any of {searched} search paths")]
    Missing { key: String, searched: usize },

    #[error("'{key}' is ambiguous, found at {}", format_paths(.candidates))]
    Ambiguous {
        key: String,
        candidates: Vec<PathBuf>,
    },

    #[error("'{key}' was never loaded")]
    NotLoaded { key: String },
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `fdl.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectManifest {
    #[serde(default)]
    pub build: BuildSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildSection {
    /// Source directories relative to the project root
    #[serde(default)]
    pub src_dirs: Vec<PathBuf>,
}

/// Resolves import paths against ordered search roots
#[derive(Debug, Clone, Default)]
pub struct ModuleResolver {
    search_paths: Vec<PathBuf>,
}

impl ModuleResolver {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        let mut resolver = Self::default();
        for path in search_paths {
            resolver.add_search_path(path);
        }
        resolver
    }

    /// Search roots for a project: the root itself, the `src_dirs` of its
    /// `fdl.toml` (if present), then every entry of `FDL_PATH`.
    pub fn from_project(root_dir: &Path) -> Result<Self> {
        let mut resolver = Self::new(vec![root_dir.to_path_buf()]);

        let manifest_path = root_dir.join(MANIFEST_FILE);
        if manifest_path.exists() {
            debug!("reading project manifest {}", manifest_path.display());
            let contents = std::fs::read_to_string(&manifest_path)
                .with_context(|| format!("failed to read {}", manifest_path.display()))?;
            let manifest: ProjectManifest = toml::from_str(&contents)
                .with_context(|| format!("invalid manifest {}", manifest_path.display()))?;
            for dir in manifest.build.src_dirs {
                let dir_path = root_dir.join(dir);
                if dir_path.is_dir() {
                    resolver.add_search_path(dir_path);
                } else {
                    debug!("skipping missing src_dir {}", dir_path.display());
                }
            }
        }

        if let Some(paths) = std::env::var_os(PATH_VAR) {
            for path in std::env::split_paths(&paths) {
                resolver.add_search_path(path);
            }
        }

        debug!("module resolver with {} search paths", resolver.search_paths.len());
        Ok(resolver)
    }

    /// Add a search root; roots already present are ignored
    pub fn add_search_path(&mut self, path: PathBuf) {
        if !self.search_paths.contains(&path) {
            self.search_paths.push(path);
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Resolve `a.b.c` to the single `<root>/a/b/c.fdl` that exists
    pub fn resolve(&self, segments: &[String]) -> Result<PathBuf, ResolveError> {
        if segments.is_empty() {
            return Err(ResolveError::Empty);
        }
        let key = segments.join(".");

        let mut candidates: Vec<PathBuf> = self
            .search_paths
            .iter()
            .map(|root| {
                let mut path = root.clone();
                path.extend(segments);
                path.set_extension(FDL_EXTENSION);
                path
            })
            .filter(|path| path.is_file())
            .collect();

        match candidates.len() {
            0 => Err(ResolveError::Missing {
                key,
                searched: self.search_paths.len(),
            }),
            1 => {
                debug!("import '{}' resolved to {}", key, candidates[0].display());
                Ok(candidates.swap_remove(0))
            }
            _ => Err(ResolveError::Ambiguous { key, candidates }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn segments(key: &str) -> Vec<String> {
        key.split('.').map(String::from).collect()
    }

    #[test]
    fn test_resolve_single_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        fs::create_dir(root.join("lib")).unwrap();
        fs::write(root.join("lib/bus.fdl"), "enum S = (a, b)\n").unwrap();

        let resolver = ModuleResolver::new(vec![root.clone()]);
        assert_eq!(resolver.resolve(&segments("lib.bus")).unwrap(), root.join("lib/bus.fdl"));
        assert!(matches!(
            resolver.resolve(&segments("lib.math")),
            Err(ResolveError::Missing { searched: 1, .. })
        ));
        assert_eq!(resolver.resolve(&[]), Err(ResolveError::Empty));
    }

    #[test]
    fn test_duplicate_roots_collapse() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        let resolver = ModuleResolver::new(vec![root.clone(), root]);
        assert_eq!(resolver.search_paths().len(), 1);
    }

    #[test]
    fn test_manifest_src_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        fs::create_dir(root.join("rtl")).unwrap();
        fs::write(
            root.join(MANIFEST_FILE),
            "[build]\nsrc_dirs = [\"rtl\", \"missing\"]\n",
        )
        .unwrap();

        let resolver = ModuleResolver::from_project(&root).unwrap();
        assert_eq!(resolver.search_paths()[0], root);
        assert_eq!(resolver.search_paths()[1], root.join("rtl"));
        assert!(!resolver.search_paths().contains(&root.join("missing")));
    }

    #[test]
    fn test_manifest_must_parse() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(MANIFEST_FILE), "[build\n").unwrap();
        assert!(ModuleResolver::from_project(temp_dir.path()).is_err());
    }
}
