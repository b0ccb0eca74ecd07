//! Module path resolution
//!
//! Maps a logical module name (`"lib.util"`) to a file on disk using an
//! explicit search path. Nothing here reads the process working directory:
//! every candidate is built from the directory passed in by the caller.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while locating a module
#[derive(Debug, Error)]
pub enum LocateError {
    /// No candidate file exists
    #[error("Module not found: {name} (tried: {tried:?})")]
    ModuleNotFound { name: String, tried: Vec<PathBuf> },

    /// The name cannot be turned into a relative path
    #[error("Malformed module name: {0:?}")]
    MalformedName(String),

    /// A candidate exists but its absolute path cannot be determined
    #[error("Failed to canonicalize {}: {source}", .path.display())]
    Canonicalize {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Templates tried by default, in order
pub const DEFAULT_TEMPLATES: [&str; 2] = ["?.lua", "?/init.lua"];

/// Where to look for a module.
///
/// Each template has its `?` replaced by the module name with dots turned
/// into path separators. Templates are tried first under the directory of
/// the requiring file, then under every extra root in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPath {
    templates: Vec<String>,
    roots: Vec<PathBuf>,
}

impl Default for SearchPath {
    fn default() -> Self {
        Self {
            templates: DEFAULT_TEMPLATES.iter().map(ToString::to_string).collect(),
            roots: Vec::new(),
        }
    }
}

impl SearchPath {
    /// Create a search path from templates and extra roots
    pub fn new(templates: Vec<String>, roots: Vec<PathBuf>) -> Self {
        Self { templates, roots }
    }

    /// Append an extra root directory
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// All candidate files for `name` required from a file in `from_dir`,
    /// in the order they are tried.
    ///
    /// Relative roots are taken relative to `from_dir`.
    pub fn candidates(&self, name: &str, from_dir: &Path) -> Result<Vec<PathBuf>, LocateError> {
        let relative = module_relative_path(name)?;
        let relative = relative.as_str();

        let dirs = std::iter::once(from_dir.to_path_buf())
            .chain(self.roots.iter().map(|root| from_dir.join(root)));

        Ok(dirs
            .flat_map(|dir| {
                self.templates
                    .iter()
                    .map(move |template| dir.join(template.replace('?', relative)))
            })
            .collect())
    }
}

/// Turn `a.b.c` into `a/b/c` (platform separator).
///
/// Empty components (leading, trailing or doubled dots), NUL bytes, blank
/// names and rooted names are rejected so a name can never escape to an
/// absolute path.
fn module_relative_path(name: &str) -> Result<String, LocateError> {
    let malformed = || LocateError::MalformedName(name.to_string());

    if name.trim().is_empty() || name.contains('\0') || name.starts_with(['/', '\\']) {
        return Err(malformed());
    }

    let components: Vec<&str> = name.split('.').collect();
    if components.iter().any(|c| c.is_empty()) {
        return Err(malformed());
    }

    Ok(components.join(std::path::MAIN_SEPARATOR_STR))
}

/// A located module file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Absolute, canonical path to the module file
    pub path: PathBuf,
    /// Whether this was resolved from a package `init.lua`
    pub is_index: bool,
}

/// Module resolver for `require` names
#[derive(Debug, Clone, Default)]
pub struct ModuleResolver {
    search_path: SearchPath,
}

impl ModuleResolver {
    /// Create a new module resolver
    pub fn new(search_path: SearchPath) -> Self {
        Self { search_path }
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// Resolve a module name required from a file in `from_dir`
    ///
    /// # Resolution Order
    /// For `require "lib.util"` with the default search path:
    /// 1. Try `<from_dir>/lib/util.lua`
    /// 2. Try `<from_dir>/lib/util/init.lua`
    /// 3. The same two under every extra root
    pub fn resolve(&self, name: &str, from_dir: &Path) -> Result<ResolvedModule, LocateError> {
        let candidates = self.search_path.candidates(name, from_dir)?;

        match candidates.iter().find(|candidate| candidate.is_file()) {
            Some(found) => Ok(ResolvedModule {
                path: self.canonicalize(found)?,
                is_index: found.file_name().is_some_and(|f| f == "init.lua"),
            }),
            None => Err(LocateError::ModuleNotFound {
                name: name.to_string(),
                tried: candidates,
            }),
        }
    }

    /// Canonicalize a path to absolute form
    fn canonicalize(&self, path: &Path) -> Result<PathBuf, LocateError> {
        path.canonicalize().map_err(|source| LocateError::Canonicalize {
            path: path.to_path_buf(),
            source,
        })
    }
}
