//! Project structure records produced by the resolver

use luapack_parser::Span;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A literal `require` found in a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleReference {
    /// Logical module name as written in the source
    pub name: String,
    /// File containing the `require` call
    pub referrer: PathBuf,
    /// Location of the call in the referrer
    pub span: Span,
}

/// One resolved project file.
///
/// Identity is the absolute path: a file required under several names is a
/// single record with aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleRecord {
    /// Absolute, canonical path
    pub path: PathBuf,
    /// Name the module was first required under
    pub name: String,
    /// Other names that resolved to the same file, in discovery order
    pub aliases: Vec<String>,
    /// Raw source text
    #[serde(skip)]
    pub source: String,
    /// Literal requires inside this module, in source order
    pub references: Vec<ModuleReference>,
}

impl ModuleRecord {
    /// The primary name followed by every alias
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Why a `require` was left for the runtime to handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum SkipReason {
    /// The argument is not a string literal
    Dynamic,
    /// No local file matches; assumed to be provided by the runtime
    NotFound { name: String, tried: Vec<PathBuf> },
}

/// A `require` that imposes no bundling obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedReference {
    pub referrer: PathBuf,
    pub span: Span,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Resolved local modules in dependency order, entry script excluded.
///
/// Only the resolver builds these, which keeps the invariants: every module
/// comes after all modules it requires and no path appears twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectStructure {
    entry: PathBuf,
    entry_references: Vec<ModuleReference>,
    modules: Vec<ModuleRecord>,
    skipped: Vec<SkippedReference>,
}

impl ProjectStructure {
    pub(crate) fn new(
        entry: PathBuf,
        entry_references: Vec<ModuleReference>,
        modules: Vec<ModuleRecord>,
        skipped: Vec<SkippedReference>,
    ) -> Self {
        Self {
            entry,
            entry_references,
            modules,
            skipped,
        }
    }

    /// Entry script path, or a placeholder label when it was not given
    pub fn entry(&self) -> &Path {
        &self.entry
    }

    /// Literal requires found directly in the entry script
    pub fn entry_references(&self) -> &[ModuleReference] {
        &self.entry_references
    }

    /// Modules in dependency order
    pub fn modules(&self) -> &[ModuleRecord] {
        &self.modules
    }

    /// Requires left to the runtime, in discovery order
    pub fn skipped(&self) -> &[SkippedReference] {
        &self.skipped
    }

    /// Find a module by absolute path
    pub fn get(&self, path: &Path) -> Option<&ModuleRecord> {
        self.modules.iter().find(|m| m.path == path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// True when the entry script has no local dependencies
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModuleRecord> {
        self.modules.iter()
    }
}

impl<'a> IntoIterator for &'a ProjectStructure {
    type Item = &'a ModuleRecord;
    type IntoIter = std::slice::Iter<'a, ModuleRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.modules.iter()
    }
}
