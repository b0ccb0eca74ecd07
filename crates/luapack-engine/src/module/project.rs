//! Project structure resolution
//!
//! Walks `require` calls from an entry script, locating and reading every
//! local module it reaches, then orders them dependencies-first.
//!
//! The walk is depth-first over an explicit stack of frames, one per file
//! being scanned, so deep projects cannot overflow the call stack. Modules
//! are stored in the graph's arena and keyed by absolute path.

use super::graph::{GraphError, ModuleGraph, ModuleId};
use super::record::{ModuleRecord, ModuleReference, ProjectStructure, SkipReason, SkippedReference};
use super::resolver::{LocateError, ModuleResolver, SearchPath};
use luapack_parser::{scan_requires, ModuleSpec, RequireCall, Span};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Placeholder path for an entry script whose location is unknown
pub const ENTRY_LABEL: &str = "<entry>";

/// Errors that abort resolution. Nothing is bundled when one occurs.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// A module transitively requires itself
    #[error("Circular dependency detected: {}", format_cycle(.cycle))]
    CycleDetected { cycle: Vec<PathBuf> },

    /// A module file exists but cannot be read
    #[error("Cannot read module {}: {source}", .path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A literal module name that cannot name a file
    #[error("Malformed module name {name:?} in {}", .referrer.display())]
    MalformedModuleName { name: String, referrer: PathBuf },

    /// One name resolved to two different files
    #[error(
        "Module name {name:?} refers to both {} and {}",
        .first.display(),
        .second.display()
    )]
    ConflictingModuleName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

fn format_cycle(cycle: &[PathBuf]) -> String {
    cycle
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Resolve the project reachable from `source` with the default search path.
///
/// `base_dir` is the directory containing the entry script.
pub fn resolve(source: &str, base_dir: &Path) -> Result<ProjectStructure, ResolveError> {
    Resolver::default().resolve(source, base_dir)
}

/// Project structure resolver
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    locator: ModuleResolver,
}

impl Resolver {
    /// Create a resolver with an explicit search path
    pub fn new(search_path: SearchPath) -> Self {
        Self {
            locator: ModuleResolver::new(search_path),
        }
    }

    pub fn search_path(&self) -> &SearchPath {
        self.locator.search_path()
    }

    /// Resolve from entry text whose file location is unknown.
    pub fn resolve(&self, source: &str, base_dir: &Path) -> Result<ProjectStructure, ResolveError> {
        Walk::new(&self.locator).run(source, base_dir, PathBuf::from(ENTRY_LABEL))
    }

    /// Resolve from entry text read from `entry_path`.
    ///
    /// Knowing the path lets a module that requires the entry script back be
    /// reported as a cycle instead of being bundled as a separate copy.
    pub fn resolve_entry(
        &self,
        source: &str,
        entry_path: &Path,
    ) -> Result<ProjectStructure, ResolveError> {
        let path = canonicalize(entry_path)?;
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Walk::new(&self.locator).run(source, &base_dir, path)
    }

    /// Read the entry script from disk and resolve it.
    pub fn resolve_file(&self, entry_path: &Path) -> Result<ProjectStructure, ResolveError> {
        let source = read_module(entry_path)?;
        self.resolve_entry(&source, entry_path)
    }
}

fn canonicalize(path: &Path) -> Result<PathBuf, ResolveError> {
    path.canonicalize().map_err(|source| ResolveError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })
}

fn read_module(path: &Path) -> Result<String, ResolveError> {
    std::fs::read_to_string(path).map_err(|source| ResolveError::UnreadableFile {
        path: path.to_path_buf(),
        source,
    })
}

/// A file whose requires are being processed
struct Frame {
    id: ModuleId,
    path: PathBuf,
    dir: PathBuf,
    calls: std::vec::IntoIter<RequireCall>,
}

impl Frame {
    fn new(id: ModuleId, path: PathBuf, dir: PathBuf, source: &str) -> Self {
        Self {
            id,
            path,
            dir,
            calls: scan_requires(source).into_iter(),
        }
    }
}

/// Discovered module data, indexed in step with the graph arena
struct Discovered {
    name: String,
    aliases: Vec<String>,
    source: String,
    references: Vec<ModuleReference>,
}

/// State of one resolution run
struct Walk<'a> {
    locator: &'a ModuleResolver,
    graph: ModuleGraph,
    /// `None` for the entry script
    modules: Vec<Option<Discovered>>,
    entry_references: Vec<ModuleReference>,
    names: FxHashMap<String, ModuleId>,
    skipped: Vec<SkippedReference>,
}

impl<'a> Walk<'a> {
    fn new(locator: &'a ModuleResolver) -> Self {
        Self {
            locator,
            graph: ModuleGraph::new(),
            modules: Vec::new(),
            entry_references: Vec::new(),
            names: FxHashMap::default(),
            skipped: Vec::new(),
        }
    }

    fn run(
        mut self,
        source: &str,
        base_dir: &Path,
        entry: PathBuf,
    ) -> Result<ProjectStructure, ResolveError> {
        let entry_id = self.graph.add_module(entry.clone());
        self.modules.push(None);

        let mut stack = vec![Frame::new(entry_id, entry.clone(), base_dir.to_path_buf(), source)];

        while let Some(frame) = stack.last_mut() {
            let Some(call) = frame.calls.next() else {
                stack.pop();
                continue;
            };
            let from = frame.id;
            let referrer = frame.path.clone();
            let dir = frame.dir.clone();

            let name = match call.spec {
                ModuleSpec::Literal(name) => name,
                ModuleSpec::Dynamic => {
                    self.skipped.push(SkippedReference {
                        referrer,
                        span: call.span,
                        reason: SkipReason::Dynamic,
                    });
                    continue;
                }
            };

            let path = match self.locator.resolve(&name, &dir) {
                Ok(resolved) => resolved.path,
                Err(LocateError::ModuleNotFound { name, tried }) => {
                    self.skipped.push(SkippedReference {
                        referrer,
                        span: call.span,
                        reason: SkipReason::NotFound { name, tried },
                    });
                    continue;
                }
                Err(LocateError::MalformedName(name)) => {
                    return Err(ResolveError::MalformedModuleName { name, referrer });
                }
                Err(LocateError::Canonicalize { path, source }) => {
                    return Err(ResolveError::UnreadableFile { path, source });
                }
            };

            self.record_reference(from, &name, &referrer, call.span);

            let id = match self.graph.lookup(&path) {
                Some(id) => {
                    self.add_alias(id, &name);
                    id
                }
                None => {
                    let source = read_module(&path)?;
                    let id = self.graph.add_module(path.clone());
                    let module_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                    stack.push(Frame::new(id, path.clone(), module_dir, &source));
                    self.modules.push(Some(Discovered {
                        name: name.clone(),
                        aliases: Vec::new(),
                        source,
                        references: Vec::new(),
                    }));
                    id
                }
            };

            self.claim_name(name, id)?;
            self.graph.add_dependency(from, id);
        }

        self.finish(entry_id, entry)
    }

    fn record_reference(&mut self, from: ModuleId, name: &str, referrer: &Path, span: Span) {
        let reference = ModuleReference {
            name: name.to_string(),
            referrer: referrer.to_path_buf(),
            span,
        };
        match &mut self.modules[from.index()] {
            Some(module) => module.references.push(reference),
            None => self.entry_references.push(reference),
        }
    }

    fn add_alias(&mut self, id: ModuleId, name: &str) {
        if let Some(module) = &mut self.modules[id.index()] {
            if module.name != name && !module.aliases.iter().any(|a| a == name) {
                module.aliases.push(name.to_string());
            }
        }
    }

    /// Each logical name may only ever mean one file within a project.
    fn claim_name(&mut self, name: String, id: ModuleId) -> Result<(), ResolveError> {
        match self.names.get(&name) {
            Some(&owner) if owner != id => Err(ResolveError::ConflictingModuleName {
                name,
                first: self.graph.path(owner).to_path_buf(),
                second: self.graph.path(id).to_path_buf(),
            }),
            Some(_) => Ok(()),
            None => {
                self.names.insert(name, id);
                Ok(())
            }
        }
    }

    fn finish(mut self, entry_id: ModuleId, entry: PathBuf) -> Result<ProjectStructure, ResolveError> {
        let order = self.graph.topological_order().map_err(|err| match err {
            GraphError::CircularDependency(ids) => ResolveError::CycleDetected {
                cycle: ids
                    .into_iter()
                    .map(|id| self.graph.path(id).to_path_buf())
                    .collect(),
            },
        })?;

        let modules = order
            .into_iter()
            .filter(|&id| id != entry_id)
            .filter_map(|id| {
                let discovered = self.modules[id.index()].take()?;
                Some(ModuleRecord {
                    path: self.graph.path(id).to_path_buf(),
                    name: discovered.name,
                    aliases: discovered.aliases,
                    source: discovered.source,
                    references: discovered.references,
                })
            })
            .collect();

        Ok(ProjectStructure::new(
            entry,
            self.entry_references,
            modules,
            self.skipped,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) -> PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn names(structure: &ProjectStructure) -> Vec<&str> {
        structure.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_no_dependencies() {
        let temp = TempDir::new().unwrap();

        let structure = resolve("print('hello')", temp.path()).unwrap();

        assert!(structure.is_empty());
        assert!(structure.skipped().is_empty());
        assert_eq!(structure.entry(), Path::new(ENTRY_LABEL));
    }

    #[test]
    fn test_chain_is_dependencies_first() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.lua", "local b = require('b')\nreturn {}");
        write(temp.path(), "b.lua", "local c = require('c')\nreturn {}");
        write(temp.path(), "c.lua", "return {}");

        let structure = resolve("require 'a'", temp.path()).unwrap();

        assert_eq!(names(&structure), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_records_carry_source_and_references() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "a.lua", "local b = require('b')\nreturn b");
        write(temp.path(), "b.lua", "return 42");

        let structure = resolve("require 'a'", temp.path()).unwrap();
        let record = structure.get(&a.canonicalize().unwrap()).unwrap();

        assert_eq!(record.source, "local b = require('b')\nreturn b");
        assert_eq!(record.references.len(), 1);
        assert_eq!(record.references[0].name, "b");
        assert_eq!(record.references[0].referrer, record.path);
        assert_eq!(record.references[0].span.line, 1);
        assert_eq!(structure.entry_references()[0].name, "a");
    }

    #[test]
    fn test_nested_module_resolves_from_its_own_directory() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/init.lua", "return require('helpers')");
        write(temp.path(), "lib/helpers.lua", "return {}");

        let structure = resolve("require 'lib'", temp.path()).unwrap();

        assert_eq!(names(&structure), vec!["helpers", "lib"]);
    }

    #[test]
    fn test_alias_for_same_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "lib/util.lua", "return {}");
        write(temp.path(), "lib/other.lua", "return require('util')");

        let source = "require 'lib.util'\nrequire 'lib.other'";
        let structure = resolve(source, temp.path()).unwrap();

        assert_eq!(names(&structure), vec!["lib.util", "lib.other"]);
        assert_eq!(structure.modules()[0].aliases, vec!["util".to_string()]);
    }

    #[test]
    fn test_conflicting_name() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "util.lua", "return 1");
        write(temp.path(), "lib/util.lua", "return 2");
        write(temp.path(), "lib/a.lua", "return require('util')");

        let result = resolve("require 'util'\nrequire 'lib.a'", temp.path());

        assert!(matches!(
            result,
            Err(ResolveError::ConflictingModuleName { ref name, .. }) if name == "util"
        ));
    }

    #[test]
    fn test_cycle_detected() {
        let temp = TempDir::new().unwrap();
        let a = write(temp.path(), "a.lua", "require 'b'");
        let b = write(temp.path(), "b.lua", "require 'a'");

        match resolve("require 'a'", temp.path()) {
            Err(ResolveError::CycleDetected { cycle }) => {
                let a = a.canonicalize().unwrap();
                let b = b.canonicalize().unwrap();
                assert_eq!(cycle, vec![a.clone(), b, a]);
            }
            other => panic!("Expected CycleDetected, got {:?}", other),
        }
    }

    #[test]
    fn test_cycle_through_known_entry() {
        let temp = TempDir::new().unwrap();
        let main = write(temp.path(), "main.lua", "require 'a'");
        write(temp.path(), "a.lua", "require 'main'");

        let result = Resolver::default().resolve_file(&main);

        assert!(matches!(result, Err(ResolveError::CycleDetected { .. })));
    }

    #[test]
    fn test_skipped_references() {
        let temp = TempDir::new().unwrap();

        let structure = resolve("require(name)\nrequire 'json'", temp.path()).unwrap();

        assert!(structure.is_empty());
        assert_eq!(structure.skipped().len(), 2);
        assert_eq!(structure.skipped()[0].reason, SkipReason::Dynamic);
        assert!(matches!(
            &structure.skipped()[1].reason,
            SkipReason::NotFound { name, .. } if name == "json"
        ));
    }

    #[test]
    fn test_malformed_name() {
        let temp = TempDir::new().unwrap();

        let result = resolve("require ''", temp.path());

        assert!(matches!(
            result,
            Err(ResolveError::MalformedModuleName { ref referrer, .. })
                if referrer == Path::new(ENTRY_LABEL)
        ));
    }

    #[test]
    fn test_unreadable_file() {
        let temp = TempDir::new().unwrap();
        // Not valid UTF-8, so it exists but cannot be read as source
        fs::write(temp.path().join("bin.lua"), [0xff, 0xfe, 0x00]).unwrap();

        let result = resolve("require 'bin'", temp.path());

        assert!(matches!(result, Err(ResolveError::UnreadableFile { .. })));
    }

    #[test]
    fn test_error_messages() {
        let err = ResolveError::CycleDetected {
            cycle: vec![
                PathBuf::from("/p/a.lua"),
                PathBuf::from("/p/b.lua"),
                PathBuf::from("/p/a.lua"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Circular dependency detected: /p/a.lua -> /p/b.lua -> /p/a.lua"
        );
    }
}
