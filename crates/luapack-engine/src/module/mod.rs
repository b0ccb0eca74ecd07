//! Module resolution and bundling
//!
//! This module provides load-preamble generation with:
//! - `require` name resolution over an explicit search path
//! - Module dependency graph construction
//! - Cycle detection
//! - Deterministic dependencies-first ordering
//! - Preamble emission into `package.loaded`

mod bundler;
mod graph;
mod project;
mod record;
mod resolver;

pub use bundler::{assemble, bundle, lua_string, AssembledChunk, LOADED_TABLE};
pub use graph::{GraphError, ModuleGraph, ModuleId, ModuleNode};
pub use project::{resolve, ResolveError, Resolver, ENTRY_LABEL};
pub use record::{ModuleRecord, ModuleReference, ProjectStructure, SkipReason, SkippedReference};
pub use resolver::{LocateError, ModuleResolver, ResolvedModule, SearchPath, DEFAULT_TEMPLATES};
