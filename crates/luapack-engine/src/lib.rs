//! Luapack engine
//!
//! Resolves the local `require` dependencies of a Lua entry script and turns
//! them into a preamble that preloads every module into `package.loaded`:
//! - [`Resolver`] walks the project and produces a [`ProjectStructure`]
//! - [`bundle`] emits the preamble for a structure
//! - [`assemble`] joins a preamble with the entry script
//! - [`ProjectManifest`] reads `luapack.toml` project settings
//!
//! Nothing in this crate prints; callers decide how to report.

pub mod manifest;
pub mod module;

pub use manifest::{find_project_root, ManifestError, ProjectManifest, MANIFEST_FILE};
pub use module::{
    assemble, bundle, resolve, AssembledChunk, ModuleRecord, ModuleReference, ProjectStructure,
    ResolveError, Resolver, SearchPath, SkipReason, SkippedReference,
};
