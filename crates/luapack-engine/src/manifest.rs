//! Project manifest parsing (luapack.toml)
//!
//! The manifest is optional. When present it names the project and tunes
//! how `require` names are searched for.

use crate::module::{SearchPath, DEFAULT_TEMPLATES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the project manifest
pub const MANIFEST_FILE: &str = "luapack.toml";

/// Errors that can occur during manifest parsing
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read or write the manifest file
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to render TOML
    #[error("Failed to serialize manifest: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// Validation error
    #[error("Invalid manifest: {0}")]
    ValidationError(String),
}

/// Project manifest (luapack.toml)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectManifest {
    /// Project metadata
    pub project: ProjectInfo,

    /// Module search settings
    #[serde(default)]
    pub resolve: ResolveConfig,
}

/// Project information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectInfo {
    /// Project name
    pub name: String,

    /// Entry script, relative to the manifest directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
}

/// Where `require` names are looked up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct ResolveConfig {
    /// Path templates, `?` standing for the module path
    #[serde(default = "default_search_path")]
    pub search_path: Vec<String>,

    /// Extra root directories, relative to the manifest directory
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

fn default_search_path() -> Vec<String> {
    DEFAULT_TEMPLATES.iter().map(ToString::to_string).collect()
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            search_path: default_search_path(),
            roots: Vec::new(),
        }
    }
}

impl ProjectManifest {
    /// Create a manifest with default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            project: ProjectInfo {
                name: name.into(),
                main: Some("main.lua".to_string()),
            },
            resolve: ResolveConfig::default(),
        }
    }

    /// Parse a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a manifest from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: ProjectManifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.project.name.trim().is_empty() {
            return Err(ManifestError::ValidationError(
                "Project name cannot be empty".to_string(),
            ));
        }

        if self.resolve.search_path.is_empty() {
            return Err(ManifestError::ValidationError(
                "search-path needs at least one template".to_string(),
            ));
        }

        if let Some(template) = self.resolve.search_path.iter().find(|t| !t.contains('?')) {
            return Err(ManifestError::ValidationError(format!(
                "Invalid search-path template: {:?}. Must contain '?'",
                template
            )));
        }

        Ok(())
    }

    /// Write manifest to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ManifestError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Entry script named by `project.main`, anchored at `manifest_dir`
    pub fn main_path(&self, manifest_dir: &Path) -> Option<PathBuf> {
        self.project.main.as_ref().map(|main| manifest_dir.join(main))
    }

    /// Search path for a manifest located in `manifest_dir`.
    ///
    /// Relative roots are anchored at the manifest directory, not at the
    /// requiring file.
    pub fn search_path(&self, manifest_dir: &Path) -> SearchPath {
        SearchPath::new(
            self.resolve.search_path.clone(),
            self.resolve
                .roots
                .iter()
                .map(|root| manifest_dir.join(root))
                .collect(),
        )
    }
}

/// Find the nearest directory at or above `start_dir` holding a manifest
pub fn find_project_root(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        if current.join(MANIFEST_FILE).is_file() {
            return Some(current.to_path_buf());
        }

        current = current.parent()?;
    }
}
