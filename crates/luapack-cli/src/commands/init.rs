//! `luapack init`: Write a default luapack.toml.

use crate::output::StyledOutput;
use anyhow::{bail, Context};
use luapack_engine::{ProjectManifest, MANIFEST_FILE};
use std::path::PathBuf;

pub fn execute(out: &mut StyledOutput, path: PathBuf, name: Option<String>) -> anyhow::Result<()> {
    std::fs::create_dir_all(&path)
        .with_context(|| format!("Cannot create {}", path.display()))?;

    let manifest_path = path.join(MANIFEST_FILE);
    if manifest_path.exists() {
        bail!("{} already exists in {}", MANIFEST_FILE, path.display());
    }

    let name = match name {
        Some(name) => name,
        None => path
            .canonicalize()?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string()),
    };

    ProjectManifest::new(name).to_file(&manifest_path)?;
    out.status("Created", &manifest_path.display().to_string());
    Ok(())
}
