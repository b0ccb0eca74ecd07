//! `luapack bundle`: Write the load preamble on its own.

use super::load::LoadCommand;
use super::{resolve_project, write_output, ResolveArgs};
use crate::output::StyledOutput;
use luapack_engine::bundle;
use std::path::PathBuf;

/// Arguments for the bundle command.
pub struct BundleArgs {
    /// Entry script; the manifest's `project.main` when absent
    pub file: Option<String>,
    pub output: PathBuf,
    pub resolve: ResolveArgs,
}

pub fn execute(out: &mut StyledOutput, args: BundleArgs) -> anyhow::Result<()> {
    let command = LoadCommand::from_arg_or_project(args.file.as_deref(), &std::env::current_dir()?)?;

    out.status("Bundling", &command.file);

    let project = resolve_project(out, command.path, &args.resolve)?;
    if project.structure.is_empty() {
        out.warning("Empty", "no local modules to bundle");
    }

    let preamble = bundle(&project.structure);
    write_output(out, &preamble, Some(&args.output))
}
