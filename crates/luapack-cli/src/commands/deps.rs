//! `luapack deps`: Show the resolved load order.

use super::load::LoadCommand;
use super::{resolve_project, Project, ResolveArgs};
use crate::output::StyledOutput;

/// Arguments for the deps command.
pub struct DepsArgs {
    /// Entry script; the manifest's `project.main` when absent
    pub file: Option<String>,
    pub json: bool,
    pub resolve: ResolveArgs,
}

pub fn execute(out: &mut StyledOutput, args: DepsArgs) -> anyhow::Result<()> {
    let command = LoadCommand::from_arg_or_project(args.file.as_deref(), &std::env::current_dir()?)?;
    let project = resolve_project(out, command.path, &args.resolve)?;

    if args.json {
        out.plain(&serde_json::to_string_pretty(&project.structure)?);
        out.newline();
    } else {
        print_load_order(out, &project);
    }

    out.flush();
    Ok(())
}

fn print_load_order(out: &mut StyledOutput, project: &Project) {
    out.bold(&format!("Load order for {}", project.entry.display()));
    out.newline();

    if project.structure.is_empty() {
        out.dim("  (no local modules)");
        out.newline();
        return;
    }

    let width = project.structure.len().to_string().len();
    for (index, module) in project.structure.iter().enumerate() {
        out.plain(&format!("  {:>width$}. ", index + 1, width = width));
        out.info(&module.name);
        out.plain(" ");
        out.dim(&module.path.display().to_string());
        out.newline();

        if !module.aliases.is_empty() {
            out.plain(&format!("  {:>width$}  ", "", width = width));
            out.dim(&format!("also required as: {}", module.aliases.join(", ")));
            out.newline();
        }
    }
}
