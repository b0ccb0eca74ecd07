//! Command implementations and the resolve pipeline they share.

pub mod bundle;
pub mod deps;
pub mod init;
pub mod load;

use crate::output::StyledOutput;
use anyhow::Context;
use luapack_engine::{
    find_project_root, ProjectManifest, ProjectStructure, Resolver, SearchPath, SkipReason,
    MANIFEST_FILE,
};
use std::path::{Path, PathBuf};

/// Options for commands that resolve a project
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Extra directory to search for modules (repeatable)
    #[arg(short = 'I', long = "include", value_name = "ROOT")]
    pub include: Vec<PathBuf>,

    /// Report requires that were left to the runtime
    #[arg(short, long)]
    pub verbose: bool,
}

/// An entry script together with its resolved dependencies
pub struct Project {
    pub entry: PathBuf,
    pub source: String,
    pub structure: ProjectStructure,
}

/// Read the entry script and resolve everything it requires.
pub fn resolve_project(
    out: &mut StyledOutput,
    entry: PathBuf,
    args: &ResolveArgs,
) -> anyhow::Result<Project> {
    let source = std::fs::read_to_string(&entry)
        .with_context(|| format!("Cannot read {}", entry.display()))?;

    out.progress("Parsing project structure...");

    let resolver = Resolver::new(search_path(&entry, &args.include)?);
    let structure = resolver.resolve_entry(&source, &entry)?;

    if args.verbose {
        report_skipped(out, &structure);
    }

    Ok(Project {
        entry,
        source,
        structure,
    })
}

/// Manifest settings for the entry's project, then `-I` roots.
fn search_path(entry: &Path, include: &[PathBuf]) -> anyhow::Result<SearchPath> {
    let entry_dir = entry.parent().unwrap_or(entry);

    let mut search_path = match find_project_root(entry_dir) {
        Some(root) => {
            let manifest_path = root.join(MANIFEST_FILE);
            ProjectManifest::from_file(&manifest_path)
                .with_context(|| format!("Cannot load {}", manifest_path.display()))?
                .search_path(&root)
        }
        None => SearchPath::default(),
    };

    let cwd = std::env::current_dir()?;
    for root in include {
        search_path = search_path.with_root(cwd.join(root));
    }

    Ok(search_path)
}

fn report_skipped(out: &mut StyledOutput, structure: &ProjectStructure) {
    for skipped in structure.skipped() {
        let location = format!("{}:{}", skipped.referrer.display(), skipped.span);
        let message = match &skipped.reason {
            SkipReason::Dynamic => format!("dynamic require at {}", location),
            SkipReason::NotFound { name, .. } => {
                format!("{:?} has no local file, required at {}", name, location)
            }
        };
        out.warning("Skipped", &message);
    }
}

/// Write generated code to `output`, or to stdout when none is given.
pub fn write_output(
    out: &mut StyledOutput,
    code: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, code)
                .with_context(|| format!("Cannot write {}", path.display()))?;
            out.status("Wrote", &path.display().to_string());
        }
        None => {
            out.plain(code);
            out.flush();
        }
    }
    Ok(())
}
