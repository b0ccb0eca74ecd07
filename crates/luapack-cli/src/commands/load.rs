//! `luapack load`: Prepend the load preamble to an entry script.

use super::{resolve_project, write_output, ResolveArgs};
use crate::output::StyledOutput;
use anyhow::{bail, Context};
use luapack_engine::{assemble, bundle, find_project_root, ProjectManifest, MANIFEST_FILE};
use std::path::{Path, PathBuf};

/// Arguments for the load command.
pub struct LoadArgs {
    /// Entry script; a `.load <file>` line is read from stdin when absent
    pub file: Option<String>,
    pub output: Option<PathBuf>,
    pub resolve: ResolveArgs,
}

/// A validated request to load a Lua file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCommand {
    /// File name as the user wrote it, quotes removed
    pub file: String,
    /// Absolute path of the file
    pub path: PathBuf,
}

impl LoadCommand {
    /// Parse a command line such as `.load "src/main.lua"` against the
    /// current directory.
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        Self::parse_in(line, &std::env::current_dir()?)
    }

    /// Parse a command line, resolving relative names against `cwd`.
    ///
    /// The first word is the command itself; the rest of the line names the
    /// file.
    pub fn parse_in(line: &str, cwd: &Path) -> anyhow::Result<Self> {
        let argument = line
            .trim()
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim())
            .unwrap_or_default();

        if argument.is_empty() {
            bail!("Usage: .load <file.lua>");
        }

        Self::from_arg(argument, cwd)
    }

    /// Validate a file argument, resolving it against `cwd`.
    pub fn from_arg(argument: &str, cwd: &Path) -> anyhow::Result<Self> {
        let file = strip_quotes(argument.trim());

        if !file.ends_with(".lua") {
            bail!(".load requires a *.lua file");
        }

        let path = cwd.join(file);
        if !path.is_file() {
            bail!("file not found: {}", path.display());
        }

        Ok(Self {
            file: file.to_string(),
            path,
        })
    }

    /// Use the `main` entry of the nearest manifest at or above `cwd`.
    pub fn from_project(cwd: &Path) -> anyhow::Result<Self> {
        let Some(root) = find_project_root(cwd) else {
            bail!("no FILE given and no {} found", MANIFEST_FILE);
        };

        let manifest_path = root.join(MANIFEST_FILE);
        let manifest = ProjectManifest::from_file(&manifest_path)
            .with_context(|| format!("Cannot load {}", manifest_path.display()))?;

        match manifest.main_path(&root) {
            Some(main) => Self::from_arg(&main.display().to_string(), cwd),
            None => bail!(
                "no FILE given and {} has no project.main",
                manifest_path.display()
            ),
        }
    }

    /// Use `file` when given, otherwise the project's `main` entry.
    pub fn from_arg_or_project(file: Option<&str>, cwd: &Path) -> anyhow::Result<Self> {
        match file {
            Some(file) => Self::from_arg(file, cwd),
            None => Self::from_project(cwd),
        }
    }
}

/// Remove one leading and one trailing quote, independently.
fn strip_quotes(argument: &str) -> &str {
    let argument = argument.strip_prefix(['"', '\'']).unwrap_or(argument);
    argument.strip_suffix(['"', '\'']).unwrap_or(argument)
}

pub fn execute(out: &mut StyledOutput, args: LoadArgs) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    let command = match &args.file {
        Some(file) => LoadCommand::from_arg(file, &cwd)?,
        None => {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            LoadCommand::parse(&line)?
        }
    };

    out.status("Loading...", &command.file);

    let project = resolve_project(out, command.path, &args.resolve)?;
    let preamble = bundle(&project.structure);
    let chunk = assemble(&preamble, &project.source);

    write_output(out, &chunk.code, args.output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("main.lua"), "print(1)").unwrap();
        fs::write(temp.path().join("notes.txt"), "").unwrap();
        temp
    }

    #[test]
    fn test_parse_quoted_line() {
        let temp = project();

        let command = LoadCommand::parse_in(".load \"main.lua\"", temp.path()).unwrap();

        assert_eq!(command.file, "main.lua");
        assert_eq!(command.path, temp.path().join("main.lua"));
    }

    #[test]
    fn test_parse_single_quotes_and_padding() {
        let temp = project();

        let command = LoadCommand::parse_in("  .load   'main.lua'  \n", temp.path()).unwrap();

        assert_eq!(command.file, "main.lua");
    }

    #[test]
    fn test_parse_absolute_path() {
        let temp = project();
        let absolute = temp.path().join("main.lua");

        let command =
            LoadCommand::parse_in(&format!(".load {}", absolute.display()), Path::new("/"))
                .unwrap();

        assert_eq!(command.path, absolute);
    }

    #[test]
    fn test_parse_requires_argument() {
        let err = LoadCommand::parse_in(".load", Path::new("/")).unwrap_err();
        assert!(err.to_string().starts_with("Usage"));
    }

    #[test]
    fn test_rejects_non_lua_file() {
        let temp = project();

        let err = LoadCommand::parse_in(".load notes.txt", temp.path()).unwrap_err();

        assert_eq!(err.to_string(), ".load requires a *.lua file");
    }

    #[test]
    fn test_rejects_missing_file() {
        let temp = project();

        let err = LoadCommand::from_arg("other.lua", temp.path()).unwrap_err();

        assert!(err.to_string().starts_with("file not found"));
    }

    #[test]
    fn test_project_main_from_nested_dir() {
        let temp = project();
        fs::write(
            temp.path().join(MANIFEST_FILE),
            "[project]\nname = \"app\"\nmain = \"main.lua\"\n",
        )
        .unwrap();
        let nested = temp.path().join("src");
        fs::create_dir_all(&nested).unwrap();

        let command = LoadCommand::from_arg_or_project(None, &nested).unwrap();

        assert_eq!(command.path, temp.path().join("main.lua"));
    }

    #[test]
    fn test_explicit_file_wins_over_project_main() {
        let temp = project();
        fs::write(temp.path().join("other.lua"), "").unwrap();
        fs::write(
            temp.path().join(MANIFEST_FILE),
            "[project]\nname = \"app\"\nmain = \"main.lua\"\n",
        )
        .unwrap();

        let command = LoadCommand::from_arg_or_project(Some("other.lua"), temp.path()).unwrap();

        assert_eq!(command.file, "other.lua");
    }

    #[test]
    fn test_project_without_main() {
        let temp = project();
        fs::write(temp.path().join(MANIFEST_FILE), "[project]\nname = \"app\"\n").unwrap();

        let err = LoadCommand::from_project(temp.path()).unwrap_err();

        assert!(err.to_string().contains("project.main"));
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"a.lua\""), "a.lua");
        assert_eq!(strip_quotes("'a.lua'"), "a.lua");
        assert_eq!(strip_quotes("a.lua"), "a.lua");
        assert_eq!(strip_quotes("\"a.lua"), "a.lua");
    }
}
