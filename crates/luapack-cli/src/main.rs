//! luapack command-line tool
//!
//! Resolves the local `require` dependencies of a Lua script and prepends a
//! preamble that preloads them, producing a single self-contained chunk.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::{bundle, deps, init, load, ResolveArgs};
use output::StyledOutput;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "luapack")]
#[command(about = "Bundle local Lua modules into a single loadable chunk", long_about = None)]
#[command(version)]
struct Cli {
    /// When to use colored output
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_parser = ["auto", "always", "never"]
    )]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepend the load preamble to a Lua file
    Load {
        /// Entry script (reads a `.load <file>` line from stdin if omitted)
        file: Option<String>,
        /// Write the chunk to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Write only the load preamble for a Lua file
    Bundle {
        /// Entry script (defaults to project.main from luapack.toml)
        file: Option<String>,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Show the resolved module load order
    Deps {
        /// Entry script (defaults to project.main from luapack.toml)
        file: Option<String>,
        /// Print the project structure as JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Initialize a luapack.toml
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    let mut out = StyledOutput::new(output::resolve_color_choice(Some(&cli.color)));

    let result = match cli.command {
        Commands::Load {
            file,
            output,
            resolve,
        } => load::execute(
            &mut out,
            load::LoadArgs {
                file,
                output,
                resolve,
            },
        ),
        Commands::Bundle {
            file,
            output,
            resolve,
        } => bundle::execute(
            &mut out,
            bundle::BundleArgs {
                file,
                output,
                resolve,
            },
        ),
        Commands::Deps {
            file,
            json,
            resolve,
        } => deps::execute(&mut out, deps::DepsArgs { file, json, resolve }),
        Commands::Init { path, name } => init::execute(&mut out, path, name),
    };

    if let Err(e) = result {
        out.stderr_error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
}
