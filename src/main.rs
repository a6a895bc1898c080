use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use pinepack::Result;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pinepack")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "PineScript module bundler", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bundle the project into a single PineScript file
    Build {
        /// Path to pine.config.json (defaults to ./pine.config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Rebuild whenever a source file changes
        #[arg(short, long)]
        watch: bool,

        /// Copy the bundled output to the clipboard
        #[arg(long)]
        copy: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Build {
            config,
            watch,
            copy,
        } => {
            pinepack::cli::build::run(config.as_deref(), watch, copy)?;
        }

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "pinepack", &mut io::stdout());
        }
    }

    Ok(())
}
