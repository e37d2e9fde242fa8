//! jmd CLI - extended markdown to HTML.
//!
//! Provides commands for:
//! - `build`: Compile a document into a standalone HTML page
//! - `tokens`: Print a document's token tree as JSON

mod commands;
mod document;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, TokensArgs};
use output::Reporter;

/// jmd - extended markdown compiler.
#[derive(Parser)]
#[command(name = "jmd", version, about)]
struct Cli {
    /// Log progress at info level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a document to HTML.
    Build(BuildArgs),
    /// Print the token tree of a document.
    Tokens(TokensArgs),
}

fn main() {
    let cli = Cli::parse();
    let reporter = Reporter::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => args.execute(),
        Commands::Tokens(args) => args.execute(),
    };

    if let Err(err) = result {
        reporter.failed(&err);
        std::process::exit(1);
    }
}
