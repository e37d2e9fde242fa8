//! `jmd tokens` command implementation.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::Term;
use jmd_config::Config;

use crate::error::CliError;
use crate::output::Reporter;

/// Arguments for the tokens command.
#[derive(Args)]
pub(crate) struct TokensArgs {
    /// Markdown document to tokenize.
    input: PathBuf,

    /// Path to configuration file (default: auto-discover jmd.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl TokensArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let config = Config::load(self.config.as_deref(), None)?;
        let markdown = fs::read_to_string(&self.input)?;
        let (json, warnings) = token_json(&config, &self.input, &markdown)?;
        Reporter::new().warnings(&self.input, &warnings);
        Term::stdout().write_line(&json)?;
        Ok(())
    }
}

/// Top-level token tree of `markdown` as pretty-printed JSON, with the
/// warnings raised while tokenizing.
fn token_json(
    config: &Config,
    input: &Path,
    markdown: &str,
) -> Result<(String, Vec<String>), CliError> {
    let tree = super::compiler_for(config, input).tokenize(markdown)?;
    Ok((serde_json::to_string_pretty(&tree.tokens)?, tree.warnings))
}
