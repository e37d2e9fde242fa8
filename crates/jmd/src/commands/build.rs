//! `jmd build` command implementation.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use jmd_config::{CliSettings, Config};

use crate::document::Shell;
use crate::error::CliError;
use crate::output::Reporter;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Markdown document to compile.
    input: PathBuf,

    /// Output HTML file (default: the input with an `.html` extension).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use plain markdown emphasis instead of the jmarkdown syntax.
    #[arg(long)]
    normal_syntax: bool,

    /// Path to configuration file (default: auto-discover jmd.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl BuildArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let reporter = Reporter::new();

        let cli_settings = CliSettings {
            normal_syntax: self.normal_syntax.then_some(true),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        if let Some(path) = &config.config_path {
            reporter.config(path);
        }

        let compiler = super::compiler_for(&config, &self.input);
        let result = compiler.compile_file(&self.input)?;
        reporter.warnings(&self.input, &result.warnings);

        let fallback_title = self
            .input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let shell = Shell::resolve(&config.document, &result.metadata, &fallback_title);

        let output_path = self.output.unwrap_or_else(|| default_output(&self.input));
        fs::write(&output_path, shell.render(&result.html))?;
        tracing::info!(
            input = %self.input.display(),
            output = %output_path.display(),
            "Wrote document"
        );

        reporter.built(&output_path, result.warnings.len());
        Ok(())
    }
}

fn default_output(input: &Path) -> PathBuf {
    input.with_extension("html")
}
