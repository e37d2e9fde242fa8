//! Build reporting on stderr.
//!
//! stdout is reserved for command output such as `jmd tokens`.

use std::path::Path;

use console::{Style, Term};

pub(crate) struct Reporter {
    term: Term,
    dim: Style,
    green: Style,
    yellow: Style,
    red: Style,
}

impl Reporter {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            dim: Style::new().dim(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red().bold(),
        }
    }

    /// Name the `jmd.toml` in effect.
    pub(crate) fn config(&self, path: &Path) {
        self.line(&self.dim, &format!("Using {}", path.display()));
    }

    /// Warnings collected while compiling `input`, such as unresolved
    /// `[[...]]` inclusions.
    pub(crate) fn warnings(&self, input: &Path, warnings: &[String]) {
        if warnings.is_empty() {
            return;
        }
        self.line(&self.yellow, &warnings_heading(input, warnings.len()));
        for warning in warnings {
            self.line(&self.yellow, &format!("  - {warning}"));
        }
    }

    pub(crate) fn built(&self, output: &Path, warnings: usize) {
        self.line(&self.green, &built_line(output, warnings));
    }

    pub(crate) fn failed(&self, err: &dyn std::error::Error) {
        self.line(&self.red, &format!("error: {err}"));
    }

    fn line(&self, style: &Style, msg: &str) {
        let _ = self.term.write_line(&style.apply_to(msg).to_string());
    }
}

fn warnings_heading(input: &Path, count: usize) -> String {
    let noun = if count == 1 { "warning" } else { "warnings" };
    format!("{count} {noun} in {}:", input.display())
}

fn built_line(output: &Path, warnings: usize) -> String {
    match warnings {
        0 => format!("Built {}", output.display()),
        1 => format!("Built {} with 1 warning", output.display()),
        n => format!("Built {} with {n} warnings", output.display()),
    }
}
