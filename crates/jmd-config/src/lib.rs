//! Configuration for jmd.
//!
//! Settings live in `jmd.toml`, looked up in the working directory and its
//! parents unless a path is given explicitly. Every section is optional:
//!
//! ```toml
//! [syntax]
//! jmarkdown = true
//! inline_comment = "%"
//! latex = true
//!
//! [document]
//! lang = "en"
//! css = ["style.css"]
//! mathjax = true
//!
//! [includes]
//! max_depth = 20
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename searched for during discovery.
pub const CONFIG_FILENAME: &str = "jmd.toml";

const MAX_INCLUDE_DEPTH_LIMIT: usize = 100;

/// CLI settings that override configuration file values.
///
/// All fields are optional - `None` means "use config file value".
#[derive(Debug, Default, Clone)]
pub struct CliSettings {
    /// Turn off the jmarkdown syntax modifications.
    pub normal_syntax: Option<bool>,
    /// Override `includes.max_depth`.
    pub max_include_depth: Option<usize>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Markdown dialect switches.
    pub syntax: SyntaxConfig,
    /// HTML document shell.
    pub document: DocumentConfig,
    /// File inclusion limits.
    pub includes: IncludesConfig,
    /// Path to the loaded config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Markdown dialect switches.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyntaxConfig {
    /// `/italic/`, `*strong*`, `__underline__`, `_sub` and `^sup`.
    pub jmarkdown: bool,
    /// Marker starting an inline comment that runs to the end of the line.
    pub inline_comment: Option<String>,
    /// Keep commented text in the HTML comment.
    pub inline_comment_verbatim: bool,
    /// Pass `$...$` and `\(...\)` through untouched.
    pub latex: bool,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            jmarkdown: true,
            inline_comment: None,
            inline_comment_verbatim: false,
            latex: true,
        }
    }
}

/// HTML document shell. Front matter values take precedence over these.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub lang: String,
    pub title: Option<String>,
    /// Stylesheet URLs, linked in order.
    pub css: Vec<String>,
    /// Script URLs, loaded in order.
    pub scripts: Vec<String>,
    pub body_classes: Option<String>,
    /// Load `MathJax` for LaTeX passthrough.
    pub mathjax: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            lang: "en".to_owned(),
            title: None,
            css: Vec::new(),
            scripts: Vec::new(),
            body_classes: None,
            mathjax: true,
        }
    }
}

/// File inclusion limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IncludesConfig {
    /// Maximum nesting of `[[file.md]]` includes.
    pub max_depth: usize,
}

impl Default for IncludesConfig {
    fn default() -> Self {
        Self { max_depth: 20 }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration from file with optional CLI overrides.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Explicit config file path. If `None`, searches for `jmd.toml`
    ///   in the current directory and its parents.
    /// * `cli_settings` - Optional CLI settings that override config file values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if an explicit path does not exist,
    /// and parse or validation errors for a malformed file.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(path) = discover_config() {
            Self::load_from_file(&path)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings overrides.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(normal) = settings.normal_syntax {
            self.syntax.jmarkdown = !normal;
        }
        if let Some(depth) = settings.max_include_depth {
            self.includes.max_depth = depth;
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    /// Directory holding the loaded config file, if any.
    #[must_use]
    pub fn config_dir(&self) -> Option<&Path> {
        self.config_path.as_deref().and_then(Path::parent)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_syntax()?;
        self.validate_document()?;
        self.validate_includes()
    }

    fn validate_syntax(&self) -> Result<(), ConfigError> {
        if let Some(marker) = &self.syntax.inline_comment {
            require_non_empty(marker, "syntax.inline_comment")?;
            if marker.chars().any(char::is_whitespace) {
                return Err(ConfigError::Validation(
                    "syntax.inline_comment cannot contain whitespace".to_owned(),
                ));
            }
        }
        Ok(())
    }

    fn validate_document(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.document.lang, "document.lang")
    }

    fn validate_includes(&self) -> Result<(), ConfigError> {
        let depth = self.includes.max_depth;
        if !(1..=MAX_INCLUDE_DEPTH_LIMIT).contains(&depth) {
            return Err(ConfigError::Validation(format!(
                "includes.max_depth must be between 1 and {MAX_INCLUDE_DEPTH_LIMIT}, got {depth}"
            )));
        }
        Ok(())
    }
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Search for `jmd.toml` in the current directory and its parents.
fn discover_config() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    discover_config_from(&cwd)
}

fn discover_config_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .find(|candidate| candidate.is_file())
}
