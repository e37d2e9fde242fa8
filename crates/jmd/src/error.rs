//! CLI error types.

use jmd_config::ConfigError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Compile(#[from] jmd_renderer::Error),

    #[error("Failed to serialize tokens: {0}")]
    Json(#[from] serde_json::Error),
}
