//! CLI command implementations.

mod build;
mod tokens;

use std::path::Path;

use jmd_config::Config;
use jmd_renderer::{CompileOptions, Compiler};

pub(crate) use build::BuildArgs;
pub(crate) use tokens::TokensArgs;

/// Compiler for a document at `input`, configured from `config`.
fn compiler_for(config: &Config, input: &Path) -> Compiler {
    let syntax = &config.syntax;
    let options = CompileOptions {
        jmarkdown_syntax: syntax.jmarkdown,
        latex: syntax.latex,
        inline_comment: syntax
            .inline_comment
            .clone()
            .map(|marker| (marker, syntax.inline_comment_verbatim)),
        max_include_depth: config.includes.max_depth,
        base_dir: input
            .parent()
            .map_or_else(|| Path::new(".").to_path_buf(), Path::to_path_buf),
        ..CompileOptions::default()
    };
    Compiler::new(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compiler_for_maps_config() {
        let mut config = Config::default();
        config.syntax.jmarkdown = false;
        config.syntax.inline_comment = Some("%".to_owned());
        config.includes.max_depth = 4;

        let compiler = compiler_for(&config, Path::new("notes/week1.md"));
        let options = compiler.options();
        assert!(!options.jmarkdown_syntax);
        assert!(options.latex);
        assert_eq!(options.inline_comment, Some(("%".to_owned(), false)));
        assert_eq!(options.max_include_depth, 4);
        assert_eq!(options.base_dir, Path::new("notes"));
    }
}
