//! Fatal tokenizing and rendering errors.
//!
//! Token-level failures (expression parse or evaluation errors) never
//! surface here; they are carried on the token and rendered.

use std::path::PathBuf;

use crate::attrs::AttributeError;
use crate::pattern::PatternError;
use crate::script::ScriptError;

/// Error aborting a document compile.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed `{...}` blob in a directive.
    #[error("invalid attributes in `{construct}`: {source}")]
    Attributes {
        /// Directive source that carried the blob.
        construct: String,
        #[source]
        source: AttributeError,
    },

    /// Malformed configurable pattern definition.
    #[error(transparent)]
    Pattern(#[from] PatternError),

    /// Scripting context failure outside token evaluation.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Regular expression synthesized for an extension failed to compile.
    #[error("invalid pattern for extension `{extension}`: {source}")]
    Regex {
        extension: String,
        #[source]
        source: regex::Error,
    },

    /// Description-list state machine reached an inconsistent state.
    #[error("description list inconsistency at {line:?}: {message}")]
    DescriptionList { line: String, message: String },

    /// A tokenizer returned a token whose `raw` is empty or not a prefix of
    /// the text it was given.
    #[error("extension `{extension}` returned raw text {raw:?} that does not prefix its input")]
    InvalidRaw { extension: String, raw: String },

    /// The document itself could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every renderer registered for a token kind skipped it.
    #[error("no renderer claimed `{kind}` token {excerpt:?}")]
    Unclaimed { kind: String, excerpt: String },
}

/// Result alias for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Shorten source text for error messages.
pub(crate) fn excerpt(raw: &str) -> String {
    const LIMIT: usize = 60;
    match raw.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_short() {
        assert_eq!(excerpt("::title"), "::title");
    }

    #[test]
    fn test_excerpt_long() {
        let long = "x".repeat(100);
        let short = excerpt(&long);
        assert_eq!(short.len(), 63);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn test_unclaimed_message() {
        let err = Error::Unclaimed {
            kind: "directiveBlock1".to_owned(),
            excerpt: "::x".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            r#"no renderer claimed `directiveBlock1` token "::x""#
        );
    }
}
