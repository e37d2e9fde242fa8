//! Token tree produced by the lexers and consumed by the renderer.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::attrs::Attributes;

/// Kind of a run of blank lines.
pub const SPACE: &str = "space";
/// Kind of a fenced code block left to the baseline grammar.
pub const CODE: &str = "code";
/// Kind of a chunk of baseline Markdown; children are inline tokens.
pub const MARKDOWN: &str = "markdown";
/// Kind of plain inline text left to the baseline grammar.
pub const TEXT: &str = "text";

/// Syntactic level of an extension or token.
///
/// `Container` is a layering convention of this crate; the host lexer treats
/// it like `Block`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "lowercase"))]
pub enum Level {
    Inline,
    Block,
    Container,
}

impl Level {
    #[must_use]
    pub fn is_inline(self) -> bool {
        matches!(self, Self::Inline)
    }

    /// Title-case name used in synthesized type names.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Inline => "Inline",
            Self::Block => "Block",
            Self::Container => "Container",
        }
    }

    /// Tag used by the default directive renderer when nothing else applies.
    #[must_use]
    pub fn default_tag(self) -> &'static str {
        match self {
            Self::Inline => "span",
            Self::Block | Self::Container => "div",
        }
    }
}

/// How a token's children are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize), serde(rename_all = "lowercase"))]
pub enum RenderMode {
    /// Rendered without a wrapping paragraph.
    #[default]
    Inline,
    /// Rendered as block content.
    Block,
}

/// Directive identity attached by the directive factory.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DirectiveMeta {
    pub level: Level,
    pub marker: String,
    /// Resolved element name for the default renderer.
    pub tag: String,
    /// Name from the directive content, if any.
    pub name: Option<String>,
}

/// One `term:: definition` pair of a description list.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DescriptionEntry {
    /// Inline tokens.
    pub term: Vec<Token>,
    /// Block tokens.
    pub definition: Vec<Token>,
}

/// Failure class of a function-call outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum CallErrorKind {
    Parse,
    Eval,
}

/// Result of tokenizing and evaluating a function call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum CallOutcome {
    /// Evaluated value, emitted as HTML.
    Success(String),
    /// The call text is not a valid expression.
    ParseError {
        message: String,
        /// Byte offset into `raw` where the valid prefix ends.
        pos: usize,
    },
    /// The call parsed but raised while running.
    EvalError { message: String, detail: String },
}

impl CallOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<CallErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::ParseError { .. } => Some(CallErrorKind::Parse),
            Self::EvalError { .. } => Some(CallErrorKind::Eval),
        }
    }
}

/// One captured argument of a configurable pattern.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Argument {
    pub value: String,
    /// Inline tokens when the argument is parsed as Markdown.
    pub tokens: Option<Vec<Token>>,
}

/// Extension-specific data that does not fit the common fields.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub enum Payload {
    #[default]
    None,
    DescriptionList(Vec<DescriptionEntry>),
    Call(CallOutcome),
    Arguments(Vec<Argument>),
}

/// A node of the token tree.
///
/// `raw` is the exact source slice the token consumed, so the raws of
/// sibling tokens concatenate back to the source they came from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Token {
    /// Descriptor name or one of the host kinds.
    pub kind: String,
    pub level: Level,
    pub raw: String,
    pub text: String,
    pub tokens: Vec<Token>,
    /// How `tokens` render.
    pub mode: RenderMode,
    pub meta: Option<DirectiveMeta>,
    pub attrs: Option<Attributes>,
    /// Bracket text of a container directive.
    pub header: Option<String>,
    /// Named sub-trees attached by custom tokenizers.
    pub sections: BTreeMap<String, Vec<Token>>,
    pub payload: Payload,
}

impl Token {
    #[must_use]
    pub fn new(kind: impl Into<String>, level: Level, raw: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            level,
            raw: raw.into(),
            text: String::new(),
            tokens: Vec::new(),
            mode: RenderMode::default(),
            meta: None,
            attrs: None,
            header: None,
            sections: BTreeMap::new(),
            payload: Payload::None,
        }
    }

    pub(crate) fn text(raw: &str) -> Self {
        Self::new(TEXT, Level::Inline, raw)
    }

    pub(crate) fn space(raw: &str) -> Self {
        Self::new(SPACE, Level::Block, raw)
    }

    pub(crate) fn code(raw: &str) -> Self {
        Self::new(CODE, Level::Block, raw)
    }

    pub(crate) fn markdown(raw: &str, children: Vec<Token>) -> Self {
        Self::new(MARKDOWN, Level::Block, raw).with_children(children, RenderMode::Block)
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_children(mut self, tokens: Vec<Token>, mode: RenderMode) -> Self {
        self.tokens = tokens;
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Whether the token was produced by the host grammar rather than an
    /// extension.
    #[must_use]
    pub fn is_host(&self) -> bool {
        matches!(self.kind.as_str(), SPACE | CODE | MARKDOWN | TEXT)
    }

    /// Directive name, if this is a directive token with a name.
    #[must_use]
    pub fn meta_name(&self) -> Option<&str> {
        self.meta.as_ref()?.name.as_deref()
    }

    /// Named section, empty when absent.
    #[must_use]
    pub fn section(&self, name: &str) -> &[Token] {
        self.sections.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Concatenate the raw text of a token sequence.
#[must_use]
pub fn concat_raw(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.raw.as_str()).collect()
}
