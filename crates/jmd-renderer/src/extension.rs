//! Extension descriptors: the plugin contract of the host grammar.

use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::lexer::Lexer;
use crate::render::Renderer;
use crate::token::{Level, Token};

/// Output of a render function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// HTML for the token.
    Html(String),
    /// Not this renderer's token; the next renderer for the kind is tried.
    Skip,
}

/// Start probe: byte offset where the extension might match, if anywhere.
pub type StartFn = dyn Fn(&str) -> Option<usize>;
/// Tokenizer: a token consuming a prefix of the input, or `None`.
pub type TokenizeFn = dyn Fn(&str, &Lexer<'_>) -> Result<Option<Token>>;
/// Renderer for tokens of the descriptor's kind.
pub type RenderFn = dyn Fn(&Token, &Renderer<'_>) -> Result<Rendered>;

/// A grammar extension.
///
/// Immutable once built. Cloning is cheap; the closures are shared.
#[derive(Clone)]
pub struct ExtensionDescriptor {
    name: String,
    level: Level,
    priority: i32,
    start: Rc<StartFn>,
    tokenize: Rc<TokenizeFn>,
    render: Rc<RenderFn>,
}

impl ExtensionDescriptor {
    /// Create a descriptor with default priority.
    ///
    /// Tokens produced by `tokenize` should carry `name` as their kind so
    /// that render dispatch finds this descriptor.
    pub fn new<S, T, R>(name: impl Into<String>, level: Level, start: S, tokenize: T, render: R) -> Self
    where
        S: Fn(&str) -> Option<usize> + 'static,
        T: Fn(&str, &Lexer<'_>) -> Result<Option<Token>> + 'static,
        R: Fn(&Token, &Renderer<'_>) -> Result<Rendered> + 'static,
    {
        Self {
            name: name.into(),
            level,
            priority: 0,
            start: Rc::new(start),
            tokenize: Rc::new(tokenize),
            render: Rc::new(render),
        }
    }

    /// Raise (or lower) the dispatch priority. Higher is tried first.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn level(&self) -> Level {
        self.level
    }

    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn start(&self, src: &str) -> Option<usize> {
        (self.start)(src)
    }

    pub fn tokenize(&self, src: &str, lexer: &Lexer<'_>) -> Result<Option<Token>> {
        (self.tokenize)(src, lexer)
    }

    pub fn render(&self, token: &Token, renderer: &Renderer<'_>) -> Result<Rendered> {
        (self.render)(token, renderer)
    }
}

impl fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
