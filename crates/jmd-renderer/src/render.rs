//! Token tree rendering.
//!
//! Host tokens go to `pulldown-cmark`; extension tokens go to the render
//! functions registered under their kind. Runs of inline tokens are
//! rendered together so the baseline grammar sees the whole paragraph.

use std::collections::HashMap;

use pulldown_cmark::{Options, Parser, html};

use crate::error::{Error, Result, excerpt};
use crate::extension::{ExtensionDescriptor, Rendered};
use crate::placeholder::Placeholders;
use crate::registry::ExtensionRegistry;
use crate::token::{CODE, MARKDOWN, RenderMode, SPACE, TEXT, Token};

/// Renders token trees produced by a [`Lexer`](crate::Lexer) over the same
/// registry.
#[derive(Debug)]
pub struct Renderer<'r> {
    renderers: HashMap<&'r str, Vec<&'r ExtensionDescriptor>>,
    gfm: bool,
}

impl<'r> Renderer<'r> {
    #[must_use]
    pub fn new(registry: &'r ExtensionRegistry) -> Self {
        let mut renderers: HashMap<&str, Vec<&ExtensionDescriptor>> = HashMap::new();
        for descriptor in registry.dispatch_order(|_| true) {
            renderers
                .entry(descriptor.name())
                .or_default()
                .push(descriptor);
        }
        Self {
            renderers,
            gfm: true,
        }
    }

    /// Enable or disable GitHub Flavored Markdown in the baseline grammar.
    ///
    /// GFM is enabled by default: tables, strikethrough, task lists,
    /// footnotes and alerts.
    #[must_use]
    pub fn with_gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    #[must_use]
    pub fn parser_options(&self) -> Options {
        if self.gfm {
            Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_GFM
        } else {
            Options::empty()
        }
    }

    /// Render tokens as block content.
    pub fn render_block(&self, tokens: &[Token]) -> Result<String> {
        self.render_sequence(tokens, RenderMode::Block)
    }

    /// Render tokens as inline content (no wrapping paragraph).
    pub fn render_inline(&self, tokens: &[Token]) -> Result<String> {
        self.render_sequence(tokens, RenderMode::Inline)
    }

    /// Render a token's children according to its [`RenderMode`].
    pub fn render_children(&self, token: &Token) -> Result<String> {
        self.render_sequence(&token.tokens, token.mode)
    }

    /// Render one token.
    ///
    /// Extension tokens try every renderer registered under their kind in
    /// dispatch order; the first that does not skip wins.
    pub fn render_token(&self, token: &Token) -> Result<String> {
        match token.kind.as_str() {
            SPACE => Ok(String::new()),
            CODE => Ok(self.markdown(&token.raw)),
            MARKDOWN => self.render_children(token),
            TEXT => Ok(self.markdown_inline(&token.raw)),
            kind => {
                for descriptor in self.renderers.get(kind).into_iter().flatten() {
                    if let Rendered::Html(html) = descriptor.render(token, self)? {
                        return Ok(html);
                    }
                }
                Err(Error::Unclaimed {
                    kind: kind.to_owned(),
                    excerpt: excerpt(&token.raw),
                })
            }
        }
    }

    /// Render a Markdown string with the baseline grammar.
    #[must_use]
    pub fn markdown(&self, src: &str) -> String {
        let parser = Parser::new_ext(src, self.parser_options());
        let mut out = String::with_capacity(src.len() + src.len() / 2);
        html::push_html(&mut out, parser);
        out
    }

    /// Render a Markdown string, dropping the paragraph that wraps a single
    /// line of inline content.
    #[must_use]
    pub fn markdown_inline(&self, src: &str) -> String {
        let out = self.markdown(src);
        match out
            .strip_prefix("<p>")
            .and_then(|inner| inner.strip_suffix("</p>\n"))
        {
            Some(inner) if !inner.contains("<p>") => inner.to_owned(),
            _ => out,
        }
    }

    fn render_sequence(&self, tokens: &[Token], mode: RenderMode) -> Result<String> {
        let mut out = String::new();
        let mut run: Vec<&Token> = Vec::new();

        for token in tokens {
            if token.level.is_inline() {
                run.push(token);
                continue;
            }
            if !run.is_empty() {
                out.push_str(&self.render_run(&run, mode)?);
                run.clear();
            }
            out.push_str(&self.render_token(token)?);
        }
        if !run.is_empty() {
            out.push_str(&self.render_run(&run, mode)?);
        }

        Ok(out)
    }

    /// Render consecutive inline tokens through one baseline pass, with
    /// extension output spliced in afterwards.
    fn render_run(&self, run: &[&Token], mode: RenderMode) -> Result<String> {
        let mut source = String::new();
        let mut placeholders = Placeholders::new();
        for token in run {
            if token.kind == TEXT {
                source.push_str(&token.raw);
            } else {
                source.push_str(&placeholders.insert(self.render_token(token)?));
            }
        }

        let out = match mode {
            RenderMode::Block => self.markdown(&source),
            RenderMode::Inline => self.markdown_inline(&source),
        };
        Ok(placeholders.apply(&out))
    }
}
