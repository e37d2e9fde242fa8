//! Directive factory: builds extension descriptors from [`DirectiveSpec`]s.

use std::fmt;
use std::rc::Rc;

use regex::Regex;

use super::content::{ContentKind, collapse_attrs, lex_content};
use crate::attrs::Attributes;
use crate::error::{Error, Result, excerpt};
use crate::extension::{ExtensionDescriptor, Rendered};
use crate::lexer::Lexer;
use crate::render::Renderer;
use crate::token::{DirectiveMeta, Level, RenderMode, Token};
use crate::util::fnv1a;

/// Custom tokenizer: receives the directive's text and the token to fill.
pub type DirectiveTokenizer = dyn Fn(&str, &mut Token, &Lexer<'_>) -> Result<()>;
/// Custom renderer for directive tokens.
pub type DirectiveRenderer = dyn Fn(&Token, &Renderer<'_>) -> Result<Rendered>;

/// Elements rendered as self-closing tags.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "command", "embed", "frame", "hr", "image",
    "img", "input", "keygen", "link", "meta", "param", "source", "track", "wbr",
];

/// Declarative description of one directive.
///
/// # Example
///
/// ```
/// use jmd_renderer::{DirectiveSpec, Level, create_directive};
///
/// let aside = DirectiveSpec::new(Level::Container, ":::")
///     .with_label("aside")
///     .with_tag("aside");
/// let descriptor = create_directive(aside).unwrap();
/// assert!(descriptor.name().starts_with("directiveContainer"));
/// ```
#[derive(Clone)]
pub struct DirectiveSpec {
    pub level: Level,
    /// Repeated punctuation run, e.g. `:::`.
    pub marker: String,
    /// Fixed directive name this spec responds to.
    pub label: Option<String>,
    /// Element override for the default renderer.
    pub tag: Option<String>,
    tokenizer: Option<Rc<DirectiveTokenizer>>,
    renderer: Option<Rc<DirectiveRenderer>>,
}

impl DirectiveSpec {
    #[must_use]
    pub fn new(level: Level, marker: impl Into<String>) -> Self {
        Self {
            level,
            marker: marker.into(),
            label: None,
            tag: None,
            tokenizer: None,
            renderer: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Replace the default child tokenization.
    #[must_use]
    pub fn with_tokenizer(
        mut self,
        tokenizer: impl Fn(&str, &mut Token, &Lexer<'_>) -> Result<()> + 'static,
    ) -> Self {
        self.tokenizer = Some(Rc::new(tokenizer));
        self
    }

    /// Replace the default renderer.
    #[must_use]
    pub fn with_renderer(
        mut self,
        renderer: impl Fn(&Token, &Renderer<'_>) -> Result<Rendered> + 'static,
    ) -> Self {
        self.renderer = Some(Rc::new(renderer));
        self
    }
}

impl fmt::Debug for DirectiveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveSpec")
            .field("level", &self.level)
            .field("marker", &self.marker)
            .field("label", &self.label)
            .field("tag", &self.tag)
            .field("tokenizer", &self.tokenizer.is_some())
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

/// Internal type name shared by every directive with this level and marker.
#[must_use]
pub fn directive_type_name(level: Level, marker: &str) -> String {
    format!("directive{}{}", level.title(), fnv1a(marker))
}

/// Build the recognizer pattern for a level, marker and optional label.
fn directive_pattern(level: Level, marker: &str, label: Option<&str>) -> String {
    let marker = regex::escape(marker);
    let label = label.map(regex::escape).unwrap_or_default();
    const NAME: &str = "[a-zA-Z][a-zA-Z0-9_-]*";
    // A label already supplies the name, so nothing more is required.
    let repeat = if label.is_empty() { "+" } else { "*" };
    match level {
        Level::Container => format!(r"^{marker}{label}((?s:.*?))\n{marker}[ \t]*(?m:$)"),
        Level::Block => format!(r"^{marker}{label}((?:{NAME}|[{{\[](?s:.*?)[}}\]]){repeat})"),
        Level::Inline => {
            format!(r"^{marker}{label}((?:{NAME}|\{{(?s:.*?)\}}+|\[(?s:.*?)\]){repeat})")
        }
    }
}

/// Synthesize the extension descriptor for one spec.
///
/// Labeled specs get priority 1 so they tokenize before the generic
/// directive of the same marker, and their renderer only claims tokens
/// whose name equals the label.
pub fn create_directive(spec: DirectiveSpec) -> Result<ExtensionDescriptor> {
    let name = directive_type_name(spec.level, &spec.marker);
    let pattern = directive_pattern(spec.level, &spec.marker, spec.label.as_deref());
    let regex = Regex::new(&pattern).map_err(|source| Error::Regex {
        extension: name.clone(),
        source,
    })?;
    let priority = i32::from(spec.label.is_some());
    let level = spec.level;
    let spec = Rc::new(spec);

    let start = {
        let marker = spec.marker.clone();
        move |src: &str| find_marker(src, &marker)
    };
    let tokenize = {
        let spec = Rc::clone(&spec);
        let name = name.clone();
        move |src: &str, lexer: &Lexer<'_>| tokenize_directive(&spec, &name, &regex, src, lexer)
    };
    let render = move |token: &Token, renderer: &Renderer<'_>| {
        if let Some(label) = &spec.label
            && token.meta_name() != Some(label.as_str())
        {
            return Ok(Rendered::Skip);
        }
        match &spec.renderer {
            Some(custom) => custom(token, renderer),
            None => render_directive(token, renderer),
        }
    };

    Ok(ExtensionDescriptor::new(name, level, start, tokenize, render).with_priority(priority))
}

/// Offset of the first occurrence of `marker` that is not part of a longer
/// run of the same punctuation.
fn find_marker(src: &str, marker: &str) -> Option<usize> {
    let first = marker.chars().next()?;
    let last = marker.chars().last()?;
    let mut from = 0;
    while let Some(found) = src[from..].find(marker) {
        let at = from + found;
        if !src[..at].ends_with(first) && !src[at + marker.len()..].starts_with(last) {
            return Some(at);
        }
        from = at + first.len_utf8();
    }
    None
}

/// Synthesize descriptors for several specs, in order.
pub fn create_directives(
    specs: impl IntoIterator<Item = DirectiveSpec>,
) -> Result<Vec<ExtensionDescriptor>> {
    specs.into_iter().map(create_directive).collect()
}

fn tokenize_directive(
    spec: &DirectiveSpec,
    type_name: &str,
    regex: &Regex,
    src: &str,
    lexer: &Lexer<'_>,
) -> Result<Option<Token>> {
    let Some(captures) = regex.captures(src) else {
        return Ok(None);
    };
    // A longer run of the marker's punctuation is a different marker.
    if let Some(last) = spec.marker.chars().last()
        && src[spec.marker.len()..].starts_with(last)
    {
        return Ok(None);
    }

    let raw = captures.get(0).map_or("", |m| m.as_str());
    let body = captures.get(1).map_or("", |m| m.as_str());
    let content = format!("{}{body}", spec.label.as_deref().unwrap_or_default());
    let parts = lex_content(&content);
    let name = parts
        .iter()
        .find(|part| part.kind == ContentKind::Name)
        .map(|part| part.value.to_owned());
    // The label only prefixes the content, so `:::title-boxes` lexes as a
    // different name and belongs to the generic directive.
    if let Some(label) = &spec.label
        && name.as_deref() != Some(label.as_str())
    {
        return Ok(None);
    }

    let mut token = Token::new(type_name, spec.level, raw);
    for part in &parts {
        match part.kind {
            ContentKind::Attrs => {
                let attrs = Attributes::parse(&collapse_attrs(part.value)).map_err(|source| {
                    Error::Attributes {
                        construct: excerpt(raw),
                        source,
                    }
                })?;
                token.attrs = Some(attrs);
            }
            _ => {}
        }
    }

    let tag = spec
        .tag
        .clone()
        .or_else(|| name.clone())
        .unwrap_or_else(|| spec.level.default_tag().to_owned());
    token.meta = Some(DirectiveMeta {
        level: spec.level,
        marker: spec.marker.clone(),
        tag,
        name,
    });

    for part in &parts {
        match part.kind {
            ContentKind::Text if spec.level == Level::Container => {
                token.header = Some(part.value.to_owned());
            }
            ContentKind::Text | ContentKind::BlockText => {
                token.text = part.value.to_owned();
                if let Some(custom) = &spec.tokenizer {
                    custom(part.value, &mut token, lexer)?;
                } else {
                    let (children, mode) = match spec.level {
                        Level::Container => (lexer.block_tokens(part.value)?, RenderMode::Block),
                        Level::Block => (lexer.inline_tokens(part.value)?, RenderMode::Block),
                        Level::Inline => (lexer.inline_tokens(part.value)?, RenderMode::Inline),
                    };
                    token.tokens = children;
                    token.mode = mode;
                }
            }
            _ => {}
        }
    }

    Ok(Some(token))
}

/// Whether `tag` is an HTML void element.
#[must_use]
pub fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag.to_ascii_lowercase().as_str())
}

/// Default directive renderer.
///
/// Emits `<tag attrs>children</tag>`, or `<tag attrs />` for void elements.
/// Block and container directives get a newline after each tag.
pub fn render_directive(token: &Token, renderer: &Renderer<'_>) -> Result<Rendered> {
    let Some(meta) = &token.meta else {
        return Ok(Rendered::Skip);
    };
    let tag = meta.tag.as_str();
    let attrs = token.attrs.as_ref().map(Attributes::to_html).unwrap_or_default();
    let newline = if meta.level.is_inline() { "" } else { "\n" };

    if is_void_element(tag) {
        return Ok(Rendered::Html(format!("<{tag}{attrs} />{newline}")));
    }

    let body = if meta.level.is_inline() {
        renderer.render_inline(&token.tokens)?
    } else {
        renderer.render_block(&token.tokens)?
    };
    Ok(Rendered::Html(format!(
        "<{tag}{attrs}>{newline}{body}</{tag}>{newline}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ExtensionRegistry;
    use crate::token::concat_raw;
    use pretty_assertions::assert_eq;

    fn registry(specs: Vec<DirectiveSpec>) -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        registry.register_many(create_directives(specs).unwrap());
        registry
    }

    fn generic() -> Vec<DirectiveSpec> {
        vec![
            DirectiveSpec::new(Level::Container, ":::"),
            DirectiveSpec::new(Level::Container, "::::"),
            DirectiveSpec::new(Level::Block, "::"),
            DirectiveSpec::new(Level::Inline, ":"),
        ]
    }

    fn render(registry: &ExtensionRegistry, src: &str) -> String {
        let tokens = Lexer::new(registry).block_tokens(src).unwrap();
        Renderer::new(registry).render_block(&tokens).unwrap()
    }

    #[test]
    fn test_type_name_is_deterministic() {
        assert_eq!(
            directive_type_name(Level::Container, ":::"),
            directive_type_name(Level::Container, ":::")
        );
        assert_ne!(
            directive_type_name(Level::Container, ":::"),
            directive_type_name(Level::Block, ":::")
        );
        assert_ne!(
            directive_type_name(Level::Container, ":::"),
            directive_type_name(Level::Container, "::::")
        );
    }

    #[test]
    fn test_container_directive() {
        let registry = registry(generic());
        let html = render(&registry, ":::section{.note}\nSome *text*.\n:::\n");
        assert_eq!(
            html,
            "<section class=\"note\">\n<p>Some <em>text</em>.</p>\n</section>\n"
        );
    }

    #[test]
    fn test_container_without_name_uses_div() {
        let registry = registry(generic());
        let html = render(&registry, ":::{#x}\nbody\n:::\n");
        assert_eq!(html, "<div id=\"x\">\n<p>body</p>\n</div>\n");
    }

    #[test]
    fn test_nested_containers_by_marker_length() {
        let registry = registry(generic());
        let src = "::::outer\n:::inner\nx\n:::\n::::\n";
        let html = render(&registry, src);
        assert_eq!(html, "<outer>\n<inner>\n<p>x</p>\n</inner>\n</outer>\n");
    }

    #[test]
    fn test_block_directive() {
        let registry = registry(generic());
        let html = render(&registry, "::aside[Hello *there*]\n");
        assert_eq!(html, "<aside>\n<p>Hello <em>there</em></p>\n</aside>\n");
    }

    #[test]
    fn test_inline_directive() {
        let registry = registry(generic());
        let html = render(&registry, "An :abbr[HTML]{title=\"markup\"} tag.\n");
        assert_eq!(
            html,
            "<p>An <abbr title=\"markup\">HTML</abbr> tag.</p>\n"
        );
    }

    #[test]
    fn test_void_element() {
        let registry = registry(generic());
        assert_eq!(render(&registry, "a :br b\n"), "<p>a <br /> b</p>\n");
        assert_eq!(render(&registry, "::hr{.thin}\n"), "<hr class=\"thin\" />\n");
    }

    #[test]
    fn test_colon_in_prose_is_not_directive() {
        let registry = registry(generic());
        assert_eq!(
            render(&registry, "Time: 10:30, see http://x.org\n"),
            "<p>Time: 10:30, see http://x.org</p>\n"
        );
    }

    #[test]
    fn test_unclosed_container_stays_text() {
        let registry = registry(generic());
        assert_eq!(render(&registry, ":::note\nx\n"), "<p>:::note\nx</p>\n");
    }

    #[test]
    fn test_find_marker_skips_longer_runs() {
        assert_eq!(find_marker(":::note", ":"), None);
        assert_eq!(find_marker(":::note", ":::"), Some(0));
        assert_eq!(find_marker("::::x :y", ":::"), None);
        assert_eq!(find_marker("::::x :y", ":"), Some(6));
    }

    #[test]
    fn test_label_requires_exact_name() {
        let registry = registry(vec![
            DirectiveSpec::new(Level::Container, ":::")
                .with_label("box")
                .with_tokenizer(|_, token, _| {
                    token.tokens.clear();
                    Ok(())
                })
                .with_renderer(|_, _| Ok(Rendered::Html("BOX".to_owned()))),
            DirectiveSpec::new(Level::Container, ":::"),
        ]);
        assert_eq!(render(&registry, ":::box\nx\n:::\n"), "BOX");
        assert_eq!(
            render(&registry, ":::boxes\nx\n:::\n"),
            "<boxes>\n<p>x</p>\n</boxes>\n"
        );
    }

    #[test]
    fn test_tag_override() {
        let registry = registry(vec![
            DirectiveSpec::new(Level::Container, ":::")
                .with_label("callout")
                .with_tag("aside"),
        ]);
        let html = render(&registry, ":::callout\nhi\n:::\n");
        assert_eq!(html, "<aside>\n<p>hi</p>\n</aside>\n");
    }

    #[test]
    fn test_label_disambiguates_renderers() {
        let first = DirectiveSpec::new(Level::Container, ":::")
            .with_label("alpha")
            .with_renderer(|_, _| Ok(Rendered::Html("ALPHA".to_owned())));
        let second = DirectiveSpec::new(Level::Container, ":::")
            .with_label("beta")
            .with_renderer(|_, _| Ok(Rendered::Html("BETA".to_owned())));
        let alpha = create_directive(first).unwrap();
        let beta = create_directive(second).unwrap();
        let mut registry = ExtensionRegistry::new();
        registry.register(alpha.clone()).register(beta.clone());

        let tokens = Lexer::new(&registry)
            .block_tokens(":::beta\nx\n:::")
            .unwrap();
        let token = &tokens[0];
        assert_eq!(token.meta_name(), Some("beta"));

        let renderer = Renderer::new(&registry);
        assert_eq!(alpha.render(token, &renderer).unwrap(), Rendered::Skip);
        assert_eq!(
            beta.render(token, &renderer).unwrap(),
            Rendered::Html("BETA".to_owned())
        );
    }

    #[test]
    fn test_custom_tokenizer_annotates_token() {
        let spec = DirectiveSpec::new(Level::Container, ":::")
            .with_label("shout")
            .with_tokenizer(|text, token, lexer| {
                token.tokens = lexer.inline_tokens(&text.trim().to_uppercase())?;
                Ok(())
            })
            .with_renderer(|token, renderer| {
                Ok(Rendered::Html(format!(
                    "<strong>{}</strong>",
                    renderer.render_inline(&token.tokens)?
                )))
            });
        let registry = registry(vec![spec]);
        assert_eq!(render(&registry, ":::shout\nhey\n:::"), "<strong>HEY</strong>");
    }

    #[test]
    fn test_container_header_text() {
        let registry = registry(generic());
        let tokens = Lexer::new(&registry)
            .block_tokens(":::box[Heading]\nbody\n:::")
            .unwrap();
        assert_eq!(tokens[0].header.as_deref(), Some("Heading"));
        assert_eq!(tokens[0].text, "\nbody");
    }

    #[test]
    fn test_malformed_attrs_are_fatal() {
        let registry = registry(generic());
        let err = Lexer::new(&registry)
            .block_tokens("::x{title=\"open}\n")
            .unwrap_err();
        assert!(matches!(err, Error::Attributes { .. }));
    }

    #[test]
    fn test_round_trip_raw() {
        let registry = registry(generic());
        let src = "Intro :em[x]\n\n:::note\nA\n:::\n::toc\n\nEnd\n";
        let tokens = Lexer::new(&registry).block_tokens(src).unwrap();
        assert_eq!(concat_raw(&tokens), src);
    }

    #[test]
    fn test_render_is_idempotent() {
        let registry = registry(generic());
        let tokens = Lexer::new(&registry)
            .block_tokens(":::note{.a}\n::b[x]\n:::")
            .unwrap();
        let renderer = Renderer::new(&registry);
        let first = renderer.render_block(&tokens).unwrap();
        let second = renderer.render_block(&tokens).unwrap();
        assert_eq!(first, second);
    }
}
