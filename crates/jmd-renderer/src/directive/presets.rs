//! Preset markers and the standard directive library.

use std::sync::LazyLock;

use regex::Regex;

use super::factory::DirectiveSpec;
use super::game::game_spec;
use crate::error::Result;
use crate::extension::Rendered;
use crate::render::Renderer;
use crate::token::{Level, Token};
use crate::util::escape_html;

/// Container markers, shortest first. Longer markers nest shorter ones.
pub const CONTAINER_MARKERS: [&str; 6] = [
    ":::", "::::", ":::::", "::::::", ":::::::", "::::::::",
];

static TITLE_BOX_RULE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*{3,}").unwrap());

/// Unlabeled directives for every preset marker.
#[must_use]
pub fn preset_specs() -> Vec<DirectiveSpec> {
    let mut specs: Vec<_> = CONTAINER_MARKERS
        .iter()
        .map(|marker| DirectiveSpec::new(Level::Container, *marker))
        .collect();
    specs.push(DirectiveSpec::new(Level::Block, "::"));
    specs.push(DirectiveSpec::new(Level::Inline, ":"));
    specs
}

/// Labeled directives for document front matter, cross references and
/// common containers.
#[must_use]
pub fn standard_specs() -> Vec<DirectiveSpec> {
    let mut specs = vec![
        DirectiveSpec::new(Level::Block, "::")
            .with_label("title")
            .with_renderer(|token, renderer| stripped_div("title", token, renderer)),
        DirectiveSpec::new(Level::Block, "::")
            .with_label("subtitle")
            .with_renderer(|token, renderer| stripped_div("subtitle", token, renderer)),
        DirectiveSpec::new(Level::Block, "::")
            .with_label("author")
            .with_renderer(|token, _| {
                Ok(Rendered::Html(format!(r#"<div class="author">{}</div>"#, token.text)))
            }),
        DirectiveSpec::new(Level::Block, "::")
            .with_label("institution")
            .with_tokenizer(|text, token, lexer| {
                token.tokens = lexer.inline_tokens(&text.trim().replace('\n', "<br>"))?;
                Ok(())
            })
            .with_renderer(|token, renderer| stripped_div("institution", token, renderer)),
        DirectiveSpec::new(Level::Block, "::")
            .with_label("date")
            .with_renderer(|token, renderer| {
                Ok(Rendered::Html(format!(
                    r#"<div class="date">{}</div>"#,
                    renderer.render_block(&token.tokens)?
                )))
            }),
        DirectiveSpec::new(Level::Inline, ":")
            .with_label("today")
            .with_renderer(|_, _| {
                let today = chrono::Local::now().format("%-d %B %Y");
                Ok(Rendered::Html(format!(r#"<span class="date">{today}</span>"#)))
            }),
        DirectiveSpec::new(Level::Inline, ":")
            .with_label("label")
            .with_renderer(|token, _| {
                Ok(Rendered::Html(format!(
                    "<span class='xref-label' data-key='{}'></span>",
                    escape_html(&token.text)
                )))
            }),
        DirectiveSpec::new(Level::Inline, ":")
            .with_label("ref")
            .with_renderer(|token, _| {
                Ok(Rendered::Html(format!(
                    "<span class='xref-ref' data-key='{}'></span>",
                    escape_html(&token.text)
                )))
            }),
        DirectiveSpec::new(Level::Inline, ":")
            .with_label("target")
            .with_renderer(|token, _| {
                Ok(Rendered::Html(format!(
                    "<span id='{}'></span>",
                    escape_html(&token.text)
                )))
            }),
        DirectiveSpec::new(Level::Container, ":::")
            .with_label("abstract")
            .with_renderer(|token, renderer| {
                Ok(Rendered::Html(format!(
                    "<div class=\"abstract\"><div class='label'>Abstract</div>{}</div>",
                    renderer.render_block(&token.tokens)?
                )))
            }),
        DirectiveSpec::new(Level::Container, ":::")
            .with_label("feedback")
            .with_renderer(|token, renderer| {
                Ok(Rendered::Html(format!(
                    "<p class='feedback'>Feedback</p><section class=\"feedback\">{}</section>",
                    renderer.render_block(&token.tokens)?
                )))
            }),
        DirectiveSpec::new(Level::Container, ":::")
            .with_label("title-box")
            .with_tokenizer(|text, token, lexer| {
                let mut parts = TITLE_BOX_RULE.splitn(text, 2);
                let title = parts.next().unwrap_or_default();
                let body = parts.next().unwrap_or_default();
                token
                    .sections
                    .insert("title".to_owned(), lexer.block_tokens(title)?);
                token
                    .sections
                    .insert("body".to_owned(), lexer.block_tokens(body)?);
                Ok(())
            })
            .with_renderer(|token, renderer| {
                Ok(Rendered::Html(format!(
                    "<div class=\"title-box\"><div class='title'>{}</div><div class='body'>{}</div></div>",
                    renderer.render_block(token.section("title"))?,
                    renderer.render_block(token.section("body"))?
                )))
            }),
        DirectiveSpec::new(Level::Container, ":::")
            .with_label("source")
            .with_renderer(|token, renderer| {
                let target = token
                    .attrs
                    .as_ref()
                    .and_then(|attrs| attrs.get("target"))
                    .unwrap_or_default();
                Ok(Rendered::Html(format!(
                    "<div data-target='{}'>{}</div>",
                    escape_html(target),
                    renderer.render_block(&token.tokens)?
                )))
            }),
    ];
    specs.push(game_spec());
    specs.extend(markdown_demo_specs());
    specs.extend(optional_specs("comment", false));
    specs.extend(optional_specs("answer", false));
    specs
}

/// Side-by-side source and rendering, for every container marker.
#[must_use]
pub fn markdown_demo_specs() -> Vec<DirectiveSpec> {
    CONTAINER_MARKERS
        .iter()
        .map(|marker| {
            DirectiveSpec::new(Level::Container, *marker)
                .with_label("markdown-demo")
                .with_tokenizer(|text, token, lexer| {
                    token
                        .sections
                        .insert("output".to_owned(), lexer.block_tokens(text)?);
                    Ok(())
                })
                .with_renderer(render_markdown_demo)
        })
        .collect()
}

fn render_markdown_demo(token: &Token, renderer: &Renderer<'_>) -> Result<Rendered> {
    // The body always starts with the newline ending the opening line.
    let code = token.text.strip_prefix('\n').unwrap_or(&token.text);
    let lang = token
        .attrs
        .as_ref()
        .and_then(|attrs| attrs.get("type"))
        .unwrap_or("markdown");
    let output = renderer.render_block(token.section("output"))?;
    Ok(Rendered::Html(format!(
        "<div class='markdown-demo-container'>\n\
         <div class='markdown-demo-code-label'>Markdown code</div>\n\
         <div class='markdown-demo-output-label'>Markdown output</div>\n\
         <div class='markdown-demo-markdown'>\n\
         <pre><code class='language-{}'>{}</code></pre>\n\
         </div>\n\
         <div class='markdown-demo-parsed'>\n{output}</div>\n\
         </div>\n",
        escape_html(lang),
        escape_html(code),
    )))
}

/// Container directives `name` at every container marker whose body is
/// shown only when `{include}` is set, or when `default` is true and the
/// directive does not say `include=false`.
#[must_use]
pub fn optional_specs(name: &str, default: bool) -> Vec<DirectiveSpec> {
    CONTAINER_MARKERS
        .iter()
        .map(|marker| {
            DirectiveSpec::new(Level::Container, *marker)
                .with_label(name)
                .with_renderer(move |token, renderer| {
                    let include = token
                        .attrs
                        .as_ref()
                        .and_then(|attrs| attrs.flag("include"))
                        .unwrap_or(default);
                    Ok(Rendered::Html(if include {
                        renderer.render_block(&token.tokens)?
                    } else {
                        String::new()
                    }))
                })
        })
        .collect()
}

/// `<div class="{class}">` around block-rendered children with paragraph
/// tags removed.
fn stripped_div(class: &str, token: &Token, renderer: &Renderer<'_>) -> Result<Rendered> {
    let html = renderer
        .render_block(&token.tokens)?
        .replace("<p>", "")
        .replace("</p>", "");
    Ok(Rendered::Html(format!(r#"<div class="{class}">{html}</div>"#)))
}
