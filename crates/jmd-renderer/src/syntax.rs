//! Syntax extensions layered on the baseline grammar.
//!
//! LaTeX passthrough, `{{moustache}}` references, anchors, inline comments
//! and `<script>` blocks are always available. The emphasis variants at the
//! bottom (`/italic/`, `*strong*`, `__underline__`, sub- and superscripts)
//! change the meaning of baseline syntax and are opt-out.

use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::extension::{ExtensionDescriptor, Rendered};
use crate::lexer::Lexer;
use crate::metadata::Metadata;
use crate::render::Renderer;
use crate::script::EvaluationContext;
use crate::token::{CallOutcome, Level, Payload, RenderMode, Token};
use crate::util::escape_html;

static LATEX_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$|\\\(|\\\[").unwrap());
static LATEX_DISPLAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?s:\$\$([^$]*?)\$\$|\\\[(.*?)\\\])").unwrap());
static LATEX_INLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\$([^$]+?)\$|\\\((.*?)\\\))").unwrap());

static MOUSTACHE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\{\{([^}]+)\}\}").unwrap());

static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^\u{2693}\u{FE0F}?([a-zA-Z0-9_-]+)").unwrap());

static SCRIPT_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<script").unwrap());
static SCRIPT_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)^<script((?:\s+(?:src="[^"]*"|type="[^"]*"|defer|async|integrity="[^"]*"|crossorigin(?:="[^"]*")?))*)\s*>((?s:.*?))</script>[ \t]*\n?"#,
    )
    .unwrap()
});
static SCRIPT_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)type="([^"]*)""#).unwrap());

static ITALICS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([^/.?!]+[.?!]?)/").unwrap());
static STRONG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*([^*]+)\*").unwrap());
static UNDERLINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^__([^_]+)__").unwrap());
static SUBSCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^_([a-zA-Z0-9]|\{[^}]*\})").unwrap());
static SUPERSCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\^([a-zA-Z0-9]|\{[^}]*\})").unwrap());

/// Script `type` values executed in the evaluation context.
const LUA_SCRIPT_TYPES: &[&str] = &["text/lua", "lua", "text/jmarkdown", "jmarkdown"];

/// `$...$`, `$$...$$`, `\(...\)` and `\[...\]` passed through for MathJax.
///
/// Tried before every other inline extension so Markdown never looks inside
/// the math.
#[must_use]
pub fn latex() -> ExtensionDescriptor {
    ExtensionDescriptor::new(
        "latex",
        Level::Inline,
        |src| LATEX_START.find(src).map(|m| m.start()),
        |src, _| {
            let (captures, display) = match LATEX_DISPLAY.captures(src) {
                Some(captures) => (captures, true),
                None => match LATEX_INLINE.captures(src) {
                    Some(captures) => (captures, false),
                    None => return Ok(None),
                },
            };
            let math = captures
                .get(1)
                .or_else(|| captures.get(2))
                .map_or("", |m| m.as_str());
            let mut token = Token::new("latex", Level::Inline, &captures[0]).with_text(math);
            if display {
                token.mode = RenderMode::Block;
            }
            Ok(Some(token))
        },
        |token, _| {
            let math = token.text.replace('<', "&lt;").replace('>', "&gt;");
            Ok(Rendered::Html(match token.mode {
                RenderMode::Block => format!("$${math}$$"),
                RenderMode::Inline => format!("${math}$"),
            }))
        },
    )
    .with_priority(1)
}

/// `{{name}}`: the front matter value of `name`, else the value of `name`
/// as a Lua expression, else the reference as written.
#[must_use]
pub fn moustache(metadata: Rc<Metadata>, context: Rc<EvaluationContext>) -> ExtensionDescriptor {
    ExtensionDescriptor::new(
        "moustache",
        Level::Inline,
        |src| src.find("{{"),
        |src, _| {
            Ok(MOUSTACHE
                .captures(src)
                .map(|caps| Token::new("moustache", Level::Inline, &caps[0]).with_text(&caps[1])))
        },
        move |token, _| {
            let values = metadata.get(token.text.trim());
            if !values.is_empty() {
                return Ok(Rendered::Html(values.concat()));
            }
            // `nil` (an undefined name) evaluates to the empty string.
            Ok(Rendered::Html(match context.eval(&token.text) {
                Ok(value) if !value.is_empty() => value,
                Ok(_) => escape_html(&token.raw),
                Err(err) => {
                    tracing::debug!(reference = %token.text, error = %err, "Unresolved moustache");
                    escape_html(&token.raw)
                }
            }))
        },
    )
}

/// `⚓️name` marks a link target.
#[must_use]
pub fn anchor() -> ExtensionDescriptor {
    ExtensionDescriptor::new(
        "anchor",
        Level::Inline,
        |src| src.find('\u{2693}'),
        |src, _| {
            Ok(ANCHOR
                .captures(src)
                .map(|caps| Token::new("anchor", Level::Inline, &caps[0]).with_text(&caps[1])))
        },
        |token, _| Ok(Rendered::Html(format!("<span id='{}'></span>", token.text))),
    )
}

/// `marker text` to the end of the line becomes an HTML comment.
///
/// With `verbatim` the comment keeps the text; otherwise it only notes that
/// source was commented out.
pub fn inline_comment(marker: &str, verbatim: bool) -> Result<ExtensionDescriptor> {
    let rule = Regex::new(&format!("^{}([^\n]*)", regex::escape(marker))).map_err(|source| {
        Error::Regex {
            extension: "inlineComment".to_owned(),
            source,
        }
    })?;
    let marker = marker.to_owned();
    Ok(ExtensionDescriptor::new(
        "inlineComment",
        Level::Inline,
        move |src| src.find(marker.as_str()),
        move |src, _| {
            Ok(rule.captures(src).map(|caps| {
                Token::new("inlineComment", Level::Inline, &caps[0]).with_text(caps[1].trim())
            }))
        },
        move |token, _| {
            Ok(Rendered::Html(if verbatim {
                format!("<!-- {} -->", token.text.replace("--", "- -"))
            } else {
                "<!-- Markdown source commented out -->".to_owned()
            }))
        },
    ))
}

/// `<script>` elements.
///
/// Lua scripts (`type="text/lua"`) run in the evaluation context when the
/// document is tokenized, and the string they return takes their place.
/// Any other script passes through untouched.
#[must_use]
pub fn script_blocks(context: Rc<EvaluationContext>) -> ExtensionDescriptor {
    ExtensionDescriptor::new(
        "scriptBlock",
        Level::Block,
        |src| SCRIPT_START.find(src).map(|m| m.start()),
        move |src, _| {
            let Some(caps) = SCRIPT_BLOCK.captures(src) else {
                return Ok(None);
            };
            let mut token = Token::new("scriptBlock", Level::Block, &caps[0]).with_text(&caps[2]);
            let is_lua = SCRIPT_TYPE
                .captures(&caps[1])
                .is_some_and(|t| LUA_SCRIPT_TYPES.contains(&t[1].to_ascii_lowercase().as_str()));
            if is_lua {
                let outcome = match context.run("script", &caps[2]) {
                    Ok(value) => CallOutcome::Success(value.unwrap_or_default()),
                    Err(err) => CallOutcome::EvalError {
                        message: err.message().lines().next().unwrap_or_default().to_owned(),
                        detail: err.message().to_owned(),
                    },
                };
                token.payload = Payload::Call(outcome);
            }
            Ok(Some(token))
        },
        |token, _| {
            Ok(Rendered::Html(match &token.payload {
                Payload::Call(CallOutcome::Success(html)) => html.clone(),
                Payload::Call(CallOutcome::EvalError { message, detail }) => format!(
                    r#"<div class="jmd-error jmd-script-error">Script failed: {}</div><details class="jmd-error-details"><summary>Details</summary><pre>{}</pre></details>"#,
                    escape_html(message),
                    escape_html(detail)
                ),
                _ => token.raw.clone(),
            }))
        },
    )
}

/// Wrap an inline rule whose first capture is inline Markdown.
fn emphasis(
    name: &'static str,
    trigger: &'static str,
    rule: &'static LazyLock<Regex>,
    reject: fn(&str, usize) -> bool,
    wrap: fn(String) -> String,
) -> ExtensionDescriptor {
    ExtensionDescriptor::new(
        name,
        Level::Inline,
        move |src| src.find(trigger),
        move |src, lexer: &Lexer<'_>| {
            let Some(caps) = rule.captures(src) else {
                return Ok(None);
            };
            if reject(src, caps[0].len()) {
                return Ok(None);
            }
            let tokens = lexer.inline_tokens(&caps[1])?;
            Ok(Some(
                Token::new(name, Level::Inline, &caps[0])
                    .with_text(&caps[1])
                    .with_children(tokens, RenderMode::Inline),
            ))
        },
        move |token, renderer: &Renderer<'_>| {
            Ok(Rendered::Html(wrap(renderer.render_children(token)?)))
        },
    )
}

fn accept(_: &str, _: usize) -> bool {
    false
}

fn without_braces(html: &str) -> String {
    html.replace(['{', '}'], "")
}

/// `/italic/`, `*strong*`, `__underline__`, `_sub`, `_{sub}`, `^sup` and
/// `^{sup}`, in registration order.
#[must_use]
pub fn syntax_modifications() -> Vec<ExtensionDescriptor> {
    vec![
        emphasis("italics", "/", &ITALICS, accept, |html| {
            format!("<em>{html}</em>")
        }),
        // `*a*` directly followed by another `*` is part of `**`.
        emphasis(
            "strong",
            "*",
            &STRONG,
            |src, len| src[len..].starts_with('*'),
            |html| format!("<strong>{html}</strong>"),
        ),
        emphasis("underline", "__", &UNDERLINE, accept, |html| {
            format!("<span style='text-decoration: underline;'>{html}</span>")
        }),
        emphasis("subscript", "_", &SUBSCRIPT, accept, |html| {
            format!("<sub>{}</sub>", without_braces(&html))
        }),
        emphasis("superscript", "^", &SUPERSCRIPT, accept, |html| {
            format!("<sup>{}</sup>", without_braces(&html))
        }),
    ]
}
