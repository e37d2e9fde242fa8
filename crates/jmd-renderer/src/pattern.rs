//! Configurable pattern extensions.
//!
//! A pattern is declared in two parts: a delimiter line and an HTML
//! template using `${content1}` .. `${contentN}` placeholders.
//!
//! The delimiter line has two forms:
//!
//! - literal: `start end [policy] [count]`, e.g. `<< >> false`. Arguments
//!   between the delimiters are separated by commas and may be quoted.
//! - structured: `/probe/ /pattern/ policy count`, two regular expressions
//!   with `\/` for a literal slash. The pattern's capture groups are the
//!   arguments.
//!
//! The policy decides how arguments reach the template: `false` keeps them
//! literal, `true` renders each as inline Markdown, `[true, false, ...]`
//! chooses per argument. Structured patterns also accept `inline` and
//! `block`, which substitute the raw captures first and render the result
//! as Markdown.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::Result;
use crate::extension::{ExtensionDescriptor, Rendered};
use crate::lexer::Lexer;
use crate::render::Renderer;
use crate::token::{Argument, Level, Payload, RenderMode, Token};

/// Malformed pattern definition.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("pattern `{name}` needs a start and an end delimiter")]
    MissingDelimiters { name: String },

    #[error("pattern `{name}` has an invalid content policy `{policy}`")]
    Policy { name: String, policy: String },

    #[error("pattern `{name}` has an invalid argument count `{count}`")]
    Count { name: String, count: String },

    #[error("pattern `{name}` has a malformed definition line `{line}`")]
    Malformed { name: String, line: String },

    #[error("pattern `{name}` has an invalid regular expression: {source}")]
    Regex {
        name: String,
        #[source]
        source: regex::Error,
    },
}

/// How captured arguments reach the template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPolicy {
    /// Substituted as written.
    Literal,
    /// Each argument rendered as inline Markdown.
    Inline,
    /// Chosen per argument; missing entries are literal.
    PerArgument(Vec<bool>),
    /// Raw arguments substituted, then the template rendered inline.
    InlineTemplate,
    /// Raw arguments substituted, then the template rendered as blocks.
    BlockTemplate,
}

impl ContentPolicy {
    fn parses(&self, index: usize) -> bool {
        match self {
            Self::Inline => true,
            Self::PerArgument(flags) => flags.get(index).copied().unwrap_or(false),
            Self::Literal | Self::InlineTemplate | Self::BlockTemplate => false,
        }
    }

    fn is_template(&self) -> bool {
        matches!(self, Self::InlineTemplate | Self::BlockTemplate)
    }
}

/// A parsed pattern definition.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub name: String,
    probe: Regex,
    pattern: Regex,
    /// Arguments are raw captures rather than unquoted literal arguments.
    structured: bool,
    pub policy: ContentPolicy,
    pub count: usize,
    pub template: String,
}

static STRUCTURED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^/(?P<start>(?:\\/|[^/])+)/\s+/(?P<tokens>(?:\\/|[^/])+)/\s+(?P<parse>true|false|block|inline|\[\s*(?:true|false)(?:\s*,?\s*(?:true|false))*\s*\])\s*(?P<args>[0-9]*)",
    )
    .unwrap()
});

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{content([0-9]+)\}").unwrap());

/// One literal-pattern argument: anything, or a quoted string.
const ARGUMENT: &str = r#"(.*?|"(?:[^"]*?|\\")*?)"#;

impl PatternSpec {
    /// Parse a definition: the delimiter line, then the template.
    pub fn parse(name: &str, definition: &str) -> Result<Self, PatternError> {
        let (line, template) = definition.split_once('\n').unwrap_or((definition, ""));
        let line = line.trim();
        let template = dedent(template);
        if line.starts_with('/') {
            Self::structured(name, line, template)
        } else {
            Self::literal(name, line, template)
        }
    }

    fn literal(name: &str, line: &str, template: String) -> Result<Self, PatternError> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [start, end, rest @ ..] = parts.as_slice() else {
            return Err(PatternError::MissingDelimiters {
                name: name.to_owned(),
            });
        };

        let policy = match rest.first() {
            Some(policy) => parse_policy(name, policy, false)?,
            None => ContentPolicy::Literal,
        };
        let count = match rest.get(1) {
            Some(count) => parse_count(name, count)?,
            None => 1,
        };
        if rest.len() > 2 {
            return Err(PatternError::Malformed {
                name: name.to_owned(),
                line: line.to_owned(),
            });
        }

        let arguments = vec![ARGUMENT; count].join(r",\s*");
        let source = format!("{}{arguments}{}", regex::escape(start), regex::escape(end));
        Ok(Self {
            name: name.to_owned(),
            probe: compile(name, &source)?,
            pattern: compile(name, &format!("^{source}"))?,
            structured: false,
            policy,
            count,
            template,
        })
    }

    fn structured(name: &str, line: &str, template: String) -> Result<Self, PatternError> {
        let captures = STRUCTURED
            .captures(line)
            .ok_or_else(|| PatternError::Malformed {
                name: name.to_owned(),
                line: line.to_owned(),
            })?;
        let start = captures["start"].replace(r"\/", "/");
        let tokens = captures["tokens"].replace(r"\/", "/");
        let policy = parse_policy(name, &captures["parse"], true)?;
        let pattern = compile(name, &format!("^(?:{tokens})"))?;
        let count = match &captures["args"] {
            "" => pattern.captures_len() - 1,
            count => parse_count(name, count)?,
        };

        Ok(Self {
            name: name.to_owned(),
            probe: compile(name, &start)?,
            pattern,
            structured: true,
            policy,
            count,
            template,
        })
    }

    /// Substitute `${contentN}` placeholders in one pass. Unknown
    /// placeholders are left as written.
    #[must_use]
    pub fn fill(&self, values: &[String]) -> String {
        PLACEHOLDER
            .replace_all(&self.template, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| values.get(n.checked_sub(1)?))
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_owned())
            })
            .into_owned()
    }
}

fn compile(name: &str, source: &str) -> Result<Regex, PatternError> {
    Regex::new(source).map_err(|source| PatternError::Regex {
        name: name.to_owned(),
        source,
    })
}

fn parse_policy(name: &str, policy: &str, structured: bool) -> Result<ContentPolicy, PatternError> {
    let lowered = policy.trim().to_lowercase();
    match lowered.as_str() {
        "true" => Ok(ContentPolicy::Inline),
        "false" => Ok(ContentPolicy::Literal),
        "inline" if structured => Ok(ContentPolicy::InlineTemplate),
        "block" if structured => Ok(ContentPolicy::BlockTemplate),
        list if list.starts_with('[') => serde_json::from_str::<Vec<bool>>(list)
            .map(ContentPolicy::PerArgument)
            .map_err(|_| PatternError::Policy {
                name: name.to_owned(),
                policy: policy.to_owned(),
            }),
        _ => Err(PatternError::Policy {
            name: name.to_owned(),
            policy: policy.to_owned(),
        }),
    }
}

fn parse_count(name: &str, count: &str) -> Result<usize, PatternError> {
    count
        .parse::<usize>()
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| PatternError::Count {
            name: name.to_owned(),
            count: count.to_owned(),
        })
}

/// Strip one pair of surrounding quotes and unescape `\"`.
fn unquote(value: &str) -> String {
    let value = value.trim();
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    inner.replace("\\\"", "\"")
}

/// Build the inline extension for a pattern.
#[must_use]
pub fn pattern_extension(spec: PatternSpec) -> ExtensionDescriptor {
    let name = spec.name.clone();
    let probe = spec.probe.clone();
    let tokenize_spec = spec.clone();
    ExtensionDescriptor::new(
        name,
        Level::Inline,
        move |src| probe.find(src).map(|m| m.start()),
        move |src, lexer| tokenize(&tokenize_spec, src, lexer),
        move |token, renderer| render(&spec, token, renderer),
    )
}

fn tokenize(spec: &PatternSpec, src: &str, lexer: &Lexer<'_>) -> Result<Option<Token>> {
    let Some(captures) = spec.pattern.captures(src) else {
        return Ok(None);
    };
    let raw = captures.get(0).map_or("", |m| m.as_str());
    if raw.is_empty() {
        return Ok(None);
    }
    let values: Vec<String> = (1..=spec.count)
        .map(|i| {
            let value = captures.get(i).map_or("", |m| m.as_str());
            if spec.structured { value.to_owned() } else { unquote(value) }
        })
        .collect();

    let mut token = Token::new(spec.name.as_str(), Level::Inline, raw);
    match &spec.policy {
        ContentPolicy::InlineTemplate => {
            token.tokens = lexer.inline_tokens(&spec.fill(&values))?;
            token.mode = RenderMode::Inline;
        }
        ContentPolicy::BlockTemplate => {
            token.tokens = lexer.block_tokens(&spec.fill(&values))?;
            token.mode = RenderMode::Block;
        }
        policy => {
            let arguments = values
                .into_iter()
                .enumerate()
                .map(|(i, value)| {
                    let tokens = if policy.parses(i) {
                        Some(lexer.inline_tokens(&value)?)
                    } else {
                        None
                    };
                    Ok(Argument { value, tokens })
                })
                .collect::<Result<Vec<_>>>()?;
            token.payload = Payload::Arguments(arguments);
        }
    }
    Ok(Some(token))
}

fn render(spec: &PatternSpec, token: &Token, renderer: &Renderer<'_>) -> Result<Rendered> {
    if spec.policy.is_template() {
        return renderer.render_children(token).map(Rendered::Html);
    }
    let Payload::Arguments(arguments) = &token.payload else {
        return Ok(Rendered::Skip);
    };
    let values = arguments
        .iter()
        .map(|argument| match &argument.tokens {
            Some(tokens) => renderer.render_inline(tokens),
            None => Ok(argument.value.clone()),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Rendered::Html(spec.fill(&values)))
}

/// Remove the indentation common to every non-blank line, so a template
/// keeps its own layout but not the front matter indentation around it.
fn dedent(template: &str) -> String {
    let indent = template
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);
    template
        .lines()
        .map(|line| line.get(indent..).unwrap_or_else(|| line.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .trim_end()
        .to_owned()
}
