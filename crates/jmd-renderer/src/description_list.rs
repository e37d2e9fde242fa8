//! Description lists.
//!
//! ```text
//! Term:: First line of the definition.
//!     Deeper lines continue the definition.
//!
//!     Blank lines and nested lists are allowed.
//! Another term::
//!     The definition can start on the next line.
//! ```
//!
//! A line at the list's indent without `::` ends the list.

use crate::error::{Error, Result, excerpt};
use crate::extension::{ExtensionDescriptor, Rendered};
use crate::lexer::Lexer;
use crate::render::Renderer;
use crate::token::{DescriptionEntry, Level, Payload, Token};
use crate::util::indent_width;

/// Token kind of description lists.
pub const DESCRIPTION_LIST: &str = "descriptionList";

/// Line classification while scanning a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State<'a> {
    Initial,
    /// A new term at the list's indent.
    ParseFirstLine { term: &'a str, rest: &'a str },
    /// Definition content: deeper lines, nested terms and blank lines.
    GobbleLine,
    /// First line that does not belong to the list.
    Abort,
}

/// A term and the source of its definition.
struct Pair<'a> {
    term: &'a str,
    first: &'a str,
    lines: Vec<&'a str>,
}

impl Pair<'_> {
    /// Definition source: the text after `::`, then the continuation lines
    /// dedented to their common indent.
    fn definition(&self) -> String {
        let common = self
            .lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| indent_width(line))
            .min()
            .unwrap_or(0);
        let mut definition = format!("{}\n", self.first);
        for line in &self.lines {
            definition.push_str(strip_indent(line, common));
            definition.push('\n');
        }
        definition
    }
}

/// The description-list block extension.
#[must_use]
pub fn description_list() -> ExtensionDescriptor {
    ExtensionDescriptor::new(
        DESCRIPTION_LIST,
        Level::Block,
        start,
        tokenize,
        render,
    )
}

/// Split a line into its term (with indentation) and the text after `::`.
///
/// The term is everything before the first `::`; it must hold something
/// besides whitespace, and `::` must be followed by whitespace or the end of
/// the line.
fn split_term(line: &str) -> Option<(&str, &str)> {
    let at = line.find("::")?;
    let (term, rest) = (&line[..at], &line[at + 2..]);
    if term.trim().is_empty() || !(rest.is_empty() || rest.starts_with(char::is_whitespace)) {
        return None;
    }
    Some((term, rest))
}

fn start(src: &str) -> Option<usize> {
    let mut offset = 0;
    for line in src.split_inclusive('\n') {
        if split_term(trim_newline(line)).is_some() {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

fn classify(line: &str, base: usize) -> State<'_> {
    let indent = indent_width(line);
    match split_term(line) {
        Some((term, rest)) if indent == base => State::ParseFirstLine { term, rest },
        Some(_) if indent > base => State::GobbleLine,
        Some(_) => State::Abort,
        None if indent > base || line.trim().is_empty() => State::GobbleLine,
        None => State::Abort,
    }
}

/// Consumed length and pairs of the list at the start of `src`, if any.
fn scan(src: &str) -> Result<Option<(usize, Vec<Pair<'_>>)>> {
    let base = src.split_inclusive('\n').next().map_or(0, indent_width);
    let mut pairs: Vec<Pair<'_>> = Vec::new();
    let mut consumed = 0;
    let mut state = State::Initial;

    for line in src.split_inclusive('\n') {
        let content = trim_newline(line);
        let next = classify(content, base);
        if state == State::Initial && !matches!(next, State::ParseFirstLine { .. }) {
            return Ok(None);
        }
        state = next;

        match state {
            State::ParseFirstLine { term, rest } => pairs.push(Pair {
                term,
                first: rest,
                lines: Vec::new(),
            }),
            State::GobbleLine => {
                let Some(pair) = pairs.last_mut() else {
                    return Err(Error::DescriptionList {
                        line: excerpt(content),
                        message: "continuation line before any term".to_owned(),
                    });
                };
                pair.lines.push(strip_indent(content, base));
            }
            State::Abort => break,
            State::Initial => {}
        }
        consumed += line.len();
    }

    Ok((consumed > 0).then_some((consumed, pairs)))
}

fn tokenize(src: &str, lexer: &Lexer<'_>) -> Result<Option<Token>> {
    let Some((len, pairs)) = scan(src)? else {
        return Ok(None);
    };

    let entries = pairs
        .iter()
        .map(|pair| {
            Ok(DescriptionEntry {
                term: lexer.inline_tokens(pair.term.trim())?,
                definition: lexer.block_tokens(&pair.definition())?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::trace!(entries = entries.len(), "Description list");
    Ok(Some(
        Token::new(DESCRIPTION_LIST, Level::Block, &src[..len])
            .with_payload(Payload::DescriptionList(entries)),
    ))
}

fn render(token: &Token, renderer: &Renderer<'_>) -> Result<Rendered> {
    let Payload::DescriptionList(entries) = &token.payload else {
        return Ok(Rendered::Skip);
    };
    let mut html = String::from("<dl>");
    for entry in entries {
        html.push_str("<dt>");
        html.push_str(&renderer.render_inline(&entry.term)?);
        html.push_str("</dt><dd>");
        html.push_str(&renderer.render_block(&entry.definition)?);
        html.push_str("</dd>");
    }
    html.push_str("</dl>\n");
    Ok(Rendered::Html(html))
}

fn trim_newline(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

/// Remove up to `width` leading whitespace characters.
fn strip_indent(line: &str, width: usize) -> &str {
    let offset = line
        .char_indices()
        .take(width)
        .take_while(|(_, c)| c.is_whitespace())
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &line[offset..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ExtensionRegistry;
    use crate::token::{MARKDOWN, concat_raw};
    use pretty_assertions::assert_eq;

    fn registry() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        registry.register(description_list());
        registry
    }

    fn render(src: &str) -> String {
        let registry = registry();
        let tokens = Lexer::new(&registry).block_tokens(src).unwrap();
        Renderer::new(&registry).render_block(&tokens).unwrap()
    }

    fn entries(token: &Token) -> &[DescriptionEntry] {
        match &token.payload {
            Payload::DescriptionList(entries) => entries,
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_two_single_line_entries() {
        let registry = registry();
        let tokens = Lexer::new(&registry)
            .block_tokens("A:: one\nB:: two\n")
            .unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].raw, "A:: one\nB:: two\n");
        assert_eq!(entries(&tokens[0]).len(), 2);
        assert_eq!(
            render("A:: one\nB:: two\n"),
            "<dl><dt>A</dt><dd><p>one</p>\n</dd><dt>B</dt><dd><p>two</p>\n</dd></dl>\n"
        );
    }

    #[test]
    fn test_paragraph_ends_list() {
        let registry = registry();
        let src = "Term:: def\nNormal paragraph.\n";
        let tokens = Lexer::new(&registry).block_tokens(src).unwrap();
        assert_eq!(tokens[0].raw, "Term:: def\n");
        assert_eq!(tokens[1].kind, MARKDOWN);
        assert_eq!(tokens[1].raw, "Normal paragraph.\n");
        assert_eq!(
            render(src),
            "<dl><dt>Term</dt><dd><p>def</p>\n</dd></dl>\n<p>Normal paragraph.</p>\n"
        );
    }

    #[test]
    fn test_nested_list() {
        let src = "A:: outer\n  B:: inner\n  C:: second\nD:: two\n";
        let registry = registry();
        let tokens = Lexer::new(&registry).block_tokens(src).unwrap();
        assert_eq!(tokens.len(), 1);
        let outer = entries(&tokens[0]);
        assert_eq!(outer.len(), 2);
        assert!(outer[0].definition.iter().any(|t| t.kind == DESCRIPTION_LIST));
        assert_eq!(
            render(src),
            "<dl><dt>A</dt><dd><p>outer</p>\n\
             <dl><dt>B</dt><dd><p>inner</p>\n</dd><dt>C</dt><dd><p>second</p>\n</dd></dl>\n\
             </dd><dt>D</dt><dd><p>two</p>\n</dd></dl>\n"
        );
    }

    #[test]
    fn test_definition_on_following_lines() {
        let src = "Term::\n    First paragraph.\n\n    Second paragraph.\nAfter\n";
        assert_eq!(
            render(src),
            "<dl><dt>Term</dt><dd><p>First paragraph.</p>\n<p>Second paragraph.</p>\n</dd></dl>\n<p>After</p>\n"
        );
    }

    #[test]
    fn test_term_is_inline_markdown() {
        assert_eq!(
            render("*Em* term:: x\n"),
            "<dl><dt><em>Em</em> term</dt><dd><p>x</p>\n</dd></dl>\n"
        );
    }

    #[test]
    fn test_list_interrupts_paragraph() {
        let registry = registry();
        let src = "Intro line\nA:: b\n";
        let tokens = Lexer::new(&registry).block_tokens(src).unwrap();
        assert_eq!(tokens[0].raw, "Intro line\n");
        assert_eq!(tokens[1].kind, DESCRIPTION_LIST);
        assert_eq!(concat_raw(&tokens), src);
    }

    #[test]
    fn test_not_a_term() {
        assert_eq!(split_term("std::vector is generic"), None);
        assert_eq!(split_term(":: empty term"), None);
        assert_eq!(split_term("a::: x"), None);
        assert_eq!(split_term("a:b:: c"), Some(("a:b", " c")));
        assert_eq!(split_term("  x::"), Some(("  x", "")));
        assert_eq!(
            render("Use std::vector here.\n"),
            "<p>Use std::vector here.</p>\n"
        );
    }

    #[test]
    fn test_start_probe() {
        assert_eq!(start("para\nmore\nT:: d\n"), Some(10));
        assert_eq!(start("no list here\n"), None);
    }

    #[test]
    fn test_strip_indent() {
        assert_eq!(strip_indent("    x", 2), "  x");
        assert_eq!(strip_indent(" x", 4), "x");
        assert_eq!(strip_indent("x", 3), "x");
    }
}
