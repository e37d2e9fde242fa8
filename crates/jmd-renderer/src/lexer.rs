//! Host grammar lexer.
//!
//! Offers every block start and every inline candidate position to the
//! registered extensions before falling back to the baseline grammar. The
//! baseline itself is not tokenized further: blank lines, fenced code and
//! Markdown chunks are kept as raw text for `pulldown-cmark`.

use crate::error::{Error, Result, excerpt};
use crate::extension::ExtensionDescriptor;
use crate::fence::{fenced_block_len, opens_fence};
use crate::registry::ExtensionRegistry;
use crate::token::Token;
use crate::util::indent_width;

/// Block and inline lexer over one registry.
#[derive(Debug)]
pub struct Lexer<'r> {
    block: Vec<&'r ExtensionDescriptor>,
    inline: Vec<&'r ExtensionDescriptor>,
}

impl<'r> Lexer<'r> {
    #[must_use]
    pub fn new(registry: &'r ExtensionRegistry) -> Self {
        Self {
            block: registry.dispatch_order(|d| !d.level().is_inline()),
            inline: registry.dispatch_order(|d| d.level().is_inline()),
        }
    }

    /// Tokenize block content.
    ///
    /// Each token starts where the previous one's `raw` ends, so the raws
    /// concatenate back to `src`.
    pub fn block_tokens(&self, src: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut pos = 0;

        while pos < src.len() {
            let rest = &src[pos..];
            let token = if let Some(len) = blank_lines_len(rest) {
                Token::space(&rest[..len])
            } else if let Some(token) = try_extensions(&self.block, rest, self)? {
                token
            } else if let Some(len) = fenced_block_len(rest) {
                Token::code(&rest[..len])
            } else {
                let (len, interrupt) = self.markdown_chunk(rest)?;
                let raw = &rest[..len];
                tokens.push(Token::markdown(raw, self.inline_tokens(raw)?));
                pos += len;
                if let Some(token) = interrupt {
                    pos += token.raw.len();
                    tokens.push(token);
                }
                continue;
            };
            pos += token.raw.len();
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Tokenize inline content. Adjacent baseline text merges into one
    /// `text` token.
    pub fn inline_tokens(&self, src: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut text_start = 0;
        let mut pos = 0;

        while pos < src.len() {
            let rest = &src[pos..];
            if let Some(token) = try_extensions(&self.inline, rest, self)? {
                if text_start < pos {
                    tokens.push(Token::text(&src[text_start..pos]));
                }
                pos += token.raw.len();
                tokens.push(token);
                text_start = pos;
                continue;
            }
            pos += opaque_len(rest).unwrap_or_else(|| self.next_candidate(rest));
        }

        if text_start < src.len() {
            tokens.push(Token::text(&src[text_start..]));
        }
        Ok(tokens)
    }

    /// Length of the baseline Markdown chunk at the start of `src`, and the
    /// extension token that interrupted it, if any.
    fn markdown_chunk(&self, src: &str) -> Result<(usize, Option<Token>)> {
        let mut lines = src.split_inclusive('\n');
        let first = lines.next().unwrap_or_default();
        let list = is_list_item(first);
        let mut len = first.len();
        let mut pending_blank = 0;
        let mut hint = self.block_hint(&src[len..]).map(|h| h + len);

        for line in lines {
            let offset = len + pending_blank;
            if line.trim().is_empty() {
                if !list {
                    break;
                }
                pending_blank += line.len();
                continue;
            }

            let indent = indent_width(line);
            if pending_blank > 0 && !(is_list_item(line) || indent >= 2) {
                break;
            }
            if opens_fence(line) && (!list || indent == 0) {
                break;
            }

            // Inside a list only unindented lines can start a block extension.
            let may_interrupt = !list || indent == 0;
            if may_interrupt && hint.is_some_and(|h| h < offset + line.len()) {
                if let Some(token) = try_extensions(&self.block, &src[offset..], self)? {
                    return Ok((offset, Some(token)));
                }
                let next = offset + line.len();
                hint = self.block_hint(&src[next..]).map(|h| h + next);
            }

            len = offset + line.len();
            pending_blank = 0;
        }

        Ok((len, None))
    }

    fn block_hint(&self, src: &str) -> Option<usize> {
        self.block.iter().filter_map(|d| d.start(src)).min()
    }

    /// Bytes of plain text to skip before the next position worth offering
    /// to extensions. Always at least one character.
    fn next_candidate(&self, src: &str) -> usize {
        let skip = src.chars().next().map_or(1, char::len_utf8);
        let tail = &src[skip..];
        let special = tail.find(['`', '\\', '<', ']']);
        self.inline
            .iter()
            .filter_map(|d| d.start(tail))
            .chain(special)
            .min()
            .map_or(src.len(), |i| skip + i)
    }
}

/// First extension in `candidates` that tokenizes `src`.
fn try_extensions(
    candidates: &[&ExtensionDescriptor],
    src: &str,
    lexer: &Lexer<'_>,
) -> Result<Option<Token>> {
    for descriptor in candidates {
        if let Some(token) = descriptor.tokenize(src, lexer)? {
            if token.raw.is_empty() || !src.starts_with(&token.raw) {
                return Err(Error::InvalidRaw {
                    extension: descriptor.name().to_owned(),
                    raw: excerpt(&token.raw),
                });
            }
            return Ok(Some(token));
        }
    }
    Ok(None)
}

/// Length of the run of blank lines at the start of `src`.
fn blank_lines_len(src: &str) -> Option<usize> {
    let len: usize = src
        .split_inclusive('\n')
        .take_while(|line| line.trim().is_empty())
        .map(str::len)
        .sum();
    (len > 0).then_some(len)
}

fn is_list_item(line: &str) -> bool {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix(['-', '*', '+']) {
        return rest.starts_with([' ', '\t']);
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    (1..=9).contains(&digits)
        && trimmed[digits..]
            .strip_prefix(['.', ')'])
            .is_some_and(|rest| rest.starts_with([' ', '\t']))
}

/// Baseline inline constructs extensions must not look inside: code spans,
/// backslash escapes, tags and autolinks, and link destinations.
fn opaque_len(src: &str) -> Option<usize> {
    let first = src.chars().next()?;
    match first {
        '`' => {
            let run = src.chars().take_while(|&c| c == '`').count();
            let mut offset = run;
            while let Some(found) = src[offset..].find('`') {
                let start = offset + found;
                let closing = src[start..].chars().take_while(|&c| c == '`').count();
                if closing == run {
                    return Some(start + closing);
                }
                offset = start + closing;
            }
            Some(run)
        }
        '\\' => Some(1 + src[1..].chars().next().map_or(0, char::len_utf8)),
        '<' => {
            let next = src[1..].chars().next()?;
            if !(next.is_ascii_alphabetic() || matches!(next, '/' | '!' | '?')) {
                return None;
            }
            let line_end = src.find('\n').unwrap_or(src.len());
            src[..line_end].find('>').map(|end| end + 1)
        }
        ']' => {
            let destination = src.strip_prefix("](")?;
            let mut depth = 0usize;
            for (i, c) in destination.char_indices() {
                match c {
                    '(' => depth += 1,
                    ')' if depth == 0 => return Some(2 + i + 1),
                    ')' => depth -= 1,
                    '\n' => return None,
                    _ => {}
                }
            }
            None
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Rendered;
    use crate::token::{Level, MARKDOWN, SPACE, TEXT, concat_raw};
    use pretty_assertions::assert_eq;

    /// Inline `@word` mentions.
    fn mention() -> ExtensionDescriptor {
        ExtensionDescriptor::new(
            "mention",
            Level::Inline,
            |src| src.find('@'),
            |src, _| {
                let Some(rest) = src.strip_prefix('@') else {
                    return Ok(None);
                };
                let len = rest
                    .find(|c: char| !c.is_alphanumeric())
                    .unwrap_or(rest.len());
                Ok((len > 0).then(|| Token::new("mention", Level::Inline, &src[..=len])))
            },
            |_, _| Ok(Rendered::Skip),
        )
    }

    /// Block `!!` rule lines.
    fn rule() -> ExtensionDescriptor {
        ExtensionDescriptor::new(
            "rule",
            Level::Block,
            |src| src.find("!!"),
            |src, _| {
                Ok(src.starts_with("!!").then(|| {
                    let len = src.find('\n').map_or(src.len(), |i| i + 1);
                    Token::new("rule", Level::Block, &src[..len])
                }))
            },
            |_, _| Ok(Rendered::Skip),
        )
    }

    fn registry() -> ExtensionRegistry {
        let mut registry = ExtensionRegistry::new();
        registry.register(mention()).register(rule());
        registry
    }

    fn kinds(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.kind.as_str()).collect()
    }

    #[test]
    fn test_inline_tokens_split_text() {
        let registry = registry();
        let lexer = Lexer::new(&registry);
        let tokens = lexer.inline_tokens("hi @bob and @al!").unwrap();
        assert_eq!(kinds(&tokens), vec![TEXT, "mention", TEXT, "mention", TEXT]);
        assert_eq!(tokens[1].raw, "@bob");
        assert_eq!(concat_raw(&tokens), "hi @bob and @al!");
    }

    #[test]
    fn test_inline_code_span_is_opaque() {
        let registry = registry();
        let lexer = Lexer::new(&registry);
        let tokens = lexer.inline_tokens("see `@bob` and \\@al").unwrap();
        assert_eq!(kinds(&tokens), vec![TEXT]);
    }

    #[test]
    fn test_link_destination_is_opaque() {
        let registry = registry();
        let lexer = Lexer::new(&registry);
        let tokens = lexer.inline_tokens("[@bob](mailto:x@y.z)").unwrap();
        assert_eq!(kinds(&tokens), vec![TEXT, "mention", TEXT]);
        assert_eq!(tokens[2].raw, "](mailto:x@y.z)");
    }

    #[test]
    fn test_block_tokens_round_trip() {
        let registry = registry();
        let lexer = Lexer::new(&registry);
        let src = "Para one\nstill para\n\n!! rule\n```\n!! not a rule\n```\nTail @x\n";
        let tokens = lexer.block_tokens(src).unwrap();
        assert_eq!(kinds(&tokens), vec![MARKDOWN, SPACE, "rule", "code", MARKDOWN]);
        assert_eq!(concat_raw(&tokens), src);
    }

    #[test]
    fn test_block_extension_interrupts_paragraph() {
        let registry = registry();
        let lexer = Lexer::new(&registry);
        let tokens = lexer.block_tokens("text\n!! rule\nmore\n").unwrap();
        assert_eq!(kinds(&tokens), vec![MARKDOWN, "rule", MARKDOWN]);
        assert_eq!(tokens[0].raw, "text\n");
    }

    #[test]
    fn test_list_continues_across_blank_lines() {
        let registry = ExtensionRegistry::new();
        let lexer = Lexer::new(&registry);
        let tokens = lexer.block_tokens("- a\n\n- b\n\nPara\n").unwrap();
        assert_eq!(kinds(&tokens), vec![MARKDOWN, SPACE, MARKDOWN]);
        assert_eq!(tokens[0].raw, "- a\n\n- b\n");
    }

    #[test]
    fn test_invalid_raw_is_fatal() {
        let mut registry = ExtensionRegistry::new();
        registry.register(ExtensionDescriptor::new(
            "broken",
            Level::Inline,
            |_| Some(0),
            |_, _| Ok(Some(Token::new("broken", Level::Inline, ""))),
            |_, _| Ok(Rendered::Skip),
        ));
        let lexer = Lexer::new(&registry);
        let err = lexer.inline_tokens("x").unwrap_err();
        assert!(matches!(err, Error::InvalidRaw { .. }));
    }

    #[test]
    fn test_is_list_item() {
        assert!(is_list_item("- a"));
        assert!(is_list_item("12. a"));
        assert!(is_list_item("  * a"));
        assert!(!is_list_item("-a"));
        assert!(!is_list_item("2024.01 x"));
    }
}
