//! Directive content lexer.
//!
//! Splits the text captured after a directive marker into a name, an
//! attribute blob, bracket text and trailing block text.

/// Kind of a content token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    /// Horizontal whitespace between parts.
    Spaces,
    /// Directive name: `[a-zA-Z][\w-]*`.
    Name,
    /// Inside of a `{...}` blob.
    Attrs,
    /// Inside of a `[...]` span.
    Text,
    /// Everything from here to the end.
    BlockText,
}

/// One lexed piece of directive content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentToken<'a> {
    pub kind: ContentKind,
    pub value: &'a str,
}

impl<'a> ContentToken<'a> {
    fn new(kind: ContentKind, value: &'a str) -> Self {
        Self { kind, value }
    }
}

/// Lex directive content in encounter order.
///
/// Only the first identifier run is a name; a later one starts the block
/// text, so `note Some words` yields the name `note` and the block text
/// `Some words`.
#[must_use]
pub fn lex_content(content: &str) -> Vec<ContentToken<'_>> {
    let mut tokens = Vec::new();
    let mut seen_name = false;
    let mut rest = content;

    while !rest.is_empty() {
        let spaces = rest.len() - rest.trim_start_matches(is_space).len();
        if spaces > 0 {
            tokens.push(ContentToken::new(ContentKind::Spaces, &rest[..spaces]));
            rest = &rest[spaces..];
            continue;
        }

        let name_len = identifier_len(rest);
        if name_len > 0 && !seen_name {
            seen_name = true;
            tokens.push(ContentToken::new(ContentKind::Name, &rest[..name_len]));
            rest = &rest[name_len..];
            continue;
        }

        if name_len == 0
            && let Some((kind, inner, len)) = delimited(rest)
        {
            tokens.push(ContentToken::new(kind, inner));
            rest = &rest[len..];
            continue;
        }

        tokens.push(ContentToken::new(ContentKind::BlockText, rest));
        break;
    }

    tokens
}

/// Collapse an attribute blob's line breaks (and the whitespace around
/// them) into single spaces.
#[must_use]
pub fn collapse_attrs(blob: &str) -> String {
    blob.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\u{0B}' | '\u{0C}' | '\u{FEFF}')
}

/// Length of an identifier run at the start of `s`, or 0.
pub(crate) fn identifier_len(s: &str) -> usize {
    if !s.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return 0;
    }
    s.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(s.len())
}

/// A minimal `{...}` or `[...]` span at the start of `s`.
fn delimited(s: &str) -> Option<(ContentKind, &str, usize)> {
    let (kind, close) = match s.chars().next()? {
        '{' => (ContentKind::Attrs, '}'),
        '[' => (ContentKind::Text, ']'),
        _ => return None,
    };
    let end = s[1..].find(close)? + 1;
    Some((kind, &s[1..end], end + 1))
}
