//! Document front matter.
//!
//! A document may open with `Key: value` lines, terminated by a line
//! starting with `----`:
//!
//! ```text
//! Title: Notes on directives
//! CSS: style.css
//! Extension 1: << >> false
//!     <mark>${content1}</mark>
//! ----
//! ```
//!
//! Lines that do not start a key continue the previous value. Keys are
//! matched case-insensitively and repeated keys accumulate values.

use std::sync::LazyLock;

use regex::Regex;

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::function_call::{CallMode, CallTokenize, FunctionOptions};

static KEY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-a-zA-Z0-9 ]+):\s*(.*)$").unwrap());

/// Front matter values in first-seen key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Metadata {
    entries: Vec<(String, Vec<String>)>,
}

/// A function-call extension declared with `Function:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub name: String,
    pub options: FunctionOptions,
}

impl Metadata {
    /// Parse `Key: value` lines.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut metadata = Self::default();
        let mut current: Option<(&str, Vec<&str>)> = None;

        for line in text.lines() {
            if let Some(caps) = KEY_LINE.captures(line) {
                if let Some((key, lines)) = current.take() {
                    metadata.push(key, lines.join("\n"));
                }
                let (Some(key), Some(value)) = (caps.get(1), caps.get(2)) else {
                    continue;
                };
                let value = value.as_str();
                let lines = if value.trim().is_empty() { Vec::new() } else { vec![value] };
                current = Some((key.as_str(), lines));
            } else if let Some((_, lines)) = current.as_mut()
                && !line.trim().is_empty()
            {
                lines.push(line);
            }
        }
        if let Some((key, lines)) = current {
            metadata.push(key, lines.join("\n"));
        }

        metadata
    }

    fn push(&mut self, key: &str, value: String) {
        match self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
        {
            Some((_, values)) => values.push(value),
            None => self.entries.push((key.to_owned(), vec![value])),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in first-seen order, with the key as first written.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// All values of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_slice())
            .unwrap_or_default()
    }

    /// The last value of `key`.
    #[must_use]
    pub fn last(&self, key: &str) -> Option<&str> {
        self.get(key).last().map(String::as_str)
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.last("Title")
    }

    #[must_use]
    pub fn lang(&self) -> Option<&str> {
        self.last("Lang")
    }

    /// Stylesheets, one per value or line.
    #[must_use]
    pub fn css(&self) -> Vec<String> {
        self.list("CSS")
    }

    /// Script URLs, one per value or line.
    #[must_use]
    pub fn scripts(&self) -> Vec<String> {
        self.list("Script")
    }

    #[must_use]
    pub fn body_classes(&self) -> Option<&str> {
        self.last("Body classes")
    }

    /// Lua chunks to run before the body is tokenized.
    #[must_use]
    pub fn lua(&self) -> &[String] {
        self.get("Lua")
    }

    /// `Extension <n>` definitions as (kind name, definition) pairs.
    ///
    /// The kind name is the key without spaces, e.g. `Extension1`.
    pub fn extensions(&self) -> impl Iterator<Item = (String, &str)> {
        self.entries
            .iter()
            .filter(|(k, _)| k.starts_with("Extension"))
            .flat_map(|(k, values)| {
                let name = k.replace(' ', "");
                values.iter().map(move |v| (name.clone(), v.as_str()))
            })
    }

    /// `Optionals: name name[true] ...` as (name, default) pairs.
    #[must_use]
    pub fn optionals(&self) -> Vec<(String, bool)> {
        self.get("Optionals")
            .iter()
            .flat_map(|value| value.split_whitespace())
            .map(|item| {
                match item
                    .strip_suffix(']')
                    .and_then(|rest| rest.split_once('['))
                    .filter(|(name, _)| !name.is_empty())
                {
                    Some((name, default)) => {
                        (name.to_owned(), default.eq_ignore_ascii_case("true"))
                    }
                    None => (item.to_owned(), false),
                }
            })
            .collect()
    }

    /// `Inline comment: <marker> [true|false]`: the marker and whether the
    /// comment text is kept in the output.
    #[must_use]
    pub fn inline_comment(&self) -> Option<(String, bool)> {
        let mut parts = self.last("Inline comment")?.split_whitespace();
        let marker = parts.next()?.to_owned();
        let verbatim = parts
            .next()
            .is_some_and(|flag| flag.eq_ignore_ascii_case("true"));
        Some((marker, verbatim))
    }

    /// `Function: name [simple|complex] [inline|block|none] [object]`
    /// declarations. Unknown words are ignored.
    #[must_use]
    pub fn functions(&self) -> Vec<FunctionDecl> {
        self.get("Function")
            .iter()
            .flat_map(|value| value.lines())
            .filter_map(|line| {
                let mut words = line.split_whitespace();
                let name = words.next()?.to_owned();
                let mut options = FunctionOptions::default();
                for word in words {
                    match word.to_ascii_lowercase().as_str() {
                        "simple" => options.mode = CallMode::Simple,
                        "complex" => options.mode = CallMode::Complex,
                        "inline" => options.tokenize = CallTokenize::Inline,
                        "block" => options.tokenize = CallTokenize::Block,
                        "none" => options.tokenize = CallTokenize::None,
                        "object" => options.object = true,
                        other => tracing::warn!(function = %name, word = other, "Unknown function option"),
                    }
                }
                Some(FunctionDecl { name, options })
            })
            .collect()
    }

    fn list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .iter()
            .flat_map(|value| value.lines())
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

/// Split a document into its front matter and body.
///
/// Front matter is present only when the first line is a `Key:` line and a
/// `----` line follows; otherwise the whole document is body.
#[must_use]
pub fn split_front_matter(markdown: &str) -> (Metadata, &str) {
    let first = markdown.lines().next().unwrap_or_default();
    if !KEY_LINE.is_match(first) {
        return (Metadata::default(), markdown);
    }

    let mut offset = 0;
    for line in markdown.split_inclusive('\n') {
        if line.starts_with("----") {
            let header = &markdown[..offset];
            let body = &markdown[offset + line.len()..];
            return (Metadata::parse(header), body);
        }
        offset += line.len();
    }
    (Metadata::default(), markdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const DOC: &str = "Title: On lists\nCSS: a.css\n  b.css\ncss: c.css\nOptionals: hint solution[true]\n----\n# Body\n";

    #[test]
    fn test_split_front_matter() {
        let (metadata, body) = split_front_matter(DOC);
        assert_eq!(body, "# Body\n");
        assert_eq!(metadata.title(), Some("On lists"));
        assert_eq!(metadata.css(), vec!["a.css", "b.css", "c.css"]);
        assert_eq!(
            metadata.optionals(),
            vec![("hint".to_owned(), false), ("solution".to_owned(), true)]
        );
    }

    #[test]
    fn test_no_separator_means_no_front_matter() {
        let src = "Note: this is prose.\n\nMore prose.\n";
        let (metadata, body) = split_front_matter(src);
        assert!(metadata.is_empty());
        assert_eq!(body, src);
    }

    #[test]
    fn test_not_a_key_line() {
        let src = "# Heading\n----\n";
        let (metadata, body) = split_front_matter(src);
        assert!(metadata.is_empty());
        assert_eq!(body, src);
    }

    #[test]
    fn test_extensions_keep_template_lines() {
        let metadata = Metadata::parse("Extension 1: << >> false\n    <b>${content1}</b>\nExtension 2: [[ ]]\n");
        let extensions: Vec<_> = metadata.extensions().collect();
        assert_eq!(
            extensions,
            vec![
                ("Extension1".to_owned(), "<< >> false\n    <b>${content1}</b>"),
                ("Extension2".to_owned(), "[[ ]]"),
            ]
        );
    }

    #[test]
    fn test_inline_comment_and_functions() {
        let metadata = Metadata::parse(
            "Inline comment: % true\nFunction: double simple inline\n  math complex object\n",
        );
        assert_eq!(metadata.inline_comment(), Some(("%".to_owned(), true)));
        let functions = metadata.functions();
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name, "double");
        assert_eq!(functions[0].options, FunctionOptions::simple(CallTokenize::Inline));
        assert_eq!(functions[1].options, FunctionOptions::complex().with_object(true));
    }

    #[test]
    fn test_empty_value_then_continuation() {
        let metadata = Metadata::parse("Lua:\n  x = 1\n  y = 2\n");
        assert_eq!(metadata.lua(), ["  x = 1\n  y = 2".to_owned()]);
    }
}
