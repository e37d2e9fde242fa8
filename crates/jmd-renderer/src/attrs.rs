//! Directive attribute parsing.
//!
//! Parses the body of a `{#id .class key="value" flag}` blob. Entries are
//! separated by whitespace or `;`.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::util::escape_html;

/// Malformed attribute blob.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttributeError {
    /// A quoted value never closes.
    #[error("unterminated quoted value for `{key}`")]
    UnterminatedQuote {
        /// Attribute whose value is unterminated.
        key: String,
    },
    /// A character that cannot start an entry.
    #[error("unexpected `{found}` at offset {offset}")]
    Unexpected {
        /// Offending character.
        found: char,
        /// Byte offset inside the blob.
        offset: usize,
    },
    /// `#` or `.` shorthand with nothing after it.
    #[error("empty `{0}` shorthand")]
    EmptyShorthand(char),
}

/// Parsed attributes of a directive.
///
/// # Example
///
/// ```
/// use jmd_renderer::Attributes;
///
/// let attrs = Attributes::parse(r#"#intro .note .wide lang="en" open"#).unwrap();
/// assert_eq!(attrs.id.as_deref(), Some("intro"));
/// assert_eq!(attrs.classes, vec!["note", "wide"]);
/// assert_eq!(attrs.get("lang"), Some("en"));
/// assert_eq!(attrs.flag("open"), Some(true));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Attributes {
    /// ID from `#id`.
    pub id: Option<String>,
    /// Classes from `.class`, in order.
    pub classes: Vec<String>,
    /// Key-value pairs in order; `None` for a bare key.
    pub pairs: Vec<(String, Option<String>)>,
}

impl Attributes {
    /// Parse an attribute blob (without the surrounding braces).
    pub fn parse(input: &str) -> Result<Self, AttributeError> {
        let mut attrs = Self::default();
        let mut rest = input;

        loop {
            rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ';');
            let Some(first) = rest.chars().next() else {
                break;
            };
            let offset = input.len() - rest.len();

            match first {
                '#' | '.' => {
                    let end = rest[1..]
                        .find(|c: char| is_separator(c) || c == '.' || c == '#')
                        .map_or(rest.len(), |i| i + 1);
                    let value = &rest[1..end];
                    if value.is_empty() {
                        return Err(AttributeError::EmptyShorthand(first));
                    }
                    if first == '#' {
                        attrs.id = Some(value.to_owned());
                    } else {
                        attrs.classes.push(value.to_owned());
                    }
                    rest = &rest[end..];
                }
                '=' | '"' | '\'' => {
                    return Err(AttributeError::Unexpected {
                        found: first,
                        offset,
                    });
                }
                _ => {
                    let (key, value, remaining) = parse_entry(rest)?;
                    attrs.pairs.push((key.to_owned(), value.map(str::to_owned)));
                    rest = remaining;
                }
            }
        }

        Ok(attrs)
    }

    /// Value of the last entry named `key`. Bare keys yield `""`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_deref().unwrap_or(""))
    }

    /// Interpret `key` as a boolean switch.
    ///
    /// A bare key or `key=true` is on, `key=false` is off, any other
    /// non-empty value is on.
    #[must_use]
    pub fn flag(&self, key: &str) -> Option<bool> {
        let (_, value) = self.pairs.iter().rev().find(|(k, _)| k == key)?;
        Some(match value.as_deref() {
            None | Some("true") => true,
            Some("false") => false,
            Some(other) => !other.is_empty(),
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.classes.is_empty() && self.pairs.is_empty()
    }

    /// Render as HTML attributes, each preceded by a space.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        if let Some(id) = &self.id {
            html.push_str(&format!(r#" id="{}""#, escape_html(id)));
        }
        if !self.classes.is_empty() {
            html.push_str(&format!(r#" class="{}""#, escape_html(&self.classes.join(" "))));
        }
        for (key, value) in &self.pairs {
            match value {
                Some(value) => html.push_str(&format!(r#" {key}="{}""#, escape_html(value))),
                None => {
                    html.push(' ');
                    html.push_str(key);
                }
            }
        }
        html
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ';'
}

/// Parse `key`, `key=value`, `key="value"` or `key='value'`.
fn parse_entry(s: &str) -> Result<(&str, Option<&str>, &str), AttributeError> {
    let key_end = s
        .find(|c: char| is_separator(c) || c == '=')
        .unwrap_or(s.len());
    let key = &s[..key_end];
    let Some(after_eq) = s[key_end..].strip_prefix('=') else {
        return Ok((key, None, &s[key_end..]));
    };

    for quote in ['"', '\''] {
        if let Some(quoted) = after_eq.strip_prefix(quote) {
            let end = quoted
                .find(quote)
                .ok_or_else(|| AttributeError::UnterminatedQuote {
                    key: key.to_owned(),
                })?;
            return Ok((key, Some(&quoted[..end]), &quoted[end + 1..]));
        }
    }

    let end = after_eq.find(is_separator).unwrap_or(after_eq.len());
    Ok((key, Some(&after_eq[..end]), &after_eq[end..]))
}
