//! Placeholders for extension output inside baseline Markdown.
//!
//! Extension tokens inside a run of baseline text are swapped for opaque
//! keys, the run goes through `pulldown-cmark`, then every key is replaced
//! by the extension's HTML in a single pass.

/// Opens a placeholder key. Private-use characters survive Markdown
/// rendering untouched.
const OPEN: char = '\u{E000}';
/// Closes a placeholder key.
const CLOSE: char = '\u{E001}';

/// Collects rendered extension HTML keyed by placeholder.
///
/// # Example
///
/// ```ignore
/// let mut placeholders = Placeholders::new();
/// let key = placeholders.insert("<b>x</b>".to_owned());
/// let html = format!("<p>{key}</p>");
/// assert_eq!(placeholders.apply(&html), "<p><b>x</b></p>");
/// ```
#[derive(Debug, Default)]
pub(crate) struct Placeholders {
    items: Vec<String>,
}

impl Placeholders {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store `html` and return the key to embed in its place.
    pub(crate) fn insert(&mut self, html: String) -> String {
        let key = format!("{OPEN}{}{CLOSE}", self.items.len());
        self.items.push(html);
        key
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace every key in `html`. Unknown keys are kept verbatim.
    ///
    /// Substituted HTML is never rescanned, so extension output containing
    /// key-like text cannot trigger a second substitution.
    pub(crate) fn apply(&self, html: &str) -> String {
        if self.is_empty() {
            return html.to_owned();
        }

        let mut result = String::with_capacity(html.len());
        let mut rest = html;
        while let Some(start) = rest.find(OPEN) {
            result.push_str(&rest[..start]);
            let after = &rest[start + OPEN.len_utf8()..];
            let resolved = after.find(CLOSE).and_then(|end| {
                let index: usize = after[..end].parse().ok()?;
                Some((self.items.get(index)?, end))
            });
            match resolved {
                Some((item, end)) => {
                    result.push_str(item);
                    rest = &after[end + CLOSE.len_utf8()..];
                }
                None => {
                    result.push(OPEN);
                    rest = after;
                }
            }
        }
        result.push_str(rest);
        result
    }
}
