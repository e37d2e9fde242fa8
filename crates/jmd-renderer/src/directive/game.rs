//! Strategic-form games as payoff tables.
//!
//! ```text
//! :::game{row="Player 1" column="Player 2"}
//! L & R
//! U & 3,3 & 0,5
//! D & 5,0 & 1,1
//! :::
//! ```
//!
//! The first line names the column strategies; every further line is a row
//! strategy followed by its payoff cells, separated by `&`. An optional
//! section after a blank line sets `Row:`, `Column:` and `Caption:` labels,
//! overriding the attributes of the same name. Labels and strategy names
//! are inline Markdown unless `math=all` typesets strategies as math.

use std::fmt::Write;
use std::sync::LazyLock;

use regex::Regex;

use super::factory::DirectiveSpec;
use crate::error::Result;
use crate::extension::Rendered;
use crate::lexer::Lexer;
use crate::render::Renderer;
use crate::token::{Level, Token};

static LABEL_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(row|column|caption):\s*(.*)").unwrap());

const LABELS: [&str; 3] = ["row", "column", "caption"];

/// The `:::game` container.
#[must_use]
pub fn game_spec() -> DirectiveSpec {
    DirectiveSpec::new(Level::Container, ":::")
        .with_label("game")
        .with_tokenizer(tokenize_game)
        .with_renderer(render_game)
}

fn tokenize_game(text: &str, token: &mut Token, lexer: &Lexer<'_>) -> Result<()> {
    // The body starts with the newline ending the opening line.
    let lines: Vec<&str> = text.split('\n').skip(1).collect();
    let (matrix, labels) = match lines.iter().position(|line| line.trim().is_empty()) {
        Some(blank) => (&lines[..blank], section_labels(&lines[blank + 1..])),
        None => {
            let attrs = token.attrs.as_ref();
            let labels: Vec<(String, String)> = LABELS
                .iter()
                .filter_map(|key| {
                    let value = attrs.and_then(|a| a.get(key))?;
                    Some(((*key).to_owned(), value.to_owned()))
                })
                .collect();
            (&lines[..], labels)
        }
    };

    for (key, value) in labels {
        token.sections.insert(key, lexer.inline_tokens(&value)?);
    }
    token.text = matrix.join("\n");

    if !strategies_as_math(token) {
        for (i, label) in column_strategies(&token.text).iter().enumerate() {
            token
                .sections
                .insert(format!("column-{i}"), lexer.inline_tokens(label)?);
        }
        for (i, label) in row_strategies(&token.text).iter().enumerate() {
            token
                .sections
                .insert(format!("row-{i}"), lexer.inline_tokens(label)?);
        }
    }
    Ok(())
}

fn render_game(token: &Token, renderer: &Renderer<'_>) -> Result<Rendered> {
    let label = |key: &str| -> Result<Option<String>> {
        match token.sections.get(key) {
            Some(tokens) => renderer.render_inline(tokens).map(Some),
            None => Ok(None),
        }
    };
    let row_label = label("row")?;
    let column_label = label("column")?;
    let caption = label("caption")?;
    let math = strategies_as_math(token);

    let columns = column_strategies(&token.text);
    let rows: Vec<&str> = token.text.split('\n').skip(1).map(str::trim).collect();
    // A row label takes a column of its own.
    let spacer = if row_label.is_some() { "<td></td>" } else { "" };

    let mut lines = Vec::new();
    if let Some(column_label) = &column_label {
        lines.push(format!(
            "<tr class='no-border'>{spacer}<td></td><td class='columnLabel' colspan='{}'>{column_label}</td></tr>",
            columns.len()
        ));
    }

    let mut header = format!("<tr class='no-border'>{spacer}<td></td>");
    for (i, strategy) in columns.iter().enumerate() {
        let strategy = if math {
            format!(r"\({strategy}\)")
        } else {
            renderer.render_inline(token.section(&format!("column-{i}")))?
        };
        let _ = write!(
            header,
            "<td class='columnStrategies columnLabel strategyLabels'>{strategy}</td>"
        );
    }
    header.push_str("</tr>");
    lines.push(header);

    for (i, row) in rows.iter().enumerate() {
        let mut cells = row.split('&').map(str::trim);
        let strategy = cells.next().unwrap_or_default();
        let strategy = if math {
            format!(r"\({strategy}\)")
        } else {
            renderer.render_inline(token.section(&format!("row-{i}")))?
        };

        let mut line = String::from("<tr>");
        if i == 0
            && let Some(row_label) = &row_label
        {
            let _ = write!(
                line,
                "<td class='rowLabel' rowspan={}>{row_label}</td>",
                rows.len()
            );
        }
        let _ = write!(line, "<td class='rowLabel rowStrategies strategyLabels'>{strategy}</td>");
        for cell in cells {
            let _ = write!(line, r"<td class='payoffs'>\({cell}\)</td>");
        }
        line.push_str("</tr>");
        lines.push(line);
    }

    if let Some(caption) = &caption {
        lines.push(format!(
            "<tr class='no-border'>{spacer}<td></td><td class='caption' colspan={}>{caption}</td></tr>",
            columns.len()
        ));
    }

    Ok(Rendered::Html(format!(
        "<table class='game'>{}</table>",
        lines.join("\n")
    )))
}

/// `Row:`, `Column:` and `Caption:` entries; an entry runs until the next
/// one starts.
fn section_labels(lines: &[&str]) -> Vec<(String, String)> {
    let mut labels: Vec<(String, String)> = Vec::new();
    for line in lines {
        if let Some(caps) = LABEL_LINE.captures(line) {
            labels.push((caps[1].to_ascii_lowercase(), caps[2].to_owned()));
        } else if let Some((_, value)) = labels.last_mut() {
            value.push('\n');
            value.push_str(line);
        }
    }
    for (_, value) in &mut labels {
        *value = value.trim().to_owned();
    }
    labels
}

/// Whether `math` asks for strategy names typeset as math rather than
/// Markdown.
fn strategies_as_math(token: &Token) -> bool {
    token
        .attrs
        .as_ref()
        .and_then(|attrs| attrs.get("math"))
        .is_some_and(|math| !math.eq_ignore_ascii_case("default"))
}

fn column_strategies(matrix: &str) -> Vec<&str> {
    matrix
        .lines()
        .next()
        .unwrap_or_default()
        .split('&')
        .map(str::trim)
        .collect()
}

fn row_strategies(matrix: &str) -> Vec<&str> {
    matrix
        .split('\n')
        .skip(1)
        .map(|row| row.split('&').next().unwrap_or_default().trim())
        .collect()
}
