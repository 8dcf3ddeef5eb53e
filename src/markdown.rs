//! Lightweight markup rendering for the terminal.
//!
//! Assistant replies come back as Markdown. This walks the comrak AST and
//! emits styled plain text: headings, paragraphs, bullet and ordered lists,
//! task items, tables, bold and italic runs, inline code and fenced blocks.
//! Anything more exotic degrades to its text content.

use colored::Colorize;
use comrak::nodes::{AstNode, ListType, NodeValue};
use comrak::{Arena, ComrakOptions, parse_document};
use once_cell::sync::Lazy;

static MARKDOWN_OPTIONS: Lazy<ComrakOptions> = Lazy::new(|| {
    let mut options = ComrakOptions::default();
    options.extension.strikethrough = true;
    options.extension.table = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options
});

const CODE_INDENT: &str = "    ";
const QUOTE_PREFIX: &str = "│ ";
const COLUMN_GAP: &str = "  ";

pub fn render_terminal(md: &str) -> String {
    let arena = Arena::new();
    let root = parse_document(&arena, md, &MARKDOWN_OPTIONS);
    render_blocks(root, "\n\n")
}

fn render_blocks<'a>(parent: &'a AstNode<'a>, separator: &str) -> String {
    parent
        .children()
        .map(render_block)
        .filter(|block| !block.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn render_block<'a>(node: &'a AstNode<'a>) -> String {
    let value = node.data.borrow().value.clone();
    match value {
        NodeValue::Paragraph => render_inlines(node),
        NodeValue::Heading(_) => render_inlines(node).bold().underline().to_string(),
        NodeValue::List(list) => {
            let mut number = list.start;
            node.children()
                .map(|item| {
                    let marker = match list.list_type {
                        ListType::Bullet => "•".to_string(),
                        ListType::Ordered => {
                            let marker = format!("{number}.");
                            number += 1;
                            marker
                        }
                    };
                    let marker = match &item.data.borrow().value {
                        NodeValue::TaskItem(symbol) => {
                            format!("{marker} [{}]", if symbol.is_some() { 'x' } else { ' ' })
                        }
                        _ => marker,
                    };
                    render_item(item, &marker)
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        NodeValue::Item(_) => render_item(node, "•"),
        NodeValue::CodeBlock(block) => block
            .literal
            .trim_end_matches('\n')
            .lines()
            .map(|line| format!("{CODE_INDENT}{}", line.dimmed()))
            .collect::<Vec<_>>()
            .join("\n"),
        NodeValue::BlockQuote => prefix_lines(&render_blocks(node, "\n\n"), QUOTE_PREFIX),
        NodeValue::ThematicBreak => "─".repeat(40),
        NodeValue::HtmlBlock(html) => html.literal.trim_end().to_string(),
        NodeValue::Table(_) => render_table(node),
        _ => render_inlines(node),
    }
}

/// One line per row, cells left-aligned into columns, a rule under the header.
fn render_table<'a>(table: &'a AstNode<'a>) -> String {
    let rows: Vec<(bool, Vec<String>)> = table
        .children()
        .map(|row| {
            let header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
            (header, row.children().map(render_inlines).collect())
        })
        .collect();

    let columns = rows.iter().map(|(_, cells)| cells.len()).max().unwrap_or(0);
    let mut widths = vec![0; columns];
    for (_, cells) in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (header, cells) in &rows {
        let line = cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                // The last column is left ragged so lines carry no trailing spaces.
                let padded = if i + 1 == cells.len() {
                    cell.clone()
                } else {
                    format!("{cell:<width$}", width = widths[i])
                };
                if *header {
                    padded.bold().to_string()
                } else {
                    padded
                }
            })
            .collect::<Vec<_>>()
            .join(COLUMN_GAP);
        lines.push(line);
        if *header {
            lines.push(
                widths
                    .iter()
                    .map(|width| "─".repeat(*width))
                    .collect::<Vec<_>>()
                    .join(COLUMN_GAP),
            );
        }
    }
    lines.join("\n")
}

fn render_item<'a>(item: &'a AstNode<'a>, marker: &str) -> String {
    let body = render_blocks(item, "\n");
    let hang = " ".repeat(marker.chars().count() + 1);
    let mut lines = body.lines();
    let mut out = match lines.next() {
        Some(first) => format!("{marker} {first}"),
        None => marker.to_string(),
    };
    for line in lines {
        out.push('\n');
        if !line.is_empty() {
            out.push_str(&hang);
            out.push_str(line);
        }
    }
    out
}

fn render_inlines<'a>(parent: &'a AstNode<'a>) -> String {
    let mut out = String::new();
    for child in parent.children() {
        let value = child.data.borrow().value.clone();
        match value {
            NodeValue::Text(text) => out.push_str(&text),
            NodeValue::SoftBreak => out.push(' '),
            NodeValue::LineBreak => out.push('\n'),
            NodeValue::Code(code) => out.push_str(&code.literal.cyan().to_string()),
            NodeValue::HtmlInline(html) => out.push_str(&html),
            NodeValue::Strong => out.push_str(&render_inlines(child).bold().to_string()),
            NodeValue::Emph => out.push_str(&render_inlines(child).italic().to_string()),
            NodeValue::Strikethrough => {
                out.push_str(&render_inlines(child).strikethrough().to_string())
            }
            NodeValue::Link(link) => {
                let label = render_inlines(child);
                if label.is_empty() || label == link.url {
                    out.push_str(&link.url.underline().to_string());
                } else {
                    out.push_str(&format!("{label} ({})", link.url.underline()));
                }
            }
            NodeValue::Image(link) => out.push_str(&link.url),
            _ => out.push_str(&render_inlines(child)),
        }
    }
    out
}

fn prefix_lines(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
