//! HTML table → table block
//!
//! Rows are read as two ordered groups, header rows (`thead`) first, then
//! body rows (`tbody`, `tfoot`, bare `tr`). Each cell's content goes through
//! the rich-text converter. Cells cannot hold blocks in the target format, so
//! images become a bullet glyph and lists become bullet-prefixed lines.
//!
//! The grid is always rectangular: `table_width` is the widest row and
//! shorter rows are padded with empty cells.

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::block_converter::html_preprocessing::{
    MAX_DOM_DEPTH, is_skipped, is_void_element, serialize_children_excluding,
    write_escaped_text, write_start_tag,
};
use crate::block_converter::rich_text::{RichTextOptions, to_rich_text_with};
use crate::blocks::{Block, BlockKind, RichTextRun};
use crate::config::ConversionConfig;

static TABLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("table").expect("BUG: hardcoded CSS selector 'table' is invalid")
});

static ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("tr").expect("BUG: hardcoded CSS selector 'tr' is invalid")
});

/// Glyph standing in for an image inside a cell.
pub const CELL_IMAGE_GLYPH: &str = "•";

/// Upper bound on honoured `colspan` values.
const MAX_COLSPAN: usize = 20;

/// Elements that end a line inside a flattened cell.
const CELL_LINE_ELEMENTS: &[&str] = &[
    "p", "div", "pre", "table", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "dl", "dt", "dd",
    "figure", "figcaption", "blockquote", "section",
];

/// A converted table and its optional caption heading.
#[derive(Debug, Clone, PartialEq)]
pub struct TableConversion {
    /// Heading emitted immediately before the table
    pub caption: Option<Block>,
    pub table: Block,
}

impl TableConversion {
    pub fn into_blocks(self) -> Vec<Block> {
        self.caption.into_iter().chain(std::iter::once(self.table)).collect()
    }
}

/// Convert a table fragment with default settings. `None` when the table has
/// no rows.
pub fn to_table_block(table_html: &str) -> Option<TableConversion> {
    to_table_block_with(table_html, &ConversionConfig::default())
}

/// Convert the first non-chrome `<table>` in `table_html`.
pub fn to_table_block_with(table_html: &str, config: &ConversionConfig) -> Option<TableConversion> {
    let fragment = Html::parse_fragment(table_html);
    let options = RichTextOptions::from_config(config);
    let table = fragment
        .select(&TABLE_SELECTOR)
        .find(|table| !is_skipped(table, &config.chrome_classes))?;
    table_from_element(table, &options, &config.chrome_classes)
}

pub(crate) fn table_from_element(
    table: ElementRef<'_>,
    options: &RichTextOptions,
    chrome: &[String],
) -> Option<TableConversion> {
    let (header_rows, body_rows) = collect_rows(table, chrome);
    let has_thead = !header_rows.is_empty();

    let mut rows: Vec<(Vec<Vec<RichTextRun>>, bool)> = header_rows
        .into_iter()
        .chain(body_rows)
        .map(|tr| row_cells(tr, options, chrome))
        .filter(|(cells, _)| !cells.is_empty())
        .collect();

    if rows.is_empty() {
        tracing::debug!("Table produced no rows");
        return None;
    }

    let width = rows.iter().map(|(cells, _)| cells.len()).max().unwrap_or(0);
    let has_header = has_thead || rows[0].1;

    for (cells, _) in &mut rows {
        cells.resize_with(width, Vec::new);
    }

    let row_blocks = rows
        .into_iter()
        .map(|(cells, _)| Block::new(BlockKind::TableRow { cells }))
        .collect();

    let table_block = Block::new(BlockKind::Table { width, has_header })
        .with_children(row_blocks)
        .with_source_id(table.value().attr("id").map(str::to_string));

    Some(TableConversion {
        caption: caption_block(table, options, chrome),
        table: table_block,
    })
}

type RowRefs<'a> = Vec<ElementRef<'a>>;

/// Header rows and body rows of `table`, each in document order.
fn collect_rows<'a>(table: ElementRef<'a>, chrome: &[String]) -> (RowRefs<'a>, RowRefs<'a>) {
    let mut header = Vec::new();
    let mut body = Vec::new();

    for child in table.children().filter_map(ElementRef::wrap) {
        if is_skipped(&child, chrome) {
            continue;
        }
        match child.value().name() {
            "thead" => header.extend(own_rows(child, chrome)),
            "tbody" | "tfoot" => body.extend(own_rows(child, chrome)),
            "tr" => body.push(child),
            _ => {}
        }
    }

    if header.is_empty() && body.is_empty() {
        // No recognizable row groups: take every row that belongs to this
        // table rather than a nested one.
        body = table
            .select(&ROW_SELECTOR)
            .filter(|tr| nearest_table(tr).is_some_and(|t| t.id() == table.id()))
            .filter(|tr| !is_skipped(tr, chrome))
            .collect();
    }
    (header, body)
}

fn own_rows<'a>(group: ElementRef<'a>, chrome: &[String]) -> impl Iterator<Item = ElementRef<'a>> {
    group
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr" && !is_skipped(el, chrome))
        .collect::<Vec<_>>()
        .into_iter()
}

fn nearest_table<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "table")
}

/// Cells of a row (colspan expanded) and whether every cell is a `th`.
fn row_cells(
    tr: ElementRef<'_>,
    options: &RichTextOptions,
    chrome: &[String],
) -> (Vec<Vec<RichTextRun>>, bool) {
    let mut cells = Vec::new();
    let mut all_th = true;
    let mut any = false;

    for cell in tr.children().filter_map(ElementRef::wrap) {
        let name = cell.value().name();
        if name != "td" && name != "th" {
            continue;
        }
        any = true;
        all_th &= name == "th";

        let mut html = String::new();
        flatten_cell(*cell, chrome, &mut html, 0);
        cells.push(to_rich_text_with(&html, options));

        let colspan = cell
            .value()
            .attr("colspan")
            .and_then(|span| span.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        cells.extend(std::iter::repeat_with(Vec::new).take(colspan - 1));
    }
    (cells, any && all_th)
}

/// Serialize a cell's content as inline HTML. Block structure collapses to
/// line breaks; images become [`CELL_IMAGE_GLYPH`].
fn flatten_cell(node: NodeRef<'_, Node>, chrome: &[String], out: &mut String, depth: usize) {
    if depth > MAX_DOM_DEPTH {
        return;
    }
    for child in node.children() {
        match child.value() {
            Node::Text(text) => write_escaped_text(text, out),
            Node::Element(_) => {
                let Some(el) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_skipped(&el, chrome) {
                    continue;
                }
                let name = el.value().name();
                match name {
                    "img" => out.push_str(CELL_IMAGE_GLYPH),
                    "br" => out.push_str("<br>"),
                    "ul" | "ol" => flatten_cell(child, chrome, out, depth + 1),
                    "li" => {
                        push_line_break(out);
                        out.push_str(CELL_IMAGE_GLYPH);
                        out.push(' ');
                        flatten_cell(child, chrome, out, depth + 1);
                        push_line_break(out);
                    }
                    "td" | "th" => {
                        flatten_cell(child, chrome, out, depth + 1);
                        out.push(' ');
                    }
                    _ if CELL_LINE_ELEMENTS.contains(&name) => {
                        push_line_break(out);
                        flatten_cell(child, chrome, out, depth + 1);
                        push_line_break(out);
                    }
                    _ => {
                        write_start_tag(&el, out);
                        if is_void_element(name) {
                            continue;
                        }
                        flatten_cell(child, chrome, out, depth + 1);
                        out.push_str("</");
                        out.push_str(name);
                        out.push('>');
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_line_break(out: &mut String) {
    if !out.trim_end().is_empty() && !out.trim_end().ends_with("<br>") {
        out.push_str("<br>");
    }
}

fn caption_block(
    table: ElementRef<'_>,
    options: &RichTextOptions,
    chrome: &[String],
) -> Option<Block> {
    let caption = table
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "caption")?;
    let mut html = String::new();
    serialize_children_excluding(
        &caption,
        &|el: &ElementRef<'_>| is_skipped(el, chrome),
        &mut html,
    );
    let runs = to_rich_text_with(&html, options);
    (!runs.is_empty()).then(|| Block::heading(3, runs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::plain_text;

    fn rows(conversion: &TableConversion) -> Vec<Vec<String>> {
        conversion
            .table
            .children
            .iter()
            .map(|row| match &row.kind {
                BlockKind::TableRow { cells } => cells.iter().map(|c| plain_text(c)).collect(),
                other => panic!("unexpected child {other:?}"),
            })
            .collect()
    }

    #[test]
    fn thead_and_tbody() {
        let conversion = to_table_block(
            "<table><thead><tr><th>H</th></tr></thead><tbody><tr><td>v</td></tr></tbody></table>",
        )
        .expect("table");
        assert_eq!(
            conversion.table.kind,
            BlockKind::Table {
                width: 1,
                has_header: true
            }
        );
        assert_eq!(rows(&conversion), vec![vec!["H"], vec!["v"]]);
        assert!(conversion.caption.is_none());
    }

    #[test]
    fn ragged_rows_are_padded() {
        let conversion = to_table_block(
            "<table><tr><td>a</td><td>b</td><td>c</td></tr><tr><td>d</td></tr></table>",
        )
        .expect("table");
        assert_eq!(
            conversion.table.kind,
            BlockKind::Table {
                width: 3,
                has_header: false
            }
        );
        assert_eq!(rows(&conversion)[1], vec!["d", "", ""]);
    }

    #[test]
    fn first_row_of_th_is_header_without_thead() {
        let conversion =
            to_table_block("<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></table>")
                .expect("table");
        assert!(matches!(
            conversion.table.kind,
            BlockKind::Table {
                has_header: true,
                ..
            }
        ));
    }

    #[test]
    fn images_and_lists_are_flattened() {
        let conversion = to_table_block(
            r#"<table><tr><td><img src="x.png"> icon</td><td><ul><li>one</li><li>two</li></ul></td></tr></table>"#,
        )
        .expect("table");
        let rows = rows(&conversion);
        assert_eq!(rows[0][0], "• icon");
        assert_eq!(rows[0][1], "• one\n• two");
    }

    #[test]
    fn caption_becomes_heading() {
        let conversion = to_table_block(
            "<table><caption>Table 1. Fields</caption><tr><td>x</td></tr></table>",
        )
        .expect("table");
        let caption = conversion.caption.expect("caption");
        assert_eq!(caption.type_name(), "heading_3");
        assert_eq!(caption.plain_text(), "Table 1. Fields");
    }

    #[test]
    fn empty_table_is_none() {
        assert!(to_table_block("<table></table>").is_none());
        assert!(to_table_block("<p>no table</p>").is_none());
    }

    #[test]
    fn chrome_inside_cells_is_dropped() {
        let conversion = to_table_block(
            r#"<table><tr><td>keep<div class="zDocsFilterTableDiv">filter ui</div></td></tr></table>"#,
        )
        .expect("table");
        assert_eq!(rows(&conversion)[0][0], "keep");
    }

    #[test]
    fn colspan_keeps_columns_aligned() {
        let conversion = to_table_block(
            r#"<table><tr><td colspan="2">wide</td></tr><tr><td>a</td><td>b</td></tr></table>"#,
        )
        .expect("table");
        assert_eq!(rows(&conversion)[0], vec!["wide", ""]);
    }
}
