//! Structural counts of source HTML and block trees

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};

use super::tolerance::Category;
use crate::block_converter::dispatch::callout_style;
use crate::block_converter::html_preprocessing::{MAX_DOM_DEPTH, is_skipped, select_main_content};
use crate::blocks::{Block, BlockKind};

/// Per-category element counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralCounts {
    pub headings: usize,
    pub lists: usize,
    pub tables: usize,
    pub images: usize,
    pub code_blocks: usize,
    pub callouts: usize,
}

impl StructuralCounts {
    pub fn get(&self, category: Category) -> usize {
        match category {
            Category::Headings => self.headings,
            Category::Lists => self.lists,
            Category::Tables => self.tables,
            Category::Images => self.images,
            Category::CodeBlocks => self.code_blocks,
            Category::Callouts => self.callouts,
        }
    }
}

/// Counts of the main content of a source page. Elements that conversion
/// skips are not counted; neither are images and tables inside table cells,
/// which conversion flattens to text.
pub fn count_html(html: &str, chrome_classes: &[String]) -> StructuralCounts {
    let document = Html::parse_document(html);
    let container = select_main_content(&document);
    let mut counts = StructuralCounts::default();
    for child in container.children() {
        count_node(child, chrome_classes, false, &mut counts, 0);
    }
    counts
}

fn count_node(
    node: NodeRef<'_, Node>,
    chrome: &[String],
    in_table: bool,
    counts: &mut StructuralCounts,
    depth: usize,
) {
    if depth > MAX_DOM_DEPTH {
        return;
    }
    let Some(element) = ElementRef::wrap(node) else {
        return;
    };
    if is_skipped(&element, chrome) {
        return;
    }

    let name = element.value().name();
    let mut inside_table = in_table;
    match name {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" if !in_table => counts.headings += 1,
        "ul" | "ol" if !in_table => counts.lists += 1,
        "pre" if !in_table => counts.code_blocks += 1,
        "img" if !in_table => {
            let src = element
                .value()
                .attr("src")
                .or_else(|| element.value().attr("data-src"))
                .unwrap_or_default()
                .trim();
            if !src.is_empty() && !src.starts_with("data:") {
                counts.images += 1;
            }
        }
        "table" if !in_table => {
            counts.tables += 1;
            let has_caption = element.children().filter_map(ElementRef::wrap).any(|child| {
                child.value().name() == "caption" && !child.text().collect::<String>().trim().is_empty()
            });
            if has_caption {
                counts.headings += 1;
            }
            inside_table = true;
        }
        "div" | "section" | "aside" if !in_table => {
            let class = element.value().attr("class").unwrap_or_default();
            if callout_style(class).is_some() {
                counts.callouts += 1;
            }
        }
        _ => {}
    }

    for child in node.children() {
        count_node(child, chrome, inside_table, counts, depth + 1);
    }
}

/// Counts of a block tree. Consecutive list items of one kind at the same
/// level count as one list.
pub fn count_blocks(blocks: &[Block]) -> StructuralCounts {
    let mut counts = StructuralCounts::default();
    count_level(blocks, &mut counts);
    counts
}

fn count_level(blocks: &[Block], counts: &mut StructuralCounts) {
    let mut previous_list: Option<&'static str> = None;
    for block in blocks {
        let list_kind = block.is_list_item().then(|| block.type_name());
        if list_kind.is_some() && list_kind != previous_list {
            counts.lists += 1;
        }
        previous_list = list_kind;

        match &block.kind {
            BlockKind::Heading { .. } => counts.headings += 1,
            BlockKind::Table { .. } => counts.tables += 1,
            BlockKind::Image { .. } => counts.images += 1,
            BlockKind::Code { .. } => counts.code_blocks += 1,
            BlockKind::Callout { .. } => counts.callouts += 1,
            _ => {}
        }

        if !matches!(block.kind, BlockKind::Table { .. }) {
            count_level(&block.children, counts);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::RichTextRun;

    #[test]
    fn html_counts_skip_chrome_and_cells() {
        let html = r#"<body>
            <nav><ul><li>menu</li></ul></nav>
            <h2>Title</h2>
            <ul><li>a<ol><li>b</li></ol></li></ul>
            <table><caption>Fields</caption><tr><td><img src="x.png"><ul><li>c</li></ul></td></tr></table>
            <div class="note note_note">n</div>
            <pre>code</pre>
            <img src="data:image/png;base64,AAAA">
            <img src="https://a.test/y.png">
        </body>"#;
        let counts = count_html(html, &[]);
        assert_eq!(
            counts,
            StructuralCounts {
                headings: 2,
                lists: 2,
                tables: 1,
                images: 1,
                code_blocks: 1,
                callouts: 1,
            }
        );
    }

    #[test]
    fn tooltip_and_footnote_classes_are_not_callouts() {
        let html = r#"<body>
            <div class="tooltip">hover</div>
            <section class="footnotes">1. source</section>
            <div class="note_caution">careful</div>
        </body>"#;
        assert_eq!(count_html(html, &[]).callouts, 1);
    }

    #[test]
    fn block_lists_are_contiguous_runs() {
        let item = |s: &str| Block::bulleted(vec![RichTextRun::plain(s)]);
        let blocks = vec![
            item("a").with_children(vec![Block::numbered(vec![], 1), Block::numbered(vec![], 2)]),
            item("b"),
            Block::paragraph(vec![RichTextRun::plain("break")]),
            item("c"),
        ];
        let counts = count_blocks(&blocks);
        assert_eq!(counts.lists, 3);
    }
}
