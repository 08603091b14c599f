use scraper::ElementRef;

use super::super::node_util::element_id;
use super::super::{ClassifyContext, Element};
use super::Handlers;
use crate::block_converter::html_preprocessing::serialize_children_excluding;
use crate::blocks::Block;

/// `h1`..`h6` → heading. Levels below the deepest supported one collapse
/// into it.
pub(super) fn headings_handler(
    _handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    let level = heading_level(element.tag)?;

    let mut html = String::new();
    serialize_children_excluding(&element.node, &|el: &ElementRef<'_>| ctx.is_skipped(el), &mut html);
    let runs = ctx.runs_from_html(&html);
    if runs.is_empty() {
        return Some(Vec::new());
    }

    Some(vec![
        Block::heading(level, runs).with_source_id(element_id(&element.node)),
    ])
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" | "h4" | "h5" | "h6" => Some(3),
        _ => None,
    }
}
