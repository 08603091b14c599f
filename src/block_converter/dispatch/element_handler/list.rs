use scraper::ElementRef;
use scraper::node::Node;

use super::super::dom_walker::{inline_runs, item_content};
use super::super::node_util::{element_id, is_blank_text};
use super::super::{ClassifyContext, Element};
use super::Handlers;
use crate::blocks::Block;

/// `ul`/`ol` → one list-item block per `li`, in order.
///
/// Anything else found directly inside the list (a stray `<figure>`, a
/// paragraph) is emitted as a sibling at the list's level rather than
/// forced into a neighbouring item.
pub(super) fn list_handler(
    handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    let ordered = element.tag == "ol";
    let start = element
        .node
        .value()
        .attr("start")
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(1);

    ctx.list_counters.push(start);
    let mut blocks = Vec::new();

    for child in element.node.children() {
        match child.value() {
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if ctx.is_skipped(&child_el) {
                    continue;
                }
                if child_el.value().name() == "li" {
                    let number = ctx.list_counters.last().copied().unwrap_or(1);
                    blocks.push(list_item(handlers, child_el, ordered.then_some(number), ctx));
                    if let Some(counter) = ctx.list_counters.last_mut() {
                        *counter += 1;
                    }
                } else {
                    blocks.extend(handlers.handle(child, ctx));
                }
            }
            Node::Text(_) if !is_blank_text(&child) => {
                let runs = inline_runs(&[child], ctx);
                if !runs.is_empty() {
                    blocks.push(Block::paragraph(runs));
                }
            }
            _ => {}
        }
    }

    ctx.list_counters.pop();
    Some(blocks)
}

/// `li` outside any list container is treated as a bulleted item.
pub(super) fn list_item_handler(
    handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    Some(vec![list_item(handlers, element.node, None, ctx)])
}

/// Build one list item. Nested lists and other blocks inside the item become
/// its children, so a nested `<ol>` restarts numbering under its own parent.
fn list_item(
    handlers: &dyn Handlers,
    li: ElementRef<'_>,
    number: Option<u32>,
    ctx: &mut ClassifyContext<'_>,
) -> Block {
    let (runs, children) = item_content(handlers, li, ctx);
    let item = match number {
        Some(number) => Block::numbered(runs, number),
        None => Block::bulleted(runs),
    };
    item.with_children(children).with_source_id(element_id(&li))
}
