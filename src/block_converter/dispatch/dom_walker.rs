//! Node walking and the content flows shared by handlers
//!
//! A container's children are split into *segments*: maximal runs of inline
//! nodes, and block-level elements. Inline runs are serialized with pruned
//! subtrees removed by node identity and turned into rich text; block
//! elements are dispatched on their own. The flows differ only in where
//! inline text and nested blocks land.

use ego_tree::NodeRef;
use scraper::ElementRef;
use scraper::node::Node;

use super::element_handler::{ElementHandlers, Handlers};
use super::node_util::{contains_block, element_id, is_block_tag};
use super::{ClassifyContext, Element};
use crate::block_converter::html_preprocessing::{MAX_DOM_DEPTH, serialize_nodes};
use crate::blocks::{Block, BlockKind, RichTextRun};

/// A run of inline nodes or a single block-level element.
pub(crate) enum Segment<'a> {
    Inline(Vec<NodeRef<'a, Node>>),
    Block(ElementRef<'a>),
}

pub(crate) fn walk_node(
    handlers: &ElementHandlers,
    node: NodeRef<'_, Node>,
    ctx: &mut ClassifyContext<'_>,
) -> Vec<Block> {
    match node.value() {
        Node::Document | Node::Fragment => {
            let mut blocks = Vec::new();
            for child in node.children() {
                blocks.extend(walk_node(handlers, child, ctx));
            }
            blocks
        }
        Node::Text(_) => {
            let runs = inline_runs(&[node], ctx);
            if runs.is_empty() {
                Vec::new()
            } else {
                vec![Block::paragraph(runs)]
            }
        }
        Node::Element(_) => {
            let Some(element) = ElementRef::wrap(node) else {
                return Vec::new();
            };
            if ctx.is_skipped(&element) {
                if ctx.config.verbose {
                    tracing::debug!(tag = element.value().name(), "Skipping non-content element");
                }
                return Vec::new();
            }
            if ctx.depth >= MAX_DOM_DEPTH {
                ctx.warn(format!(
                    "Maximum HTML nesting depth ({MAX_DOM_DEPTH}) exceeded at <{}>, content truncated",
                    element.value().name()
                ));
                return Vec::new();
            }

            ctx.depth += 1;
            if ctx.config.verbose {
                tracing::debug!(
                    tag = element.value().name(),
                    depth = ctx.depth,
                    "Dispatching element"
                );
            }
            let blocks = handlers.dispatch(
                Element {
                    node: element,
                    tag: element.value().name(),
                    skipped_handlers: 0,
                },
                ctx,
            );
            ctx.depth -= 1;
            blocks
        }
        _ => Vec::new(),
    }
}

/// Split the children of `element` into inline runs and block elements.
pub(crate) fn segments<'a>(element: ElementRef<'a>, ctx: &ClassifyContext<'_>) -> Vec<Segment<'a>> {
    let mut out = Vec::new();
    let mut inline: Vec<NodeRef<'a, Node>> = Vec::new();

    for child in element.children() {
        match child.value() {
            Node::Text(_) => inline.push(child),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if ctx.is_skipped(&child_el) {
                    continue;
                }
                let tag = child_el.value().name();
                let starts_block = is_block_tag(tag) || contains_block(&child_el);
                if starts_block {
                    if !inline.is_empty() {
                        out.push(Segment::Inline(std::mem::take(&mut inline)));
                    }
                    out.push(Segment::Block(child_el));
                } else {
                    inline.push(child);
                }
            }
            _ => {}
        }
    }
    if !inline.is_empty() {
        out.push(Segment::Inline(inline));
    }
    out
}

/// Rich text of a run of inline sibling nodes.
pub(crate) fn inline_runs(nodes: &[NodeRef<'_, Node>], ctx: &ClassifyContext<'_>) -> Vec<RichTextRun> {
    let mut html = String::new();
    serialize_nodes(nodes, &|el: &ElementRef<'_>| ctx.is_skipped(el), &mut html);
    ctx.runs_from_html(&html)
}

/// Generic container: inline runs become paragraphs, blocks are dispatched,
/// all in document order.
pub(crate) fn container_flow(
    handlers: &dyn Handlers,
    element: ElementRef<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Vec<Block> {
    let mut blocks = Vec::new();
    for segment in segments(element, ctx) {
        match segment {
            Segment::Inline(nodes) => {
                let runs = inline_runs(&nodes, ctx);
                if !runs.is_empty() {
                    blocks.push(Block::paragraph(runs));
                }
            }
            Segment::Block(child) => blocks.extend(handlers.handle(*child, ctx)),
        }
    }
    blocks
}

/// Inline text and the blocks found beside it, kept apart.
pub(crate) struct SplitContent {
    pub runs: Vec<RichTextRun>,
    pub blocks: Vec<Block>,
    /// `true` for each entry of `blocks` that came from a nested list
    pub from_list: Vec<bool>,
}

/// Collect all inline content of `element` into one run list and classify
/// its block children separately. The inline text is produced from the
/// element with its block children pruned, so nothing is emitted twice.
pub(crate) fn split_inline_and_blocks(
    handlers: &dyn Handlers,
    element: ElementRef<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> SplitContent {
    let mut inline_nodes = Vec::new();
    let mut blocks = Vec::new();
    let mut from_list = Vec::new();

    for segment in segments(element, ctx) {
        match segment {
            Segment::Inline(nodes) => inline_nodes.extend(nodes),
            Segment::Block(child) => {
                let is_list = matches!(child.value().name(), "ul" | "ol");
                let produced = handlers.handle(*child, ctx);
                from_list.extend(std::iter::repeat_n(is_list, produced.len()));
                blocks.extend(produced);
            }
        }
    }

    SplitContent {
        runs: inline_runs(&inline_nodes, ctx),
        blocks,
        from_list,
    }
}

/// Paragraph with mixed content: inline text becomes one paragraph, nested
/// lists become its children, every other block follows as a sibling.
pub(crate) fn paragraph_flow(
    handlers: &dyn Handlers,
    element: ElementRef<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Vec<Block> {
    let SplitContent {
        runs,
        blocks,
        from_list,
    } = split_inline_and_blocks(handlers, element, ctx);

    if runs.is_empty() {
        return blocks;
    }

    let mut children = Vec::new();
    let mut siblings = Vec::new();
    for (block, is_list) in blocks.into_iter().zip(from_list) {
        if is_list {
            children.push(block);
        } else {
            siblings.push(block);
        }
    }

    let paragraph = Block::paragraph(runs)
        .with_children(children)
        .with_source_id(element_id(&element));
    let mut out = Vec::with_capacity(1 + siblings.len());
    out.push(paragraph);
    out.extend(siblings);
    out
}

/// Item-like container (list item, callout): inline text is the item's own
/// rich text and every nested block is a child. When the item has no text
/// of its own and starts with a paragraph, that paragraph's text is promoted.
pub(crate) fn item_content(
    handlers: &dyn Handlers,
    element: ElementRef<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> (Vec<RichTextRun>, Vec<Block>) {
    let SplitContent {
        mut runs,
        mut blocks,
        ..
    } = split_inline_and_blocks(handlers, element, ctx);

    let starts_with_paragraph = matches!(
        blocks.first().map(|block| &block.kind),
        Some(BlockKind::Paragraph { .. })
    );
    if runs.is_empty() && starts_with_paragraph {
        let first = blocks.remove(0);
        if let BlockKind::Paragraph { rich_text } = first.kind {
            runs = rich_text;
        }
        let mut promoted_children = first.children;
        promoted_children.extend(blocks);
        blocks = promoted_children;
    }
    (runs, blocks)
}
