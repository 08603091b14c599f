use super::super::dom_walker::paragraph_flow;
use super::super::node_util::has_class;
use super::super::{ClassifyContext, Element};
use super::Handlers;
use crate::blocks::{Annotations, Block};

/// `div` classes that mark a paragraph in DITA-generated markup.
const PARAGRAPH_CLASSES: &[&str] = &["p", "itemgroup", "info", "stepresult", "shortdesc"];

pub(super) fn paragraph_handler(
    handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    Some(paragraph_flow(handlers, element.node, ctx))
}

/// `div.p` and friends behave like `p`, but may legally contain lists.
pub(super) fn paragraph_class_handler(
    handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    PARAGRAPH_CLASSES
        .iter()
        .any(|class| has_class(&element.node, class))
        .then(|| paragraph_flow(handlers, element.node, ctx))
}

/// `dt` and `summary` → bold paragraphs.
pub(super) fn term_handler(
    handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    let bold = Annotations {
        bold: true,
        ..Annotations::default()
    };
    Some(ctx.with_format(bold, |ctx| handlers.walk_children(element.node, ctx)))
}
