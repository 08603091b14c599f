use super::super::{ClassifyContext, Element};
use super::Handlers;
use crate::block_converter::table::table_from_element;
use crate::blocks::Block;

/// `table` → optional caption heading followed by the table block.
pub(super) fn table_handler(
    _handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    let conversion =
        table_from_element(element.node, &ctx.rich_text, &ctx.config.chrome_classes);
    match conversion {
        Some(conversion) => Some(conversion.into_blocks()),
        None => {
            ctx.warn("Table without rows skipped");
            Some(Vec::new())
        }
    }
}
