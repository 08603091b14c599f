pub(crate) mod callout;
mod code;
mod headings;
pub(crate) mod language_inference;
mod list;
mod media;
mod paragraph;
mod table;

use ego_tree::NodeRef;
use scraper::ElementRef;
use scraper::node::Node;
use std::collections::HashMap;

use super::dom_walker::{container_flow, walk_node};
use super::node_util::is_formatting_wrapper;
use super::{ClassifyContext, Element};
use crate::blocks::{Annotations, Block};

use callout::callout_handler;
use code::code_handler;
use headings::headings_handler;
use list::{list_handler, list_item_handler};
use media::{figcaption_handler, figure_handler, img_handler};
use paragraph::{paragraph_class_handler, paragraph_handler, term_handler};
use table::table_handler;

/// Converts one element into blocks.
///
/// Returning `None` declines the element; it is then offered to the handler
/// registered before this one for the same tag, and finally to the generic
/// container flow.
pub(crate) trait ElementHandler: Send + Sync {
    fn handle(
        &self,
        handlers: &dyn Handlers,
        element: Element<'_>,
        ctx: &mut ClassifyContext<'_>,
    ) -> Option<Vec<Block>>;
}

impl<F> ElementHandler for F
where
    F: (Fn(&dyn Handlers, Element<'_>, &mut ClassifyContext<'_>) -> Option<Vec<Block>>)
        + Send
        + Sync,
{
    fn handle(
        &self,
        handlers: &dyn Handlers,
        element: Element<'_>,
        ctx: &mut ClassifyContext<'_>,
    ) -> Option<Vec<Block>> {
        self(handlers, element, ctx)
    }
}

/// Tag → handler registry
pub(crate) struct ElementHandlers {
    pub(crate) handlers: Vec<Box<dyn ElementHandler>>,
    pub(crate) tag_to_handler_indices: HashMap<&'static str, Vec<usize>>,
}

impl ElementHandlers {
    pub fn new() -> Self {
        let mut handlers = Self {
            handlers: Vec::new(),
            tag_to_handler_indices: HashMap::new(),
        };

        // headings
        handlers.add_handler(vec!["h1", "h2", "h3", "h4", "h5", "h6"], headings_handler);

        // lists
        handlers.add_handler(vec!["ul", "ol"], list_handler);
        handlers.add_handler(vec!["li"], list_item_handler);

        // table
        handlers.add_handler(vec!["table"], table_handler);

        // code
        handlers.add_handler(vec!["pre"], code_handler);

        // images
        handlers.add_handler(vec!["img"], img_handler);
        handlers.add_handler(vec!["figure"], figure_handler);
        handlers.add_handler(vec!["figcaption"], figcaption_handler);

        // hr
        handlers.add_handler(vec!["hr"], hr_handler);

        // paragraphs
        handlers.add_handler(vec!["p"], paragraph_handler);
        handlers.add_handler(vec!["div"], paragraph_class_handler);

        // dt, summary
        handlers.add_handler(vec!["dt", "summary"], term_handler);

        // Inline wrappers are only dispatched when they enclose blocks
        handlers.add_handler(
            vec!["b", "strong", "i", "em", "u", "code", "s", "del"],
            formatting_wrapper_handler,
        );

        // Callout detection must win over paragraph-like divs
        handlers.add_handler(vec!["div", "section", "aside"], callout_handler);

        handlers
    }

    pub fn add_handler<Handler>(&mut self, tags: Vec<&'static str>, handler: Handler)
    where
        Handler: ElementHandler + 'static,
    {
        assert!(!tags.is_empty(), "tags cannot be empty.");
        let handler_idx = self.handlers.len();
        self.handlers.push(Box::new(handler));
        for tag in tags {
            self.tag_to_handler_indices
                .entry(tag)
                .or_default()
                .insert(0, handler_idx);
        }
    }

    pub(crate) fn dispatch(&self, element: Element<'_>, ctx: &mut ClassifyContext<'_>) -> Vec<Block> {
        match self.find_handler(element.tag, element.skipped_handlers) {
            Some(handler) => match handler.handle(self, element, ctx) {
                Some(blocks) => blocks,
                None => self.fallback(element, ctx),
            },
            None => container_flow(self, element.node, ctx),
        }
    }

    fn find_handler(&self, tag: &str, skipped_handlers: usize) -> Option<&dyn ElementHandler> {
        let handler_indices = self.tag_to_handler_indices.get(tag)?;
        let idx = *handler_indices.get(skipped_handlers)?;
        Some(self.handlers[idx].as_ref())
    }
}

impl Default for ElementHandlers {
    fn default() -> Self {
        Self::new()
    }
}

/// Access to the registry for handlers that recurse into children.
pub(crate) trait Handlers {
    /// Offer the element to the previously registered handler for its tag.
    fn fallback(&self, element: Element<'_>, ctx: &mut ClassifyContext<'_>) -> Vec<Block>;

    /// Classify any DOM node.
    fn handle(&self, node: NodeRef<'_, Node>, ctx: &mut ClassifyContext<'_>) -> Vec<Block>;

    /// Classify the children of an element with the generic container flow.
    fn walk_children(&self, element: ElementRef<'_>, ctx: &mut ClassifyContext<'_>) -> Vec<Block>;
}

impl Handlers for ElementHandlers {
    fn fallback(&self, element: Element<'_>, ctx: &mut ClassifyContext<'_>) -> Vec<Block> {
        self.dispatch(
            Element {
                skipped_handlers: element.skipped_handlers + 1,
                ..element
            },
            ctx,
        )
    }

    fn handle(&self, node: NodeRef<'_, Node>, ctx: &mut ClassifyContext<'_>) -> Vec<Block> {
        walk_node(self, node, ctx)
    }

    fn walk_children(&self, element: ElementRef<'_>, ctx: &mut ClassifyContext<'_>) -> Vec<Block> {
        container_flow(self, element, ctx)
    }
}

fn hr_handler(
    _handlers: &dyn Handlers,
    _element: Element<'_>,
    _ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    Some(vec![Block::divider()])
}

/// `<strong>` (and friends) wrapping block content: the blocks inside carry
/// the wrapper's formatting.
fn formatting_wrapper_handler(
    handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    if !is_formatting_wrapper(element.tag) {
        return None;
    }
    let format = match element.tag {
        "b" | "strong" => Annotations {
            bold: true,
            ..Annotations::default()
        },
        "i" | "em" => Annotations {
            italic: true,
            ..Annotations::default()
        },
        "u" => Annotations {
            underline: true,
            ..Annotations::default()
        },
        "code" => Annotations {
            code: true,
            ..Annotations::default()
        },
        _ => Annotations {
            strikethrough: true,
            ..Annotations::default()
        },
    };
    Some(ctx.with_format(format, |ctx| handlers.walk_children(element.node, ctx)))
}
