//! Block classification
//!
//! Single-pass recursive descent over the DOM in document order. Each element
//! is routed through a tag → handler registry; handlers produce blocks and
//! recurse through [`Handlers`] for their children. Nothing is grouped by
//! element type, so output order always follows source order.

mod dom_walker;
mod element_handler;
mod node_util;

pub(crate) use element_handler::callout::callout_style;
pub(crate) use element_handler::{ElementHandlers, Handlers};

use ego_tree::NodeRef;
use scraper::ElementRef;
use scraper::node::Node;
use std::sync::LazyLock;

use crate::block_converter::html_preprocessing::is_skipped;
use crate::block_converter::rich_text::{
    RichTextOptions, apply_wrapper_formatting, to_rich_text_with,
};
use crate::blocks::{Annotations, Block, RichTextRun};
use crate::config::ConversionConfig;

static HANDLERS: LazyLock<ElementHandlers> = LazyLock::new(ElementHandlers::new);

/// State threaded through classification.
pub struct ClassifyContext<'c> {
    pub(crate) config: &'c ConversionConfig,
    pub(crate) rich_text: RichTextOptions,
    /// Current DOM depth below the classified container
    pub(crate) depth: usize,
    /// Next ordinal of each open ordered list, innermost last
    pub(crate) list_counters: Vec<u32>,
    /// Formatting of inline wrappers that enclose block content
    pub(crate) format_stack: Vec<Annotations>,
    pub(crate) warnings: Vec<String>,
}

impl<'c> ClassifyContext<'c> {
    pub fn new(config: &'c ConversionConfig) -> Self {
        Self {
            config,
            rich_text: RichTextOptions::from_config(config),
            depth: 0,
            list_counters: Vec::new(),
            format_stack: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    /// Record a conversion warning and log it.
    pub(crate) fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }

    pub(crate) fn is_skipped(&self, element: &ElementRef<'_>) -> bool {
        is_skipped(element, &self.config.chrome_classes)
    }

    /// Rich text of an inline HTML fragment, with open wrapper formatting
    /// applied.
    pub(crate) fn runs_from_html(&self, html: &str) -> Vec<RichTextRun> {
        let mut runs = to_rich_text_with(html, &self.rich_text);
        if let Some(wrapper) = self.combined_format() {
            apply_wrapper_formatting(&mut runs, &wrapper);
        }
        runs
    }

    fn combined_format(&self) -> Option<Annotations> {
        if self.format_stack.is_empty() {
            return None;
        }
        let mut combined = Annotations::default();
        for format in &self.format_stack {
            combined.bold |= format.bold;
            combined.italic |= format.italic;
            combined.code |= format.code;
            combined.underline |= format.underline;
            combined.strikethrough |= format.strikethrough;
        }
        Some(combined)
    }

    /// Run `f` with `format` pushed on the format stack.
    pub(crate) fn with_format<T>(
        &mut self,
        format: Annotations,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.format_stack.push(format);
        let out = f(self);
        self.format_stack.pop();
        out
    }
}

/// Element being dispatched, with the number of handlers already passed over
/// for its tag.
#[derive(Clone, Copy)]
pub(crate) struct Element<'a> {
    pub node: ElementRef<'a>,
    pub tag: &'a str,
    pub skipped_handlers: usize,
}

/// Classify one DOM node into zero or more blocks.
pub fn classify(node: NodeRef<'_, Node>, ctx: &mut ClassifyContext<'_>) -> Vec<Block> {
    HANDLERS.handle(node, ctx)
}

/// Classify the children of `container` in document order.
pub fn classify_children(container: ElementRef<'_>, ctx: &mut ClassifyContext<'_>) -> Vec<Block> {
    HANDLERS.walk_children(container, ctx)
}
